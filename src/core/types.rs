use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Status / Priority
// ============================================================================

/// Workflow status of a manuscript.
///
/// ```text
/// UNTOUCHED ──> PENDING_JM / PENDING_TL / PENDING_CED ──> WORKED
/// ```
///
/// Any status can be edited into any other; `Worked` is terminal only for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    #[default]
    Untouched,
    PendingJm,
    PendingTl,
    PendingCed,
    Worked,
}

impl Status {
    pub const ALL: [Status; 5] = [
        Status::Untouched,
        Status::PendingJm,
        Status::PendingTl,
        Status::PendingCed,
        Status::Worked,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Untouched => "UNTOUCHED",
            Status::PendingJm => "PENDING_JM",
            Status::PendingTl => "PENDING_TL",
            Status::PendingCed => "PENDING_CED",
            Status::Worked => "WORKED",
        }
    }

    pub fn is_worked(&self) -> bool {
        matches!(self, Status::Worked)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        Status::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| {
                format!(
                    "unknown status '{}', expected one of: UNTOUCHED, PENDING_JM, PENDING_TL, PENDING_CED, WORKED",
                    raw
                )
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Priority {
    #[default]
    Normal,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Normal => "Normal",
            Priority::High => "High",
            Priority::Urgent => "Urgent",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Priority::Normal),
            "high" => Ok(Priority::High),
            "urgent" => Ok(Priority::Urgent),
            _ => Err(format!(
                "unknown priority '{}', expected one of: Normal, High, Urgent",
                raw
            )),
        }
    }
}

// ============================================================================
// Note
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Note {
    pub fn new(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            timestamp,
        }
    }
}

// ============================================================================
// Manuscript
// ============================================================================

/// A tracked unit of work.
///
/// `id` is the store identity and never changes. `manuscript_id` is the
/// operator-facing correlation key and is unique case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manuscript {
    pub id: String,
    pub manuscript_id: String,
    pub journal_code: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub priority: Priority,
    pub date_received: DateTime<Utc>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_date: Option<DateTime<Utc>>,
    pub date_updated: DateTime<Utc>,
    #[serde(default)]
    pub date_status_changed: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_queried: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_emailed: Option<DateTime<Utc>>,
    /// Newest first.
    #[serde(default)]
    pub notes: Vec<Note>,
}

impl Manuscript {
    /// Refreshes `date_updated` without ever moving it backwards.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.date_updated = self.date_updated.max(now);
    }

    /// Completion date as it should be displayed: only meaningful while worked.
    pub fn visible_completed_date(&self) -> Option<DateTime<Utc>> {
        if self.status.is_worked() {
            self.completed_date
        } else {
            None
        }
    }

    /// Copy suitable for durable storage, with a stale completion date dropped.
    pub fn normalized(&self) -> Self {
        let mut normalized = self.clone();
        normalized.completed_date = self.visible_completed_date();
        normalized
    }

    pub fn note(&self, note_id: &str) -> Option<&Note> {
        self.notes.iter().find(|note| note.id == note_id)
    }
}

// ============================================================================
// Draft (create payload)
// ============================================================================

/// Payload of the create form. Anything left unset gets its default at creation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManuscriptDraft {
    #[serde(default)]
    pub id: Option<String>,
    pub manuscript_id: String,
    pub journal_code: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub date_received: Option<DateTime<Utc>>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_queried: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_emailed: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Vec<Note>,
}

impl ManuscriptDraft {
    pub fn new(manuscript_id: impl Into<String>, journal_code: impl Into<String>) -> Self {
        Self {
            manuscript_id: manuscript_id.into(),
            journal_code: journal_code.into(),
            ..Self::default()
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn date_received(mut self, received: DateTime<Utc>) -> Self {
        self.date_received = Some(received);
        self
    }

    pub fn due_date(mut self, due: DateTime<Utc>) -> Self {
        self.due_date = Some(due);
        self
    }

    pub fn completed_date(mut self, completed: DateTime<Utc>) -> Self {
        self.completed_date = Some(completed);
        self
    }

    /// Materializes the draft at `now`: assigns a fresh id if none was given and
    /// stamps the bookkeeping dates. Status-derived fields are the caller's job.
    pub fn into_manuscript(self, now: DateTime<Utc>) -> Manuscript {
        let id = self
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Manuscript {
            id,
            manuscript_id: self.manuscript_id.trim().to_string(),
            journal_code: self.journal_code.trim().to_string(),
            status: self.status,
            priority: self.priority,
            date_received: self.date_received.unwrap_or(now),
            due_date: self.due_date,
            completed_date: self.completed_date,
            date_updated: now,
            date_status_changed: Some(now),
            date_queried: self.date_queried,
            date_emailed: self.date_emailed,
            notes: self.notes,
        }
    }
}

impl From<Manuscript> for ManuscriptDraft {
    fn from(value: Manuscript) -> Self {
        Self {
            id: Some(value.id),
            manuscript_id: value.manuscript_id,
            journal_code: value.journal_code,
            status: value.status,
            priority: value.priority,
            date_received: Some(value.date_received),
            due_date: value.due_date,
            completed_date: value.completed_date,
            date_queried: value.date_queried,
            date_emailed: value.date_emailed,
            notes: value.notes,
        }
    }
}

// ============================================================================
// Patch (partial changes)
// ============================================================================

/// Partial change applied by quick actions and bulk updates.
///
/// Nullable fields use `Option<Option<_>>`: `None` leaves the field alone,
/// `Some(None)` clears it. On the wire an absent key means "unchanged" and an
/// explicit `null` means "clear".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManuscriptPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manuscript_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_received: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub completed_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_status_changed: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_updated: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub date_queried: Option<Option<DateTime<Utc>>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub date_emailed: Option<Option<DateTime<Utc>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<Vec<Note>>,
}

impl ManuscriptPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn manuscript_id(mut self, manuscript_id: impl Into<String>) -> Self {
        self.manuscript_id = Some(manuscript_id.into());
        self
    }

    pub fn journal_code(mut self, journal_code: impl Into<String>) -> Self {
        self.journal_code = Some(journal_code.into());
        self
    }

    pub fn due_date(mut self, due: Option<DateTime<Utc>>) -> Self {
        self.due_date = Some(due);
        self
    }

    pub fn completed_date(mut self, completed: Option<DateTime<Utc>>) -> Self {
        self.completed_date = Some(completed);
        self
    }

    pub fn date_queried(mut self, queried: Option<DateTime<Utc>>) -> Self {
        self.date_queried = Some(queried);
        self
    }

    pub fn date_emailed(mut self, emailed: Option<DateTime<Utc>>) -> Self {
        self.date_emailed = Some(emailed);
        self
    }

    pub fn notes(mut self, notes: Vec<Note>) -> Self {
        self.notes = Some(notes);
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Writes every set field into `target`. `date_updated` only moves forward.
    pub fn apply_to(&self, target: &mut Manuscript) {
        if let Some(manuscript_id) = &self.manuscript_id {
            target.manuscript_id = manuscript_id.trim().to_string();
        }
        if let Some(journal_code) = &self.journal_code {
            target.journal_code = journal_code.trim().to_string();
        }
        if let Some(status) = self.status {
            target.status = status;
        }
        if let Some(priority) = self.priority {
            target.priority = priority;
        }
        if let Some(received) = self.date_received {
            target.date_received = received;
        }
        if let Some(due) = self.due_date {
            target.due_date = due;
        }
        if let Some(completed) = self.completed_date {
            target.completed_date = completed;
        }
        if let Some(changed) = self.date_status_changed {
            target.date_status_changed = Some(changed);
        }
        if let Some(updated) = self.date_updated {
            target.touch(updated);
        }
        if let Some(queried) = self.date_queried {
            target.date_queried = queried;
        }
        if let Some(emailed) = self.date_emailed {
            target.date_emailed = emailed;
        }
        if let Some(notes) = &self.notes {
            target.notes = notes.clone();
        }
    }
}

mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S, T>(value: &Option<Option<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
    }

    fn sample() -> Manuscript {
        ManuscriptDraft::new("J-1", "JRN")
            .id("m-1")
            .into_manuscript(at(8))
    }

    #[test]
    fn test_status_parse_accepts_loose_spelling() {
        assert_eq!("pending-jm".parse::<Status>().unwrap(), Status::PendingJm);
        assert_eq!(" worked ".parse::<Status>().unwrap(), Status::Worked);
        assert!("done".parse::<Status>().is_err());
    }

    #[test]
    fn test_status_wire_names() {
        let json = serde_json::to_string(&Status::PendingCed).unwrap();
        assert_eq!(json, "\"PENDING_CED\"");
    }

    #[test]
    fn test_draft_assigns_id_when_absent() {
        let manuscript = ManuscriptDraft::new("  J-9 ", "JRN").into_manuscript(at(8));
        assert!(!manuscript.id.is_empty());
        assert_eq!(manuscript.manuscript_id, "J-9");
        assert_eq!(manuscript.date_received, at(8));
        assert_eq!(manuscript.date_status_changed, Some(at(8)));
    }

    #[test]
    fn test_patch_touch_never_moves_backwards() {
        let mut manuscript = sample();
        manuscript.date_updated = at(10);
        let patch = ManuscriptPatch {
            date_updated: Some(at(9)),
            ..ManuscriptPatch::default()
        };
        patch.apply_to(&mut manuscript);
        assert_eq!(manuscript.date_updated, at(10));
    }

    #[test]
    fn test_patch_distinguishes_absent_from_null() {
        let clear: ManuscriptPatch = serde_json::from_str(r#"{"dueDate": null}"#).unwrap();
        assert_eq!(clear.due_date, Some(None));

        let untouched: ManuscriptPatch = serde_json::from_str(r#"{"priority": "High"}"#).unwrap();
        assert_eq!(untouched.due_date, None);
        assert_eq!(untouched.priority, Some(Priority::High));

        let mut manuscript = sample();
        manuscript.due_date = Some(at(12));
        untouched.apply_to(&mut manuscript);
        assert_eq!(manuscript.due_date, Some(at(12)));
        clear.apply_to(&mut manuscript);
        assert_eq!(manuscript.due_date, None);
    }

    #[test]
    fn test_patch_serializes_clear_as_null() {
        let patch = ManuscriptPatch::new().completed_date(None);
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json, serde_json::json!({ "completedDate": null }));
    }

    #[test]
    fn test_normalized_hides_completion_unless_worked() {
        let mut manuscript = sample();
        manuscript.completed_date = Some(at(9));
        assert_eq!(manuscript.visible_completed_date(), None);
        assert_eq!(manuscript.normalized().completed_date, None);

        manuscript.status = Status::Worked;
        assert_eq!(manuscript.normalized().completed_date, Some(at(9)));
    }
}
