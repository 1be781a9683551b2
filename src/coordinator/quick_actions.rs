//! One-click actions. Each is a prepared patch sent through `quick_update`,
//! so they share its rollback behaviour.

use super::MutationCoordinator;
use crate::core::{Manuscript, ManuscriptPatch, Note, Priority, Result, Status, TrackerError};

impl MutationCoordinator {
    pub async fn set_status(&self, id: &str, status: Status) -> Result<Option<Manuscript>> {
        self.quick_update(id, ManuscriptPatch::new().status(status)).await
    }

    pub async fn mark_worked(&self, id: &str) -> Result<Option<Manuscript>> {
        self.set_status(id, Status::Worked).await
    }

    pub async fn set_priority(&self, id: &str, priority: Priority) -> Result<Option<Manuscript>> {
        self.quick_update(id, ManuscriptPatch::new().priority(priority)).await
    }

    /// Records that a query was raised on the manuscript.
    pub async fn raise_query(&self, id: &str) -> Result<Option<Manuscript>> {
        let now = self.now();
        self.quick_update(id, ManuscriptPatch::new().date_queried(Some(now)))
            .await
    }

    /// Records that a notification email was sent.
    pub async fn mark_emailed(&self, id: &str) -> Result<Option<Manuscript>> {
        let now = self.now();
        self.quick_update(id, ManuscriptPatch::new().date_emailed(Some(now)))
            .await
    }

    /// Adds a note at the front (notes are kept newest first).
    pub async fn add_note(&self, id: &str, content: &str) -> Result<Option<Manuscript>> {
        let content = note_content(content)?;
        let Some(current) = self.get(id).await else {
            return Ok(None);
        };

        let mut notes = Vec::with_capacity(current.notes.len() + 1);
        notes.push(Note::new(content, self.now()));
        notes.extend(current.notes);
        self.quick_update(id, ManuscriptPatch::new().notes(notes)).await
    }

    /// Replaces the text of an existing note. Its id and timestamp stay.
    pub async fn edit_note(&self, id: &str, note_id: &str, content: &str) -> Result<Option<Manuscript>> {
        let content = note_content(content)?;
        let Some(mut current) = self.get(id).await else {
            return Ok(None);
        };

        let note = current
            .notes
            .iter_mut()
            .find(|note| note.id == note_id)
            .ok_or_else(|| TrackerError::not_found(format!("note '{}' on manuscript '{}'", note_id, id)))?;
        note.content = content;
        self.quick_update(id, ManuscriptPatch::new().notes(current.notes))
            .await
    }

    pub async fn delete_note(&self, id: &str, note_id: &str) -> Result<Option<Manuscript>> {
        let Some(mut current) = self.get(id).await else {
            return Ok(None);
        };

        let before = current.notes.len();
        current.notes.retain(|note| note.id != note_id);
        if current.notes.len() == before {
            return Err(TrackerError::not_found(format!(
                "note '{}' on manuscript '{}'",
                note_id, id
            )));
        }
        self.quick_update(id, ManuscriptPatch::new().notes(current.notes))
            .await
    }
}

fn note_content(content: &str) -> Result<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(TrackerError::validation("note content cannot be empty"));
    }
    Ok(trimmed.to_string())
}
