//! Status bookkeeping shared by every mutation path.

use crate::core::{Manuscript, ManuscriptPatch, Status};
use chrono::{DateTime, Utc};

/// Fields that follow from a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DerivedFields {
    pub date_status_changed: Option<DateTime<Utc>>,
    pub completed_date: Option<DateTime<Utc>>,
}

impl DerivedFields {
    pub fn is_empty(&self) -> bool {
        self.date_status_changed.is_none() && self.completed_date.is_none()
    }

    pub fn apply_to(&self, target: &mut Manuscript) {
        if let Some(changed) = self.date_status_changed {
            target.date_status_changed = Some(changed);
        }
        if let Some(completed) = self.completed_date {
            target.completed_date = Some(completed);
        }
    }
}

/// Computes the fields implied by moving from `old` to `new` at `now`.
///
/// A completion date already on record is kept; leaving `Worked` never clears
/// it here, display code hides it instead.
pub fn derive_on_transition(
    old: Status,
    new: Status,
    existing_completed: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> DerivedFields {
    if old == new {
        return DerivedFields::default();
    }

    let completed_date = if new.is_worked() && existing_completed.is_none() {
        Some(now)
    } else {
        None
    };

    DerivedFields {
        date_status_changed: Some(now),
        completed_date,
    }
}

/// Adds the shared bookkeeping to a bulk change.
///
/// Bulk writes carry one patch for every id, so the status timestamp is
/// shared, and moving to `Worked` stamps the same completion date on every
/// entity unless the caller already chose one.
pub fn derive_for_bulk(changes: &ManuscriptPatch, now: DateTime<Utc>) -> ManuscriptPatch {
    let mut shared = changes.clone();
    if let Some(status) = changes.status {
        shared.date_status_changed = Some(now);
        if status.is_worked() && shared.completed_date.is_none() {
            shared.completed_date = Some(Some(now));
        }
    }
    shared.date_updated = Some(now);
    shared
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, 14, 30, 0).unwrap()
    }

    fn earlier() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_same_status_derives_nothing() {
        for status in Status::ALL {
            let derived = derive_on_transition(status, status, None, now());
            assert!(derived.is_empty(), "{} -> {} derived {:?}", status, status, derived);
        }
    }

    #[test]
    fn test_every_change_stamps_status_date() {
        for old in Status::ALL {
            for new in Status::ALL.into_iter().filter(|new| *new != old) {
                let derived = derive_on_transition(old, new, None, now());
                assert_eq!(derived.date_status_changed, Some(now()), "{} -> {}", old, new);

                let expected_completed = if new == Status::Worked { Some(now()) } else { None };
                assert_eq!(derived.completed_date, expected_completed, "{} -> {}", old, new);
            }
        }
    }

    #[test]
    fn test_existing_completion_is_kept() {
        let derived = derive_on_transition(Status::PendingTl, Status::Worked, Some(earlier()), now());
        assert_eq!(derived.date_status_changed, Some(now()));
        assert_eq!(derived.completed_date, None);
    }

    #[test]
    fn test_leaving_worked_does_not_clear_completion() {
        let derived = derive_on_transition(Status::Worked, Status::PendingJm, Some(earlier()), now());
        assert_eq!(derived.completed_date, None);

        let mut manuscript = crate::core::ManuscriptDraft::new("J-1", "JRN")
            .status(Status::Worked)
            .completed_date(earlier())
            .into_manuscript(earlier());
        manuscript.status = Status::PendingJm;
        derived.apply_to(&mut manuscript);
        assert_eq!(manuscript.completed_date, Some(earlier()));
        assert_eq!(manuscript.date_status_changed, Some(now()));
    }

    #[test]
    fn test_bulk_to_worked_shares_completion() {
        let shared = derive_for_bulk(&ManuscriptPatch::new().status(Status::Worked), now());
        assert_eq!(shared.date_status_changed, Some(now()));
        assert_eq!(shared.completed_date, Some(Some(now())));
        assert_eq!(shared.date_updated, Some(now()));
    }

    #[test]
    fn test_bulk_without_status_only_touches() {
        let shared = derive_for_bulk(&ManuscriptPatch::new().priority(crate::core::Priority::Urgent), now());
        assert_eq!(shared.date_status_changed, None);
        assert_eq!(shared.completed_date, None);
        assert_eq!(shared.date_updated, Some(now()));
    }

    #[test]
    fn test_bulk_keeps_explicit_completion() {
        let changes = ManuscriptPatch::new()
            .status(Status::Worked)
            .completed_date(Some(earlier()));
        let shared = derive_for_bulk(&changes, now());
        assert_eq!(shared.completed_date, Some(Some(earlier())));
    }
}
