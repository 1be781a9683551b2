use crate::core::{Manuscript, Priority, Status};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    /// Store order (newest first).
    #[default]
    Natural,
    DateReceived,
    DueDate,
    DateUpdated,
    Priority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Read-side filter over the entity store.
#[derive(Debug, Clone, Default)]
pub struct ManuscriptQuery {
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub journal_code: Option<String>,
    /// Case-insensitive substring of the manuscript ID.
    pub search: Option<String>,
    /// Keep only entries not yet worked whose due date is before this instant.
    pub overdue_at: Option<DateTime<Utc>>,
    pub sort_by: SortBy,
    pub order: SortOrder,
}

impl ManuscriptQuery {
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

    pub fn journal_code(mut self, journal_code: impl Into<String>) -> Self {
        self.journal_code = Some(journal_code.into());
        self
    }

    pub fn search(mut self, needle: impl Into<String>) -> Self {
        self.search = Some(needle.into());
        self
    }

    pub fn overdue_at(mut self, at: DateTime<Utc>) -> Self {
        self.overdue_at = Some(at);
        self
    }

    pub fn sort(mut self, sort_by: SortBy, order: SortOrder) -> Self {
        self.sort_by = sort_by;
        self.order = order;
        self
    }

    pub fn matches(&self, entity: &Manuscript) -> bool {
        if self.status.is_some_and(|status| entity.status != status) {
            return false;
        }
        if self.priority.is_some_and(|priority| entity.priority != priority) {
            return false;
        }
        if let Some(journal) = &self.journal_code {
            if !entity.journal_code.eq_ignore_ascii_case(journal.trim()) {
                return false;
            }
        }
        if let Some(needle) = &self.search {
            let needle = needle.trim().to_lowercase();
            if !entity.manuscript_id.to_lowercase().contains(&needle) {
                return false;
            }
        }
        if let Some(at) = self.overdue_at {
            let overdue = !entity.status.is_worked() && entity.due_date.is_some_and(|due| due < at);
            if !overdue {
                return false;
            }
        }
        true
    }

    pub(crate) fn run<'a>(&self, entities: impl Iterator<Item = &'a Manuscript>) -> Vec<Manuscript> {
        let mut items: Vec<Manuscript> = entities.filter(|e| self.matches(e)).cloned().collect();

        if self.sort_by != SortBy::Natural {
            // Stable sort so ties keep store order.
            items.sort_by(|left, right| {
                let ordering = compare(self.sort_by, left, right);
                match self.order {
                    SortOrder::Asc => ordering,
                    SortOrder::Desc => ordering.reverse(),
                }
            });
        }

        items
    }
}

fn compare(sort_by: SortBy, left: &Manuscript, right: &Manuscript) -> Ordering {
    match sort_by {
        SortBy::Natural => Ordering::Equal,
        SortBy::DateReceived => left.date_received.cmp(&right.date_received),
        // Entries without a due date go last.
        SortBy::DueDate => match (left.due_date, right.due_date) {
            (Some(l), Some(r)) => l.cmp(&r),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        SortBy::DateUpdated => left.date_updated.cmp(&right.date_updated),
        SortBy::Priority => left.priority.cmp(&right.priority),
    }
}
