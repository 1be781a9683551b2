// ============================================================================
// Review Queue
// ============================================================================
//
// Walks the operator through a batch of manuscripts one at a time. Each one is
// presented with the "mark worked" defaults filled in; confirming commits it
// through the coordinator and moves on, cancelling drops whatever is left.
//
// ```text
// Inactive ──start──> Reviewing(current, remaining) ──confirm (last)──> Inactive
//                          │   ▲                   │
//                          │   └──confirm (more)───┘
//                          └──cancel──> Inactive
// ```
//
// A failed commit leaves the queue exactly where it was so the operator can
// retry the same item.
//
// ============================================================================

use std::collections::VecDeque;
use tracing::{debug, info, warn};

use crate::coordinator::MutationCoordinator;
use crate::core::{Manuscript, ManuscriptDraft, Result, Status, TrackerError};

/// Manuscript currently presented for review.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewItem {
    pub id: String,
    /// Proposed edit shown to the operator. Not committed yet.
    pub proposal: Manuscript,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum QueueState {
    #[default]
    Inactive,
    Reviewing {
        current: ReviewItem,
        remaining: VecDeque<String>,
    },
}

/// Result of a successful confirm.
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    Next(ReviewItem),
    Finished,
}

#[derive(Debug, Default)]
pub struct ReviewQueue {
    state: QueueState,
    confirmed: Vec<String>,
}

impl ReviewQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &QueueState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, QueueState::Reviewing { .. })
    }

    pub fn current(&self) -> Option<&ReviewItem> {
        match &self.state {
            QueueState::Reviewing { current, .. } => Some(current),
            QueueState::Inactive => None,
        }
    }

    /// Ids still waiting behind the current one.
    pub fn remaining(&self) -> Vec<String> {
        match &self.state {
            QueueState::Reviewing { remaining, .. } => remaining.iter().cloned().collect(),
            QueueState::Inactive => Vec::new(),
        }
    }

    /// Ids committed since the last `start`.
    pub fn confirmed(&self) -> &[String] {
        &self.confirmed
    }

    /// Begins reviewing `ids` in order.
    ///
    /// Repeated ids are dropped (first occurrence wins) and ids no longer in
    /// the store are skipped. Returns the first item, or `None` if nothing in
    /// the batch is still in the store.
    pub async fn start(
        &mut self,
        coordinator: &MutationCoordinator,
        ids: &[String],
    ) -> Result<Option<ReviewItem>> {
        if ids.is_empty() {
            return Err(TrackerError::validation("review queue needs at least one manuscript"));
        }
        if self.is_active() {
            return Err(TrackerError::validation("a review is already in progress"));
        }

        let mut queue: VecDeque<String> = VecDeque::with_capacity(ids.len());
        for id in ids {
            if !queue.contains(id) {
                queue.push_back(id.clone());
            }
        }

        self.confirmed.clear();
        let first = self.present_next(coordinator, queue).await;
        match &first {
            Some(item) => info!(first = %item.id, remaining = self.remaining().len(), "review started"),
            None => warn!("review batch has no manuscripts left in the store"),
        }
        Ok(first)
    }

    /// Commits `edited` for the current item and advances.
    ///
    /// `edited.id` must be the current item's id. The commit goes through
    /// `update_entity`, or `create_entity` if the manuscript has disappeared
    /// from the store. On error the queue does not move.
    pub async fn confirm_and_advance(
        &mut self,
        coordinator: &MutationCoordinator,
        edited: Manuscript,
    ) -> Result<Advance> {
        let current_id = match &self.state {
            QueueState::Reviewing { current, .. } => current.id.clone(),
            QueueState::Inactive => {
                return Err(TrackerError::validation("no review in progress"));
            }
        };
        if edited.id != current_id {
            return Err(TrackerError::validation(format!(
                "review expects manuscript '{}', got '{}'",
                current_id, edited.id
            )));
        }

        if coordinator.contains(&current_id).await {
            coordinator.update_entity(edited).await?;
        } else {
            coordinator.create_entity(ManuscriptDraft::from(edited)).await?;
        }
        self.confirmed.push(current_id.clone());
        debug!(id = %current_id, "review item confirmed");

        let remaining = match std::mem::take(&mut self.state) {
            QueueState::Reviewing { remaining, .. } => remaining,
            QueueState::Inactive => VecDeque::new(),
        };
        match self.present_next(coordinator, remaining).await {
            Some(item) => Ok(Advance::Next(item)),
            None => {
                info!(confirmed = self.confirmed.len(), "review finished");
                Ok(Advance::Finished)
            }
        }
    }

    /// Stops the review without committing the current item. Items already
    /// confirmed stay committed. Returns the abandoned ids, current first.
    pub fn cancel(&mut self) -> Vec<String> {
        match std::mem::take(&mut self.state) {
            QueueState::Reviewing { current, remaining } => {
                let mut abandoned = Vec::with_capacity(remaining.len() + 1);
                abandoned.push(current.id);
                abandoned.extend(remaining);
                info!(abandoned = abandoned.len(), "review cancelled");
                abandoned
            }
            QueueState::Inactive => Vec::new(),
        }
    }

    /// Pops ids until one is still in the store and presents it. Leaves the
    /// queue inactive when none is.
    async fn present_next(
        &mut self,
        coordinator: &MutationCoordinator,
        mut queue: VecDeque<String>,
    ) -> Option<ReviewItem> {
        while let Some(id) = queue.pop_front() {
            let Some(entity) = coordinator.get(&id).await else {
                debug!(id = %id, "skipping manuscript no longer in store");
                continue;
            };

            let item = ReviewItem {
                proposal: propose_worked(entity, coordinator.now()),
                id,
            };
            self.state = QueueState::Reviewing {
                current: item.clone(),
                remaining: queue,
            };
            return Some(item);
        }

        self.state = QueueState::Inactive;
        None
    }
}

/// The default edit offered for a reviewed manuscript: worked, keeping any
/// completion date it already has.
pub fn propose_worked(mut entity: Manuscript, now: chrono::DateTime<chrono::Utc>) -> Manuscript {
    entity.status = Status::Worked;
    entity.completed_date = Some(entity.completed_date.unwrap_or(now));
    entity.date_status_changed = Some(now);
    entity
}
