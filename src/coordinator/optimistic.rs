use tracing::{debug, error, warn};

use super::MutationCoordinator;
use crate::core::{Manuscript, ManuscriptPatch, Result, TrackerError};
use crate::rules::{self, derive_for_bulk, derive_on_transition};

impl MutationCoordinator {
    /// Applies `patch` to the store entry right away, then persists the full
    /// updated entity.
    ///
    /// - Returns `Ok(None)` if `id` is not in the store; nothing is sent.
    /// - On success the store entry becomes the gateway's confirmed copy,
    ///   unless something else has replaced it in the meantime.
    /// - On failure the entry is put back to the snapshot taken before the
    ///   apply, bit for bit, and the gateway error is returned.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use std::sync::Arc;
    /// # use manutrack::{ManuscriptPatch, MutationCoordinator, Priority, RemoteGateway};
    /// # tokio_test::block_on(async {
    /// # let gateway = RemoteGateway::new("http://localhost:8080/api").unwrap();
    /// # let coordinator = MutationCoordinator::new(Arc::new(gateway));
    /// let patch = ManuscriptPatch::new().priority(Priority::Urgent).due_date(None);
    /// match coordinator.quick_update("3f2a", patch).await {
    ///     Ok(Some(saved)) => println!("saved {}", saved.manuscript_id),
    ///     Ok(None) => println!("not loaded"),
    ///     Err(err) => eprintln!("rolled back: {}", err),
    /// }
    /// # });
    /// ```
    pub async fn quick_update(&self, id: &str, patch: ManuscriptPatch) -> Result<Option<Manuscript>> {
        rules::validate_patch(&patch)?;

        let now = self.now();
        let (snapshot, optimistic) = {
            let mut store = self.store.write().await;
            let Some(snapshot) = store.get(id).cloned() else {
                debug!(id, "quick update target not in store");
                return Ok(None);
            };
            if let Some(manuscript_id) = &patch.manuscript_id {
                rules::ensure_unique(manuscript_id, Some(id), store.iter())?;
            }

            let mut optimistic = snapshot.clone();
            patch.apply_to(&mut optimistic);
            derive_on_transition(snapshot.status, optimistic.status, optimistic.completed_date, now)
                .apply_to(&mut optimistic);
            optimistic.touch(now);

            store.replace(optimistic.clone());
            (snapshot, optimistic)
        };

        match self.gateway.update(optimistic.clone()).await {
            Ok(confirmed) => {
                let mut store = self.store.write().await;
                if store.get(id) == Some(&optimistic) {
                    store.replace(confirmed.clone());
                }
                Ok(Some(confirmed))
            }
            Err(err) => {
                warn!(id, error = %err, "quick update failed, rolling back");
                if !self.store.write().await.restore(snapshot) {
                    debug!(id, "rollback target vanished from store");
                }
                Err(err.into())
            }
        }
    }

    /// Applies one shared change to every listed entity at once and persists it
    /// with a single gateway call.
    ///
    /// There is no per-entity rollback: if the gateway call fails, the whole
    /// store is reloaded from the gateway, which also discards any other
    /// unconfirmed optimistic state. If that reload fails too, the store is
    /// flagged stale. Either way the original gateway error is returned.
    ///
    /// Returns how many store entries were changed.
    pub async fn bulk_update(&self, ids: &[String], changes: ManuscriptPatch) -> Result<usize> {
        if changes.manuscript_id.is_some() {
            return Err(TrackerError::validation(
                "manuscript ID cannot be changed in a bulk update",
            ));
        }
        rules::validate_patch(&changes)?;

        let mut unique_ids: Vec<String> = Vec::with_capacity(ids.len());
        for id in ids {
            if !unique_ids.contains(id) {
                unique_ids.push(id.clone());
            }
        }
        if unique_ids.is_empty() {
            return Ok(0);
        }

        let shared = derive_for_bulk(&changes, self.now());
        let applied = self.store.write().await.apply_bulk(&unique_ids, &shared);

        if let Err(err) = self.gateway.update_many(&unique_ids, &shared).await {
            warn!(count = unique_ids.len(), error = %err, "bulk update failed, resyncing store");
            if let Err(resync_err) = self.reload().await {
                error!(error = %resync_err, "resync after bulk failure failed, store is stale");
                self.store.write().await.mark_stale();
            }
            return Err(err.into());
        }

        debug!(requested = unique_ids.len(), applied, "bulk update persisted");
        Ok(applied)
    }
}
