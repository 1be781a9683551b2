// ============================================================================
// Mutation Coordinator
// ============================================================================
//
// Every state change goes through the same shape:
//
//   validate ──> (optimistic apply) ──> gateway call ──> confirm | recover
//
// Recovery depends on the operation:
// - create / update / delete: the store is only touched after the gateway
//   succeeds, so a failure leaves it as it was.
// - quick update: the entity snapshot taken before the optimistic apply is
//   put back exactly.
// - bulk update: the whole store is reloaded from the gateway.
//
// The store lock is never held across a gateway call, so other operations can
// proceed while one is waiting on the backing store.
//
// ============================================================================

mod optimistic;
mod quick_actions;

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::core::{
    Clock, Manuscript, ManuscriptDraft, Result, Status, SystemClock, TrackerError, UserSettings,
};
use crate::gateway::PersistenceGateway;
use crate::rules::{self, derive_on_transition};
use crate::storage::{EntityStore, ManuscriptQuery};

/// Read-only view of the coordinator's store, shareable with rendering code.
#[derive(Clone)]
pub struct StoreHandle {
    inner: Arc<RwLock<EntityStore>>,
}

impl StoreHandle {
    /// O(1) copy of the current store contents.
    pub async fn snapshot(&self) -> EntityStore {
        self.inner.read().await.clone()
    }

    pub async fn get(&self, id: &str) -> Option<Manuscript> {
        self.inner.read().await.get(id).cloned()
    }

    pub async fn version(&self) -> u64 {
        self.inner.read().await.version()
    }
}

/// Owns the entity store and routes every change through the gateway.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use manutrack::{InMemoryGateway, ManuscriptDraft, MutationCoordinator, Status};
///
/// # tokio_test::block_on(async {
/// let coordinator = MutationCoordinator::new(Arc::new(InMemoryGateway::new()));
/// coordinator.bootstrap().await.unwrap();
///
/// let created = coordinator
///     .create_entity(ManuscriptDraft::new("JRN-2024-0117", "JRN"))
///     .await
///     .unwrap();
/// let worked = coordinator.mark_worked(&created.id).await.unwrap().unwrap();
/// assert_eq!(worked.status, Status::Worked);
/// assert!(worked.completed_date.is_some());
/// # });
/// ```
pub struct MutationCoordinator {
    store: Arc<RwLock<EntityStore>>,
    gateway: Arc<dyn PersistenceGateway>,
    clock: Arc<dyn Clock>,
    settings: RwLock<UserSettings>,
}

impl MutationCoordinator {
    pub fn new(gateway: Arc<dyn PersistenceGateway>) -> Self {
        Self::with_clock(gateway, Arc::new(SystemClock))
    }

    pub fn with_clock(gateway: Arc<dyn PersistenceGateway>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: Arc::new(RwLock::new(EntityStore::new())),
            gateway,
            clock,
            settings: RwLock::new(UserSettings::default()),
        }
    }

    /// Loads manuscripts and settings from the gateway.
    pub async fn bootstrap(&self) -> Result<usize> {
        let loaded = self.reload().await?;
        self.load_settings().await?;
        info!(backend = self.gateway.backend_name(), manuscripts = loaded, "tracker ready");
        Ok(loaded)
    }

    pub fn store_handle(&self) -> StoreHandle {
        StoreHandle {
            inner: Arc::clone(&self.store),
        }
    }

    pub fn gateway(&self) -> &Arc<dyn PersistenceGateway> {
        &self.gateway
    }

    pub(crate) fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub async fn get(&self, id: &str) -> Option<Manuscript> {
        self.store.read().await.get(id).cloned()
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.store.read().await.contains(id)
    }

    pub async fn all(&self) -> Vec<Manuscript> {
        self.store.read().await.to_vec()
    }

    pub async fn query(&self, query: &ManuscriptQuery) -> Vec<Manuscript> {
        self.store.read().await.query(query)
    }

    pub async fn status_counts(&self) -> BTreeMap<Status, usize> {
        self.store.read().await.status_counts()
    }

    pub async fn store_version(&self) -> u64 {
        self.store.read().await.version()
    }

    pub async fn is_stale(&self) -> bool {
        self.store.read().await.is_stale()
    }

    // ------------------------------------------------------------------
    // Resync
    // ------------------------------------------------------------------

    /// Replaces the whole store with the gateway's list.
    pub async fn reload(&self) -> Result<usize> {
        let manuscripts = self.gateway.list().await?;
        let count = manuscripts.len();
        self.store.write().await.replace_all(manuscripts);
        debug!(count, "store reloaded from gateway");
        Ok(count)
    }

    // ------------------------------------------------------------------
    // Create / update / delete
    // ------------------------------------------------------------------

    /// Validates and persists a new manuscript, then adds it to the front of
    /// the store. Nothing reaches the store if the gateway refuses it.
    pub async fn create_entity(&self, draft: ManuscriptDraft) -> Result<Manuscript> {
        rules::validate_required(&draft.manuscript_id, &draft.journal_code)?;
        {
            let store = self.store.read().await;
            if let Some(id) = draft.id.as_deref().filter(|id| store.contains(id)) {
                return Err(TrackerError::validation(format!(
                    "entry '{}' already exists; edit it instead",
                    id
                )));
            }
            rules::ensure_unique(&draft.manuscript_id, None, store.iter())?;
        }

        let now = self.clock.now();
        let mut manuscript = draft.into_manuscript(now);
        derive_on_transition(
            Status::default(),
            manuscript.status,
            manuscript.completed_date,
            now,
        )
        .apply_to(&mut manuscript);

        let created = self.gateway.create(manuscript).await.map_err(|err| {
            warn!(error = %err, "create rejected by gateway");
            err
        })?;

        self.store.write().await.prepend(created.clone());
        info!(id = %created.id, manuscript_id = %created.manuscript_id, "manuscript created");
        Ok(created)
    }

    /// Full-form edit. The store is replaced only after the gateway confirms.
    pub async fn update_entity(&self, edited: Manuscript) -> Result<Manuscript> {
        rules::validate_required(&edited.manuscript_id, &edited.journal_code)?;

        let now = self.clock.now();
        let merged = {
            let store = self.store.read().await;
            let existing = store
                .get(&edited.id)
                .ok_or_else(|| TrackerError::not_found(format!("manuscript '{}'", edited.id)))?;
            rules::ensure_unique(&edited.manuscript_id, Some(edited.id.as_str()), store.iter())?;

            let mut merged = edited;
            merged.manuscript_id = merged.manuscript_id.trim().to_string();
            merged.journal_code = merged.journal_code.trim().to_string();
            derive_on_transition(existing.status, merged.status, merged.completed_date, now)
                .apply_to(&mut merged);
            merged.date_updated = existing.date_updated;
            merged.touch(now);
            merged
        };

        let persisted = self.gateway.update(merged).await.map_err(|err| {
            warn!(error = %err, "update rejected by gateway");
            err
        })?;

        if self.store.write().await.replace(persisted.clone()).is_none() {
            debug!(id = %persisted.id, "updated manuscript no longer in store");
        }
        Ok(persisted)
    }

    /// Deletes in the backing store first; the store entry goes only on success.
    /// Operator confirmation is the caller's responsibility.
    pub async fn delete_entity(&self, id: &str) -> Result<bool> {
        self.gateway.delete(id).await.map_err(|err| {
            warn!(id, error = %err, "delete rejected by gateway");
            err
        })?;

        let removed = self.store.write().await.remove(id).is_some();
        info!(id, removed, "manuscript deleted");
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------

    /// Reads settings from the gateway, falling back to defaults.
    pub async fn load_settings(&self) -> Result<UserSettings> {
        let settings = self.gateway.load_settings().await?.unwrap_or_default();
        *self.settings.write().await = settings.clone();
        Ok(settings)
    }

    pub async fn settings(&self) -> UserSettings {
        self.settings.read().await.clone()
    }

    /// Persists new settings; the cached copy changes only on success.
    pub async fn save_settings(&self, settings: UserSettings) -> Result<UserSettings> {
        settings.validate()?;
        let saved = self.gateway.save_settings(settings).await.map_err(|err| {
            warn!(error = %err, "settings rejected by gateway");
            err
        })?;
        *self.settings.write().await = saved.clone();
        Ok(saved)
    }
}
