// ============================================================================
// Persistence Gateway
// ============================================================================
//
// Uniform CRUD boundary over whatever actually keeps the data: an on-device
// JSON document, a remote HTTP service, or plain memory. The coordinator never
// knows which one it talks to; every call may be slow and every call may fail.
//
// ============================================================================

pub mod local;
pub mod memory;
pub mod remote;

use crate::core::{GatewayError, Manuscript, ManuscriptPatch, UserSettings};
use async_trait::async_trait;

pub use local::LocalFileGateway;
pub use memory::InMemoryGateway;
pub use remote::RemoteGateway;

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Every stored manuscript, newest first.
    async fn list(&self) -> GatewayResult<Vec<Manuscript>>;

    /// Stores a new manuscript and returns it as stored (final id, defaults).
    async fn create(&self, manuscript: Manuscript) -> GatewayResult<Manuscript>;

    /// Overwrites the manuscript with the same id.
    async fn update(&self, manuscript: Manuscript) -> GatewayResult<Manuscript>;

    /// Applies one shared patch to every listed id in a single call.
    async fn update_many(&self, ids: &[String], changes: &ManuscriptPatch) -> GatewayResult<()>;

    async fn delete(&self, id: &str) -> GatewayResult<()>;

    /// Stored settings, or `None` when none were ever saved.
    async fn load_settings(&self) -> GatewayResult<Option<UserSettings>>;

    async fn save_settings(&self, settings: UserSettings) -> GatewayResult<UserSettings>;

    /// Short label for logs.
    fn backend_name(&self) -> &'static str;
}

/// Shared by the file and memory backends: apply a bulk patch to a stored list.
pub(crate) fn apply_many(stored: &mut [Manuscript], ids: &[String], changes: &ManuscriptPatch) {
    for manuscript in stored.iter_mut() {
        if ids.iter().any(|id| *id == manuscript.id) {
            changes.apply_to(manuscript);
            *manuscript = manuscript.normalized();
        }
    }
}
