// ============================================================================
// manutrack Library
// ============================================================================
//
// Tracks manuscripts through a small status workflow. The interesting part is
// the mutation pipeline: changes show up in the in-memory store immediately,
// are confirmed by a persistence gateway in the background, and are rolled
// back (single entity) or resynced (bulk) when the gateway says no.
//
// ============================================================================

pub mod config;
pub mod coordinator;
pub mod core;
pub mod gateway;
pub mod review;
pub mod rules;
pub mod storage;

// Re-export main types for convenience
pub use config::{GatewayBackend, TrackerConfig};
pub use coordinator::{MutationCoordinator, StoreHandle};
pub use crate::core::{
    Clock, GatewayError, ManualClock, Manuscript, ManuscriptDraft, ManuscriptPatch, Note, Priority,
    Result, Status, SystemClock, TrackerError, UserSchedule, UserSettings,
};
pub use gateway::{InMemoryGateway, LocalFileGateway, PersistenceGateway, RemoteGateway};
pub use review::{Advance, QueueState, ReviewItem, ReviewQueue};
pub use storage::{EntityStore, ManuscriptQuery, SortBy, SortOrder};
