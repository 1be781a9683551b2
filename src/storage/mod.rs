pub mod entity_store;
pub mod query;

pub use entity_store::EntityStore;
pub use query::{ManuscriptQuery, SortBy, SortOrder};
