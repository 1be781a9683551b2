pub mod duplicate;
pub mod transition;

pub use duplicate::{ensure_unique, find_duplicate, validate_patch, validate_required};
pub use transition::{DerivedFields, derive_for_bulk, derive_on_transition};
