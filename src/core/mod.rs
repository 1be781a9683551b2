pub mod clock;
pub mod error;
pub mod settings;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{GatewayError, Result, TrackerError};
pub use settings::{UserSchedule, UserSettings};
pub use types::{Manuscript, ManuscriptDraft, ManuscriptPatch, Note, Priority, Status};
