use thiserror::Error;

/// Failure reported by a persistence gateway.
///
/// The coordinator treats every variant the same way; the split only serves
/// diagnostics.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("write rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("record '{0}' not found in backing store")]
    NotFound(String),

    #[error("record '{0}' already exists in backing store")]
    AlreadyExists(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_decode() {
            Self::Transport(format!("invalid response body: {}", err))
        } else {
            Self::Transport(err.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("manuscript ID '{manuscript_id}' is already in use by entry '{existing_id}'")]
    Duplicate {
        manuscript_id: String,
        existing_id: String,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("persistence failed: {0}")]
    Persistence(#[from] GatewayError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl TrackerError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Errors raised before any gateway call was made.
    pub fn is_local_rejection(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Duplicate { .. } | Self::NotFound(_) | Self::Config(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, TrackerError>;
