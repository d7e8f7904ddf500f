use crate::config::ConfigError;
use crate::inbox::ReconciliationRecord;
use veyra_common::error::BackendError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("No element matched any candidate for {0}")]
    NotFound(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Action {action} failed: {reason}")]
    ActionFailed { action: String, reason: String },

    #[error("Expected a page under {expected}, landed on {actual}")]
    StructuralMismatch { expected: String, actual: String },

    /// Returning to the inbox root failed; later items cannot be located safely.
    #[error("Could not return to {url}: {reason} ({} threads reconciled before abort)", completed.len())]
    CleanupFailed {
        url: String,
        reason: String,
        completed: Vec<ReconciliationRecord>,
    },

    #[error("Cancelled before the session was authenticated")]
    Cancelled,

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Navigation errors at a structural checkpoint: timeouts keep their own kind.
    pub fn from_navigation(url: &str, err: BackendError) -> Self {
        if err.is_timeout() {
            EngineError::Timeout(format!("navigating to {}", url))
        } else {
            EngineError::Backend(err)
        }
    }
}
