/// Errors raised by a browser backend while talking to a live page.
#[derive(thiserror::Error, Debug, Clone)]
pub enum BackendError {
    // ============================================================
    // Navigation Errors
    // ============================================================
    #[error("Navigation failed: {0}")]
    Navigation(String),

    // ============================================================
    // Element Errors
    // ============================================================
    #[error("Element handle {handle} belongs to page generation {handle_generation}, page is at {current}")]
    StaleHandle {
        handle: String,
        handle_generation: u64,
        current: u64,
    },

    #[error("Element {handle} is no longer attached to the document")]
    Detached { handle: String },

    #[error("Invalid selector: {selector}")]
    SelectorInvalid { selector: String },

    // ============================================================
    // Execution Errors
    // ============================================================
    #[error("Script execution error: {0}")]
    ScriptError(String),

    #[error("Timeout: {operation}")]
    TimeoutWithContext { operation: String },

    #[error("Timeout")]
    Timeout,

    // ============================================================
    // Session Errors
    // ============================================================
    #[error("Backend not ready")]
    NotReady,

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("{0}")]
    Other(String),
}

impl BackendError {
    /// True for errors that mean "the wait ran out" rather than "something broke".
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            BackendError::Timeout | BackendError::TimeoutWithContext { .. }
        )
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(e: serde_json::Error) -> Self {
        BackendError::Serialization(e.to_string())
    }
}
