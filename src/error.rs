//! Citylight error types

/// Citylight error types.
///
/// `Clone` so that a single failed render can be handed to every caller
/// waiting on the same in-flight job.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CitylightError {
    // Data errors
    #[error("JSON error: {0}")]
    Json(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    // Rendering errors
    /// The chart renderer could not build an artifact from the payload.
    #[error("render failed: {0}")]
    Render(String),

    /// The task driving an in-flight render panicked or was cancelled.
    #[error("render job aborted: {0}")]
    JobAborted(String),

    // Data source errors
    #[error("fetch failed: {0}")]
    Fetch(String),
}

impl From<serde_json::Error> for CitylightError {
    fn from(err: serde_json::Error) -> Self {
        CitylightError::Json(err.to_string())
    }
}

/// Result type alias for Citylight operations
pub type Result<T> = std::result::Result<T, CitylightError>;
