use thiserror::Error;

pub type Result<T> = std::result::Result<T, IngestError>;

/// Failure taxonomy for the ingestion pipeline.
///
/// `NotFound` and `Service` are deliberately distinct: a channel that does
/// not exist should not be retried, while an upstream API failure should.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    Conflict(String),

    #[error("upstream service error: {0}")]
    Service(String),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for IngestError {
    fn from(err: reqwest::Error) -> Self {
        // Timeouts and connection failures are upstream problems, not
        // "the channel does not exist".
        IngestError::Service(err.to_string())
    }
}

impl IngestError {
    /// Whether a caller may reasonably retry the failed operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, IngestError::Service(_))
    }
}
