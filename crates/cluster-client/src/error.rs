//! Cluster client errors

use thiserror::Error;

/// Errors that can occur when reading or writing cluster state
///
/// The variants form the controller's error taxonomy: `NotFound` is a
/// legitimate terminal state for the caller, `Conflict`, `AlreadyExists`,
/// `Transient` and `DeadlineExceeded` are recoverable by retrying later,
/// `Cancelled` and `Api` are not.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Object does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Create raced with another writer
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Optimistic-concurrency collision (stale resourceVersion)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Network failure, throttling or server-side unavailability
    #[error("Transient error: {0}")]
    Transient(String),

    /// The caller's context was cancelled
    #[error("Operation cancelled")]
    Cancelled,

    /// The caller's deadline passed before the call completed
    #[error("Deadline exceeded")]
    DeadlineExceeded,

    /// Any other API failure
    #[error("API error: {0}")]
    Api(String),
}

impl StoreError {
    /// Returns true if the object does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns true if retrying the same call later may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::AlreadyExists(_) | Self::Conflict(_) | Self::Transient(_) | Self::DeadlineExceeded
        )
    }

    /// Classify an API server response by HTTP status code and reason.
    #[must_use]
    pub fn from_status(code: u16, reason: &str, message: &str) -> Self {
        let message = message.to_string();
        match code {
            404 => Self::NotFound(message),
            409 if reason == "AlreadyExists" => Self::AlreadyExists(message),
            409 => Self::Conflict(message),
            408 | 429 | 500..=599 => Self::Transient(message),
            _ => Self::Api(format!("{code} {reason}: {message}")),
        }
    }
}

impl From<kube::Error> for StoreError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(response) => {
                Self::from_status(response.code, &response.reason, &response.message)
            }
            kube::Error::HyperError(e) => Self::Transient(e.to_string()),
            kube::Error::Service(e) => Self::Transient(e.to_string()),
            other => Self::Api(other.to_string()),
        }
    }
}
