use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiClientError {
    #[error("Request Error: {0}")]
    RequestError(String),
    #[error("API Error ({status}): {message}")]
    ApiError { status: u16, message: String },
    #[error("Decode Error: {0}")]
    DecodeError(String),
    #[error("Other Error: {0}")]
    Other(String),
}

impl ApiClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiClientError::ApiError { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Reason a user-triggered thumbnail action did not go through.
///
/// Displayed inline next to the control that triggered it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionFailure {
    #[error("Thumbnail generation is already in progress")]
    AlreadyInProgress,
    #[error("This file type cannot have a thumbnail: {0}")]
    Unsupported(String),
    #[error("You do not have permission to do this")]
    PermissionDenied,
    #[error("The asset no longer exists")]
    NotFound,
    #[error("Retry limit reached for this asset")]
    RetryLimitExceeded,
    #[error("The server rejected the request: {0}")]
    Rejected(String),
    #[error("Request failed: {0}")]
    Failed(String),
}

impl ActionFailure {
    pub fn from_status(status: u16, message: &str) -> Self {
        match status {
            409 => ActionFailure::AlreadyInProgress,
            422 => ActionFailure::Unsupported(message.to_string()),
            403 => ActionFailure::PermissionDenied,
            404 => ActionFailure::NotFound,
            429 => ActionFailure::RetryLimitExceeded,
            _ => ActionFailure::Failed(format!("HTTP {}: {}", status, message)),
        }
    }
}

impl From<ApiClientError> for ActionFailure {
    fn from(err: ApiClientError) -> Self {
        match err {
            ApiClientError::ApiError { status, message } => ActionFailure::from_status(status, &message),
            other => ActionFailure::Failed(other.to_string()),
        }
    }
}
