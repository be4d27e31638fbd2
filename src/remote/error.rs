use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur while looking a message up on the remote service.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("remote service returned status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("remote service rate limited the request")]
    RateLimited,
    #[error("message {0} is not known to the remote service")]
    NotFound(String),
    #[error("failed to decode remote response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl RemoteError {
    pub fn status(status: StatusCode, body: String) -> Self {
        RemoteError::Status { status, body }
    }

    /// Whether asking again later can succeed. Unknown messages and other
    /// client errors are final answers.
    pub fn is_transient(&self) -> bool {
        match self {
            RemoteError::NotFound(_) => false,
            RemoteError::Status { status, .. } => !status.is_client_error(),
            RemoteError::Http(_) | RemoteError::RateLimited | RemoteError::Decode(_) => true,
        }
    }
}
