use crate::remote::RemoteError;
use thiserror::Error;

/// Errors surfaced by the service lifecycle. Lookup failures never show up
/// here; the worker retries them in the background.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("lookup service already started")]
    AlreadyStarted,
    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("remote client setup failed: {0}")]
    Remote(#[from] RemoteError),
}
