use oxdash_common::types::AlertId;
use oxdash_storage::StorageError;

/// Failures surfaced by the alert management operations.
///
/// Transport layers map these to their own status codes; nothing here
/// knows about HTTP.
#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    /// The alert does not exist.
    #[error("alert {0} not found")]
    NotFound(AlertId),

    /// The alert belongs to another organization. The message is generic and
    /// never names the owner.
    #[error("you are not allowed to view or edit alert {0}")]
    Forbidden(AlertId),

    /// The alert id in the request path disagrees with the command payload.
    #[error("alert id mismatch: path has {path}, payload has {payload}")]
    AlertIdMismatch { path: AlertId, payload: AlertId },

    /// Malformed identifiers or arguments.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Persistence or collaborator failure. Never retried automatically.
    #[error("internal error: {0}")]
    Internal(#[source] anyhow::Error),
}

impl From<StorageError> for AlertError {
    fn from(err: StorageError) -> Self {
        AlertError::Internal(err.into())
    }
}

pub type Result<T> = std::result::Result<T, AlertError>;
