/// Errors that can occur within the storage layer.
///
/// # Examples
///
/// ```rust
/// use oxdash_storage::error::StorageError;
///
/// let err = StorageError::NotFound {
///     entity: "alert",
///     id: "42".to_string(),
/// };
/// assert!(err.to_string().contains("alert"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A required record was not found in the database.
    #[error("Storage: {entity} not found (id={id})")]
    NotFound { entity: &'static str, id: String },

    /// A state transition was committed against a state that is no longer
    /// current. Callers holding the per-alert scope never observe this.
    #[error("Storage: alert {alert_id} state changed concurrently (expected {expected})")]
    StaleState { alert_id: i64, expected: String },

    /// An insert operation did not return the newly created row, which should be
    /// unreachable under normal conditions.
    #[error("Storage: insert of {entity} succeeded but the row could not be read back")]
    InsertReadback { entity: &'static str },

    /// An underlying SQLite error.
    #[error("Storage: SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failure creating the data directory.
    #[error("Storage: I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience `Result` alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
