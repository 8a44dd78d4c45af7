//! SQLite persistence for alert rules, their state-transition log, the
//! per-organization alert change feed and dashboard metadata.
//!
//! All data lives in a single [`store::AlertStore`] database (`oxdash.db`)
//! opened in WAL mode. State transitions are committed through
//! [`store::AlertStore::commit_state_transition`], which updates the alert
//! and appends the log entry in one transaction.

pub mod error;
pub mod store;


pub use error::{Result, StorageError};
pub use store::AlertStore;
