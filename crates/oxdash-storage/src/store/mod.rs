use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::error::Result;

pub mod alert;
pub mod change;
pub mod dashboard;
pub mod state_log;

const DASHBOARDS_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS dashboards (
    id INTEGER PRIMARY KEY,
    org_id INTEGER,
    slug TEXT NOT NULL,
    title TEXT NOT NULL DEFAULT '',
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
";

const ALERTS_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS alerts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    org_id INTEGER,
    dashboard_id INTEGER NOT NULL,
    panel_id INTEGER NOT NULL,
    query TEXT NOT NULL DEFAULT '',
    query_ref_id TEXT NOT NULL DEFAULT '',
    query_range INTEGER NOT NULL DEFAULT 0,
    aggregator TEXT NOT NULL DEFAULT '',
    warn_level REAL NOT NULL DEFAULT 0,
    crit_level REAL NOT NULL DEFAULT 0,
    interval_secs INTEGER NOT NULL DEFAULT 60,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    state TEXT NOT NULL DEFAULT 'OK',
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_alerts_org_id ON alerts(org_id);
CREATE INDEX IF NOT EXISTS idx_alerts_dashboard_panel ON alerts(dashboard_id, panel_id);
";

const ALERT_STATE_LOG_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS alert_state_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    alert_id INTEGER NOT NULL,
    previous_state TEXT NOT NULL,
    new_state TEXT NOT NULL,
    info TEXT,
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_alert_state_log_alert ON alert_state_log(alert_id, created_at);
";

const ALERT_CHANGES_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS alert_changes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    org_id INTEGER,
    alert_id INTEGER NOT NULL,
    change_type TEXT NOT NULL,
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_alert_changes_org ON alert_changes(org_id, created_at);
";

/// SQLite-backed store for alert rules, their state log, the alert change
/// feed and dashboard metadata.
///
/// The connection is guarded by a mutex that is held for a single statement
/// or transaction at a time. Read-modify-write sequences that span several
/// calls (state transitions) are serialized by the caller.
pub struct AlertStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl AlertStore {
    /// Opens (or creates) `oxdash.db` inside `data_dir` and applies the schema.
    pub fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let db_path = data_dir.join("oxdash.db");
        let conn = Connection::open(&db_path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(DASHBOARDS_SCHEMA)?;
        conn.execute_batch(ALERTS_SCHEMA)?;
        conn.execute_batch(ALERT_STATE_LOG_SCHEMA)?;
        conn.execute_batch(ALERT_CHANGES_SCHEMA)?;

        tracing::info!(path = %db_path.display(), "Initialized alert store");
        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
        })
    }

    /// Path of the underlying database file.
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub(crate) fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

pub(crate) fn from_millis(idx: usize, ms: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Integer,
            format!("timestamp out of range: {ms}").into(),
        )
    })
}

/// Parses a text column with `FromStr`, surfacing failures as SQLite
/// conversion errors so they propagate through row mappers.
pub(crate) fn parse_column<T>(idx: usize, raw: String) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
}
