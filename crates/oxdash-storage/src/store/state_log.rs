use chrono::{DateTime, Utc};
use oxdash_common::types::{AlertId, AlertState, AlertStateLogEntry};
use rusqlite::{params, Row};

use super::{from_millis, parse_column, to_millis, AlertStore};
use crate::error::{Result, StorageError};

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<AlertStateLogEntry> {
    Ok(AlertStateLogEntry {
        id: row.get(0)?,
        alert_id: row.get(1)?,
        previous_state: parse_column(2, row.get(2)?)?,
        new_state: parse_column(3, row.get(3)?)?,
        info: row.get(4)?,
        timestamp: from_millis(5, row.get(5)?)?,
    })
}

impl AlertStore {
    /// State log of an alert in commit order (timestamp ascending, ties by
    /// insertion sequence). Empty when the alert never transitioned or does
    /// not exist.
    pub fn list_state_log(&self, alert_id: AlertId) -> Result<Vec<AlertStateLogEntry>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, alert_id, previous_state, new_state, info, created_at
             FROM alert_state_log
             WHERE alert_id = ?1
             ORDER BY created_at ASC, id ASC",
        )?;
        let rows = stmt
            .query_map(params![alert_id], row_to_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Moves an alert from `expected` to `new_state` and appends the matching
    /// log entry as one transaction.
    ///
    /// The update is a compare-and-set on the current state: if the stored
    /// state is no longer `expected`, nothing is written and
    /// [`StorageError::StaleState`] is returned. Any failure rolls back both
    /// the state change and the log append.
    pub fn commit_state_transition(
        &self,
        alert_id: AlertId,
        expected: AlertState,
        new_state: AlertState,
        info: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<AlertStateLogEntry> {
        let at_ms = to_millis(at);
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let updated = tx.execute(
            "UPDATE alerts SET state = ?1, updated_at = ?2 WHERE id = ?3 AND state = ?4",
            params![new_state.as_str(), at_ms, alert_id, expected.as_str()],
        )?;
        if updated == 0 {
            let exists: bool = tx.query_row(
                "SELECT COUNT(*) > 0 FROM alerts WHERE id = ?1",
                params![alert_id],
                |row| row.get(0),
            )?;
            return Err(if exists {
                StorageError::StaleState {
                    alert_id,
                    expected: expected.to_string(),
                }
            } else {
                StorageError::NotFound {
                    entity: "alert",
                    id: alert_id.to_string(),
                }
            });
        }

        tx.execute(
            "INSERT INTO alert_state_log (alert_id, previous_state, new_state, info, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![alert_id, expected.as_str(), new_state.as_str(), info, at_ms],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        tracing::debug!(
            alert_id,
            previous = %expected,
            new = %new_state,
            log_id = id,
            "Alert state transition committed"
        );

        Ok(AlertStateLogEntry {
            id,
            alert_id,
            previous_state: expected,
            new_state,
            timestamp: from_millis(0, at_ms)?,
            info: info.map(str::to_string),
        })
    }
}
