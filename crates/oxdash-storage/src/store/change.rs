use oxdash_common::types::{AlertChange, AlertChangeType, AlertId, OrgId};
use rusqlite::{params, Row, Transaction};

use super::{from_millis, parse_column, AlertStore};
use crate::error::Result;

fn row_to_change(row: &Row<'_>) -> rusqlite::Result<AlertChange> {
    let org_id: Option<i64> = row.get(1)?;
    Ok(AlertChange {
        id: row.get(0)?,
        org_id: org_id.and_then(OrgId::from_legacy),
        alert_id: row.get(2)?,
        change_type: parse_column(3, row.get(3)?)?,
        created_at: from_millis(4, row.get(4)?)?,
    })
}

pub(crate) fn insert_change(
    tx: &Transaction<'_>,
    org_id: Option<OrgId>,
    alert_id: AlertId,
    change_type: AlertChangeType,
    created_at_ms: i64,
) -> rusqlite::Result<()> {
    tx.execute(
        "INSERT INTO alert_changes (org_id, alert_id, change_type, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            org_id.map(|o| o.0),
            alert_id,
            change_type.as_str(),
            created_at_ms
        ],
    )?;
    Ok(())
}

impl AlertStore {
    /// Most recent alert changes for an organization, newest first.
    pub fn list_alert_changes(&self, org_id: OrgId, limit: usize) -> Result<Vec<AlertChange>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, org_id, alert_id, change_type, created_at
             FROM alert_changes
             WHERE org_id = ?1
             ORDER BY created_at DESC, id DESC
             LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![org_id.0, limit as i64], row_to_change)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}
