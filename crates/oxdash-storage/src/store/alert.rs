use chrono::Utc;
use oxdash_common::types::{
    AlertChangeType, AlertId, AlertRule, DashboardId, NewAlertRule, OrgId, PanelId,
};
use rusqlite::{params, OptionalExtension, Row};

use super::{change, from_millis, parse_column, to_millis, AlertStore};
use crate::error::{Result, StorageError};

const ALERT_COLUMNS: &str = "id, org_id, dashboard_id, panel_id, query, query_ref_id, query_range, \
     aggregator, warn_level, crit_level, interval_secs, title, description, state, \
     created_at, updated_at";

pub(crate) fn row_to_alert(row: &Row<'_>) -> rusqlite::Result<AlertRule> {
    let org_id: Option<i64> = row.get(1)?;
    Ok(AlertRule {
        id: row.get(0)?,
        org_id: org_id.and_then(OrgId::from_legacy),
        dashboard_id: row.get(2)?,
        panel_id: row.get(3)?,
        query: row.get(4)?,
        query_ref_id: row.get(5)?,
        query_range: row.get(6)?,
        aggregator: row.get(7)?,
        warn_level: row.get(8)?,
        crit_level: row.get(9)?,
        interval: row.get(10)?,
        title: row.get(11)?,
        description: row.get(12)?,
        state: parse_column(13, row.get(13)?)?,
        created_at: from_millis(14, row.get(14)?)?,
        updated_at: from_millis(15, row.get(15)?)?,
    })
}

impl AlertStore {
    /// Inserts a new alert rule and records a `CREATED` change in the same
    /// transaction.
    pub fn insert_alert(&self, new: &NewAlertRule) -> Result<AlertRule> {
        let now = to_millis(Utc::now());
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO alerts (org_id, dashboard_id, panel_id, query, query_ref_id, query_range,
                                 aggregator, warn_level, crit_level, interval_secs, title,
                                 description, state, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14)",
            params![
                new.org_id.map(|o| o.0),
                new.dashboard_id,
                new.panel_id,
                new.query,
                new.query_ref_id,
                new.query_range,
                new.aggregator,
                new.warn_level,
                new.crit_level,
                new.interval,
                new.title,
                new.description,
                new.state.as_str(),
                now,
            ],
        )?;
        let id = tx.last_insert_rowid();
        change::insert_change(&tx, new.org_id, id, AlertChangeType::Created, now)?;
        let alert = tx
            .query_row(
                &format!("SELECT {ALERT_COLUMNS} FROM alerts WHERE id = ?1"),
                params![id],
                row_to_alert,
            )
            .optional()?
            .ok_or(StorageError::InsertReadback { entity: "alert" })?;
        tx.commit()?;

        tracing::info!(alert_id = id, dashboard_id = new.dashboard_id, "Alert created");
        Ok(alert)
    }

    pub fn get_alert_by_id(&self, id: AlertId) -> Result<Option<AlertRule>> {
        let conn = self.conn();
        let alert = conn
            .query_row(
                &format!("SELECT {ALERT_COLUMNS} FROM alerts WHERE id = ?1"),
                params![id],
                row_to_alert,
            )
            .optional()?;
        Ok(alert)
    }

    /// Lists the alerts owned by `org_id`. Callers must not rely on ordering.
    pub fn list_alerts_by_org(&self, org_id: OrgId) -> Result<Vec<AlertRule>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ALERT_COLUMNS} FROM alerts WHERE org_id = ?1"
        ))?;
        let rows = stmt
            .query_map(params![org_id.0], row_to_alert)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn list_alerts_by_dashboard(&self, dashboard_id: DashboardId) -> Result<Vec<AlertRule>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ALERT_COLUMNS} FROM alerts WHERE dashboard_id = ?1 ORDER BY id"
        ))?;
        let rows = stmt
            .query_map(params![dashboard_id], row_to_alert)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn list_alerts_by_panel(
        &self,
        dashboard_id: DashboardId,
        panel_id: PanelId,
    ) -> Result<Vec<AlertRule>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ALERT_COLUMNS} FROM alerts WHERE dashboard_id = ?1 AND panel_id = ?2 ORDER BY id"
        ))?;
        let rows = stmt
            .query_map(params![dashboard_id, panel_id], row_to_alert)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Deletes an alert rule. Returns `false` when no such alert exists.
    ///
    /// State log entries are kept for audit; a `DELETED` change is recorded
    /// in the same transaction as the delete.
    pub fn delete_alert(&self, id: AlertId) -> Result<bool> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let owner: Option<Option<i64>> = tx
            .query_row(
                "SELECT org_id FROM alerts WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(owner) = owner else {
            return Ok(false);
        };
        tx.execute("DELETE FROM alerts WHERE id = ?1", params![id])?;
        change::insert_change(
            &tx,
            owner.and_then(OrgId::from_legacy),
            id,
            AlertChangeType::Deleted,
            to_millis(Utc::now()),
        )?;
        tx.commit()?;

        tracing::info!(alert_id = id, "Alert deleted");
        Ok(true)
    }
}
