use chrono::Utc;
use oxdash_common::types::{Dashboard, DashboardId, OrgId};
use rusqlite::{params, params_from_iter, Row};

use super::{to_millis, AlertStore};
use crate::error::Result;

fn row_to_dashboard(row: &Row<'_>) -> rusqlite::Result<Dashboard> {
    let org_id: Option<i64> = row.get(1)?;
    Ok(Dashboard {
        id: row.get(0)?,
        org_id: org_id.and_then(OrgId::from_legacy),
        slug: row.get(2)?,
        title: row.get(3)?,
    })
}

impl AlertStore {
    /// Inserts or replaces dashboard metadata under the dashboard's own id.
    pub fn upsert_dashboard(&self, dashboard: &Dashboard) -> Result<()> {
        let now = to_millis(Utc::now());
        let conn = self.conn();
        conn.execute(
            "INSERT INTO dashboards (id, org_id, slug, title, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             ON CONFLICT(id) DO UPDATE SET
                org_id = excluded.org_id,
                slug = excluded.slug,
                title = excluded.title,
                updated_at = excluded.updated_at",
            params![
                dashboard.id,
                dashboard.org_id.map(|o| o.0),
                dashboard.slug,
                dashboard.title,
                now
            ],
        )?;
        Ok(())
    }

    /// Fetches the dashboards whose ids appear in `ids`, in one query.
    /// Unknown ids are silently absent from the result.
    pub fn get_dashboards_by_ids(&self, ids: &[DashboardId]) -> Result<Vec<Dashboard>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT id, org_id, slug, title FROM dashboards WHERE id IN ({placeholders}) ORDER BY id"
        ))?;
        let rows = stmt
            .query_map(params_from_iter(ids.iter()), row_to_dashboard)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}
