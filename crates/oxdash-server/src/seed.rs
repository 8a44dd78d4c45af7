use crate::config::AlertsSeedFile;
use oxdash_storage::AlertStore;
use std::path::Path;

/// Counts reported by [`init_from_seed_file`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub dashboards: usize,
    pub alerts: usize,
}

/// Loads dashboards and alert rules from a JSON seed file.
///
/// Dashboards are upserted by id, so running the seed twice refreshes their
/// slugs. Alerts are always inserted as new rules.
pub fn init_from_seed_file(store: &AlertStore, seed_path: &Path) -> anyhow::Result<SeedSummary> {
    let seed_content = std::fs::read_to_string(seed_path).map_err(|e| {
        anyhow::anyhow!("Failed to read seed file '{}': {}", seed_path.display(), e)
    })?;
    let seed: AlertsSeedFile = serde_json::from_str(&seed_content).map_err(|e| {
        anyhow::anyhow!("Failed to parse seed file '{}': {}", seed_path.display(), e)
    })?;

    let mut summary = SeedSummary::default();
    for dashboard in &seed.dashboards {
        store.upsert_dashboard(dashboard)?;
        summary.dashboards += 1;
    }
    for alert in &seed.alerts {
        let created = store.insert_alert(alert)?;
        tracing::debug!(alert_id = created.id, title = %created.title, "Seeded alert");
        summary.alerts += 1;
    }

    tracing::info!(
        dashboards = summary.dashboards,
        alerts = summary.alerts,
        "Alert seed applied"
    );
    Ok(summary)
}
