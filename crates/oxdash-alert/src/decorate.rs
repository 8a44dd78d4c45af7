use oxdash_common::types::{AlertRule, Dashboard, DashboardId, DecoratedAlert};
use oxdash_storage::AlertStore;
use std::collections::HashMap;

use crate::error::{AlertError, Result};

/// Source of dashboard metadata used to build display URIs.
///
/// Implementations receive every id needed for one listing in a single
/// call. Unknown ids are simply left out of the result.
pub trait DashboardResolver: Send + Sync {
    fn resolve(&self, ids: &[DashboardId]) -> anyhow::Result<Vec<Dashboard>>;
}

impl DashboardResolver for AlertStore {
    fn resolve(&self, ids: &[DashboardId]) -> anyhow::Result<Vec<Dashboard>> {
        Ok(self.get_dashboards_by_ids(ids)?)
    }
}

/// Attaches `dashboard_uri` (`db/<slug>`) to each alert.
///
/// Distinct dashboard ids are resolved with one resolver call. Alerts whose
/// dashboard is not returned keep an empty URI. When the resolver returns
/// the same id more than once, the first occurrence wins.
pub fn decorate(
    alerts: Vec<AlertRule>,
    resolver: &dyn DashboardResolver,
) -> Result<Vec<DecoratedAlert>> {
    if alerts.is_empty() {
        return Ok(Vec::new());
    }

    let mut ids: Vec<DashboardId> = alerts.iter().map(|a| a.dashboard_id).collect();
    ids.sort_unstable();
    ids.dedup();

    let dashboards = resolver.resolve(&ids).map_err(AlertError::Internal)?;
    let mut uris: HashMap<DashboardId, String> = HashMap::with_capacity(dashboards.len());
    for dashboard in &dashboards {
        uris.entry(dashboard.id).or_insert_with(|| dashboard.uri());
    }

    Ok(alerts
        .into_iter()
        .map(|alert| {
            let dashboard_uri = uris.get(&alert.dashboard_id).cloned().unwrap_or_default();
            DecoratedAlert {
                alert,
                dashboard_uri,
            }
        })
        .collect())
}
