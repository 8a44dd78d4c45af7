use oxdash_common::types::{
    AlertChange, AlertId, AlertRule, AlertStateLogEntry, AlertStateTransition, DashboardId,
    DecoratedAlert, OrgId, PanelId, UpdateAlertStateCommand,
};
use oxdash_storage::AlertStore;
use std::sync::Arc;

use crate::decorate::{decorate, DashboardResolver};
use crate::error::{AlertError, Result};
use crate::guard::AccessGuard;
use crate::locks::AlertLocks;
use crate::transition::StateTransitionService;

/// Tunables for [`AlertService`].
#[derive(Debug, Clone)]
pub struct AlertServiceOptions {
    /// Maximum length (in characters) of the `info` annotation on a state
    /// update.
    pub max_info_len: usize,
    /// Page size of the change feed when the caller gives none.
    pub default_changes_limit: usize,
    /// Upper bound on the change feed page size.
    pub max_changes_limit: usize,
}

impl Default for AlertServiceOptions {
    fn default() -> Self {
        Self {
            max_info_len: 4096,
            default_changes_limit: 100,
            max_changes_limit: 1000,
        }
    }
}

/// Entry point for every alert operation exposed to the API layer.
pub struct AlertService {
    store: Arc<AlertStore>,
    guard: AccessGuard,
    locks: Arc<AlertLocks>,
    transitions: StateTransitionService,
    resolver: Arc<dyn DashboardResolver>,
    options: AlertServiceOptions,
}

impl AlertService {
    pub fn new(store: Arc<AlertStore>, resolver: Arc<dyn DashboardResolver>) -> Self {
        Self::with_options(store, resolver, AlertServiceOptions::default())
    }

    pub fn with_options(
        store: Arc<AlertStore>,
        resolver: Arc<dyn DashboardResolver>,
        options: AlertServiceOptions,
    ) -> Self {
        let guard = AccessGuard::new(store.clone());
        let locks = Arc::new(AlertLocks::new());
        let transitions = StateTransitionService::new(
            store.clone(),
            guard.clone(),
            locks.clone(),
            options.max_info_len,
        );
        Self {
            store,
            guard,
            locks,
            transitions,
            resolver,
            options,
        }
    }

    pub fn store(&self) -> &Arc<AlertStore> {
        &self.store
    }

    pub fn locks(&self) -> &AlertLocks {
        &self.locks
    }

    /// Alerts owned by `org`, decorated with their dashboard URI.
    pub fn list_alerts(&self, org: OrgId) -> Result<Vec<DecoratedAlert>> {
        let alerts = self.store.list_alerts_by_org(org)?;
        decorate(alerts, self.resolver.as_ref())
    }

    pub fn get_alert(&self, org: OrgId, alert_id: AlertId) -> Result<AlertRule> {
        self.guard.authorize(org, alert_id)
    }

    /// Deletes an alert owned by `org` and echoes its id.
    pub async fn delete_alert(&self, org: OrgId, alert_id: AlertId) -> Result<AlertId> {
        if alert_id <= 0 {
            return Err(AlertError::BadRequest(format!(
                "invalid alert id: {alert_id}"
            )));
        }

        let _scope = self.locks.acquire(alert_id).await;
        self.guard.authorize(org, alert_id)?;
        if !self.store.delete_alert(alert_id)? {
            return Err(AlertError::NotFound(alert_id));
        }
        Ok(alert_id)
    }

    /// State log of an alert, oldest first. Ownership is not checked on
    /// this path; an unknown alert yields an empty log.
    pub fn get_state_log(&self, alert_id: AlertId) -> Result<Vec<AlertStateLogEntry>> {
        Ok(self.store.list_state_log(alert_id)?)
    }

    pub async fn set_state(
        &self,
        org: OrgId,
        path_alert_id: AlertId,
        cmd: UpdateAlertStateCommand,
    ) -> Result<AlertStateTransition> {
        self.transitions.set_state(org, path_alert_id, cmd).await
    }

    pub fn list_for_dashboard(&self, dashboard_id: DashboardId) -> Result<Vec<AlertRule>> {
        Ok(self.store.list_alerts_by_dashboard(dashboard_id)?)
    }

    pub fn list_for_panel(
        &self,
        dashboard_id: DashboardId,
        panel_id: PanelId,
    ) -> Result<Vec<AlertRule>> {
        Ok(self.store.list_alerts_by_panel(dashboard_id, panel_id)?)
    }

    /// Most recent alert creations and deletions for `org`, newest first.
    pub fn list_changes(&self, org: OrgId, limit: Option<usize>) -> Result<Vec<AlertChange>> {
        let limit = limit
            .unwrap_or(self.options.default_changes_limit)
            .clamp(1, self.options.max_changes_limit);
        Ok(self.store.list_alert_changes(org, limit)?)
    }
}
