use chrono::Utc;
use oxdash_common::types::{AlertId, AlertStateTransition, OrgId, UpdateAlertStateCommand};
use oxdash_storage::{AlertStore, StorageError};
use std::sync::Arc;

use crate::error::{AlertError, Result};
use crate::guard::AccessGuard;
use crate::locks::AlertLocks;

/// Validates and commits requested alert state changes.
///
/// Every accepted request produces exactly one state log entry. Requests
/// for the same alert are serialized through [`AlertLocks`], so each entry's
/// `previous_state` is the state committed by the entry before it.
pub struct StateTransitionService {
    store: Arc<AlertStore>,
    guard: AccessGuard,
    locks: Arc<AlertLocks>,
    max_info_len: usize,
}

impl StateTransitionService {
    pub fn new(
        store: Arc<AlertStore>,
        guard: AccessGuard,
        locks: Arc<AlertLocks>,
        max_info_len: usize,
    ) -> Self {
        Self {
            store,
            guard,
            locks,
            max_info_len,
        }
    }

    /// Moves an alert to `cmd.new_state` on behalf of `caller_org`.
    ///
    /// `path_alert_id` is the id the caller addressed; it must equal
    /// `cmd.alert_id`, otherwise the request is rejected before any lookup.
    pub async fn set_state(
        &self,
        caller_org: OrgId,
        path_alert_id: AlertId,
        cmd: UpdateAlertStateCommand,
    ) -> Result<AlertStateTransition> {
        if path_alert_id != cmd.alert_id {
            return Err(AlertError::AlertIdMismatch {
                path: path_alert_id,
                payload: cmd.alert_id,
            });
        }
        if let Some(info) = cmd.info.as_deref() {
            if info.chars().count() > self.max_info_len {
                return Err(AlertError::BadRequest(format!(
                    "info exceeds {} characters",
                    self.max_info_len
                )));
            }
        }

        let alert_id = cmd.alert_id;
        let _scope = self.locks.acquire(alert_id).await;

        let mut alert = self.guard.authorize_state_update(caller_org, alert_id)?;
        let previous = alert.state;
        // Log timestamps never go backwards for one alert.
        let at = Utc::now().max(alert.updated_at);

        let entry = self
            .store
            .commit_state_transition(alert_id, previous, cmd.new_state, cmd.info.as_deref(), at)
            .map_err(|e| match e {
                StorageError::NotFound { .. } => AlertError::NotFound(alert_id),
                other => other.into(),
            })?;

        alert.state = entry.new_state;
        alert.updated_at = entry.timestamp;

        tracing::info!(
            alert_id,
            org = %caller_org,
            previous = %previous,
            new = %entry.new_state,
            "Alert state updated"
        );

        Ok(AlertStateTransition {
            alert,
            log_entry: entry,
        })
    }
}
