use oxdash_common::types::{AlertId, AlertRule, OrgId};
use oxdash_storage::AlertStore;
use std::sync::Arc;

use crate::error::{AlertError, Result};

/// How ownership is enforced for a given access path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnershipRule {
    /// The requester must be the owning organization. Unowned alerts are
    /// denied to everyone.
    Strict,
    /// As `Strict`, except that alerts without an owner are open to any
    /// organization. Used by state updates only.
    AllowUnowned,
}

/// Checks `requester` against the owner of `alert` under `rule`.
///
/// # Examples
///
/// ```
/// use oxdash_alert::guard::{check_ownership, OwnershipRule};
/// use oxdash_common::types::OrgId;
///
/// assert!(check_ownership(Some(OrgId(1)), OrgId(1), OwnershipRule::Strict));
/// assert!(!check_ownership(Some(OrgId(1)), OrgId(2), OwnershipRule::AllowUnowned));
/// assert!(!check_ownership(None, OrgId(2), OwnershipRule::Strict));
/// assert!(check_ownership(None, OrgId(2), OwnershipRule::AllowUnowned));
/// ```
pub fn check_ownership(owner: Option<OrgId>, requester: OrgId, rule: OwnershipRule) -> bool {
    match owner {
        Some(owner) => owner == requester,
        None => rule == OwnershipRule::AllowUnowned,
    }
}

/// Resolves alerts and verifies tenant ownership before any operation
/// touches them. Read-only; has no side effects.
#[derive(Clone)]
pub struct AccessGuard {
    store: Arc<AlertStore>,
}

impl AccessGuard {
    pub fn new(store: Arc<AlertStore>) -> Self {
        Self { store }
    }

    /// Strict authorization for reads and deletes.
    pub fn authorize(&self, requester: OrgId, alert_id: AlertId) -> Result<AlertRule> {
        self.authorize_with(requester, alert_id, OwnershipRule::Strict)
    }

    /// Authorization for state updates: unowned alerts are accepted from
    /// any organization.
    pub fn authorize_state_update(&self, requester: OrgId, alert_id: AlertId) -> Result<AlertRule> {
        self.authorize_with(requester, alert_id, OwnershipRule::AllowUnowned)
    }

    fn authorize_with(
        &self,
        requester: OrgId,
        alert_id: AlertId,
        rule: OwnershipRule,
    ) -> Result<AlertRule> {
        let alert = self
            .store
            .get_alert_by_id(alert_id)?
            .ok_or(AlertError::NotFound(alert_id))?;

        if !check_ownership(alert.org_id, requester, rule) {
            tracing::warn!(
                alert_id,
                requester = %requester,
                ?rule,
                "Alert access denied"
            );
            return Err(AlertError::Forbidden(alert_id));
        }
        Ok(alert)
    }
}
