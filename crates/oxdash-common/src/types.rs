use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type AlertId = i64;
pub type DashboardId = i64;
pub type PanelId = i64;

/// Tenant (organization) identifier.
///
/// Ownership of records is expressed as `Option<OrgId>`; a record with no
/// owner is represented by `None`, never by a zero id.
///
/// # Examples
///
/// ```
/// use oxdash_common::types::OrgId;
///
/// assert_eq!(OrgId::from_legacy(0), None);
/// assert_eq!(OrgId::from_legacy(7), Some(OrgId(7)));
/// assert_eq!(OrgId(7).to_string(), "7");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrgId(pub i64);

impl OrgId {
    /// Maps a stored owner column to an optional owner. Zero and negative
    /// values are the legacy "no owner" sentinel.
    pub fn from_legacy(raw: i64) -> Option<OrgId> {
        if raw > 0 {
            Some(OrgId(raw))
        } else {
            None
        }
    }
}

impl std::fmt::Display for OrgId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for OrgId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<i64>() {
            Ok(v) if v > 0 => Ok(OrgId(v)),
            Ok(v) => Err(format!("org id must be positive: {v}")),
            Err(_) => Err(format!("invalid org id: {s}")),
        }
    }
}

/// Current state of an alert rule.
///
/// Any state may move to any other; transitions are requests, not a
/// workflow.
///
/// # Examples
///
/// ```
/// use oxdash_common::types::AlertState;
///
/// let state: AlertState = "EXECUTION_ERROR".parse().unwrap();
/// assert_eq!(state, AlertState::ExecutionError);
/// assert_eq!(AlertState::NoData.to_string(), "NODATA");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertState {
    #[default]
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "WARN")]
    Warn,
    #[serde(rename = "CRIT")]
    Crit,
    #[serde(rename = "NODATA")]
    NoData,
    #[serde(rename = "PAUSED")]
    Paused,
    #[serde(rename = "EXECUTION_ERROR")]
    ExecutionError,
}

impl AlertState {
    pub const ALL: [AlertState; 6] = [
        AlertState::Ok,
        AlertState::Warn,
        AlertState::Crit,
        AlertState::NoData,
        AlertState::Paused,
        AlertState::ExecutionError,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertState::Ok => "OK",
            AlertState::Warn => "WARN",
            AlertState::Crit => "CRIT",
            AlertState::NoData => "NODATA",
            AlertState::Paused => "PAUSED",
            AlertState::ExecutionError => "EXECUTION_ERROR",
        }
    }
}

impl std::fmt::Display for AlertState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AlertState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "OK" => Ok(AlertState::Ok),
            "WARN" => Ok(AlertState::Warn),
            "CRIT" => Ok(AlertState::Crit),
            "NODATA" => Ok(AlertState::NoData),
            "PAUSED" => Ok(AlertState::Paused),
            "EXECUTION_ERROR" => Ok(AlertState::ExecutionError),
            _ => Err(format!("unknown alert state: {s}")),
        }
    }
}

/// A persisted threshold rule bound to a dashboard panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    pub id: AlertId,
    /// Owning organization; `None` for legacy/system records.
    pub org_id: Option<OrgId>,
    pub dashboard_id: DashboardId,
    pub panel_id: PanelId,
    pub query: String,
    pub query_ref_id: String,
    /// Query range in seconds.
    pub query_range: i64,
    pub aggregator: String,
    pub warn_level: f64,
    pub crit_level: f64,
    /// Evaluation period in seconds.
    pub interval: i64,
    pub title: String,
    pub description: String,
    pub state: AlertState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to create an alert rule out-of-band.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAlertRule {
    #[serde(default)]
    pub org_id: Option<OrgId>,
    pub dashboard_id: DashboardId,
    pub panel_id: PanelId,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub query_ref_id: String,
    #[serde(default)]
    pub query_range: i64,
    #[serde(default)]
    pub aggregator: String,
    #[serde(default)]
    pub warn_level: f64,
    #[serde(default)]
    pub crit_level: f64,
    #[serde(default = "default_interval")]
    pub interval: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub state: AlertState,
}

fn default_interval() -> i64 {
    60
}

/// An immutable record of one accepted state transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertStateLogEntry {
    pub id: i64,
    pub alert_id: AlertId,
    pub previous_state: AlertState,
    pub new_state: AlertState,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
}

/// Request to move an alert to a new state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateAlertStateCommand {
    pub alert_id: AlertId,
    pub new_state: AlertState,
    #[serde(default)]
    pub info: Option<String>,
}

/// Result of an accepted state transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertStateTransition {
    pub alert: AlertRule,
    pub log_entry: AlertStateLogEntry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertChangeType {
    Created,
    Deleted,
}

impl AlertChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertChangeType::Created => "CREATED",
            AlertChangeType::Deleted => "DELETED",
        }
    }
}

impl std::str::FromStr for AlertChangeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(AlertChangeType::Created),
            "DELETED" => Ok(AlertChangeType::Deleted),
            _ => Err(format!("unknown alert change type: {s}")),
        }
    }
}

/// Entry of the per-organization alert change feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertChange {
    pub id: i64,
    pub org_id: Option<OrgId>,
    pub alert_id: AlertId,
    pub change_type: AlertChangeType,
    pub created_at: DateTime<Utc>,
}

/// Dashboard metadata as returned by the dashboard collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub id: DashboardId,
    #[serde(default)]
    pub org_id: Option<OrgId>,
    pub slug: String,
    #[serde(default)]
    pub title: String,
}

impl Dashboard {
    /// Display URI for the dashboard, e.g. `db/production-overview`.
    pub fn uri(&self) -> String {
        format!("db/{}", self.slug)
    }
}

/// An alert enriched with display data derived from its dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecoratedAlert {
    #[serde(flatten)]
    pub alert: AlertRule,
    /// `db/<slug>`, or empty when the dashboard could not be resolved.
    pub dashboard_uri: String,
}
