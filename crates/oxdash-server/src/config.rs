use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Request header carrying the caller's organization id.
    #[serde(default = "default_org_header")]
    pub org_header: String,
    /// CORS allowed origins; empty allows any origin (development mode).
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,
    #[serde(default)]
    pub state_log: StateLogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateLogConfig {
    /// Maximum length of the `info` annotation accepted on a state update.
    #[serde(default = "default_max_info_len")]
    pub max_info_len: usize,
    /// Page size of the alert change feed when the request gives none.
    #[serde(default = "default_changes_limit")]
    pub default_changes_limit: usize,
    #[serde(default = "default_max_changes_limit")]
    pub max_changes_limit: usize,
}

impl Default for StateLogConfig {
    fn default() -> Self {
        Self {
            max_info_len: default_max_info_len(),
            default_changes_limit: default_changes_limit(),
            max_changes_limit: default_max_changes_limit(),
        }
    }
}

// ---- Seed file types (used by `init-alerts` CLI subcommand) ----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsSeedFile {
    #[serde(default)]
    pub dashboards: Vec<oxdash_common::types::Dashboard>,
    #[serde(default)]
    pub alerts: Vec<oxdash_common::types::NewAlertRule>,
}

fn default_http_port() -> u16 {
    8080
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_org_header() -> String {
    "x-org-id".to_string()
}

fn default_max_info_len() -> usize {
    4096
}

fn default_changes_limit() -> usize {
    100
}

fn default_max_changes_limit() -> usize {
    1000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
            data_dir: default_data_dir(),
            org_header: default_org_header(),
            cors_allowed_origins: Vec::new(),
            state_log: StateLogConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn service_options(&self) -> oxdash_alert::AlertServiceOptions {
        oxdash_alert::AlertServiceOptions {
            max_info_len: self.state_log.max_info_len,
            default_changes_limit: self.state_log.default_changes_limit,
            max_changes_limit: self.state_log.max_changes_limit,
        }
    }
}
