use crate::application::dashboard_controller::DashboardOptions;
use crate::domain::indicators::{EfficiencyStrategy, HealthStrategy};
use crate::domain::label::{LabelFormatError, LabelFormatter, DEFAULT_LABEL_FORMAT};
use crate::domain::machine::Metric;
use crate::domain::series::DEFAULT_CAPACITY;
use crate::domain::session::Role;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub upstream: UpstreamSettings,
    #[serde(default)]
    pub dashboard: DashboardSettings,
    #[serde(default)]
    pub roles: Vec<RoleAssignment>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct UpstreamSettings {
    pub base_url: String,
    #[serde(default = "default_stream_path")]
    pub stream_path: String,
    #[serde(default = "default_historical_path")]
    pub historical_path: String,
    #[serde(default = "default_control_path")]
    pub control_path: String,
    #[serde(default = "default_prompt_path")]
    pub prompt_path: String,
    #[serde(default = "default_audit_path")]
    pub audit_path: String,
    #[serde(default = "default_reconnect_secs")]
    pub reconnect_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl UpstreamSettings {
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardSettings {
    #[serde(default = "default_machines")]
    pub machines: Vec<String>,
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default = "default_trend_metric")]
    pub trend_metric: Metric,
    #[serde(default)]
    pub efficiency: EfficiencyStrategy,
    #[serde(default)]
    pub health: HealthStrategy,
    #[serde(default = "default_label_format")]
    pub label_format: String,
    #[serde(default)]
    pub default_role: Role,
    /// Render targets present on the page. Defaults to the standard set
    /// for the configured machines.
    #[serde(default)]
    pub targets: Option<Vec<String>>,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            machines: default_machines(),
            capacity: default_capacity(),
            trend_metric: default_trend_metric(),
            efficiency: EfficiencyStrategy::default(),
            health: HealthStrategy::default(),
            label_format: default_label_format(),
            default_role: Role::default(),
            targets: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RoleAssignment {
    pub email: String,
    pub role: Role,
}

impl Settings {
    pub fn dashboard_options(&self) -> Result<DashboardOptions, LabelFormatError> {
        Ok(DashboardOptions {
            machines: self.dashboard.machines.clone(),
            capacity: self.dashboard.capacity,
            trend_metric: self.dashboard.trend_metric,
            efficiency: self.dashboard.efficiency,
            health: self.dashboard.health,
            labels: LabelFormatter::parse(&self.dashboard.label_format)?,
        })
    }

    pub fn role_map(&self) -> HashMap<String, Role> {
        self.roles
            .iter()
            .map(|r| (r.email.clone(), r.role))
            .collect()
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_stream_path() -> String {
    "/api/stream".to_string()
}

fn default_historical_path() -> String {
    "/api/historical".to_string()
}

fn default_control_path() -> String {
    "/api/control".to_string()
}

fn default_prompt_path() -> String {
    "/api/gemma".to_string()
}

fn default_audit_path() -> String {
    "/api/audit".to_string()
}

fn default_reconnect_secs() -> u64 {
    5
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_machines() -> Vec<String> {
    vec!["M1".to_string(), "M2".to_string()]
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_trend_metric() -> Metric {
    Metric::Temperature
}

fn default_label_format() -> String {
    DEFAULT_LABEL_FORMAT.to_string()
}

/// Loads `config/dashboard.*`, overridden by `EVTWIN__SECTION__KEY` variables.
pub fn load_settings() -> anyhow::Result<Settings> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/dashboard"))
        .add_source(
            config::Environment::with_prefix("EVTWIN")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}
