// Endpoint contract for the dashboard's request/response calls
use crate::domain::machine::{AnomalyEvent, Metric};
use crate::domain::session::ControlAction;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not decode response: {0}")]
    Decode(String),
}

/// One machine row of the historical endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HistoricalReading {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(
        default = "crate::domain::machine::gap",
        deserialize_with = "crate::domain::machine::lenient"
    )]
    pub power: f64,
    #[serde(
        default = "crate::domain::machine::gap",
        deserialize_with = "crate::domain::machine::lenient"
    )]
    pub voltage: f64,
    #[serde(
        default = "crate::domain::machine::gap",
        deserialize_with = "crate::domain::machine::lenient"
    )]
    pub temperature: f64,
    #[serde(
        default = "crate::domain::machine::gap",
        deserialize_with = "crate::domain::machine::lenient"
    )]
    pub vibration: f64,
    #[serde(
        default = "crate::domain::machine::gap",
        deserialize_with = "crate::domain::machine::lenient"
    )]
    pub timestamp: f64,
}

impl HistoricalReading {
    pub fn metric(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Power => self.power,
            Metric::Voltage => self.voltage,
            Metric::Temperature => self.temperature,
            Metric::Vibration => self.vibration,
        }
    }
}

/// Response of the historical bulk endpoint: one row of readings per tick.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HistoricalData {
    #[serde(default)]
    pub data: Vec<Vec<HistoricalReading>>,
    #[serde(default)]
    pub anomalies: Vec<AnomalyEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlCommand {
    pub machine_id: String,
    pub action: ControlAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ControlCommand {
    pub fn new(machine_id: impl Into<String>, action: ControlAction) -> Self {
        Self {
            machine_id: machine_id.into(),
            action,
            message: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptRequest {
    pub prompt: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditKind {
    Login,
    Logout,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event: AuditKind,
    pub user: String,
    pub details: String,
}

#[async_trait]
pub trait DashboardApi: Send + Sync {
    /// One-shot history used to hydrate the trend chart at startup
    async fn fetch_historical(&self) -> Result<HistoricalData, ApiError>;

    async fn send_control(&self, command: &ControlCommand) -> Result<ControlResponse, ApiError>;

    /// Free-text question/command
    async fn ask(&self, request: &PromptRequest) -> Result<PromptResponse, ApiError>;

    async fn audit(&self, event: &AuditEvent) -> Result<(), ApiError>;
}
