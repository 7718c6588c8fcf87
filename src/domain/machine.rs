// Machine telemetry domain models
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

pub(crate) fn gap() -> f64 {
    f64::NAN
}

// `null` reads as a gap, same as a missing field.
pub(crate) fn lenient<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MachineStatus {
    Operational,
    Warning,
    Fault,
    Idle,
    Error,
    #[default]
    #[serde(other)]
    Unknown,
}

impl MachineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MachineStatus::Operational => "operational",
            MachineStatus::Warning => "warning",
            MachineStatus::Fault => "fault",
            MachineStatus::Idle => "idle",
            MachineStatus::Error => "error",
            MachineStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for MachineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracked metric of a machine reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Power,
    Voltage,
    Temperature,
    Vibration,
}

impl Metric {
    pub fn short_name(&self) -> &'static str {
        match self {
            Metric::Power => "Power",
            Metric::Voltage => "Voltage",
            Metric::Temperature => "Temp",
            Metric::Vibration => "Vibration",
        }
    }
}

/// One machine's readings within a snapshot. Missing numeric fields are NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineReading {
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default = "gap", deserialize_with = "lenient")]
    pub power: f64,
    #[serde(default = "gap", deserialize_with = "lenient")]
    pub voltage: f64,
    #[serde(default = "gap", deserialize_with = "lenient")]
    pub temperature: f64,
    #[serde(default = "gap", deserialize_with = "lenient")]
    pub vibration: f64,
    #[serde(default)]
    pub status: MachineStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<serde_json::Value>,
}

impl MachineReading {
    pub fn new(id: impl Into<String>, status: MachineStatus) -> Self {
        Self {
            id: id.into(),
            kind: None,
            power: gap(),
            voltage: gap(),
            temperature: gap(),
            vibration: gap(),
            status,
            cycle_time: None,
            timestamp: None,
        }
    }

    pub fn metric(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Power => self.power,
            Metric::Voltage => self.voltage,
            Metric::Temperature => self.temperature,
            Metric::Vibration => self.vibration,
        }
    }

    pub fn is_operational(&self) -> bool {
        self.status == MachineStatus::Operational
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyEvent {
    #[serde(rename = "id", alias = "machineId", alias = "machine_id")]
    pub machine_id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default = "gap", deserialize_with = "lenient")]
    pub value: f64,
    /// Seconds since epoch. Only present on historical events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationEvent {
    pub severity: Severity,
    pub msg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

/// One telemetry payload covering all tracked machines at one instant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub machines: Vec<MachineReading>,
    #[serde(default)]
    pub anomalies: Vec<AnomalyEvent>,
    #[serde(default)]
    pub recommendations: Vec<RecommendationEvent>,
}

impl Snapshot {
    pub fn machine(&self, id: &str) -> Option<&MachineReading> {
        self.machines.iter().find(|m| m.id == id)
    }
}
