// Derived indicators - efficiency and health scores on a 0..=100 scale
use super::machine::MachineReading;
use serde::{Deserialize, Serialize};

/// Weights by machine position: primary, secondary.
pub const EFFICIENCY_WEIGHTS: [f64; 2] = [0.7, 0.3];
pub const VIBRATION_SCALE: f64 = 50.0;
pub const POWER_SCALE: f64 = 20.0 / 1000.0;
pub const TEMPERATURE_SCALE: f64 = 0.7;
pub const HEALTHY_BASELINE: f64 = 98.0;
pub const DEGRADED_BASELINE: f64 = 75.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Indicator {
    pub value: f64,
    pub complement: f64,
}

impl Indicator {
    pub fn new(raw: f64) -> Self {
        let value = if raw.is_finite() {
            raw.round().clamp(0.0, 100.0)
        } else {
            0.0
        };
        Self {
            value,
            complement: 100.0 - value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EfficiencyStrategy {
    /// Weighted inverse vibration of the primary and secondary machines.
    #[default]
    VibrationWeighted,
    /// Inverse of mean power draw.
    PowerAverage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HealthStrategy {
    /// Binary fleet gate: every machine operational or not.
    #[default]
    StatusBaseline,
    /// Mean per-machine inverse temperature.
    TemperatureWeighted,
}

pub fn compute_efficiency(strategy: EfficiencyStrategy, machines: &[MachineReading]) -> Indicator {
    match strategy {
        EfficiencyStrategy::VibrationWeighted => vibration_weighted(machines),
        EfficiencyStrategy::PowerAverage => {
            let powers: Vec<f64> = machines
                .iter()
                .map(|m| m.power)
                .filter(|p| p.is_finite())
                .collect();
            match mean(&powers) {
                Some(avg) => Indicator::new(100.0 - avg * POWER_SCALE),
                None => Indicator::new(0.0),
            }
        }
    }
}

pub fn compute_health(strategy: HealthStrategy, machines: &[MachineReading]) -> Indicator {
    match strategy {
        HealthStrategy::StatusBaseline => {
            if machines.iter().all(MachineReading::is_operational) {
                Indicator::new(HEALTHY_BASELINE)
            } else {
                Indicator::new(DEGRADED_BASELINE)
            }
        }
        HealthStrategy::TemperatureWeighted => {
            let terms: Vec<f64> = machines
                .iter()
                .map(|m| m.temperature)
                .filter(|t| t.is_finite())
                .map(|t| 100.0 - t * TEMPERATURE_SCALE)
                .collect();
            Indicator::new(mean(&terms).unwrap_or(0.0))
        }
    }
}

// Weights are renormalized over the positions that carry a finite reading.
fn vibration_weighted(machines: &[MachineReading]) -> Indicator {
    let (sum, weight) = machines
        .iter()
        .zip(EFFICIENCY_WEIGHTS)
        .filter(|(m, _)| m.vibration.is_finite())
        .fold((0.0, 0.0), |(sum, weight), (m, w)| {
            (sum + (100.0 - m.vibration * VIBRATION_SCALE) * w, weight + w)
        });

    if weight > 0.0 {
        Indicator::new(sum / weight)
    } else {
        Indicator::new(0.0)
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
