// Domain layer - telemetry models and pure dashboard logic
pub mod anomaly;
pub mod indicators;
pub mod label;
pub mod machine;
pub mod series;
pub mod session;
