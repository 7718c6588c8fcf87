// Visual sink contracts and the view models they consume
use crate::domain::indicators::Indicator;
use crate::domain::machine::{MachineReading, RecommendationEvent, Severity};
use crate::domain::series::TrendView;
use crate::domain::session::{machine_affordances, recommendation_affordances, Affordance, Role};
use serde::Serialize;
use std::sync::Arc;

pub const ALL_OPTIMIZED: &str = "All systems optimized.";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("render target `{0}` is not on the page")]
    MissingTarget(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Gauge {
    Efficiency,
    Health,
}

/// Display fields of one machine card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MachineCard {
    pub id: String,
    pub power: String,
    pub voltage: String,
    pub temperature: String,
    pub status_class: String,
    pub actions: Vec<Affordance>,
}

impl MachineCard {
    pub fn new(machine: &MachineReading, role: Role) -> Self {
        Self {
            id: machine.id.clone(),
            power: with_unit(machine.power, "W"),
            voltage: with_unit(machine.voltage, "V"),
            temperature: with_unit(machine.temperature, "°C"),
            status_class: format!("status-dot {}", machine.status),
            actions: machine_affordances(role, &machine.id),
        }
    }
}

fn with_unit(value: f64, unit: &str) -> String {
    if value.is_nan() {
        format!("-- {}", unit)
    } else {
        format!("{} {}", value, unit)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationItem {
    pub severity: Severity,
    pub msg: String,
    pub actions: Vec<Affordance>,
}

impl RecommendationItem {
    pub fn list(recommendations: &[RecommendationEvent], role: Role) -> Vec<Self> {
        if recommendations.is_empty() {
            return vec![Self {
                severity: Severity::Low,
                msg: ALL_OPTIMIZED.to_string(),
                actions: Vec::new(),
            }];
        }
        recommendations
            .iter()
            .map(|r| Self {
                severity: r.severity,
                msg: r.msg.clone(),
                actions: recommendation_affordances(role, &r.msg),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
}

impl Toast {
    pub fn new(message: impl Into<String>, kind: ToastKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }
}

// Render calls replace the target's content; repeating one is a no-op.

pub trait TrendSink: Send + Sync {
    fn render_trend(&self, view: &TrendView) -> Result<(), RenderError>;
}

pub trait GaugeSink: Send + Sync {
    fn render_gauge(&self, gauge: Gauge, indicator: &Indicator) -> Result<(), RenderError>;
}

pub trait MachineCardSink: Send + Sync {
    fn render_card(&self, card: &MachineCard) -> Result<(), RenderError>;
}

pub trait RecommendationSink: Send + Sync {
    fn render_recommendations(&self, items: &[RecommendationItem]) -> Result<(), RenderError>;
}

pub trait Notifier: Send + Sync {
    fn notify(&self, toast: Toast);
}

/// Handles to every visual sink, injected into the controller.
#[derive(Clone)]
pub struct Sinks {
    pub trend: Arc<dyn TrendSink>,
    pub gauges: Arc<dyn GaugeSink>,
    pub cards: Arc<dyn MachineCardSink>,
    pub recommendations: Arc<dyn RecommendationSink>,
    pub notifier: Arc<dyn Notifier>,
}

impl Sinks {
    /// All sinks backed by one surface.
    pub fn from_surface<S>(surface: Arc<S>) -> Self
    where
        S: TrendSink + GaugeSink + MachineCardSink + RecommendationSink + Notifier + 'static,
    {
        Self {
            trend: surface.clone(),
            gauges: surface.clone(),
            cards: surface.clone(),
            recommendations: surface.clone(),
            notifier: surface,
        }
    }
}
