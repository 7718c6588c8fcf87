// Dashboard update controller - applies snapshots and drives every visual sink
use crate::application::clock::Clock;
use crate::application::dashboard_api::HistoricalData;
use crate::application::render::{
    Gauge, MachineCard, RecommendationItem, RenderError, Sinks, Toast, ToastKind,
};
use crate::domain::anomaly::{annotate_historical, annotate_live};
use crate::domain::indicators::{
    compute_efficiency, compute_health, EfficiencyStrategy, HealthStrategy, Indicator,
};
use crate::domain::label::LabelFormatter;
use crate::domain::machine::{MachineReading, Metric, RecommendationEvent, Snapshot};
use crate::domain::series::{History, RollingSeriesStore, DEFAULT_CAPACITY};
use crate::domain::session::{Role, Session};
use std::sync::Arc;
use tokio::sync::mpsc;

pub const CONNECTED_MESSAGE: &str = "Connected to Digital Twin Server";
pub const DISCONNECTED_MESSAGE: &str = "Disconnected from server";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    ConnectedIdle,
    Updating,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Connected,
    MachineData(Snapshot),
    Disconnected,
}

#[derive(Debug, Clone)]
pub enum DashboardEvent {
    Transport(TransportEvent),
    Hydrated(HistoricalData),
    SessionChanged(Session),
    RoleChanged(Role),
}

#[derive(Debug, Clone)]
pub struct DashboardOptions {
    /// Tracked machines in display order. Empty means "whatever arrives".
    pub machines: Vec<String>,
    pub capacity: usize,
    pub trend_metric: Metric,
    pub efficiency: EfficiencyStrategy,
    pub health: HealthStrategy,
    pub labels: LabelFormatter,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            machines: vec!["M1".to_string(), "M2".to_string()],
            capacity: DEFAULT_CAPACITY,
            trend_metric: Metric::Temperature,
            efficiency: EfficiencyStrategy::VibrationWeighted,
            health: HealthStrategy::StatusBaseline,
            labels: LabelFormatter::default(),
        }
    }
}

impl DashboardOptions {
    pub fn series_name(&self, machine_id: &str) -> String {
        format!("{} {}", machine_id, self.trend_metric.short_name())
    }
}

/// Owns the rolling store and every piece of state the sinks render from.
/// All mutation goes through `&mut self`, one event at a time.
pub struct DashboardController {
    options: DashboardOptions,
    store: RollingSeriesStore,
    state: ConnectionState,
    session: Session,
    machines: Vec<MachineReading>,
    recommendations: Vec<RecommendationEvent>,
    efficiency: Option<Indicator>,
    health: Option<Indicator>,
    last_snapshot: Option<Snapshot>,
    sinks: Sinks,
    clock: Arc<dyn Clock>,
}

impl DashboardController {
    pub fn new(
        options: DashboardOptions,
        session: Session,
        sinks: Sinks,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let store = RollingSeriesStore::with_series(
            options.capacity,
            options.machines.iter().map(|id| options.series_name(id)),
        );
        Self {
            options,
            store,
            state: ConnectionState::Disconnected,
            session,
            machines: Vec::new(),
            recommendations: Vec::new(),
            efficiency: None,
            health: None,
            last_snapshot: None,
            sinks,
            clock,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn store(&self) -> &RollingSeriesStore {
        &self.store
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn efficiency(&self) -> Option<Indicator> {
        self.efficiency
    }

    pub fn health(&self) -> Option<Indicator> {
        self.health
    }

    /// Drains events until every sender is gone.
    pub async fn run(mut self, mut events: mpsc::Receiver<DashboardEvent>) {
        tracing::info!("dashboard controller started");
        while let Some(event) = events.recv().await {
            self.handle(event);
        }
        tracing::info!("dashboard event channel closed, controller stopping");
    }

    pub fn handle(&mut self, event: DashboardEvent) {
        match event {
            DashboardEvent::Transport(TransportEvent::Connected) => self.on_connected(),
            DashboardEvent::Transport(TransportEvent::Disconnected) => self.on_disconnected(),
            DashboardEvent::Transport(TransportEvent::MachineData(snapshot)) => {
                self.apply_snapshot(snapshot)
            }
            DashboardEvent::Hydrated(history) => self.hydrate(history),
            DashboardEvent::SessionChanged(session) => self.set_session(session),
            DashboardEvent::RoleChanged(role) => self.set_role(role),
        }
    }

    fn on_connected(&mut self) {
        tracing::info!("telemetry transport connected");
        self.state = ConnectionState::ConnectedIdle;
        self.sinks
            .notifier
            .notify(Toast::new(CONNECTED_MESSAGE, ToastKind::Success));
    }

    fn on_disconnected(&mut self) {
        tracing::warn!("telemetry transport disconnected");
        self.state = ConnectionState::Disconnected;
        self.sinks
            .notifier
            .notify(Toast::new(DISCONNECTED_MESSAGE, ToastKind::Error));
    }

    /// One update cycle. A snapshot equal to the previous one is rendered
    /// again but not pushed twice.
    pub fn apply_snapshot(&mut self, snapshot: Snapshot) {
        if self.state == ConnectionState::Disconnected {
            tracing::debug!("snapshot arrived before connect; applying anyway");
        }
        self.state = ConnectionState::Updating;

        let repeated = self
            .last_snapshot
            .as_ref()
            .is_some_and(|last| same_snapshot(last, &snapshot));
        for anomaly in &snapshot.anomalies {
            tracing::warn!(
                "Anomaly detected on {}: {} ({})",
                anomaly.machine_id,
                anomaly.kind,
                anomaly.value
            );
        }

        // display fields
        self.machines = snapshot.machines.clone();
        self.recommendations = snapshot.recommendations.clone();

        if repeated {
            tracing::debug!("snapshot unchanged since last tick; skipping series push");
        } else {
            // rolling series
            let label = self.options.labels.format_instant(self.clock.now());
            let values: Vec<(String, f64)> = self
                .tracked_ids(&snapshot)
                .into_iter()
                .filter_map(|id| {
                    snapshot
                        .machine(&id)
                        .map(|m| (self.options.series_name(&id), m.metric(self.options.trend_metric)))
                })
                .collect();
            self.store.push(label.clone(), values);

            // anomaly overlay, aligned with the point just pushed
            self.store
                .push_anomaly_markers(annotate_live(&label, &snapshot.anomalies));
            tracing::debug!(label = %label, points = self.store.len(), "series updated");
        }

        // indicators, recomputed wholesale
        self.efficiency = Some(compute_efficiency(self.options.efficiency, &self.machines));
        self.health = Some(compute_health(self.options.health, &self.machines));

        self.last_snapshot = Some(snapshot);

        // sinks
        self.render();
        self.state = ConnectionState::ConnectedIdle;
    }

    /// Merges the historical bulk load. Only the first one counts.
    pub fn hydrate(&mut self, data: HistoricalData) {
        let metric = self.options.trend_metric;
        let ids = self.options.machines.clone();

        let labels: Vec<String> = data
            .data
            .iter()
            .map(|row| {
                row.first()
                    .map(|r| self.options.labels.format_timestamp(r.timestamp))
                    .unwrap_or_default()
            })
            .collect();

        let series = ids
            .iter()
            .enumerate()
            .map(|(position, id)| {
                let values = data
                    .data
                    .iter()
                    .map(|row| {
                        row.iter()
                            .find(|r| r.id.as_deref() == Some(id.as_str()))
                            .or_else(|| row.get(position).filter(|r| r.id.is_none()))
                            .map(|r| r.metric(metric))
                            .unwrap_or(f64::NAN)
                    })
                    .collect();
                (self.options.series_name(id), values)
            })
            .collect();

        let history = History {
            labels,
            series,
            anomalies: annotate_historical(&self.options.labels, &data.anomalies),
        };

        if self.store.hydrate(history) {
            tracing::info!(
                rows = data.data.len(),
                retained = self.store.len(),
                "trend history hydrated"
            );
            self.render();
        } else {
            tracing::debug!("history already hydrated; ignoring");
        }
    }

    pub fn set_role(&mut self, role: Role) {
        tracing::info!("Role switched to {}", role);
        self.session.role = role;
        self.render();
    }

    pub fn set_session(&mut self, session: Session) {
        tracing::info!(user = session.user(), role = %session.role, "session changed");
        self.session = session;
        self.render();
    }

    /// Re-renders every sink from owned state. Each sink fails on its own.
    pub fn render(&self) {
        let role = self.session.role;

        for machine in &self.machines {
            let card = MachineCard::new(machine, role);
            skip_on_missing("machine card", self.sinks.cards.render_card(&card));
        }

        let items = RecommendationItem::list(&self.recommendations, role);
        skip_on_missing(
            "recommendations",
            self.sinks.recommendations.render_recommendations(&items),
        );

        if let Some(efficiency) = &self.efficiency {
            skip_on_missing(
                "efficiency gauge",
                self.sinks.gauges.render_gauge(Gauge::Efficiency, efficiency),
            );
        }
        if let Some(health) = &self.health {
            skip_on_missing(
                "health gauge",
                self.sinks.gauges.render_gauge(Gauge::Health, health),
            );
        }

        skip_on_missing("trend chart", self.sinks.trend.render_trend(&self.store.view()));
    }

    fn tracked_ids(&self, snapshot: &Snapshot) -> Vec<String> {
        if self.options.machines.is_empty() {
            snapshot.machines.iter().map(|m| m.id.clone()).collect()
        } else {
            self.options.machines.clone()
        }
    }
}

// Compared as JSON, where NaN gaps are `null` and so equal each other.
fn same_snapshot(a: &Snapshot, b: &Snapshot) -> bool {
    match (serde_json::to_value(a), serde_json::to_value(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn skip_on_missing(step: &str, result: Result<(), RenderError>) {
    if let Err(e) = result {
        tracing::warn!("Skipping {}: {}", step, e);
    }
}
