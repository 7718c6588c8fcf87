// View surface - in-memory render targets published to connected browsers
use crate::application::render::{
    Gauge, GaugeSink, MachineCard, MachineCardSink, Notifier, RecommendationItem,
    RecommendationSink, RenderError, Toast, TrendSink,
};
use crate::domain::indicators::Indicator;
use crate::domain::series::TrendView;
use crate::domain::session::Affordance;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::RwLock;
use tokio::sync::broadcast;

pub const TREND_TARGET: &str = "trend-graph";
pub const EFFICIENCY_TARGET: &str = "efficiency-gauge";
pub const HEALTH_TARGET: &str = "health-gauge";
pub const RECOMMENDATIONS_TARGET: &str = "recommendations-list";

const UPDATE_BUFFER: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SurfaceUpdate {
    Target { target: String, fragment: Value },
    Toast(Toast),
}

/// Card field targets follow `<id>-power`, `<id>-voltage`, `<id>-temp`,
/// `<id>-status-dot` and `<id>-actions`, with the id lowercased.
pub fn card_target(machine_id: &str, field: &str) -> String {
    format!("{}-{}", machine_id.to_lowercase(), field)
}

pub fn default_targets(machines: &[String]) -> Vec<String> {
    let mut targets = vec![
        TREND_TARGET.to_string(),
        EFFICIENCY_TARGET.to_string(),
        HEALTH_TARGET.to_string(),
        RECOMMENDATIONS_TARGET.to_string(),
    ];
    for id in machines {
        for field in ["power", "voltage", "temp", "status-dot", "actions"] {
            targets.push(card_target(id, field));
        }
    }
    targets
}

/// An affordance as the page draws it: button text plus what it triggers.
#[derive(Serialize)]
struct ActionFragment<'a> {
    label: &'static str,
    #[serde(flatten)]
    affordance: &'a Affordance,
}

fn action_fragments(actions: &[Affordance]) -> Vec<ActionFragment<'_>> {
    actions
        .iter()
        .map(|affordance| ActionFragment {
            label: affordance.label(),
            affordance,
        })
        .collect()
}

pub struct ViewSurface {
    targets: HashSet<String>,
    fragments: RwLock<BTreeMap<String, Value>>,
    updates: broadcast::Sender<SurfaceUpdate>,
}

impl ViewSurface {
    pub fn new<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (updates, _) = broadcast::channel(UPDATE_BUFFER);
        Self {
            targets: targets.into_iter().map(Into::into).collect(),
            fragments: RwLock::new(BTreeMap::new()),
            updates,
        }
    }

    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.fragments
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SurfaceUpdate> {
        self.updates.subscribe()
    }

    fn set<T: Serialize>(&self, target: &str, fragment: &T) -> Result<(), RenderError> {
        if !self.targets.contains(target) {
            return Err(RenderError::MissingTarget(target.to_string()));
        }
        let fragment = serde_json::to_value(fragment).unwrap_or(Value::Null);

        let mut fragments = self.fragments.write().unwrap_or_else(|e| e.into_inner());
        if fragments.get(target) == Some(&fragment) {
            return Ok(());
        }
        fragments.insert(target.to_string(), fragment.clone());
        drop(fragments);

        // No subscribers is fine.
        let _ = self.updates.send(SurfaceUpdate::Target {
            target: target.to_string(),
            fragment,
        });
        Ok(())
    }
}

impl TrendSink for ViewSurface {
    fn render_trend(&self, view: &TrendView) -> Result<(), RenderError> {
        self.set(TREND_TARGET, view)
    }
}

impl GaugeSink for ViewSurface {
    fn render_gauge(&self, gauge: Gauge, indicator: &Indicator) -> Result<(), RenderError> {
        let target = match gauge {
            Gauge::Efficiency => EFFICIENCY_TARGET,
            Gauge::Health => HEALTH_TARGET,
        };
        self.set(target, indicator)
    }
}

impl MachineCardSink for ViewSurface {
    /// Writes every field whose target exists; reports the first missing one.
    fn render_card(&self, card: &MachineCard) -> Result<(), RenderError> {
        let results = [
            self.set(&card_target(&card.id, "power"), &card.power),
            self.set(&card_target(&card.id, "voltage"), &card.voltage),
            self.set(&card_target(&card.id, "temp"), &card.temperature),
            self.set(&card_target(&card.id, "status-dot"), &card.status_class),
            self.set(&card_target(&card.id, "actions"), &action_fragments(&card.actions)),
        ];
        results.into_iter().collect()
    }
}

impl RecommendationSink for ViewSurface {
    fn render_recommendations(&self, items: &[RecommendationItem]) -> Result<(), RenderError> {
        self.set(RECOMMENDATIONS_TARGET, &items)
    }
}

impl Notifier for ViewSurface {
    fn notify(&self, toast: Toast) {
        tracing::debug!("toast: {}", toast.message);
        let _ = self.updates.send(SurfaceUpdate::Toast(toast));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::render::ToastKind;
    use crate::domain::machine::{MachineReading, MachineStatus};
    use crate::domain::session::Role;
    use serde_json::json;

    fn surface() -> ViewSurface {
        ViewSurface::new(default_targets(&["M1".to_string(), "M2".to_string()]))
    }

    #[test]
    fn test_default_targets() {
        let targets = default_targets(&["M1".to_string()]);
        assert!(targets.contains(&"m1-temp".to_string()));
        assert!(targets.contains(&"m1-status-dot".to_string()));
        assert!(targets.contains(&"trend-graph".to_string()));
        assert_eq!(targets.len(), 9);
    }

    #[test]
    fn test_card_fields_land_on_their_targets() {
        let surface = surface();
        let mut machine = MachineReading::new("M1", MachineStatus::Fault);
        machine.temperature = 88.0;
        surface
            .render_card(&MachineCard::new(&machine, Role::Head))
            .unwrap();

        let view = surface.snapshot();
        assert_eq!(view["m1-temp"], json!("88 °C"));
        assert_eq!(view["m1-status-dot"], json!("status-dot fault"));
        assert_eq!(view["m1-actions"][0]["kind"], json!("control"));
        assert_eq!(view["m1-actions"][0]["label"], json!("Control"));
        assert_eq!(view["m1-actions"][0]["machine_id"], json!("M1"));
        assert!(!view.contains_key("m2-temp"));
    }

    #[test]
    fn test_missing_target_is_reported_and_others_still_written() {
        let surface = ViewSurface::new(["m3-power", "m3-temp"]);
        let machine = MachineReading::new("M3", MachineStatus::Idle);
        let result = surface.render_card(&MachineCard::new(&machine, Role::Worker));

        assert_eq!(
            result,
            Err(RenderError::MissingTarget("m3-voltage".to_string()))
        );
        let view = surface.snapshot();
        assert_eq!(view["m3-power"], json!("-- W"));
        assert_eq!(view["m3-temp"], json!("-- °C"));
    }

    #[test]
    fn test_repeated_render_publishes_once() {
        let surface = surface();
        let mut rx = surface.subscribe();

        surface.render_gauge(Gauge::Health, &Indicator::new(91.0)).unwrap();
        surface.render_gauge(Gauge::Health, &Indicator::new(91.0)).unwrap();

        assert!(matches!(
            rx.try_recv(),
            Ok(SurfaceUpdate::Target { target, .. }) if target == HEALTH_TARGET
        ));
        assert!(rx.try_recv().is_err());
        assert_eq!(surface.snapshot()[HEALTH_TARGET]["value"], json!(91.0));
    }

    #[test]
    fn test_toasts_are_broadcast_not_stored() {
        let surface = surface();
        let mut rx = surface.subscribe();
        surface.notify(Toast::new("Connected to Digital Twin Server", ToastKind::Success));

        match rx.try_recv() {
            Ok(SurfaceUpdate::Toast(toast)) => assert_eq!(toast.kind, ToastKind::Success),
            other => panic!("unexpected: {:?}", other),
        }
        assert!(surface.snapshot().is_empty());
    }

    #[test]
    fn test_update_wire_shape() {
        let update = SurfaceUpdate::Target {
            target: "m1-power".to_string(),
            fragment: json!("300 W"),
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({"type": "target", "target": "m1-power", "fragment": "300 W"})
        );
    }
}
