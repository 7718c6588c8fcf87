// Rolling series store - bounded co-axis time series for live trend charts
use serde::Serialize;
use std::collections::{HashSet, VecDeque};

pub const DEFAULT_CAPACITY: usize = 30;

/// A labelled value. Serialized in chart form as `{x, y}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    #[serde(rename = "x")]
    pub label: String,
    #[serde(rename = "y")]
    pub value: f64,
}

impl SeriesPoint {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub name: String,
    pub values: Vec<f64>,
}

/// Read-only copy of the store handed to trend renderers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrendView {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
    pub anomalies: Vec<SeriesPoint>,
}

/// Bulk history used to hydrate the store once at startup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    pub labels: Vec<String>,
    pub series: Vec<(String, Vec<f64>)>,
    pub anomalies: Vec<SeriesPoint>,
}

#[derive(Debug, Clone)]
struct RollingSeries {
    name: String,
    values: VecDeque<f64>,
}

/// Every series shares one label axis: all series and the axis always have
/// the same length, at most `capacity`.
#[derive(Debug, Clone)]
pub struct RollingSeriesStore {
    capacity: usize,
    labels: VecDeque<String>,
    series: Vec<RollingSeries>,
    overlay: Vec<SeriesPoint>,
    hydrated: bool,
}

impl RollingSeriesStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            labels: VecDeque::with_capacity(capacity + 1),
            series: Vec::new(),
            overlay: Vec::new(),
            hydrated: false,
        }
    }

    pub fn with_series<I, S>(capacity: usize, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut store = Self::new(capacity);
        for name in names {
            store.register(name);
        }
        store
    }

    /// Adds a series to the axis, back-filled with gaps for existing labels.
    pub fn register(&mut self, name: impl Into<String>) {
        let name = name.into();
        if self.position(&name).is_some() {
            return;
        }
        let values = std::iter::repeat_n(f64::NAN, self.labels.len()).collect();
        self.series.push(RollingSeries { name, values });
    }

    /// Appends one point per series under `label`. Registered series missing
    /// from `values` get a NaN gap; unknown names are registered first.
    pub fn push<I, S>(&mut self, label: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let mut pending = vec![f64::NAN; self.series.len()];
        for (name, value) in values {
            let idx = match self.position(name.as_ref()) {
                Some(idx) => idx,
                None => {
                    self.register(name.as_ref());
                    pending.push(f64::NAN);
                    self.series.len() - 1
                }
            };
            pending[idx] = value;
        }

        self.labels.push_back(label.into());
        for (series, value) in self.series.iter_mut().zip(pending) {
            series.values.push_back(value);
        }

        if self.labels.len() > self.capacity {
            self.labels.pop_front();
            for series in &mut self.series {
                series.values.pop_front();
            }
            self.retain_overlay_window();
        }
    }

    /// Adds overlay markers without growing the axis. Markers whose label is
    /// not among the retained axis labels are dropped.
    pub fn push_anomaly_markers<I>(&mut self, markers: I)
    where
        I: IntoIterator<Item = SeriesPoint>,
    {
        self.overlay.extend(markers);
        self.retain_overlay_window();
    }

    /// Places `history` before the live points already pushed and keeps the
    /// newest `capacity` points. Only the first call has any effect.
    pub fn hydrate(&mut self, history: History) -> bool {
        if self.hydrated {
            return false;
        }
        self.hydrated = true;

        let History {
            labels,
            series,
            anomalies,
        } = history;
        let history_len = labels.len();

        for (name, _) in &series {
            self.register(name.as_str());
        }

        let mut prefixes: Vec<Vec<f64>> = vec![vec![f64::NAN; history_len]; self.series.len()];
        for (name, mut values) in series {
            if let Some(idx) = self.position(&name) {
                values.resize(history_len, f64::NAN);
                prefixes[idx] = values;
            }
        }

        for label in labels.into_iter().rev() {
            self.labels.push_front(label);
        }
        for (target, prefix) in self.series.iter_mut().zip(prefixes) {
            for value in prefix.into_iter().rev() {
                target.values.push_front(value);
            }
        }

        while self.labels.len() > self.capacity {
            self.labels.pop_front();
            for series in &mut self.series {
                series.values.pop_front();
            }
        }

        let mut overlay = anomalies;
        overlay.append(&mut self.overlay);
        self.overlay = overlay;
        self.retain_overlay_window();
        true
    }

    pub fn is_hydrated(&self) -> bool {
        self.hydrated
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    pub fn series(&self, name: &str) -> Option<Vec<f64>> {
        self.position(name)
            .map(|idx| self.series[idx].values.iter().copied().collect())
    }

    pub fn series_names(&self) -> impl Iterator<Item = &str> {
        self.series.iter().map(|s| s.name.as_str())
    }

    pub fn overlay(&self) -> &[SeriesPoint] {
        &self.overlay
    }

    pub fn view(&self) -> TrendView {
        TrendView {
            labels: self.labels.iter().cloned().collect(),
            datasets: self
                .series
                .iter()
                .map(|s| Dataset {
                    name: s.name.clone(),
                    values: s.values.iter().copied().collect(),
                })
                .collect(),
            anomalies: self.overlay.clone(),
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.series.iter().position(|s| s.name == name)
    }

    fn retain_overlay_window(&mut self) {
        let window: HashSet<&str> = self.labels.iter().map(String::as_str).collect();
        self.overlay.retain(|p| window.contains(p.label.as_str()));
    }
}

impl Default for RollingSeriesStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_aligned(store: &RollingSeriesStore) {
        let view = store.view();
        for dataset in &view.datasets {
            assert_eq!(dataset.values.len(), view.labels.len(), "{}", dataset.name);
        }
        assert!(view.labels.len() <= store.capacity());
    }

    #[test]
    fn test_fifo_eviction_keeps_last_n() {
        let capacity = 10;
        let mut store = RollingSeriesStore::with_series(capacity, ["M1 Temp"]);
        for i in 0..capacity + 5 {
            store.push(format!("t{}", i), [("M1 Temp", i as f64)]);
        }

        assert_eq!(store.len(), capacity);
        let expected: Vec<f64> = (5..capacity + 5).map(|i| i as f64).collect();
        assert_eq!(store.series("M1 Temp").unwrap(), expected);
        assert_eq!(store.labels().next(), Some("t5"));
    }

    #[test]
    fn test_two_machines_scroll_from_second_label() {
        let mut store = RollingSeriesStore::with_series(30, ["M1 Temp", "M2 Temp"]);
        for i in 1..=31 {
            store.push(
                format!("t{}", i),
                [("M1 Temp", 50.0 + i as f64), ("M2 Temp", 40.0 + i as f64)],
            );
        }

        let view = store.view();
        assert_eq!(view.labels.len(), 30);
        assert_eq!(view.labels[0], "t2");
        assert_eq!(view.labels[29], "t31");
        assert_eq!(view.datasets[0].values.len(), 30);
        assert_eq!(view.datasets[0].values[0], 52.0);
        assert_eq!(view.datasets[1].values[0], 42.0);
    }

    #[test]
    fn test_alignment_survives_missing_and_new_series() {
        let mut store = RollingSeriesStore::with_series(5, ["M1 Temp", "M2 Temp"]);
        store.push("t1", [("M1 Temp", 1.0), ("M2 Temp", 2.0)]);
        store.push("t2", [("M1 Temp", 3.0)]);
        store.push("t3", [("M3 Temp", 9.0)]);
        assert_aligned(&store);

        let m2 = store.series("M2 Temp").unwrap();
        assert_eq!(m2[0], 2.0);
        assert!(m2[1].is_nan());

        let m3 = store.series("M3 Temp").unwrap();
        assert_eq!(m3.len(), 3);
        assert!(m3[0].is_nan() && m3[1].is_nan());
        assert_eq!(m3[2], 9.0);

        for i in 4..20 {
            store.push(format!("t{}", i), [("M1 Temp", i as f64)]);
            assert_aligned(&store);
        }
    }

    #[test]
    fn test_nan_passes_through() {
        let mut store = RollingSeriesStore::with_series(3, ["M1 Power"]);
        store.push("t1", [("M1 Power", f64::NAN)]);
        assert!(store.series("M1 Power").unwrap()[0].is_nan());
    }

    #[test]
    fn test_first_push_initializes_axis() {
        let mut store = RollingSeriesStore::new(3);
        assert!(store.is_empty());
        store.push("t1", [("M1 Temp", 55.0)]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.series_names().collect::<Vec<_>>(), vec!["M1 Temp"]);
    }

    #[test]
    fn test_markers_do_not_grow_axis() {
        let mut store = RollingSeriesStore::with_series(3, ["M1 Temp"]);
        store.push("t1", [("M1 Temp", 1.0)]);
        store.push_anomaly_markers([SeriesPoint::new("t1", 90.0), SeriesPoint::new("t1", 460.0)]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.overlay().len(), 2);
    }

    #[test]
    fn test_markers_scroll_out_with_their_label() {
        let mut store = RollingSeriesStore::with_series(3, ["M1 Temp"]);
        store.push("t1", [("M1 Temp", 1.0)]);
        store.push_anomaly_markers([SeriesPoint::new("t1", 90.0)]);
        store.push("t2", [("M1 Temp", 2.0)]);
        store.push_anomaly_markers([SeriesPoint::new("t2", 91.0)]);
        store.push("t3", [("M1 Temp", 3.0)]);
        assert_eq!(store.overlay().len(), 2);

        store.push("t4", [("M1 Temp", 4.0)]);
        assert_eq!(store.overlay(), &[SeriesPoint::new("t2", 91.0)]);

        for i in 5..50 {
            store.push(format!("t{}", i), [("M1 Temp", i as f64)]);
        }
        assert!(store.overlay().is_empty());
    }

    #[test]
    fn test_marker_off_axis_is_dropped() {
        let mut store = RollingSeriesStore::with_series(3, ["M1 Temp"]);
        store.push("t1", [("M1 Temp", 1.0)]);
        store.push_anomaly_markers([SeriesPoint::new("10:00:00", 90.0)]);
        assert!(store.overlay().is_empty());
    }

    #[test]
    fn test_hydrate_into_empty_store_keeps_newest() {
        let mut store = RollingSeriesStore::with_series(3, ["M1 Temp", "M2 Temp"]);
        let history = History {
            labels: vec!["h1".into(), "h2".into(), "h3".into(), "h4".into()],
            series: vec![
                ("M1 Temp".into(), vec![1.0, 2.0, 3.0, 4.0]),
                ("M2 Temp".into(), vec![5.0, 6.0]),
            ],
            anomalies: vec![SeriesPoint::new("h1", 80.0), SeriesPoint::new("h4", 88.0)],
        };

        assert!(store.hydrate(history));
        assert_aligned(&store);
        assert_eq!(store.labels().collect::<Vec<_>>(), vec!["h2", "h3", "h4"]);
        assert_eq!(store.series("M1 Temp").unwrap(), vec![2.0, 3.0, 4.0]);
        let m2 = store.series("M2 Temp").unwrap();
        assert_eq!(m2[0], 6.0);
        assert!(m2[1].is_nan());
        assert_eq!(store.overlay(), &[SeriesPoint::new("h4", 88.0)]);
    }

    #[test]
    fn test_late_hydration_goes_before_live_points() {
        let mut store = RollingSeriesStore::with_series(4, ["M1 Temp"]);
        store.push("live1", [("M1 Temp", 10.0)]);
        store.push_anomaly_markers([SeriesPoint::new("live1", 10.0)]);
        store.push("live2", [("M1 Temp", 20.0)]);

        let history = History {
            labels: vec!["h1".into(), "h2".into(), "h3".into()],
            series: vec![("M1 Temp".into(), vec![1.0, 2.0, 3.0])],
            anomalies: vec![SeriesPoint::new("h3", 3.0)],
        };
        store.hydrate(history);

        assert_eq!(
            store.labels().collect::<Vec<_>>(),
            vec!["h2", "h3", "live1", "live2"]
        );
        assert_eq!(store.series("M1 Temp").unwrap(), vec![2.0, 3.0, 10.0, 20.0]);
        assert_eq!(
            store.overlay(),
            &[SeriesPoint::new("h3", 3.0), SeriesPoint::new("live1", 10.0)]
        );
    }

    #[test]
    fn test_second_hydration_is_ignored() {
        let mut store = RollingSeriesStore::with_series(4, ["M1 Temp"]);
        let history = History {
            labels: vec!["h1".into()],
            series: vec![("M1 Temp".into(), vec![1.0])],
            anomalies: vec![],
        };
        assert!(store.hydrate(history.clone()));
        assert!(!store.hydrate(history));
        assert_eq!(store.len(), 1);
        assert!(store.is_hydrated());
    }
}
