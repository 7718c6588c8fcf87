// Anomaly annotator - places anomaly events on the trend label axis
use super::label::LabelFormatter;
use super::machine::AnomalyEvent;
use super::series::SeriesPoint;

/// Live path: every anomaly is stamped with the tick label that was just
/// pushed, whatever its own timestamp says.
pub fn annotate_live(current_label: &str, anomalies: &[AnomalyEvent]) -> Vec<SeriesPoint> {
    anomalies
        .iter()
        .map(|a| SeriesPoint::new(current_label, a.value))
        .collect()
}

/// Historical path: labels are rebuilt from each event's stored timestamp.
/// Events without a timestamp cannot be placed and are skipped.
pub fn annotate_historical(
    formatter: &LabelFormatter,
    anomalies: &[AnomalyEvent],
) -> Vec<SeriesPoint> {
    anomalies
        .iter()
        .filter_map(|a| {
            a.timestamp
                .map(|ts| SeriesPoint::new(formatter.format_timestamp(ts), a.value))
        })
        .collect()
}
