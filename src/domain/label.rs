// Display labels for the shared time axis
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, TimeZone, Utc};

pub const DEFAULT_LABEL_FORMAT: &str = "%H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid label format: {0:?}")]
pub struct LabelFormatError(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelFormatter {
    format: String,
}

impl Default for LabelFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_LABEL_FORMAT)
    }
}

impl LabelFormatter {
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
        }
    }

    /// Rejects strftime strings chrono would refuse to render.
    pub fn parse(format: &str) -> Result<Self, LabelFormatError> {
        if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
            return Err(LabelFormatError(format.to_string()));
        }
        Ok(Self::new(format))
    }

    /// Label for a live tick.
    pub fn format_instant(&self, instant: DateTime<Utc>) -> String {
        instant.format(&self.format).to_string()
    }

    /// Label for a stored timestamp in seconds since epoch.
    /// Timestamps outside chrono's range fall back to the raw number.
    pub fn format_timestamp(&self, seconds: f64) -> String {
        if !seconds.is_finite() {
            return seconds.to_string();
        }
        let whole = seconds.floor() as i64;
        let nanos = ((seconds - seconds.floor()) * 1e9) as u32;
        match Utc.timestamp_opt(whole, nanos).single() {
            Some(instant) => self.format_instant(instant),
            None => seconds.to_string(),
        }
    }
}
