//! Domain primitives: TimeMs, Side.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Epoch values above this are treated as milliseconds rather than seconds.
const MILLIS_THRESHOLD: f64 = 1e12;

/// Time in milliseconds since Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeMs(pub i64);

impl TimeMs {
    pub fn new(ms: i64) -> Self {
        TimeMs(ms)
    }

    pub fn now() -> Self {
        TimeMs(Utc::now().timestamp_millis())
    }

    pub fn as_ms(&self) -> i64 {
        self.0
    }

    /// Interpret a float as epoch seconds, or as milliseconds when it is too
    /// large to be seconds.
    pub fn from_epoch(value: f64) -> Option<Self> {
        if !value.is_finite() || value <= 0.0 {
            return None;
        }
        let ms = if value > MILLIS_THRESHOLD {
            value
        } else {
            value * 1000.0
        };
        Some(TimeMs(ms.round() as i64))
    }

    /// Parse an epoch number, a numeric string or an ISO-8601 string.
    ///
    /// Timezone-naive strings are taken as UTC. Anything unparseable is `None`.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n.as_f64().and_then(Self::from_epoch),
            serde_json::Value::String(s) => Self::parse_str(s),
            _ => None,
        }
    }

    fn parse_str(raw: &str) -> Option<Self> {
        let s = raw.trim();
        if s.is_empty() {
            return None;
        }
        if let Ok(n) = s.parse::<f64>() {
            return Self::from_epoch(n);
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(TimeMs(dt.timestamp_millis()));
        }
        const NAIVE_FORMATS: [&str; 4] = [
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%d %H:%M:%S%.f",
            "%Y-%m-%dT%H:%M:%S",
            "%Y-%m-%d %H:%M:%S",
        ];
        NAIVE_FORMATS.iter().find_map(|fmt| {
            NaiveDateTime::parse_from_str(s, fmt)
                .ok()
                .map(|naive| TimeMs(Utc.from_utc_datetime(&naive).timestamp_millis()))
        })
    }

    pub fn saturating_sub_ms(&self, ms: i64) -> Self {
        TimeMs(self.0.saturating_sub(ms))
    }
}

/// Trade side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Case-insensitive parse; anything other than buy/sell is unknown.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" | "B" => Some(Side::Buy),
            "SELL" | "S" => Some(Side::Sell),
            _ => None,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_epoch_seconds_and_millis() {
        assert_eq!(TimeMs::from_epoch(1_700_000_000.5), Some(TimeMs(1_700_000_000_500)));
        assert_eq!(
            TimeMs::from_epoch(1_700_000_000_123.0),
            Some(TimeMs(1_700_000_000_123))
        );
        assert_eq!(TimeMs::from_epoch(0.0), None);
        assert_eq!(TimeMs::from_epoch(f64::NAN), None);
    }

    #[test]
    fn test_naive_iso_string_is_utc() {
        let naive = TimeMs::from_json(&json!("2024-01-01T00:00:00")).unwrap();
        let zoned = TimeMs::from_json(&json!("2024-01-01T00:00:00Z")).unwrap();
        assert_eq!(naive, zoned);
        assert_eq!(zoned.as_ms(), 1_704_067_200_000);
    }

    #[test]
    fn test_offset_iso_string() {
        let t = TimeMs::from_json(&json!("2024-01-01T02:00:00+02:00")).unwrap();
        assert_eq!(t.as_ms(), 1_704_067_200_000);
    }

    #[test]
    fn test_unparseable_is_none() {
        assert_eq!(TimeMs::from_json(&json!("yesterday")), None);
        assert_eq!(TimeMs::from_json(&json!(null)), None);
        assert_eq!(TimeMs::from_json(&json!({"a": 1})), None);
    }

    #[test]
    fn test_side_parse_and_serialization() {
        assert_eq!(Side::parse("buy"), Some(Side::Buy));
        assert_eq!(Side::parse(" SELL "), Some(Side::Sell));
        assert_eq!(Side::parse("hold"), None);
        assert_eq!(serde_json::to_string(&Side::Buy).unwrap(), "\"BUY\"");
    }
}
