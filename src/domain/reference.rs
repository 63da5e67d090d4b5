//! Reference-market snapshots attached to a fill after the fact.

use super::{lenient, Decimal};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A quote captured from an external market around the time of a fill.
///
/// Polymarket snapshots carry `bbo`/`best_bid`/`best_ask`; sportsbook-style
/// snapshots carry `best_bid` and a precomputed `price_diff_pct`; Pinnacle
/// snapshots add the implied `percentage` of both sides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceSnapshot {
    #[serde(default, deserialize_with = "lenient::opt_decimal", skip_serializing_if = "Option::is_none")]
    pub bbo: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::opt_decimal", skip_serializing_if = "Option::is_none")]
    pub best_bid: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::opt_decimal", skip_serializing_if = "Option::is_none")]
    pub best_ask: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::opt_decimal", skip_serializing_if = "Option::is_none")]
    pub spread: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::opt_raw", skip_serializing_if = "Option::is_none")]
    pub percentage: Option<Value>,
    #[serde(default, deserialize_with = "lenient::opt_raw", skip_serializing_if = "Option::is_none")]
    pub opponent_percentage: Option<Value>,
    #[serde(default, deserialize_with = "lenient::opt_decimal", skip_serializing_if = "Option::is_none")]
    pub price_diff: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::opt_decimal", skip_serializing_if = "Option::is_none")]
    pub price_diff_pct: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::opt_raw", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ReferenceSnapshot {
    pub fn with_bbo(bbo: Decimal) -> Self {
        Self {
            bbo: Some(bbo),
            ..Default::default()
        }
    }

    /// The price a fill is compared against: `bbo`, else `best_bid`.
    ///
    /// Zero and negative quotes are treated as absent.
    pub fn reference_price(&self) -> Option<Decimal> {
        self.bbo
            .or(self.best_bid)
            .filter(|price| price.is_positive())
    }

    /// The opposing side's implied probability as a fraction in `[0, 1]`.
    pub fn opponent_fraction(&self) -> Option<Decimal> {
        self.opponent_percentage.as_ref().and_then(parse_fraction)
    }
}

/// Parse a probability given as a fraction (`0.35`), a percentage number (`35`)
/// or a percentage string (`"35%"`).
///
/// Magnitudes above 1 are divided by 100.
pub fn parse_fraction(value: &Value) -> Option<Decimal> {
    let parsed = match value {
        Value::String(s) => {
            let cleaned = s.trim().trim_end_matches('%').trim();
            Decimal::from_str_canonical(cleaned).ok()
        }
        other => Decimal::from_json(other),
    }?;
    if parsed.abs() > Decimal::one() {
        parsed.checked_div(Decimal::hundred())
    } else {
        Some(parsed)
    }
}

/// The independent reference price sources a fill is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceSource {
    PolymarketBefore,
    PolymarketAfter,
    Sportsbook,
    PinnacleBefore,
    PinnacleAfter,
    PinnacleSportsbook,
}

impl ReferenceSource {
    pub const ALL: [ReferenceSource; 6] = [
        ReferenceSource::PolymarketBefore,
        ReferenceSource::PolymarketAfter,
        ReferenceSource::Sportsbook,
        ReferenceSource::PinnacleBefore,
        ReferenceSource::PinnacleAfter,
        ReferenceSource::PinnacleSportsbook,
    ];

    /// Sources whose percentage is also reported as a value-weighted point
    /// difference.
    pub fn reports_points(&self) -> bool {
        matches!(
            self,
            ReferenceSource::Sportsbook | ReferenceSource::PinnacleSportsbook
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceSource::PolymarketBefore => "polymarket_before",
            ReferenceSource::PolymarketAfter => "polymarket_after",
            ReferenceSource::Sportsbook => "sportsbook",
            ReferenceSource::PinnacleBefore => "pinnacle_before",
            ReferenceSource::PinnacleAfter => "pinnacle_after",
            ReferenceSource::PinnacleSportsbook => "pinnacle_sportsbook",
        }
    }
}
