//! Fill record: one trade execution as delivered by the feed or the history
//! backfill, later enriched with reference snapshots.

use super::{lenient, Decimal, ReferenceSnapshot, ReferenceSource, Side, TimeMs};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single trade fill.
///
/// Every field is optional on the wire. Missing or malformed values collapse to
/// neutral defaults (zero for money and shares, `None` elsewhere); fields this
/// type does not know about are carried through in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FillRecord {
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub order_hash: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_u64", skip_serializing_if = "Option::is_none")]
    pub log_index: Option<u64>,
    #[serde(default, deserialize_with = "lenient::opt_u64", skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(default, deserialize_with = "lenient::opt_side", skip_serializing_if = "Option::is_none")]
    pub side: Option<Side>,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub price: Decimal,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub shares: Decimal,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub shares_normalized: Decimal,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub market_slug: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub token_label: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub taker: Option<String>,
    /// Trade time, epoch seconds (milliseconds tolerated).
    #[serde(default, deserialize_with = "lenient::opt_raw", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
    /// Receipt time, epoch seconds or ISO-8601.
    #[serde(default, deserialize_with = "lenient::opt_raw", skip_serializing_if = "Option::is_none")]
    pub received_at: Option<Value>,
    #[serde(default, deserialize_with = "lenient::opt_snapshot", skip_serializing_if = "Option::is_none")]
    pub polymarket_before: Option<ReferenceSnapshot>,
    #[serde(default, deserialize_with = "lenient::opt_snapshot", skip_serializing_if = "Option::is_none")]
    pub polymarket_after: Option<ReferenceSnapshot>,
    #[serde(default, deserialize_with = "lenient::opt_snapshot", skip_serializing_if = "Option::is_none")]
    pub sportbook: Option<ReferenceSnapshot>,
    #[serde(default, deserialize_with = "lenient::opt_snapshot", skip_serializing_if = "Option::is_none")]
    pub pinnacle_before: Option<ReferenceSnapshot>,
    #[serde(default, deserialize_with = "lenient::opt_snapshot", skip_serializing_if = "Option::is_none")]
    pub pinnacle_after: Option<ReferenceSnapshot>,
    #[serde(default, deserialize_with = "lenient::opt_snapshot", skip_serializing_if = "Option::is_none")]
    pub pinnacle_sportbook: Option<ReferenceSnapshot>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FillRecord {
    /// Dollar value of the fill: price × normalized shares. `None` when the
    /// product overflows.
    pub fn fill_value(&self) -> Option<Decimal> {
        self.price.checked_mul(self.shares_normalized)
    }

    /// Upper-cased leading segment of the market slug.
    pub fn league(&self) -> Option<String> {
        let slug = self.market_slug.as_deref()?;
        slug.split('-')
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_uppercase)
    }

    pub fn trade_time(&self) -> Option<TimeMs> {
        self.timestamp.as_ref().and_then(TimeMs::from_json)
    }

    pub fn received_time(&self) -> Option<TimeMs> {
        self.received_at.as_ref().and_then(TimeMs::from_json)
    }

    /// Trade time if present, else receipt time.
    pub fn event_time(&self) -> Option<TimeMs> {
        self.trade_time().or_else(|| self.received_time())
    }

    pub fn snapshot(&self, source: ReferenceSource) -> Option<&ReferenceSnapshot> {
        match source {
            ReferenceSource::PolymarketBefore => self.polymarket_before.as_ref(),
            ReferenceSource::PolymarketAfter => self.polymarket_after.as_ref(),
            ReferenceSource::Sportsbook => self.sportbook.as_ref(),
            ReferenceSource::PinnacleBefore => self.pinnacle_before.as_ref(),
            ReferenceSource::PinnacleAfter => self.pinnacle_after.as_ref(),
            ReferenceSource::PinnacleSportsbook => self.pinnacle_sportbook.as_ref(),
        }
    }

    /// Per-share difference between the fill price and a reference, in price
    /// units. `None` when the reference is unavailable for this fill.
    ///
    /// Pinnacle's sportsbook-style reference is derived from the opponent's
    /// implied probability (`1 - opponent`), falling back to the legacy
    /// precomputed percent-point difference.
    pub fn price_diff(&self, source: ReferenceSource) -> Option<Decimal> {
        match source {
            ReferenceSource::PinnacleSportsbook => self.pinnacle_implied_diff(),
            other => self
                .snapshot(other)
                .and_then(ReferenceSnapshot::reference_price)
                .and_then(|reference| self.price.checked_sub(reference)),
        }
    }

    fn pinnacle_implied_diff(&self) -> Option<Decimal> {
        let implied = self
            .pinnacle_after
            .as_ref()
            .and_then(ReferenceSnapshot::opponent_fraction)
            .and_then(|opponent| Decimal::one().checked_sub(opponent))
            .filter(|implied| implied.is_positive());
        if let Some(implied) = implied {
            return self.price.checked_sub(implied);
        }
        self.pinnacle_sportbook
            .as_ref()
            .and_then(|legacy| legacy.price_diff_pct)
            .and_then(|pct| pct.checked_div(Decimal::hundred()))
    }
}
