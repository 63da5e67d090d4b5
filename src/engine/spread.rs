//! Weighted spread accumulation against reference prices.
//!
//! Each reference source is accumulated independently: a fill only
//! contributes to a source when that source has a usable price for it, and
//! the percentage denominator is restricted to those same fills.

use crate::domain::{Decimal, FillRecord, ReferenceSource};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;

/// Published spread statistics for one reference source within a group.
///
/// A negative spread means the fills were cheaper than the reference.
/// Percentages are `None` when no fill in the group had this reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceStat {
    pub fills: u64,
    /// Σ (price − reference) × shares.
    pub spread: Decimal,
    /// Σ price × shares over the fills that had this reference.
    pub covered_value: Decimal,
    /// spread ÷ covered_value × 100.
    pub avg_pct: Option<Decimal>,
    /// Value-weighted mean of (price − reference) × 100, sportsbook-style sources only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub point_pct: Option<Decimal>,
}

pub type ReferenceStats = BTreeMap<ReferenceSource, ReferenceStat>;

#[derive(Debug, Clone, Default)]
struct SourceAccumulator {
    fills: u64,
    spread: Decimal,
    covered_value: Decimal,
    weighted_points: Decimal,
}

impl SourceAccumulator {
    /// Fold one fill in. Returns false, leaving the totals untouched, when any
    /// term overflows.
    fn add(&mut self, value: Decimal, shares: Decimal, diff: Decimal) -> bool {
        let Some((spread, covered_value, weighted_points)) = self.advanced(value, shares, diff)
        else {
            return false;
        };
        self.fills += 1;
        self.spread = spread;
        self.covered_value = covered_value;
        self.weighted_points = weighted_points;
        true
    }

    fn advanced(&self, value: Decimal, shares: Decimal, diff: Decimal) -> Option<(Decimal, Decimal, Decimal)> {
        let spread = self.spread.checked_add(diff.checked_mul(shares)?)?;
        let covered_value = self.covered_value.checked_add(value)?;
        let points = value.checked_mul(diff)?.checked_mul(Decimal::hundred())?;
        let weighted_points = self.weighted_points.checked_add(points)?;
        Some((spread, covered_value, weighted_points))
    }

    fn finish(&self, source: ReferenceSource) -> ReferenceStat {
        if self.fills == 0 {
            return ReferenceStat::default();
        }
        let point_pct = if source.reports_points() {
            self.weighted_points.checked_div(self.covered_value)
        } else {
            None
        };
        ReferenceStat {
            fills: self.fills,
            spread: self.spread,
            covered_value: self.covered_value,
            avg_pct: self.spread.percent_of(self.covered_value),
            point_pct,
        }
    }
}

/// Accumulates every reference source for one group of fills.
#[derive(Debug, Clone, Default)]
pub struct ReferenceAccumulator {
    sources: BTreeMap<ReferenceSource, SourceAccumulator>,
}

impl ReferenceAccumulator {
    /// Fills with a non-positive price or an overflowing value contribute
    /// nothing.
    pub fn add(&mut self, record: &FillRecord) {
        if !record.price.is_positive() {
            return;
        }
        let Some(value) = record.fill_value() else {
            return;
        };
        for source in ReferenceSource::ALL {
            let Some(diff) = record.price_diff(source) else {
                continue;
            };
            let accepted = self
                .sources
                .entry(source)
                .or_default()
                .add(value, record.shares_normalized, diff);
            if !accepted {
                warn!(
                    tx_hash = record.tx_hash.as_deref().unwrap_or(""),
                    source = source.as_str(),
                    "spread overflow, skipping fill for this reference"
                );
            }
        }
    }

    /// Stats for every source; sources without data are present with
    /// `avg_pct: None`.
    pub fn finish(&self) -> ReferenceStats {
        ReferenceSource::ALL
            .into_iter()
            .map(|source| {
                let stat = self
                    .sources
                    .get(&source)
                    .map(|acc| acc.finish(source))
                    .unwrap_or_default();
                (source, stat)
            })
            .collect()
    }
}

/// Fill count, fill value and reference spreads for one group.
#[derive(Debug, Clone, Default)]
pub struct GroupAccumulator {
    pub fills: u64,
    pub fill_value: Decimal,
    pub references: ReferenceAccumulator,
}

impl GroupAccumulator {
    /// Fold one fill into the group. A fill whose value overflows, or would
    /// overflow the group total, is skipped and `None` is returned; otherwise
    /// the fill's own value is returned.
    pub fn add(&mut self, record: &FillRecord) -> Option<Decimal> {
        let accepted = record
            .fill_value()
            .and_then(|value| Some((value, self.fill_value.checked_add(value)?)));
        let Some((value, total)) = accepted else {
            warn!(
                tx_hash = record.tx_hash.as_deref().unwrap_or(""),
                price = %record.price,
                shares = %record.shares_normalized,
                "fill value overflow, skipping fill"
            );
            return None;
        };
        self.fills += 1;
        self.fill_value = total;
        self.references.add(record);
        Some(value)
    }
}
