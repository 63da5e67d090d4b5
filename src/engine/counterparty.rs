//! Counterparty view over rows ranked by the backend.
//!
//! Ranking and enrichment happen upstream; this side only numbers the rows,
//! applies the local counterparty filter and truncates to the top N.

use crate::domain::{address_key, lenient, Decimal, TraderProfile};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_TOP_N: usize = 10;

/// One opposite party as returned by `/orders/opposite-parties`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OppositeParty {
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub volume: Decimal,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub profit: Decimal,
    #[serde(default, deserialize_with = "lenient::opt_u64", skip_serializing_if = "Option::is_none")]
    pub orders: Option<u64>,
    #[serde(default, deserialize_with = "lenient::opt_decimal", skip_serializing_if = "Option::is_none")]
    pub volume_with_pnl: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::opt_decimal", skip_serializing_if = "Option::is_none")]
    pub profitable_volume: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::opt_decimal", skip_serializing_if = "Option::is_none")]
    pub unprofitable_volume: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::opt_decimal", skip_serializing_if = "Option::is_none")]
    pub pnl_percentage: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::opt_decimal", skip_serializing_if = "Option::is_none")]
    pub score: Option<Decimal>,
    #[serde(default, deserialize_with = "opt_profile", skip_serializing_if = "Option::is_none")]
    pub polymarket: Option<TraderProfile>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn opt_profile<'de, D: serde::Deserializer<'de>>(d: D) -> Result<Option<TraderProfile>, D::Error> {
    Ok(Option::<Value>::deserialize(d)?.and_then(|v| match v {
        Value::Object(_) => serde_json::from_value(v).ok(),
        _ => None,
    }))
}

/// Body of `/orders/opposite-parties`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OppositePartiesResponse {
    #[serde(default)]
    pub parties: Vec<OppositeParty>,
    #[serde(default, deserialize_with = "lenient::opt_decimal")]
    pub total_volume: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::opt_decimal")]
    pub total_profit: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedParty {
    /// 1-based position in the backend's ordering, before local filtering.
    pub rank: usize,
    #[serde(flatten)]
    pub party: OppositeParty,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterpartyView {
    pub parties: Vec<RankedParty>,
    /// Rows that passed the local filter, before truncation.
    pub matched: usize,
    pub expanded: bool,
    /// Backend total, else the sum of every row; `None` if that sum overflows.
    pub total_volume: Option<Decimal>,
    pub total_profit: Option<Decimal>,
}

/// Build the counterparty view from the latest backend response.
///
/// `filter` is matched case-insensitively as a substring of the party address.
/// Unless `expanded`, at most `top_n` rows are kept.
pub fn build_counterparty_view(
    response: &OppositePartiesResponse,
    filter: &str,
    top_n: usize,
    expanded: bool,
) -> CounterpartyView {
    let needle = address_key(filter);
    let mut parties: Vec<RankedParty> = response
        .parties
        .iter()
        .enumerate()
        .filter(|(_, party)| {
            needle.is_empty()
                || party
                    .address
                    .as_deref()
                    .is_some_and(|a| address_key(a).contains(&needle))
        })
        .map(|(idx, party)| RankedParty {
            rank: idx + 1,
            party: party.clone(),
        })
        .collect();

    let matched = parties.len();
    if !expanded {
        parties.truncate(top_n);
    }

    CounterpartyView {
        parties,
        matched,
        expanded,
        total_volume: response
            .total_volume
            .or_else(|| Decimal::checked_sum(response.parties.iter().map(|p| p.volume))),
        total_profit: response
            .total_profit
            .or_else(|| Decimal::checked_sum(response.parties.iter().map(|p| p.profit))),
    }
}
