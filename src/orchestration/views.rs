//! Published results: everything the HTTP layer is allowed to read.

use crate::domain::{FillRecord, OrderIdentity};
use crate::engine::{CounterpartyView, FilterState, GameSummary, LeagueView};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Order-table columns that can be shown or hidden.
pub const DEFAULT_COLUMNS: [&str; 8] = [
    "pm_before",
    "pm_after",
    "sportsbook",
    "pinnacle_before",
    "pinnacle_after",
    "pinnacle_sportsbook",
    "taker",
    "user",
];

/// Visibility of each order-table column; every column starts visible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ColumnVisibility(BTreeMap<String, bool>);

impl ColumnVisibility {
    pub fn is_visible(&self, column: &str) -> Option<bool> {
        self.0.get(column).copied()
    }

    /// Flip one column. Returns the new visibility, or `None` for an unknown
    /// column.
    pub fn toggle(&mut self, column: &str) -> Option<bool> {
        let slot = self.0.get_mut(column)?;
        *slot = !*slot;
        Some(*slot)
    }
}

impl Default for ColumnVisibility {
    fn default() -> Self {
        Self(
            DEFAULT_COLUMNS
                .iter()
                .map(|column| (column.to_string(), true))
                .collect(),
        )
    }
}

/// One ledger entry as published to the order table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderRow {
    pub identity: OrderIdentity,
    /// Whether the row passes the current filter state.
    pub visible: bool,
    pub record: Arc<FillRecord>,
}

/// The latest state published by the controller.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedViews {
    /// Incremented on every publish.
    pub revision: u64,
    /// Set once the startup backfill has been applied (or skipped).
    pub ready: bool,
    pub filter: FilterState,
    pub columns: ColumnVisibility,
    /// Every ledger entry, newest first.
    pub orders: Vec<OrderRow>,
    /// Summary views are shared between publishes until they are recomputed.
    pub leagues: Arc<LeagueView>,
    pub games: Arc<Vec<GameSummary>>,
    pub counterparties: Arc<CounterpartyView>,
    /// Completed league/game recomputes.
    pub summary_passes: u64,
    /// Counterparty fetch results that were applied.
    pub counterparty_passes: u64,
}

impl PublishedViews {
    pub fn visible_orders(&self) -> impl Iterator<Item = &OrderRow> {
        self.orders.iter().filter(|row| row.visible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_start_visible_and_toggle() {
        let mut columns = ColumnVisibility::default();
        assert_eq!(columns.is_visible("taker"), Some(true));

        assert_eq!(columns.toggle("taker"), Some(false));
        assert_eq!(columns.is_visible("taker"), Some(false));
        assert_eq!(columns.toggle("taker"), Some(true));

        assert_eq!(columns.toggle("nope"), None);
    }

    #[test]
    fn test_columns_serialize_as_map() {
        let json = serde_json::to_value(ColumnVisibility::default()).unwrap();
        assert_eq!(json["pm_after"], serde_json::json!(true));
        assert_eq!(json.as_object().map(|m| m.len()), Some(DEFAULT_COLUMNS.len()));
    }
}
