//! Composable visibility filters over fill records.

use crate::domain::{FillRecord, TimeMs};
use crate::ledger::{LedgerEntry, LedgerSnapshot};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fixed look-back windows offered by the time filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeWindow {
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "6h")]
    SixHours,
    #[serde(rename = "12h")]
    TwelveHours,
    #[serde(rename = "24h")]
    OneDay,
    #[serde(rename = "48h")]
    TwoDays,
    #[default]
    #[serde(rename = "all")]
    All,
}

impl TimeWindow {
    pub fn hours(&self) -> Option<i64> {
        match self {
            TimeWindow::OneHour => Some(1),
            TimeWindow::SixHours => Some(6),
            TimeWindow::TwelveHours => Some(12),
            TimeWindow::OneDay => Some(24),
            TimeWindow::TwoDays => Some(48),
            TimeWindow::All => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeWindow::OneHour => "1h",
            TimeWindow::SixHours => "6h",
            TimeWindow::TwelveHours => "12h",
            TimeWindow::OneDay => "24h",
            TimeWindow::TwoDays => "48h",
            TimeWindow::All => "all",
        }
    }
}

impl FromStr for TimeWindow {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1h" => Ok(TimeWindow::OneHour),
            "6h" => Ok(TimeWindow::SixHours),
            "12h" => Ok(TimeWindow::TwelveHours),
            "24h" => Ok(TimeWindow::OneDay),
            "48h" => Ok(TimeWindow::TwoDays),
            "all" | "" => Ok(TimeWindow::All),
            other => Err(FilterError::InvalidWindow(other.to_string())),
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four filters applied together to every record.
///
/// Text filters are stored case-folded; an empty string means no restriction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    pub time: TimeWindow,
    pub game: String,
    pub counterparty: String,
    pub user: String,
}

/// Which filter a `set_filter` command targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    Time,
    Game,
    Counterparty,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    #[error("unknown time window: {0}")]
    InvalidWindow(String),
}

impl FilterState {
    /// Return a new state with one filter replaced.
    pub fn with(&self, kind: FilterKind, value: &str) -> Result<Self, FilterError> {
        let mut next = self.clone();
        match kind {
            FilterKind::Time => next.time = value.parse()?,
            FilterKind::Game => next.game = fold(value),
            FilterKind::Counterparty => next.counterparty = fold(value),
            FilterKind::User => next.user = fold(value),
        }
        Ok(next)
    }
}

fn fold(value: &str) -> String {
    value.trim().to_lowercase()
}

fn contains_folded(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|h| h.to_lowercase().contains(&fold(needle)))
}

pub fn passes_time_window(record: &FillRecord, filter: &FilterState, now: TimeMs) -> bool {
    let Some(hours) = filter.time.hours() else {
        return true;
    };
    let cutoff = now.saturating_sub_ms(hours * 60 * 60 * 1000);
    record.event_time().is_some_and(|t| t >= cutoff)
}

pub fn passes_game(record: &FillRecord, filter: &FilterState) -> bool {
    filter.game.is_empty() || contains_folded(record.market_slug.as_deref(), &filter.game)
}

pub fn passes_counterparty(record: &FillRecord, filter: &FilterState) -> bool {
    filter.counterparty.is_empty()
        || contains_folded(record.user.as_deref(), &filter.counterparty)
        || contains_folded(record.taker.as_deref(), &filter.counterparty)
}

pub fn passes_user(record: &FillRecord, filter: &FilterState) -> bool {
    filter.user.is_empty() || contains_folded(record.user.as_deref(), &filter.user)
}

pub fn is_visible(record: &FillRecord, filter: &FilterState, now: TimeMs) -> bool {
    passes_time_window(record, filter, now)
        && passes_game(record, filter)
        && passes_counterparty(record, filter)
        && passes_user(record, filter)
}

/// Order-preserving subsequence of visible entries.
pub fn filter_all<'a>(
    snapshot: &'a LedgerSnapshot,
    filter: &FilterState,
    now: TimeMs,
) -> Vec<&'a LedgerEntry> {
    snapshot
        .entries()
        .iter()
        .filter(|entry| is_visible(&entry.record, filter, now))
        .collect()
}
