use super::spread::{GroupAccumulator, ReferenceStats};
use crate::domain::{Decimal, FillRecord};
use serde::Serialize;
use std::collections::HashMap;

pub const TOTAL_ROW: &str = "TOTAL";

/// One row of the league summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeagueSummary {
    pub league: String,
    pub fills: u64,
    pub fill_value: Decimal,
    pub references: ReferenceStats,
}

impl LeagueSummary {
    fn from_group(league: String, group: &GroupAccumulator) -> Self {
        Self {
            league,
            fills: group.fills,
            fill_value: group.fill_value,
            references: group.references.finish(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeagueView {
    /// Descending fill value, league name ascending on ties.
    pub leagues: Vec<LeagueSummary>,
    pub total: LeagueSummary,
}

impl Default for LeagueView {
    fn default() -> Self {
        summarize_leagues(std::iter::empty())
    }
}

/// Group visible records by league. Records without a market slug are left
/// out of this view entirely, including the total row.
pub fn summarize_leagues<'a, I>(records: I) -> LeagueView
where
    I: IntoIterator<Item = &'a FillRecord>,
{
    let mut groups: HashMap<String, GroupAccumulator> = HashMap::new();
    let mut total = GroupAccumulator::default();

    for record in records {
        let Some(league) = record.league() else {
            continue;
        };
        if groups.entry(league).or_default().add(record).is_some() {
            total.add(record);
        }
    }

    let mut leagues: Vec<LeagueSummary> = groups
        .into_iter()
        .map(|(league, group)| LeagueSummary::from_group(league, &group))
        .collect();
    leagues.sort_by(|a, b| {
        b.fill_value
            .cmp(&a.fill_value)
            .then_with(|| a.league.cmp(&b.league))
    });

    LeagueView {
        leagues,
        total: LeagueSummary::from_group(TOTAL_ROW.to_string(), &total),
    }
}
