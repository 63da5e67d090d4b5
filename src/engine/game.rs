use super::spread::{GroupAccumulator, ReferenceStats};
use crate::domain::{address_key, Decimal, FillRecord, ReferenceSource, TraderProfile};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

pub const TOP_TAKERS: usize = 3;

/// Per-team breakdown inside a game, keyed by token label.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamSummary {
    pub team: String,
    pub fills: u64,
    /// Arithmetic mean of fill prices.
    pub avg_price: Option<Decimal>,
    pub max_fill_value: Decimal,
    pub references: ReferenceStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TakerSummary {
    pub address: String,
    pub volume: Decimal,
    pub fills: u64,
    /// Mean of `(price - pm_after) / price * 100` over this taker's fills.
    pub avg_pm_after_pct: Option<Decimal>,
    pub profile: Option<TraderProfile>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
    pub game: String,
    pub league: Option<String>,
    pub fills: u64,
    pub fill_value: Decimal,
    pub references: ReferenceStats,
    pub teams: Vec<TeamSummary>,
    pub top_takers: Vec<TakerSummary>,
}

#[derive(Default)]
struct TeamAccumulator {
    group: GroupAccumulator,
    price_sum: Decimal,
    max_fill_value: Decimal,
}

impl TeamAccumulator {
    fn add(&mut self, record: &FillRecord) {
        let Some(price_sum) = self.price_sum.checked_add(record.price) else {
            return;
        };
        if let Some(value) = self.group.add(record) {
            self.price_sum = price_sum;
            self.max_fill_value = self.max_fill_value.max(value);
        }
    }
}

#[derive(Default)]
struct TakerAccumulator {
    volume: Decimal,
    fills: u64,
    pct_sum: Decimal,
    pct_count: i64,
}

impl TakerAccumulator {
    fn add(&mut self, record: &FillRecord, value: Decimal) {
        let Some(volume) = self.volume.checked_add(value) else {
            return;
        };
        self.volume = volume;
        self.fills += 1;

        let pct_sum = record
            .price_diff(ReferenceSource::PolymarketAfter)
            .and_then(|diff| diff.percent_of(record.price))
            .and_then(|pct| self.pct_sum.checked_add(pct));
        if let Some(pct_sum) = pct_sum {
            self.pct_sum = pct_sum;
            self.pct_count += 1;
        }
    }

    fn mean_pct(&self) -> Option<Decimal> {
        self.pct_sum.checked_div(Decimal::from_i64(self.pct_count))
    }
}

#[derive(Default)]
struct GameAccumulator {
    league: Option<String>,
    group: GroupAccumulator,
    teams: HashMap<String, TeamAccumulator>,
    takers: HashMap<String, TakerAccumulator>,
}

impl GameAccumulator {
    fn add(&mut self, record: &FillRecord) {
        if self.league.is_none() {
            self.league = record.league();
        }
        let Some(value) = self.group.add(record) else {
            return;
        };

        if let Some(team) = record.token_label.as_deref() {
            self.teams.entry(team.to_string()).or_default().add(record);
        }

        if let Some(taker) = record.taker.as_deref() {
            self.takers
                .entry(address_key(taker))
                .or_default()
                .add(record, value);
        }
    }

    fn finish(self, game: String) -> GameSummary {
        let mut teams: Vec<TeamSummary> = self
            .teams
            .into_iter()
            .map(|(team, acc)| TeamSummary {
                team,
                fills: acc.group.fills,
                avg_price: acc
                    .price_sum
                    .checked_div(Decimal::from_i64(acc.group.fills as i64)),
                max_fill_value: acc.max_fill_value,
                references: acc.group.references.finish(),
            })
            .collect();
        teams.sort_by(|a, b| a.team.cmp(&b.team));

        let mut takers: Vec<TakerSummary> = self
            .takers
            .into_iter()
            .map(|(address, acc)| TakerSummary {
                volume: acc.volume,
                fills: acc.fills,
                avg_pm_after_pct: acc.mean_pct(),
                profile: None,
                address,
            })
            .collect();
        takers.sort_by(|a, b| {
            b.volume
                .cmp(&a.volume)
                .then_with(|| a.address.cmp(&b.address))
        });
        takers.truncate(TOP_TAKERS);

        GameSummary {
            game,
            league: self.league,
            fills: self.group.fills,
            fill_value: self.group.fill_value,
            references: self.group.references.finish(),
            teams,
            top_takers: takers,
        }
    }
}

/// Group visible records by market slug, descending fill value.
///
/// Taker profiles are left empty; see [`apply_profiles`].
pub fn summarize_games<'a, I>(records: I) -> Vec<GameSummary>
where
    I: IntoIterator<Item = &'a FillRecord>,
{
    let mut games: HashMap<String, GameAccumulator> = HashMap::new();
    for record in records {
        let Some(slug) = record.market_slug.as_deref() else {
            continue;
        };
        games.entry(slug.to_string()).or_default().add(record);
    }

    let mut summaries: Vec<GameSummary> = games
        .into_iter()
        .map(|(game, acc)| acc.finish(game))
        .collect();
    summaries.sort_by(|a, b| {
        b.fill_value
            .cmp(&a.fill_value)
            .then_with(|| a.game.cmp(&b.game))
    });
    summaries
}

/// Top-taker addresses with no entry in `known`, deduplicated and sorted.
pub fn unprofiled_takers(games: &[GameSummary], known: &HashMap<String, TraderProfile>) -> Vec<String> {
    games
        .iter()
        .flat_map(|game| game.top_takers.iter())
        .filter(|taker| !known.contains_key(&taker.address))
        .map(|taker| taker.address.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Decorate top takers with any cached profile.
pub fn apply_profiles(games: &mut [GameSummary], profiles: &HashMap<String, TraderProfile>) {
    for taker in games.iter_mut().flat_map(|game| game.top_takers.iter_mut()) {
        if let Some(profile) = profiles.get(&taker.address) {
            taker.profile = Some(profile.clone());
        }
    }
}
