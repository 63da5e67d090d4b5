//! Pure computation over ledger snapshots: visibility filtering and the
//! league, game and counterparty summaries.

pub mod counterparty;
pub mod filter;
pub mod game;
pub mod league;
pub mod spread;

pub use counterparty::{
    build_counterparty_view, CounterpartyView, OppositePartiesResponse, OppositeParty, RankedParty,
};
pub use filter::{filter_all, is_visible, FilterError, FilterKind, FilterState, TimeWindow};
pub use game::{apply_profiles, summarize_games, unprofiled_takers, GameSummary, TakerSummary, TeamSummary};
pub use league::{summarize_leagues, LeagueSummary, LeagueView};
pub use spread::{GroupAccumulator, ReferenceAccumulator, ReferenceStat, ReferenceStats};
