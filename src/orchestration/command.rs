//! Messages into the ledger controller.

use super::views::ColumnVisibility;
use crate::datasource::DataSourceError;
use crate::domain::{FillRecord, TraderProfile};
use crate::engine::{CounterpartyView, FilterError, FilterKind, FilterState, OppositePartiesResponse};
use crate::ledger::UpsertOutcome;
use tokio::sync::oneshot;

/// Requests from handles. Every variant carries its reply channel.
#[derive(Debug)]
pub enum ControllerCommand {
    /// Upsert one live fill.
    Ingest {
        record: FillRecord,
        reply: oneshot::Sender<UpsertOutcome>,
    },
    /// Replay a backend history page (newest first) and mark the controller ready.
    ReplayHistory {
        records: Vec<FillRecord>,
        reply: oneshot::Sender<usize>,
    },
    SetFilter {
        kind: FilterKind,
        value: String,
        reply: oneshot::Sender<Result<FilterState, FilterError>>,
    },
    ToggleColumn {
        name: String,
        reply: oneshot::Sender<Option<ColumnVisibility>>,
    },
    SetCounterpartiesExpanded {
        expanded: bool,
        reply: oneshot::Sender<CounterpartyView>,
    },
}

/// Results of background fetches, tagged with the pass that started them.
#[derive(Debug)]
pub enum FetchOutcome {
    Counterparties {
        pass: u64,
        result: Result<OppositePartiesResponse, DataSourceError>,
    },
    Takers {
        pass: u64,
        addresses: Vec<String>,
        result: Result<Vec<(String, TraderProfile)>, DataSourceError>,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("ledger controller is not running")]
    Stopped,
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error("unknown column: {0}")]
    UnknownColumn(String),
}
