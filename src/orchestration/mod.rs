//! Ledger ownership, debounced recomputation and result publishing.

pub mod command;
pub mod controller;
pub mod scheduler;
pub mod views;

pub use command::ControllerError;
pub use controller::{backfill, ControllerHandle, ControllerSettings, LedgerController};
pub use scheduler::{DebounceDelays, Timer, UpdateScheduler};
pub use views::{ColumnVisibility, OrderRow, PublishedViews, DEFAULT_COLUMNS};
