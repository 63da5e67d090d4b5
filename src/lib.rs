pub mod api;
pub mod config;
pub mod datasource;
pub mod domain;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod orchestration;

pub use config::Config;
pub use datasource::{DataSource, DataSourceError, HttpBackend, MockBackend};
pub use domain::{Decimal, FillRecord, OrderIdentity, ReferenceSource, Side, TimeMs, TraderProfile};
pub use error::AppError;
pub use ledger::{Ledger, LedgerSnapshot, UpsertOutcome};
pub use orchestration::{ControllerHandle, LedgerController, PublishedViews};
