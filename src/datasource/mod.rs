//! Data source abstraction for the order backend: history backfill,
//! counterparty rankings and taker profile enrichment.

use crate::domain::{FillRecord, TraderProfile};
use crate::engine::OppositePartiesResponse;
use async_trait::async_trait;
use std::fmt;

pub mod backend;
pub mod mock;

pub use backend::HttpBackend;
pub use mock::MockBackend;

/// The backend services this process reads from.
///
/// Implementations must handle retry/backoff themselves; callers treat any
/// error as "leave the affected view unchanged".
#[async_trait]
pub trait DataSource: Send + Sync + fmt::Debug {
    /// Recent order history, newest first.
    async fn fetch_history(&self) -> Result<Vec<FillRecord>, DataSourceError>;

    /// Opposite parties ranked by the backend, optionally restricted to one
    /// user substring.
    async fn fetch_opposite_parties(
        &self,
        user_filter: Option<&str>,
    ) -> Result<OppositePartiesResponse, DataSourceError>;

    /// Profiles for the given addresses. Addresses without a profile are
    /// omitted from the result.
    ///
    /// Returned addresses are case-folded.
    async fn enrich_takers(
        &self,
        addresses: &[String],
    ) -> Result<Vec<(String, TraderProfile)>, DataSourceError>;
}

/// Error type for data source operations.
#[derive(Debug, Clone, PartialEq)]
pub enum DataSourceError {
    /// Network error (e.g., connection timeout, DNS failure)
    NetworkError(String),
    /// HTTP error (e.g., 429 rate limit, 5xx server error)
    HttpError { status: u16, message: String },
    /// Parsing error (invalid JSON or malformed response)
    ParseError(String),
    /// Rate limit exceeded (caller should implement backoff)
    RateLimited,
    /// The backend answered but reported a failure in its body
    Other(String),
}

impl fmt::Display for DataSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSourceError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            DataSourceError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            DataSourceError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            DataSourceError::RateLimited => write!(f, "Rate limited"),
            DataSourceError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for DataSourceError {}
