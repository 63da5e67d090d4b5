//! Domain types for the fill ledger.
//!
//! This module provides:
//! - Lossless numeric handling via the Decimal wrapper
//! - Domain primitives: TimeMs, Side
//! - FillRecord and its reference snapshots, with forgiving deserialization
//! - Canonical order identity resolution
//! - Trader profiles from the enrichment backend

pub mod decimal;
pub mod fill;
pub mod identity;
pub mod lenient;
pub mod primitives;
pub mod profile;
pub mod reference;

pub use decimal::Decimal;
pub use fill::FillRecord;
pub use identity::{candidate_identities, find_existing_identity, primary_identity, OrderIdentity};
pub use primitives::{Side, TimeMs};
pub use profile::{address_key, TraderProfile};
pub use reference::{parse_fraction, ReferenceSnapshot, ReferenceSource};
