//! Canonical order identity resolution.
//!
//! A single real-world fill can be delivered several times with progressively
//! more identifying fields (an order hash before the transaction is mined, a
//! transaction hash afterwards). Every delivery is mapped to a list of
//! candidate keys in strength order; the strongest available key is the
//! record's canonical identity.

use super::FillRecord;
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static TEMPORARY_SEQ: AtomicU64 = AtomicU64::new(0);

/// Ledger key for one logical order. Cloning shares the key text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OrderIdentity {
    /// Derived from the record's own fields; later deliveries can resolve to it.
    Canonical(Arc<str>),
    /// Locally generated for records with no usable key. Never a candidate.
    Temporary(Arc<str>),
}

impl OrderIdentity {
    pub fn canonical(key: impl Into<Arc<str>>) -> Self {
        OrderIdentity::Canonical(key.into())
    }

    /// Generate an identity unique for the lifetime of the process.
    pub fn temporary() -> Self {
        let seq = TEMPORARY_SEQ.fetch_add(1, Ordering::Relaxed);
        let millis = chrono::Utc::now().timestamp_millis();
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        OrderIdentity::Temporary(format!("tmp-{}-{}-{}", millis, seq, &nonce[..8]).into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            OrderIdentity::Canonical(key) | OrderIdentity::Temporary(key) => &**key,
        }
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, OrderIdentity::Temporary(_))
    }
}

impl fmt::Display for OrderIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for OrderIdentity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Candidate keys for a record, strongest first, deduplicated.
///
/// Priority: `{tx}_{log}`, `{order}_{log}`, `{block}_{log}`, `_{log}`, `tx`,
/// `order`. Absent fields simply drop their candidates, so the result may be
/// empty.
pub fn candidate_identities(record: &FillRecord) -> Vec<String> {
    let tx = record.tx_hash.as_deref();
    let order = record.order_hash.as_deref();
    let block = record.block_number;
    let log = record.log_index;

    let mut candidates: Vec<String> = Vec::with_capacity(6);
    let mut push = |key: String| {
        if !candidates.contains(&key) {
            candidates.push(key);
        }
    };

    if let Some(log) = log {
        if let Some(tx) = tx {
            push(format!("{}_{}", tx, log));
        }
        if let Some(order) = order {
            push(format!("{}_{}", order, log));
        }
        if let Some(block) = block {
            push(format!("{}_{}", block, log));
        }
        push(format!("_{}", log));
    }
    if let Some(tx) = tx {
        push(tx.to_string());
    }
    if let Some(order) = order {
        push(order.to_string());
    }

    candidates
}

/// The strongest candidate, or a fresh temporary identity.
pub fn primary_identity(record: &FillRecord) -> OrderIdentity {
    candidate_identities(record)
        .into_iter()
        .next()
        .map(OrderIdentity::canonical)
        .unwrap_or_else(OrderIdentity::temporary)
}

/// The first candidate (in priority order) for which `is_known` holds.
pub fn find_existing_identity<F>(record: &FillRecord, is_known: F) -> Option<OrderIdentity>
where
    F: Fn(&OrderIdentity) -> bool,
{
    candidate_identities(record)
        .into_iter()
        .map(OrderIdentity::canonical)
        .find(|candidate| is_known(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn record(tx: Option<&str>, order: Option<&str>, block: Option<u64>, log: Option<u64>) -> FillRecord {
        FillRecord {
            tx_hash: tx.map(str::to_string),
            order_hash: order.map(str::to_string),
            block_number: block,
            log_index: log,
            ..Default::default()
        }
    }

    #[test]
    fn test_full_priority_order() {
        let r = record(Some("0xabc"), Some("oh1"), Some(100), Some(5));
        assert_eq!(
            candidate_identities(&r),
            vec!["0xabc_5", "oh1_5", "100_5", "_5", "0xabc", "oh1"]
        );
    }

    #[test]
    fn test_no_log_index() {
        let r = record(Some("0xabc"), Some("oh1"), Some(100), None);
        assert_eq!(candidate_identities(&r), vec!["0xabc", "oh1"]);
    }

    #[test]
    fn test_log_index_only_is_placeholder() {
        let r = record(None, None, None, Some(7));
        assert_eq!(candidate_identities(&r), vec!["_7"]);
        assert_eq!(primary_identity(&r), OrderIdentity::canonical("_7"));
    }

    #[test]
    fn test_candidates_are_deduplicated() {
        let r = record(Some("same"), Some("same"), None, Some(1));
        assert_eq!(candidate_identities(&r), vec!["same_1", "_1", "same"]);
    }

    #[test]
    fn test_empty_record_gets_unique_temporary_identity() {
        let r = FillRecord::default();
        assert!(candidate_identities(&r).is_empty());

        let ids: HashSet<OrderIdentity> = (0..100).map(|_| primary_identity(&r)).collect();
        assert_eq!(ids.len(), 100);
        assert!(ids.iter().all(OrderIdentity::is_temporary));
    }

    #[test]
    fn test_temporary_never_matches_canonical() {
        let temp = OrderIdentity::temporary();
        let r = record(Some(temp.as_str()), None, None, None);
        assert_ne!(primary_identity(&r), temp);
    }

    #[test]
    fn test_find_existing_returns_first_known_candidate() {
        let r = record(Some("0xabc"), Some("oh1"), None, Some(5));
        let known: HashSet<OrderIdentity> = [
            OrderIdentity::canonical("oh1_5"),
            OrderIdentity::canonical("0xabc"),
        ]
        .into_iter()
        .collect();

        let found = find_existing_identity(&r, |id| known.contains(id));
        assert_eq!(found, Some(OrderIdentity::canonical("oh1_5")));
        assert_eq!(find_existing_identity(&r, |_| false), None);
    }
}
