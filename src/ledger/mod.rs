//! Bounded reconciliation ledger: one entry per logical order.
//!
//! Entries are keyed by [`OrderIdentity`] and tracked in insertion order.
//! Capacity eviction always removes the oldest-inserted entry, regardless of
//! the trade time carried by the record.

use crate::domain::{find_existing_identity, primary_identity, FillRecord, OrderIdentity};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

pub const DEFAULT_CAPACITY: usize = 4000;

/// Result of a single upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertOutcome {
    pub identity: OrderIdentity,
    pub is_new_entry: bool,
    /// Identity the entry was stored under before an identity upgrade.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upgraded_from: Option<OrderIdentity>,
    /// Entry dropped to stay within capacity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evicted: Option<OrderIdentity>,
}

#[derive(Debug, Clone)]
struct Entry {
    seq: u64,
    record: Arc<FillRecord>,
}

/// One row of a ledger snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub identity: OrderIdentity,
    pub record: Arc<FillRecord>,
}

/// Point-in-time copy of the ledger, newest entry first.
///
/// Records are shared with the ledger behind `Arc`, but the ledger never
/// mutates a stored record in place, so later upserts are not observed here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerSnapshot {
    entries: Vec<LedgerEntry>,
}

impl LedgerSnapshot {
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn records(&self) -> impl Iterator<Item = &FillRecord> {
        self.entries.iter().map(|e| e.record.as_ref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<LedgerEntry> for LedgerSnapshot {
    fn from_iter<I: IntoIterator<Item = LedgerEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug)]
pub struct Ledger {
    capacity: usize,
    next_seq: u64,
    entries: HashMap<OrderIdentity, Entry>,
    order: BTreeMap<u64, OrderIdentity>,
}

impl Ledger {
    /// Create an empty ledger. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            next_seq: 0,
            entries: HashMap::new(),
            order: BTreeMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, identity: &OrderIdentity) -> bool {
        self.entries.contains_key(identity)
    }

    pub fn get(&self, identity: &OrderIdentity) -> Option<&FillRecord> {
        self.entries.get(identity).map(|e| e.record.as_ref())
    }

    /// Shared handle to a stored record.
    pub fn shared(&self, identity: &OrderIdentity) -> Option<Arc<FillRecord>> {
        self.entries.get(identity).map(|e| Arc::clone(&e.record))
    }

    /// The stored identity an incoming record would update, if any.
    pub fn find_existing(&self, record: &FillRecord) -> Option<OrderIdentity> {
        find_existing_identity(record, |id| self.contains(id))
    }

    /// Insert a new logical order or replace an existing one.
    ///
    /// An update whose strongest key differs from the stored key migrates the
    /// entry to the stronger key. The migrated entry keeps its insertion
    /// position.
    pub fn upsert(&mut self, record: FillRecord) -> UpsertOutcome {
        let existing = self.find_existing(&record);
        let next = primary_identity(&record);
        let record = Arc::new(record);

        if let Some(existing) = existing {
            if let Some(mut entry) = self.entries.remove(&existing) {
                entry.record = record;
                let upgraded_from = (existing != next).then(|| existing.clone());
                if upgraded_from.is_some() {
                    tracing::debug!(from = %existing, to = %next, "identity upgraded");
                }
                self.order.insert(entry.seq, next.clone());
                self.entries.insert(next.clone(), entry);
                return UpsertOutcome {
                    identity: next,
                    is_new_entry: false,
                    upgraded_from,
                    evicted: None,
                };
            }
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, next.clone());
        self.entries.insert(next.clone(), Entry { seq, record });

        let evicted = if self.entries.len() > self.capacity {
            self.evict_oldest()
        } else {
            None
        };

        UpsertOutcome {
            identity: next,
            is_new_entry: true,
            upgraded_from: None,
            evicted,
        }
    }

    fn evict_oldest(&mut self) -> Option<OrderIdentity> {
        let (_, identity) = self.order.pop_first()?;
        self.entries.remove(&identity);
        tracing::debug!(identity = %identity, capacity = self.capacity, "evicted oldest entry");
        Some(identity)
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        self.order
            .values()
            .rev()
            .filter_map(|identity| {
                self.entries.get(identity).map(|entry| LedgerEntry {
                    identity: identity.clone(),
                    record: Arc::clone(&entry.record),
                })
            })
            .collect()
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyed(tx: &str, log: u64) -> FillRecord {
        FillRecord {
            tx_hash: Some(tx.to_string()),
            log_index: Some(log),
            ..Default::default()
        }
    }

    #[test]
    fn test_snapshot_is_newest_first() {
        let mut ledger = Ledger::new(10);
        ledger.upsert(keyed("a", 0));
        ledger.upsert(keyed("b", 0));
        ledger.upsert(keyed("c", 0));

        let ids: Vec<String> = ledger
            .snapshot()
            .entries()
            .iter()
            .map(|e| e.identity.to_string())
            .collect();
        assert_eq!(ids, vec!["c_0", "b_0", "a_0"]);
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_mutation() {
        let mut ledger = Ledger::new(10);
        ledger.upsert(keyed("a", 0));
        let snapshot = ledger.snapshot();

        let mut updated = keyed("a", 0);
        updated.user = Some("0xnew".to_string());
        ledger.upsert(updated);
        ledger.upsert(keyed("b", 0));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.entries()[0].record.user, None);
    }

    #[test]
    fn test_upgrade_keeps_insertion_position() {
        let mut ledger = Ledger::new(2);
        let placeholder = FillRecord {
            order_hash: Some("oh1".to_string()),
            log_index: Some(5),
            ..Default::default()
        };
        ledger.upsert(placeholder);
        ledger.upsert(keyed("other", 1));

        let mut confirmed = keyed("0xabc", 5);
        confirmed.order_hash = Some("oh1".to_string());
        let outcome = ledger.upsert(confirmed);
        assert_eq!(outcome.upgraded_from, Some(OrderIdentity::canonical("oh1_5")));

        // The upgraded entry is still the oldest, so it is evicted first.
        let outcome = ledger.upsert(keyed("third", 2));
        assert_eq!(outcome.evicted, Some(OrderIdentity::canonical("0xabc_5")));
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let ledger = Ledger::new(0);
        assert_eq!(ledger.capacity(), 1);
    }
}
