use fill_ledger::domain::{candidate_identities, FillRecord, OrderIdentity};
use fill_ledger::ledger::Ledger;
use serde_json::json;

fn record(value: serde_json::Value) -> FillRecord {
    serde_json::from_value(value).unwrap()
}

fn ids(ledger: &Ledger) -> Vec<String> {
    ledger
        .snapshot()
        .entries()
        .iter()
        .map(|e| e.identity.to_string())
        .collect()
}

#[test]
fn test_upsert_is_idempotent() {
    let mut ledger = Ledger::new(10);
    let fill = record(json!({"tx_hash": "0xabc", "log_index": 5, "price": 0.5, "shares_normalized": 10}));

    let first = ledger.upsert(fill.clone());
    let second = ledger.upsert(fill.clone());

    assert!(first.is_new_entry);
    assert!(!second.is_new_entry);
    assert_eq!(first.identity, second.identity);
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger.get(&first.identity), Some(&fill));
}

#[test]
fn test_identity_upgrade_from_order_hash_to_tx_hash() {
    let mut ledger = Ledger::new(10);

    let pending = ledger.upsert(record(json!({"order_hash": "oh1", "log_index": 5, "price": 0.5})));
    assert_eq!(pending.identity, OrderIdentity::canonical("oh1_5"));

    let mined = ledger.upsert(record(json!({
        "tx_hash": "0xabc",
        "order_hash": "oh1",
        "log_index": 5,
        "price": 0.5,
        "polymarket_after": {"bbo": 0.48}
    })));

    assert!(!mined.is_new_entry);
    assert_eq!(mined.identity, OrderIdentity::canonical("0xabc_5"));
    assert_eq!(mined.upgraded_from, Some(OrderIdentity::canonical("oh1_5")));
    assert_eq!(ids(&ledger), vec!["0xabc_5"]);
    assert!(!ledger.contains(&OrderIdentity::canonical("oh1_5")));

    let stored = ledger.get(&mined.identity).unwrap();
    assert!(stored.polymarket_after.is_some());
}

#[test]
fn test_late_reference_data_updates_in_place() {
    let mut ledger = Ledger::new(10);
    ledger.upsert(record(json!({"tx_hash": "0xa", "log_index": 1})));
    ledger.upsert(record(json!({"tx_hash": "0xb", "log_index": 1})));

    let outcome = ledger.upsert(record(json!({
        "tx_hash": "0xa",
        "log_index": 1,
        "sportbook": {"best_bid": 0.4}
    })));

    assert!(!outcome.is_new_entry);
    assert_eq!(ids(&ledger), vec!["0xb_1", "0xa_1"]);
}

#[test]
fn test_eviction_is_by_insertion_order() {
    let mut ledger = Ledger::new(2);
    // A carries the newest trade time but is inserted first.
    ledger.upsert(record(json!({"tx_hash": "A", "log_index": 0, "timestamp": 1_800_000_000})));
    ledger.upsert(record(json!({"tx_hash": "B", "log_index": 0, "timestamp": 1_600_000_000})));
    let outcome = ledger.upsert(record(json!({"tx_hash": "C", "log_index": 0, "timestamp": 1_700_000_000})));

    assert_eq!(outcome.evicted, Some(OrderIdentity::canonical("A_0")));
    assert_eq!(ids(&ledger), vec!["C_0", "B_0"]);
}

#[test]
fn test_keyless_records_never_merge() {
    let mut ledger = Ledger::new(10);
    let a = ledger.upsert(record(json!({"price": 0.5})));
    let b = ledger.upsert(record(json!({"price": 0.5})));

    assert!(a.identity.is_temporary());
    assert!(b.is_new_entry);
    assert_ne!(a.identity, b.identity);
    assert_eq!(ledger.len(), 2);
}

#[test]
fn test_candidates_from_wire_record() {
    let fill = record(json!({
        "tx_hash": "0xabc",
        "order_hash": "",
        "block_number": "0x10",
        "log_index": "3"
    }));
    assert_eq!(candidate_identities(&fill), vec!["0xabc_3", "16_3", "_3", "0xabc"]);
}

#[test]
fn test_snapshot_survives_eviction() {
    let mut ledger = Ledger::new(1);
    ledger.upsert(record(json!({"tx_hash": "A", "log_index": 0})));
    let snapshot = ledger.snapshot();
    ledger.upsert(record(json!({"tx_hash": "B", "log_index": 0})));

    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot.entries()[0].identity, OrderIdentity::canonical("A_0"));
    tokio_test::assert_ok!(serde_json::to_string(snapshot.entries()[0].record.as_ref()));
}
