use fill_ledger::datasource::MockBackend;
use fill_ledger::domain::{Decimal, FillRecord, ReferenceSnapshot, ReferenceSource};
use fill_ledger::engine::{FilterKind, OppositeParty};
use fill_ledger::orchestration::{backfill, ControllerSettings, LedgerController};
use fill_ledger::TraderProfile;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

fn d(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
}

fn fill(tx: &str, price: &str) -> FillRecord {
    FillRecord {
        tx_hash: Some(tx.to_string()),
        log_index: Some(0),
        market_slug: Some("nba-lal-bos".to_string()),
        token_label: Some("Lakers".to_string()),
        price: d(price),
        shares_normalized: d("10"),
        polymarket_before: Some(ReferenceSnapshot::with_bbo(d("0.5"))),
        ..Default::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_burst_of_updates_coalesces_into_one_pass() {
    let handle = LedgerController::spawn(ControllerSettings::default(), Arc::new(MockBackend::new()));

    for i in 0..50 {
        let price = format!("0.{}", 51 + i % 40);
        handle.ingest(fill("0xsame", &price)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    // Last write: price 0.60 → spread (0.60 - 0.50) * 10 = 1
    handle.ingest(fill("0xsame", "0.60")).await.unwrap();
    assert_eq!(handle.views().summary_passes, 0);

    tokio::time::sleep(Duration::from_secs(2)).await;

    let views = handle.views();
    assert_eq!(views.summary_passes, 1);
    assert_eq!(views.leagues.total.fills, 1);
    assert_eq!(
        views.leagues.total.references[&ReferenceSource::PolymarketBefore].spread,
        d("1")
    );
}

#[tokio::test(start_paused = true)]
async fn test_update_waits_longer_than_new_entry() {
    let handle = LedgerController::spawn(ControllerSettings::default(), Arc::new(MockBackend::new()));

    handle.ingest(fill("0xa", "0.55")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(handle.views().summary_passes, 1);

    handle.ingest(fill("0xa", "0.56")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(handle.views().summary_passes, 1);

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(handle.views().summary_passes, 2);
}

#[tokio::test(start_paused = true)]
async fn test_stale_counterparty_fetch_is_discarded() {
    let backend = MockBackend::new()
        .with_party(OppositeParty {
            address: Some("0xfeed".to_string()),
            volume: d("100"),
            ..Default::default()
        })
        .with_parties_delay(Duration::from_millis(500));
    let calls = backend.calls();
    let handle = LedgerController::spawn(ControllerSettings::default(), Arc::new(backend));

    handle.ingest(fill("0xa", "0.55")).await.unwrap();
    // The debounce fires at 100ms and starts the first fetch.
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(calls.parties.load(Ordering::SeqCst), 1);

    // A filter change starts a newer fetch before the first one returns.
    handle.set_filter(FilterKind::User, "0xABC").await.unwrap();

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(calls.parties.load(Ordering::SeqCst), 2);

    let views = handle.views();
    assert_eq!(views.counterparty_passes, 1);
    assert_eq!(views.counterparties.parties.len(), 1);
    assert_eq!(
        calls.party_filters.lock().unwrap().as_slice(),
        &[None, Some("0xabc".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn test_failed_counterparty_fetch_keeps_previous_view() {
    let backend = MockBackend::new().with_parties_error(
        fill_ledger::DataSourceError::HttpError {
            status: 500,
            message: "Server error".to_string(),
        },
    );
    let handle = LedgerController::spawn(ControllerSettings::default(), Arc::new(backend));

    handle.ingest(fill("0xa", "0.55")).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    let views = handle.views();
    assert_eq!(views.summary_passes, 1);
    assert_eq!(views.counterparty_passes, 0);
    assert!(views.counterparties.parties.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_backfill_replays_oldest_first_and_enriches_takers() {
    let mut newest = fill("0xb", "0.52");
    newest.taker = Some("0xTAKER".to_string());
    let mut oldest = fill("0xa", "0.51");
    oldest.taker = Some("0xtaker".to_string());

    let backend = MockBackend::new()
        .with_history(vec![newest, oldest])
        .with_profile(
            "0xtaker",
            TraderProfile {
                pseudonym: Some("Sharp-Owl".to_string()),
                ..Default::default()
            },
        );
    let calls = backend.calls();
    let settings = ControllerSettings {
        capacity: 2,
        ..Default::default()
    };
    let handle = LedgerController::spawn(settings, Arc::new(backend.clone()));

    let replayed = backfill(&handle, &backend).await.unwrap();
    assert_eq!(replayed, 2);

    let views = handle.views();
    assert!(views.ready);
    let order: Vec<String> = views.orders.iter().map(|r| r.identity.to_string()).collect();
    assert_eq!(order, vec!["0xb_0", "0xa_0"]);
    assert_eq!(views.summary_passes, 1);

    tokio::time::sleep(Duration::from_millis(10)).await;
    let views = handle.views();
    let taker = &views.games[0].top_takers[0];
    assert_eq!(taker.address, "0xtaker");
    assert_eq!(taker.fills, 2);
    assert_eq!(
        taker.profile.as_ref().and_then(|p| p.display_name()),
        Some("Sharp-Owl")
    );
    assert_eq!(calls.enrich.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_enrichment_answered_after_a_newer_request_still_decorates() {
    let backend = MockBackend::new()
        .with_profile(
            "0xaaa",
            TraderProfile {
                name: Some("first".to_string()),
                ..Default::default()
            },
        )
        .with_profile(
            "0xbbb",
            TraderProfile {
                name: Some("second".to_string()),
                ..Default::default()
            },
        )
        .with_enrich_delay(Duration::from_millis(500));
    let calls = backend.calls();
    let handle = LedgerController::spawn(ControllerSettings::default(), Arc::new(backend));

    let mut first = fill("0xa", "0.55");
    first.taker = Some("0xaaa".to_string());
    handle.ingest(first).await.unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;

    // A second taker appears while the first enrichment is still in flight.
    let mut second = fill("0xb", "0.56");
    second.taker = Some("0xbbb".to_string());
    handle.ingest(second).await.unwrap();

    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(
        calls.enriched.lock().unwrap().as_slice(),
        &[vec!["0xaaa".to_string()], vec!["0xbbb".to_string()]]
    );
    let views = handle.views();
    let names: Vec<(&str, Option<&str>)> = views.games[0]
        .top_takers
        .iter()
        .map(|t| (t.address.as_str(), t.profile.as_ref().and_then(|p| p.display_name())))
        .collect();
    assert_eq!(names, vec![("0xbbb", Some("second")), ("0xaaa", Some("first"))]);
}
