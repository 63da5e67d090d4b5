//! Single-owner ledger controller.
//!
//! The controller task owns the ledger, the filter state and the scheduler.
//! Handles talk to it over an mpsc channel and read results from a watch
//! channel. Network fetches run in spawned tasks and report back tagged with
//! the pass that started them. Only the latest counterparty pass is applied;
//! taker profiles are merged into the cache whenever they arrive.

use super::command::{ControllerCommand, ControllerError, FetchOutcome};
use super::scheduler::{DebounceDelays, Timer, UpdateScheduler};
use super::views::{ColumnVisibility, OrderRow, PublishedViews};
use crate::config::Config;
use crate::datasource::DataSource;
use crate::domain::{FillRecord, TimeMs, TraderProfile};
use crate::engine::counterparty::DEFAULT_TOP_N;
use crate::engine::{
    apply_profiles, build_counterparty_view, filter_all, is_visible, summarize_games,
    summarize_leagues, unprofiled_takers, CounterpartyView, FilterKind, FilterState,
    OppositePartiesResponse,
};
use crate::ledger::{Ledger, LedgerSnapshot, UpsertOutcome, DEFAULT_CAPACITY};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

const COMMAND_BUFFER: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerSettings {
    pub capacity: usize,
    pub delays: DebounceDelays,
    pub top_n: usize,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            delays: DebounceDelays::default(),
            top_n: DEFAULT_TOP_N,
        }
    }
}

impl From<&Config> for ControllerSettings {
    fn from(config: &Config) -> Self {
        Self {
            capacity: config.ledger_capacity,
            delays: DebounceDelays {
                new_entry: config.new_order_debounce,
                update: config.update_debounce,
            },
            top_n: config.counterparty_top_n,
        }
    }
}

/// Clonable handle to a running [`LedgerController`].
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    commands: mpsc::Sender<ControllerCommand>,
    views: watch::Receiver<Arc<PublishedViews>>,
}

impl ControllerHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> ControllerCommand,
    ) -> Result<T, ControllerError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(build(tx))
            .await
            .map_err(|_| ControllerError::Stopped)?;
        rx.await.map_err(|_| ControllerError::Stopped)
    }

    pub async fn ingest(&self, record: FillRecord) -> Result<UpsertOutcome, ControllerError> {
        self.request(|reply| ControllerCommand::Ingest { record, reply })
            .await
    }

    /// Replay a newest-first history page and mark the controller ready.
    pub async fn replay_history(&self, records: Vec<FillRecord>) -> Result<usize, ControllerError> {
        self.request(|reply| ControllerCommand::ReplayHistory { records, reply })
            .await
    }

    pub async fn set_filter(
        &self,
        kind: FilterKind,
        value: impl Into<String>,
    ) -> Result<FilterState, ControllerError> {
        let value = value.into();
        let result = self
            .request(|reply| ControllerCommand::SetFilter { kind, value, reply })
            .await?;
        Ok(result?)
    }

    pub async fn toggle_column(&self, name: &str) -> Result<ColumnVisibility, ControllerError> {
        let column = name.to_string();
        self.request(|reply| ControllerCommand::ToggleColumn { name: column, reply })
            .await?
            .ok_or_else(|| ControllerError::UnknownColumn(name.to_string()))
    }

    pub async fn set_counterparties_expanded(
        &self,
        expanded: bool,
    ) -> Result<CounterpartyView, ControllerError> {
        self.request(|reply| ControllerCommand::SetCounterpartiesExpanded { expanded, reply })
            .await
    }

    /// The most recently published views.
    pub fn views(&self) -> Arc<PublishedViews> {
        Arc::clone(&self.views.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<PublishedViews>> {
        self.views.clone()
    }
}

pub struct LedgerController {
    settings: ControllerSettings,
    ledger: Ledger,
    filter: FilterState,
    scheduler: UpdateScheduler,
    profiles: HashMap<String, TraderProfile>,
    /// Addresses already sent for enrichment, including those in flight.
    requested_profiles: HashSet<String>,
    parties: Option<OppositePartiesResponse>,
    expanded: bool,
    counterparty_pass: u64,
    taker_pass: u64,
    source: Arc<dyn DataSource>,
    commands: mpsc::Receiver<ControllerCommand>,
    fetch_tx: mpsc::UnboundedSender<FetchOutcome>,
    fetch_rx: mpsc::UnboundedReceiver<FetchOutcome>,
    views_tx: watch::Sender<Arc<PublishedViews>>,
    published: PublishedViews,
}

impl LedgerController {
    pub fn new(settings: ControllerSettings, source: Arc<dyn DataSource>) -> (Self, ControllerHandle) {
        let (commands_tx, commands) = mpsc::channel(COMMAND_BUFFER);
        let (fetch_tx, fetch_rx) = mpsc::unbounded_channel();
        let published = PublishedViews::default();
        let (views_tx, views) = watch::channel(Arc::new(published.clone()));

        let controller = Self {
            settings,
            ledger: Ledger::new(settings.capacity),
            filter: FilterState::default(),
            scheduler: UpdateScheduler::new(settings.delays),
            profiles: HashMap::new(),
            requested_profiles: HashSet::new(),
            parties: None,
            expanded: false,
            counterparty_pass: 0,
            taker_pass: 0,
            source,
            commands,
            fetch_tx,
            fetch_rx,
            views_tx,
            published,
        };
        let handle = ControllerHandle {
            commands: commands_tx,
            views,
        };
        (controller, handle)
    }

    /// Start the controller on the current runtime.
    pub fn spawn(settings: ControllerSettings, source: Arc<dyn DataSource>) -> ControllerHandle {
        let (controller, handle) = Self::new(settings, source);
        tokio::spawn(controller.run());
        handle
    }

    /// Runs until every handle has been dropped.
    pub async fn run(mut self) {
        info!(
            capacity = self.ledger.capacity(),
            top_n = self.settings.top_n,
            "ledger controller started"
        );

        loop {
            let deadline = self.scheduler.next_deadline();
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => break,
                },
                Some(outcome) = self.fetch_rx.recv() => {
                    self.handle_fetch(outcome);
                }
                _ = wait_for(deadline) => {
                    self.fire_due();
                }
            }
        }

        info!(entries = self.ledger.len(), "ledger controller stopped");
    }

    fn handle_command(&mut self, cmd: ControllerCommand) {
        match cmd {
            ControllerCommand::Ingest { record, reply } => {
                let _ = reply.send(self.ingest(record));
            }
            ControllerCommand::ReplayHistory { records, reply } => {
                let _ = reply.send(self.replay_history(records));
            }
            ControllerCommand::SetFilter { kind, value, reply } => {
                let result = self.filter.with(kind, &value).map(|next| {
                    info!(?kind, value = %value, "filter changed");
                    self.filter = next.clone();
                    self.recompute_all();
                    next
                });
                let _ = reply.send(result);
            }
            ControllerCommand::ToggleColumn { name, reply } => {
                let toggled = self.published.columns.toggle(&name);
                if toggled.is_some() {
                    self.publish();
                }
                let _ = reply.send(toggled.map(|_| self.published.columns.clone()));
            }
            ControllerCommand::SetCounterpartiesExpanded { expanded, reply } => {
                self.expanded = expanded;
                self.rebuild_counterparty_view();
                self.publish();
                let _ = reply.send(self.published.counterparties.as_ref().clone());
            }
        }
    }

    fn ingest(&mut self, record: FillRecord) -> UpsertOutcome {
        let outcome = self.ledger.upsert(record);
        debug!(
            identity = %outcome.identity,
            is_new_entry = outcome.is_new_entry,
            "fill ingested"
        );
        self.scheduler.on_mutation(outcome.is_new_entry, Instant::now());
        self.apply_upsert(&outcome);
        self.publish();
        outcome
    }

    /// Patch the published rows for one upsert. Other rows keep their
    /// visibility until the next summaries pass.
    fn apply_upsert(&mut self, outcome: &UpsertOutcome) {
        let Some(record) = self.ledger.shared(&outcome.identity) else {
            return;
        };
        let row = OrderRow {
            identity: outcome.identity.clone(),
            visible: is_visible(&record, &self.filter, TimeMs::now()),
            record,
        };
        let orders = &mut self.published.orders;

        if let Some(evicted) = &outcome.evicted {
            if let Some(pos) = orders.iter().rposition(|r| &r.identity == evicted) {
                orders.remove(pos);
            }
        }

        if outcome.is_new_entry {
            orders.insert(0, row);
            return;
        }

        let stored_as = outcome.upgraded_from.as_ref().unwrap_or(&outcome.identity);
        match orders.iter().position(|r| &r.identity == stored_as) {
            Some(pos) => orders[pos] = row,
            None => {
                warn!(identity = %outcome.identity, "order row missing, refreshing all rows");
                let snapshot = self.ledger.snapshot();
                self.refresh_orders(&snapshot, TimeMs::now());
            }
        }
    }

    fn replay_history(&mut self, records: Vec<FillRecord>) -> usize {
        let count = records.len();
        for record in records.into_iter().rev() {
            self.ledger.upsert(record);
        }
        info!(count, entries = self.ledger.len(), "history replayed");
        self.published.ready = true;
        self.recompute_all();
        count
    }

    /// Recompute every view now and cancel whatever was pending.
    fn recompute_all(&mut self) {
        self.scheduler.cancel_all();
        let snapshot = self.ledger.snapshot();
        let now = TimeMs::now();

        self.published.filter = self.filter.clone();
        self.refresh_orders(&snapshot, now);
        self.recompute_summaries(&snapshot, now);
        self.rebuild_counterparty_view();
        self.start_counterparty_fetch();
        self.publish();
    }

    fn fire_due(&mut self) {
        let due = self.scheduler.take_due(Instant::now());
        if due.is_empty() {
            return;
        }

        for timer in due {
            match timer {
                Timer::Summaries => {
                    let snapshot = self.ledger.snapshot();
                    let now = TimeMs::now();
                    self.refresh_orders(&snapshot, now);
                    self.recompute_summaries(&snapshot, now);
                }
                Timer::Counterparties => self.start_counterparty_fetch(),
            }
        }
        self.publish();
    }

    fn refresh_orders(&mut self, snapshot: &LedgerSnapshot, now: TimeMs) {
        self.published.orders = snapshot
            .entries()
            .iter()
            .map(|entry| OrderRow {
                identity: entry.identity.clone(),
                visible: is_visible(&entry.record, &self.filter, now),
                record: Arc::clone(&entry.record),
            })
            .collect();
    }

    fn recompute_summaries(&mut self, snapshot: &LedgerSnapshot, now: TimeMs) {
        let visible: Vec<&FillRecord> = filter_all(snapshot, &self.filter, now)
            .into_iter()
            .map(|entry| entry.record.as_ref())
            .collect();

        self.published.leagues = Arc::new(summarize_leagues(visible.iter().copied()));
        let mut games = summarize_games(visible.iter().copied());
        apply_profiles(&mut games, &self.profiles);
        let missing: Vec<String> = unprofiled_takers(&games, &self.profiles)
            .into_iter()
            .filter(|address| !self.requested_profiles.contains(address))
            .collect();
        self.published.games = Arc::new(games);
        self.published.summary_passes += 1;

        debug!(
            visible = visible.len(),
            pass = self.published.summary_passes,
            "summaries recomputed"
        );

        if !missing.is_empty() {
            self.start_taker_enrichment(missing);
        }
    }

    fn rebuild_counterparty_view(&mut self) {
        match &self.parties {
            Some(parties) => {
                self.published.counterparties = Arc::new(build_counterparty_view(
                    parties,
                    &self.filter.counterparty,
                    self.settings.top_n,
                    self.expanded,
                ));
            }
            None => Arc::make_mut(&mut self.published.counterparties).expanded = self.expanded,
        }
    }

    fn start_counterparty_fetch(&mut self) {
        self.counterparty_pass += 1;
        let pass = self.counterparty_pass;
        let user_filter = (!self.filter.user.is_empty()).then(|| self.filter.user.clone());
        let source = Arc::clone(&self.source);
        let tx = self.fetch_tx.clone();

        tokio::spawn(async move {
            let result = source.fetch_opposite_parties(user_filter.as_deref()).await;
            let _ = tx.send(FetchOutcome::Counterparties { pass, result });
        });
    }

    fn start_taker_enrichment(&mut self, addresses: Vec<String>) {
        self.taker_pass += 1;
        let pass = self.taker_pass;
        self.requested_profiles.extend(addresses.iter().cloned());
        let source = Arc::clone(&self.source);
        let tx = self.fetch_tx.clone();

        tokio::spawn(async move {
            let result = source.enrich_takers(&addresses).await;
            let _ = tx.send(FetchOutcome::Takers {
                pass,
                addresses,
                result,
            });
        });
    }

    fn handle_fetch(&mut self, outcome: FetchOutcome) {
        match outcome {
            FetchOutcome::Counterparties { pass, result } => {
                if pass < self.counterparty_pass {
                    debug!(pass, latest = self.counterparty_pass, "discarding stale counterparty result");
                    return;
                }
                match result {
                    Ok(parties) => {
                        self.parties = Some(parties);
                        self.rebuild_counterparty_view();
                        self.published.counterparty_passes += 1;
                        self.publish();
                    }
                    Err(e) => {
                        warn!(error = %e, pass, "counterparty fetch failed, keeping previous view");
                    }
                }
            }
            FetchOutcome::Takers {
                pass,
                addresses,
                result,
            } => match result {
                // Profiles are additive: results from any pass are merged.
                Ok(profiles) => {
                    debug!(
                        pass,
                        latest = self.taker_pass,
                        requested = addresses.len(),
                        found = profiles.len(),
                        "taker profiles received"
                    );
                    self.profiles.extend(profiles);
                    apply_profiles(Arc::<Vec<_>>::make_mut(&mut self.published.games), &self.profiles);
                    self.publish();
                }
                Err(e) => {
                    warn!(error = %e, pass, "taker enrichment failed");
                    self.release_profiles(&addresses);
                }
            },
        }
    }

    fn release_profiles(&mut self, addresses: &[String]) {
        for address in addresses {
            self.requested_profiles.remove(address);
        }
    }

    fn publish(&mut self) {
        self.published.revision += 1;
        self.views_tx.send_replace(Arc::new(self.published.clone()));
    }
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

/// Fetch the backend history and replay it into the controller.
///
/// A failed fetch is logged and leaves the ledger empty; the controller is
/// marked ready either way.
pub async fn backfill(
    handle: &ControllerHandle,
    source: &dyn DataSource,
) -> Result<usize, ControllerError> {
    let records = match source.fetch_history().await {
        Ok(records) => records,
        Err(e) => {
            warn!(error = %e, "history backfill failed, starting with an empty ledger");
            Vec::new()
        }
    };
    handle.replay_history(records).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::MockBackend;
    use std::time::Duration;

    fn fill(tx: &str, log: u64) -> FillRecord {
        FillRecord {
            tx_hash: Some(tx.to_string()),
            log_index: Some(log),
            market_slug: Some("nba-lal-bos".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_ingest_publishes_rows_immediately() {
        let handle = LedgerController::spawn(ControllerSettings::default(), Arc::new(MockBackend::new()));

        let outcome = handle.ingest(fill("0xa", 1)).await.unwrap();
        assert!(outcome.is_new_entry);

        let views = handle.views();
        assert_eq!(views.orders.len(), 1);
        assert!(views.orders[0].visible);
        assert_eq!(views.summary_passes, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_summaries_follow_new_entry_delay() {
        let handle = LedgerController::spawn(ControllerSettings::default(), Arc::new(MockBackend::new()));
        handle.ingest(fill("0xa", 1)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(handle.views().summary_passes, 0);

        tokio::time::sleep(Duration::from_millis(100)).await;
        let views = handle.views();
        assert_eq!(views.summary_passes, 1);
        assert_eq!(views.leagues.total.fills, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_filter_change_recomputes_immediately() {
        let handle = LedgerController::spawn(ControllerSettings::default(), Arc::new(MockBackend::new()));
        handle.ingest(fill("0xa", 1)).await.unwrap();

        let state = handle.set_filter(FilterKind::Game, "NFL").await.unwrap();
        assert_eq!(state.game, "nfl");

        let views = handle.views();
        assert_eq!(views.summary_passes, 1);
        assert!(!views.orders[0].visible);
        assert_eq!(views.leagues.total.fills, 0);

        // The pending debounce was cancelled by the filter change.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(handle.views().summary_passes, 1);
    }

    fn rows(views: &PublishedViews) -> Vec<String> {
        views.orders.iter().map(|r| r.identity.to_string()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_overflowing_fill_keeps_controller_running() {
        let handle = LedgerController::spawn(ControllerSettings::default(), Arc::new(MockBackend::new()));

        let huge: FillRecord = serde_json::from_value(serde_json::json!({
            "tx_hash": "0xhuge",
            "log_index": 0,
            "market_slug": "nba-lal-bos",
            "taker": "0xwhale",
            "price": "1e15",
            "shares_normalized": "1e15"
        }))
        .unwrap();
        handle.ingest(huge).await.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(handle.views().summary_passes, 1);

        let mut normal = fill("0xb", 0);
        normal.price = crate::domain::Decimal::from_i64(1);
        normal.shares_normalized = crate::domain::Decimal::from_i64(4);
        let outcome = handle.ingest(normal).await.unwrap();
        assert!(outcome.is_new_entry);

        tokio::time::sleep(Duration::from_millis(500)).await;
        let views = handle.views();
        assert_eq!(views.orders.len(), 2);
        assert_eq!(views.summary_passes, 2);
        assert_eq!(views.leagues.total.fills, 1);
        assert_eq!(views.leagues.total.fill_value, crate::domain::Decimal::from_i64(4));
        assert!(views.games[0].top_takers.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ingest_patches_rows_in_place() {
        let settings = ControllerSettings {
            capacity: 2,
            ..Default::default()
        };
        let handle = LedgerController::spawn(settings, Arc::new(MockBackend::new()));

        let pending = FillRecord {
            order_hash: Some("oh1".to_string()),
            log_index: Some(5),
            ..Default::default()
        };
        handle.ingest(pending).await.unwrap();
        handle.ingest(fill("B", 0)).await.unwrap();
        assert_eq!(rows(&handle.views()), vec!["B_0", "oh1_5"]);

        let mined = FillRecord {
            tx_hash: Some("0xabc".to_string()),
            order_hash: Some("oh1".to_string()),
            log_index: Some(5),
            market_slug: Some("nfl-kc-buf".to_string()),
            ..Default::default()
        };
        handle.ingest(mined).await.unwrap();
        let views = handle.views();
        assert_eq!(rows(&views), vec!["B_0", "0xabc_5"]);
        assert_eq!(views.orders[1].record.market_slug.as_deref(), Some("nfl-kc-buf"));

        handle.ingest(fill("C", 0)).await.unwrap();
        assert_eq!(rows(&handle.views()), vec!["C_0", "B_0"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ingest_checks_visibility_of_new_row_only() {
        let handle = LedgerController::spawn(ControllerSettings::default(), Arc::new(MockBackend::new()));
        handle.ingest(fill("0xa", 1)).await.unwrap();
        handle.set_filter(FilterKind::Game, "nba").await.unwrap();
        let before = handle.views();

        let mut other = fill("0xb", 1);
        other.market_slug = Some("nfl-kc-buf".to_string());
        handle.ingest(other).await.unwrap();

        let after = handle.views();
        let flags: Vec<bool> = after.orders.iter().map(|r| r.visible).collect();
        assert_eq!(flags, vec![false, true]);
        // Summary views are shared with the previous publish until recomputed.
        assert_eq!(after.summary_passes, before.summary_passes);
        assert!(Arc::ptr_eq(&before.games, &after.games));
        assert!(Arc::ptr_eq(&before.leagues, &after.leagues));
    }

    #[tokio::test]
    async fn test_invalid_filter_and_column_are_rejected() {
        let handle = LedgerController::spawn(ControllerSettings::default(), Arc::new(MockBackend::new()));

        let err = handle.set_filter(FilterKind::Time, "3d").await.unwrap_err();
        assert!(matches!(err, ControllerError::Filter(_)));

        let err = handle.toggle_column("nope").await.unwrap_err();
        assert!(matches!(err, ControllerError::UnknownColumn(name) if name == "nope"));

        let columns = handle.toggle_column("user").await.unwrap();
        assert_eq!(columns.is_visible("user"), Some(false));
    }

    #[tokio::test]
    async fn test_backfill_failure_leaves_ledger_empty_but_ready() {
        let source = MockBackend::new()
            .with_history_error(crate::datasource::DataSourceError::RateLimited);
        let handle = LedgerController::spawn(ControllerSettings::default(), Arc::new(source.clone()));

        let replayed = backfill(&handle, &source).await.unwrap();
        assert_eq!(replayed, 0);

        let views = handle.views();
        assert!(views.ready);
        assert!(views.orders.is_empty());
    }
}
