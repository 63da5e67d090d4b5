//! Mock backend for testing without network calls.

use super::{DataSource, DataSourceError};
use crate::domain::{address_key, FillRecord, TraderProfile};
use crate::engine::{OppositePartiesResponse, OppositeParty};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock backend that returns predefined test data.
///
/// Every call is counted, and each endpoint can be made to fail or to answer
/// after a delay.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    history: Vec<FillRecord>,
    parties: OppositePartiesResponse,
    profiles: HashMap<String, TraderProfile>,
    history_error: Option<DataSourceError>,
    parties_error: Option<DataSourceError>,
    parties_delay: Option<Duration>,
    enrich_delay: Option<Duration>,
    calls: Arc<MockCalls>,
}

#[derive(Debug, Default)]
pub struct MockCalls {
    pub history: AtomicUsize,
    pub parties: AtomicUsize,
    pub enrich: AtomicUsize,
    /// Every `user_filter` passed to `fetch_opposite_parties`, in call order.
    pub party_filters: Mutex<Vec<Option<String>>>,
    /// Every address batch passed to `enrich_takers`.
    pub enriched: Mutex<Vec<Vec<String>>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// History in the backend's order, newest first.
    pub fn with_history(mut self, history: Vec<FillRecord>) -> Self {
        self.history = history;
        self
    }

    pub fn with_party(mut self, party: OppositeParty) -> Self {
        self.parties.parties.push(party);
        self
    }

    pub fn with_parties(mut self, parties: OppositePartiesResponse) -> Self {
        self.parties = parties;
        self
    }

    pub fn with_profile(mut self, address: &str, profile: TraderProfile) -> Self {
        self.profiles.insert(address_key(address), profile);
        self
    }

    pub fn with_history_error(mut self, err: DataSourceError) -> Self {
        self.history_error = Some(err);
        self
    }

    pub fn with_parties_error(mut self, err: DataSourceError) -> Self {
        self.parties_error = Some(err);
        self
    }

    pub fn with_parties_delay(mut self, delay: Duration) -> Self {
        self.parties_delay = Some(delay);
        self
    }

    pub fn with_enrich_delay(mut self, delay: Duration) -> Self {
        self.enrich_delay = Some(delay);
        self
    }

    /// Shared call counters, still readable after the mock is moved.
    pub fn calls(&self) -> Arc<MockCalls> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl DataSource for MockBackend {
    async fn fetch_history(&self) -> Result<Vec<FillRecord>, DataSourceError> {
        self.calls.history.fetch_add(1, Ordering::SeqCst);
        match &self.history_error {
            Some(err) => Err(err.clone()),
            None => Ok(self.history.clone()),
        }
    }

    async fn fetch_opposite_parties(
        &self,
        user_filter: Option<&str>,
    ) -> Result<OppositePartiesResponse, DataSourceError> {
        self.calls.parties.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut filters) = self.calls.party_filters.lock() {
            filters.push(user_filter.map(str::to_string));
        }
        if let Some(delay) = self.parties_delay {
            tokio::time::sleep(delay).await;
        }
        match &self.parties_error {
            Some(err) => Err(err.clone()),
            None => Ok(self.parties.clone()),
        }
    }

    async fn enrich_takers(
        &self,
        addresses: &[String],
    ) -> Result<Vec<(String, TraderProfile)>, DataSourceError> {
        self.calls.enrich.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut enriched) = self.calls.enriched.lock() {
            enriched.push(addresses.to_vec());
        }
        if let Some(delay) = self.enrich_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(addresses
            .iter()
            .filter_map(|address| {
                let key = address_key(address);
                self.profiles.get(&key).cloned().map(|profile| (key, profile))
            })
            .collect())
    }
}
