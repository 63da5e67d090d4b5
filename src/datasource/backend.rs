//! HTTP client for the order backend's REST API.

use super::{DataSource, DataSourceError};
use crate::domain::{address_key, lenient, FillRecord, TraderProfile};
use crate::engine::OppositePartiesResponse;
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use futures::future::try_join_all;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Addresses per `/takers/enrich` request.
const ENRICH_CHUNK: usize = 20;

/// Backend data source over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct HistoryBody {
    #[serde(default)]
    orders: Vec<Value>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EnrichBody {
    #[serde(default)]
    takers: Vec<EnrichedTaker>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EnrichedTaker {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    address: Option<String>,
    #[serde(default)]
    polymarket: Option<Value>,
}

impl HttpBackend {
    /// `base_url` is the API root, e.g. `http://localhost:8000/api`.
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, DataSourceError> {
        let url = format!("{}{}", self.base_url, path);
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        retry(backoff, || async {
            let response = self
                .client
                .get(&url)
                .query(query)
                .send()
                .await
                .map_err(|e| {
                    backoff::Error::transient(DataSourceError::NetworkError(e.to_string()))
                })?;

            let status = response.status();
            if status == 429 {
                return Err(backoff::Error::transient(DataSourceError::RateLimited));
            }
            if status.is_server_error() {
                return Err(backoff::Error::transient(DataSourceError::HttpError {
                    status: status.as_u16(),
                    message: "Server error".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(DataSourceError::HttpError {
                    status: status.as_u16(),
                    message: "Client error".to_string(),
                }));
            }

            response
                .json::<Value>()
                .await
                .map_err(|e| backoff::Error::permanent(DataSourceError::ParseError(e.to_string())))
        })
        .await
    }

    async fn enrich_chunk(
        &self,
        chunk: &[String],
    ) -> Result<Vec<(String, TraderProfile)>, DataSourceError> {
        let response = self
            .get_json("/takers/enrich", &[("addresses", chunk.join(","))])
            .await?;
        parse_enrich(response)
    }
}

#[async_trait]
impl DataSource for HttpBackend {
    async fn fetch_history(&self) -> Result<Vec<FillRecord>, DataSourceError> {
        debug!(base_url = %self.base_url, "fetching order history");
        let response = self.get_json("/orders/history", &[]).await?;
        parse_history(response)
    }

    async fn fetch_opposite_parties(
        &self,
        user_filter: Option<&str>,
    ) -> Result<OppositePartiesResponse, DataSourceError> {
        let query: Vec<(&str, String)> = user_filter
            .filter(|f| !f.is_empty())
            .map(|f| ("user_filter", f.to_string()))
            .into_iter()
            .collect();
        debug!(?user_filter, "fetching opposite parties");

        let response = self.get_json("/orders/opposite-parties", &query).await?;
        if let Some(err) = response.get("error").and_then(Value::as_str) {
            return Err(DataSourceError::Other(err.to_string()));
        }
        serde_json::from_value(response).map_err(|e| DataSourceError::ParseError(e.to_string()))
    }

    async fn enrich_takers(
        &self,
        addresses: &[String],
    ) -> Result<Vec<(String, TraderProfile)>, DataSourceError> {
        if addresses.is_empty() {
            return Ok(Vec::new());
        }
        debug!(count = addresses.len(), "enriching takers");

        let chunks = try_join_all(
            addresses
                .chunks(ENRICH_CHUNK)
                .map(|chunk| self.enrich_chunk(chunk)),
        )
        .await?;
        Ok(chunks.into_iter().flatten().collect())
    }
}

fn parse_history(response: Value) -> Result<Vec<FillRecord>, DataSourceError> {
    let body: HistoryBody =
        serde_json::from_value(response).map_err(|e| DataSourceError::ParseError(e.to_string()))?;
    if let Some(err) = body.error {
        return Err(DataSourceError::Other(err));
    }

    let mut records = Vec::with_capacity(body.orders.len());
    for order in body.orders {
        if !order.is_object() {
            warn!("skipping non-object history entry");
            continue;
        }
        match serde_json::from_value::<FillRecord>(order) {
            Ok(record) => records.push(record),
            Err(e) => warn!("Failed to parse history entry: {}", e),
        }
    }
    Ok(records)
}

fn parse_enrich(response: Value) -> Result<Vec<(String, TraderProfile)>, DataSourceError> {
    let body: EnrichBody =
        serde_json::from_value(response).map_err(|e| DataSourceError::ParseError(e.to_string()))?;
    if let Some(err) = body.error {
        return Err(DataSourceError::Other(err));
    }

    Ok(body
        .takers
        .into_iter()
        .filter_map(|taker| {
            let address = taker.address?;
            let profile = match taker.polymarket? {
                v @ Value::Object(_) => serde_json::from_value::<TraderProfile>(v).ok()?,
                _ => return None,
            };
            Some((address_key(&address), profile))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_history_skips_garbage() {
        let records = parse_history(json!({
            "orders": [
                {"tx_hash": "0xb", "log_index": 1, "price": 0.5},
                "not an order",
                {"tx_hash": "0xa", "log_index": 0, "price": "0.4"}
            ],
            "count": 3,
            "max_age_hours": 48
        }))
        .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].tx_hash.as_deref(), Some("0xb"));
    }

    #[test]
    fn test_parse_history_surfaces_backend_error() {
        let err = parse_history(json!({"orders": [], "count": 0, "error": "db down"})).unwrap_err();
        assert_eq!(err, DataSourceError::Other("db down".to_string()));
    }

    #[test]
    fn test_parse_enrich_drops_missing_profiles() {
        let takers = parse_enrich(json!({
            "takers": [
                {"address": "0xAAA", "polymarket": {"name": "alice", "global_rank": 3}},
                {"address": "0xbbb", "polymarket": null},
                {"polymarket": {"name": "nobody"}}
            ]
        }))
        .unwrap();

        assert_eq!(takers.len(), 1);
        assert_eq!(takers[0].0, "0xaaa");
        assert_eq!(takers[0].1.global_rank, Some(3));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let backend = HttpBackend::new("http://localhost:8000/api/".to_string());
        assert_eq!(backend.base_url, "http://localhost:8000/api");
    }
}
