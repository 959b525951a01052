//! HTTP client for the backend's PostgREST tables.

use std::time::Duration;

use anyhow::Result;
use reqwest::{header, Client, RequestBuilder, Response};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::{EntityKind, Record};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Client for the remote record source.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct RemoteClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl RemoteClient {
    pub fn new(base_url: &str, anon_key: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        })
    }

    /// Build a client when the configuration points at a real backend.
    pub fn from_config(config: &Config) -> Result<Option<Self>> {
        if !config.is_remote_configured() {
            return Ok(None);
        }
        match (&config.remote_url, &config.anon_key) {
            (Some(url), Some(key)) => Ok(Some(Self::new(url, key)?)),
            _ => Ok(None),
        }
    }

    fn table_url(&self, kind: EntityKind) -> String {
        format!("{}/rest/v1/{}", self.base_url, kind.table())
    }

    fn headers(&self) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        headers.insert("apikey", header::HeaderValue::from_str(&self.anon_key)?);
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", self.anon_key))?,
        );
        Ok(headers)
    }

    /// Send a request, backing off and retrying while rate limited.
    /// Any other non-success status becomes an `ApiError`.
    async fn send(&self, build: impl Fn() -> RequestBuilder, what: &str) -> Result<Response> {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = build()
                .headers(self.headers()?)
                .send()
                .await
                .map_err(|e| {
                    debug!(request = what, error = %e, "Request failed to send");
                    ApiError::from(e)
                })?;

            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }
            if status.as_u16() != 429 {
                let body = response.text().await.unwrap_or_default();
                return Err(ApiError::from_status(status, &body).into());
            }

            retries += 1;
            if retries > MAX_RATE_LIMIT_RETRIES {
                return Err(ApiError::RateLimited.into());
            }
            warn!(request = what, retry = retries, backoff_ms, "Rate limited, backing off");
            tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            backoff_ms *= 2;
        }
    }

    /// Fetch every row of the record type's table.
    pub async fn fetch<T: Record>(&self) -> Result<Vec<T>> {
        let url = self.table_url(T::KIND);
        let what = format!("fetch {}", T::KIND);
        let response = self
            .send(|| self.client.get(&url).query(&[("select", "*")]), &what)
            .await?;

        let body = response.text().await.map_err(ApiError::from)?;
        let records: Vec<T> = serde_json::from_str(&body)
            .map_err(|e| ApiError::InvalidResponse(format!("{} rows: {}", T::KIND, e)))?;
        debug!(kind = %T::KIND, count = records.len(), "Fetched remote records");
        Ok(records)
    }

    /// Insert a record, or replace the row with the same id.
    pub async fn upsert<T: Record>(&self, record: &T) -> Result<()> {
        let url = self.table_url(T::KIND);
        let what = format!("upsert {} {}", T::KIND, record.id());
        self.send(
            || {
                self.client
                    .post(&url)
                    .header("Prefer", "resolution=merge-duplicates")
                    .json(record)
            },
            &what,
        )
        .await?;
        Ok(())
    }

    /// Apply a partial update to the row with `id`.
    pub async fn update(&self, kind: EntityKind, id: &str, fields: &Map<String, Value>) -> Result<()> {
        let url = self.table_url(kind);
        let filter = format!("eq.{}", id);
        let what = format!("update {} {}", kind, id);
        self.send(
            || self.client.patch(&url).query(&[("id", &filter)]).json(fields),
            &what,
        )
        .await?;
        Ok(())
    }

    /// Delete the row with `id`.
    pub async fn delete(&self, kind: EntityKind, id: &str) -> Result<()> {
        let url = self.table_url(kind);
        let filter = format!("eq.{}", id);
        let what = format!("delete {} {}", kind, id);
        self.send(|| self.client.delete(&url).query(&[("id", &filter)]), &what)
            .await?;
        Ok(())
    }
}
