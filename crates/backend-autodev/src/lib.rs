//! auto.dev listings and VIN decoding client.
//!
//! Every public operation degrades instead of failing: missing credentials,
//! transport errors, timeouts, non-JSON bodies and error statuses all yield
//! an empty list or `None`, logged at `warn`.

use carcupid_model::{ListingItem, VinDecode};
use carcupid_query::{AutoDevDialect, ListingsQuery, QueryDialect};
use futures_util::future::join_all;
use reqwest::header::{CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Response, StatusCode, Url};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Failures absorbed by the client.
#[derive(Debug, Error)]
pub enum AutoDevError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Invalid URL: {0}")]
    Url(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("Response is not JSON")]
    NotJson,

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// VINs decoded when no list is configured.
pub const FALLBACK_VINS: [&str; 4] = [
    "WP0AF2A99KS165242",
    "WDDSJ4EB8FN163343",
    "2GCEC13V271100979",
    "2C3CDZFJ1PH667790",
];

/// Most VINs taken from a configured list.
pub const MAX_VINS: usize = 20;

/// Split a comma or whitespace separated VIN list, falling back to
/// `FALLBACK_VINS` when it holds none.
pub fn vin_list(raw: &str) -> Vec<String> {
    let vins: Vec<String> = raw
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .take(MAX_VINS)
        .map(str::to_string)
        .collect();
    if vins.is_empty() {
        FALLBACK_VINS.iter().map(|v| v.to_string()).collect()
    } else {
        vins
    }
}

/// auto.dev client configuration.
#[derive(Debug, Clone)]
pub struct AutoDevConfig {
    pub base_url: String,
    /// Bearer key; empty disables every call
    pub api_key: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Attempts per listings page in `fetch_listings_with_meta`
    pub max_attempts: u32,
    /// Transport failures wait `backoff_step * attempt` before retrying
    pub backoff_step: Duration,
    /// VINs decoded concurrently per batch
    pub vin_chunk_size: usize,
}

impl Default for AutoDevConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.auto.dev".to_string(),
            api_key: String::new(),
            timeout: Duration::from_secs(6),
            max_attempts: 3,
            backoff_step: Duration::from_millis(500),
            vin_chunk_size: 4,
        }
    }
}

/// Listings plus every HTTP status seen while fetching them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingsPage {
    pub items: Vec<ListingItem>,
    pub statuses: Vec<u16>,
}

/// Interpret a listings response body.
///
/// Accepts a bare array, `{"data": [...]}`, `{"data": {...}}`, or a single
/// listing object. Every element becomes an item; one that is not an object
/// is an empty listing.
pub fn parse_listings(body: Value) -> Vec<ListingItem> {
    fn item(value: Value) -> ListingItem {
        serde_json::from_value(value).unwrap_or_default()
    }

    match body {
        Value::Array(values) => values.into_iter().map(item).collect(),
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(values)) => values.into_iter().map(item).collect(),
            Some(data @ Value::Object(_)) => vec![item(data)],
            Some(other) => {
                map.insert("data".to_string(), other);
                vec![item(Value::Object(map))]
            }
            None => vec![item(Value::Object(map))],
        },
        _ => Vec::new(),
    }
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.to_lowercase().contains("application/json"))
        .unwrap_or(false)
}

/// Seconds from `Retry-After`, defaulting to one second.
fn retry_after(response: &Response) -> Duration {
    let secs = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|s| s.is_finite() && *s > 0.0)
        .unwrap_or(1.0);
    Duration::from_secs_f64(secs)
}

/// auto.dev API client.
pub struct AutoDevClient {
    config: AutoDevConfig,
    client: reqwest::Client,
}

impl AutoDevClient {
    pub fn new(config: AutoDevConfig) -> Result<Self, AutoDevError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| AutoDevError::Connection(e.to_string()))?;
        Ok(Self { config, client })
    }

    pub fn has_key(&self) -> bool {
        !self.config.api_key.trim().is_empty()
    }

    fn url(&self, segments: &[&str]) -> Result<Url, AutoDevError> {
        let mut url =
            Url::parse(&self.config.base_url).map_err(|e| AutoDevError::Url(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| AutoDevError::Url(self.config.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn listings_url(&self, query: &ListingsQuery, page: u32) -> Result<Url, AutoDevError> {
        let mut url = self.url(&["listings"])?;
        url.query_pairs_mut()
            .extend_pairs(AutoDevDialect.translate(query, page));
        Ok(url)
    }

    async fn get(&self, url: Url) -> Result<Response, AutoDevError> {
        tracing::debug!(url = %url, "auto.dev request");
        self.client
            .get(url)
            .bearer_auth(&self.config.api_key)
            .header(CONTENT_TYPE, "application/json")
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(|e| AutoDevError::Connection(e.to_string()))
    }

    /// GET a JSON body, rejecting non-JSON and error responses.
    async fn get_json(&self, url: Url) -> Result<Value, AutoDevError> {
        let response = self.get(url).await?;
        if !is_json(&response) {
            return Err(AutoDevError::NotJson);
        }
        if !response.status().is_success() {
            return Err(AutoDevError::Status(response.status().as_u16()));
        }
        response
            .json()
            .await
            .map_err(|e| AutoDevError::ParseError(e.to_string()))
    }

    /// Fetch every page once; failed pages are skipped.
    pub async fn fetch_listings(&self, query: &ListingsQuery) -> Vec<ListingItem> {
        if !self.has_key() {
            tracing::debug!("No auto.dev key; skipping listings fetch");
            return Vec::new();
        }

        let mut out = Vec::new();
        for page in 1..=query.pages {
            let result = match self.listings_url(query, page) {
                Ok(url) => self.get_json(url).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(body) => out.extend(parse_listings(body)),
                Err(e) => tracing::warn!(page, error = %e, "Skipping listings page"),
            }
        }
        out
    }

    /// Fetch every page with retries, recording each status code.
    ///
    /// Transport failures back off linearly; HTTP 429 waits for the
    /// server's `Retry-After`. Non-JSON or other error responses end that
    /// page without retrying.
    pub async fn fetch_listings_with_meta(&self, query: &ListingsQuery) -> ListingsPage {
        let mut page_out = ListingsPage::default();
        if !self.has_key() {
            tracing::debug!("No auto.dev key; skipping listings fetch");
            return page_out;
        }

        for page in 1..=query.pages {
            let url = match self.listings_url(query, page) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!(page, error = %e, "Skipping listings page");
                    continue;
                }
            };

            let mut attempts = 0;
            while attempts < self.config.max_attempts {
                let response = match self.get(url.clone()).await {
                    Ok(response) => response,
                    Err(e) => {
                        attempts += 1;
                        tracing::warn!(page, attempts, error = %e, "Listings request failed");
                        tokio::time::sleep(self.config.backoff_step * attempts).await;
                        continue;
                    }
                };

                let status = response.status();
                page_out.statuses.push(status.as_u16());

                if !is_json(&response) {
                    tracing::warn!(page, status = status.as_u16(), "Listings response is not JSON");
                    break;
                }
                if status == StatusCode::TOO_MANY_REQUESTS {
                    attempts += 1;
                    let wait = retry_after(&response);
                    tracing::warn!(page, attempts, wait_ms = wait.as_millis() as u64, "Rate limited");
                    tokio::time::sleep(wait).await;
                    continue;
                }
                if !status.is_success() {
                    tracing::warn!(page, status = status.as_u16(), "Listings request rejected");
                    break;
                }

                match response.json::<Value>().await {
                    Ok(body) => page_out.items.extend(parse_listings(body)),
                    Err(e) => tracing::warn!(page, error = %e, "Failed to parse listings"),
                }
                break;
            }
        }

        page_out
    }

    /// Look up a single listing by VIN.
    pub async fn fetch_listing_by_vin(&self, vin: &str) -> Option<ListingItem> {
        if !self.has_key() {
            return None;
        }
        let result = match self.url(&["listings", vin]) {
            Ok(url) => self.get_json(url).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(body) => parse_listings(body).into_iter().next(),
            Err(e) => {
                tracing::warn!(vin, error = %e, "Listing lookup failed");
                None
            }
        }
    }

    /// Decode make and model from a VIN.
    pub async fn decode_vin(&self, vin: &str) -> Option<VinDecode> {
        if !self.has_key() {
            return None;
        }
        let result = match self.url(&["vin", vin]) {
            Ok(url) => self.get_json(url).await,
            Err(e) => Err(e),
        };
        match result.and_then(|body| {
            serde_json::from_value::<VinDecode>(body)
                .map_err(|e| AutoDevError::ParseError(e.to_string()))
        }) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::warn!(vin, error = %e, "VIN decode failed");
                None
            }
        }
    }

    /// Decode VINs in concurrent chunks. Failed decodes are dropped.
    pub async fn decode_vins<S: AsRef<str>>(&self, vins: &[S]) -> Vec<VinDecode> {
        let mut out = Vec::new();
        for chunk in vins.chunks(self.config.vin_chunk_size.max(1)) {
            let decoded = join_all(chunk.iter().map(|vin| self.decode_vin(vin.as_ref()))).await;
            out.extend(decoded.into_iter().flatten());
        }
        out
    }
}
