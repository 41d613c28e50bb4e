use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{ReleaseRow, SearchBackend};
use crate::error::BackendError;

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    status: String,
    #[serde(default)]
    message: String,
    data: Option<ApiData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiData {
    #[serde(default)]
    row_count: usize,
    #[serde(default)]
    rows: Vec<ReleaseRow>,
    #[serde(default)]
    offset: usize,
    #[serde(default)]
    req_count: usize,
    #[serde(default)]
    total: u64,
    #[serde(default)]
    time: f64,
}

/// Client for a remote release search API (predb.ovh style).
pub struct ApiBackend {
    client: reqwest::Client,
    base_url: String,
}

impl ApiBackend {
    /// Every request is bounded by `timeout`; a slow API fails the lookup
    /// instead of holding up the bot.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl SearchBackend for ApiBackend {
    async fn search(&self, query: &str, max: usize) -> Result<Vec<ReleaseRow>, BackendError> {
        if max == 0 {
            return Ok(Vec::new());
        }

        let url = format!("{}/", self.base_url);
        debug!("Querying search API: {} q={:?} count={}", url, query, max);

        let count = max.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[("q", query), ("count", count.as_str())])
            .send()
            .await?;

        // The envelope's status decides success, whatever the HTTP code says.
        let http_status = response.status();
        let body = response.bytes().await?;
        let envelope: ApiEnvelope = serde_json::from_slice(&body).map_err(|e| {
            BackendError::MalformedResponse(format!("HTTP {}: {}", http_status, e))
        })?;

        if envelope.status != "success" {
            return Err(BackendError::Rejected(format!(
                "{}: {}",
                envelope.status, envelope.message
            )));
        }

        let data = envelope.data.ok_or_else(|| {
            BackendError::MalformedResponse("success response without data".to_string())
        })?;

        debug!(
            "Search API answered {} of {} rows (offset {}, request #{}) in {:.3}s",
            data.row_count, data.total, data.offset, data.req_count, data.time
        );

        let mut rows = data.rows;
        rows.truncate(max);
        Ok(rows)
    }

    fn name(&self) -> &'static str {
        "api"
    }
}
