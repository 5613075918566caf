//! Fetch-and-parse orchestration: network GET, CSV body guard, tokenize,
//! map. Transport and content-type problems fail the whole operation; row
//! problems are absorbed by the mapper (partial success is the default).

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};

use crate::csv_line::{parse_line, parse_line_trimmed, split_lines};
use crate::error::FetchError;
use crate::mapper::{map_batch, schema_spec};
use crate::models::{AssetRequest, Dashboard, RawRow, RecordBatch, SubmitResponse};

/// The network seam. Injected so the cache and orchestrator tests run
/// against a canned fetcher instead of a live sheet.
#[async_trait]
pub trait SheetFetcher: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError>;
}

/// Production fetcher on reqwest. Appends a timestamp query parameter and
/// sends no-cache headers so intermediaries never serve a stale export; all
/// caching happens in this crate's TTL layer where it is observable.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        HttpFetcher {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SheetFetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let separator = if url.contains('?') { '&' } else { '?' };
        let busted = format!("{url}{separator}t={}", Utc::now().timestamp_millis());
        debug!(url = %busted, "fetching sheet");

        let response = self
            .client
            .get(&busted)
            .header("Cache-Control", "no-cache")
            .header("Pragma", "no-cache")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Transport(status.as_u16()));
        }
        Ok(response.text().await?)
    }
}

/// An unpublished or permission-restricted sheet serves a login or error
/// page instead of CSV; catch that before handing garbage to the mapper.
fn looks_like_html(body: &str) -> bool {
    let head: String = body.trim_start().chars().take(15).collect();
    let head = head.to_lowercase();
    head.starts_with("<!doctype") || head.starts_with("<html")
}

/// Tokenize and map a CSV body for `dashboard`. Blank lines are dropped
/// before tokenizing; the schema decides whether fields are trimmed.
pub fn parse_body(dashboard: Dashboard, body: &str) -> RecordBatch {
    let spec = schema_spec(dashboard);
    let rows: Vec<RawRow> = split_lines(body)
        .into_iter()
        .map(|line| {
            if spec.trims_fields {
                parse_line_trimmed(line)
            } else {
                parse_line(line)
            }
        })
        .collect();
    map_batch(dashboard, &rows)
}

/// Fetch `url` and parse it into typed records for `dashboard`.
pub async fn fetch_and_parse(
    fetcher: &dyn SheetFetcher,
    url: &str,
    dashboard: Dashboard,
) -> Result<RecordBatch, FetchError> {
    let body = fetcher.fetch_text(url).await?;
    if looks_like_html(&body) {
        return Err(FetchError::WrongContentType);
    }
    let batch = parse_body(dashboard, &body);
    info!(
        dashboard = dashboard.label(),
        records = batch.len(),
        "sheet parsed"
    );
    Ok(batch)
}

/// Boundary POST to the asset submission endpoint. The endpoint's internals
/// are not this crate's concern; only the request/response shapes are.
pub async fn submit_asset_request(
    client: &reqwest::Client,
    url: &str,
    request: &AssetRequest,
) -> Result<SubmitResponse, FetchError> {
    let response = client.post(url).json(request).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Transport(status.as_u16()));
    }
    Ok(response.json().await?)
}
