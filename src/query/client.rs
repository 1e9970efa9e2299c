//! Notion database query client.

use crate::config::QuerySettings;
use crate::error::TransportError;
use crate::models::QueryBody;
use crate::retry::HttpReply;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use std::time::Duration;
use tracing::debug;

/// Per-request timeout for database queries.
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Something that answers database queries one page at a time.
#[allow(async_fn_in_trait)]
pub trait RecordSource {
    async fn query(&self, body: &QueryBody) -> Result<HttpReply, TransportError>;
}

/// Queries a single Notion database.
pub struct NotionClient {
    http_client: reqwest::Client,
    query_url: String,
}

impl NotionClient {
    pub fn new(settings: &QuerySettings) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", settings.api_key))
            .map_err(|e| TransportError::Other(format!("invalid API key header: {}", e)))?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(
            "notion-version",
            HeaderValue::from_str(&settings.notion_version)
                .map_err(|e| TransportError::Other(format!("invalid Notion-Version: {}", e)))?,
        );

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(QUERY_TIMEOUT)
            .build()?;

        Ok(Self {
            http_client,
            query_url: query_url(&settings.api_base, &settings.database_id),
        })
    }
}

impl RecordSource for NotionClient {
    async fn query(&self, body: &QueryBody) -> Result<HttpReply, TransportError> {
        debug!(
            "POST {} (cursor: {})",
            self.query_url,
            body.start_cursor.as_deref().unwrap_or("none")
        );

        let response = self
            .http_client
            .post(&self.query_url)
            .json(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpReply::new(status, body))
    }
}

fn query_url(api_base: &str, database_id: &str) -> String {
    format!(
        "{}/v1/databases/{}/query",
        api_base.trim_end_matches('/'),
        database_id
    )
}
