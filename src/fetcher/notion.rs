//! Notion database query client.
//!
//! Implements [`PageSource`] over `POST /databases/{id}/query`.

use super::{Page, PageSource};
use crate::error::{ConfigError, FetchError};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

/// Everything needed to query one database. Built once, never mutated.
#[derive(Clone)]
pub struct NotionConfig {
    pub token: String,
    pub database_id: String,
    pub api_url: String,
    pub notion_version: String,
    pub filter: Option<Value>,
    pub page_size: Option<u32>,
    pub timeout: Duration,
}

impl fmt::Debug for NotionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotionConfig")
            .field("token", &"<redacted>")
            .field("database_id", &self.database_id)
            .field("api_url", &self.api_url)
            .field("notion_version", &self.notion_version)
            .field("filter", &self.filter)
            .field("page_size", &self.page_size)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl NotionConfig {
    /// Check every field that would otherwise fail only once requests start.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token.trim().is_empty() {
            return Err(ConfigError::MissingToken);
        }

        validate_database_id(&self.database_id)?;

        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(ConfigError::InvalidApiUrl(self.api_url.clone()));
        }

        if let Some(ref filter) = self.filter {
            if !filter.is_object() {
                return Err(ConfigError::InvalidFilter(
                    "filter must be a JSON object".to_string(),
                ));
            }
        }

        if let Some(page_size) = self.page_size {
            if !(1..=100).contains(&page_size) {
                return Err(ConfigError::InvalidPageSize(page_size));
            }
        }

        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout);
        }

        Ok(())
    }

    /// Full URL of the query endpoint.
    pub fn query_url(&self) -> String {
        format!(
            "{}/databases/{}/query",
            self.api_url.trim_end_matches('/'),
            self.database_id.trim()
        )
    }
}

/// Accepts ids with or without dashes.
fn validate_database_id(id: &str) -> Result<(), ConfigError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ConfigError::MissingDatabaseId);
    }

    let digits: Vec<char> = id.chars().filter(|c| *c != '-').collect();
    if digits.len() != 32 || !digits.iter().all(|c| c.is_ascii_hexdigit()) {
        return Err(ConfigError::InvalidDatabaseId(id.to_string()));
    }

    Ok(())
}

/// Body of a query request.
#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_cursor: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_size: Option<u32>,
}

/// Read-only client for one Notion database.
#[derive(Debug, Clone)]
pub struct NotionClient {
    config: NotionConfig,
    http_client: reqwest::Client,
}

impl NotionClient {
    /// Create a client on a shared HTTP connection pool.
    ///
    /// Per-request deadlines come from `config.timeout`.
    pub fn with_http_client(
        config: NotionConfig,
        http_client: reqwest::Client,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        info!("Initializing Notion client for database {}", config.database_id);
        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn config(&self) -> &NotionConfig {
        &self.config
    }
}

#[async_trait]
impl PageSource for NotionClient {
    async fn query_page(&self, cursor: Option<&str>) -> Result<Page, FetchError> {
        let url = self.config.query_url();
        let body = QueryRequest {
            filter: self.config.filter.as_ref(),
            start_cursor: cursor,
            page_size: self.config.page_size,
        };

        debug!("POST {} (start_cursor: {:?})", url, cursor);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.config.token)
            .header("Notion-Version", &self.config.notion_version)
            .timeout(self.config.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::RequestTimeout(self.config.timeout)
                } else if e.is_connect() {
                    FetchError::Transport(format!("cannot connect to {}", self.config.api_url))
                } else {
                    FetchError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::RequestTimeout(self.config.timeout)
            } else {
                FetchError::Transport(format!("failed to read response body: {}", e))
            }
        })?;

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str::<Page>(&text).map_err(|e| FetchError::MalformedPage(e.to_string()))
    }
}
