//! Error types for the analytics pipeline.
//!
//! Configuration and fetch failures abort a run. Mapping failures are
//! confined to a single record and are counted rather than propagated.

use std::time::Duration;
use thiserror::Error;

/// Invalid or missing configuration, detected before any network call.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing Notion integration token (set --token or NOTION_TOKEN)")]
    MissingToken,

    #[error("missing database id (set --database-id or DATABASE_ID)")]
    MissingDatabaseId,

    #[error("invalid database id '{0}': expected 32 hex digits, optionally dashed")]
    InvalidDatabaseId(String),

    #[error("invalid API URL '{0}': must start with 'http://' or 'https://'")]
    InvalidApiUrl(String),

    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("page size must be between 1 and 100, got {0}")]
    InvalidPageSize(u32),

    #[error("timeout must be at least 1 second")]
    InvalidTimeout,

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Failure while walking the paginated query endpoint.
///
/// Any of these discards everything accumulated so far.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("query returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("page {page} timed out after {timeout:?}")]
    Timeout { page: usize, timeout: Duration },

    #[error("request timed out after {0:?}")]
    RequestTimeout(Duration),

    #[error("request failed: {0}")]
    Transport(String),

    #[error("malformed page payload: {0}")]
    MalformedPage(String),

    #[error("backend returned {consecutive} consecutive empty pages while reporting more results (page {page})")]
    EmptyPageLoop { page: usize, consecutive: usize },
}

/// A record that cannot be mapped. Confined to that record.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MappingError {
    #[error("result entry must be an object, found {found}")]
    MalformedEntry { found: &'static str },

    #[error("record {record_id}: properties must be an object, found {found}")]
    PropertiesNotObject {
        record_id: String,
        found: &'static str,
    },
}

/// Anything that aborts a whole pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),
}
