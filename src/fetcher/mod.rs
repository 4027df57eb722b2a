//! Cursor-paginated record fetching.
//!
//! [`Fetcher::fetch_all`] walks a [`PageSource`] until the source reports
//! that no more pages remain. Termination follows the `has_more` flag only;
//! an empty page is not the end of the data.

pub mod notion;

pub use notion::{NotionClient, NotionConfig};

use crate::error::FetchError;
use crate::models::RawRecord;
use async_trait::async_trait;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Consecutive empty pages tolerated while the source still reports more.
const MAX_CONSECUTIVE_EMPTY_PAGES: usize = 1;

/// One page of query results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub results: Vec<RawRecord>,
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// A paginated query endpoint.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch the page starting at `cursor`, or the first page when `None`.
    async fn query_page(&self, cursor: Option<&str>) -> Result<Page, FetchError>;
}

/// Everything a completed walk produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOutcome {
    /// All records, in server order.
    pub records: Vec<RawRecord>,
    /// Number of pages requested.
    pub pages: usize,
}

/// Drives a [`PageSource`] to completion.
pub struct Fetcher<S> {
    source: S,
    page_timeout: Duration,
    progress: ProgressBar,
}

impl<S: PageSource> Fetcher<S> {
    /// Create a fetcher that gives each page request `page_timeout` to finish.
    pub fn new(source: S, page_timeout: Duration) -> Self {
        Self {
            source,
            page_timeout,
            progress: ProgressBar::hidden(),
        }
    }

    /// Show a spinner with page and record counts while fetching.
    ///
    /// Spinners of concurrent fetches share `multi` so each keeps its own line.
    pub fn with_progress(mut self, multi: &MultiProgress, label: &str) -> Self {
        let pb = multi.add(ProgressBar::new_spinner());
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {prefix} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_prefix(label.to_string());
        pb.enable_steady_tick(Duration::from_millis(120));
        self.progress = pb;
        self
    }

    /// Fetch every page and return the concatenated records.
    ///
    /// Returns an error, and nothing else, if any page fails, times out,
    /// or the source keeps returning empty pages while claiming more.
    pub async fn fetch_all(&self) -> Result<FetchOutcome, FetchError> {
        let result = self.walk().await;
        match &result {
            Ok(outcome) => self.progress.finish_with_message(format!(
                "{} records from {} pages",
                outcome.records.len(),
                outcome.pages
            )),
            Err(_) => self.progress.abandon_with_message("fetch failed"),
        }
        result
    }

    async fn walk(&self) -> Result<FetchOutcome, FetchError> {
        let mut records = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0usize;
        let mut consecutive_empty = 0usize;

        loop {
            pages += 1;
            debug!("Requesting page {} (cursor: {:?})", pages, cursor);

            let page = tokio::time::timeout(
                self.page_timeout,
                self.source.query_page(cursor.as_deref()),
            )
            .await
            .map_err(|_| FetchError::Timeout {
                page: pages,
                timeout: self.page_timeout,
            })??;

            let page_len = page.results.len();
            records.extend(page.results);
            self.progress
                .set_message(format!("page {} ({} records)", pages, records.len()));

            if !page.has_more {
                break;
            }

            if page_len == 0 {
                consecutive_empty += 1;
                warn!(
                    "Page {} was empty but more results were reported ({} in a row)",
                    pages, consecutive_empty
                );
                if consecutive_empty > MAX_CONSECUTIVE_EMPTY_PAGES {
                    return Err(FetchError::EmptyPageLoop {
                        page: pages,
                        consecutive: consecutive_empty,
                    });
                }
            } else {
                consecutive_empty = 0;
            }

            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => {
                    return Err(FetchError::MalformedPage(format!(
                        "page {} reports more results but carries no next_cursor",
                        pages
                    )))
                }
            }
        }

        info!("Fetched {} records across {} pages", records.len(), pages);
        Ok(FetchOutcome { records, pages })
    }
}
