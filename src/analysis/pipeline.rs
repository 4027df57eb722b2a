//! End-to-end analysis of one or more databases.
//!
//! Each database runs fetch, normalize, aggregate and rank in sequence and
//! owns all of its state. Several databases may run concurrently; they
//! share nothing but the HTTP connection pool and the options.

use super::aggregator::{apply_engagement_rates, content_type_analysis, summarize};
use super::normalizer::Normalizer;
use super::ranker::{bottom_k, rank_by_impressions, top_k, DEFAULT_K};
use crate::config::PropertyMap;
use crate::error::PipelineError;
use crate::fetcher::{Fetcher, NotionClient, NotionConfig, PageSource};
use crate::models::{AnalysisReport, ReportMetadata};
use chrono::Utc;
use futures::stream::{self, StreamExt, TryStreamExt};
use indicatif::MultiProgress;
use std::time::{Duration, Instant};
use tracing::info;

/// Settings shared by every database in a run.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    /// Size of the top and bottom performer lists.
    pub top_k: usize,
    /// Deadline for each page request.
    pub page_timeout: Duration,
    /// Property names feeding the normalized fields.
    pub mapping: PropertyMap,
    /// Spinner area shared by every database; `None` hides progress.
    pub progress: Option<MultiProgress>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_K,
            page_timeout: Duration::from_secs(30),
            mapping: PropertyMap::default(),
            progress: None,
        }
    }
}

/// Fetch everything from `source` and build the report for `database_id`.
pub async fn analyze<S: PageSource>(
    source: S,
    database_id: &str,
    options: &AnalysisOptions,
) -> Result<AnalysisReport, PipelineError> {
    let start_time = Instant::now();

    let mut fetcher = Fetcher::new(source, options.page_timeout);
    if let Some(ref multi) = options.progress {
        fetcher = fetcher.with_progress(multi, database_id);
    }
    let fetched = fetcher.fetch_all().await?;
    let records_fetched = fetched.records.len();

    let batch = Normalizer::new(options.mapping.clone()).normalize_all(fetched.records);
    let mut records = batch.records;

    apply_engagement_rates(&mut records);
    let summary_stats = summarize(&records, batch.skipped);
    let content_type_analysis = content_type_analysis(&records);

    rank_by_impressions(&mut records);
    let top_performing_posts = top_k(&records, options.top_k).to_vec();
    let bottom_performing_posts = bottom_k(&records, options.top_k).to_vec();
    let posts_with_engagement_rates = records
        .into_iter()
        .filter(|r| r.impression_count > 0)
        .collect();

    info!(
        "Analyzed {} posts from database {} ({} skipped)",
        summary_stats.total_posts, database_id, summary_stats.skipped_records
    );

    Ok(AnalysisReport {
        metadata: ReportMetadata {
            database_id: database_id.to_string(),
            analysis_date: Utc::now(),
            pages_fetched: fetched.pages,
            records_fetched,
            duration_seconds: start_time.elapsed().as_secs_f64(),
        },
        summary_stats,
        top_performing_posts,
        bottom_performing_posts,
        posts_with_engagement_rates,
        content_type_analysis,
    })
}

/// Analyze several databases, at most `concurrency` at a time.
///
/// Every configuration is validated before any request is sent. Reports
/// come back in the order of `configs`; the first failure aborts the run.
pub async fn analyze_all(
    configs: Vec<NotionConfig>,
    options: &AnalysisOptions,
    concurrency: usize,
) -> Result<Vec<AnalysisReport>, PipelineError> {
    let http_client = reqwest::Client::builder()
        .user_agent(concat!("postlens/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| crate::error::ConfigError::HttpClient(e.to_string()))?;

    let clients = configs
        .into_iter()
        .map(|config| NotionClient::with_http_client(config, http_client.clone()))
        .collect::<Result<Vec<_>, _>>()?;

    stream::iter(clients)
        .map(|client| async move {
            let database_id = client.config().database_id.clone();
            analyze(client, &database_id, options).await
        })
        .buffered(concurrency.max(1))
        .try_collect()
        .await
}
