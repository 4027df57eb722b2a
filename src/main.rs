//! postlens - post performance analytics for Notion databases
//!
//! A CLI tool that walks a Notion database of social media posts,
//! normalizes every record, and reports engagement metrics, content
//! type breakdowns, and top/bottom performers.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (configuration, fetch failure, etc.)
//!   2 - Records were skipped and --fail-on-skipped was set

mod analysis;
mod cli;
mod config;
mod error;
mod fetcher;
mod models;
mod report;

use analysis::AnalysisOptions;
use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::Config;
use error::ConfigError;
use fetcher::NotionConfig;
use indicatif::MultiProgress;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Config decides the log level, so it loads before logging starts.
    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(args.log_level(config.general.verbose));

    info!("postlens v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    debug!("Configuration: {:?}", config);

    match run_analysis(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Analysis failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .postlens.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(config::DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", path.display());
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("✅ Created {} with default settings.", path.display());
    println!("   Edit it to set database ids, page size, filters and property names.");
    Ok(())
}

/// Initialize logging at `level`.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the complete analysis workflow. Returns the exit code (0 or 2).
async fn run_analysis(args: Args, config: Config) -> Result<i32> {
    let configs = build_notion_configs(&args, &config)?;

    let options = AnalysisOptions {
        top_k: config.analysis.top_k,
        page_timeout: Duration::from_secs(config.notion.timeout_seconds),
        mapping: config.mapping.clone(),
        progress: (!args.quiet).then(MultiProgress::new),
    };

    if !args.quiet {
        println!("📥 Fetching {} database(s)...", configs.len());
    }

    let reports = analysis::analyze_all(configs, &options, config.general.concurrency).await?;

    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&reports)?,
        OutputFormat::Markdown => report::generate_markdown_report(&reports),
    };

    let output_path = config.general.output_path(args.format);
    std::fs::write(&output_path, &output)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    let skipped: usize = reports.iter().map(|r| r.summary_stats.skipped_records).sum();

    if !args.quiet {
        println!("\n📊 Analysis Summary:");
        for report in &reports {
            let stats = &report.summary_stats;
            println!("   Database {}:", report.metadata.database_id);
            println!(
                "   - Posts: {} | Impressions: {} | Likes: {} | Retweets: {}",
                stats.total_posts, stats.total_impressions, stats.total_likes, stats.total_retweets
            );
            println!(
                "   - Avg impressions: {:.2} | Avg likes: {:.2} | Skipped: {}",
                stats.average_impressions, stats.average_likes, stats.skipped_records
            );
        }
        println!(
            "\n✅ Analysis complete! Report saved to: {}",
            output_path.display()
        );
    }

    if skipped > 0 {
        warn!("{} record(s) were skipped as malformed", skipped);
        if args.fail_on_skipped {
            eprintln!(
                "\n⛔ {} record(s) skipped. Failing (exit code 2).",
                skipped
            );
            return Ok(2);
        }
    }

    Ok(0)
}

/// Build one validated endpoint configuration per database.
fn build_notion_configs(args: &Args, config: &Config) -> Result<Vec<NotionConfig>> {
    let token = args
        .token
        .clone()
        .filter(|t| !t.trim().is_empty())
        .ok_or(ConfigError::MissingToken)?;

    if config.notion.database_ids.is_empty() {
        return Err(ConfigError::MissingDatabaseId.into());
    }

    let filter = match args.parse_filter()? {
        Some(filter) => Some(filter),
        None => config.notion.filter.clone(),
    };

    let configs: Vec<NotionConfig> = config
        .notion
        .database_ids
        .iter()
        .map(|database_id| NotionConfig {
            token: token.clone(),
            database_id: database_id.clone(),
            api_url: config.notion.api_url.clone(),
            notion_version: config.notion.notion_version.clone(),
            filter: filter.clone(),
            page_size: config.notion.page_size,
            timeout: Duration::from_secs(config.notion.timeout_seconds),
        })
        .collect();

    for notion_config in &configs {
        notion_config.validate()?;
    }

    Ok(configs)
}

/// Load configuration from file or use defaults.
///
/// A config file that exists but does not parse stops the run.
fn load_config(args: &Args) -> Result<Config> {
    let config = Config::resolve(
        args.config.as_deref(),
        Path::new(config::DEFAULT_CONFIG_FILE),
    )?;
    Ok(config.unwrap_or_default())
}
