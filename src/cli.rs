//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::error::ConfigError;
use clap::Parser;
use serde_json::Value;
use std::path::PathBuf;

/// postlens - post performance analytics for Notion databases
///
/// Fetches every post from a Notion database, computes engagement
/// metrics, content-type breakdowns and top/bottom performers, and
/// writes a Markdown or JSON report.
///
/// Examples:
///   postlens --database-id 0123456789abcdef0123456789abcdef
///   postlens -d <ID> -d <OTHER_ID> --format json -o report.json
///   postlens -d <ID> --filter '{"property":"is_thread_head","checkbox":{"equals":true}}'
///   postlens --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Notion database to analyze (repeatable)
    ///
    /// Falls back to `notion.database_ids` in the config file.
    #[arg(
        short,
        long = "database-id",
        value_name = "ID",
        env = "DATABASE_ID",
        value_delimiter = ','
    )]
    pub database_id: Vec<String>,

    /// Notion integration token
    #[arg(long, env = "NOTION_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Query filter as a JSON object, forwarded to the endpoint
    #[arg(long, value_name = "JSON", conflicts_with = "filter_file")]
    pub filter: Option<String>,

    /// Read the query filter from a JSON file
    #[arg(long, value_name = "FILE")]
    pub filter_file: Option<PathBuf>,

    /// Notion API base URL
    #[arg(long, value_name = "URL", env = "NOTION_API_URL")]
    pub api_url: Option<String>,

    /// Number of top and bottom performers to list
    #[arg(short = 'k', long, value_name = "COUNT")]
    pub top_k: Option<usize>,

    /// Records per page requested from the endpoint (1-100)
    #[arg(long, value_name = "COUNT")]
    pub page_size: Option<u32>,

    /// Per-page request deadline in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Path to configuration file
    ///
    /// If not specified, looks for .postlens.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Number of databases analyzed in parallel
    #[arg(long, value_name = "NUM")]
    pub concurrency: Option<usize>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Exit with code 2 when any record had to be skipped
    #[arg(long)]
    pub fail_on_skipped: bool,

    /// Generate a default .postlens.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl OutputFormat {
    /// File extension for reports in this format.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Json => "json",
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(concurrency) = self.concurrency {
            if concurrency == 0 {
                return Err("Concurrency must be at least 1".to_string());
            }
        }

        if let Some(page_size) = self.page_size {
            if !(1..=100).contains(&page_size) {
                return Err("Page size must be between 1 and 100".to_string());
            }
        }

        if let Some(ref path) = self.filter_file {
            if !path.is_file() {
                return Err(format!("Filter file does not exist: {}", path.display()));
            }
        }

        Ok(())
    }

    /// Returns the query filter given on the command line, if any.
    pub fn parse_filter(&self) -> Result<Option<Value>, ConfigError> {
        let raw = match (&self.filter, &self.filter_file) {
            (Some(inline), _) => inline.clone(),
            (None, Some(path)) => std::fs::read_to_string(path).map_err(|e| {
                ConfigError::InvalidFilter(format!("cannot read {}: {}", path.display(), e))
            })?,
            (None, None) => return Ok(None),
        };

        let value: Value = serde_json::from_str(&raw)
            .map_err(|e| ConfigError::InvalidFilter(e.to_string()))?;
        if !value.is_object() {
            return Err(ConfigError::InvalidFilter(
                "filter must be a JSON object".to_string(),
            ));
        }

        Ok(Some(value))
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `config_verbose` is the config file's `verbose`; `--quiet` wins over both.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            database_id: vec!["0123456789abcdef0123456789abcdef".to_string()],
            token: Some("secret_test".to_string()),
            filter: None,
            filter_file: None,
            api_url: None,
            top_k: None,
            page_size: None,
            timeout: None,
            output: None,
            format: OutputFormat::Markdown,
            config: None,
            concurrency: None,
            verbose: false,
            quiet: false,
            fail_on_skipped: false,
            init_config: false,
        }
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_page_size() {
        let mut args = make_args();
        args.page_size = Some(101);
        assert!(args.validate().is_err());

        args.page_size = Some(100);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_zero_timeout() {
        let mut args = make_args();
        args.timeout = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_parse_filter() {
        let mut args = make_args();
        assert_eq!(args.parse_filter().unwrap(), None);

        args.filter = Some(r#"{"property": "is_note_tweet", "checkbox": {"equals": true}}"#.to_string());
        let filter = args.parse_filter().unwrap().unwrap();
        assert_eq!(filter["property"], "is_note_tweet");

        args.filter = Some("[1, 2]".to_string());
        assert!(matches!(
            args.parse_filter(),
            Err(ConfigError::InvalidFilter(_))
        ));

        args.filter = Some("{not json".to_string());
        assert!(args.parse_filter().is_err());
    }

    #[test]
    fn test_parse_filter_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filter.json");
        std::fs::write(&path, r#"{"property": "like_count", "number": {"greater_than": 10}}"#)
            .unwrap();

        let mut args = make_args();
        args.filter_file = Some(path);
        assert!(args.validate().is_ok());
        let filter = args.parse_filter().unwrap().unwrap();
        assert_eq!(filter["number"]["greater_than"], 10);
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(false), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(false), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(false), tracing::Level::ERROR);
    }

    #[test]
    fn test_config_verbose_raises_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(true), tracing::Level::DEBUG);

        args.quiet = true;
        assert_eq!(args.log_level(true), tracing::Level::ERROR);
    }

    #[test]
    fn test_cli_parses_repeated_database_ids() {
        let args = Args::try_parse_from([
            "postlens",
            "-d",
            "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
            "--database-id",
            "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb",
            "--format",
            "json",
            "-k",
            "3",
        ])
        .unwrap();
        assert_eq!(args.database_id.len(), 2);
        assert_eq!(args.format, OutputFormat::Json);
        assert_eq!(args.top_k, Some(3));
    }
}
