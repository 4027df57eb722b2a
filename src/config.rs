//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.postlens.toml` files. Credentials are never read from the file;
//! they come from the command line or the environment.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::cli::OutputFormat;
use std::path::{Path, PathBuf};

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".postlens.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Notion endpoint settings.
    #[serde(default)]
    pub notion: NotionSettings,

    /// Analysis settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Source property names for each output field.
    #[serde(default)]
    pub mapping: PropertyMap,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Output file path. When unset, `postlens_report` with the extension
    /// of the chosen format.
    #[serde(default)]
    pub output: Option<String>,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Number of databases analyzed in parallel.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl GeneralConfig {
    /// Where the report goes for the given format.
    pub fn output_path(&self, format: OutputFormat) -> PathBuf {
        match self.output {
            Some(ref output) => PathBuf::from(output),
            None => PathBuf::from(format!("postlens_report.{}", format.extension())),
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: None,
            verbose: false,
            concurrency: default_concurrency(),
        }
    }
}

fn default_concurrency() -> usize {
    4
}

/// Notion query endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotionSettings {
    /// API base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Value of the `Notion-Version` header.
    #[serde(default = "default_notion_version")]
    pub notion_version: String,

    /// Databases to analyze when none are given on the command line.
    #[serde(default)]
    pub database_ids: Vec<String>,

    /// Per-page request deadline in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Page size forwarded to the endpoint (server default when unset).
    #[serde(default)]
    pub page_size: Option<u32>,

    /// Query filter object, forwarded verbatim.
    #[serde(default)]
    pub filter: Option<Value>,
}

impl Default for NotionSettings {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            notion_version: default_notion_version(),
            database_ids: Vec::new(),
            timeout_seconds: default_timeout(),
            page_size: None,
            filter: None,
        }
    }
}

fn default_api_url() -> String {
    "https://api.notion.com/v1".to_string()
}

fn default_notion_version() -> String {
    "2022-06-28".to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Size of the top and bottom performer lists.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    5
}

/// Names of the database properties feeding each normalized field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyMap {
    pub name: String,
    pub external_id: String,
    pub url: String,
    pub reply_count: String,
    pub retweet_count: String,
    pub bookmark_count: String,
    pub impression_count: String,
    pub like_count: String,
    pub created_at: String,
    pub is_thread_head: String,
    pub is_thread_part: String,
    pub is_note_tweet: String,
}

impl Default for PropertyMap {
    fn default() -> Self {
        Self {
            name: "Name".to_string(),
            external_id: "tweet_id".to_string(),
            url: "url".to_string(),
            reply_count: "reply_count".to_string(),
            retweet_count: "retweet_count".to_string(),
            bookmark_count: "bookmark_count".to_string(),
            impression_count: "impression_count".to_string(),
            like_count: "like_count".to_string(),
            created_at: "created_at".to_string(),
            is_thread_head: "is_thread_head".to_string(),
            is_thread_part: "is_thread_part".to_string(),
            is_note_tweet: "is_note_tweet".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load `explicit` if given, else `default_path` if it exists.
    ///
    /// Returns `Ok(None)` when neither applies. A file that exists but
    /// can't be read or parsed is an error, never a silent fallback.
    pub fn resolve(explicit: Option<&Path>, default_path: &Path) -> Result<Option<Self>> {
        match explicit {
            Some(path) => Ok(Some(Self::load(path)?)),
            None if default_path.exists() => Ok(Some(Self::load(default_path)?)),
            None => Ok(None),
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// where the CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if !args.database_id.is_empty() {
            self.notion.database_ids = args.database_id.clone();
        }
        if let Some(ref api_url) = args.api_url {
            self.notion.api_url = api_url.clone();
        }
        if let Some(timeout) = args.timeout {
            self.notion.timeout_seconds = timeout;
        }
        if let Some(page_size) = args.page_size {
            self.notion.page_size = Some(page_size);
        }
        if let Some(top_k) = args.top_k {
            self.analysis.top_k = top_k;
        }
        if let Some(concurrency) = args.concurrency {
            self.general.concurrency = concurrency;
        }
        if let Some(ref output) = args.output {
            self.general.output = Some(output.display().to_string());
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.notion.api_url, "https://api.notion.com/v1");
        assert_eq!(config.notion.notion_version, "2022-06-28");
        assert_eq!(config.analysis.top_k, 5);
        assert_eq!(config.mapping.impression_count, "impression_count");
        assert_eq!(config.mapping.name, "Name");
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "custom_report.md"
verbose = true

[notion]
database_ids = ["0123456789abcdef0123456789abcdef"]
timeout_seconds = 10
page_size = 50

[notion.filter]
property = "is_thread_head"
checkbox = { equals = true }

[analysis]
top_k = 3

[mapping]
impression_count = "Views"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output.as_deref(), Some("custom_report.md"));
        assert!(config.general.verbose);
        assert_eq!(config.notion.database_ids.len(), 1);
        assert_eq!(config.notion.timeout_seconds, 10);
        assert_eq!(config.notion.page_size, Some(50));
        assert_eq!(config.analysis.top_k, 3);
        assert_eq!(config.mapping.impression_count, "Views");
        // Unset mapping entries keep their defaults.
        assert_eq!(config.mapping.like_count, "like_count");

        let filter = config.notion.filter.unwrap();
        assert_eq!(filter["property"], "is_thread_head");
        assert_eq!(filter["checkbox"]["equals"], true);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[analysis]\ntop_k = 8").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.analysis.top_k, 8);
        assert_eq!(config.general.concurrency, 4);
    }

    #[test]
    fn test_load_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[analysis\ntop_k = ").unwrap();

        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_resolve_config() {
        let dir = tempfile::tempdir().unwrap();
        let default_path = dir.path().join(DEFAULT_CONFIG_FILE);

        assert!(Config::resolve(None, &default_path).unwrap().is_none());

        std::fs::write(&default_path, "[analysis]\ntop_k = 7\n").unwrap();
        let config = Config::resolve(None, &default_path).unwrap().unwrap();
        assert_eq!(config.analysis.top_k, 7);

        let explicit = dir.path().join("other.toml");
        std::fs::write(&explicit, "[analysis]\ntop_k = 2\n").unwrap();
        let config = Config::resolve(Some(explicit.as_path()), &default_path)
            .unwrap()
            .unwrap();
        assert_eq!(config.analysis.top_k, 2);
    }

    #[test]
    fn test_broken_default_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let default_path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&default_path, "[notion\ntimeout_seconds = ").unwrap();

        assert!(Config::resolve(None, &default_path).is_err());
        let missing = dir.path().join("missing.toml");
        assert!(Config::resolve(Some(missing.as_path()), &default_path).is_err());
    }

    #[test]
    fn test_output_path_follows_format() {
        let mut general = GeneralConfig::default();
        assert_eq!(
            general.output_path(OutputFormat::Markdown),
            PathBuf::from("postlens_report.md")
        );
        assert_eq!(
            general.output_path(OutputFormat::Json),
            PathBuf::from("postlens_report.json")
        );

        general.output = Some("out/report.txt".to_string());
        assert_eq!(
            general.output_path(OutputFormat::Json),
            PathBuf::from("out/report.txt")
        );
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[notion]"));
        assert!(toml_str.contains("[analysis]"));
        assert!(toml_str.contains("[mapping]"));

        let reparsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(reparsed.mapping, PropertyMap::default());
    }
}
