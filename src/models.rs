//! Data models for post analytics.
//!
//! This module contains the core data structures used throughout the
//! application: raw records as returned by the query endpoint, the
//! normalized post schema, and the report types built from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A record as returned by the remote query endpoint, prior to normalization.
///
/// Both fields may be absent; the property bag can take any shape.
/// Deserialization never fails: an entry that is not an object keeps its
/// JSON type in `malformed` and is rejected later by the normalizer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct RawRecord {
    /// Remote page identifier.
    pub id: Option<String>,
    /// Semi-structured property bag, keyed by property name.
    pub properties: Option<Value>,
    /// JSON type of the result entry when it was not an object.
    #[serde(skip)]
    pub malformed: Option<&'static str>,
}

impl From<Value> for RawRecord {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(mut entry) => RawRecord {
                id: entry.get("id").and_then(record_id),
                properties: entry.remove("properties"),
                malformed: None,
            },
            other => RawRecord {
                id: None,
                properties: None,
                malformed: Some(json_type(&other)),
            },
        }
    }
}

/// Ids are strings; a numeric id is kept in its decimal form.
fn record_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Name of a JSON value's type, for error messages.
pub fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Content type of a post, used for grouping.
///
/// Variants are declared in classification precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    /// First post of a thread.
    ThreadHead,
    /// Continuation post of a thread.
    ThreadPart,
    /// Long-form note post.
    NoteTweet,
    /// Anything else.
    Regular,
}

impl ContentType {
    /// All content types, highest precedence first.
    pub const ALL: [ContentType; 4] = [
        ContentType::ThreadHead,
        ContentType::ThreadPart,
        ContentType::NoteTweet,
        ContentType::Regular,
    ];

    /// Returns the display label used in reports.
    pub fn label(&self) -> &'static str {
        match self {
            ContentType::ThreadHead => "Thread Heads",
            ContentType::ThreadPart => "Thread Parts",
            ContentType::NoteTweet => "Note Tweets",
            ContentType::Regular => "Regular Tweets",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A post mapped into the fixed, fully-defaulted schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    /// Remote page identifier, if the record carried one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Post text (first title block).
    pub name: String,
    /// Identifier of the post on the social platform.
    pub external_id: Option<i64>,
    /// Link to the post.
    pub url: String,
    pub reply_count: u64,
    pub retweet_count: u64,
    pub bookmark_count: u64,
    pub impression_count: u64,
    pub like_count: u64,
    /// When the post was published.
    pub created_at: Option<DateTime<Utc>>,
    pub is_thread_head: bool,
    pub is_thread_part: bool,
    pub is_note_tweet: bool,
    /// Interactions per hundred impressions, set by the aggregator.
    pub engagement_rate: f64,
}

impl NormalizedRecord {
    /// Likes, retweets and replies combined.
    pub fn interactions(&self) -> u64 {
        self.like_count
            .saturating_add(self.retweet_count)
            .saturating_add(self.reply_count)
    }

    /// Classifies the post into exactly one content type.
    ///
    /// Precedence: thread head, thread part, note tweet, regular.
    pub fn content_type(&self) -> ContentType {
        if self.is_thread_head {
            ContentType::ThreadHead
        } else if self.is_thread_part {
            ContentType::ThreadPart
        } else if self.is_note_tweet {
            ContentType::NoteTweet
        } else {
            ContentType::Regular
        }
    }
}

/// Dataset-wide totals and averages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub total_posts: usize,
    pub total_impressions: u64,
    pub total_likes: u64,
    pub total_retweets: u64,
    pub total_replies: u64,
    pub total_bookmarks: u64,
    pub average_impressions: f64,
    pub average_likes: f64,
    /// Records dropped because their property bag was malformed.
    pub skipped_records: usize,
}

/// Aggregate statistics for one content type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    pub group: ContentType,
    pub count: usize,
    pub avg_impressions: f64,
    /// Average of likes + retweets + replies per post.
    pub avg_engagement: f64,
    pub total_impressions: u64,
}

impl GroupStats {
    /// Creates an empty group.
    pub fn empty(group: ContentType) -> Self {
        Self {
            group,
            count: 0,
            avg_impressions: 0.0,
            avg_engagement: 0.0,
            total_impressions: 0,
        }
    }
}

/// Metadata about a single analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Database that was queried.
    pub database_id: String,
    /// Date and time of the analysis.
    pub analysis_date: DateTime<Utc>,
    /// Number of pages walked.
    pub pages_fetched: usize,
    /// Number of raw records received.
    pub records_fetched: usize,
    /// Duration of the run in seconds.
    pub duration_seconds: f64,
}

/// The complete result of analyzing one database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub metadata: ReportMetadata,
    pub summary_stats: SummaryStats,
    pub top_performing_posts: Vec<NormalizedRecord>,
    pub bottom_performing_posts: Vec<NormalizedRecord>,
    /// Ranked posts that had at least one impression.
    pub posts_with_engagement_rates: Vec<NormalizedRecord>,
    /// One entry per content type, in precedence order.
    pub content_type_analysis: Vec<GroupStats>,
}
