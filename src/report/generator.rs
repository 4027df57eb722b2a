//! Markdown and JSON report generation.
//!
//! This module renders analysis reports for the reporting layer. Markdown
//! is meant for people; JSON carries the full structured output.

use crate::models::{AnalysisReport, GroupStats, NormalizedRecord, ReportMetadata, SummaryStats};
use anyhow::Result;

/// Longest post text shown in Markdown tables.
const MAX_NAME_CHARS: usize = 80;

/// Generate a Markdown report covering every analyzed database.
pub fn generate_markdown_report(reports: &[AnalysisReport]) -> String {
    let mut output = String::new();

    output.push_str("# postlens Report\n\n");

    if reports.is_empty() {
        output.push_str("No databases were analyzed.\n\n");
    }

    for report in reports {
        output.push_str(&generate_database_section(report));
    }

    output.push_str(&generate_footer());

    output
}

/// Generate the full section for one database.
fn generate_database_section(report: &AnalysisReport) -> String {
    let mut section = String::new();

    section.push_str(&format!("## Database `{}`\n\n", report.metadata.database_id));
    section.push_str(&generate_metadata_section(&report.metadata));
    section.push_str(&generate_summary_section(&report.summary_stats));
    section.push_str(&generate_content_type_section(&report.content_type_analysis));
    section.push_str(&generate_posts_table(
        "Top Performing Posts",
        &report.top_performing_posts,
    ));
    section.push_str(&generate_posts_table(
        "Bottom Performing Posts",
        &report.bottom_performing_posts,
    ));
    section.push_str(&generate_posts_table(
        "Engagement Rates",
        &report.posts_with_engagement_rates,
    ));

    section
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("### Metadata\n\n");
    section.push_str(&format!(
        "- **Analysis Date:** {}\n",
        metadata.analysis_date.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Pages Fetched:** {}\n", metadata.pages_fetched));
    section.push_str(&format!(
        "- **Records Fetched:** {}\n",
        metadata.records_fetched
    ));
    section.push_str(&format!(
        "- **Analysis Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the summary statistics section.
fn generate_summary_section(stats: &SummaryStats) -> String {
    let mut section = String::new();

    section.push_str("### Summary\n\n");
    section.push_str("| Posts | Impressions | Likes | Retweets | Replies | Bookmarks | Avg Impressions | Avg Likes |\n");
    section.push_str("|:---:|:---:|:---:|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | {} | {} | {} | {:.2} | {:.2} |\n\n",
        stats.total_posts,
        stats.total_impressions,
        stats.total_likes,
        stats.total_retweets,
        stats.total_replies,
        stats.total_bookmarks,
        stats.average_impressions,
        stats.average_likes,
    ));

    if stats.skipped_records > 0 {
        section.push_str(&format!(
            "> ⚠️ **{} record(s) skipped** because they were malformed. \
             Statistics above exclude them.\n\n",
            stats.skipped_records
        ));
    }

    section
}

/// Generate the content type breakdown.
fn generate_content_type_section(groups: &[GroupStats]) -> String {
    let mut section = String::new();

    section.push_str("### Content Type Analysis\n\n");
    section.push_str("| Type | Posts | Avg Impressions | Avg Engagement | Total Impressions |\n");
    section.push_str("|:---|:---:|:---:|:---:|:---:|\n");

    for group in groups {
        section.push_str(&format!(
            "| {} | {} | {:.2} | {:.2} | {} |\n",
            group.group, group.count, group.avg_impressions, group.avg_engagement, group.total_impressions
        ));
    }
    section.push('\n');

    section
}

/// Generate a table of posts.
fn generate_posts_table(title: &str, posts: &[NormalizedRecord]) -> String {
    let mut section = String::new();

    section.push_str(&format!("### {}\n\n", title));

    if posts.is_empty() {
        section.push_str("No posts.\n\n");
        return section;
    }

    section.push_str("| # | Post | Type | Impressions | Likes | Retweets | Replies | Engagement |\n");
    section.push_str("|:---:|:---|:---|:---:|:---:|:---:|:---:|:---:|\n");

    for (i, post) in posts.iter().enumerate() {
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} | {:.2}% |\n",
            i + 1,
            post_label(post),
            post.content_type(),
            post.impression_count,
            post.like_count,
            post.retweet_count,
            post.reply_count,
            post.engagement_rate,
        ));
    }
    section.push('\n');

    section
}

/// Table-safe post text, linked when the post has a URL.
fn post_label(post: &NormalizedRecord) -> String {
    let mut text: String = post
        .name
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .take(MAX_NAME_CHARS)
        .collect();
    if post.name.chars().count() > MAX_NAME_CHARS {
        text.push('…');
    }
    let text = text.replace('|', "\\|");
    let text = if text.trim().is_empty() {
        "(untitled)".to_string()
    } else {
        text
    };

    if post.url.is_empty() {
        text
    } else {
        format!("[{}]({})", text, post.url)
    }
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Report generated by postlens v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

/// Generate a JSON report: an object for one database, an array otherwise.
pub fn generate_json_report(reports: &[AnalysisReport]) -> Result<String> {
    match reports {
        [single] => serde_json::to_string_pretty(single).map_err(Into::into),
        _ => serde_json::to_string_pretty(reports).map_err(Into::into),
    }
}
