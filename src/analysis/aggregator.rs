//! Engagement metrics and dataset statistics.
//!
//! This module computes per-post engagement rates, dataset-wide totals
//! and averages, and per-content-type group statistics.
//!
//! Fractional values are rounded half-up to two decimal places using
//! integer arithmetic, so results do not depend on float representation.

use crate::models::{ContentType, GroupStats, NormalizedRecord, SummaryStats};

/// `numerator / denominator * scale`, rounded half-up to two decimals.
///
/// Returns 0 when `denominator` is 0.
fn rounded_ratio(numerator: u64, denominator: u64, scale: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }

    let num = numerator as u128 * scale as u128 * 100;
    let den = denominator as u128;
    let hundredths = (2 * num + den) / (2 * den);
    hundredths as f64 / 100.0
}

/// Average of `total` over `count` items, rounded to two decimals.
pub fn average(total: u64, count: usize) -> f64 {
    rounded_ratio(total, count as u64, 1)
}

/// Interactions per hundred impressions, or 0 without impressions.
pub fn engagement_rate(record: &NormalizedRecord) -> f64 {
    rounded_ratio(record.interactions(), record.impression_count, 100)
}

/// Fill in `engagement_rate` on every record.
pub fn apply_engagement_rates(records: &mut [NormalizedRecord]) {
    for record in records.iter_mut() {
        record.engagement_rate = engagement_rate(record);
    }
}

/// Compute totals and averages over the dataset.
pub fn summarize(records: &[NormalizedRecord], skipped: usize) -> SummaryStats {
    let mut stats = SummaryStats {
        total_posts: records.len(),
        skipped_records: skipped,
        ..Default::default()
    };

    for record in records {
        stats.total_impressions = stats.total_impressions.saturating_add(record.impression_count);
        stats.total_likes = stats.total_likes.saturating_add(record.like_count);
        stats.total_retweets = stats.total_retweets.saturating_add(record.retweet_count);
        stats.total_replies = stats.total_replies.saturating_add(record.reply_count);
        stats.total_bookmarks = stats.total_bookmarks.saturating_add(record.bookmark_count);
    }

    stats.average_impressions = average(stats.total_impressions, stats.total_posts);
    stats.average_likes = average(stats.total_likes, stats.total_posts);

    stats
}

/// Group statistics for every content type, in precedence order.
///
/// Each record lands in exactly one group, so the counts always sum to
/// `records.len()`.
pub fn content_type_analysis(records: &[NormalizedRecord]) -> Vec<GroupStats> {
    let mut totals = [(0usize, 0u64, 0u64); ContentType::ALL.len()];

    for record in records {
        let slot = &mut totals[group_index(record.content_type())];
        slot.0 += 1;
        slot.1 = slot.1.saturating_add(record.impression_count);
        slot.2 = slot.2.saturating_add(record.interactions());
    }

    ContentType::ALL
        .iter()
        .zip(totals)
        .map(|(group, (count, impressions, engagement))| {
            if count == 0 {
                return GroupStats::empty(*group);
            }
            GroupStats {
                group: *group,
                count,
                avg_impressions: average(impressions, count),
                avg_engagement: average(engagement, count),
                total_impressions: impressions,
            }
        })
        .collect()
}

fn group_index(group: ContentType) -> usize {
    match group {
        ContentType::ThreadHead => 0,
        ContentType::ThreadPart => 1,
        ContentType::NoteTweet => 2,
        ContentType::Regular => 3,
    }
}
