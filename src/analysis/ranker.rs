//! Impression ranking and top/bottom slicing.

use crate::models::NormalizedRecord;

/// Default size of the top and bottom performer lists.
pub const DEFAULT_K: usize = 5;

/// Sort posts by impressions, highest first.
///
/// The sort is stable: posts with equal impressions keep fetch order.
pub fn rank_by_impressions(records: &mut [NormalizedRecord]) {
    records.sort_by(|a, b| b.impression_count.cmp(&a.impression_count));
}

/// The first `k` posts of a ranked dataset, or all of them if fewer.
pub fn top_k(ranked: &[NormalizedRecord], k: usize) -> &[NormalizedRecord] {
    &ranked[..k.min(ranked.len())]
}

/// The last `k` posts of a ranked dataset, still in ranked order.
///
/// With fewer than `k` posts this is the whole dataset, overlapping
/// [`top_k`] entirely.
pub fn bottom_k(ranked: &[NormalizedRecord], k: usize) -> &[NormalizedRecord] {
    &ranked[ranked.len().saturating_sub(k)..]
}
