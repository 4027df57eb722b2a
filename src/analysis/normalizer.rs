//! Raw record normalization.
//!
//! Maps each record's property bag onto [`NormalizedRecord`] through the
//! field table in [`PropertyMap`]. Every lookup is optional: a missing
//! property, an unexpected shape, or a failed nested access yields the
//! field's default instead of an error.

use crate::config::PropertyMap;
use crate::error::MappingError;
use crate::models::{json_type, NormalizedRecord, RawRecord};
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Result of normalizing a batch of records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedBatch {
    /// Successfully mapped records, in input order.
    pub records: Vec<NormalizedRecord>,
    /// Records rejected with a [`MappingError`].
    pub skipped: usize,
}

/// Applies a [`PropertyMap`] to raw records.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    map: PropertyMap,
}

impl Normalizer {
    pub fn new(map: PropertyMap) -> Self {
        Self { map }
    }

    /// Normalize a single record.
    ///
    /// Fails only when the entry itself, or its property bag, is present
    /// but not an object.
    pub fn normalize(&self, raw: RawRecord) -> Result<NormalizedRecord, MappingError> {
        if let Some(found) = raw.malformed {
            return Err(MappingError::MalformedEntry { found });
        }

        let empty = Map::new();
        let props = match raw.properties {
            None | Some(Value::Null) => &empty,
            Some(Value::Object(ref map)) => map,
            Some(ref other) => {
                return Err(MappingError::PropertiesNotObject {
                    record_id: raw.id.clone().unwrap_or_else(|| "<unknown>".to_string()),
                    found: json_type(other),
                })
            }
        };

        let map = &self.map;
        let get = |name: &str| props.get(name);

        Ok(NormalizedRecord {
            id: raw.id.clone(),
            name: get(&map.name).and_then(first_text_block).unwrap_or_default(),
            external_id: get(&map.external_id)
                .and_then(|p| p.get("number"))
                .and_then(integral_id),
            url: get(&map.url)
                .and_then(|p| p.get("url"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            reply_count: number(get(&map.reply_count)),
            retweet_count: number(get(&map.retweet_count)),
            bookmark_count: number(get(&map.bookmark_count)),
            impression_count: number(get(&map.impression_count)),
            like_count: number(get(&map.like_count)),
            created_at: get(&map.created_at)
                .and_then(|p| p.get("date"))
                .and_then(|d| d.get("start"))
                .and_then(Value::as_str)
                .and_then(parse_timestamp),
            is_thread_head: checkbox(get(&map.is_thread_head)),
            is_thread_part: checkbox(get(&map.is_thread_part)),
            is_note_tweet: checkbox(get(&map.is_note_tweet)),
            engagement_rate: 0.0,
        })
    }

    /// Normalize every record, skipping and counting the ones that fail.
    pub fn normalize_all(&self, raw: Vec<RawRecord>) -> NormalizedBatch {
        let mut batch = NormalizedBatch {
            records: Vec::with_capacity(raw.len()),
            skipped: 0,
        };

        for record in raw {
            match self.normalize(record) {
                Ok(normalized) => batch.records.push(normalized),
                Err(e) => {
                    warn!("Skipping record: {}", e);
                    batch.skipped += 1;
                }
            }
        }

        debug!(
            "Normalized {} records ({} skipped)",
            batch.records.len(),
            batch.skipped
        );
        batch
    }
}

/// First block of a title (or rich text) list. Later blocks are ignored.
fn first_text_block(prop: &Value) -> Option<String> {
    let blocks = prop
        .get("title")
        .or_else(|| prop.get("rich_text"))?
        .as_array()?;
    let block = blocks.first()?;

    block
        .get("text")
        .and_then(|t| t.get("content"))
        .or_else(|| block.get("plain_text"))
        .and_then(Value::as_str)
        .map(String::from)
}

/// Non-negative count from a `number` property; 0 for anything else.
fn number(prop: Option<&Value>) -> u64 {
    let Some(value) = prop.and_then(|p| p.get("number")) else {
        return 0;
    };

    if let Some(n) = value.as_u64() {
        return n;
    }

    match value.as_f64() {
        Some(f) if f.is_finite() && f >= 0.0 => f.trunc() as u64,
        _ => 0,
    }
}

fn integral_id(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }

    let f = value.as_f64()?;
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn checkbox(prop: Option<&Value>) -> bool {
    prop.and_then(|p| p.get("checkbox"))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// RFC 3339 timestamps, or bare dates taken as midnight UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn raw(properties: Value) -> RawRecord {
        RawRecord {
            id: Some("page-1".to_string()),
            properties: Some(properties),
            ..Default::default()
        }
    }

    fn full_properties() -> Value {
        json!({
            "Name": {"title": [
                {"type": "text", "text": {"content": "Shipping a Rust rewrite"}, "plain_text": "Shipping a Rust rewrite"},
                {"type": "text", "text": {"content": " (part 2)"}}
            ]},
            "tweet_id": {"number": 1789012345678901i64},
            "url": {"url": "https://x.com/user/status/1789012345678901"},
            "reply_count": {"number": 4},
            "retweet_count": {"number": 12},
            "bookmark_count": {"number": 7},
            "impression_count": {"number": 2300},
            "like_count": {"number": 85},
            "created_at": {"date": {"start": "2024-05-01T14:30:00.000+02:00"}},
            "is_thread_head": {"checkbox": true},
            "is_thread_part": {"checkbox": false},
            "is_note_tweet": {"checkbox": true}
        })
    }

    #[test]
    fn test_normalize_full_record() {
        let record = Normalizer::default().normalize(raw(full_properties())).unwrap();

        assert_eq!(record.id.as_deref(), Some("page-1"));
        assert_eq!(record.name, "Shipping a Rust rewrite");
        assert_eq!(record.external_id, Some(1789012345678901));
        assert_eq!(record.url, "https://x.com/user/status/1789012345678901");
        assert_eq!(record.reply_count, 4);
        assert_eq!(record.retweet_count, 12);
        assert_eq!(record.bookmark_count, 7);
        assert_eq!(record.impression_count, 2300);
        assert_eq!(record.like_count, 85);
        assert_eq!(
            record.created_at,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap())
        );
        assert!(record.is_thread_head);
        assert!(!record.is_thread_part);
        assert!(record.is_note_tweet);
        assert_eq!(record.engagement_rate, 0.0);
    }

    #[test]
    fn test_missing_properties_default() {
        let record = Normalizer::default().normalize(raw(json!({}))).unwrap();

        assert_eq!(record.name, "");
        assert_eq!(record.external_id, None);
        assert_eq!(record.url, "");
        assert_eq!(record.reply_count, 0);
        assert_eq!(record.retweet_count, 0);
        assert_eq!(record.bookmark_count, 0);
        assert_eq!(record.impression_count, 0);
        assert_eq!(record.like_count, 0);
        assert_eq!(record.created_at, None);
        assert!(!record.is_thread_head);
        assert!(!record.is_thread_part);
        assert!(!record.is_note_tweet);
    }

    #[test]
    fn test_absent_or_null_property_bag_defaults() {
        let normalizer = Normalizer::default();

        let absent = RawRecord::default();
        assert_eq!(normalizer.normalize(absent).unwrap().impression_count, 0);

        let null = raw(Value::Null);
        assert_eq!(normalizer.normalize(null).unwrap().name, "");
    }

    #[test]
    fn test_unexpected_shapes_default() {
        let record = Normalizer::default()
            .normalize(raw(json!({
                "Name": {"title": []},
                "tweet_id": {"number": 12.5},
                "url": {"url": null},
                "reply_count": {"number": null},
                "retweet_count": {"number": "12"},
                "bookmark_count": "7",
                "impression_count": {"number": -40},
                "like_count": {"checkbox": true},
                "created_at": {"date": null},
                "is_thread_head": {"checkbox": "yes"},
                "is_thread_part": {"number": 1},
                "is_note_tweet": null
            })))
            .unwrap();

        assert_eq!(record.name, "");
        assert_eq!(record.external_id, None);
        assert_eq!(record.url, "");
        assert_eq!(record.reply_count, 0);
        assert_eq!(record.retweet_count, 0);
        assert_eq!(record.bookmark_count, 0);
        assert_eq!(record.impression_count, 0);
        assert_eq!(record.like_count, 0);
        assert_eq!(record.created_at, None);
        assert!(!record.is_thread_head);
        assert!(!record.is_thread_part);
        assert!(!record.is_note_tweet);
    }

    #[test]
    fn test_float_counts_truncate() {
        let record = Normalizer::default()
            .normalize(raw(json!({
                "impression_count": {"number": 1500.9},
                "tweet_id": {"number": 42.0}
            })))
            .unwrap();
        assert_eq!(record.impression_count, 1500);
        assert_eq!(record.external_id, Some(42));
    }

    #[test]
    fn test_title_falls_back_to_plain_text() {
        let record = Normalizer::default()
            .normalize(raw(json!({
                "Name": {"title": [{"type": "mention", "plain_text": "@rustlang"}]}
            })))
            .unwrap();
        assert_eq!(record.name, "@rustlang");
    }

    #[test]
    fn test_date_only_created_at() {
        let record = Normalizer::default()
            .normalize(raw(json!({"created_at": {"date": {"start": "2024-03-09", "end": null}}})))
            .unwrap();
        assert_eq!(
            record.created_at,
            Some(Utc.with_ymd_and_hms(2024, 3, 9, 0, 0, 0).unwrap())
        );

        let garbage = Normalizer::default()
            .normalize(raw(json!({"created_at": {"date": {"start": "last tuesday"}}})))
            .unwrap();
        assert_eq!(garbage.created_at, None);
    }

    #[test]
    fn test_custom_property_map() {
        let map = PropertyMap {
            impression_count: "Views".to_string(),
            ..PropertyMap::default()
        };
        let record = Normalizer::new(map)
            .normalize(raw(json!({
                "Views": {"number": 900},
                "impression_count": {"number": 1}
            })))
            .unwrap();
        assert_eq!(record.impression_count, 900);
    }

    #[test]
    fn test_non_object_properties_rejected() {
        let err = Normalizer::default()
            .normalize(raw(json!(["impression_count", 10])))
            .unwrap_err();
        assert_eq!(
            err,
            MappingError::PropertiesNotObject {
                record_id: "page-1".to_string(),
                found: "array",
            }
        );

        let err = Normalizer::default()
            .normalize(RawRecord {
                properties: Some(json!("oops")),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(
            err,
            MappingError::PropertiesNotObject {
                record_id: "<unknown>".to_string(),
                found: "string",
            }
        );
    }

    #[test]
    fn test_non_object_entries_rejected() {
        let entry = RawRecord::from(Value::Null);
        let err = Normalizer::default().normalize(entry).unwrap_err();
        assert_eq!(err, MappingError::MalformedEntry { found: "null" });
    }

    #[test]
    fn test_normalize_all_skips_and_counts() {
        let batch = Normalizer::default().normalize_all(vec![
            raw(json!({"impression_count": {"number": 10}})),
            raw(json!(42)),
            raw(json!({"impression_count": {"number": 20}})),
            raw(json!("not a map")),
        ]);

        assert_eq!(batch.skipped, 2);
        let impressions: Vec<u64> = batch.records.iter().map(|r| r.impression_count).collect();
        assert_eq!(impressions, vec![10, 20]);
    }

    #[test]
    fn test_page_with_odd_entries_keeps_good_records() {
        let raws: Vec<RawRecord> = serde_json::from_value(json!([
            {"id": "ok", "properties": {"impression_count": {"number": 10}}},
            null,
            {"id": 42, "properties": {"impression_count": {"number": 20}}},
            7
        ]))
        .unwrap();

        let batch = Normalizer::default().normalize_all(raws);
        assert_eq!(batch.skipped, 2);
        let ids: Vec<Option<String>> = batch.records.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec![Some("ok".to_string()), Some("42".to_string())]);
    }
}
