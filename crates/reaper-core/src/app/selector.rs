//! Selector - 滞留アイテムの抽出
//!
//! # フロー
//! 1. RecordStore::read() で status = processing を一括取得（時刻条件は渡さない）
//! 2. レコードごとに decode と last_attempt_at の parse
//! 3. `now - last_attempt_at > threshold` のものだけ残す
//!
//! 読めないレコードは skipped に回し、バッチ全体は止めない。

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::{
    parse_timestamp, QueueItem, QueueItemId, QueueStatus, ReaperError, TimestampError,
};
use crate::ports::{Filter, RecordStore};

/// Why a fetched record was left alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// The record does not have the queue item shape.
    Undecodable { detail: String },

    /// `last_attempt_at` is absent.
    MissingTimestamp,

    /// `last_attempt_at` is present but unparseable.
    MalformedTimestamp { value: String },
}

/// A processing record the selector could not judge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    /// Best-effort id / topic for the log line.
    pub id: Option<String>,
    pub topic: Option<String>,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// Result of one selection pass.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Records returned by the store.
    pub fetched: usize,
    /// Stuck items, in store order.
    pub stuck: Vec<QueueItem>,
    pub skipped: Vec<SkippedRecord>,
}

/// `now - threshold`. Items last attempted strictly before it are stale.
///
/// `None` when the threshold reaches outside the representable time range,
/// in which case nothing is stale.
pub fn stale_cutoff(now: DateTime<Utc>, threshold: Duration) -> Option<DateTime<Utc>> {
    let threshold = chrono::Duration::from_std(threshold).ok()?;
    now.checked_sub_signed(threshold)
}

/// Strictly older than the threshold; exactly at the threshold is not stale.
///
/// A timestamp in the future is never stale.
pub fn is_stale(last_attempt_at: DateTime<Utc>, now: DateTime<Utc>, threshold: Duration) -> bool {
    older_than(last_attempt_at, stale_cutoff(now, threshold))
}

fn older_than(at: DateTime<Utc>, cutoff: Option<DateTime<Utc>>) -> bool {
    cutoff.is_some_and(|cutoff| at < cutoff)
}

/// Fetch processing items and keep the stuck ones.
///
/// Only the store read can fail the call; per-record problems end up in
/// `Selection::skipped`.
pub async fn select_stuck<S: RecordStore + ?Sized>(
    store: &S,
    collection: &str,
    now: DateTime<Utc>,
    threshold: Duration,
) -> Result<Selection, ReaperError> {
    let filter = Filter::eq("status", QueueStatus::Processing.as_str());
    let records = store
        .read(collection, &filter)
        .await
        .map_err(ReaperError::Fetch)?;

    let cutoff = stale_cutoff(now, threshold);
    let mut selection = Selection {
        fetched: records.len(),
        ..Selection::default()
    };

    for record in records {
        let item: QueueItem = match serde_json::from_value(record.clone()) {
            Ok(item) => item,
            Err(e) => {
                let skipped = SkippedRecord {
                    id: record.get("id").map(render_scalar),
                    topic: record.get("topic").and_then(|t| t.as_str()).map(str::to_string),
                    reason: SkipReason::Undecodable {
                        detail: e.to_string(),
                    },
                };
                warn!(id = ?skipped.id, error = %e, "skipping undecodable queue record");
                selection.skipped.push(skipped);
                continue;
            }
        };

        // Stores are trusted to apply the filter, but a stray row must never be touched.
        if !item.status.is_processing() {
            debug!(item_id = %item.id, status = %item.status, "ignoring non-processing record");
            continue;
        }

        let last_attempt_at = match item.last_attempt_at.as_deref().map(parse_timestamp) {
            Some(Ok(at)) => at,
            Some(Err(err)) => {
                warn!(item_id = %item.id, topic = %item.topic, error = %err, "skipping item with bad last_attempt_at");
                selection.skipped.push(skipped_for(&item.id, &item.topic, err));
                continue;
            }
            None => {
                warn!(item_id = %item.id, topic = %item.topic, "skipping item without last_attempt_at");
                selection.skipped.push(SkippedRecord {
                    id: Some(item.id.to_string()),
                    topic: Some(item.topic.clone()),
                    reason: SkipReason::MissingTimestamp,
                });
                continue;
            }
        };

        if older_than(last_attempt_at, cutoff) {
            selection.stuck.push(item);
        }
    }

    Ok(selection)
}

fn skipped_for(id: &QueueItemId, topic: &str, err: TimestampError) -> SkippedRecord {
    let reason = match err {
        TimestampError::Empty => SkipReason::MissingTimestamp,
        TimestampError::Malformed { value } => SkipReason::MalformedTimestamp { value },
    };
    SkippedRecord {
        id: Some(id.to_string()),
        topic: Some(topic.to_string()),
        reason,
    }
}

fn render_scalar(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
