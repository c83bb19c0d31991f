//! Failure record: permanent, append-only trace of a topic that ran out of retries.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::queue_item::QueueItem;

/// Classification tag written for items reclaimed by the reaper.
pub const TIMEOUT_ERROR_CODE: &str = "timeout";

/// Row inserted into the failure collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub topic: String,
    pub error_code: String,
    pub error_message: String,
    pub retry_count: u32,
    pub status: String,
}

impl FailureRecord {
    /// Build the record for an item that stayed in processing past `threshold`.
    pub fn stuck_timeout(item: &QueueItem, threshold: Duration) -> Self {
        Self {
            topic: item.topic.clone(),
            error_code: TIMEOUT_ERROR_CODE.to_string(),
            error_message: format!(
                "Stuck in processing >{}, attempts: {}",
                format_threshold(threshold),
                item.attempts
            ),
            retry_count: item.attempts,
            status: "failed".to_string(),
        }
    }
}

/// Whole minutes render as `10min`, anything else as seconds.
pub fn format_threshold(threshold: Duration) -> String {
    let secs = threshold.as_secs();
    if secs > 0 && secs % 60 == 0 {
        format!("{}min", secs / 60)
    } else {
        format!("{secs}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{QueueItemId, QueueStatus};

    fn item(attempts: u32) -> QueueItem {
        QueueItem {
            id: QueueItemId::from(2),
            topic: "t2".to_string(),
            status: QueueStatus::Processing,
            attempts,
            last_attempt_at: None,
            error_message: None,
        }
    }

    #[test]
    fn default_threshold_message() {
        let rec = FailureRecord::stuck_timeout(&item(3), Duration::from_secs(600));

        assert_eq!(rec.topic, "t2");
        assert_eq!(rec.error_code, "timeout");
        assert_eq!(rec.error_message, "Stuck in processing >10min, attempts: 3");
        assert_eq!(rec.retry_count, 3);
        assert_eq!(rec.status, "failed");
    }

    #[test]
    fn odd_thresholds_render_in_seconds() {
        assert_eq!(format_threshold(Duration::from_secs(90)), "90s");
        assert_eq!(format_threshold(Duration::from_secs(0)), "0s");
        assert_eq!(format_threshold(Duration::from_secs(3600)), "60min");
    }
}
