//! Queue item: one unit of harvesting work as stored in the queue collection.

use serde::{Deserialize, Serialize};

use super::ids::QueueItemId;
use super::state::QueueStatus;

/// A queue item as read from the record store.
///
/// Design:
/// - `attempts` and `last_attempt_at` are owned by upstream workers.
///   The reaper reads them and never writes them.
/// - `last_attempt_at` is kept raw; the selector parses it so that one bad
///   value only affects its own item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: QueueItemId,

    pub topic: String,

    pub status: QueueStatus,

    /// Number of times a worker claimed this item.
    #[serde(default)]
    pub attempts: u32,

    #[serde(default)]
    pub last_attempt_at: Option<String>,

    #[serde(default)]
    pub error_message: Option<String>,
}

/// Partial record sent with a conditional update.
///
/// Only the two fields the reaper is allowed to change are representable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItemPatch {
    pub status: QueueStatus,
    pub error_message: String,
}

impl QueueItemPatch {
    /// Send a stuck item back to the pending pool.
    pub fn reset_pending() -> Self {
        Self {
            status: QueueStatus::Pending,
            error_message: "Reset from stuck state".to_string(),
        }
    }

    /// Close out an item that exhausted its retry budget.
    pub fn mark_failed(attempts: u32) -> Self {
        Self {
            status: QueueStatus::Failed,
            error_message: format!("Failed after {attempts} attempts"),
        }
    }
}
