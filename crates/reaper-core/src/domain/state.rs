//! State - キューアイテムの状態
//!
//! # 状態遷移
//! - pending → processing: 上流の worker が claim（attempts を加算）
//! - processing → completed: 上流の worker が完了
//! - processing → pending: reaper による retry
//! - processing → failed: reaper による give up（FailureRecord と対）

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// QueueStatus はキューアイテムの状態を表現
///
/// 未知の状態は `Other` として保持し、reaper は触らない。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueueStatus {
    Pending,
    Processing,
    Failed,
    Completed,
    Other(String),
}

impl QueueStatus {
    pub fn as_str(&self) -> &str {
        match self {
            QueueStatus::Pending => "pending",
            QueueStatus::Processing => "processing",
            QueueStatus::Failed => "failed",
            QueueStatus::Completed => "completed",
            QueueStatus::Other(s) => s,
        }
    }

    /// Is the item claimed by a worker right now?
    pub fn is_processing(&self) -> bool {
        matches!(self, QueueStatus::Processing)
    }
}

impl From<&str> for QueueStatus {
    fn from(value: &str) -> Self {
        match value {
            "pending" => QueueStatus::Pending,
            "processing" => QueueStatus::Processing,
            "failed" => QueueStatus::Failed,
            "completed" => QueueStatus::Completed,
            other => QueueStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for QueueStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for QueueStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(QueueStatus::from(raw.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_states_use_lowercase_names() {
        let s = serde_json::to_string(&QueueStatus::Processing).unwrap();
        assert_eq!(s, "\"processing\"");

        let back: QueueStatus = serde_json::from_str("\"failed\"").unwrap();
        assert_eq!(back, QueueStatus::Failed);
    }

    #[test]
    fn unknown_state_is_preserved() {
        let st: QueueStatus = serde_json::from_str("\"archived\"").unwrap();
        assert_eq!(st, QueueStatus::Other("archived".to_string()));
        assert!(!st.is_processing());
        assert_eq!(serde_json::to_string(&st).unwrap(), "\"archived\"");
    }
}
