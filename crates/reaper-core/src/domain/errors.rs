//! Errors - エラー型と分類
//!
//! # 分類
//! - StoreError: ストア呼び出し単位の失敗（transport / HTTP status / decode）
//! - TransitionError: 1 アイテムの遷移失敗（バッチは継続）
//! - ReaperError: sweep 全体を止める失敗（初回 fetch、設定）

use std::fmt;

use thiserror::Error;

/// Failure of a single record store call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store unreachable: {0}")]
    Connection(String),

    #[error("store returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("cannot decode store response: {0}")]
    Decode(String),

    #[error("cannot encode record: {0}")]
    Encode(String),
}

/// Which write of a transition failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionStage {
    ResetPending,
    InsertFailureRecord,
    MarkFailed,
}

impl TransitionStage {
    pub fn as_str(self) -> &'static str {
        match self {
            TransitionStage::ResetPending => "reset_pending",
            TransitionStage::InsertFailureRecord => "insert_failure_record",
            TransitionStage::MarkFailed => "mark_failed",
        }
    }
}

impl fmt::Display for TransitionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A write for one item failed; the rest of the batch goes on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{stage} failed: {source}")]
pub struct TransitionError {
    pub stage: TransitionStage,
    #[source]
    pub source: StoreError,
}

/// Errors that abort a sweep before any item is touched.
#[derive(Debug, Error)]
pub enum ReaperError {
    #[error("failed to fetch processing items: {0}")]
    Fetch(#[source] StoreError),

    #[error("invalid configuration: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_error_names_stage_and_cause() {
        let err = TransitionError {
            stage: TransitionStage::InsertFailureRecord,
            source: StoreError::Status {
                status: 409,
                body: "duplicate key".to_string(),
            },
        };

        assert_eq!(
            err.to_string(),
            "insert_failure_record failed: store returned HTTP 409: duplicate key"
        );
    }
}
