//! RecordStore port - キュー / 失敗記録の正本
//!
//! 転送方式（PostgREST, インメモリ）に依存しない汎用レコードストア。
//! レコードは JSON のまま受け渡し、型付けは app 層で行います。
//!
//! # 実装
//! - **PostgrestStore**: 本番用（HTTP）
//! - **InMemoryRecordStore**: 開発・テスト用

use async_trait::async_trait;

use crate::domain::{QueueItemId, StoreError};

/// Equality conditions combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    conditions: Vec<(String, String)>,
}

impl Filter {
    /// Match every record.
    pub fn all() -> Self {
        Self::default()
    }

    /// Single `column = value` condition.
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::all().and_eq(column, value)
    }

    pub fn and_eq(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.conditions.push((column.into(), value.into()));
        self
    }

    pub fn conditions(&self) -> &[(String, String)] {
        &self.conditions
    }

    /// Does a JSON record satisfy every condition?
    ///
    /// Strings compare by content, other scalars by their JSON text.
    pub fn matches(&self, record: &serde_json::Value) -> bool {
        self.conditions.iter().all(|(column, expected)| {
            match record.get(column) {
                Some(serde_json::Value::String(s)) => s == expected,
                Some(serde_json::Value::Null) | None => false,
                Some(other) => other.to_string() == *expected,
            }
        })
    }
}

/// RecordStore は filtered read / insert / id 条件付き update を提供
///
/// # 設計原則
/// - すべての呼び出しは Result を返す（例外的な制御フローなし）
/// - タイムアウトは転送層の責務
/// - update は id 一致の 1 レコードだけを書き換える（該当なしは成功扱い）
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Read every record of `collection` matching `filter`, in store order.
    async fn read(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Vec<serde_json::Value>, StoreError>;

    /// Append one record.
    async fn insert(&self, collection: &str, record: &serde_json::Value)
    -> Result<(), StoreError>;

    /// Merge `patch` into the record whose `id` equals `id`.
    async fn update(
        &self,
        collection: &str,
        id: &QueueItemId,
        patch: &serde_json::Value,
    ) -> Result<(), StoreError>;
}
