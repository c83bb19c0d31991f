//! InMemoryRecordStore - 開発・テスト用のレコードストア
//!
//! # 実装詳細
//! - HashMap<String, Vec<Value>> で collection ごとにレコードを保持
//! - 呼び出し履歴（StoreCall）を記録し、テストで書き込み内容を検証できる
//! - Fault を登録すると、条件に合う呼び出しを失敗させられる
//!
//! PostgREST と同じく、該当 id がない update は成功扱い（何も変更しない）。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{QueueItemId, StoreError};
use crate::ports::{Filter, RecordStore};

/// Kind of store call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Read,
    Insert,
    Update,
}

/// One recorded call. `payload` is the inserted record or the update patch.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreCall {
    pub op: StoreOp,
    pub collection: String,
    pub id: Option<QueueItemId>,
    pub payload: Option<serde_json::Value>,
}

/// Injected failure.
///
/// `when` is matched against the inserted record (insert) or the current
/// record with that id (update). Reads fail regardless of `when`.
#[derive(Debug, Clone)]
struct Fault {
    op: StoreOp,
    collection: String,
    when: Filter,
    error: StoreError,
}

#[derive(Debug, Default)]
struct State {
    collections: HashMap<String, Vec<serde_json::Value>>,
    faults: Vec<Fault>,
    calls: Vec<StoreCall>,
}

impl State {
    fn fault_for(
        &self,
        op: StoreOp,
        collection: &str,
        record: Option<&serde_json::Value>,
    ) -> Option<StoreError> {
        self.faults
            .iter()
            .find(|f| {
                f.op == op
                    && f.collection == collection
                    && match record {
                        Some(r) => f.when.matches(r),
                        None => true,
                    }
            })
            .map(|f| f.error.clone())
    }
}

/// In-memory record store shared behind an `Arc`, cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecordStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the content of `collection`.
    pub async fn seed(&self, collection: &str, records: Vec<serde_json::Value>) {
        let mut state = self.state.lock().await;
        state.collections.insert(collection.to_string(), records);
    }

    /// Snapshot of `collection` (empty if unknown).
    pub async fn records(&self, collection: &str) -> Vec<serde_json::Value> {
        let state = self.state.lock().await;
        state.collections.get(collection).cloned().unwrap_or_default()
    }

    /// Current record with the given id.
    pub async fn find(&self, collection: &str, id: &QueueItemId) -> Option<serde_json::Value> {
        let state = self.state.lock().await;
        let wanted = id.as_json();
        state
            .collections
            .get(collection)
            .and_then(|rows| rows.iter().find(|r| r.get("id") == Some(&wanted)).cloned())
    }

    /// Every call made so far, in order.
    pub async fn calls(&self) -> Vec<StoreCall> {
        self.state.lock().await.calls.clone()
    }

    /// Make matching calls fail with `error` from now on.
    pub async fn fail_on(&self, op: StoreOp, collection: &str, when: Filter, error: StoreError) {
        let mut state = self.state.lock().await;
        state.faults.push(Fault {
            op,
            collection: collection.to_string(),
            when,
            error,
        });
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn read(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Vec<serde_json::Value>, StoreError> {
        let mut state = self.state.lock().await;
        state.calls.push(StoreCall {
            op: StoreOp::Read,
            collection: collection.to_string(),
            id: None,
            payload: None,
        });

        if let Some(err) = state.fault_for(StoreOp::Read, collection, None) {
            return Err(err);
        }

        Ok(state
            .collections
            .get(collection)
            .map(|rows| rows.iter().filter(|r| filter.matches(r)).cloned().collect())
            .unwrap_or_default())
    }

    async fn insert(
        &self,
        collection: &str,
        record: &serde_json::Value,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.calls.push(StoreCall {
            op: StoreOp::Insert,
            collection: collection.to_string(),
            id: None,
            payload: Some(record.clone()),
        });

        if let Some(err) = state.fault_for(StoreOp::Insert, collection, Some(record)) {
            return Err(err);
        }

        if !record.is_object() {
            return Err(StoreError::Encode("record must be a JSON object".to_string()));
        }

        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(record.clone());
        Ok(())
    }

    async fn update(
        &self,
        collection: &str,
        id: &QueueItemId,
        patch: &serde_json::Value,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.calls.push(StoreCall {
            op: StoreOp::Update,
            collection: collection.to_string(),
            id: Some(id.clone()),
            payload: Some(patch.clone()),
        });

        let wanted = id.as_json();
        let current = state
            .collections
            .get(collection)
            .and_then(|rows| rows.iter().find(|r| r.get("id") == Some(&wanted)).cloned())
            .unwrap_or_else(|| serde_json::json!({ "id": wanted.clone() }));

        if let Some(err) = state.fault_for(StoreOp::Update, collection, Some(&current)) {
            return Err(err);
        }

        let Some(fields) = patch.as_object() else {
            return Err(StoreError::Encode("patch must be a JSON object".to_string()));
        };

        if let Some(row) = state
            .collections
            .get_mut(collection)
            .and_then(|rows| rows.iter_mut().find(|r| r.get("id") == Some(&wanted)))
            && let Some(target) = row.as_object_mut()
        {
            for (k, v) in fields {
                target.insert(k.clone(), v.clone());
            }
        }
        Ok(())
    }
}
