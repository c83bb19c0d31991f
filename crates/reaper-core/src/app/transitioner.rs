//! Transitioner - Decision をストアへの書き込みに変換
//!
//! # フロー
//! - Retry:  queue を pending に戻す（attempts / last_attempt_at は触らない）
//! - GiveUp: FailureRecord を insert → 成功したら queue を failed に更新
//!
//! 2 つの書き込みは atomic ではない。insert 後に update が失敗すると
//! FailureRecord だけが残り、アイテムは次回の sweep で再び拾われる。

use std::time::Duration;

use tracing::{info, warn};

use crate::domain::{
    Decision, FailureRecord, Outcome, QueueItem, QueueItemPatch, StoreError, TransitionError,
    TransitionStage,
};
use crate::ports::RecordStore;

/// Applies decisions against one queue / failure collection pair.
pub struct Transitioner<'a, S: ?Sized> {
    store: &'a S,
    queue_collection: &'a str,
    failure_collection: &'a str,
    staleness_threshold: Duration,
}

impl<'a, S: RecordStore + ?Sized> Transitioner<'a, S> {
    pub fn new(
        store: &'a S,
        queue_collection: &'a str,
        failure_collection: &'a str,
        staleness_threshold: Duration,
    ) -> Self {
        Self {
            store,
            queue_collection,
            failure_collection,
            staleness_threshold,
        }
    }

    /// Apply `decision` to `item`. Never fails; write errors come back as `Outcome::Error`.
    pub async fn apply(&self, item: &QueueItem, decision: Decision) -> Outcome {
        let result = match decision {
            Decision::Retry => self.reset(item).await.map(|()| Outcome::Reset),
            Decision::GiveUp => self.give_up(item).await.map(|()| Outcome::Failed),
        };

        match result {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(item_id = %item.id, topic = %item.topic, stage = %err.stage, error = %err.source, "transition failed");
                Outcome::Error(err)
            }
        }
    }

    async fn reset(&self, item: &QueueItem) -> Result<(), TransitionError> {
        self.patch(item, QueueItemPatch::reset_pending(), TransitionStage::ResetPending)
            .await?;
        info!(item_id = %item.id, topic = %item.topic, attempts = item.attempts, "reset to pending");
        Ok(())
    }

    async fn give_up(&self, item: &QueueItem) -> Result<(), TransitionError> {
        let record = FailureRecord::stuck_timeout(item, self.staleness_threshold);
        let body = to_json(&record, TransitionStage::InsertFailureRecord)?;

        self.store
            .insert(self.failure_collection, &body)
            .await
            .map_err(|source| TransitionError {
                stage: TransitionStage::InsertFailureRecord,
                source,
            })?;

        self.patch(
            item,
            QueueItemPatch::mark_failed(item.attempts),
            TransitionStage::MarkFailed,
        )
        .await?;

        info!(item_id = %item.id, topic = %item.topic, attempts = item.attempts, "moved to failures");
        Ok(())
    }

    async fn patch(
        &self,
        item: &QueueItem,
        patch: QueueItemPatch,
        stage: TransitionStage,
    ) -> Result<(), TransitionError> {
        let body = to_json(&patch, stage)?;
        self.store
            .update(self.queue_collection, &item.id, &body)
            .await
            .map_err(|source| TransitionError { stage, source })
    }
}

fn to_json<T: serde::Serialize>(
    value: &T,
    stage: TransitionStage,
) -> Result<serde_json::Value, TransitionError> {
    serde_json::to_value(value).map_err(|e| TransitionError {
        stage,
        source: StoreError::Encode(e.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{QueueItemId, QueueStatus};
    use crate::impls::{InMemoryRecordStore, StoreOp};
    use crate::ports::Filter;

    const Q: &str = "knowledge_harvest_queue";
    const F: &str = "failed_topics";
    const TEN_MIN: Duration = Duration::from_secs(600);

    fn item(id: i64, attempts: u32) -> QueueItem {
        QueueItem {
            id: QueueItemId::from(id),
            topic: format!("t{id}"),
            status: QueueStatus::Processing,
            attempts,
            last_attempt_at: Some("2024-05-01T11:40:00Z".to_string()),
            error_message: Some("worker lost".to_string()),
        }
    }

    async fn seeded(items: &[QueueItem]) -> InMemoryRecordStore {
        let store = InMemoryRecordStore::new();
        store
            .seed(
                Q,
                items
                    .iter()
                    .map(|i| serde_json::to_value(i).unwrap())
                    .collect(),
            )
            .await;
        store
    }

    #[tokio::test]
    async fn retry_resets_to_pending_and_keeps_attempts() {
        let it = item(1, 1);
        let store = seeded(&[it.clone()]).await;
        let tr = Transitioner::new(&store, Q, F, TEN_MIN);

        assert_eq!(tr.apply(&it, Decision::Retry).await, Outcome::Reset);

        let row = store.find(Q, &it.id).await.unwrap();
        assert_eq!(row["status"], "pending");
        assert_eq!(row["error_message"], "Reset from stuck state");
        assert_eq!(row["attempts"], 1);
        assert_eq!(row["last_attempt_at"], "2024-05-01T11:40:00Z");
        assert!(store.records(F).await.is_empty());
    }

    #[tokio::test]
    async fn retry_twice_is_idempotent() {
        let it = item(1, 1);
        let store = seeded(&[it.clone()]).await;
        let tr = Transitioner::new(&store, Q, F, TEN_MIN);

        assert_eq!(tr.apply(&it, Decision::Retry).await, Outcome::Reset);
        let first = store.find(Q, &it.id).await.unwrap();
        assert_eq!(tr.apply(&it, Decision::Retry).await, Outcome::Reset);
        let second = store.find(Q, &it.id).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn give_up_writes_failure_record_before_marking_failed() {
        let it = item(2, 3);
        let store = seeded(&[it.clone()]).await;
        let tr = Transitioner::new(&store, Q, F, TEN_MIN);

        assert_eq!(tr.apply(&it, Decision::GiveUp).await, Outcome::Failed);

        let calls = store.calls().await;
        assert_eq!(calls.len(), 2);
        assert_eq!((calls[0].op, calls[0].collection.as_str()), (StoreOp::Insert, F));
        assert_eq!((calls[1].op, calls[1].collection.as_str()), (StoreOp::Update, Q));

        assert_eq!(
            store.records(F).await,
            vec![serde_json::json!({
                "topic": "t2",
                "error_code": "timeout",
                "error_message": "Stuck in processing >10min, attempts: 3",
                "retry_count": 3,
                "status": "failed"
            })]
        );

        let row = store.find(Q, &it.id).await.unwrap();
        assert_eq!(row["status"], "failed");
        assert_eq!(row["error_message"], "Failed after 3 attempts");
    }

    #[tokio::test]
    async fn failed_insert_skips_queue_update() {
        let it = item(2, 3);
        let store = seeded(&[it.clone()]).await;
        store
            .fail_on(
                StoreOp::Insert,
                F,
                Filter::all(),
                StoreError::Connection("reset by peer".to_string()),
            )
            .await;
        let tr = Transitioner::new(&store, Q, F, TEN_MIN);

        let out = tr.apply(&it, Decision::GiveUp).await;

        assert_eq!(
            out,
            Outcome::Error(TransitionError {
                stage: TransitionStage::InsertFailureRecord,
                source: StoreError::Connection("reset by peer".to_string()),
            })
        );
        let calls = store.calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(store.find(Q, &it.id).await.unwrap()["status"], "processing");
    }

    #[tokio::test]
    async fn failed_mark_leaves_failure_record_behind() {
        let it = item(2, 4);
        let store = seeded(&[it.clone()]).await;
        store
            .fail_on(
                StoreOp::Update,
                Q,
                Filter::eq("id", "2"),
                StoreError::Status {
                    status: 500,
                    body: "oops".to_string(),
                },
            )
            .await;
        let tr = Transitioner::new(&store, Q, F, TEN_MIN);

        let out = tr.apply(&it, Decision::GiveUp).await;

        assert!(matches!(
            out,
            Outcome::Error(TransitionError {
                stage: TransitionStage::MarkFailed,
                ..
            })
        ));
        assert_eq!(store.records(F).await.len(), 1);
        assert_eq!(store.find(Q, &it.id).await.unwrap()["status"], "processing");
    }

    #[tokio::test]
    async fn failed_reset_is_reported() {
        let it = item(1, 0);
        let store = seeded(&[it.clone()]).await;
        store
            .fail_on(
                StoreOp::Update,
                Q,
                Filter::all(),
                StoreError::Connection("timeout".to_string()),
            )
            .await;
        let tr = Transitioner::new(&store, Q, F, TEN_MIN);

        let out = tr.apply(&it, Decision::Retry).await;
        assert!(matches!(
            out,
            Outcome::Error(TransitionError {
                stage: TransitionStage::ResetPending,
                ..
            })
        ));
    }
}
