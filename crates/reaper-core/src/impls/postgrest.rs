//! PostgrestStore - Supabase / PostgREST 上のレコードストア
//!
//! - read:   `GET  {url}/rest/v1/{collection}?select=*&{col}=eq.{value}`
//! - insert: `POST {url}/rest/v1/{collection}`
//! - update: `PATCH {url}/rest/v1/{collection}?id=eq.{id}`
//!
//! 認証は `apikey` と `Authorization: Bearer` の両ヘッダ。
//! タイムアウトは reqwest::Client に設定したものだけを使います。

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use tracing::debug;

use crate::config::StoreConfig;
use crate::domain::{QueueItemId, StoreError};
use crate::ports::{Filter, RecordStore};

/// Record store speaking the PostgREST dialect over HTTP.
pub struct PostgrestStore {
    base_url: String,
    api_key: String,
    client: Client,
}

impl PostgrestStore {
    /// Build a store with its own HTTP client.
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StoreError::Connection(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.base_url().to_string(),
            api_key: config.api_key.clone(),
            client,
        })
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, collection)
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json")
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, StoreError> {
        let resp = self
            .authorized(req)
            .send()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }
}

/// Query pairs for a filtered read.
pub fn read_query(filter: &Filter) -> Vec<(String, String)> {
    let mut query = vec![("select".to_string(), "*".to_string())];
    query.extend(
        filter
            .conditions()
            .iter()
            .map(|(column, value)| (column.clone(), format!("eq.{value}"))),
    );
    query
}

/// Query pairs targeting a single record.
pub fn id_query(id: &QueueItemId) -> Vec<(String, String)> {
    vec![("id".to_string(), format!("eq.{id}"))]
}

#[async_trait]
impl RecordStore for PostgrestStore {
    async fn read(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Vec<serde_json::Value>, StoreError> {
        let url = self.collection_url(collection);
        debug!(%url, ?filter, "reading records");

        let resp = self
            .send(self.client.get(&url).query(&read_query(filter)))
            .await?;

        resp.json::<Vec<serde_json::Value>>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }

    async fn insert(
        &self,
        collection: &str,
        record: &serde_json::Value,
    ) -> Result<(), StoreError> {
        let url = self.collection_url(collection);
        debug!(%url, "inserting record");

        self.send(
            self.client
                .post(&url)
                .header("Prefer", "return=minimal")
                .json(record),
        )
        .await?;
        Ok(())
    }

    async fn update(
        &self,
        collection: &str,
        id: &QueueItemId,
        patch: &serde_json::Value,
    ) -> Result<(), StoreError> {
        let url = self.collection_url(collection);
        debug!(%url, item_id = %id, "updating record");

        self.send(
            self.client
                .patch(&url)
                .query(&id_query(id))
                .header("Prefer", "return=minimal")
                .json(patch),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_query_selects_all_columns_and_maps_eq() {
        let q = read_query(&Filter::eq("status", "processing"));
        assert_eq!(
            q,
            vec![
                ("select".to_string(), "*".to_string()),
                ("status".to_string(), "eq.processing".to_string()),
            ]
        );
    }

    #[test]
    fn id_query_renders_ids_verbatim() {
        assert_eq!(id_query(&QueueItemId::from(12))[0].1, "eq.12");
        assert_eq!(
            id_query(&QueueItemId::from("7f1c0b4e-9f1e"))[0].1,
            "eq.7f1c0b4e-9f1e"
        );
    }

    #[test]
    fn collection_url_ignores_trailing_slash() {
        let store =
            PostgrestStore::new(&StoreConfig::new("https://abc.supabase.co/", "k")).unwrap();
        assert_eq!(
            store.collection_url("failed_topics"),
            "https://abc.supabase.co/rest/v1/failed_topics"
        );
    }

    #[tokio::test]
    async fn unreachable_store_is_a_connection_error() {
        // Port 9 (discard) on localhost is closed on CI machines.
        let cfg = StoreConfig::new("http://127.0.0.1:9", "k")
            .with_timeout(std::time::Duration::from_secs(2));
        let store = PostgrestStore::new(&cfg).unwrap();

        let err = store
            .read("knowledge_harvest_queue", &Filter::eq("status", "processing"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Connection(_)));
    }
}
