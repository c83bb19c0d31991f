//! Domain identifiers.
//!
//! # 二種類の ID
//! - **RunId**: sweep 実行ごとに発行する ULID ベースの ID（ログの相関用）
//! - **QueueItemId**: ストアが払い出す不透明な ID（文字列でも整数でも受け付ける）

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use ulid::Ulid;

/// Identifier of one sweep invocation, rendered as `run-<ULID>`.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunId(Ulid);

impl RunId {
    const PREFIX: &'static str = "run-";

    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl From<Ulid> for RunId {
    fn from(ulid: Ulid) -> Self {
        Self(ulid)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::PREFIX, self.0)
    }
}

/// Opaque identifier of a queue item, as handed out by the record store.
///
/// Stores expose ids either as JSON strings (uuid) or JSON integers (bigserial).
/// Both decode into the same value and are rendered back verbatim, so the
/// filter `id=eq.{id}` always matches what the store sent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueueItemId(IdRepr);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum IdRepr {
    Text(String),
    Number(i64),
}

impl QueueItemId {
    pub fn as_json(&self) -> serde_json::Value {
        match &self.0 {
            IdRepr::Text(s) => serde_json::Value::String(s.clone()),
            IdRepr::Number(n) => serde_json::Value::from(*n),
        }
    }
}

impl From<&str> for QueueItemId {
    fn from(value: &str) -> Self {
        Self(IdRepr::Text(value.to_string()))
    }
}

impl From<String> for QueueItemId {
    fn from(value: String) -> Self {
        Self(IdRepr::Text(value))
    }
}

impl From<i64> for QueueItemId {
    fn from(value: i64) -> Self {
        Self(IdRepr::Number(value))
    }
}

impl fmt::Display for QueueItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            IdRepr::Text(s) => f.write_str(s),
            IdRepr::Number(n) => write!(f, "{n}"),
        }
    }
}

impl Serialize for QueueItemId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.0 {
            IdRepr::Text(s) => serializer.serialize_str(s),
            IdRepr::Number(n) => serializer.serialize_i64(*n),
        }
    }
}

impl<'de> Deserialize<'de> for QueueItemId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(i64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(Self(IdRepr::Number(n))),
            Raw::Text(s) if s.is_empty() => {
                Err(serde::de::Error::custom("queue item id must not be empty"))
            }
            Raw::Text(s) => Ok(Self(IdRepr::Text(s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_has_prefix() {
        let ulid = Ulid::new();
        let run = RunId::from_ulid(ulid);

        assert_eq!(run.as_ulid(), ulid);
        assert!(run.to_string().starts_with("run-"));
    }

    #[test]
    fn run_ids_are_sortable() {
        // ULID は時刻ベースなので、生成順序でソート可能
        let id1 = RunId::from_ulid(Ulid::new());
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = RunId::from_ulid(Ulid::new());

        assert!(id1 < id2);
    }

    #[test]
    fn queue_item_id_accepts_numbers_and_strings() {
        let n: QueueItemId = serde_json::from_value(serde_json::json!(42)).unwrap();
        let s: QueueItemId =
            serde_json::from_value(serde_json::json!("7f1c0b4e-9f1e-4d0a-8a0e-1b2c3d4e5f60"))
                .unwrap();

        assert_eq!(n, QueueItemId::from(42));
        assert_eq!(n.to_string(), "42");
        assert_eq!(s.to_string(), "7f1c0b4e-9f1e-4d0a-8a0e-1b2c3d4e5f60");
    }

    #[test]
    fn queue_item_id_keeps_json_shape() {
        assert_eq!(QueueItemId::from(5).as_json(), serde_json::json!(5));
        assert_eq!(QueueItemId::from("a").as_json(), serde_json::json!("a"));
    }

    #[test]
    fn empty_queue_item_id_is_rejected() {
        let res: Result<QueueItemId, _> = serde_json::from_value(serde_json::json!(""));
        assert!(res.is_err());
    }
}
