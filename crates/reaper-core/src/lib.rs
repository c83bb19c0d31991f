//! reaper-core
//!
//! Reclaims queue items stuck in `processing`.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, queue_item, failure, decision, outcome, state, timestamp, errors）
//! - **ports**: 抽象化レイヤー（RecordStore, Clock, IdGenerator）
//! - **app**: アプリケーションロジック（selector, transitioner, reaper, report）
//! - **impls**: 実装（PostgrestStore, InMemoryRecordStore）
//! - **config**: sweep の設定（ReaperConfig, StoreConfig）

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;

pub use app::{Reaper, SweepReport};
pub use config::{ReaperConfig, StoreConfig};
pub use domain::ReaperError;
