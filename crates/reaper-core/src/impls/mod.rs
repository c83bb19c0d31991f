//! Impls - ports の実装
//!
//! - **PostgrestStore**: 本番用（Supabase / PostgREST over HTTP）
//! - **InMemoryRecordStore**: 開発・テスト用

pub mod inmem_store;
pub mod postgrest;

pub use self::inmem_store::{InMemoryRecordStore, StoreCall, StoreOp};
pub use self::postgrest::PostgrestStore;
