//! App - アプリケーション層
//!
//! ports を組み合わせて sweep のロジックを実装します。
//!
//! # 主要コンポーネント
//! - **Selector**: processing から滞留アイテムを抽出
//! - **Transitioner**: Decision をストアへの書き込みに変換
//! - **Reaper**: Selector → Decider → Transitioner を 1 回実行
//! - **SweepReport**: 実行結果の集計

pub mod reaper;
pub mod report;
pub mod selector;
pub mod transitioner;

pub use self::reaper::Reaper;
pub use self::report::{ItemError, SweepReport};
pub use self::selector::{is_stale, select_stuck, stale_cutoff, Selection, SkipReason, SkippedRecord};
pub use self::transitioner::Transitioner;
