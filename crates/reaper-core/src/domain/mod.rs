//! Domain model (ids, queue items, failure records, decisions, outcomes, ...).
//!
//! I/O を一切持たない層。ports / app から参照されます。

pub mod decision;
pub mod errors;
pub mod failure;
pub mod ids;
pub mod outcome;
pub mod queue_item;
pub mod state;
pub mod timestamp;

pub use decision::{classify, Decider, Decision, RetryBudget, DEFAULT_MAX_RETRIES};
pub use errors::{ReaperError, StoreError, TransitionError, TransitionStage};
pub use failure::{format_threshold, FailureRecord, TIMEOUT_ERROR_CODE};
pub use ids::{QueueItemId, RunId};
pub use outcome::Outcome;
pub use queue_item::{QueueItem, QueueItemPatch};
pub use state::QueueStatus;
pub use timestamp::{parse_timestamp, TimestampError};
