//! Decision model: what to do with a stuck item.
//!
//! This module defines the Decision type (retry or give up) and the Decider trait
//! (how to reach it from the item's recorded attempts).

use serde::{Deserialize, Serialize};

use super::QueueItem;

/// Default retry budget.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// The fate of a stuck item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Return the item to pending so a worker claims it again.
    Retry,

    /// Record a permanent failure and mark the item failed.
    GiveUp,
}

/// Give up once `attempts` reaches `max_retries`, otherwise retry.
pub fn classify(item: &QueueItem, max_retries: u32) -> Decision {
    if item.attempts >= max_retries {
        Decision::GiveUp
    } else {
        Decision::Retry
    }
}

/// Trait for deciding the fate of a stuck item.
///
/// Deciders are pure functions: no I/O, no mutation of the item.
pub trait Decider: Send + Sync {
    fn decide(&self, item: &QueueItem) -> Decision;
}

/// Attempt-count based decider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    pub max_retries: u32,
}

impl RetryBudget {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES)
    }
}

impl Decider for RetryBudget {
    fn decide(&self, item: &QueueItem) -> Decision {
        classify(item, self.max_retries)
    }
}
