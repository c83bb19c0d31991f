//! Outcome model: what a transition did to one stuck item.

use super::decision::Decision;
use super::errors::TransitionError;

/// Result of applying a decision to a stuck item.
///
/// - `Reset`: the item is pending again.
/// - `Failed`: a failure record exists and the item is marked failed.
/// - `Error`: a write failed; the item stays processing until the next sweep.
/// - `Planned`: dry run, nothing was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Reset,
    Failed,
    Error(TransitionError),
    Planned(Decision),
}

impl Outcome {
    pub fn is_error(&self) -> bool {
        matches!(self, Outcome::Error(_))
    }
}
