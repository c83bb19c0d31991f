//! SweepReport - 1 回の sweep の集計
//!
//! 人が読むサマリ（Display）と `--json` 用の Serialize を持つ。
//! 機械向けの契約ではありません。

use std::fmt;

use serde::Serialize;

use super::selector::SkippedRecord;
use crate::domain::{Decision, Outcome, RunId};

/// One failed transition, kept for the summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemError {
    pub id: String,
    pub topic: String,
    pub stage: String,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub run_id: String,
    pub dry_run: bool,

    /// Processing records returned by the store.
    pub fetched: usize,
    /// Records older than the threshold.
    pub stuck: usize,

    pub reset: usize,
    pub failed: usize,

    /// Dry run only: what would have happened.
    pub planned_reset: usize,
    pub planned_failed: usize,

    pub errors: Vec<ItemError>,
    pub skipped: Vec<SkippedRecord>,
}

impl SweepReport {
    pub fn new(run_id: RunId, dry_run: bool) -> Self {
        Self {
            run_id: run_id.to_string(),
            dry_run,
            fetched: 0,
            stuck: 0,
            reset: 0,
            failed: 0,
            planned_reset: 0,
            planned_failed: 0,
            errors: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Count one item outcome.
    pub fn record(&mut self, id: &str, topic: &str, outcome: &Outcome) {
        match outcome {
            Outcome::Reset => self.reset += 1,
            Outcome::Failed => self.failed += 1,
            Outcome::Planned(Decision::Retry) => self.planned_reset += 1,
            Outcome::Planned(Decision::GiveUp) => self.planned_failed += 1,
            Outcome::Error(err) => self.errors.push(ItemError {
                id: id.to_string(),
                topic: topic.to_string(),
                stage: err.stage.to_string(),
                detail: err.source.to_string(),
            }),
        }
    }

    /// Items that were stuck but neither reset nor failed.
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}

impl fmt::Display for SweepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(50);
        writeln!(f, "{rule}")?;
        if self.dry_run {
            writeln!(f, "  CLEANUP FINISHED (dry run)")?;
        } else {
            writeln!(f, "  CLEANUP FINISHED")?;
        }
        writeln!(f, "{rule}")?;
        writeln!(f, "Run:        {}", self.run_id)?;
        writeln!(f, "Processing: {}", self.fetched)?;
        writeln!(f, "Stuck:      {}", self.stuck)?;
        if self.dry_run {
            writeln!(f, "Would reset to pending: {}", self.planned_reset)?;
            writeln!(f, "Would fail:             {}", self.planned_failed)?;
        } else {
            writeln!(f, "Pending:    {}", self.reset)?;
            writeln!(f, "Failed:     {}", self.failed)?;
        }
        writeln!(f, "Errors:     {}", self.errors.len())?;
        writeln!(f, "Skipped:    {}", self.skipped.len())?;
        for e in &self.errors {
            writeln!(f, "  [ERROR] {} ({}): {}: {}", e.topic, e.id, e.stage, e.detail)?;
        }
        Ok(())
    }
}
