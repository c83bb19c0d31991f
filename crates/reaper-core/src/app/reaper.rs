//! Reaper - 滞留アイテムの回収（1 回の sweep）
//!
//! # フロー
//! 1. Selector: processing を取得し、閾値より古いものを抽出
//! 2. Decider: attempts と max_retries から Retry / GiveUp を決定
//! 3. Transitioner: pending へ戻す、または FailureRecord + failed
//!
//! アイテムは 1 件ずつ順番に処理し、1 件の失敗でバッチを止めない。
//! 失敗で run を止めるのは最初の fetch だけ。

use std::sync::Arc;

use tracing::{info, info_span, Instrument};

use super::report::SweepReport;
use super::selector::{select_stuck, stale_cutoff};
use super::transitioner::Transitioner;
use crate::config::ReaperConfig;
use crate::domain::{format_threshold, Decider, Decision, Outcome, ReaperError, RetryBudget, RunId};
use crate::impls::PostgrestStore;
use crate::ports::{Clock, IdGenerator, RecordStore, SystemClock, UlidGenerator};

/// Reaper は 1 回の sweep を実行する
///
/// # 使用例
/// ```ignore
/// let reaper = Reaper::connect(config)?;
/// let report = reaper.sweep().await?;
/// println!("{report}");
/// ```
pub struct Reaper<S> {
    store: S,
    config: ReaperConfig,
    clock: Arc<dyn Clock>,
    ids: Box<dyn IdGenerator>,
    decider: Box<dyn Decider>,
}

impl Reaper<PostgrestStore> {
    /// Validate `config` and build a reaper talking to the configured PostgREST endpoint.
    pub fn connect(config: ReaperConfig) -> Result<Self, ReaperError> {
        config.validate()?;
        let store = PostgrestStore::new(&config.store)
            .map_err(|e| ReaperError::Config(e.to_string()))?;
        Ok(Self::new(store, config))
    }
}

impl<S: RecordStore> Reaper<S> {
    pub fn new(store: S, config: ReaperConfig) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let decider = Box::new(RetryBudget::new(config.max_retries));
        Self {
            store,
            config,
            ids: Box::new(UlidGenerator::new(clock.clone())),
            clock,
            decider,
        }
    }

    /// Replace the time source (run ids follow the same clock).
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(clock);
        self.ids = Box::new(UlidGenerator::new(clock.clone()));
        self.clock = clock;
        self
    }

    /// Replace the retry policy. `ReaperConfig::max_retries` is then unused.
    pub fn with_decider(mut self, decider: impl Decider + 'static) -> Self {
        self.decider = Box::new(decider);
        self
    }

    pub fn config(&self) -> &ReaperConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run one sweep.
    ///
    /// Returns `Err` only when the processing items cannot be fetched.
    pub async fn sweep(&self) -> Result<SweepReport, ReaperError> {
        let run_id = self.ids.generate_run_id();
        let span = info_span!("sweep", run_id = %run_id);
        self.run(run_id).instrument(span).await
    }

    async fn run(&self, run_id: RunId) -> Result<SweepReport, ReaperError> {
        let cfg = &self.config;
        let now = self.clock.now();
        let cutoff = stale_cutoff(now, cfg.staleness_threshold)
            .map_or_else(|| "none".to_string(), |c| c.to_rfc3339());
        info!(
            cutoff = %cutoff,
            threshold = %format_threshold(cfg.staleness_threshold),
            dry_run = cfg.dry_run,
            "looking for stuck items"
        );

        let selection =
            select_stuck(&self.store, &cfg.queue_collection, now, cfg.staleness_threshold).await?;
        info!(
            fetched = selection.fetched,
            stuck = selection.stuck.len(),
            skipped = selection.skipped.len(),
            "loaded processing items"
        );

        let mut report = SweepReport::new(run_id, cfg.dry_run);
        report.fetched = selection.fetched;
        report.stuck = selection.stuck.len();
        report.skipped = selection.skipped;

        if selection.stuck.is_empty() {
            info!("no stuck items");
            return Ok(report);
        }

        let transitioner = Transitioner::new(
            &self.store,
            &cfg.queue_collection,
            &cfg.failure_collection,
            cfg.staleness_threshold,
        );

        for item in &selection.stuck {
            let decision = self.decider.decide(item);
            let path = match decision {
                Decision::Retry => "pending",
                Decision::GiveUp => "failed",
            };
            info!(
                item_id = %item.id,
                topic = %item.topic,
                attempts = item.attempts,
                path,
                "stuck item"
            );

            let outcome = if cfg.dry_run {
                Outcome::Planned(decision)
            } else {
                transitioner.apply(item, decision).await
            };
            report.record(&item.id.to_string(), &item.topic, &outcome);
        }

        info!(
            reset = report.reset,
            failed = report.failed,
            errors = report.error_count(),
            "sweep finished"
        );
        Ok(report)
    }
}
