//! reaper - one sweep over the harvest queue.
//!
//! Exit code 0 when the batch was processed (even with per-item write errors),
//! 1 when the processing items could not be fetched, 2 on bad configuration.

mod args;

use std::process::ExitCode;

use clap::Parser;
use reaper_core::{Reaper, ReaperError, SweepReport};
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::args::Args;

const EXIT_OK: u8 = 0;
const EXIT_FETCH_FAILED: u8 = 1;
const EXIT_BAD_CONFIG: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    // .env は他の何よりも先に読む（SUPABASE_* を環境変数から拾うため）
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let default_filter = if args.verbose {
        "reaper_core=debug,reaper=debug"
    } else {
        "reaper_core=info,reaper=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match args.reaper_config() {
        Ok(config) => config,
        Err(e) => {
            error!("{e:#}");
            return ExitCode::from(EXIT_BAD_CONFIG);
        }
    };

    let reaper = match Reaper::connect(config) {
        Ok(reaper) => reaper,
        Err(e) => {
            error!("{e}");
            return ExitCode::from(EXIT_BAD_CONFIG);
        }
    };

    let result = reaper.sweep().await;
    match &result {
        Ok(report) => print_report(report, args.json),
        Err(e) => error!("{e}"),
    }
    ExitCode::from(exit_status(&result))
}

/// Item write errors do not fail the run; only the fetch and the config can.
fn exit_status(result: &Result<SweepReport, ReaperError>) -> u8 {
    match result {
        Ok(_) => EXIT_OK,
        Err(ReaperError::Fetch(_)) => EXIT_FETCH_FAILED,
        Err(ReaperError::Config(_)) => EXIT_BAD_CONFIG,
    }
}

fn print_report(report: &SweepReport, json: bool) {
    if json {
        match serde_json::to_string_pretty(report) {
            Ok(s) => println!("{s}"),
            Err(e) => error!("cannot render report as JSON: {e}"),
        }
    } else {
        print!("{report}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reaper_core::domain::StoreError;
    use reaper_core::impls::{InMemoryRecordStore, StoreOp};
    use reaper_core::ports::Filter;
    use reaper_core::{ReaperConfig, StoreConfig};

    const Q: &str = "knowledge_harvest_queue";
    const F: &str = "failed_topics";

    fn row(id: i64, topic: &str, attempts: u32) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "topic": topic,
            "status": "processing",
            "attempts": attempts,
            "last_attempt_at": "2020-01-01T00:00:00Z",
        })
    }

    async fn sweep(store: InMemoryRecordStore) -> Result<SweepReport, ReaperError> {
        let cfg = ReaperConfig::new(StoreConfig::new("https://unused.local", "k"));
        Reaper::new(store, cfg).sweep().await
    }

    #[tokio::test]
    async fn empty_queue_exits_zero() {
        let result = sweep(InMemoryRecordStore::new()).await;
        assert_eq!(exit_status(&result), 0);
    }

    #[tokio::test]
    async fn item_errors_still_exit_zero() {
        let store = InMemoryRecordStore::new();
        store.seed(Q, vec![row(1, "t1", 1), row(2, "t2", 3)]).await;
        store
            .fail_on(
                StoreOp::Insert,
                F,
                Filter::eq("topic", "t2"),
                StoreError::Status {
                    status: 503,
                    body: "unavailable".to_string(),
                },
            )
            .await;

        let result = sweep(store).await;

        assert_eq!(result.as_ref().map(SweepReport::error_count).ok(), Some(1));
        assert_eq!(exit_status(&result), 0);
    }

    #[tokio::test]
    async fn fetch_failure_exits_non_zero() {
        let store = InMemoryRecordStore::new();
        store
            .fail_on(
                StoreOp::Read,
                Q,
                Filter::all(),
                StoreError::Connection("refused".to_string()),
            )
            .await;

        let result = sweep(store).await;

        assert!(matches!(result, Err(ReaperError::Fetch(_))));
        assert_eq!(exit_status(&result), 1);
    }

    #[test]
    fn config_error_exits_two() {
        let err = Reaper::connect(ReaperConfig::new(StoreConfig::new("", "k")))
            .err()
            .unwrap();

        assert!(matches!(err, ReaperError::Config(_)));
        assert_eq!(exit_status(&Err(err)), 2);
    }
}
