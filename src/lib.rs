// src/lib.rs

//! Dependency-graph job runner.
//!
//! Register named jobs on an [`Orchestrator`], chaining the returned handles
//! as dependencies, then [`run`](Orchestrator::run) them against one shared
//! payload. Independent jobs run concurrently; a job starts only after all of
//! its dependencies finished; the first failure cancels the rest.

pub mod cli;
pub mod config;
pub mod dag;
pub mod errors;
mod fault;
pub mod logging;
pub mod pipeline;
pub mod sink;
pub mod sync;

pub use dag::{JobHandle, Orchestrator};
pub use errors::{CollabError, Result};
pub use sink::{DiagnosticSink, NoopSink, TracingSink};
pub use sync::{ErrGroup, WaitGroup};
pub use tokio_util::sync::CancellationToken;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{load_and_validate, PipelineConfig};
use crate::pipeline::{build_pipeline, diamond, StageLog};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - pipeline loading (or the built-in diamond)
/// - the orchestrator with a tracing sink
/// - Ctrl-C handling through the caller token
pub async fn run(args: CliArgs) -> anyhow::Result<()> {
    let cfg = match &args.config {
        Some(path) => load_and_validate(path)?,
        None => diamond()?,
    };

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let mut co = build_pipeline(&cfg)?.with_sink(TracingSink);
    if let Some(ms) = args.timeout_ms {
        co = co.with_timeout(Duration::from_millis(ms));
    }

    // Ctrl-C → cancel the invocation.
    let ctx = CancellationToken::new();
    {
        let ctx = ctx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            info!("Ctrl+C received; cancelling pipeline");
            ctx.cancel();
        });
    }

    let log = Arc::new(StageLog::new());
    let started = Instant::now();
    let result = co.run(&ctx, Arc::clone(&log)).await;

    println!("stages finished: {}", log.finished().join(" "));
    println!("elapsed: {:?}", started.elapsed());

    result?;
    Ok(())
}

fn print_dry_run(cfg: &PipelineConfig) {
    println!("collab dry-run");
    match cfg.runner.timeout() {
        Some(t) => println!("  runner.timeout = {t:?}"),
        None => println!("  runner.timeout = none"),
    }
    println!();

    println!("stages ({}):", cfg.stage.len());
    for (name, stage) in cfg.stages_in_order() {
        println!("  - {name}");
        println!("      sleep: {:?}", stage.sleep());
        if !stage.after.is_empty() {
            println!("      after: {:?}", stage.after);
        }
        if stage.fail {
            println!("      fail: true");
        }
        if stage.panic {
            println!("      panic: true");
        }
        if let Some(ms) = stage.timeout_ms {
            println!("      timeout_ms: {ms} (not enforced)");
        }
    }

    debug!("dry-run complete (no execution)");
}
