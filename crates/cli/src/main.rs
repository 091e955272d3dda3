// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! pulse — monitors an access log file and reports general statistics and
//! high traffic events periodically.
//!
//! Schedule reports go to stdout; diagnostics go to stderr through
//! tracing, so report output stays machine-consumable.

use anyhow::Context;
use clap::Parser;
use pulse_clf::{ClfLineParser, GeneralStats, GeneralStatsView, HighTrafficGauge};
use pulse_engine::{FileTailer, Scheduler};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

type StdoutGauge = HighTrafficGauge<io::Stdout>;

#[derive(Parser)]
#[command(name = "pulse")]
#[command(version)]
#[command(about = "Tail an access log and report traffic statistics and high traffic events")]
#[command(long_about = "pulse monitors a file of Common Log Format lines, '/tmp/access.log' by \
default, and reports periodically on stdout: general traffic statistics for every statistics \
period, and a high/normal traffic message whenever the average throughput crosses the configured \
threshold over the gauge period.")]
struct Cli {
    /// Path of the watched access log file
    #[arg(short = 'f', long = "file", default_value = "/tmp/access.log")]
    file: PathBuf,

    /// Reporting period in seconds for general statistics
    #[arg(long = "stats-period", default_value_t = GeneralStats::DEFAULT_PERIOD_SECS)]
    stats_period: u32,

    /// Reporting period in seconds for the high traffic gauge
    #[arg(long = "gauge-period", default_value_t = StdoutGauge::DEFAULT_PERIOD_SECS)]
    gauge_period: u32,

    /// Average requests per second that trips the high traffic gauge
    #[arg(long = "gauge-threshold", default_value_t = StdoutGauge::DEFAULT_THRESHOLD_RPS)]
    gauge_threshold: f64,

    /// Consume the file from the beginning instead of tailing its end
    #[arg(long = "from-start")]
    from_start: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(io::stderr)
        .init();

    // malformed parameters exit with 1; help and version exit clean
    let cli = Cli::try_parse().unwrap_or_else(|e| {
        let _ = e.print();
        std::process::exit(if e.use_stderr() { 1 } else { 0 });
    });

    let tailer = FileTailer::new(cli.file.clone(), ClfLineParser);
    let scheduler = Arc::new(Scheduler::new(tailer, cli.from_start));
    scheduler.register(Box::new(GeneralStatsView::new(io::stdout(), cli.stats_period)));
    scheduler.register(Box::new(HighTrafficGauge::new(
        io::stdout(),
        cli.gauge_period,
        cli.gauge_threshold,
    )));

    scheduler
        .start()
        .with_context(|| format!("cannot watch {}", cli.file.display()))?;
    info!(file = %cli.file.display(), "pulse started");

    let watcher = Arc::clone(&scheduler);
    let lost = tokio::task::spawn_blocking(move || {
        // drains until the scheduler stops itself (e.g. parent folder lost)
        while watcher.join_tasks(500) {
            std::thread::sleep(std::time::Duration::from_millis(500));
        }
    });

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("cannot listen for shutdown signal")?;
            info!("interrupted, stopping");
            // a self-stop may have raced the signal
            if let Err(e) = scheduler.stop() {
                tracing::debug!(error = %e, "scheduler already stopped");
            }
        }
        _ = lost => {
            info!("scheduler stopped on its own");
        }
    }
    Ok(())
}
