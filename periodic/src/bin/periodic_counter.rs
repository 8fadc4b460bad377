// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Prints a counter once per period. Each line shows the time since the first release,
//! so the spacing between releases is visible.

use std::time::Duration;

use clap::Parser;
use miette::IntoDiagnostic;
use r3bl_periodic::{DEFAULT_PRIORITY, PeriodicScheduler, SchedulerError};
use tokio::time::Instant;
use tracing_core::LevelFilter;

/// More info: <https://docs.rs/clap/latest/clap/_derive/_tutorial/chapter_2/index.html>
#[derive(Debug, Parser)]
#[command(bin_name = "periodic_counter")]
#[command(about = "Print a counter once per period")]
#[command(version)]
#[command(next_line_help = true)]
struct CliArgs {
    #[arg(long, default_value_t = 5000, help = "Period in milliseconds")]
    period_ms: u64,

    #[arg(long, help = "Deadline in milliseconds, defaults to the period")]
    deadline_ms: Option<u64>,

    #[arg(long, default_value_t = DEFAULT_PRIORITY, help = "Task priority")]
    priority: u8,

    #[arg(long, help = "Stop after this many releases, runs forever if not set")]
    iterations: Option<u64>,

    #[arg(long, short = 'v', help = "Log scheduler transitions to stderr")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli_args = CliArgs::parse();

    let level_filter = if cli_args.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level_filter)
        .with_target(false)
        .try_init()
        .map_err(|e| miette::miette!("failed to initialize logging: {e}"))?;

    let period = Duration::from_millis(cli_args.period_ms);
    let deadline = cli_args.deadline_ms.map_or(period, Duration::from_millis);
    let iterations = cli_args.iterations;
    let priority = cli_args.priority;

    let scheduler = PeriodicScheduler::new();
    let join_handle = scheduler.spawn("periodic_counter", move |task| async move {
        let mut params = task.get_params()?;
        params.period = period;
        params.deadline = deadline;
        params.priority = priority;
        params.is_periodic = true;
        task.set_params(params)?;

        let start = Instant::now();
        let mut counter: u64 = 0;
        loop {
            println!("{counter} (+{} ms)", start.elapsed().as_millis());
            counter += 1;
            if iterations.is_some_and(|it| counter >= it) {
                return Ok::<(), SchedulerError>(());
            }
            task.try_wait_for_next_period().await?;
        }
    });

    let stats = join_handle.await.into_diagnostic()??;
    tracing::info!(message = "done", stats = ?stats);
    Ok(())
}
