//! Implements the command-line interface for the gaya conformance test harness.

mod args;
mod events;

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use gaya_test_harness::{Reporter, TestRunner};

use crate::args::CommandLineArgs;

/// Exit status reported when the harness itself could not do its job.
const HARNESS_ERROR_EXIT_CODE: u8 = 1;

/// Main entry point for `gaya-test`.
fn main() -> ExitCode {
    //
    // Set up panic handler. On release builds, it will capture panic details to a
    // temporary .toml file and report a human-readable message to the screen.
    //
    human_panic::setup_panic!(human_panic::Metadata::new(
        env!("CARGO_BIN_NAME"),
        env!("CARGO_PKG_VERSION")
    ));

    let args = CommandLineArgs::parse();

    events::init_tracing(&args.enabled_debug_events, args.verbose);

    match args.color {
        clap::ColorChoice::Always => colored::control::set_override(true),
        clap::ColorChoice::Never => colored::control::set_override(false),
        clap::ColorChoice::Auto => (),
    }

    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
        .and_then(|runtime| runtime.block_on(run(args)));

    match result {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            tracing::error!("error: {err:#}");
            ExitCode::from(HARNESS_ERROR_EXIT_CODE)
        }
    }
}

/// Runs the harness. Returns the exit code.
async fn run(args: CommandLineArgs) -> anyhow::Result<u8> {
    let config = args.runner_config();
    let runner = TestRunner::new(config).context("invalid harness configuration")?;

    if args.list_fixtures_only {
        for fixture in runner.discover()? {
            println!("{fixture}");
        }
        return Ok(0);
    }

    let mut reporter = Reporter::new(std::io::stdout(), args.format)
        .with_verbose(args.verbose)
        .with_suite_name(runner.config().fixtures_dir.to_string_lossy());

    let summary = runner
        .run_until(&mut reporter, interrupted())
        .await?;

    Ok(summary.exit_code())
}

/// Completes when the user interrupts the run with Ctrl-C.
async fn interrupted() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for Ctrl-C: {err}");
        std::future::pending::<()>().await;
    }
}
