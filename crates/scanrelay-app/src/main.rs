// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scanrelay — saves documents scanned on a paired phone.
//
// Entry point. Initialises logging, parses the command line, and runs the
// selected command.

mod cli;
mod commands;
mod services;

use std::process::ExitCode;

use clap::Parser;
use scanrelay_core::human_errors::humanize_error;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use services::report::Reporter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("scanrelay starting");

    let reporter = Reporter::new(cli.json);
    match commands::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            reporter.error(&humanize_error(&e));
            ExitCode::FAILURE
        }
    }
}
