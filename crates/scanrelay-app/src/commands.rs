// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command dispatch.

use std::path::PathBuf;
use std::time::Duration;

use scanrelay_bridge::{MemoryTransfer, TransferSource};
use scanrelay_core::error::{Result, ScanError};
use scanrelay_core::human_errors::humanize_error;
use scanrelay_core::{OutputKind, SaveReport};
use scanrelay_document::{CaptureIngestor, CaptureSummary, ScanSession, describe_transfer};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::cli::{Cli, Commands, ConfigAction, OutputArgs};
use crate::services::app_services::AppServices;
use crate::services::report::Reporter;

const MIN_POLL_INTERVAL_MS: u64 = 50;

pub async fn run(cli: Cli) -> Result<()> {
    let services = AppServices::init(cli.config)?;
    let reporter = Reporter::new(cli.json);

    match cli.command {
        Commands::Capture { output } => capture(&services, &reporter, &output),
        Commands::Import { files, output } => import(&services, &reporter, &files, &output),
        Commands::Watch {
            interval_ms,
            output,
        } => watch(&services, &reporter, interval_ms, &output).await,
        Commands::Inspect => {
            let transfer = services.transfer();
            reporter.transfer(&describe_transfer(transfer.as_ref())?)
        }
        Commands::Formats => reporter.formats(),
        Commands::Config { action } => match action {
            ConfigAction::Show => reporter.config(services.config(), services.config_path()),
            ConfigAction::Init { force } => {
                services.persist_config(force)?;
                println!("Wrote {}", services.config_path().display());
                Ok(())
            }
        },
    }
}

fn capture(services: &AppServices, reporter: &Reporter, output: &OutputArgs) -> Result<()> {
    let mut session = services.session(output)?;
    let transfer = services.transfer();
    let (summary, report) = capture_once(&mut session, transfer.as_ref(), output.convert)?;
    reporter.batch(&summary, &report)?;
    services.open_saved(session.config(), &report);
    Ok(())
}

fn import(
    services: &AppServices,
    reporter: &Reporter,
    files: &[PathBuf],
    output: &OutputArgs,
) -> Result<()> {
    let mut session = services.session(output)?;

    let mut transfers = Vec::with_capacity(files.len());
    for file in files {
        let mut transfer = MemoryTransfer::new();
        transfer.set_file(file)?;
        transfers.push(transfer);
    }
    let sources: Vec<&dyn TransferSource> = transfers
        .iter()
        .map(|t| t as &dyn TransferSource)
        .collect();

    let capture = CaptureIngestor::from_config(session.config()).ingest_merged(&sources)?;
    let summary = session.adopt(capture)?;
    let report = write_batch(&mut session, output.convert)?;
    reporter.batch(&summary, &report)?;
    services.open_saved(session.config(), &report);
    Ok(())
}

/// Poll the transfer channel and save each new scan as its own batch.
async fn watch(
    services: &AppServices,
    reporter: &Reporter,
    interval_ms: u64,
    output: &OutputArgs,
) -> Result<()> {
    let mut session = services.session(output)?;
    let transfer = services.transfer();
    let mut last_seen = transfer
        .change_count()?
        .ok_or(ScanError::PlatformUnavailable)?;

    let mut ticker =
        tokio::time::interval(Duration::from_millis(interval_ms.max(MIN_POLL_INTERVAL_MS)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(interval_ms, "watching for scans (Ctrl-C to stop)");
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("stopping watch");
                break;
            }
            _ = ticker.tick() => {}
        }

        let current = match transfer.change_count() {
            Ok(Some(count)) => count,
            Ok(None) => continue,
            Err(e) => {
                warn!("pasteboard poll failed: {}", humanize_error(&e).message);
                continue;
            }
        };
        if current == last_seen {
            continue;
        }
        last_seen = current;
        debug!(change_count = current, "pasteboard changed");

        match capture_once(&mut session, transfer.as_ref(), output.convert) {
            Ok((summary, report)) => {
                reporter.batch(&summary, &report)?;
                services.open_saved(session.config(), &report);
            }
            Err(ScanError::NoDataAvailable) => debug!("change carried no scan"),
            Err(e) => warn!("scan not saved: {}", humanize_error(&e).message),
        }
    }

    reporter.stats(&session.stats())
}

fn capture_once(
    session: &mut ScanSession,
    transfer: &dyn TransferSource,
    convert: Option<OutputKind>,
) -> Result<(CaptureSummary, SaveReport)> {
    let summary = session.capture(transfer)?;
    let report = write_batch(session, convert)?;
    Ok((summary, report))
}

fn write_batch(session: &mut ScanSession, convert: Option<OutputKind>) -> Result<SaveReport> {
    match convert {
        Some(kind) => session.convert(kind),
        None => session.save(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::ffi::OsStr;
    use std::path::Path;

    fn parse(config: &Path, args: &[&OsStr]) -> Cli {
        let mut argv = vec![OsStr::new("scanrelay"), OsStr::new("--config"), config.as_os_str()];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    fn png_file(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.join(name);
        image::RgbImage::from_pixel(width, height, image::Rgb([200, 200, 200]))
            .save(&path)
            .unwrap();
        path
    }

    #[tokio::test]
    async fn import_saves_files_as_one_batch() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config.json");
        let out = dir.path().join("out");
        let a = png_file(dir.path(), "a.png", 8, 6);
        let b = png_file(dir.path(), "b.png", 4, 4);

        let cli = parse(
            &config,
            &[
                OsStr::new("import"),
                a.as_os_str(),
                b.as_os_str(),
                OsStr::new("-o"),
                out.as_os_str(),
                OsStr::new("-f"),
                OsStr::new("png"),
            ],
        );
        run(cli).await.unwrap();

        let mut names: Vec<String> = std::fs::read_dir(&out)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names.len(), 2);
        assert!(names[0].ends_with("_page01.png"));
        assert!(names[1].ends_with("_page02.png"));
    }

    #[tokio::test]
    async fn import_of_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.png");
        let cli = parse(
            &dir.path().join("config.json"),
            &[OsStr::new("import"), missing.as_os_str()],
        );
        assert!(run(cli).await.is_err());
    }

    #[tokio::test]
    async fn config_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config.json");
        let init = [OsStr::new("config"), OsStr::new("init")];

        run(parse(&config, &init)).await.unwrap();
        assert!(config.exists());
        assert!(matches!(
            run(parse(&config, &init)).await,
            Err(ScanError::InvalidConfig(_))
        ));

        let forced = [OsStr::new("config"), OsStr::new("init"), OsStr::new("--force")];
        run(parse(&config, &forced)).await.unwrap();
    }
}
