// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Desktop file opener — hands saved files to the system's default viewer.

use std::path::PathBuf;
use std::process::Command;

use scanrelay_core::error::{Result, ScanError};
use tracing::{info, warn};

use crate::traits::FileOpener;

/// Opens files through the desktop's launcher command.
pub struct DesktopOpener;

impl DesktopOpener {
    /// Launcher program and the arguments that precede the file paths.
    fn launcher() -> (&'static str, &'static [&'static str]) {
        if cfg!(target_os = "macos") {
            ("open", &[])
        } else if cfg!(target_os = "windows") {
            ("cmd", &["/C", "start", ""])
        } else {
            ("xdg-open", &[])
        }
    }
}

impl FileOpener for DesktopOpener {
    fn open_paths(&self, paths: &[PathBuf]) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }

        let (program, leading) = Self::launcher();
        info!(program, count = paths.len(), "opening saved files");

        // `open` accepts many paths at once; the others take one per call.
        let batches: Vec<&[PathBuf]> = if cfg!(target_os = "macos") {
            vec![paths]
        } else {
            paths.chunks(1).collect()
        };

        for batch in batches {
            let status = Command::new(program)
                .args(leading)
                .args(batch)
                .status()
                .map_err(|err| ScanError::Bridge(format!("failed to run {program}: {err}")))?;
            if !status.success() {
                warn!(program, %status, "launcher exited with failure");
                return Err(ScanError::Bridge(format!("{program} exited with {status}")));
            }
        }
        Ok(())
    }
}
