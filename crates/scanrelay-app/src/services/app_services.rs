// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service layer — loads settings and hands out capture sessions and
// platform services to the commands.

use std::path::{Path, PathBuf};

use scanrelay_bridge::{FileOpener, TransferSource};
use scanrelay_core::error::{Result, ScanError};
use scanrelay_core::human_errors::humanize_error;
use scanrelay_core::{SaveReport, ScanConfig};
use scanrelay_document::ScanSession;
use tracing::{info, warn};

use super::data_dir;
use crate::cli::OutputArgs;

/// Settings plus the platform services a command needs.
pub struct AppServices {
    config_path: PathBuf,
    config: ScanConfig,
}

impl AppServices {
    /// Load settings from `config_path`, or from the default location.
    /// A missing file yields the defaults.
    pub fn init(config_path: Option<PathBuf>) -> Result<Self> {
        let config_path = config_path.unwrap_or_else(data_dir::config_path);
        let config = ScanConfig::load_or_default(&config_path)?;
        info!(path = %config_path.display(), "settings loaded");
        Ok(Self {
            config_path,
            config,
        })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Settings with per-run overrides applied, checked for consistency.
    pub fn effective_config(&self, overrides: &OutputArgs) -> Result<ScanConfig> {
        let mut config = self.config.clone();
        overrides.apply(&mut config);
        config.validated()
    }

    /// A fresh capture session for one command run.
    pub fn session(&self, overrides: &OutputArgs) -> Result<ScanSession> {
        ScanSession::new(self.effective_config(overrides)?)
    }

    /// Write the current settings to disk. Refuses to replace an existing
    /// file unless `force` is set.
    pub fn persist_config(&self, force: bool) -> Result<()> {
        if self.config_path.exists() && !force {
            return Err(ScanError::InvalidConfig(format!(
                "{} already exists (use --force to overwrite)",
                self.config_path.display()
            )));
        }
        self.config.save(&self.config_path)?;
        info!(path = %self.config_path.display(), "settings written");
        Ok(())
    }

    pub fn transfer(&self) -> Box<dyn TransferSource> {
        scanrelay_bridge::platform_transfer()
    }

    /// Open what a batch wrote, when the settings ask for it. Failing to
    /// open is logged, never fatal: the files are already on disk.
    pub fn open_saved(&self, config: &ScanConfig, report: &SaveReport) {
        open_with(scanrelay_bridge::platform_opener().as_ref(), config, report);
    }
}

fn open_with(opener: &dyn FileOpener, config: &ScanConfig, report: &SaveReport) {
    if !config.open_after_save || report.files_written.is_empty() {
        return;
    }
    if let Err(e) = opener.open_paths(&report.paths()) {
        warn!("could not open saved files: {}", humanize_error(&e).message);
    }
}
