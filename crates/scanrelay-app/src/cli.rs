// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line surface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use scanrelay_core::{OutputKind, RasterIngestPolicy, ScanConfig};

#[derive(Parser, Debug)]
#[command(name = "scanrelay")]
#[command(about = "Receive documents scanned on a paired phone and save them", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Settings file (default: <config dir>/scanrelay/config.json)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log debug detail
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Log errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Save the scan currently on the pasteboard
    Capture {
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Run scan files copied from the phone through the same pipeline
    Import {
        /// PDF or image files, saved as one batch in the order given
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Save every new scan that lands on the pasteboard until Ctrl-C
    Watch {
        /// Pasteboard poll interval in milliseconds
        #[arg(long, default_value = "500")]
        interval_ms: u64,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// List what is on the pasteboard and how scanrelay would read it
    Inspect,

    /// List supported output formats
    Formats,

    /// Show or create the settings file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective settings
    Show,
    /// Write the default settings file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Per-run overrides of the saved settings.
#[derive(Args, Debug, Default, Clone)]
pub struct OutputArgs {
    /// Directory to write files to
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Filename prefix
    #[arg(short, long)]
    pub prefix: Option<String>,

    /// Output format (pdf, png, jpeg, tiff); repeat for several
    #[arg(short = 'f', long = "format", value_name = "FORMAT")]
    pub formats: Vec<OutputKind>,

    /// JPEG quality, 0.0 to 1.0
    #[arg(long)]
    pub quality: Option<f32>,

    /// Resolution scale for rendering PDF pages (at least 1.0)
    #[arg(long)]
    pub scale: Option<f32>,

    /// How several images on one transfer are kept (first-match, distinct, all)
    #[arg(long, value_parser = parse_policy)]
    pub policy: Option<RasterIngestPolicy>,

    /// Open the saved files afterwards
    #[arg(long)]
    pub open: bool,

    /// Write only this format, re-rendering PDF pages at the current scale
    #[arg(long, value_name = "FORMAT")]
    pub convert: Option<OutputKind>,
}

impl OutputArgs {
    /// Layer these flags over `config`. Unset flags leave the setting alone.
    pub fn apply(&self, config: &mut ScanConfig) {
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(prefix) = &self.prefix {
            config.prefix = prefix.clone();
        }
        if !self.formats.is_empty() {
            config.formats = self.formats.clone();
        }
        if let Some(quality) = self.quality {
            config.jpeg_quality = quality;
        }
        if let Some(scale) = self.scale {
            config.resolution_scale = scale;
        }
        if let Some(policy) = self.policy {
            config.raster_policy = policy;
        }
        if self.open {
            config.open_after_save = true;
        }
    }
}

/// Accept the same kebab-case names the settings file uses.
fn parse_policy(value: &str) -> Result<RasterIngestPolicy, String> {
    serde_json::from_value(serde_json::Value::String(value.to_ascii_lowercase()))
        .map_err(|_| format!("unknown policy '{value}' (expected first-match, distinct, or all)"))
}
