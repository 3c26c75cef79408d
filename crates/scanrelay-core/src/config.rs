// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan configuration, handed to a session at construction.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, ScanError};
use crate::formats::OutputKind;
use crate::types::{
    DEFAULT_JPEG_QUALITY, DEFAULT_RESOLUTION_SCALE, EncodingOptions, RasterIngestPolicy,
    clamp_quality, clamp_scale,
};

/// Persistent scan settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Directory saved files are written to.
    pub output_dir: PathBuf,
    /// Filename prefix for every saved artifact.
    pub prefix: String,
    /// Formats written by a save.
    pub formats: Vec<OutputKind>,
    /// Lossy quality factor (0.0-1.0).
    pub jpeg_quality: f32,
    /// Resolution scale applied when rendering document pages (>= 1.0).
    pub resolution_scale: f32,
    /// Open written files with the desktop's default viewer after saving.
    pub open_after_save: bool,
    /// How several matching raster payloads on one transfer are accumulated.
    pub raster_policy: RasterIngestPolicy,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            prefix: "scanned_document".into(),
            formats: vec![OutputKind::Document, OutputKind::LosslessRaster],
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            resolution_scale: DEFAULT_RESOLUTION_SCALE,
            open_after_save: false,
            raster_policy: RasterIngestPolicy::default(),
        }
    }
}

impl ScanConfig {
    /// Load a config file written by [`ScanConfig::save`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)?;
        debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Load `path` if it exists, otherwise return the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Persist as pretty-printed JSON, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), "config saved");
        Ok(())
    }

    /// Return a copy with quality and scale clamped and duplicate formats
    /// removed, or an error for settings that cannot be repaired.
    pub fn validated(mut self) -> Result<Self> {
        self.jpeg_quality = clamp_quality(self.jpeg_quality);
        self.resolution_scale = clamp_scale(self.resolution_scale);

        if self.prefix.trim().is_empty() {
            return Err(ScanError::InvalidConfig("filename prefix is empty".into()));
        }
        if self.prefix.contains(['/', '\\']) {
            return Err(ScanError::InvalidConfig(format!(
                "filename prefix '{}' contains a path separator",
                self.prefix
            )));
        }

        let mut seen = Vec::with_capacity(self.formats.len());
        for kind in self.formats.drain(..) {
            if !seen.contains(&kind) {
                seen.push(kind);
            }
        }
        if seen.is_empty() {
            return Err(ScanError::InvalidConfig("no output formats selected".into()));
        }
        self.formats = seen;

        Ok(self)
    }

    /// Encoding options derived from this config.
    pub fn encoding_options(&self) -> EncodingOptions {
        EncodingOptions::new(self.jpeg_quality, self.resolution_scale)
    }

    /// Whether `kind` is among the configured formats.
    pub fn wants(&self, kind: OutputKind) -> bool {
        self.formats.contains(&kind)
    }
}
