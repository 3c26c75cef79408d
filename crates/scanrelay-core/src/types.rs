// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the scanrelay capture pipeline.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::formats::OutputKind;

/// Default lossy quality factor.
pub const DEFAULT_JPEG_QUALITY: f32 = 0.95;
/// Default resolution scale for document rendering.
pub const DEFAULT_RESOLUTION_SCALE: f32 = 4.0;

/// Unique identifier for a scan session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle states of a scan session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// No capture held; save and convert have nothing to do.
    Idle,
    /// Reading an inbound transfer.
    Capturing,
    /// A non-empty capture is held.
    Captured,
    /// Writing the configured formats.
    Saving,
    /// Re-rendering or re-encoding into a single requested format.
    Converting,
}

/// Abstract content carried by a transfer type identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentKind {
    /// Multi-page document container (PDF).
    DocumentContainer,
    /// Raster container that may hold several frames (TIFF).
    MultiFrameRaster,
    /// Lossless single-frame raster (PNG).
    LosslessRaster,
    /// Lossy raster (JPEG).
    LossyRaster,
    /// Any image the decoder can sniff.
    GenericImage,
}

impl ContentKind {
    /// Short label used in transfer descriptions.
    pub fn label(&self) -> &'static str {
        match self {
            Self::DocumentContainer => "document (multi-page)",
            Self::MultiFrameRaster => "raster (multi-frame)",
            Self::LosslessRaster => "raster (lossless)",
            Self::LossyRaster => "raster (lossy)",
            Self::GenericImage => "image (generic)",
        }
    }
}

/// How raster payloads are accumulated when several raster type identifiers
/// are present on the same transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RasterIngestPolicy {
    /// Stop at the first payload that decodes.
    FirstMatch,
    /// Keep every decodable payload, dropping byte-identical duplicates.
    #[default]
    Distinct,
    /// Keep every decodable payload, duplicates included.
    All,
}

/// Quality and scale parameters for rendering and encoding.
///
/// Construct with [`EncodingOptions::new`]; both values are clamped on the way
/// in so downstream code never sees an out-of-range factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EncodingOptions {
    quality: f32,
    scale: f32,
}

impl EncodingOptions {
    pub fn new(quality: f32, scale: f32) -> Self {
        Self {
            quality: clamp_quality(quality),
            scale: clamp_scale(scale),
        }
    }

    /// Quality factor in `[0.0, 1.0]`.
    pub fn quality(&self) -> f32 {
        self.quality
    }

    /// Resolution scale, always `>= 1.0`.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Quality expressed as a JPEG encoder percentage (1-100).
    pub fn jpeg_quality_percent(&self) -> u8 {
        (self.quality * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

impl Default for EncodingOptions {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY, DEFAULT_RESOLUTION_SCALE)
    }
}

/// Clamp a lossy quality factor into `[0.0, 1.0]`; NaN falls back to the default.
pub fn clamp_quality(value: f32) -> f32 {
    if value.is_nan() {
        DEFAULT_JPEG_QUALITY
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Clamp a resolution scale to `>= 1.0`; non-finite values fall back to the default.
pub fn clamp_scale(value: f32) -> f32 {
    if value.is_finite() {
        value.max(1.0)
    } else {
        DEFAULT_RESOLUTION_SCALE
    }
}

/// One file persisted by a save or convert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedFile {
    pub path: PathBuf,
    pub bytes: u64,
}

/// Where inside a batch an item failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    /// The page had no raster form, or rendering it failed.
    Render,
    /// Bytes could not be produced for the requested kind.
    Encode,
    /// Bytes were produced but could not be persisted.
    Write,
}

/// A single (page, kind) item that failed inside a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchFailure {
    /// 1-based page number, or `None` for the whole-document artifact.
    pub page: Option<usize>,
    pub kind: OutputKind,
    pub stage: FailureStage,
    pub reason: String,
}

/// Outcome of a save or convert invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveReport {
    pub files_written: Vec<SavedFile>,
    pub pages_attempted: usize,
    pub pages_failed: usize,
    pub failures: Vec<BatchFailure>,
}

impl SaveReport {
    /// Paths of every file written, in write order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files_written.iter().map(|f| f.path.clone()).collect()
    }

    /// Total bytes written.
    pub fn total_bytes(&self) -> u64 {
        self.files_written.iter().map(|f| f.bytes).sum()
    }
}
