// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for scanrelay.

use std::path::PathBuf;

use thiserror::Error;

use crate::formats::OutputKind;

/// Top-level error type for all scanrelay operations.
#[derive(Debug, Error)]
pub enum ScanError {
    // -- Capture errors --
    #[error("no usable data on the transfer channel")]
    NoDataAvailable,

    #[error("document container could not be parsed: {0}")]
    ContainerParse(String),

    #[error("page {page} could not be rendered: {reason}")]
    PageRender { page: usize, reason: String },

    // -- Output errors --
    #[error("{kind} encoding failed: {reason}")]
    Encoding { kind: OutputKind, reason: String },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // -- Session --
    #[error("nothing has been captured yet")]
    NothingCaptured,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Platform bridge --
    #[error("platform bridge error: {0}")]
    Bridge(String),

    #[error("feature not available on this platform")]
    PlatformUnavailable,
}

impl ScanError {
    /// Whether this error describes a single item inside a batch (one page or
    /// one output file) rather than the whole operation.
    pub fn is_per_item(&self) -> bool {
        matches!(
            self,
            Self::PageRender { .. } | Self::Encoding { .. } | Self::Write { .. }
        )
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ScanError>;
