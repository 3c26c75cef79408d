// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Output format registry — the kinds of artifact a scan can be saved as.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ScanError;

/// Supported output kinds.
///
/// Serialised by file extension (`"pdf"`, `"png"`, `"jpeg"`, `"tiff"`) so the
/// config file and CLI speak the same vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OutputKind {
    /// Multi-page document container, written verbatim from the capture.
    #[serde(rename = "pdf")]
    Document,
    /// Lossless single-frame raster.
    #[serde(rename = "png")]
    LosslessRaster,
    /// Lossy raster; honours the configured quality factor.
    #[serde(rename = "jpeg")]
    LossyRaster,
    /// Raster container able to hold several frames.
    #[serde(rename = "tiff")]
    MultiFrameRaster,
}

impl OutputKind {
    /// Every kind, in the order they are listed to users.
    pub const ALL: [OutputKind; 4] = [
        Self::Document,
        Self::LosslessRaster,
        Self::LossyRaster,
        Self::MultiFrameRaster,
    ];

    /// File extension used for persisted artifacts (without the dot).
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Document => "pdf",
            Self::LosslessRaster => "png",
            Self::LossyRaster => "jpeg",
            Self::MultiFrameRaster => "tiff",
        }
    }

    /// MIME type of the encoded artifact.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Document => "application/pdf",
            Self::LosslessRaster => "image/png",
            Self::LossyRaster => "image/jpeg",
            Self::MultiFrameRaster => "image/tiff",
        }
    }

    /// Raster kinds are written once per page; the document kind once per capture.
    pub fn is_per_page(&self) -> bool {
        !matches!(self, Self::Document)
    }

    /// Whether the quality factor affects encoding.
    pub fn uses_quality(&self) -> bool {
        matches!(self, Self::LossyRaster)
    }

    /// Infer the kind from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Document),
            "png" => Some(Self::LosslessRaster),
            "jpg" | "jpeg" => Some(Self::LossyRaster),
            "tif" | "tiff" => Some(Self::MultiFrameRaster),
            _ => None,
        }
    }

    /// Descriptive entry for the `formats` listing.
    pub fn descriptor(&self) -> FormatDescriptor {
        match self {
            Self::Document => FormatDescriptor {
                kind: *self,
                title: "PDF (Portable Document Format)",
                notes: &[
                    "best for multi-page documents",
                    "saved exactly as received, no re-encoding",
                    "universal compatibility",
                ],
            },
            Self::LosslessRaster => FormatDescriptor {
                kind: *self,
                title: "PNG (Portable Network Graphics)",
                notes: &[
                    "lossless compression",
                    "best for documents with text",
                    "one file per page",
                ],
            },
            Self::LossyRaster => FormatDescriptor {
                kind: *self,
                title: "JPEG (Joint Photographic Experts Group)",
                notes: &[
                    "lossy compression, smallest files",
                    "quality adjustable with --jpeg-quality",
                    "one file per page",
                ],
            },
            Self::MultiFrameRaster => FormatDescriptor {
                kind: *self,
                title: "TIFF (Tagged Image File Format)",
                notes: &[
                    "lossless, archival",
                    "large files",
                    "one file per page",
                ],
            },
        }
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputKind {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s)
            .ok_or_else(|| ScanError::InvalidConfig(format!("unknown output format '{s}'")))
    }
}

/// Human-facing description of an output kind.
#[derive(Debug, Clone, Copy)]
pub struct FormatDescriptor {
    pub kind: OutputKind,
    pub title: &'static str,
    pub notes: &'static [&'static str],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_round_trip_through_from_extension() {
        for kind in OutputKind::ALL {
            assert_eq!(OutputKind::from_extension(kind.extension()), Some(kind));
        }
        assert_eq!(OutputKind::from_extension("JPG"), Some(OutputKind::LossyRaster));
        assert_eq!(OutputKind::from_extension("tif"), Some(OutputKind::MultiFrameRaster));
        assert_eq!(OutputKind::from_extension("gif"), None);
    }

    #[test]
    fn only_lossy_uses_quality() {
        let lossy: Vec<_> = OutputKind::ALL.iter().filter(|k| k.uses_quality()).collect();
        assert_eq!(lossy, vec![&OutputKind::LossyRaster]);
    }

    #[test]
    fn document_is_not_per_page() {
        assert!(!OutputKind::Document.is_per_page());
        assert!(OutputKind::LosslessRaster.is_per_page());
    }

    #[test]
    fn serde_uses_extension_names() {
        let json = serde_json::to_string(&vec![OutputKind::Document, OutputKind::LossyRaster]).unwrap();
        assert_eq!(json, r#"["pdf","jpeg"]"#);
        let parsed: Vec<OutputKind> = serde_json::from_str(r#"["tiff","png"]"#).unwrap();
        assert_eq!(parsed, vec![OutputKind::MultiFrameRaster, OutputKind::LosslessRaster]);
    }

    #[test]
    fn unknown_format_is_config_error() {
        let err = "bmp".parse::<OutputKind>().unwrap_err();
        assert!(matches!(err, ScanError::InvalidConfig(_)));
    }
}
