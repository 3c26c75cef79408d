// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scanrelay-document — Capture ingestion and output production for scanrelay.
//
// Reads a transfer into page images (PDF pages rendered through lopdf +
// imageproc, raster payloads sniffed with `image`), picks the best
// representation per page, and encodes pages into the requested formats.
// `ScanSession` ties the pieces into the capture/save/convert lifecycle.

pub mod image;
pub mod ingest;
pub mod naming;
pub mod pdf;
pub mod session;

#[cfg(test)]
pub(crate) mod fixtures;

// Re-export the primary structs so callers can use `scanrelay_document::ScanSession` etc.
pub use crate::image::encode::OutputEncoder;
pub use crate::image::representation::{PageImage, Representation, RepresentationData, select_best};
pub use crate::ingest::{CaptureIngestor, CaptureResult, TransferEntry, describe_transfer};
pub use crate::naming::BatchNames;
pub use crate::pdf::reader::PdfReader;
pub use crate::pdf::render::PageRasterizer;
pub use crate::pdf::writer::PdfWriter;
pub use crate::session::{CaptureSummary, ScanSession, SessionStats};
