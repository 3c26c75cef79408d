// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — parsing captured documents, rasterizing their pages, and
// composing new documents from page images.

pub mod reader;
pub mod render;
pub mod writer;

pub use reader::{PageBounds, PdfReader};
pub use render::PageRasterizer;
pub use writer::PdfWriter;
