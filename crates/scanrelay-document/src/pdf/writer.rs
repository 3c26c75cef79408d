// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer — compose a multi-page PDF from page images using `printpdf` 0.8.
//
// printpdf 0.8 uses a data-oriented API: documents are built by constructing
// `PdfPage` structs containing `Vec<Op>` operation lists, then serialised via
// `PdfDocument::save()`.

use image::DynamicImage;
use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, RawImage, RawImageData,
    RawImageFormat, XObjectTransform,
};
use scanrelay_core::OutputKind;
use scanrelay_core::error::{Result, ScanError};
use tracing::{debug, info, instrument};

/// Points per inch in PDF user space.
const POINTS_PER_INCH: f32 = 72.0;
const MM_PER_INCH: f32 = 25.4;

/// Creates PDF documents with one full-bleed image per page.
pub struct PdfWriter {
    /// Pixel density used to size pages from image dimensions.
    dpi: f32,
}

/// Title embedded in the PDF /Info dictionary.
const DOCUMENT_TITLE: &str = "Scanned Document";

impl PdfWriter {
    /// Writer sizing each page so one image pixel covers `1/dpi` inch.
    pub fn new(dpi: f32) -> Self {
        Self {
            dpi: if dpi.is_finite() && dpi > 0.0 { dpi } else { POINTS_PER_INCH },
        }
    }

    /// Writer matching pages rendered at `scale` pixels per point, so a page
    /// rendered and re-composed keeps its original physical size.
    pub fn for_render_scale(scale: f32) -> Self {
        Self::new(scale * POINTS_PER_INCH)
    }

    pub fn dpi(&self) -> f32 {
        self.dpi
    }

    /// Page size in millimetres for an image of `width` x `height` pixels.
    pub fn page_size_mm(&self, width: u32, height: u32) -> (f32, f32) {
        (
            width as f32 / self.dpi * MM_PER_INCH,
            height as f32 / self.dpi * MM_PER_INCH,
        )
    }

    /// Compose a PDF with one page per image, in order.
    #[instrument(skip_all, fields(pages = images.len()))]
    pub fn compose(&self, images: &[DynamicImage]) -> Result<Vec<u8>> {
        if images.is_empty() {
            return Err(ScanError::Encoding {
                kind: OutputKind::Document,
                reason: "no pages to compose".into(),
            });
        }

        info!(dpi = self.dpi, "Composing PDF");

        let mut doc = PdfDocument::new(DOCUMENT_TITLE);
        let mut pages: Vec<PdfPage> = Vec::with_capacity(images.len());

        for image in images {
            let rgb_image = image.to_rgb8();
            let (width, height) = rgb_image.dimensions();
            let raw = RawImage {
                pixels: RawImageData::U8(rgb_image.into_raw()),
                width: width as usize,
                height: height as usize,
                data_format: RawImageFormat::RGB8,
                tag: Vec::new(),
            };
            let xobject_id = doc.add_image(&raw);

            // At the writer's dpi the image's natural size is the page size.
            let ops = vec![Op::UseXobject {
                id: xobject_id,
                transform: XObjectTransform {
                    translate_x: Some(Pt(0.0)),
                    translate_y: Some(Pt(0.0)),
                    scale_x: Some(1.0),
                    scale_y: Some(1.0),
                    dpi: Some(self.dpi),
                    rotate: None,
                },
            }];

            let (w_mm, h_mm) = self.page_size_mm(width, height);
            pages.push(PdfPage::new(Mm(w_mm), Mm(h_mm), ops));
        }

        doc.with_pages(pages);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let output = doc.save(&PdfSaveOptions::default(), &mut warnings);

        debug!(
            output_bytes = output.len(),
            warnings = warnings.len(),
            "PDF composed"
        );
        Ok(output)
    }
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new(150.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::solid;
    use crate::pdf::reader::PdfReader;

    #[test]
    fn composes_one_page_per_image() {
        let images = vec![
            DynamicImage::ImageRgb8(solid(144, 72, [255, 0, 0])),
            DynamicImage::ImageRgb8(solid(72, 144, [0, 0, 255])),
        ];
        let bytes = PdfWriter::new(72.0).compose(&images).unwrap();
        assert!(bytes.starts_with(b"%PDF"));

        let reader = PdfReader::from_bytes(&bytes).unwrap();
        assert_eq!(reader.page_count(), 2);
        let first = reader.page_bounds(0).unwrap();
        assert!((first.width - 144.0).abs() < 1.0, "width {}", first.width);
        assert!((first.height - 72.0).abs() < 1.0, "height {}", first.height);
    }

    #[test]
    fn render_scale_maps_back_to_points() {
        let writer = PdfWriter::for_render_scale(4.0);
        assert_eq!(writer.dpi(), 288.0);
        let (w, h) = writer.page_size_mm(2448, 3168);
        // US Letter: 215.9 x 279.4 mm
        assert!((w - 215.9).abs() < 0.1);
        assert!((h - 279.4).abs() < 0.1);
    }

    #[test]
    fn empty_input_is_an_encoding_error() {
        assert!(matches!(
            PdfWriter::default().compose(&[]),
            Err(ScanError::Encoding { kind: OutputKind::Document, .. })
        ));
    }
}
