// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page rasterization — draw a PDF page's image content onto a bitmap.
//
// Continuity-camera scans are image-only PDFs: every page paints one or more
// image XObjects through `cm`/`Do`. The rasterizer walks the content stream,
// tracks the transformation matrix, decodes each image XObject, and warps it
// onto a white canvas sized from the page's MediaBox and the resolution scale.
// Vector paths and text are not painted; a page that draws only those fails
// to render rather than coming out blank.

use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, RgbImage, Rgba, RgbaImage};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Object, Stream};
use scanrelay_core::error::{Result, ScanError};
use tracing::{debug, instrument, warn};

use super::reader::{PageBounds, PdfReader, as_number};

/// Largest canvas the rasterizer will allocate, in pixels.
pub const MAX_RENDER_PIXELS: u64 = 200_000_000;

/// Nesting limit for form XObjects painting other forms.
const MAX_FORM_DEPTH: usize = 8;

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Content operators that put marks on the page without an image XObject.
const UNPAINTED_OPERATORS: &[&str] = &[
    "Tj", "TJ", "'", "\"", "f", "F", "f*", "S", "s", "B", "B*", "b", "b*", "sh", "BI", "EI",
];

/// What a content walk drew and what it had to leave out.
#[derive(Debug, Default)]
struct PaintTally {
    images: usize,
    unpainted: usize,
}

/// Pixel dimensions a page renders to at `scale`.
pub fn target_dimensions(bounds: &PageBounds, scale: f32) -> (u32, u32) {
    bounds.pixel_size(scale)
}

/// 2-D affine transform in PDF row-vector convention:
/// `x' = a*x + c*y + e`, `y' = b*x + d*y + f`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Affine {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Affine {
    const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    fn from_operands(operands: &[Object]) -> Option<Self> {
        if operands.len() != 6 {
            return None;
        }
        let mut n = [0.0f32; 6];
        for (slot, operand) in n.iter_mut().zip(operands) {
            *slot = as_number(operand)?;
        }
        Some(Self {
            a: n[0],
            b: n[1],
            c: n[2],
            d: n[3],
            e: n[4],
            f: n[5],
        })
    }

    /// Apply `self` first, then `outer`.
    fn then(&self, outer: &Self) -> Self {
        Self {
            a: self.a * outer.a + self.b * outer.c,
            b: self.a * outer.b + self.b * outer.d,
            c: self.c * outer.a + self.d * outer.c,
            d: self.c * outer.b + self.d * outer.d,
            e: self.e * outer.a + self.f * outer.c + outer.e,
            f: self.e * outer.b + self.f * outer.d + outer.f,
        }
    }

    fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Row-major 3x3 matrix for `imageproc::Projection`.
    fn to_matrix(self) -> [f32; 9] {
        [self.a, self.c, self.e, self.b, self.d, self.f, 0.0, 0.0, 1.0]
    }
}

/// Renders pages of a parsed PDF into bitmaps.
pub struct PageRasterizer {
    reader: PdfReader,
}

impl PageRasterizer {
    pub fn new(reader: PdfReader) -> Self {
        Self { reader }
    }

    /// Parse `data` and wrap it for rendering.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Ok(Self::new(PdfReader::from_bytes(data)?))
    }

    pub fn page_count(&self) -> usize {
        self.reader.page_count()
    }

    pub fn page_bounds(&self, index: usize) -> Result<PageBounds> {
        self.reader.page_bounds(index)
    }

    /// Render the page at 0-based `index` at `scale` pixels per point.
    ///
    /// The result is always exactly `target_dimensions(bounds, scale)`.
    #[instrument(skip(self), fields(page = index))]
    pub fn render_page(&self, index: usize, scale: f32) -> Result<DynamicImage> {
        let bounds = self.reader.page_bounds(index)?;
        let (width, height) = target_dimensions(&bounds, scale);
        if u64::from(width) * u64::from(height) > MAX_RENDER_PIXELS {
            return Err(ScanError::PageRender {
                page: index,
                reason: format!("{width}x{height} exceeds the render size limit"),
            });
        }

        let operations = self.reader.page_operations(index)?;
        let resources = self.reader.page_resources(index)?;

        // User space to device pixels: origin at the MediaBox's top-left, y down.
        let device = Affine {
            a: scale,
            b: 0.0,
            c: 0.0,
            d: -scale,
            e: -bounds.x0 * scale,
            f: bounds.top() * scale,
        };

        let mut canvas = RgbaImage::from_pixel(width, height, WHITE);
        let mut tally = PaintTally::default();
        self.paint_operations(&operations, resources, device, &mut canvas, &mut tally, 0)
            .map_err(|reason| ScanError::PageRender {
                page: index,
                reason,
            })?;

        if tally.images == 0 && tally.unpainted > 0 {
            return Err(ScanError::PageRender {
                page: index,
                reason: format!(
                    "unsupported vector content ({} text or path operators, no images)",
                    tally.unpainted
                ),
            });
        }

        debug!(
            width,
            height,
            images = tally.images,
            skipped = tally.unpainted,
            "page rendered"
        );
        Ok(DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).into_rgb8()))
    }

    fn paint_operations(
        &self,
        operations: &[Operation],
        resources: Option<&Dictionary>,
        base: Affine,
        canvas: &mut RgbaImage,
        tally: &mut PaintTally,
        depth: usize,
    ) -> std::result::Result<(), String> {
        let mut ctm = base;
        let mut stack: Vec<Affine> = Vec::new();

        for op in operations {
            match op.operator.as_str() {
                "q" => stack.push(ctm),
                "Q" => {
                    if let Some(saved) = stack.pop() {
                        ctm = saved;
                    }
                }
                "cm" => match Affine::from_operands(&op.operands) {
                    Some(matrix) => ctm = matrix.then(&ctm),
                    None => warn!(operands = op.operands.len(), "ignoring malformed cm"),
                },
                "Do" => {
                    let Some(name) = op.operands.first().and_then(|o| o.as_name().ok()) else {
                        continue;
                    };
                    let Some(stream) = resources.and_then(|r| self.reader.xobject(r, name))
                    else {
                        warn!(name = %String::from_utf8_lossy(name), "XObject not found");
                        continue;
                    };
                    self.paint_xobject(stream, resources, ctm, canvas, tally, depth)?;
                }
                other if UNPAINTED_OPERATORS.contains(&other) => tally.unpainted += 1,
                _ => {}
            }
        }
        Ok(())
    }

    fn paint_xobject(
        &self,
        stream: &Stream,
        parent_resources: Option<&Dictionary>,
        ctm: Affine,
        canvas: &mut RgbaImage,
        tally: &mut PaintTally,
        depth: usize,
    ) -> std::result::Result<(), String> {
        let subtype = stream
            .dict
            .get(b"Subtype")
            .ok()
            .and_then(|o| o.as_name().ok());
        match subtype {
            Some(b"Image") => {
                let image = self.decode_image(stream)?;
                composite(canvas, &image, ctm);
                tally.images += 1;
                Ok(())
            }
            Some(b"Form") => {
                if depth >= MAX_FORM_DEPTH {
                    return Err("form XObjects nested too deeply".into());
                }
                let matrix = stream
                    .dict
                    .get(b"Matrix")
                    .ok()
                    .and_then(|o| self.reader.resolve(o))
                    .and_then(|o| o.as_array().ok())
                    .and_then(|items| Affine::from_operands(items))
                    .unwrap_or(Affine::IDENTITY);
                let resources = stream
                    .dict
                    .get(b"Resources")
                    .ok()
                    .and_then(|o| self.reader.as_dictionary(o))
                    .or(parent_resources);
                let bytes = stream_bytes(stream)?;
                let content = Content::decode(&bytes)
                    .map_err(|err| format!("form content malformed: {err}"))?;
                self.paint_operations(
                    &content.operations,
                    resources,
                    matrix.then(&ctm),
                    canvas,
                    tally,
                    depth + 1,
                )
            }
            _ => Ok(()),
        }
    }

    /// Decode an image XObject into RGBA pixels.
    fn decode_image(&self, stream: &Stream) -> std::result::Result<RgbaImage, String> {
        let dict = &stream.dict;
        if dict
            .get(b"ImageMask")
            .ok()
            .and_then(|o| o.as_bool().ok())
            .unwrap_or(false)
        {
            return Err("stencil image masks are not supported".into());
        }

        let filters = filter_names(dict);
        if filters.last().map(Vec::as_slice) == Some(b"DCTDecode".as_slice()) {
            let encoded = if filters.len() == 1 {
                stream.content.clone()
            } else {
                return Err("chained filters before DCTDecode are not supported".into());
            };
            return image::load_from_memory_with_format(&encoded, ImageFormat::Jpeg)
                .map(|img| img.to_rgba8())
                .map_err(|err| format!("embedded JPEG undecodable: {err}"));
        }

        let width = self.dimension(dict, b"Width")?;
        let height = self.dimension(dict, b"Height")?;
        let bits = self.reader.number(dict, b"BitsPerComponent").unwrap_or(8.0) as u32;
        let components = self.colour_components(dict)?;
        let samples = stream_bytes(stream)?;
        samples_to_rgba(&samples, width, height, components, bits)
    }

    fn dimension(&self, dict: &Dictionary, key: &[u8]) -> std::result::Result<u32, String> {
        match self.reader.number(dict, key) {
            Some(v) if v >= 1.0 => Ok(v as u32),
            _ => Err(format!(
                "image {} missing or invalid",
                String::from_utf8_lossy(key)
            )),
        }
    }

    /// Number of colour components for the image's colour space.
    fn colour_components(&self, dict: &Dictionary) -> std::result::Result<u32, String> {
        let Some(space) = dict
            .get(b"ColorSpace")
            .ok()
            .and_then(|o| self.reader.resolve(o))
        else {
            return Ok(1);
        };
        match space {
            Object::Name(name) => named_components(name),
            Object::Array(items) => {
                let family = items
                    .first()
                    .and_then(|o| o.as_name().ok())
                    .ok_or("colour space array without a family name")?;
                match family {
                    b"ICCBased" => items
                        .get(1)
                        .and_then(|o| self.reader.as_dictionary(o))
                        .and_then(|d| self.reader.number(d, b"N"))
                        .map(|n| n as u32)
                        .ok_or_else(|| "ICC profile without /N".to_string()),
                    b"CalRGB" => Ok(3),
                    b"CalGray" => Ok(1),
                    other => Err(format!(
                        "colour space {} is not supported",
                        String::from_utf8_lossy(other)
                    )),
                }
            }
            _ => Err("unrecognised colour space".into()),
        }
    }
}

fn named_components(name: &[u8]) -> std::result::Result<u32, String> {
    match name {
        b"DeviceGray" | b"CalGray" | b"G" => Ok(1),
        b"DeviceRGB" | b"CalRGB" | b"RGB" => Ok(3),
        b"DeviceCMYK" | b"CMYK" => Ok(4),
        other => Err(format!(
            "colour space {} is not supported",
            String::from_utf8_lossy(other)
        )),
    }
}

/// Filter names on a stream, in application order.
fn filter_names(dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|o| o.as_name().ok().map(<[u8]>::to_vec))
            .collect(),
        _ => Vec::new(),
    }
}

/// Stream payload with Flate filtering undone.
fn stream_bytes(stream: &Stream) -> std::result::Result<Vec<u8>, String> {
    let filters = filter_names(&stream.dict);
    if filters.is_empty() {
        return Ok(stream.content.clone());
    }
    if filters.iter().all(|f| f.as_slice() == b"FlateDecode") {
        return stream
            .decompressed_content()
            .map_err(|err| format!("stream decompression failed: {err}"));
    }
    Err(format!(
        "stream filter {} is not supported",
        filters
            .iter()
            .map(|f| String::from_utf8_lossy(f).into_owned())
            .collect::<Vec<_>>()
            .join(", ")
    ))
}

/// Expand raw image samples into RGBA.
fn samples_to_rgba(
    samples: &[u8],
    width: u32,
    height: u32,
    components: u32,
    bits: u32,
) -> std::result::Result<RgbaImage, String> {
    if u64::from(width) * u64::from(height) > MAX_RENDER_PIXELS {
        return Err(format!("image {width}x{height} exceeds the decode size limit"));
    }
    let (w, h) = (width as usize, height as usize);
    let short = || "image data shorter than declared size".to_string();
    match (components, bits) {
        (1, 1) => {
            let row_bytes = w.div_ceil(8);
            let needed = row_bytes.checked_mul(h).ok_or_else(short)?;
            if samples.len() < needed {
                return Err(short());
            }
            let gray = GrayImage::from_fn(width, height, |x, y| {
                let byte = samples[y as usize * row_bytes + x as usize / 8];
                let bit = (byte >> (7 - (x % 8))) & 1;
                Luma([if bit == 1 { 255 } else { 0 }])
            });
            Ok(DynamicImage::ImageLuma8(gray).to_rgba8())
        }
        (n @ (1 | 3 | 4), 8) => {
            let n = n as usize;
            let needed = w
                .checked_mul(h)
                .and_then(|px| px.checked_mul(n))
                .ok_or_else(short)?;
            if samples.len() < needed {
                return Err(short());
            }
            let data = &samples[..needed];
            let image = match n {
                1 => DynamicImage::ImageLuma8(
                    GrayImage::from_raw(width, height, data.to_vec())
                        .ok_or("gray buffer size mismatch")?,
                ),
                3 => DynamicImage::ImageRgb8(
                    RgbImage::from_raw(width, height, data.to_vec())
                        .ok_or("rgb buffer size mismatch")?,
                ),
                _ => DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
                    let i = (y as usize * w + x as usize) * 4;
                    cmyk_to_rgb(data[i], data[i + 1], data[i + 2], data[i + 3])
                })),
            };
            Ok(image.to_rgba8())
        }
        _ => Err(format!(
            "{components}-component images at {bits} bits are not supported"
        )),
    }
}

fn cmyk_to_rgb(c: u8, m: u8, y: u8, k: u8) -> Rgb<u8> {
    let channel = |v: u8| {
        let v = u16::from(v);
        let k = u16::from(k);
        (((255 - v) * (255 - k)) / 255) as u8
    };
    Rgb([channel(c), channel(m), channel(y)])
}

/// Warp `image` (drawn over the unit square of `ctm`) onto `canvas`.
fn composite(canvas: &mut RgbaImage, image: &RgbaImage, ctm: Affine) {
    let (iw, ih) = (image.width() as f32, image.height() as f32);
    // Image pixel space (y down) to the unit square (y up), then to device.
    let pixel_to_unit = Affine {
        a: 1.0 / iw,
        b: 0.0,
        c: 0.0,
        d: -1.0 / ih,
        e: 0.0,
        f: 1.0,
    };
    let full = pixel_to_unit.then(&ctm);

    let corners = [
        full.apply(0.0, 0.0),
        full.apply(iw, 0.0),
        full.apply(0.0, ih),
        full.apply(iw, ih),
    ];
    let min_x = corners.iter().map(|c| c.0).fold(f32::INFINITY, f32::min).floor().max(0.0);
    let min_y = corners.iter().map(|c| c.1).fold(f32::INFINITY, f32::min).floor().max(0.0);
    let max_x = corners
        .iter()
        .map(|c| c.0)
        .fold(f32::NEG_INFINITY, f32::max)
        .ceil()
        .min(canvas.width() as f32);
    let max_y = corners
        .iter()
        .map(|c| c.1)
        .fold(f32::NEG_INFINITY, f32::max)
        .ceil()
        .min(canvas.height() as f32);
    if !(max_x > min_x && max_y > min_y) {
        return;
    }

    // Warp only into the covered region of the canvas.
    let shifted = full.then(&Affine {
        e: -min_x,
        f: -min_y,
        ..Affine::IDENTITY
    });
    let Some(projection) = Projection::from_matrix(shifted.to_matrix()) else {
        warn!("degenerate image placement skipped");
        return;
    };
    let mut layer = RgbaImage::from_pixel((max_x - min_x) as u32, (max_y - min_y) as u32, CLEAR);
    warp_into(image, &projection, Interpolation::Bilinear, CLEAR, &mut layer);
    image::imageops::overlay(canvas, &layer, min_x as i64, min_y as i64);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{FixturePage, scanned_pdf, solid};

    #[test]
    fn render_size_follows_bounds_and_scale() {
        let bytes = scanned_pdf(vec![
            FixturePage::blank(612.0, 792.0),
            FixturePage::blank(100.5, 50.2),
        ]);
        let rasterizer = PageRasterizer::from_bytes(&bytes).unwrap();

        for scale in [1.0f32, 1.5, 2.0, 4.0] {
            for index in 0..rasterizer.page_count() {
                let bounds = rasterizer.page_bounds(index).unwrap();
                let rendered = rasterizer.render_page(index, scale).unwrap();
                let expected = (
                    (bounds.width * scale).round() as u32,
                    (bounds.height * scale).round() as u32,
                );
                assert_eq!((rendered.width(), rendered.height()), expected);
            }
        }
    }

    #[test]
    fn blank_page_renders_white() {
        let bytes = scanned_pdf(vec![FixturePage::blank(10.0, 10.0)]);
        let rasterizer = PageRasterizer::from_bytes(&bytes).unwrap();
        let rendered = rasterizer.render_page(0, 2.0).unwrap().to_rgb8();
        assert!(rendered.pixels().all(|p| p.0 == [255, 255, 255]));
    }

    #[test]
    fn scanned_image_fills_the_page() {
        let bytes = scanned_pdf(vec![FixturePage::scanned(
            50.0,
            40.0,
            solid(25, 20, [200, 10, 10]),
        )]);
        let rasterizer = PageRasterizer::from_bytes(&bytes).unwrap();
        let rendered = rasterizer.render_page(0, 2.0).unwrap().to_rgb8();
        assert_eq!(rendered.dimensions(), (100, 80));

        let centre = rendered.get_pixel(50, 40).0;
        assert!(centre[0] > 180 && centre[1] < 40, "got {centre:?}");
    }

    #[test]
    fn image_orientation_is_preserved() {
        // Top half black, bottom half white in image space.
        let mut image = solid(8, 8, [255, 255, 255]);
        for y in 0..4 {
            for x in 0..8 {
                image.put_pixel(x, y, Rgb([0, 0, 0]));
            }
        }
        let bytes = scanned_pdf(vec![FixturePage::scanned(80.0, 80.0, image)]);
        let rendered = PageRasterizer::from_bytes(&bytes)
            .unwrap()
            .render_page(0, 1.0)
            .unwrap()
            .to_rgb8();

        assert!(rendered.get_pixel(40, 10).0[0] < 50);
        assert!(rendered.get_pixel(40, 70).0[0] > 200);
    }

    #[test]
    fn flate_compressed_samples_are_decoded() {
        let mut page = FixturePage::scanned(20.0, 20.0, solid(10, 10, [10, 200, 10]));
        page.compress = true;
        let bytes = scanned_pdf(vec![page]);
        let rendered = PageRasterizer::from_bytes(&bytes)
            .unwrap()
            .render_page(0, 1.0)
            .unwrap()
            .to_rgb8();
        let centre = rendered.get_pixel(10, 10).0;
        assert!(centre[1] > 180 && centre[0] < 40, "got {centre:?}");
    }

    #[test]
    fn oversized_render_is_refused() {
        let bytes = scanned_pdf(vec![FixturePage::blank(14400.0, 14400.0)]);
        let rasterizer = PageRasterizer::from_bytes(&bytes).unwrap();
        assert!(matches!(
            rasterizer.render_page(0, 4.0),
            Err(ScanError::PageRender { page: 0, .. })
        ));
    }

    #[test]
    fn matrix_composition_applies_inner_first() {
        let scale = Affine {
            a: 2.0,
            d: 2.0,
            ..Affine::IDENTITY
        };
        let shift = Affine {
            e: 10.0,
            ..Affine::IDENTITY
        };
        assert_eq!(scale.then(&shift).apply(1.0, 1.0), (12.0, 2.0));
        assert_eq!(shift.then(&scale).apply(1.0, 1.0), (22.0, 2.0));
    }

    #[test]
    fn one_bit_gray_expands_to_black_and_white() {
        let rgba = samples_to_rgba(&[0b1000_0000], 2, 1, 1, 1).unwrap();
        assert_eq!(rgba.get_pixel(0, 0).0, [255, 255, 255, 255]);
        assert_eq!(rgba.get_pixel(1, 0).0, [0, 0, 0, 255]);
    }

    #[test]
    fn huge_declared_image_is_rejected() {
        let samples = [0u8; 16];
        assert!(samples_to_rgba(&samples, u32::MAX, u32::MAX, 3, 8).is_err());
        assert!(samples_to_rgba(&samples, 1 << 31, 1 << 31, 4, 8).is_err());
        assert!(samples_to_rgba(&samples, u32::MAX, u32::MAX, 1, 1).is_err());
        assert!(samples_to_rgba(&samples, 20_000, 20_000, 1, 8).is_err());
    }

    #[test]
    fn text_only_page_fails_instead_of_rendering_blank() {
        let text = vec![
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(b"F1".to_vec()), Object::Integer(12)],
            ),
            Operation::new("Tj", vec![Object::string_literal("receipt total")]),
            Operation::new("ET", vec![]),
        ];
        let bytes = scanned_pdf(vec![FixturePage::drawn(100.0, 100.0, text)]);
        let rasterizer = PageRasterizer::from_bytes(&bytes).unwrap();
        match rasterizer.render_page(0, 1.0) {
            Err(ScanError::PageRender { page: 0, reason }) => {
                assert!(reason.contains("unsupported vector content"), "{reason}");
            }
            other => panic!("expected a render failure, got {other:?}"),
        }
    }

    #[test]
    fn scan_with_text_overlay_still_renders() {
        let mut page = FixturePage::scanned(20.0, 20.0, solid(4, 4, [0, 0, 200]));
        page.extra = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tj", vec![Object::string_literal("ocr layer")]),
            Operation::new("ET", vec![]),
        ];
        let bytes = scanned_pdf(vec![page]);
        let rendered = PageRasterizer::from_bytes(&bytes)
            .unwrap()
            .render_page(0, 1.0)
            .unwrap()
            .to_rgb8();
        assert!(rendered.get_pixel(10, 10).0[2] > 150);
    }

    #[test]
    fn short_sample_data_is_rejected() {
        assert!(samples_to_rgba(&[0u8; 5], 2, 2, 3, 8).is_err());
    }
}
