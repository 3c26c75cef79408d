// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Output encoding — turn decoded page pixels into PNG, JPEG, or TIFF bytes
// and persist them with an atomic write.

use std::borrow::Cow;
use std::io::Cursor;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, DynamicImage, ImageFormat};
use scanrelay_core::error::{Result, ScanError};
use scanrelay_core::{EncodingOptions, OutputKind, SavedFile};
use tracing::{debug, instrument};

/// Encodes page images into the raster output kinds.
#[derive(Debug, Clone, Copy)]
pub struct OutputEncoder {
    options: EncodingOptions,
}

impl OutputEncoder {
    pub fn new(options: EncodingOptions) -> Self {
        Self { options }
    }

    /// Encode decoded pixels as `kind`.
    #[instrument(skip_all, fields(kind = %kind, width = image.width(), height = image.height()))]
    pub fn encode_image(&self, image: &DynamicImage, kind: OutputKind) -> Result<Vec<u8>> {
        let bytes = match kind {
            OutputKind::Document => {
                return Err(ScanError::Encoding {
                    kind,
                    reason: "documents are composed from whole captures, not single pages".into(),
                });
            }
            OutputKind::LosslessRaster => encode_to_format(&lossless_pixels(image), ImageFormat::Png),
            OutputKind::MultiFrameRaster => encode_to_format(&tiff_pixels(image), ImageFormat::Tiff),
            OutputKind::LossyRaster => {
                let mut buffer = Vec::new();
                let encoder =
                    JpegEncoder::new_with_quality(&mut buffer, self.options.jpeg_quality_percent());
                let result = match image.color() {
                    ColorType::L8 => image.write_with_encoder(encoder),
                    _ => DynamicImage::ImageRgb8(image.to_rgb8()).write_with_encoder(encoder),
                };
                result.map(|()| buffer).map_err(|err| err.to_string())
            }
        }
        .map_err(|reason| ScanError::Encoding { kind, reason })?;

        debug!(bytes = bytes.len(), "page encoded");
        Ok(bytes)
    }

    /// Encode and atomically write to `path`.
    pub fn encode_to_file(
        &self,
        image: &DynamicImage,
        kind: OutputKind,
        path: &Path,
    ) -> Result<SavedFile> {
        let bytes = self.encode_image(image, kind)?;
        write_atomic(path, &bytes)
    }
}

/// Write `bytes` to a temporary sibling of `path`, then rename into place, so
/// a reader never observes a half-written file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<SavedFile> {
    let write_err = |source: std::io::Error| ScanError::Write {
        path: path.to_path_buf(),
        source,
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| write_err(std::io::Error::from(std::io::ErrorKind::InvalidInput)))?;
    let mut temp_name = std::ffi::OsString::from(".");
    temp_name.push(file_name);
    temp_name.push(".partial");
    let temp_path = path.with_file_name(temp_name);

    if let Err(err) = std::fs::write(&temp_path, bytes) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(write_err(err));
    }
    if let Err(err) = std::fs::rename(&temp_path, path) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(write_err(err));
    }

    debug!(path = %path.display(), bytes = bytes.len(), "file written");
    Ok(SavedFile {
        path: path.to_path_buf(),
        bytes: bytes.len() as u64,
    })
}

/// PNG takes 8- and 16-bit gray/RGB(A) directly; float buffers go to RGBA8.
fn lossless_pixels(image: &DynamicImage) -> Cow<'_, DynamicImage> {
    match image.color() {
        ColorType::Rgb32F | ColorType::Rgba32F => {
            Cow::Owned(DynamicImage::ImageRgba8(image.to_rgba8()))
        }
        _ => Cow::Borrowed(image),
    }
}

fn tiff_pixels(image: &DynamicImage) -> Cow<'_, DynamicImage> {
    match image.color() {
        ColorType::L8 | ColorType::Rgb8 | ColorType::Rgba8 => Cow::Borrowed(image),
        _ => Cow::Owned(DynamicImage::ImageRgba8(image.to_rgba8())),
    }
}

/// Encode a `DynamicImage` into bytes for the given format.
fn encode_to_format(
    image: &DynamicImage,
    format: ImageFormat,
) -> std::result::Result<Vec<u8>, String> {
    let mut cursor = Cursor::new(Vec::new());
    image
        .write_to(&mut cursor, format)
        .map_err(|err| format!("failed to encode image as {:?}: {}", format, err))?;
    Ok(cursor.into_inner())
}
