// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Synthetic captures for unit tests: scanner-style PDFs built with lopdf and
// small encoded rasters.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream, dictionary};

/// One page of a fixture PDF.
pub struct FixturePage {
    pub width: f32,
    pub height: f32,
    /// Image painted over the whole MediaBox, if any.
    pub image: Option<RgbImage>,
    /// Flate-compress the image samples.
    pub compress: bool,
    /// Content appended after the image, e.g. text or path operators.
    pub extra: Vec<Operation>,
}

impl FixturePage {
    pub fn blank(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            image: None,
            compress: false,
            extra: Vec::new(),
        }
    }

    /// Page drawing only `operations`, with no image.
    pub fn drawn(width: f32, height: f32, operations: Vec<Operation>) -> Self {
        Self {
            extra: operations,
            ..Self::blank(width, height)
        }
    }

    pub fn scanned(width: f32, height: f32, image: RgbImage) -> Self {
        Self {
            width,
            height,
            image: Some(image),
            compress: false,
            extra: Vec::new(),
        }
    }
}

/// Solid-colour RGB image.
pub fn solid(width: u32, height: u32, colour: [u8; 3]) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb(colour))
}

/// Build a PDF whose pages each paint one image XObject across the MediaBox,
/// the way phone scanners lay out their output.
pub fn scanned_pdf(pages: Vec<FixturePage>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::new();

    for page in pages {
        let mut resources = Dictionary::new();
        let mut operations = Vec::new();

        if let Some(image) = page.image {
            let mut stream = Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => i64::from(image.width()),
                    "Height" => i64::from(image.height()),
                    "ColorSpace" => "DeviceRGB",
                    "BitsPerComponent" => 8i64,
                },
                image.into_raw(),
            );
            if page.compress {
                stream.compress().unwrap();
            }
            let image_id = doc.add_object(stream);
            resources.set("XObject", dictionary! { "Im0" => image_id });
            operations = vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        Object::Real(page.width.into()),
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Real(page.height.into()),
                        Object::Integer(0),
                        Object::Integer(0),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                Operation::new("Q", vec![]),
            ];
        }

        operations.extend(page.extra);
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(page.width.into()),
                Object::Real(page.height.into()),
            ],
            "Contents" => content_id,
            "Resources" => resources,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

/// Encode an RGB image in the given container format.
pub fn encoded(image: &RgbImage, format: ImageFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image.clone())
        .write_to(&mut out, format)
        .unwrap();
    out.into_inner()
}
