// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page representations and best-representation selection.

use std::borrow::Cow;

use image::{DynamicImage, ImageFormat};

/// The pixels (or lack of them) behind a representation.
#[derive(Debug, Clone)]
pub enum RepresentationData {
    /// Decoded pixels, e.g. a rendered PDF page.
    Bitmap(DynamicImage),
    /// An encoded raster payload, decoded on demand.
    Encoded { format: ImageFormat, bytes: Vec<u8> },
    /// A resolution-independent page with no pixels of its own.
    Vector,
}

/// One concrete form of a page.
#[derive(Debug, Clone)]
pub struct Representation {
    width: u32,
    height: u32,
    data: RepresentationData,
}

impl Representation {
    pub fn bitmap(image: DynamicImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            data: RepresentationData::Bitmap(image),
        }
    }

    /// An encoded payload whose pixel size was read from its header.
    pub fn encoded(format: ImageFormat, bytes: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: RepresentationData::Encoded { format, bytes },
        }
    }

    /// A vector page of the given natural size in points.
    pub fn vector(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: RepresentationData::Vector,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &RepresentationData {
        &self.data
    }

    /// Whether this representation carries pixels.
    pub fn is_raster(&self) -> bool {
        !matches!(self.data, RepresentationData::Vector)
    }

    /// Pixel area; saturates rather than overflowing.
    pub fn area(&self) -> u64 {
        u64::from(self.width).saturating_mul(u64::from(self.height))
    }

    /// Pixels of this representation, decoding an encoded payload if needed.
    pub fn decode(&self) -> Result<Cow<'_, DynamicImage>, String> {
        match &self.data {
            RepresentationData::Bitmap(image) => Ok(Cow::Borrowed(image)),
            RepresentationData::Encoded { format, bytes } => {
                image::load_from_memory_with_format(bytes, *format)
                    .map(Cow::Owned)
                    .map_err(|err| format!("{format:?} payload undecodable: {err}"))
            }
            RepresentationData::Vector => Err("vector page has no pixels".into()),
        }
    }
}

/// The raster representation with the largest pixel area.
///
/// Vector representations never win. Ties go to the earliest candidate.
pub fn select_best(representations: &[Representation]) -> Option<&Representation> {
    let mut best: Option<&Representation> = None;
    for candidate in representations.iter().filter(|r| r.is_raster()) {
        match best {
            Some(current) if candidate.area() <= current.area() => {}
            _ => best = Some(candidate),
        }
    }
    best
}

/// One captured page and every form it arrived in.
#[derive(Debug, Clone, Default)]
pub struct PageImage {
    representations: Vec<Representation>,
}

impl PageImage {
    pub fn new(representations: Vec<Representation>) -> Self {
        Self { representations }
    }

    pub fn push(&mut self, representation: Representation) {
        self.representations.push(representation);
    }

    pub fn representations(&self) -> &[Representation] {
        &self.representations
    }

    /// Best representation, recomputed from the current set.
    pub fn best(&self) -> Option<&Representation> {
        select_best(&self.representations)
    }

    /// Pixel size of the best representation.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.best().map(|rep| (rep.width(), rep.height()))
    }

    /// Natural size of the page when it is known only as a vector.
    pub fn vector_size(&self) -> Option<(u32, u32)> {
        self.representations
            .iter()
            .find(|rep| !rep.is_raster())
            .map(|rep| (rep.width(), rep.height()))
    }
}
