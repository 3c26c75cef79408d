// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader — parse captured documents and expose what page rendering needs
// (page geometry, resources, and content operators) using the `lopdf` crate.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use scanrelay_core::error::{Result, ScanError};
use tracing::{debug, instrument};

/// US Letter, the MediaBox PDF viewers assume when a page declares none.
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Guard against cyclic /Parent chains in malformed page trees.
const MAX_INHERITANCE_DEPTH: usize = 32;

/// A page's MediaBox in PDF user-space points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBounds {
    pub x0: f32,
    pub y0: f32,
    pub width: f32,
    pub height: f32,
}

impl PageBounds {
    /// Build from the four MediaBox numbers, normalising inverted corners.
    pub fn from_corners(llx: f32, lly: f32, urx: f32, ury: f32) -> Self {
        Self {
            x0: llx.min(urx),
            y0: lly.min(ury),
            width: (urx - llx).abs(),
            height: (ury - lly).abs(),
        }
    }

    /// Top edge in user space.
    pub fn top(&self) -> f32 {
        self.y0 + self.height
    }

    /// Pixel dimensions at `scale`: each side is the rounded scaled size,
    /// never less than one pixel.
    pub fn pixel_size(&self, scale: f32) -> (u32, u32) {
        let to_px = |v: f32| ((v * scale).round() as u32).max(1);
        (to_px(self.width), to_px(self.height))
    }

    /// Natural size rounded to whole points.
    pub fn point_size(&self) -> (u32, u32) {
        self.pixel_size(1.0)
    }
}

/// Reads a parsed PDF document.
///
/// Wraps `lopdf::Document` and resolves the page-tree details (inherited
/// attributes, indirect references, filtered content streams) that a
/// renderer would otherwise have to repeat.
pub struct PdfReader {
    /// The underlying lopdf document.
    document: Document,
    /// Page object ids in page order.
    page_ids: Vec<ObjectId>,
}

impl PdfReader {
    // -- Construction ---------------------------------------------------------

    /// Create a reader from raw PDF bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|err| {
            ScanError::ContainerParse(format!("failed to load PDF from memory: {}", err))
        })?;
        Ok(Self::from_document(document))
    }

    fn from_document(document: Document) -> Self {
        // lopdf keys pages by 1-indexed page number in a BTreeMap, so values
        // come back in page order.
        let page_ids: Vec<ObjectId> = document.get_pages().into_values().collect();
        debug!(pages = page_ids.len(), "PDF loaded");
        Self { document, page_ids }
    }

    // -- Inspection -----------------------------------------------------------

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Object id of the page at 0-based `index`.
    pub fn page_id(&self, index: usize) -> Result<ObjectId> {
        self.page_ids
            .get(index)
            .copied()
            .ok_or_else(|| ScanError::PageRender {
                page: index,
                reason: format!(
                    "page out of range (document has {} pages)",
                    self.page_ids.len()
                ),
            })
    }

    /// MediaBox of the page at `index`, following /Parent inheritance.
    pub fn page_bounds(&self, index: usize) -> Result<PageBounds> {
        let page = self.page_dictionary(index)?;
        let [llx, lly, urx, ury] = match self.inherited(page, b"MediaBox") {
            Some(object) => self.read_rect(object).ok_or_else(|| ScanError::PageRender {
                page: index,
                reason: "MediaBox is not a four-number array".into(),
            })?,
            None => DEFAULT_MEDIA_BOX,
        };
        let bounds = PageBounds::from_corners(llx, lly, urx, ury);
        if bounds.width <= 0.0 || bounds.height <= 0.0 {
            return Err(ScanError::PageRender {
                page: index,
                reason: "MediaBox has zero area".into(),
            });
        }
        Ok(bounds)
    }

    /// Resource dictionary of the page at `index`, following /Parent inheritance.
    pub fn page_resources(&self, index: usize) -> Result<Option<&Dictionary>> {
        let page = self.page_dictionary(index)?;
        Ok(self
            .inherited(page, b"Resources")
            .and_then(|object| self.as_dictionary(object)))
    }

    /// Decoded content operators of the page at `index`.
    pub fn page_operations(&self, index: usize) -> Result<Vec<Operation>> {
        let page_id = self.page_id(index)?;
        let bytes = self
            .document
            .get_page_content(page_id)
            .map_err(|err| ScanError::PageRender {
                page: index,
                reason: format!("content stream unreadable: {}", err),
            })?;
        let content = Content::decode(&bytes).map_err(|err| ScanError::PageRender {
            page: index,
            reason: format!("content stream malformed: {}", err),
        })?;
        Ok(content.operations)
    }

    // -- Object helpers -------------------------------------------------------

    /// Follow indirect references until a direct object is reached.
    pub fn resolve<'a>(&'a self, object: &'a Object) -> Option<&'a Object> {
        let mut current = object;
        for _ in 0..MAX_INHERITANCE_DEPTH {
            match current {
                Object::Reference(id) => current = self.document.get_object(*id).ok()?,
                other => return Some(other),
            }
        }
        None
    }

    /// Resolve to a dictionary, accepting a stream's dictionary too.
    pub fn as_dictionary<'a>(&'a self, object: &'a Object) -> Option<&'a Dictionary> {
        match self.resolve(object)? {
            Object::Dictionary(dict) => Some(dict),
            Object::Stream(stream) => Some(&stream.dict),
            _ => None,
        }
    }

    /// Look up `key` in `dict` and resolve it to a number.
    pub fn number(&self, dict: &Dictionary, key: &[u8]) -> Option<f32> {
        dict.get(key)
            .ok()
            .and_then(|object| self.resolve(object))
            .and_then(as_number)
    }

    /// Look up an XObject stream by resource name.
    pub fn xobject<'a>(&'a self, resources: &'a Dictionary, name: &[u8]) -> Option<&'a Stream> {
        let xobjects = resources
            .get(b"XObject")
            .ok()
            .and_then(|object| self.as_dictionary(object))?;
        match self.resolve(xobjects.get(name).ok()?)? {
            Object::Stream(stream) => Some(stream),
            _ => None,
        }
    }

    fn page_dictionary(&self, index: usize) -> Result<&Dictionary> {
        let page_id = self.page_id(index)?;
        self.document
            .get_dictionary(page_id)
            .map_err(|err| ScanError::PageRender {
                page: index,
                reason: format!("page object unreadable: {}", err),
            })
    }

    /// Walk from a page up its /Parent chain looking for an inheritable key.
    fn inherited<'a>(&'a self, page: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
        let mut node = page;
        for _ in 0..MAX_INHERITANCE_DEPTH {
            if let Ok(value) = node.get(key) {
                return Some(value);
            }
            node = node
                .get(b"Parent")
                .ok()
                .and_then(|parent| self.as_dictionary(parent))?;
        }
        None
    }

    fn read_rect(&self, object: &Object) -> Option<[f32; 4]> {
        let Object::Array(items) = self.resolve(object)? else {
            return None;
        };
        if items.len() != 4 {
            return None;
        }
        let mut rect = [0.0f32; 4];
        for (slot, item) in rect.iter_mut().zip(items) {
            *slot = as_number(self.resolve(item)?)?;
        }
        Some(rect)
    }
}

/// Integer or real PDF number as `f32`.
pub fn as_number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value as f32),
        _ => None,
    }
}
