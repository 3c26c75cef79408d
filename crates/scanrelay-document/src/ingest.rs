// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capture ingestion — read whatever a paired device dropped on the transfer
// channel and normalise it into page images.
//
// A document container always wins over raster payloads. Its pages are
// rendered at the configured scale. Without a container, every raster type
// identifier present is tried; how many survive depends on the
// `RasterIngestPolicy`.

use std::collections::HashSet;
use std::io::Cursor;

use image::{ImageFormat, ImageReader};
use scanrelay_bridge::TransferSource;
use scanrelay_core::error::{Result, ScanError};
use scanrelay_core::{ContentKind, EncodingOptions, RasterIngestPolicy, ScanConfig};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use crate::image::representation::{PageImage, Representation};
use crate::pdf::render::PageRasterizer;

/// Type identifiers recognised for each content kind, in preference order.
/// Legacy pasteboard names sit beside the uniform type identifiers.
pub const CONTENT_TABLE: &[(ContentKind, &[&str])] = &[
    (
        ContentKind::DocumentContainer,
        &["com.adobe.pdf", "Apple PDF pasteboard type", "public.pdf"],
    ),
    (
        ContentKind::MultiFrameRaster,
        &["public.tiff", "NeXT TIFF v4.0 pasteboard type"],
    ),
    (
        ContentKind::LosslessRaster,
        &["public.png", "Apple PNG pasteboard type"],
    ),
    (ContentKind::LossyRaster, &["public.jpeg"]),
    (ContentKind::GenericImage, &["public.image"]),
];

/// Content kind a type identifier stands for, if it is one we read.
pub fn classify(type_id: &str) -> Option<ContentKind> {
    CONTENT_TABLE
        .iter()
        .find(|(_, aliases)| aliases.contains(&type_id))
        .map(|(kind, _)| *kind)
}

/// Container format implied by a raster content kind, used when the payload
/// cannot be sniffed.
fn declared_format(kind: ContentKind) -> Option<ImageFormat> {
    match kind {
        ContentKind::MultiFrameRaster => Some(ImageFormat::Tiff),
        ContentKind::LosslessRaster => Some(ImageFormat::Png),
        ContentKind::LossyRaster => Some(ImageFormat::Jpeg),
        ContentKind::DocumentContainer | ContentKind::GenericImage => None,
    }
}

/// Everything obtained from one capture.
#[derive(Debug, Clone, Default)]
pub struct CaptureResult {
    /// Original container bytes, kept verbatim even when they fail to parse.
    pub document: Option<Vec<u8>>,
    /// Type identifier the payload was read from.
    pub source_type: Option<String>,
    /// Page count of a successfully parsed container.
    pub page_count: Option<usize>,
    /// Pages in order.
    pub pages: Vec<PageImage>,
}

impl CaptureResult {
    pub fn is_empty(&self) -> bool {
        self.document.is_none() && self.pages.is_empty()
    }

    /// Whether a container is held and parsed into pages.
    pub fn document_parsed(&self) -> bool {
        self.document.is_some() && self.page_count.is_some()
    }
}

/// One row of a transfer description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferEntry {
    pub type_id: String,
    /// Payload size, or `None` when the bytes could not be read.
    pub bytes: Option<usize>,
    /// Recognised content kind, or `None` for types scanrelay ignores.
    pub content: Option<ContentKind>,
}

/// List every type on the transfer with its size and classification.
pub fn describe_transfer(source: &dyn TransferSource) -> Result<Vec<TransferEntry>> {
    let types = source.available_types()?;
    Ok(types
        .into_iter()
        .map(|type_id| {
            let bytes = match source.bytes_for_type(&type_id) {
                Ok(data) => data.map(|d| d.len()),
                Err(err) => {
                    warn!(type_id = %type_id, %err, "could not read transfer entry");
                    None
                }
            };
            let content = classify(&type_id);
            TransferEntry {
                type_id,
                bytes,
                content,
            }
        })
        .collect())
}

/// Turns a transfer into a [`CaptureResult`].
#[derive(Debug, Clone, Copy)]
pub struct CaptureIngestor {
    options: EncodingOptions,
    policy: RasterIngestPolicy,
}

impl CaptureIngestor {
    pub fn new(options: EncodingOptions, policy: RasterIngestPolicy) -> Self {
        Self { options, policy }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(config.encoding_options(), config.raster_policy)
    }

    /// Read the transfer. Fails with `NoDataAvailable` when nothing usable is
    /// present; unreadable or undecodable entries are skipped.
    #[instrument(skip_all, fields(policy = ?self.policy))]
    pub fn ingest(&self, source: &dyn TransferSource) -> Result<CaptureResult> {
        let types = source.available_types()?;
        debug!(?types, "transfer offers types");

        if let Some(capture) = self.ingest_document(source, &types) {
            return Ok(capture);
        }

        let pages = self.ingest_rasters(source, &types);
        if pages.is_empty() {
            return Err(ScanError::NoDataAvailable);
        }
        info!(pages = pages.len(), "raster capture ingested");
        Ok(CaptureResult {
            document: None,
            source_type: None,
            page_count: None,
            pages,
        })
    }

    /// Merge several transfers into one capture, pages in source order.
    ///
    /// A single source is ingested as-is, container included. With several,
    /// only pages are merged; a source with nothing usable is skipped.
    pub fn ingest_merged(&self, sources: &[&dyn TransferSource]) -> Result<CaptureResult> {
        if let [single] = sources {
            return self.ingest(*single);
        }

        let mut pages = Vec::new();
        for (index, source) in sources.iter().enumerate() {
            match self.ingest(*source) {
                Ok(capture) => {
                    if capture.pages.is_empty() {
                        warn!(source = index + 1, "document has no readable pages; skipped");
                    }
                    pages.extend(capture.pages);
                }
                Err(ScanError::NoDataAvailable) => {
                    warn!(source = index + 1, "nothing usable; skipped");
                }
                Err(err) => return Err(err),
            }
        }

        if pages.is_empty() {
            return Err(ScanError::NoDataAvailable);
        }
        info!(sources = sources.len(), pages = pages.len(), "merged capture ingested");
        Ok(CaptureResult {
            pages,
            ..CaptureResult::default()
        })
    }

    /// Build a capture from container bytes. Parse failures keep the bytes
    /// with no pages; page render failures keep the page's vector form.
    pub fn document_capture(&self, bytes: Vec<u8>, source_type: Option<String>) -> CaptureResult {
        let mut capture = CaptureResult {
            document: None,
            source_type,
            page_count: None,
            pages: Vec::new(),
        };

        match PageRasterizer::from_bytes(&bytes) {
            Ok(rasterizer) if rasterizer.page_count() > 0 => {
                let count = rasterizer.page_count();
                capture.pages = (0..count)
                    .map(|index| self.document_page(&rasterizer, index))
                    .collect();
                capture.page_count = Some(count);
                info!(pages = count, scale = self.options.scale(), "document capture ingested");
            }
            Ok(_) => warn!("document has no pages; keeping original bytes"),
            Err(err) => warn!(%err, "document could not be parsed; keeping original bytes"),
        }

        capture.document = Some(bytes);
        capture
    }

    fn ingest_document(
        &self,
        source: &dyn TransferSource,
        types: &[String],
    ) -> Option<CaptureResult> {
        let aliases = aliases_for(ContentKind::DocumentContainer);
        for alias in aliases.iter().filter(|a| offered(types, a)) {
            if let Some(bytes) = fetch(source, alias) {
                debug!(type_id = alias, bytes = bytes.len(), "document container found");
                return Some(self.document_capture(bytes, Some((*alias).to_string())));
            }
        }
        None
    }

    fn document_page(&self, rasterizer: &PageRasterizer, index: usize) -> PageImage {
        let mut page = PageImage::default();
        match rasterizer.page_bounds(index) {
            Ok(bounds) => {
                let (width, height) = bounds.point_size();
                page.push(Representation::vector(width, height));
            }
            Err(err) => warn!(page = index + 1, %err, "page bounds unreadable"),
        }
        match rasterizer.render_page(index, self.options.scale()) {
            Ok(image) => page.push(Representation::bitmap(image)),
            Err(err) => warn!(page = index + 1, %err, "page render failed; keeping vector form"),
        }
        page
    }

    fn ingest_rasters(&self, source: &dyn TransferSource, types: &[String]) -> Vec<PageImage> {
        let mut pages = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for (kind, aliases) in CONTENT_TABLE
            .iter()
            .filter(|(kind, _)| *kind != ContentKind::DocumentContainer)
        {
            for alias in aliases.iter().filter(|a| offered(types, a)) {
                let Some(bytes) = fetch(source, alias) else {
                    continue;
                };
                let digest = fingerprint(&bytes);
                if self.policy == RasterIngestPolicy::Distinct && seen.contains(&digest) {
                    debug!(type_id = alias, "duplicate raster payload dropped");
                    continue;
                }
                match sniff_raster(*kind, bytes) {
                    Ok(representation) => {
                        debug!(
                            type_id = alias,
                            width = representation.width(),
                            height = representation.height(),
                            "raster payload accepted"
                        );
                        seen.insert(digest);
                        pages.push(PageImage::new(vec![representation]));
                        if self.policy == RasterIngestPolicy::FirstMatch {
                            return pages;
                        }
                    }
                    Err(reason) => warn!(type_id = alias, %reason, "raster payload skipped"),
                }
            }
        }
        pages
    }
}

fn aliases_for(kind: ContentKind) -> &'static [&'static str] {
    CONTENT_TABLE
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, aliases)| *aliases)
        .unwrap_or(&[])
}

fn offered(types: &[String], alias: &str) -> bool {
    types.iter().any(|t| t == alias)
}

/// Non-empty bytes for `type_id`; read errors are logged and skipped.
fn fetch(source: &dyn TransferSource, type_id: &str) -> Option<Vec<u8>> {
    match source.bytes_for_type(type_id) {
        Ok(Some(bytes)) if !bytes.is_empty() => Some(bytes),
        Ok(_) => {
            debug!(type_id, "transfer entry empty");
            None
        }
        Err(err) => {
            warn!(type_id, %err, "transfer entry unreadable");
            None
        }
    }
}

fn fingerprint(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Read a raster payload's header to learn its format and pixel size. The
/// pixels themselves are decoded only when the page is encoded.
fn sniff_raster(kind: ContentKind, bytes: Vec<u8>) -> std::result::Result<Representation, String> {
    let format = image::guess_format(&bytes)
        .ok()
        .or_else(|| declared_format(kind))
        .ok_or("unrecognised raster format")?;
    let (width, height) = ImageReader::with_format(Cursor::new(bytes.as_slice()), format)
        .into_dimensions()
        .map_err(|err| format!("{format:?} header unreadable: {err}"))?;
    if width == 0 || height == 0 {
        return Err("raster has no pixels".into());
    }
    Ok(Representation::encoded(format, bytes, width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{FixturePage, encoded, scanned_pdf, solid};
    use crate::image::representation::RepresentationData;
    use scanrelay_bridge::MemoryTransfer;
    use std::cell::RefCell;

    fn ingestor(policy: RasterIngestPolicy) -> CaptureIngestor {
        CaptureIngestor::new(EncodingOptions::new(0.95, 1.0), policy)
    }

    fn png(colour: [u8; 3]) -> Vec<u8> {
        encoded(&solid(6, 4, colour), ImageFormat::Png)
    }

    fn jpeg() -> Vec<u8> {
        encoded(&solid(12, 8, [90, 90, 90]), ImageFormat::Jpeg)
    }

    /// Transfer whose reads fail for one type identifier.
    struct FlakyTransfer {
        inner: MemoryTransfer,
        failing: &'static str,
    }

    impl TransferSource for FlakyTransfer {
        fn available_types(&self) -> Result<Vec<String>> {
            self.inner.available_types()
        }

        fn bytes_for_type(&self, type_id: &str) -> Result<Option<Vec<u8>>> {
            if type_id == self.failing {
                return Err(ScanError::Bridge("read interrupted".into()));
            }
            self.inner.bytes_for_type(type_id)
        }
    }

    /// Transfer that remembers every type identifier it was asked for.
    struct CountingTransfer {
        inner: MemoryTransfer,
        fetched: RefCell<Vec<String>>,
    }

    impl TransferSource for CountingTransfer {
        fn available_types(&self) -> Result<Vec<String>> {
            self.inner.available_types()
        }

        fn bytes_for_type(&self, type_id: &str) -> Result<Option<Vec<u8>>> {
            self.fetched.borrow_mut().push(type_id.to_string());
            self.inner.bytes_for_type(type_id)
        }
    }

    #[test]
    fn empty_transfer_has_no_data() {
        let err = ingestor(RasterIngestPolicy::Distinct)
            .ingest(&MemoryTransfer::new())
            .unwrap_err();
        assert!(matches!(err, ScanError::NoDataAvailable));
    }

    #[test]
    fn unrecognised_types_have_no_data() {
        let transfer = MemoryTransfer::new().with("public.utf8-plain-text", b"hello".to_vec());
        assert!(matches!(
            ingestor(RasterIngestPolicy::All).ingest(&transfer),
            Err(ScanError::NoDataAvailable)
        ));
    }

    #[test]
    fn document_pages_are_rendered_at_scale() {
        let pdf = scanned_pdf(vec![
            FixturePage::scanned(40.0, 30.0, solid(8, 6, [0, 0, 0])),
            FixturePage::blank(20.0, 20.0),
        ]);
        let transfer = MemoryTransfer::new().with("com.adobe.pdf", pdf.clone());
        let capture = CaptureIngestor::new(EncodingOptions::new(0.9, 2.0), RasterIngestPolicy::Distinct)
            .ingest(&transfer)
            .unwrap();

        assert_eq!(capture.page_count, Some(2));
        assert_eq!(capture.document.as_deref(), Some(pdf.as_slice()));
        assert_eq!(capture.source_type.as_deref(), Some("com.adobe.pdf"));
        assert_eq!(capture.pages[0].dimensions(), Some((80, 60)));
        assert_eq!(capture.pages[1].dimensions(), Some((40, 40)));
        assert_eq!(capture.pages[0].vector_size(), Some((40, 30)));
    }

    #[test]
    fn legacy_document_alias_is_accepted() {
        let pdf = scanned_pdf(vec![FixturePage::blank(10.0, 10.0)]);
        let transfer = MemoryTransfer::new().with("Apple PDF pasteboard type", pdf);
        let capture = ingestor(RasterIngestPolicy::Distinct).ingest(&transfer).unwrap();
        assert_eq!(capture.page_count, Some(1));
    }

    #[test]
    fn document_wins_over_rasters() {
        let pdf = scanned_pdf(vec![FixturePage::blank(10.0, 10.0)]);
        let transfer = MemoryTransfer::new()
            .with("public.png", png([1, 2, 3]))
            .with("com.adobe.pdf", pdf);
        let capture = ingestor(RasterIngestPolicy::All).ingest(&transfer).unwrap();
        assert!(capture.document.is_some());
        assert_eq!(capture.pages.len(), 1);
    }

    #[test]
    fn later_document_aliases_are_not_read_once_one_yields_bytes() {
        let pdf = scanned_pdf(vec![FixturePage::blank(10.0, 10.0)]);
        let transfer = CountingTransfer {
            inner: MemoryTransfer::new()
                .with("public.pdf", pdf.clone())
                .with("public.png", png([1, 2, 3]))
                .with("com.adobe.pdf", pdf),
            fetched: RefCell::new(Vec::new()),
        };
        let capture = ingestor(RasterIngestPolicy::All).ingest(&transfer).unwrap();
        assert!(capture.document.is_some());

        let fetched = transfer.fetched.borrow();
        assert_eq!(fetched.iter().filter(|t| *t == "com.adobe.pdf").count(), 1);
        assert!(!fetched.iter().any(|t| t == "public.pdf"));
        assert!(!fetched.iter().any(|t| t == "public.png"));
    }

    #[test]
    fn empty_document_entry_falls_through_to_rasters() {
        let transfer = MemoryTransfer::new()
            .with("com.adobe.pdf", Vec::new())
            .with("public.png", png([1, 2, 3]));
        let capture = ingestor(RasterIngestPolicy::Distinct).ingest(&transfer).unwrap();
        assert!(capture.document.is_none());
        assert_eq!(capture.pages.len(), 1);
    }

    #[test]
    fn unparseable_document_is_kept_verbatim() {
        let transfer = MemoryTransfer::new().with("com.adobe.pdf", b"%PDF-1.7 truncated".to_vec());
        let capture = ingestor(RasterIngestPolicy::Distinct).ingest(&transfer).unwrap();
        assert_eq!(capture.document.as_deref(), Some(&b"%PDF-1.7 truncated"[..]));
        assert!(capture.pages.is_empty());
        assert!(!capture.document_parsed());
        assert!(!capture.is_empty());
    }

    #[test]
    fn first_match_stops_after_one_payload() {
        let transfer = MemoryTransfer::new()
            .with("public.png", png([1, 2, 3]))
            .with("public.jpeg", jpeg());
        let capture = ingestor(RasterIngestPolicy::FirstMatch).ingest(&transfer).unwrap();
        assert_eq!(capture.pages.len(), 1);
    }

    #[test]
    fn distinct_drops_byte_identical_aliases() {
        let same = png([1, 2, 3]);
        let transfer = MemoryTransfer::new()
            .with("public.png", same.clone())
            .with("Apple PNG pasteboard type", same)
            .with("public.jpeg", jpeg());
        let capture = ingestor(RasterIngestPolicy::Distinct).ingest(&transfer).unwrap();
        assert_eq!(capture.pages.len(), 2);
    }

    #[test]
    fn all_keeps_duplicates() {
        let same = png([1, 2, 3]);
        let transfer = MemoryTransfer::new()
            .with("public.png", same.clone())
            .with("Apple PNG pasteboard type", same)
            .with("public.jpeg", jpeg());
        let capture = ingestor(RasterIngestPolicy::All).ingest(&transfer).unwrap();
        assert_eq!(capture.pages.len(), 3);
    }

    #[test]
    fn rasters_follow_table_order() {
        let transfer = MemoryTransfer::new()
            .with("public.jpeg", jpeg())
            .with("public.png", png([1, 2, 3]));
        let capture = ingestor(RasterIngestPolicy::Distinct).ingest(&transfer).unwrap();
        assert_eq!(capture.pages[0].dimensions(), Some((6, 4)));
        assert_eq!(capture.pages[1].dimensions(), Some((12, 8)));
    }

    #[test]
    fn undecodable_and_unreadable_entries_are_skipped() {
        let transfer = FlakyTransfer {
            inner: MemoryTransfer::new()
                .with("public.tiff", b"garbage".to_vec())
                .with("public.png", png([1, 2, 3]))
                .with("public.jpeg", jpeg()),
            failing: "public.png",
        };
        let capture = ingestor(RasterIngestPolicy::Distinct).ingest(&transfer).unwrap();
        assert_eq!(capture.pages.len(), 1);
        assert_eq!(capture.pages[0].dimensions(), Some((12, 8)));
    }

    #[test]
    fn raster_pixels_stay_encoded_until_needed() {
        let transfer = MemoryTransfer::new().with("public.image", png([9, 9, 9]));
        let capture = ingestor(RasterIngestPolicy::Distinct).ingest(&transfer).unwrap();
        let best = capture.pages[0].best().unwrap();
        assert!(matches!(
            best.data(),
            RepresentationData::Encoded { format: ImageFormat::Png, .. }
        ));
    }

    #[test]
    fn merged_sources_concatenate_pages() {
        let pdf = MemoryTransfer::new().with(
            "com.adobe.pdf",
            scanned_pdf(vec![FixturePage::blank(10.0, 10.0), FixturePage::blank(10.0, 10.0)]),
        );
        let photo = MemoryTransfer::new().with("public.jpeg", jpeg());
        let notes = MemoryTransfer::new().with("public.utf8-plain-text", b"hi".to_vec());

        let capture = ingestor(RasterIngestPolicy::Distinct)
            .ingest_merged(&[&pdf, &notes, &photo])
            .unwrap();
        assert!(capture.document.is_none());
        assert_eq!(capture.pages.len(), 3);
        assert_eq!(capture.pages[2].dimensions(), Some((12, 8)));
    }

    #[test]
    fn single_merged_source_keeps_its_document() {
        let pdf = MemoryTransfer::new().with(
            "com.adobe.pdf",
            scanned_pdf(vec![FixturePage::blank(10.0, 10.0)]),
        );
        let capture = ingestor(RasterIngestPolicy::Distinct)
            .ingest_merged(&[&pdf])
            .unwrap();
        assert!(capture.document_parsed());
    }

    #[test]
    fn merged_sources_with_nothing_usable_have_no_data() {
        let notes = MemoryTransfer::new().with("public.utf8-plain-text", b"hi".to_vec());
        assert!(matches!(
            ingestor(RasterIngestPolicy::Distinct).ingest_merged(&[&notes, &notes]),
            Err(ScanError::NoDataAvailable)
        ));
    }

    #[test]
    fn describe_lists_sizes_and_kinds() {
        let transfer = MemoryTransfer::new()
            .with("public.png", vec![0u8; 5])
            .with("public.utf8-plain-text", vec![0u8; 2]);
        let entries = describe_transfer(&transfer).unwrap();
        assert_eq!(
            entries,
            vec![
                TransferEntry {
                    type_id: "public.png".into(),
                    bytes: Some(5),
                    content: Some(ContentKind::LosslessRaster),
                },
                TransferEntry {
                    type_id: "public.utf8-plain-text".into(),
                    bytes: Some(2),
                    content: None,
                },
            ]
        );
    }

    #[test]
    fn classification_covers_legacy_names() {
        assert_eq!(classify("NeXT TIFF v4.0 pasteboard type"), Some(ContentKind::MultiFrameRaster));
        assert_eq!(classify("public.pdf"), Some(ContentKind::DocumentContainer));
        assert_eq!(classify("public.heic"), None);
    }
}
