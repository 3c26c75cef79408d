// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan session — the capture/save/convert lifecycle.
//
// A session holds at most one capture. Capturing discards the previous one
// before reading the transfer. Save and convert run a whole batch: every page
// is attempted, and per-item failures land in the report instead of aborting.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use image::DynamicImage;
use scanrelay_bridge::TransferSource;
use scanrelay_core::error::{Result, ScanError};
use scanrelay_core::{
    BatchFailure, FailureStage, OutputKind, SaveReport, SavedFile, ScanConfig, SessionId,
    SessionState,
};
use serde::Serialize;
use tracing::{info, info_span, warn};

use crate::image::encode::{OutputEncoder, write_atomic};
use crate::image::representation::PageImage;
use crate::ingest::{CaptureIngestor, CaptureResult};
use crate::naming::BatchNames;
use crate::pdf::render::PageRasterizer;
use crate::pdf::writer::PdfWriter;

/// Cumulative counters for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub captures: usize,
    pub pages_captured: usize,
    pub files_saved: usize,
}

/// What a successful capture produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptureSummary {
    pub pages: usize,
    pub has_document: bool,
    pub document_parsed: bool,
    pub source_type: Option<String>,
    /// Pixel size of each page's best representation.
    pub page_sizes: Vec<Option<(u32, u32)>>,
}

impl CaptureSummary {
    fn of(capture: &CaptureResult) -> Self {
        Self {
            pages: capture.pages.len(),
            has_document: capture.document.is_some(),
            document_parsed: capture.document_parsed(),
            source_type: capture.source_type.clone(),
            page_sizes: capture.pages.iter().map(|p| p.dimensions()).collect(),
        }
    }
}

/// Owns one capture and turns it into files on demand.
///
/// Every operation takes `&mut self`, so a session is used by one caller at a
/// time; a multi-threaded host serialises access itself.
pub struct ScanSession {
    id: SessionId,
    config: ScanConfig,
    state: SessionState,
    capture: CaptureResult,
    stats: SessionStats,
}

impl ScanSession {
    /// Start an idle session. The configuration is validated first.
    pub fn new(config: ScanConfig) -> Result<Self> {
        let config = config.validated()?;
        let id = SessionId::new();
        info!(session = %id, output_dir = %config.output_dir.display(), "scan session started");
        Ok(Self {
            id,
            config,
            state: SessionState::Idle,
            capture: CaptureResult::default(),
            stats: SessionStats::default(),
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// The capture currently held; empty while idle.
    pub fn capture_result(&self) -> &CaptureResult {
        &self.capture
    }

    /// Replace the configuration. Takes effect for the next operation.
    pub fn set_config(&mut self, config: ScanConfig) -> Result<()> {
        self.config = config.validated()?;
        Ok(())
    }

    /// Drop the held capture and return to idle.
    pub fn clear(&mut self) {
        self.capture = CaptureResult::default();
        self.state = SessionState::Idle;
    }

    // -- Capture --------------------------------------------------------------

    /// Read the transfer into a fresh capture.
    ///
    /// The previous capture is discarded before anything is read, so a failed
    /// capture leaves the session idle rather than holding stale pages.
    pub fn capture(&mut self, source: &dyn TransferSource) -> Result<CaptureSummary> {
        let span = info_span!("capture", session = %self.id);
        let _guard = span.enter();

        self.clear();
        self.state = SessionState::Capturing;

        match CaptureIngestor::from_config(&self.config).ingest(source) {
            Ok(capture) => self.adopt(capture),
            Err(err) => {
                self.state = SessionState::Idle;
                Err(err)
            }
        }
    }

    /// Hold a capture produced elsewhere, replacing the current one.
    pub fn adopt(&mut self, capture: CaptureResult) -> Result<CaptureSummary> {
        self.clear();
        if capture.is_empty() {
            return Err(ScanError::NoDataAvailable);
        }

        self.capture = capture;
        self.state = SessionState::Captured;
        self.stats.captures += 1;
        self.stats.pages_captured += self.capture.pages.len();

        let summary = CaptureSummary::of(&self.capture);
        info!(
            pages = summary.pages,
            document = summary.has_document,
            parsed = summary.document_parsed,
            "capture held"
        );
        Ok(summary)
    }

    // -- Save -----------------------------------------------------------------

    /// Write every configured format for the held capture.
    pub fn save(&mut self) -> Result<SaveReport> {
        self.save_at(Local::now())
    }

    /// [`ScanSession::save`] with the batch timestamp supplied by the caller.
    pub fn save_at(&mut self, started: DateTime<Local>) -> Result<SaveReport> {
        self.ensure_captured()?;
        let span = info_span!("save", session = %self.id);
        let _guard = span.enter();

        self.state = SessionState::Saving;
        let result = self.write_configured(started);
        self.finish_batch(result)
    }

    fn write_configured(&self, started: DateTime<Local>) -> Result<SaveReport> {
        let dir = self.prepare_output_dir()?;
        let names = BatchNames::new(&self.config.prefix, started);
        let encoder = OutputEncoder::new(self.config.encoding_options());
        let mut report = SaveReport::default();

        if let Some(document) = &self.capture.document {
            // An unparsed container has no pages; the original bytes are the
            // only output it can give.
            if self.config.wants(OutputKind::Document) || !self.capture.document_parsed() {
                let path = names.document_path(&dir);
                record(&mut report, None, OutputKind::Document, write_atomic(&path, document))?;
            }
        }

        let kinds: Vec<OutputKind> = self
            .config
            .formats
            .iter()
            .copied()
            .filter(OutputKind::is_per_page)
            .collect();
        if kinds.is_empty() {
            return Ok(report);
        }

        for (index, page) in self.capture.pages.iter().enumerate() {
            let pixels = page_pixels(page, index, kinds[0]);
            self.write_page(&mut report, &encoder, &names, &dir, index + 1, pixels, &kinds)?;
        }
        Ok(report)
    }

    // -- Convert --------------------------------------------------------------

    /// Produce the held capture in a single `kind`.
    ///
    /// A parsed document is re-rendered from the container at the current
    /// scale; raster captures are re-encoded. `Document` writes the held
    /// container verbatim, or composes one from the page images.
    pub fn convert(&mut self, kind: OutputKind) -> Result<SaveReport> {
        self.convert_at(kind, Local::now())
    }

    /// [`ScanSession::convert`] with the batch timestamp supplied by the caller.
    pub fn convert_at(&mut self, kind: OutputKind, started: DateTime<Local>) -> Result<SaveReport> {
        self.ensure_captured()?;
        let span = info_span!("convert", session = %self.id, kind = %kind);
        let _guard = span.enter();

        self.state = SessionState::Converting;
        let result = self.write_converted(kind, started);
        self.finish_batch(result)
    }

    fn write_converted(&self, kind: OutputKind, started: DateTime<Local>) -> Result<SaveReport> {
        let dir = self.prepare_output_dir()?;
        let names = BatchNames::new(&self.config.prefix, started);
        let options = self.config.encoding_options();
        let encoder = OutputEncoder::new(options);
        let mut report = SaveReport::default();

        if kind == OutputKind::Document {
            let path = names.document_path(&dir);
            let outcome = match &self.capture.document {
                Some(document) => write_atomic(&path, document),
                None => self
                    .compose_document(&mut report, options.scale())
                    .and_then(|bytes| write_atomic(&path, &bytes)),
            };
            record(&mut report, None, OutputKind::Document, outcome)?;
            return Ok(report);
        }

        let kinds = [kind];
        match &self.capture.document {
            Some(document) if self.capture.document_parsed() => {
                let rasterizer = PageRasterizer::from_bytes(document)?;
                for index in 0..rasterizer.page_count() {
                    let pixels = rasterizer.render_page(index, options.scale()).map(Cow::Owned);
                    self.write_page(&mut report, &encoder, &names, &dir, index + 1, pixels, &kinds)?;
                }
            }
            Some(_) => {
                return Err(ScanError::ContainerParse(
                    "the captured document could not be parsed into pages".into(),
                ));
            }
            None => {
                for (index, page) in self.capture.pages.iter().enumerate() {
                    let pixels = page_pixels(page, index, kind);
                    self.write_page(&mut report, &encoder, &names, &dir, index + 1, pixels, &kinds)?;
                }
            }
        }
        Ok(report)
    }

    /// Page images composed into one PDF. Pages that cannot be decoded are
    /// left out and counted as failed.
    fn compose_document(&self, report: &mut SaveReport, scale: f32) -> Result<Vec<u8>> {
        let mut images: Vec<DynamicImage> = Vec::with_capacity(self.capture.pages.len());
        for (index, page) in self.capture.pages.iter().enumerate() {
            report.pages_attempted += 1;
            match page_pixels(page, index, OutputKind::Document) {
                Ok(image) => images.push(image.into_owned()),
                Err(err) => {
                    fail_page(report, index + 1, &[OutputKind::Document], &err);
                }
            }
        }
        PdfWriter::for_render_scale(scale).compose(&images)
    }

    // -- Batch helpers --------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    fn write_page(
        &self,
        report: &mut SaveReport,
        encoder: &OutputEncoder,
        names: &BatchNames,
        dir: &Path,
        page_number: usize,
        pixels: Result<Cow<'_, DynamicImage>>,
        kinds: &[OutputKind],
    ) -> Result<()> {
        report.pages_attempted += 1;
        let image = match pixels {
            Ok(image) => image,
            Err(err) if err.is_per_item() => {
                fail_page(report, page_number, kinds, &err);
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        let before = report.failures.len();
        for kind in kinds {
            let path = names.page_path(dir, page_number, *kind);
            let outcome = encoder.encode_to_file(&image, *kind, &path);
            record(report, Some(page_number), *kind, outcome)?;
        }
        if report.failures.len() > before {
            report.pages_failed += 1;
        }
        Ok(())
    }

    fn ensure_captured(&self) -> Result<()> {
        if self.state == SessionState::Idle || self.capture.is_empty() {
            return Err(ScanError::NothingCaptured);
        }
        Ok(())
    }

    fn prepare_output_dir(&self) -> Result<PathBuf> {
        let dir = self.config.output_dir.clone();
        std::fs::create_dir_all(&dir).map_err(|source| ScanError::Write {
            path: dir.clone(),
            source,
        })?;
        Ok(dir)
    }

    fn finish_batch(&mut self, result: Result<SaveReport>) -> Result<SaveReport> {
        self.state = SessionState::Captured;
        let report = result?;
        self.stats.files_saved += report.files_written.len();
        info!(
            files = report.files_written.len(),
            attempted = report.pages_attempted,
            failed = report.pages_failed,
            bytes = report.total_bytes(),
            "batch finished"
        );
        Ok(report)
    }
}

/// Decoded pixels for the held page at 0-based `index`, on its way to
/// `kind`. A page without a raster form failed to render at capture; a
/// stored payload that does not decode fails at encoding.
fn page_pixels(page: &PageImage, index: usize, kind: OutputKind) -> Result<Cow<'_, DynamicImage>> {
    let representation = page.best().ok_or_else(|| ScanError::PageRender {
        page: index,
        reason: "page has no raster representation".into(),
    })?;
    representation
        .decode()
        .map_err(|reason| ScanError::Encoding { kind, reason })
}

fn stage_of(err: &ScanError) -> FailureStage {
    match err {
        ScanError::PageRender { .. } => FailureStage::Render,
        ScanError::Write { .. } => FailureStage::Write,
        _ => FailureStage::Encode,
    }
}

/// Item-level text without the kind prefix the error's own message carries.
fn item_reason(err: &ScanError) -> String {
    match err {
        ScanError::PageRender { reason, .. } | ScanError::Encoding { reason, .. } => reason.clone(),
        other => other.to_string(),
    }
}

/// File the outcome of one (page, kind) item into the report. Errors that
/// concern more than the item abort the batch.
fn record(
    report: &mut SaveReport,
    page: Option<usize>,
    kind: OutputKind,
    outcome: Result<SavedFile>,
) -> Result<()> {
    match outcome {
        Ok(saved) => report.files_written.push(saved),
        Err(err) if err.is_per_item() => {
            warn!(?page, %kind, %err, "item failed");
            report.failures.push(BatchFailure {
                page,
                kind,
                stage: stage_of(&err),
                reason: err.to_string(),
            });
        }
        Err(err) => return Err(err),
    }
    Ok(())
}

/// Count a whole page as failed in every kind it was due in.
fn fail_page(report: &mut SaveReport, page: usize, kinds: &[OutputKind], err: &ScanError) {
    let reason = item_reason(err);
    warn!(page, %reason, "page left out");
    for kind in kinds {
        report.failures.push(BatchFailure {
            page: Some(page),
            kind: *kind,
            stage: stage_of(err),
            reason: reason.clone(),
        });
    }
    report.pages_failed += 1;
}
