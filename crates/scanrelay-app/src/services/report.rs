// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Status output — renders capture and save results for the terminal, as
// plain text or JSON.

use std::fmt::Write as _;
use std::path::Path;

use scanrelay_core::error::Result;
use scanrelay_core::human_errors::HumanError;
use scanrelay_core::{OutputKind, SaveReport, ScanConfig};
use scanrelay_document::{CaptureSummary, SessionStats, TransferEntry};
use serde::Serialize;

/// Writes results to stdout in the selected style.
#[derive(Debug, Clone, Copy)]
pub struct Reporter {
    json: bool,
}

#[derive(Serialize)]
struct BatchOutput<'a> {
    capture: &'a CaptureSummary,
    report: &'a SaveReport,
}

impl Reporter {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    pub fn batch(&self, summary: &CaptureSummary, report: &SaveReport) -> Result<()> {
        if self.json {
            return self.print_json(&BatchOutput {
                capture: summary,
                report,
            });
        }
        print!("{}{}", render_capture(summary), render_report(report));
        Ok(())
    }

    pub fn transfer(&self, entries: &[TransferEntry]) -> Result<()> {
        if self.json {
            return self.print_json(&entries);
        }
        print!("{}", render_transfer(entries));
        Ok(())
    }

    pub fn formats(&self) -> Result<()> {
        if self.json {
            let kinds: Vec<OutputKind> = OutputKind::ALL.to_vec();
            return self.print_json(&kinds);
        }
        print!("{}", render_formats());
        Ok(())
    }

    pub fn config(&self, config: &ScanConfig, path: &Path) -> Result<()> {
        if self.json {
            return self.print_json(config);
        }
        println!("# {}", path.display());
        println!("{}", serde_json::to_string_pretty(config)?);
        Ok(())
    }

    pub fn stats(&self, stats: &SessionStats) -> Result<()> {
        if self.json {
            return self.print_json(stats);
        }
        println!(
            "{} capture(s), {} page(s), {} file(s) saved",
            stats.captures, stats.pages_captured, stats.files_saved
        );
        Ok(())
    }

    /// Human-facing error on stderr, whatever the output style.
    pub fn error(&self, human: &HumanError) {
        eprintln!("{}", human.message);
        eprintln!("  {}", human.suggestion);
    }

    fn print_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}

pub fn render_capture(summary: &CaptureSummary) -> String {
    let mut out = String::new();
    let source = summary.source_type.as_deref().unwrap_or("image data");
    let _ = writeln!(out, "Captured {} page(s) from {}", summary.pages, source);
    if summary.has_document && !summary.document_parsed {
        let _ = writeln!(out, "  document could not be split into pages; keeping it as PDF");
    }
    for (index, size) in summary.page_sizes.iter().enumerate() {
        match size {
            Some((w, h)) => {
                let _ = writeln!(out, "  page {:02}: {}x{}", index + 1, w, h);
            }
            None => {
                let _ = writeln!(out, "  page {:02}: no image", index + 1);
            }
        }
    }
    out
}

pub fn render_report(report: &SaveReport) -> String {
    let mut out = String::new();
    for file in &report.files_written {
        let _ = writeln!(out, "Saved {} ({})", file.path.display(), human_bytes(file.bytes));
    }
    for failure in &report.failures {
        let page = failure
            .page
            .map(|p| format!("page {p:02}"))
            .unwrap_or_else(|| "document".into());
        let _ = writeln!(out, "Failed {} as {}: {}", page, failure.kind, failure.reason);
    }
    let _ = writeln!(
        out,
        "{} file(s) written; {} of {} page(s) failed",
        report.files_written.len(),
        report.pages_failed,
        report.pages_attempted
    );
    out
}

pub fn render_transfer(entries: &[TransferEntry]) -> String {
    if entries.is_empty() {
        return "The pasteboard is empty.\n".into();
    }
    let width = entries.iter().map(|e| e.type_id.len()).max().unwrap_or(0);
    let mut out = String::new();
    for entry in entries {
        let size = entry
            .bytes
            .map(|b| human_bytes(b as u64))
            .unwrap_or_else(|| "unreadable".into());
        let kind = entry.content.map(|c| c.label()).unwrap_or("ignored");
        let _ = writeln!(out, "{:<width$}  {:>10}  {}", entry.type_id, size, kind);
    }
    out
}

pub fn render_formats() -> String {
    let mut out = String::new();
    for kind in OutputKind::ALL {
        let descriptor = kind.descriptor();
        let quality = if kind.uses_quality() { "  (--quality applies)" } else { "" };
        let _ = writeln!(
            out,
            "{:<5} {} [{}]{}",
            kind.extension(),
            descriptor.title,
            kind.mime_type(),
            quality
        );
        for note in descriptor.notes {
            let _ = writeln!(out, "      - {note}");
        }
    }
    out
}

fn human_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    let value = bytes as f64;
    if value < KIB {
        format!("{bytes} B")
    } else if value < KIB * KIB {
        format!("{:.1} KiB", value / KIB)
    } else {
        format!("{:.1} MiB", value / (KIB * KIB))
    }
}
