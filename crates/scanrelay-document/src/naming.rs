// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Output file naming for one save/convert batch.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use scanrelay_core::OutputKind;

/// Timestamp layout shared by every file in a batch.
pub const BATCH_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// File names for one batch. The timestamp is fixed when the batch starts so
/// every file it writes shares it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchNames {
    prefix: String,
    stamp: String,
}

impl BatchNames {
    pub fn new(prefix: impl Into<String>, started: DateTime<Local>) -> Self {
        Self {
            prefix: prefix.into(),
            stamp: started.format(BATCH_TIMESTAMP_FORMAT).to_string(),
        }
    }

    /// `<prefix>_<timestamp>.pdf`
    pub fn document(&self) -> String {
        format!(
            "{}_{}.{}",
            self.prefix,
            self.stamp,
            OutputKind::Document.extension()
        )
    }

    /// `<prefix>_<timestamp>_page<NN>.<ext>` for the 1-based `page`.
    pub fn page(&self, page: usize, kind: OutputKind) -> String {
        format!(
            "{}_{}_page{:02}.{}",
            self.prefix,
            self.stamp,
            page,
            kind.extension()
        )
    }

    pub fn document_path(&self, dir: &Path) -> PathBuf {
        dir.join(self.document())
    }

    pub fn page_path(&self, dir: &Path, page: usize, kind: OutputKind) -> PathBuf {
        dir.join(self.page(page, kind))
    }
}
