// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-process transfer channel — a host-owned stand-in for the pasteboard.

use std::path::Path;

use scanrelay_core::error::Result;
use tracing::debug;

use crate::traits::TransferSource;

/// A transfer channel whose contents are set directly by the host.
///
/// Entries keep insertion order, so `available_types` reports types the way
/// they were offered. Setting a type that already exists replaces its bytes.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransfer {
    entries: Vec<(String, Vec<u8>)>,
    changes: i64,
}

impl MemoryTransfer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`MemoryTransfer::set`].
    pub fn with(mut self, type_id: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.set(type_id, bytes);
        self
    }

    /// Offer `bytes` under `type_id`.
    pub fn set(&mut self, type_id: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        let type_id = type_id.into();
        let bytes = bytes.into();
        debug!(type_id = %type_id, bytes = bytes.len(), "transfer entry set");
        match self.entries.iter_mut().find(|(id, _)| *id == type_id) {
            Some(entry) => entry.1 = bytes,
            None => self.entries.push((type_id, bytes)),
        }
        self.changes += 1;
    }

    /// Drop every entry, as the pasteboard does before a new write.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.changes += 1;
    }

    /// Offer a file's bytes under the type identifier implied by its extension.
    pub fn set_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let type_id = type_id_for_path(path);
        self.set(type_id, bytes);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TransferSource for MemoryTransfer {
    fn available_types(&self) -> Result<Vec<String>> {
        Ok(self.entries.iter().map(|(id, _)| id.clone()).collect())
    }

    fn bytes_for_type(&self, type_id: &str) -> Result<Option<Vec<u8>>> {
        Ok(self
            .entries
            .iter()
            .find(|(id, _)| id == type_id)
            .map(|(_, bytes)| bytes.clone()))
    }

    fn change_count(&self) -> Result<Option<i64>> {
        Ok(Some(self.changes))
    }
}

/// Standard type identifier for a file, from its extension.
pub fn type_id_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "com.adobe.pdf",
        "tif" | "tiff" => "public.tiff",
        "png" => "public.png",
        "jpg" | "jpeg" => "public.jpeg",
        "gif" | "bmp" | "webp" => "public.image",
        _ => "public.data",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_insertion_order_and_replaces_in_place() {
        let mut transfer = MemoryTransfer::new()
            .with("public.png", vec![1u8])
            .with("public.jpeg", vec![2u8]);
        transfer.set("public.png", vec![3u8]);

        assert_eq!(
            transfer.available_types().unwrap(),
            vec!["public.png".to_string(), "public.jpeg".to_string()]
        );
        assert_eq!(transfer.bytes_for_type("public.png").unwrap(), Some(vec![3u8]));
        assert_eq!(transfer.bytes_for_type("public.tiff").unwrap(), None);
    }

    #[test]
    fn change_count_advances_on_every_write() {
        let mut transfer = MemoryTransfer::new();
        let before = transfer.change_count().unwrap();
        transfer.set("public.png", vec![0u8]);
        transfer.clear();
        assert_eq!(transfer.change_count().unwrap(), before.map(|c| c + 2));
        assert!(transfer.is_empty());
    }

    #[test]
    fn type_ids_follow_extensions() {
        assert_eq!(type_id_for_path(Path::new("scan.PDF")), "com.adobe.pdf");
        assert_eq!(type_id_for_path(Path::new("a.tif")), "public.tiff");
        assert_eq!(type_id_for_path(Path::new("a.jpg")), "public.jpeg");
        assert_eq!(type_id_for_path(Path::new("notes")), "public.data");
    }

    #[test]
    fn set_file_reads_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.png");
        std::fs::write(&path, b"png-bytes").unwrap();

        let mut transfer = MemoryTransfer::new();
        transfer.set_file(&path).unwrap();
        assert_eq!(
            transfer.bytes_for_type("public.png").unwrap().as_deref(),
            Some(&b"png-bytes"[..])
        );
    }
}
