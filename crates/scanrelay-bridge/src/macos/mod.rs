// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// macOS general pasteboard via objc2-app-kit.
//
// Continuity Camera delivers a finished scan by writing it to the responder's
// pasteboard; reading the general pasteboard after the phone reports "saved"
// sees the same payload. Only read-only calls are made here, and none of them
// require the main thread.

#![cfg(target_os = "macos")]

use objc2::rc::Retained;
use objc2_app_kit::NSPasteboard;
use objc2_foundation::NSString;
use scanrelay_core::error::Result;
use tracing::debug;

use crate::traits::TransferSource;

/// Reads the system general pasteboard.
pub struct PasteboardTransfer {
    pasteboard: Retained<NSPasteboard>,
}

impl PasteboardTransfer {
    pub fn new() -> Self {
        #[allow(unused_unsafe)]
        let pasteboard = unsafe { NSPasteboard::generalPasteboard() };
        Self { pasteboard }
    }
}

impl Default for PasteboardTransfer {
    fn default() -> Self {
        Self::new()
    }
}

impl TransferSource for PasteboardTransfer {
    fn available_types(&self) -> Result<Vec<String>> {
        #[allow(unused_unsafe)]
        let types = unsafe { self.pasteboard.types() };
        let list: Vec<String> = match types {
            Some(types) => types.iter().map(|t| t.to_string()).collect(),
            None => Vec::new(),
        };
        debug!(count = list.len(), "pasteboard types read");
        Ok(list)
    }

    fn bytes_for_type(&self, type_id: &str) -> Result<Option<Vec<u8>>> {
        let key = NSString::from_str(type_id);
        #[allow(unused_unsafe)]
        let data = unsafe { self.pasteboard.dataForType(&key) };
        Ok(data.map(|d| d.to_vec()))
    }

    fn change_count(&self) -> Result<Option<i64>> {
        #[allow(unused_unsafe)]
        let count = unsafe { self.pasteboard.changeCount() };
        Ok(Some(count as i64))
    }
}
