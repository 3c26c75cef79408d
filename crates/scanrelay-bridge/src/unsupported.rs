// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub transfer channel for platforms without a continuity pasteboard.
//
// Every read returns `PlatformUnavailable`; hosts fall back to importing files
// through `MemoryTransfer`.

use scanrelay_core::error::{Result, ScanError};

use crate::traits::TransferSource;

/// No-op transfer returned on platforms without a system pasteboard binding.
pub struct UnsupportedTransfer;

impl TransferSource for UnsupportedTransfer {
    fn available_types(&self) -> Result<Vec<String>> {
        tracing::warn!("TransferSource::available_types called on unsupported platform");
        Err(ScanError::PlatformUnavailable)
    }

    fn bytes_for_type(&self, _type_id: &str) -> Result<Option<Vec<u8>>> {
        Err(ScanError::PlatformUnavailable)
    }

    fn change_count(&self) -> Result<Option<i64>> {
        Err(ScanError::PlatformUnavailable)
    }
}
