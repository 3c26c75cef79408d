// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic trait definitions for the capabilities scanrelay needs
// from its host: reading the inbound transfer channel and opening saved files.

use std::path::PathBuf;

use scanrelay_core::error::Result;

/// The inbound data channel a paired device drops scans onto.
///
/// On macOS this is the general pasteboard, which the continuity transport
/// fills when the user finishes a scan on the phone. The core only ever asks
/// which type identifiers are present and for the bytes behind one of them.
pub trait TransferSource {
    /// Type identifiers currently offered, in the order the platform lists them.
    fn available_types(&self) -> Result<Vec<String>>;

    /// Bytes for one type identifier. `Ok(None)` when the type is absent or
    /// the platform hands back no data.
    fn bytes_for_type(&self, type_id: &str) -> Result<Option<Vec<u8>>>;

    /// Monotonic counter that changes whenever the channel's contents change.
    /// `None` when the platform offers no such counter.
    fn change_count(&self) -> Result<Option<i64>> {
        Ok(None)
    }
}

impl<T: TransferSource + ?Sized> TransferSource for &T {
    fn available_types(&self) -> Result<Vec<String>> {
        (**self).available_types()
    }

    fn bytes_for_type(&self, type_id: &str) -> Result<Option<Vec<u8>>> {
        (**self).bytes_for_type(type_id)
    }

    fn change_count(&self) -> Result<Option<i64>> {
        (**self).change_count()
    }
}

/// Hand saved files to the desktop's default viewer.
pub trait FileOpener {
    fn open_paths(&self, paths: &[PathBuf]) -> Result<()>;
}
