// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scanrelay — host bridge abstractions.
//
// Defines the transfer-channel and file-opener traits and picks the
// implementation for the target operating system, so the pipeline never
// touches platform APIs directly.

pub mod memory;
pub mod opener;
pub mod traits;

#[cfg(target_os = "macos")]
pub mod macos;

#[cfg(not(target_os = "macos"))]
pub mod unsupported;

pub use memory::MemoryTransfer;
pub use opener::DesktopOpener;
pub use traits::{FileOpener, TransferSource};

/// The system transfer channel for the target operating system.
///
/// macOS reads the general pasteboard; elsewhere every read reports
/// `PlatformUnavailable`.
pub fn platform_transfer() -> Box<dyn TransferSource> {
    #[cfg(target_os = "macos")]
    {
        Box::new(macos::PasteboardTransfer::new())
    }
    #[cfg(not(target_os = "macos"))]
    {
        Box::new(unsupported::UnsupportedTransfer)
    }
}

/// The desktop file opener.
pub fn platform_opener() -> Box<dyn FileOpener> {
    Box::new(opener::DesktopOpener)
}
