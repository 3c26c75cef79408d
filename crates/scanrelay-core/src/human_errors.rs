// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the status surface.
//
// Every technical error is mapped to plain English with a clear suggestion.
// The severity drives how the host presents it.

use crate::error::ScanError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Worth simply trying again.
    Transient,
    /// User must do something first (scan again, fix a setting, free space).
    ActionRequired,
    /// Retrying will not help.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary.
    pub message: String,
    /// What the user should try.
    pub suggestion: String,
    /// Whether retrying the same action can succeed.
    pub retriable: bool,
    pub severity: Severity,
}

/// Convert a `ScanError` into a `HumanError`.
pub fn humanize_error(err: &ScanError) -> HumanError {
    match err {
        ScanError::NoDataAvailable => HumanError {
            message: "Nothing arrived from your phone.".into(),
            suggestion: "Choose \"Scan Documents\" on the paired phone, finish the scan, and tap Save. Then try again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        ScanError::ContainerParse(_) => HumanError {
            message: "The scanned document couldn't be opened.".into(),
            suggestion: "The PDF was kept as-is. Save it as PDF, or scan again to get separate page images.".into(),
            retriable: true,
            severity: Severity::ActionRequired,
        },

        ScanError::PageRender { page, .. } => HumanError {
            message: format!("Page {} couldn't be turned into an image.", page + 1),
            suggestion: "The other pages were still saved. Try a lower resolution scale, or save the scan as PDF.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        ScanError::Encoding { kind, .. } => HumanError {
            message: format!("A page couldn't be saved as {}.", kind.extension().to_ascii_uppercase()),
            suggestion: "Try a different output format for this scan.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        ScanError::Write { source, .. } => humanize_io(source),

        ScanError::NothingCaptured => HumanError {
            message: "There's nothing to save yet.".into(),
            suggestion: "Scan a document from your phone first.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        ScanError::InvalidConfig(detail) => HumanError {
            message: "A setting isn't valid.".into(),
            suggestion: format!("Fix the setting and try again. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        ScanError::Io(io_err) => humanize_io(io_err),

        ScanError::Serialization(_) => HumanError {
            message: "The settings file couldn't be read.".into(),
            suggestion: "Run `scanrelay config init` to write a fresh settings file.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        ScanError::Bridge(_) => HumanError {
            message: "The clipboard couldn't be read.".into(),
            suggestion: "Try again. If this keeps happening, restart the app.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        ScanError::PlatformUnavailable => HumanError {
            message: "Phone scanning isn't available on this computer.".into(),
            suggestion: "Use `scanrelay import` with files copied from the phone instead.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },
    }
}

fn humanize_io(io_err: &std::io::Error) -> HumanError {
    match io_err.kind() {
        std::io::ErrorKind::NotFound => HumanError {
            message: "The folder or file couldn't be found.".into(),
            suggestion: "Check the output folder exists, or choose a different one.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },
        std::io::ErrorKind::PermissionDenied => HumanError {
            message: "The app doesn't have permission to write there.".into(),
            suggestion: "Choose a different output folder, or check its permissions.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },
        _ => HumanError {
            message: "There was a problem reading or writing a file.".into(),
            suggestion: "Try again. If this keeps happening, your disk may be full.".into(),
            retriable: true,
            severity: Severity::Transient,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::OutputKind;

    #[test]
    fn no_data_is_transient() {
        let human = humanize_error(&ScanError::NoDataAvailable);
        assert_eq!(human.severity, Severity::Transient);
        assert!(human.retriable);
    }

    #[test]
    fn nothing_captured_is_action_required() {
        let human = humanize_error(&ScanError::NothingCaptured);
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(!human.retriable);
    }

    #[test]
    fn page_numbers_are_one_based_for_users() {
        let err = ScanError::PageRender {
            page: 1,
            reason: "bad stream".into(),
        };
        assert!(humanize_error(&err).message.contains("Page 2"));
    }

    #[test]
    fn write_permission_denied_is_action_required() {
        let err = ScanError::Write {
            path: "/root/x.png".into(),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert_eq!(humanize_error(&err).severity, Severity::ActionRequired);
    }

    #[test]
    fn encoding_mentions_format() {
        let err = ScanError::Encoding {
            kind: OutputKind::LossyRaster,
            reason: "unsupported".into(),
        };
        assert!(humanize_error(&err).message.contains("JPEG"));
    }
}
