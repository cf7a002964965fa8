//! Error types for the markdownify-mcp library.
//!
//! Every failure a request can hit is a variant of [`MarkdownifyError`].
//! Each variant maps onto a coarse [`ErrorKind`] so the tool surface can hand
//! callers a stable `{kind, message}` pair ([`ErrorReport`]) while the
//! `Display` text keeps the detail a human needs.
//!
//! Errors are scoped to a single request. Nothing here is fatal to the
//! server process.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the markdownify-mcp library.
#[derive(Debug, Error)]
pub enum MarkdownifyError {
    // ── Request errors ────────────────────────────────────────────────────
    /// The request was malformed: bad URL scheme, unparsable URL, both or
    /// neither source fields set, or a non-markdown retrieval path.
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    /// The remote target is a private, loopback or link-local address.
    #[error("Fetching {url} is potentially dangerous, aborting.")]
    UnsafeTarget { url: String },

    // ── Fetch errors ──────────────────────────────────────────────────────
    /// Non-success response or transport error while fetching a URL.
    #[error("Failed to fetch '{url}': {reason}")]
    FetchFailed {
        url: String,
        status: Option<u16>,
        reason: String,
    },

    // ── Engine errors ─────────────────────────────────────────────────────
    /// The conversion engine failed. `detail` carries the engine's own message.
    #[error("Error processing to Markdown: {detail}")]
    ConversionFailed { detail: String },

    // ── File errors ───────────────────────────────────────────────────────
    /// A referenced local file does not exist.
    #[error("File does not exist: '{path}'")]
    NotFound { path: PathBuf },

    /// A retrieval path lies outside the configured share root.
    #[error("Only files in {root:?} are allowed (requested '{path}')")]
    PermissionDenied { path: PathBuf, root: PathBuf },

    /// File content is not valid UTF-8 text.
    #[error("File '{path}' is not valid UTF-8 text")]
    DecodeError { path: PathBuf },

    /// Creating, writing or persisting a temporary file failed.
    #[error("Temporary file error: {source}")]
    TempFile {
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl MarkdownifyError {
    pub(crate) fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// The coarse category reported to callers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::UnsafeTarget { .. } => ErrorKind::UnsafeTarget,
            Self::FetchFailed { .. } => ErrorKind::FetchFailed,
            Self::ConversionFailed { .. } => ErrorKind::ConversionFailed,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            Self::DecodeError { .. } => ErrorKind::DecodeError,
            Self::TempFile { .. } | Self::InvalidConfig(_) => ErrorKind::Internal,
        }
    }

    /// Build the structured failure payload for this error.
    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

impl From<std::io::Error> for MarkdownifyError {
    fn from(source: std::io::Error) -> Self {
        Self::TempFile { source }
    }
}

/// Stable error categories, serialised by name (e.g. `"UnsafeTarget"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidInput,
    UnsafeTarget,
    FetchFailed,
    ConversionFailed,
    NotFound,
    PermissionDenied,
    DecodeError,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidInput => "InvalidInput",
            ErrorKind::UnsafeTarget => "UnsafeTarget",
            ErrorKind::FetchFailed => "FetchFailed",
            ErrorKind::ConversionFailed => "ConversionFailed",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::PermissionDenied => "PermissionDenied",
            ErrorKind::DecodeError => "DecodeError",
            ErrorKind::Internal => "Internal",
        };
        f.write_str(name)
    }
}

/// The failure payload handed back to tool callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_failed_display() {
        let e = MarkdownifyError::FetchFailed {
            url: "https://example.com/a".into(),
            status: Some(404),
            reason: "HTTP 404 Not Found".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("example.com/a"), "got: {msg}");
        assert!(msg.contains("404"), "got: {msg}");
        assert_eq!(e.kind(), ErrorKind::FetchFailed);
    }

    #[test]
    fn conversion_failed_keeps_detail() {
        let e = MarkdownifyError::ConversionFailed {
            detail: "UnsupportedFormatException".into(),
        };
        assert!(e.to_string().starts_with("Error processing to Markdown"));
        assert!(e.to_string().contains("UnsupportedFormatException"));
    }

    #[test]
    fn io_errors_are_internal() {
        let e: MarkdownifyError = std::io::Error::other("disk full").into();
        assert_eq!(e.kind(), ErrorKind::Internal);
    }

    #[test]
    fn report_serialises_kind_by_name() {
        let e = MarkdownifyError::UnsafeTarget {
            url: "http://10.0.0.1/".into(),
        };
        let json = serde_json::to_value(e.report()).unwrap();
        assert_eq!(json["kind"], "UnsafeTarget");
        assert!(json["message"].as_str().unwrap().contains("10.0.0.1"));
    }

    #[test]
    fn kind_display_matches_serde_name() {
        for kind in [ErrorKind::NotFound, ErrorKind::DecodeError, ErrorKind::Internal] {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json.as_str().unwrap(), kind.to_string());
        }
    }
}
