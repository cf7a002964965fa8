//! Input resolution: turn a conversion request into a file the engine can read.
//!
//! ## Why download to a temp file?
//!
//! The conversion engine reads from a file-system path. A remote source is
//! therefore fetched once and written to a transient file whose ownership
//! sits in [`ResolvedInput::Downloaded`]. The file is a
//! [`tempfile::TempPath`], so it is deleted when the `ResolvedInput` is
//! dropped: after a successful conversion, after an engine failure, and
//! after a write error halfway through resolution alike.
//!
//! Local sources are only normalized. Existence is left for the engine to
//! discover when it opens the file.

use crate::config::ServerConfig;
use crate::error::MarkdownifyError;
use crate::pipeline::gate;
use std::path::{Component, Path, PathBuf};
use tempfile::{NamedTempFile, TempPath};
use tracing::{debug, info};
use url::Url;

/// Which request field a source came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Remote,
    Local,
}

/// A request to convert exactly one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionRequest {
    /// An `http://` or `https://` URL to fetch.
    Remote { url: String },
    /// A path on the local file system.
    Local { path: String },
}

impl ConversionRequest {
    /// Build a request from the two optional fields a caller may send.
    ///
    /// Exactly one of `url` and `filepath` must be set.
    pub fn from_fields(
        url: Option<String>,
        filepath: Option<String>,
    ) -> Result<Self, MarkdownifyError> {
        match (url, filepath) {
            (Some(url), None) => Ok(Self::Remote { url }),
            (None, Some(path)) => Ok(Self::Local { path }),
            (Some(_), Some(_)) => Err(MarkdownifyError::invalid_input(
                "Provide either filepath or url, not both",
            )),
            (None, None) => Err(MarkdownifyError::invalid_input(
                "Either filepath or url must be provided",
            )),
        }
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Remote { .. } => SourceKind::Remote,
            Self::Local { .. } => SourceKind::Local,
        }
    }

    /// The raw reference, for logging.
    pub fn reference(&self) -> &str {
        match self {
            Self::Remote { url } => url,
            Self::Local { path } => path,
        }
    }
}

/// The resolved input: a local path or a downloaded transient file.
#[derive(Debug)]
pub enum ResolvedInput {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input was a URL; its body lives in a transient file deleted on drop.
    Downloaded(TempPath),
}

impl ResolvedInput {
    /// Get the path to the input file regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Downloaded(temp) => temp,
        }
    }

    /// Whether this value owns a transient file.
    pub fn is_temporary(&self) -> bool {
        matches!(self, ResolvedInput::Downloaded(_))
    }
}

/// Resolve a request to a file the conversion engine can read.
///
/// `hints` is the tool's extension-hint table, used only to name the
/// transient file of a remote source.
pub async fn resolve_input(
    request: &ConversionRequest,
    hints: &[&str],
    client: &reqwest::Client,
    config: &ServerConfig,
) -> Result<ResolvedInput, MarkdownifyError> {
    match request {
        ConversionRequest::Remote { url } => {
            let url = gate::check_url(url, config).await?;
            download_url(&url, hints, client, config.temp_dir.as_deref()).await
        }
        ConversionRequest::Local { path } => {
            let path = normalize_path(path);
            debug!("Resolved local input: {}", path.display());
            Ok(ResolvedInput::Local(path))
        }
    }
}

/// Fetch a URL into a fresh transient file.
async fn download_url(
    url: &Url,
    hints: &[&str],
    client: &reqwest::Client,
    temp_dir: Option<&Path>,
) -> Result<ResolvedInput, MarkdownifyError> {
    info!("Fetching: {}", url);

    let fetch_failed = |status: Option<u16>, reason: String| MarkdownifyError::FetchFailed {
        url: url.to_string(),
        status,
        reason,
    };

    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| fetch_failed(None, e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(fetch_failed(
            Some(status.as_u16()),
            format!("HTTP {}", status),
        ));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| fetch_failed(Some(status.as_u16()), e.to_string()))?;

    let extension = remote_extension(url, hints);
    let temp = create_temp_file(temp_dir, extension)?.into_temp_path();
    // A failed write drops `temp`, which removes the file.
    tokio::fs::write(&temp, &bytes).await?;

    info!("Fetched {} bytes to {}", bytes.len(), temp.display());
    Ok(ResolvedInput::Downloaded(temp))
}

/// Pick the transient file extension for a remote source.
///
/// The URL path (query and fragment excluded) is matched case-insensitively
/// against `hints`; anything unmatched is stored as `md`.
pub fn remote_extension<'a>(url: &Url, hints: &[&'a str]) -> &'a str {
    let path = url.path().to_ascii_lowercase();
    hints
        .iter()
        .copied()
        .find(|ext| path.ends_with(&format!(".{ext}")))
        .unwrap_or("md")
}

/// Create an empty temporary file named `markdownify-XXXX.<extension>`.
pub(crate) fn create_temp_file(
    dir: Option<&Path>,
    extension: &str,
) -> Result<NamedTempFile, MarkdownifyError> {
    let suffix = format!(".{extension}");
    let mut builder = tempfile::Builder::new();
    builder.prefix("markdownify-").suffix(&suffix);
    let file = match dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };
    Ok(file)
}

/// Normalize a user-supplied path.
///
/// Expands a leading `~` to the home directory and collapses `.` and `..`
/// segments lexically, without touching the file system. Relative paths
/// stay relative; `..` at the start of a relative path is kept.
pub fn normalize_path(raw: &str) -> PathBuf {
    let expanded = expand_home(raw);
    let mut out: Vec<Component<'_>> = Vec::new();

    for component in expanded.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }

    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().collect()
}

fn expand_home(raw: &str) -> PathBuf {
    let rest = if raw == "~" {
        Some("")
    } else {
        raw.strip_prefix("~/")
    };
    match (rest, dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(raw),
    }
}
