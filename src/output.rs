//! Result types and result persistence.

use crate::error::MarkdownifyError;
use crate::pipeline::input::create_temp_file;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// What a conversion or retrieval returns: where the markdown lives and
/// the markdown itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub path: PathBuf,
    pub text: String,
}

/// Write `markdown` to a fresh `.md` temporary file and keep it.
///
/// Unlike a transient input, this file outlives the call: the caller gets
/// its path and may read it back later through retrieval.
pub async fn persist_markdown(
    markdown: String,
    temp_dir: Option<&Path>,
) -> Result<ConversionResult, MarkdownifyError> {
    let temp = create_temp_file(temp_dir, "md")?.into_temp_path();
    // Until `keep` succeeds, an error drops `temp` and removes the file.
    tokio::fs::write(&temp, markdown.as_bytes()).await?;
    let path = temp.keep().map_err(|e| MarkdownifyError::TempFile { source: e.error })?;

    debug!("Stored {} bytes of markdown at {}", markdown.len(), path.display());
    Ok(ConversionResult {
        path,
        text: markdown,
    })
}
