//! Conversion engine seam: hand a file to the engine, get markdown back.
//!
//! The engine is an opaque collaborator. [`ConversionEngine`] is the only
//! thing the pipeline knows about it, so tests can plug in an in-process
//! fake and deployments can point at a different executable.
//!
//! [`MarkItDownCli`] is the production implementation. It runs the
//! `markitdown` command with the file path as its only argument and reads
//! the markdown from stdout. The subprocess is awaited through
//! `tokio::process`, so a slow conversion never blocks other requests.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Why the engine could not produce markdown.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The input file does not exist.
    #[error("file does not exist: '{0}'")]
    NotFound(PathBuf),

    /// The engine ran and reported a failure.
    #[error("{0}")]
    Failed(String),

    /// The engine could not be started at all.
    #[error("could not start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Anything that turns a document on disk into markdown text.
#[async_trait]
pub trait ConversionEngine: Send + Sync {
    /// A short name for logs.
    fn name(&self) -> &str;

    /// Convert the file at `path` to markdown.
    async fn convert(&self, path: &Path) -> Result<String, EngineError>;
}

/// Runs the `markitdown` command-line tool.
#[derive(Debug, Clone)]
pub struct MarkItDownCli {
    program: PathBuf,
}

impl MarkItDownCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// `<program> -- <path>`: a path starting with `-` is never read as a flag.
    fn command(&self, path: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("--").arg(path);
        cmd
    }
}

impl Default for MarkItDownCli {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_MARKITDOWN)
    }
}

#[async_trait]
impl ConversionEngine for MarkItDownCli {
    fn name(&self) -> &str {
        "markitdown"
    }

    async fn convert(&self, path: &Path) -> Result<String, EngineError> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(EngineError::NotFound(path.to_path_buf()));
        }

        debug!("Running {} on {}", self.program.display(), path.display());
        let output = self
            .command(path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| EngineError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = last_error_line(&stderr)
                .map(str::to_string)
                .unwrap_or_else(|| format!("engine exited with {}", output.status));
            return Err(EngineError::Failed(detail));
        }

        String::from_utf8(output.stdout)
            .map_err(|e| EngineError::Failed(format!("engine produced non-UTF-8 output: {e}")))
    }
}

/// The last non-empty stderr line; for a Python traceback that is the
/// exception message itself.
fn last_error_line(stderr: &str) -> Option<&str> {
    stderr.lines().map(str::trim).rfind(|l| !l.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_error_line_picks_exception() {
        let tb = "Traceback (most recent call last):\n  File \"x.py\", line 1\nUnsupportedFormatException: nope\n\n";
        assert_eq!(last_error_line(tb), Some("UnsupportedFormatException: nope"));
        assert_eq!(last_error_line("  \n"), None);
    }

    #[tokio::test]
    async fn missing_input_is_not_found() {
        let engine = MarkItDownCli::default();
        let err = engine
            .convert(Path::new("/definitely/not/a/real/file.docx"))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)), "{err}");
    }

    #[tokio::test]
    async fn missing_program_is_spawn_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let engine = MarkItDownCli::new("markdownify-test-no-such-program");
        let err = engine.convert(file.path()).await.unwrap_err();
        assert!(matches!(err, EngineError::Spawn { .. }), "{err}");
        assert!(err.to_string().contains("markdownify-test-no-such-program"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stdout_becomes_markdown() {
        // `cat` stands in for markitdown: it echoes the file as "markdown".
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"# Title\n\nbody\n").unwrap();
        let engine = MarkItDownCli::new("cat");
        let text = engine.convert(file.path()).await.unwrap();
        assert_eq!(text, "# Title\n\nbody\n");
    }

    #[test]
    fn path_follows_end_of_options_marker() {
        let engine = MarkItDownCli::default();
        let cmd = engine.command(Path::new("-o.pdf"));
        let args: Vec<_> = cmd.as_std().get_args().collect();
        assert_eq!(args, ["--", "-o.pdf"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn file_named_like_a_flag_converts() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("-n.md");
        std::fs::write(&file, "plain\n").unwrap();
        let engine = MarkItDownCli::new("cat");
        assert_eq!(engine.convert(&file).await.unwrap(), "plain\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_failure() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let engine = MarkItDownCli::new("false");
        let err = engine.convert(file.path()).await.unwrap_err();
        assert!(matches!(err, EngineError::Failed(_)), "{err}");
    }
}
