//! Conversion entry points.
//!
//! [`Converter`] ties the pipeline together for one request:
//!
//! ```text
//! resolve ──▶ engine ──▶ postprocess ──▶ persist
//! ```
//!
//! It holds no per-request state. The config, the engine and the HTTP
//! client are all shared read-only, so one `Converter` behind an `Arc`
//! serves every concurrent request.

use crate::config::ServerConfig;
use crate::error::MarkdownifyError;
use crate::output::{persist_markdown, ConversionResult};
use crate::pipeline::engine::{ConversionEngine, EngineError, MarkItDownCli};
use crate::pipeline::input::{resolve_input, ConversionRequest, SourceKind};
use crate::pipeline::postprocess;
use crate::retrieve;
use crate::tool::ToolKind;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Shared conversion service.
#[derive(Clone)]
pub struct Converter {
    config: Arc<ServerConfig>,
    engine: Arc<dyn ConversionEngine>,
    client: reqwest::Client,
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("config", &self.config)
            .field("engine", &self.engine.name())
            .finish()
    }
}

impl Converter {
    /// Build a converter that runs `markitdown` as configured.
    pub fn new(config: ServerConfig) -> Result<Self, MarkdownifyError> {
        let engine = MarkItDownCli::new(config.markitdown_program.clone());
        Self::with_engine(config, Arc::new(engine))
    }

    /// Build a converter around a caller-supplied engine.
    pub fn with_engine(
        config: ServerConfig,
        engine: Arc<dyn ConversionEngine>,
    ) -> Result<Self, MarkdownifyError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("markdownify-mcp/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MarkdownifyError::InvalidConfig(format!("HTTP client: {e}")))?;
        Ok(Self {
            config: Arc::new(config),
            engine,
            client,
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Convert one source with the given tool.
    ///
    /// A tool only accepts its own source kind: a `url` for remote tools, a
    /// `filepath` for local ones. Any transient input file created while
    /// resolving is gone by the time this returns, whatever the outcome.
    pub async fn convert(
        &self,
        kind: ToolKind,
        request: &ConversionRequest,
    ) -> Result<ConversionResult, MarkdownifyError> {
        let start = Instant::now();
        if request.kind() != kind.source_kind() {
            let expected = match kind.source_kind() {
                SourceKind::Remote => "url",
                SourceKind::Local => "filepath",
            };
            return Err(MarkdownifyError::invalid_input(format!(
                "{kind} expects a {expected}"
            )));
        }
        info!("Starting {}: {}", kind, request.reference());

        let resolved =
            resolve_input(request, kind.extension_hints(), &self.client, &self.config).await?;
        debug!(
            "Running {} on {} (temporary: {})",
            self.engine.name(),
            resolved.path().display(),
            resolved.is_temporary()
        );
        let converted = self.engine.convert(resolved.path()).await;
        // Removes the transient input, if any, before the outcome is inspected.
        drop(resolved);
        let markdown = converted.map_err(engine_error)?;

        let markdown = if self.config.normalize_output {
            postprocess::clean_markdown(&markdown)
        } else {
            markdown
        };

        let result = self.produce_result(markdown).await?;
        info!(
            "Finished {}: {} chars → {} in {}ms",
            kind,
            result.text.len(),
            result.path.display(),
            start.elapsed().as_millis()
        );
        Ok(result)
    }

    /// Persist markdown text as a new result file.
    pub async fn produce_result(
        &self,
        markdown: String,
    ) -> Result<ConversionResult, MarkdownifyError> {
        persist_markdown(markdown, self.config.temp_dir.as_deref()).await
    }

    /// Read back a markdown file, honouring the configured share root.
    pub async fn retrieve(&self, filepath: &str) -> Result<ConversionResult, MarkdownifyError> {
        retrieve::get_markdown_file(filepath, self.config.share_root.as_deref()).await
    }
}

fn engine_error(e: EngineError) -> MarkdownifyError {
    match e {
        EngineError::NotFound(path) => MarkdownifyError::NotFound { path },
        other => MarkdownifyError::ConversionFailed {
            detail: other.to_string(),
        },
    }
}
