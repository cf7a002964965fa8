//! MCP tool surface and HTTP endpoint.
//!
//! Ten tools are exposed: nine conversions that all delegate to
//! [`Converter::convert`] with a different [`ToolKind`], and
//! `get-markdown-file` for retrieval. The MCP streamable-HTTP service is
//! mounted at `/mcp` on an axum router; `GET /` is a static liveness probe.
//!
//! Failures never escape as protocol errors. They become error tool results
//! carrying a JSON `{kind, message}` body, so one bad request has no effect
//! on the next.

use crate::convert::Converter;
use crate::error::MarkdownifyError;
use crate::output::ConversionResult;
use crate::pipeline::input::ConversionRequest;
use crate::tool::ToolKind;
use axum::routing::get;
use axum::{Json, Router};
use rmcp::{
    handler::server::tool::ToolRouter, handler::server::wrapper::Parameters, model::*,
    schemars::JsonSchema, tool, tool_handler, tool_router, ServerHandler,
};
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Name reported by the health probe.
pub const SERVER_NAME: &str = "markdownify-mcp";

/// Arguments of the remote conversion tools.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[schemars(crate = "rmcp::schemars")]
pub struct UrlArgs {
    /// http:// or https:// URL of the resource to convert
    pub url: String,
}

/// Arguments of the local conversion tools and of retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[schemars(crate = "rmcp::schemars")]
pub struct FilepathArgs {
    /// Path of the file on the server's file system
    pub filepath: String,
}

impl From<UrlArgs> for ConversionRequest {
    fn from(args: UrlArgs) -> Self {
        ConversionRequest::Remote { url: args.url }
    }
}

impl From<FilepathArgs> for ConversionRequest {
    fn from(args: FilepathArgs) -> Self {
        ConversionRequest::Local {
            path: args.filepath,
        }
    }
}

/// The MCP server handler.
#[derive(Clone)]
pub struct MarkdownifyServer {
    converter: Arc<Converter>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl MarkdownifyServer {
    pub fn new(converter: Arc<Converter>) -> Self {
        Self {
            converter,
            tool_router: Self::tool_router(),
        }
    }

    async fn run(&self, kind: ToolKind, request: ConversionRequest) -> CallToolResult {
        respond(kind.tool_name(), self.converter.convert(kind, &request).await)
    }

    #[tool(
        name = "youtube-to-markdown",
        description = "Convert a YouTube video to markdown, including transcript if available"
    )]
    async fn youtube_to_markdown(
        &self,
        Parameters(args): Parameters<UrlArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        Ok(self.run(ToolKind::Youtube, args.into()).await)
    }

    #[tool(
        name = "bing-search-to-markdown",
        description = "Convert a Bing search results page to markdown"
    )]
    async fn bing_search_to_markdown(
        &self,
        Parameters(args): Parameters<UrlArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        Ok(self.run(ToolKind::BingSearch, args.into()).await)
    }

    #[tool(name = "webpage-to-markdown", description = "Convert a webpage to markdown")]
    async fn webpage_to_markdown(
        &self,
        Parameters(args): Parameters<UrlArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        Ok(self.run(ToolKind::Webpage, args.into()).await)
    }

    #[tool(name = "pdf-to-markdown", description = "Convert a PDF file to markdown")]
    async fn pdf_to_markdown(
        &self,
        Parameters(args): Parameters<FilepathArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        Ok(self.run(ToolKind::Pdf, args.into()).await)
    }

    #[tool(
        name = "image-to-markdown",
        description = "Convert an image to markdown, including metadata and description"
    )]
    async fn image_to_markdown(
        &self,
        Parameters(args): Parameters<FilepathArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        Ok(self.run(ToolKind::Image, args.into()).await)
    }

    #[tool(
        name = "audio-to-markdown",
        description = "Convert an audio file to markdown, including transcription if possible"
    )]
    async fn audio_to_markdown(
        &self,
        Parameters(args): Parameters<FilepathArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        Ok(self.run(ToolKind::Audio, args.into()).await)
    }

    #[tool(name = "docx-to-markdown", description = "Convert a DOCX file to markdown")]
    async fn docx_to_markdown(
        &self,
        Parameters(args): Parameters<FilepathArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        Ok(self.run(ToolKind::Docx, args.into()).await)
    }

    #[tool(name = "xlsx-to-markdown", description = "Convert an XLSX file to markdown")]
    async fn xlsx_to_markdown(
        &self,
        Parameters(args): Parameters<FilepathArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        Ok(self.run(ToolKind::Xlsx, args.into()).await)
    }

    #[tool(name = "pptx-to-markdown", description = "Convert a PPTX file to markdown")]
    async fn pptx_to_markdown(
        &self,
        Parameters(args): Parameters<FilepathArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        Ok(self.run(ToolKind::Pptx, args.into()).await)
    }

    #[tool(
        name = "get-markdown-file",
        description = "Get a markdown file by absolute file path"
    )]
    async fn get_markdown_file(
        &self,
        Parameters(args): Parameters<FilepathArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        Ok(respond(
            "get-markdown-file",
            self.converter.retrieve(&args.filepath).await,
        ))
    }
}

#[tool_handler]
impl ServerHandler for MarkdownifyServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Converts web pages, YouTube videos, Bing results, PDFs, images, audio and \
                 Office documents to Markdown. Every conversion returns {path, text}; the \
                 path can be read back later with get-markdown-file."
                    .into(),
            ),
        }
    }
}

/// Turn a request outcome into a tool result.
fn respond(tool: &str, outcome: Result<ConversionResult, MarkdownifyError>) -> CallToolResult {
    match outcome {
        Ok(result) => CallToolResult::success(vec![Content::text(
            serde_json::to_string(&result).unwrap_or_default(),
        )]),
        Err(e) => {
            warn!(tool, kind = %e.kind(), error = %e, "tool call failed");
            CallToolResult::error(vec![Content::text(
                serde_json::to_string(&e.report()).unwrap_or_default(),
            )])
        }
    }
}

/// Build the HTTP router: MCP at `/mcp`, liveness at `/`.
pub fn router(converter: Arc<Converter>) -> Router {
    let mcp = StreamableHttpService::new(
        move || Ok(MarkdownifyServer::new(Arc::clone(&converter))),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig::default(),
    );

    Router::new()
        .route("/", get(health))
        .nest_service("/mcp", mcp)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok", "server": SERVER_NAME }))
}

/// Serve on `listener` until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    converter: Arc<Converter>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("Listening on http://{} (MCP endpoint: /mcp)", addr);
    }
    axum::serve(listener, router(converter))
        .with_graceful_shutdown(shutdown)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::error::ErrorKind;
    use crate::pipeline::engine::{ConversionEngine, EngineError};
    use async_trait::async_trait;
    use std::path::Path;
    use tempfile::TempDir;

    struct UpperEngine;

    #[async_trait]
    impl ConversionEngine for UpperEngine {
        fn name(&self) -> &str {
            "upper"
        }

        async fn convert(&self, path: &Path) -> Result<String, EngineError> {
            let text = tokio::fs::read_to_string(path)
                .await
                .map_err(|_| EngineError::NotFound(path.to_path_buf()))?;
            Ok(text.to_uppercase())
        }
    }

    fn server(dir: &TempDir, share_root: Option<&Path>) -> MarkdownifyServer {
        let mut builder = ServerConfig::builder().temp_dir(dir.path());
        if let Some(root) = share_root {
            builder = builder.share_root(root);
        }
        let converter = Converter::with_engine(builder.build().unwrap(), Arc::new(UpperEngine))
            .unwrap();
        MarkdownifyServer::new(Arc::new(converter))
    }

    fn payload(result: &CallToolResult) -> serde_json::Value {
        let text = result
            .content
            .first()
            .and_then(|c| c.as_text())
            .map(|t| t.text.clone())
            .expect("tool result carries a text item");
        serde_json::from_str(&text).expect("text item is JSON")
    }

    #[test]
    fn every_tool_kind_is_registered() {
        let dir = TempDir::new().unwrap();
        let tools = server(&dir, None).tool_router.list_all();
        assert_eq!(tools.len(), ToolKind::ALL.len() + 1);
        for kind in ToolKind::ALL {
            let tool = tools
                .iter()
                .find(|t| t.name == kind.tool_name())
                .unwrap_or_else(|| panic!("{kind} missing"));
            assert_eq!(tool.description.as_deref(), Some(kind.description()));
        }
        assert!(tools.iter().any(|t| t.name == "get-markdown-file"));
    }

    #[test]
    fn tool_schemas_name_their_argument() {
        let dir = TempDir::new().unwrap();
        let tools = server(&dir, None).tool_router.list_all();
        let property = |name: &str| -> Vec<String> {
            let tool = tools.iter().find(|t| t.name == name).unwrap();
            tool.input_schema
                .get("properties")
                .and_then(|p| p.as_object())
                .map(|p| p.keys().cloned().collect())
                .unwrap_or_default()
        };
        for kind in ToolKind::ALL {
            let expected = match kind.source_kind() {
                crate::pipeline::input::SourceKind::Remote => "url",
                crate::pipeline::input::SourceKind::Local => "filepath",
            };
            assert_eq!(property(kind.tool_name()), vec![expected.to_string()], "{kind}");
        }
        assert_eq!(property("get-markdown-file"), vec!["filepath".to_string()]);
    }

    #[tokio::test]
    async fn pdf_tool_converts_and_get_tool_reads_back() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("doc.pdf");
        std::fs::write(&input, "hello\n").unwrap();
        let server = server(&dir, None);

        let converted = server
            .pdf_to_markdown(Parameters(FilepathArgs {
                filepath: input.to_string_lossy().into_owned(),
            }))
            .await
            .unwrap();
        assert_eq!(converted.is_error, Some(false));
        let body = payload(&converted);
        assert_eq!(body["text"], "HELLO\n");

        let fetched = server
            .get_markdown_file(Parameters(FilepathArgs {
                filepath: body["path"].as_str().unwrap().to_string(),
            }))
            .await
            .unwrap();
        assert_eq!(payload(&fetched)["text"], "HELLO\n");
    }

    #[tokio::test]
    async fn failures_are_error_results_with_kind() {
        let dir = TempDir::new().unwrap();
        let server = server(&dir, None);

        let result = server
            .webpage_to_markdown(Parameters(UrlArgs {
                url: "ftp://example.com/a".into(),
            }))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        assert_eq!(payload(&result)["kind"], "InvalidInput");

        let result = server
            .youtube_to_markdown(Parameters(UrlArgs {
                url: "http://127.0.0.1/watch?v=x".into(),
            }))
            .await
            .unwrap();
        assert_eq!(payload(&result)["kind"], "UnsafeTarget");
    }

    #[tokio::test]
    async fn get_tool_enforces_share_root() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("share");
        std::fs::create_dir_all(&root).unwrap();
        let outside = dir.path().join("outside.md");
        std::fs::write(&outside, "x").unwrap();
        let server = server(&dir, Some(&root));

        let result = server
            .get_markdown_file(Parameters(FilepathArgs {
                filepath: outside.to_string_lossy().into_owned(),
            }))
            .await
            .unwrap();
        let body = payload(&result);
        assert_eq!(
            serde_json::from_value::<ErrorKind>(body["kind"].clone()).unwrap(),
            ErrorKind::PermissionDenied
        );
    }
}
