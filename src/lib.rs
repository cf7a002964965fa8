//! # markdownify-mcp
//!
//! Expose a document-to-Markdown conversion engine as MCP tools over HTTP.
//!
//! ## What this crate does (and doesn't)
//!
//! The hard part, reading PDFs, Office files, audio and web pages, belongs to
//! the conversion engine (`markitdown` by default). This crate decides what a
//! request is allowed to touch, gets the bytes to the engine, and hands the
//! result back:
//!
//! ```text
//! request
//!  │
//!  ├─ 1. Gate     only http(s); refuse literal private/loopback/link-local hosts
//!  ├─ 2. Input    local path as-is, or fetch the URL into a transient file
//!  ├─ 3. Engine   markitdown <file>  (transient file deleted afterwards)
//!  ├─ 4. Polish   whitespace / invisible-character cleanup
//!  └─ 5. Output   persist to a kept .md temp file → {path, text}
//! ```
//!
//! `get-markdown-file` reads a markdown file back by path, optionally
//! confined to a share root (`MD_SHARE_DIR`).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use markdownify_mcp::{ConversionRequest, Converter, ServerConfig, ToolKind};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let converter = Converter::new(ServerConfig::from_env()?)?;
//!     let request = ConversionRequest::Local { path: "report.docx".into() };
//!     let result = converter.convert(ToolKind::Docx, &request).await?;
//!     println!("{} → {}", result.path.display(), result.text);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `markdownify` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod retrieve;
pub mod server;
pub mod tool;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ServerConfig, ServerConfigBuilder};
pub use convert::Converter;
pub use error::{ErrorKind, ErrorReport, MarkdownifyError};
pub use output::ConversionResult;
pub use pipeline::engine::{ConversionEngine, EngineError, MarkItDownCli};
pub use pipeline::input::{ConversionRequest, ResolvedInput, SourceKind};
pub use server::{router, serve, MarkdownifyServer};
pub use tool::ToolKind;
