//! CLI binary for markdownify-mcp.
//!
//! `serve` runs the MCP endpoint; `convert` and `get` run the same pipeline
//! once from the terminal, which is handy for checking an engine install.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use markdownify_mcp::{
    serve, ConversionRequest, ConversionResult, Converter, ServerConfig, SourceKind, ToolKind,
};
use std::io::{self, Write};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Serve MCP over HTTP on port 3000 (endpoint: /mcp, health: /)
  markdownify serve

  # Restrict get-markdown-file to one directory
  MD_SHARE_DIR=/srv/md markdownify serve --port 8080

  # One-off conversions (kind inferred from the URL or file extension)
  markdownify convert --file report.docx
  markdownify convert --url https://example.com/paper.pdf --kind webpage --json

  # Read a result back
  markdownify get /tmp/markdownify-ab12cd.md

ENVIRONMENT VARIABLES:
  PORT               Listening port (default 3000)
  MD_SHARE_DIR       Share root for get-markdown-file
  MARKITDOWN_PATH    Conversion engine executable (default: markitdown)
  MD_RESOLVE_HOSTS   Also reject hostnames that resolve to private addresses
  MD_ALLOW_PRIVATE   Disable the private-address check (local development only)
  MD_TEMP_DIR        Directory for transient inputs and result files
  RUST_LOG           Log filter, e.g. markdownify_mcp=debug
"#;

/// Convert documents and web resources to Markdown, over MCP or from the shell.
#[derive(Parser, Debug)]
#[command(
    name = "markdownify",
    version,
    about = "Convert documents and web resources to Markdown, served as MCP tools",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    overrides: ConfigOverrides,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "MARKDOWNIFY_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "MARKDOWNIFY_QUIET")]
    quiet: bool,
}

/// Flags layered over the environment-derived configuration.
#[derive(Args, Debug)]
struct ConfigOverrides {
    /// Directory get-markdown-file is restricted to (overrides MD_SHARE_DIR).
    #[arg(long, global = true)]
    share_dir: Option<PathBuf>,

    /// Conversion engine executable (overrides MARKITDOWN_PATH).
    #[arg(long, global = true)]
    markitdown: Option<PathBuf>,

    /// Resolve hostnames and reject those pointing at private addresses.
    #[arg(long, global = true)]
    resolve_hosts: bool,

    /// Skip the private-address check (local development only).
    #[arg(long, global = true)]
    allow_private: bool,

    /// Store engine output exactly as produced, without whitespace cleanup.
    #[arg(long, global = true)]
    raw: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the MCP tools over streamable HTTP.
    Serve {
        /// Listening port (overrides PORT).
        #[arg(short, long)]
        port: Option<u16>,

        /// Bind address.
        #[arg(long, default_value = "0.0.0.0")]
        host: IpAddr,
    },

    /// Convert one URL or file and print the markdown.
    Convert {
        /// http:// or https:// URL to fetch and convert.
        #[arg(long, conflicts_with = "file")]
        url: Option<String>,

        /// Local file to convert.
        #[arg(long)]
        file: Option<String>,

        /// Tool to use: youtube, bing-search, webpage, pdf, image, audio,
        /// docx, xlsx, pptx. Inferred when omitted.
        #[arg(short, long, value_parser = parse_kind)]
        kind: Option<ToolKind>,

        /// Print `{path, text}` as JSON instead of the markdown.
        #[arg(long)]
        json: bool,
    },

    /// Read back a markdown file, honouring the share root.
    Get {
        /// Path of the .md or .markdown file.
        path: String,

        /// Print `{path, text}` as JSON instead of the markdown.
        #[arg(long)]
        json: bool,
    },
}

fn parse_kind(s: &str) -> Result<ToolKind, String> {
    s.parse()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The server logs at info by default; one-off commands keep quiet so
    // stdout stays pipeable and the spinner owns stderr.
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else if matches!(cli.command, Command::Serve { .. }) {
        "info"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli).context("Invalid configuration")?;

    match cli.command {
        Command::Serve { .. } => run_server(config).await,
        Command::Convert {
            url,
            file,
            kind,
            json,
        } => run_convert(config, url, file, kind, json, cli.quiet).await,
        Command::Get { path, json } => {
            let converter = Converter::new(config)?;
            let result = converter
                .retrieve(&path)
                .await
                .with_context(|| format!("Failed to read {path}"))?;
            print_result(&result, json)
        }
    }
}

/// Environment first, then CLI flags on top.
fn build_config(cli: &Cli) -> Result<ServerConfig> {
    let mut builder = ServerConfig::from_env()?.into_builder();
    let o = &cli.overrides;

    if let Command::Serve { port, host } = &cli.command {
        builder = builder.host(*host);
        if let Some(port) = port {
            builder = builder.port(*port);
        }
    }
    if let Some(ref dir) = o.share_dir {
        builder = builder.share_root(dir);
    }
    if let Some(ref program) = o.markitdown {
        builder = builder.markitdown_program(program);
    }
    if o.resolve_hosts {
        builder = builder.resolve_hostnames(true);
    }
    if o.allow_private {
        builder = builder.allow_private_targets(true);
    }
    if o.raw {
        builder = builder.normalize_output(false);
    }

    Ok(builder.build()?)
}

async fn run_server(config: ServerConfig) -> Result<()> {
    let addr = config.socket_addr();
    if let Some(ref root) = config.share_root {
        info!("Share root: {}", root.display());
    }
    if config.allow_private_targets {
        info!("Private-address check disabled (MD_ALLOW_PRIVATE)");
    }

    let converter = Arc::new(Converter::new(config)?);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    serve(listener, converter, async {
        // A failed signal handler means we simply never shut down gracefully.
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutting down");
        }
    })
    .await
    .context("Server error")
}

async fn run_convert(
    config: ServerConfig,
    url: Option<String>,
    file: Option<String>,
    kind: Option<ToolKind>,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let request = ConversionRequest::from_fields(url, file)?;
    let kind = match kind {
        Some(kind) => kind,
        None => infer_kind(&request)?,
    };
    let converter = Converter::new(config)?;

    let spinner = (!quiet && !json).then(|| {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix(kind.tool_name());
        bar.set_message(request.reference().to_string());
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    });

    let outcome = converter.convert(kind, &request).await;
    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }
    let result = outcome.context("Conversion failed")?;

    print_result(&result, json)?;
    if !quiet && !json {
        eprintln!(
            "{} {}  {}",
            green("✔"),
            bold(&result.path.display().to_string()),
            dim(&format!("{} chars", result.text.len())),
        );
    }
    Ok(())
}

/// Pick a tool from the request when `--kind` is not given.
fn infer_kind(request: &ConversionRequest) -> Result<ToolKind> {
    match request.kind() {
        SourceKind::Remote => {
            let host = Url::parse(request.reference())
                .ok()
                .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
                .unwrap_or_default();
            Ok(if is_domain_or_subdomain(&host, "youtube.com") || host == "youtu.be" {
                ToolKind::Youtube
            } else if is_domain_or_subdomain(&host, "bing.com") {
                ToolKind::BingSearch
            } else {
                ToolKind::Webpage
            })
        }
        SourceKind::Local => {
            let ext = Path::new(request.reference())
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_ascii_lowercase)
                .unwrap_or_default();
            ToolKind::ALL
                .into_iter()
                .filter(|k| k.source_kind() == SourceKind::Local)
                .find(|k| k.extension_hints().contains(&ext.as_str()))
                .with_context(|| {
                    format!("Cannot infer a tool for '{}', pass --kind", request.reference())
                })
        }
    }
}

/// `host` is `domain` itself or one of its subdomains.
fn is_domain_or_subdomain(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

fn print_result(result: &ConversionResult, json: bool) -> Result<()> {
    if json {
        let out = serde_json::to_string_pretty(result).context("Failed to serialise output")?;
        println!("{out}");
        return Ok(());
    }
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(result.text.as_bytes())
        .context("Failed to write to stdout")?;
    // Ensure a trailing newline on stdout.
    if !result.text.ends_with('\n') {
        handle.write_all(b"\n").ok();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(url: &str) -> ConversionRequest {
        ConversionRequest::Remote { url: url.into() }
    }

    #[test]
    fn infers_remote_kind_from_exact_domains() {
        let cases = [
            ("https://www.youtube.com/watch?v=x", ToolKind::Youtube),
            ("https://youtube.com/watch?v=x", ToolKind::Youtube),
            ("https://youtu.be/x", ToolKind::Youtube),
            ("https://www.bing.com/search?q=rust", ToolKind::BingSearch),
            ("https://notyoutube.com/watch", ToolKind::Webpage),
            ("https://evilbing.com/search", ToolKind::Webpage),
            ("https://example.com/a.pdf", ToolKind::Webpage),
        ];
        for (url, expected) in cases {
            assert_eq!(infer_kind(&remote(url)).unwrap(), expected, "{url}");
        }
    }

    #[test]
    fn infers_local_kind_from_extension() {
        let local = |p: &str| ConversionRequest::Local { path: p.into() };
        assert_eq!(infer_kind(&local("a/Report.DOCX")).unwrap(), ToolKind::Docx);
        assert_eq!(infer_kind(&local("scan.png")).unwrap(), ToolKind::Image);
        assert!(infer_kind(&local("notes.txt")).is_err());
    }
}
