//! Server configuration.
//!
//! Everything the server reads from its environment lives in one immutable
//! [`ServerConfig`], built once at startup via [`ServerConfigBuilder`] or
//! [`ServerConfig::from_env`] and shared behind an `Arc` for the life of the
//! process. Nothing re-reads the environment per request.

use crate::error::MarkdownifyError;
use crate::pipeline::input::normalize_path;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

/// Default listening port when `PORT` is unset.
pub const DEFAULT_PORT: u16 = 3000;

/// Default conversion engine executable.
pub const DEFAULT_MARKITDOWN: &str = "markitdown";

/// Configuration for the markdownify server and its conversion pipeline.
///
/// # Example
/// ```rust
/// use markdownify_mcp::ServerConfig;
///
/// let config = ServerConfig::builder()
///     .port(8080)
///     .share_root("/srv/md")
///     .build()
///     .unwrap();
/// assert_eq!(config.port, 8080);
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP endpoint binds to. Default: `0.0.0.0`.
    pub host: IpAddr,

    /// Listening port. Default: 3000 (`PORT`).
    pub port: u16,

    /// Directory that `get-markdown-file` is restricted to (`MD_SHARE_DIR`).
    ///
    /// Stored normalized. `None` means retrieval may read any markdown file
    /// the process can see.
    pub share_root: Option<PathBuf>,

    /// Program invoked as the conversion engine (`MARKITDOWN_PATH`).
    pub markitdown_program: PathBuf,

    /// Resolve DNS hostnames and reject those pointing at private addresses
    /// (`MD_RESOLVE_HOSTS`). Default: `false`, only literal IP hosts are checked.
    pub resolve_hostnames: bool,

    /// Skip the private-address check entirely (`MD_ALLOW_PRIVATE`).
    /// Default: `false`. Meant for local development against loopback servers.
    pub allow_private_targets: bool,

    /// Clean engine output before persisting it. Default: `true`.
    pub normalize_output: bool,

    /// Directory for transient inputs and result files (`MD_TEMP_DIR`).
    /// `None` uses the system temp directory.
    pub temp_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            share_root: None,
            markitdown_program: PathBuf::from(DEFAULT_MARKITDOWN),
            resolve_hostnames: false,
            allow_private_targets: false,
            normalize_output: true,
            temp_dir: None,
        }
    }
}

impl ServerConfig {
    /// Create a new builder for `ServerConfig`.
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder {
            config: Self::default(),
        }
    }

    /// Build a configuration from process environment variables.
    ///
    /// Reads `PORT`, `MD_SHARE_DIR`, `MARKITDOWN_PATH`, `MD_RESOLVE_HOSTS`,
    /// `MD_ALLOW_PRIVATE` and `MD_TEMP_DIR`. Empty values count as unset.
    pub fn from_env() -> Result<Self, MarkdownifyError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ServerConfig::from_env`] but with an injectable lookup, so
    /// tests don't have to mutate the real environment.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, MarkdownifyError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut builder = Self::builder();

        if let Some(port) = var("PORT") {
            let port = port.trim().parse::<u16>().map_err(|_| {
                MarkdownifyError::InvalidConfig(format!("PORT must be a port number, got '{port}'"))
            })?;
            builder = builder.port(port);
        }
        if let Some(dir) = var("MD_SHARE_DIR") {
            builder = builder.share_root(dir);
        }
        if let Some(program) = var("MARKITDOWN_PATH") {
            builder = builder.markitdown_program(program);
        }
        if let Some(flag) = var("MD_RESOLVE_HOSTS") {
            builder = builder.resolve_hostnames(parse_flag("MD_RESOLVE_HOSTS", &flag)?);
        }
        if let Some(flag) = var("MD_ALLOW_PRIVATE") {
            builder = builder.allow_private_targets(parse_flag("MD_ALLOW_PRIVATE", &flag)?);
        }
        if let Some(dir) = var("MD_TEMP_DIR") {
            builder = builder.temp_dir(dir);
        }

        builder.build()
    }

    /// Reopen this configuration for overrides, e.g. CLI flags layered on
    /// top of the environment.
    pub fn into_builder(self) -> ServerConfigBuilder {
        ServerConfigBuilder { config: self }
    }

    /// The socket address the server listens on.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool, MarkdownifyError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(MarkdownifyError::InvalidConfig(format!(
            "{name} must be a boolean, got '{other}'"
        ))),
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    pub fn host(mut self, host: IpAddr) -> Self {
        self.config.host = host;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn share_root(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.share_root = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn markitdown_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.config.markitdown_program = program.into();
        self
    }

    pub fn resolve_hostnames(mut self, v: bool) -> Self {
        self.config.resolve_hostnames = v;
        self
    }

    pub fn allow_private_targets(mut self, v: bool) -> Self {
        self.config.allow_private_targets = v;
        self
    }

    pub fn normalize_output(mut self, v: bool) -> Self {
        self.config.normalize_output = v;
        self
    }

    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.temp_dir = Some(dir.into());
        self
    }

    /// Build the configuration, validating constraints.
    ///
    /// The share root is normalized here (home expansion, `.`/`..`
    /// collapse) so retrieval never has to touch it again.
    pub fn build(mut self) -> Result<ServerConfig, MarkdownifyError> {
        if let Some(root) = self.config.share_root.take() {
            if root.as_os_str().is_empty() {
                return Err(MarkdownifyError::InvalidConfig(
                    "share root must not be empty".into(),
                ));
            }
            self.config.share_root = Some(normalize_path(&root.to_string_lossy()));
        }
        if self.config.markitdown_program.as_os_str().is_empty() {
            return Err(MarkdownifyError::InvalidConfig(
                "markitdown program must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}
