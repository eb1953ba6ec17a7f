use anyhow::{Context, Result};
use clap::Parser;
use std::env;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
    pub database_url: String,
    /// Header carrying the principal resolved by the fronting identity proxy.
    pub auth_header: String,
    /// Prefix for image URLs handed out in gallery listings.
    pub public_url: String,
    pub max_upload_bytes: usize,
}

/// One-shot administrative modes; `Serve` is the default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminTask {
    Serve,
    Migrate,
    AddUser(String),
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Image gallery service")]
pub struct Args {
    /// Host to bind to (overrides GALLERY_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides GALLERY_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where image blobs are stored (overrides GALLERY_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Database URL (overrides GALLERY_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Request header holding the authenticated username (overrides GALLERY_AUTH_HEADER)
    #[arg(long)]
    pub auth_header: Option<String>,

    /// Base URL prepended to image links (overrides GALLERY_PUBLIC_URL)
    #[arg(long)]
    pub public_url: Option<String>,

    /// Maximum accepted request body in bytes (overrides GALLERY_MAX_UPLOAD_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<usize>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,

    /// Register a username and exit
    #[arg(long, value_name = "USERNAME", conflicts_with = "migrate")]
    pub add_user: Option<String>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and the requested task.
    pub fn from_env_and_args() -> Result<(Self, AdminTask)> {
        let args = Args::parse();
        Self::resolve(args, |key| env::var(key).ok())
    }

    /// Merge parsed arguments with values produced by `lookup` (the process
    /// environment in production).
    pub fn resolve(
        args: Args,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(Self, AdminTask)> {
        let env_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.into());

        let env_port = match lookup("GALLERY_PORT") {
            Some(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing GALLERY_PORT value `{}`", value))?,
            None => 8080,
        };
        let env_max_upload = match lookup("GALLERY_MAX_UPLOAD_BYTES") {
            Some(value) => value
                .parse::<usize>()
                .with_context(|| format!("parsing GALLERY_MAX_UPLOAD_BYTES value `{}`", value))?,
            None => 16 * 1024 * 1024,
        };

        let cfg = Self {
            host: args.host.unwrap_or_else(|| env_or("GALLERY_HOST", "0.0.0.0")),
            port: args.port.unwrap_or(env_port),
            storage_dir: args
                .storage_dir
                .unwrap_or_else(|| env_or("GALLERY_STORAGE_DIR", "./data/images")),
            database_url: args.database_url.unwrap_or_else(|| {
                env_or("GALLERY_DATABASE_URL", "sqlite://./data/meta/gallery.db")
            }),
            auth_header: args
                .auth_header
                .unwrap_or_else(|| env_or("GALLERY_AUTH_HEADER", "x-authenticated-user")),
            public_url: args
                .public_url
                .unwrap_or_else(|| env_or("GALLERY_PUBLIC_URL", "")),
            max_upload_bytes: args.max_upload_bytes.unwrap_or(env_max_upload),
        };

        let task = match (args.migrate, args.add_user) {
            (_, Some(username)) => AdminTask::AddUser(username),
            (true, None) => AdminTask::Migrate,
            (false, None) => AdminTask::Serve,
        };

        Ok((cfg, task))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
