use anyhow::{Context, Result};
use clap::Parser;
use std::env;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub upload_dir: String,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Image upload API backed by a flat directory")]
pub struct Args {
    /// Host to bind to (overrides IMAGE_STORE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides IMAGE_STORE_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where uploaded images are stored (overrides IMAGE_STORE_UPLOAD_DIR)
    #[arg(long)]
    pub upload_dir: Option<String>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        // Parse CLI once
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("IMAGE_STORE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("IMAGE_STORE_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing IMAGE_STORE_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 8000,
            Err(err) => return Err(err).context("reading IMAGE_STORE_PORT"),
        };
        let env_upload_dir =
            env::var("IMAGE_STORE_UPLOAD_DIR").unwrap_or_else(|_| "./static/images".into());

        // --- Merge ---
        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            upload_dir: args.upload_dir.unwrap_or(env_upload_dir),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Fixed upload policy: which extensions are accepted, how large a payload
/// may be, and where stored files are publicly reachable.
///
/// Carried as an explicit struct (rather than module constants) so tests can
/// construct a service with a different ceiling or allow-list.
#[derive(Debug, Clone)]
pub struct ImagePolicy {
    /// Lowercase extensions accepted by the validator and the store listing.
    pub allowed_extensions: Vec<String>,

    /// Upload size ceiling in bytes.
    pub max_upload_bytes: u64,

    /// Public URL prefix under which stored files are served.
    pub url_prefix: String,
}

impl Default for ImagePolicy {
    fn default() -> Self {
        Self {
            allowed_extensions: ["jpg", "jpeg", "png", "gif", "webp"]
                .into_iter()
                .map(String::from)
                .collect(),
            max_upload_bytes: 10 * 1024 * 1024,
            url_prefix: "/static/images".into(),
        }
    }
}

impl ImagePolicy {
    pub fn max_upload_mib(&self) -> u64 {
        self.max_upload_bytes / (1024 * 1024)
    }
}
