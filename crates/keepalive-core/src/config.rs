//! Configuration management for keepalive
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `KEEPALIVE__SECTION__KEY` environment variables.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,

    /// Record store configuration
    pub store: StoreConfig,

    /// URL registry configuration
    pub registry: RegistryConfig,

    /// Health checker configuration
    pub checker: CheckerConfig,

    /// Identity provider configuration
    pub auth: AuthConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from defaults, an optional file and the environment.
    ///
    /// When `path` is `None`, `keepalive.toml` in the working directory is used if it exists.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();

        let file = match path {
            Some(p) => ::config::File::from(p).required(true),
            None => ::config::File::with_name("keepalive").required(false),
        };

        let mut config: Config = ::config::Config::builder()
            .add_source(::config::Config::try_from(&Config::default())?)
            .add_source(file)
            .add_source(
                ::config::Environment::with_prefix("KEEPALIVE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("registry.allowed_domains"),
            )
            .build()?
            .try_deserialize()?;

        config.store.apply_legacy_env();
        config.validate()?;

        debug!(backend = ?config.store.backend, repo = %config.store.repo, "Configuration loaded");
        Ok(config)
    }

    /// Check cross-field constraints that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.registry.max_urls == 0 {
            return Err(Error::config("registry.max_urls must be at least 1"));
        }
        if self.checker.record_concurrency == 0 {
            return Err(Error::config("checker.record_concurrency must be at least 1"));
        }
        if self.store.backend == StoreBackend::Github && self.store.repo.is_empty() {
            return Err(Error::config(
                "store.repo is required for the github backend (format: owner/repo)",
            ));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// HTTP API port
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5328,
        }
    }
}

/// Which record store implementation to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Issues in a GitHub repository
    #[default]
    Github,
    /// Process-local store, lost on restart
    Memory,
}

/// Record store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Backend selection
    pub backend: StoreBackend,
    /// GitHub REST API base URL
    pub api_base: String,
    /// Repository holding the records, as `owner/repo`
    pub repo: String,
    /// API token
    pub token: String,
    /// Request timeout for store calls
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Github,
            api_base: "https://api.github.com".to_string(),
            repo: String::new(),
            token: String::new(),
            timeout: Duration::from_secs(15),
        }
    }
}

impl StoreConfig {
    /// Fill unset fields from the variables the deploy scripts already export
    fn apply_legacy_env(&mut self) {
        if self.token.is_empty() {
            if let Ok(token) = std::env::var("GITHUB_TOKEN") {
                self.token = token;
            }
        }
        if self.repo.is_empty() {
            if let Ok(repo) = std::env::var("GITHUB_REPO").or_else(|_| std::env::var("REPO_NAME")) {
                self.repo = repo;
            }
        }
    }
}

/// URL registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Host suffixes a monitored URL must end in
    pub allowed_domains: Vec<String>,
    /// Maximum URLs per owner
    pub max_urls: usize,
    /// Written to the `Added-via:` trailer of every record body
    pub client_tag: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            allowed_domains: vec![
                "onrender.com".to_string(),
                "vercel.app".to_string(),
                "cyclic.app".to_string(),
            ],
            max_urls: 3,
            client_tag: "byKB".to_string(),
        }
    }
}

/// Health checker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    /// Per-probe timeout
    #[serde(with = "humantime_serde")]
    pub probe_timeout: Duration,
    /// Wait before the single retry of a failed probe
    #[serde(with = "humantime_serde")]
    pub retry_delay: Duration,
    /// Wait between probes of consecutive URLs in one record
    #[serde(with = "humantime_serde")]
    pub pacing_delay: Duration,
    /// Upper bound of the random delay applied once before each cycle
    #[serde(with = "humantime_serde")]
    pub jitter_max: Duration,
    /// Records probed concurrently (1 = strictly sequential)
    pub record_concurrency: usize,
    /// Maximum redirects followed by a probe
    pub max_redirects: usize,
    /// Interval for the in-process scheduler (`watch` command)
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(8),
            retry_delay: Duration::from_secs(1),
            pacing_delay: Duration::from_millis(500),
            jitter_max: Duration::from_secs(30),
            record_concurrency: 1,
            max_redirects: 10,
            interval: Duration::from_secs(600),
        }
    }
}

/// Identity provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Token-info endpoint used to resolve an access token to a verified email
    pub tokeninfo_url: String,
    /// Request timeout for verification calls
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            tokeninfo_url: "https://www.googleapis.com/oauth2/v3/tokeninfo".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log format (json or pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
