//! Configuration for the catalog service.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `ATRIUM__*` environment variables (`__` separates sections, e.g.
//! `ATRIUM__SERVER__ADDRESS=0.0.0.0:3080`).

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{CatalogSettings, DEFAULT_LIMIT, MAX_LIMIT, VisibilityMode};
use crate::models::PermissionBits;
use crate::ratelimit::RateLimitBackend;

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "ATRIUM";

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A source could not be read or deserialized.
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// Values were read but are inconsistent.
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// The effective configuration could not be rendered.
    #[error("Failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_address")]
    pub address: SocketAddr,
    /// Prefix the public routes are mounted under.
    #[serde(default = "default_base_path")]
    pub base_path: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3080))
}

fn default_base_path() -> String {
    "/api/public".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            base_path: default_base_path(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Where catalog data lives.
///
/// With `database` set, records are served from that SQLite file. Without
/// it, an in-memory store is used, optionally seeded from `fixture`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixture: Option<PathBuf>,
}

/// Visibility resolution and paging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityConfig {
    #[serde(default)]
    pub mode: VisibilityMode,
    /// Lists every record regardless of grants. Never enable in production.
    #[serde(default)]
    pub bypass: bool,
    #[serde(default = "default_required_permission")]
    pub required_permission: PermissionBits,
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
}

fn default_required_permission() -> PermissionBits {
    PermissionBits::VIEW
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

fn default_max_limit() -> usize {
    MAX_LIMIT
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        Self {
            mode: VisibilityMode::default(),
            bypass: false,
            required_permission: default_required_permission(),
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

/// Per-caller request budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    /// Key callers by the first `X-Forwarded-For` entry. Only safe behind a
    /// proxy that overwrites the header.
    #[serde(default)]
    pub trust_forwarded_for: bool,
    #[serde(default)]
    pub store: RateLimitBackend,
}

fn default_true() -> bool {
    true
}

fn default_max_requests() -> u32 {
    60
}

fn default_window_secs() -> u64 {
    60
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
            trust_forwarded_for: false,
            store: RateLimitBackend::default(),
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// `Cache-Control` values for the public endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_agents_cache")]
    pub agents: String,
    #[serde(default = "default_categories_cache")]
    pub categories: String,
}

fn default_agents_cache() -> String {
    "public, max-age=60, s-maxage=300".to_string()
}

fn default_categories_cache() -> String {
    "public, max-age=300, s-maxage=600".to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { agents: default_agents_cache(), categories: default_categories_cache() }
    }
}

/// Operator diagnostics. The admin routes are disabled without a token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Log output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), json: false }
    }
}

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub visibility: VisibilityConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads defaults, then `path` if given, then the environment overlay,
    /// and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be read or the merged values are
    /// invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX).separator("__").try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML document without consulting the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed or invalid.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = config::Config::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the service cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.server.base_path.is_empty() && !self.server.base_path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "server.base_path must start with '/': {}",
                self.server.base_path
            )));
        }
        if self.server.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("server.request_timeout_secs must be > 0".into()));
        }
        if self.visibility.max_limit == 0 {
            return Err(ConfigError::Invalid("visibility.max_limit must be > 0".into()));
        }
        if self.visibility.default_limit > self.visibility.max_limit {
            return Err(ConfigError::Invalid(format!(
                "visibility.default_limit ({}) exceeds visibility.max_limit ({})",
                self.visibility.default_limit, self.visibility.max_limit
            )));
        }
        if self.rate_limit.max_requests == 0 {
            return Err(ConfigError::Invalid("rate_limit.max_requests must be > 0".into()));
        }
        if self.rate_limit.window_secs == 0 {
            return Err(ConfigError::Invalid("rate_limit.window_secs must be > 0".into()));
        }
        if self.rate_limit.store == RateLimitBackend::Sqlite && self.storage.database.is_none() {
            return Err(ConfigError::Invalid(
                "rate_limit.store = \"sqlite\" requires storage.database".into(),
            ));
        }
        for (name, value) in
            [("cache.agents", &self.cache.agents), ("cache.categories", &self.cache.categories)]
        {
            if http::HeaderValue::from_str(value).is_err() {
                return Err(ConfigError::Invalid(format!("{name} is not a valid header value")));
            }
        }
        if self.admin.token.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(ConfigError::Invalid("admin.token must not be empty".into()));
        }
        Ok(())
    }

    /// Resolver settings derived from the `visibility` section.
    pub fn catalog_settings(&self) -> CatalogSettings {
        CatalogSettings {
            mode: self.visibility.mode,
            bypass_visibility: self.visibility.bypass,
            required_permission: self.visibility.required_permission,
            default_limit: self.visibility.default_limit,
            max_limit: self.visibility.max_limit,
        }
    }

    /// Renders the effective configuration as TOML with secrets masked.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_redacted_toml(&self) -> Result<String, ConfigError> {
        let mut shown = self.clone();
        if shown.admin.token.is_some() {
            shown.admin.token = Some("<redacted>".to_string());
        }
        Ok(toml::to_string_pretty(&shown)?)
    }
}
