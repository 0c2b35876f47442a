// model-gate-config/src/config.rs
// ============================================================================
// Module: Model Gate Configuration
// Description: Configuration loading and validation for the gateway.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: model-gate-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Validation fails closed: a config that would run the gateway in a weaker
//! posture than intended (unparseable bind address, oversized token table,
//! dev-permissive in production) is rejected at startup.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use model_gate_core::IdentityId;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "model-gate.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "MODEL_GATE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a filesystem path in configuration.
pub(crate) const MAX_PATH_LENGTH: usize = 4096;
/// Maximum number of bearer token entries.
pub(crate) const MAX_AUTH_TOKENS: usize = 64;
/// Maximum length of a bearer token.
pub(crate) const MAX_AUTH_TOKEN_LENGTH: usize = 256;
/// Minimum backend timeout in milliseconds.
pub(crate) const MIN_BACKEND_TIMEOUT_MS: u64 = 100;
/// Maximum backend timeout in milliseconds.
pub(crate) const MAX_BACKEND_TIMEOUT_MS: u64 = 60_000;
/// Maximum allowed request body size in bytes.
pub(crate) const MAX_BODY_BYTES_LIMIT: usize = 16 * 1024 * 1024;
/// Default request body size limit in bytes.
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
/// Default backend base URL.
const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:3001";
/// Default backend timeout in milliseconds.
const DEFAULT_BACKEND_TIMEOUT_MS: u64 = 5_000;
/// Default maximum backend response size in bytes.
const DEFAULT_BACKEND_MAX_RESPONSE_BYTES: usize = 1024 * 1024;
/// Default outbound user agent.
const DEFAULT_BACKEND_USER_AGENT: &str = "model-gate/0.1";
/// Default gateway bind address.
const DEFAULT_BIND: &str = "127.0.0.1:3000";

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Model Gate gateway configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct GatewayConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Directory store configuration.
    #[serde(default)]
    pub directory: DirectoryStoreConfig,
    /// Audit store configuration.
    #[serde(default)]
    pub audit: AuditStoreConfig,
    /// Backend model service configuration.
    #[serde(default)]
    pub backend: BackendConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Deployment environment gating error verbosity and dev overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    /// Development posture: detailed internal errors, dev overrides allowed.
    #[default]
    Development,
    /// Production posture: generic internal errors, dev overrides rejected.
    Production,
}

impl Environment {
    /// Returns true for the development posture.
    #[must_use]
    pub const fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }

    /// Returns the stable string label for the environment.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the gateway listener.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Deployment environment.
    #[serde(default)]
    pub environment: Environment,
    /// Maximum accepted request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Honor the explicit identity header without a token (development only).
    #[serde(default)]
    pub dev_permissive: bool,
    /// Bearer token authentication table.
    #[serde(default)]
    pub auth: Option<ServerAuthConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            environment: Environment::Development,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            dev_permissive: false,
            auth: None,
        }
    }
}

/// Bearer token table mapping static tokens to identities.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ServerAuthConfig {
    /// Token entries; each token resolves to exactly one identity.
    #[serde(default)]
    pub tokens: Vec<AuthTokenEntry>,
}

/// One bearer token bound to one identity.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthTokenEntry {
    /// Static bearer token value.
    pub token: String,
    /// Identity the token resolves to.
    pub identity_id: IdentityId,
}

/// Store backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    /// In-memory store seeded with the fixture catalog.
    #[default]
    Memory,
    /// Durable SQLite store.
    Sqlite,
}

impl StoreKind {
    /// Returns the stable string label for the store kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Sqlite => "sqlite",
        }
    }
}

/// Directory store configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DirectoryStoreConfig {
    /// Store backend.
    #[serde(default)]
    pub store: StoreKind,
    /// Database path; required for the SQLite backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Audit store configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AuditStoreConfig {
    /// Store backend.
    #[serde(default)]
    pub store: StoreKind,
    /// Database path; required for the SQLite backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Backend model service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the backend model service.
    #[serde(default = "default_backend_url")]
    pub base_url: String,
    /// Request timeout in milliseconds.
    #[serde(default = "default_backend_timeout_ms")]
    pub timeout_ms: u64,
    /// Allow cleartext HTTP backend URLs.
    #[serde(default = "default_allow_http")]
    pub allow_http: bool,
    /// Maximum backend response size in bytes.
    #[serde(default = "default_backend_max_response_bytes")]
    pub max_response_bytes: usize,
    /// User agent for outbound requests.
    #[serde(default = "default_backend_user_agent")]
    pub user_agent: String,
    /// Substitute a deterministic fallback response on backend failure.
    #[serde(default = "default_fallback_on_backend_error")]
    pub fallback_on_backend_error: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BACKEND_URL.to_string(),
            timeout_ms: DEFAULT_BACKEND_TIMEOUT_MS,
            allow_http: true,
            max_response_bytes: DEFAULT_BACKEND_MAX_RESPONSE_BYTES,
            user_agent: DEFAULT_BACKEND_USER_AGENT.to_string(),
            fallback_on_backend_error: true,
        }
    }
}

/// Gateway log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Errors only.
    Error,
    /// Errors and warnings.
    Warn,
    /// Informational events (default).
    #[default]
    Info,
    /// Verbose request tracing.
    Debug,
}

impl LogLevel {
    /// Returns the stable string label for the level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    /// Minimum level emitted to the log stream.
    #[serde(default)]
    pub level: LogLevel,
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Returns the default bind address.
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

/// Returns the default request body size limit.
const fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

/// Returns the default backend base URL.
fn default_backend_url() -> String {
    DEFAULT_BACKEND_URL.to_string()
}

/// Returns the default backend timeout.
const fn default_backend_timeout_ms() -> u64 {
    DEFAULT_BACKEND_TIMEOUT_MS
}

/// Returns the default cleartext HTTP policy for the backend URL.
const fn default_allow_http() -> bool {
    true
}

/// Returns the default backend response size limit.
const fn default_backend_max_response_bytes() -> usize {
    DEFAULT_BACKEND_MAX_RESPONSE_BYTES
}

/// Returns the default outbound user agent.
fn default_backend_user_agent() -> String {
    DEFAULT_BACKEND_USER_AGENT.to_string()
}

/// Returns the default fallback policy.
const fn default_fallback_on_backend_error() -> bool {
    true
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("config io error: {0}")]
    Io(String),
    /// Config file could not be parsed.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Config failed validation.
    #[error("config validation error: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Loading
// ============================================================================

impl GatewayConfig {
    /// Loads and validates configuration.
    ///
    /// Resolution order: explicit `path`, the `MODEL_GATE_CONFIG` environment
    /// variable, then `model-gate.toml` in the working directory. A missing
    /// file yields the validated defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = match path {
            Some(path) => Some(path.to_path_buf()),
            None => env::var_os(CONFIG_ENV_VAR).map(PathBuf::from),
        };
        let resolved = resolved.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_NAME));
        let config = if resolved.exists() {
            let metadata =
                fs::metadata(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
            if metadata.len() > MAX_CONFIG_FILE_SIZE as u64 {
                return Err(ConfigError::Invalid(format!(
                    "config file exceeds size limit: {} bytes (max {MAX_CONFIG_FILE_SIZE})",
                    metadata.len()
                )));
            }
            let content =
                fs::read_to_string(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
            toml::from_str(&content).map_err(|err| ConfigError::Parse(err.to_string()))?
        } else if path.is_some() {
            return Err(ConfigError::Io(format!(
                "config file not found: {}",
                resolved.display()
            )));
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration, failing closed on any weak posture.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server
            .bind
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::Invalid(format!("server.bind: invalid socket address: {}", self.server.bind)))?;
        if self.server.max_body_bytes == 0 || self.server.max_body_bytes > MAX_BODY_BYTES_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "server.max_body_bytes: must be in 1..={MAX_BODY_BYTES_LIMIT}"
            )));
        }
        if self.server.dev_permissive && !self.server.environment.is_development() {
            return Err(ConfigError::Invalid(
                "server.dev_permissive: only allowed in the development environment".to_string(),
            ));
        }
        if let Some(auth) = &self.server.auth {
            validate_auth(auth)?;
        }
        validate_store_path("directory.path", self.directory.store, self.directory.path.as_deref())?;
        validate_store_path("audit.path", self.audit.store, self.audit.path.as_deref())?;
        validate_backend(&self.backend)?;
        Ok(())
    }
}

/// Validates the bearer token table.
fn validate_auth(auth: &ServerAuthConfig) -> Result<(), ConfigError> {
    if auth.tokens.len() > MAX_AUTH_TOKENS {
        return Err(ConfigError::Invalid(format!(
            "server.auth.tokens: too many entries (max {MAX_AUTH_TOKENS})"
        )));
    }
    let mut seen = std::collections::BTreeSet::new();
    for entry in &auth.tokens {
        if entry.token.is_empty() || entry.token.len() > MAX_AUTH_TOKEN_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "server.auth.tokens: token length must be in 1..={MAX_AUTH_TOKEN_LENGTH}"
            )));
        }
        if entry.identity_id.as_str().is_empty() {
            return Err(ConfigError::Invalid(
                "server.auth.tokens: identity_id must not be empty".to_string(),
            ));
        }
        if !seen.insert(entry.token.as_str()) {
            return Err(ConfigError::Invalid(
                "server.auth.tokens: duplicate token entry".to_string(),
            ));
        }
    }
    Ok(())
}

/// Validates a store path against its selected backend.
fn validate_store_path(
    field: &str,
    kind: StoreKind,
    path: Option<&Path>,
) -> Result<(), ConfigError> {
    match kind {
        StoreKind::Memory => Ok(()),
        StoreKind::Sqlite => {
            let Some(path) = path else {
                return Err(ConfigError::Invalid(format!(
                    "{field}: required for the sqlite store"
                )));
            };
            if path.display().to_string().len() > MAX_PATH_LENGTH {
                return Err(ConfigError::Invalid(format!("{field}: path exceeds length limit")));
            }
            Ok(())
        }
    }
}

/// Validates the backend service configuration.
fn validate_backend(backend: &BackendConfig) -> Result<(), ConfigError> {
    if backend.base_url.is_empty() {
        return Err(ConfigError::Invalid("backend.base_url: must not be empty".to_string()));
    }
    let is_https = backend.base_url.starts_with("https://");
    let is_http = backend.base_url.starts_with("http://");
    if !is_https && !is_http {
        return Err(ConfigError::Invalid(
            "backend.base_url: must use the http or https scheme".to_string(),
        ));
    }
    if is_http && !backend.allow_http {
        return Err(ConfigError::Invalid(
            "backend.base_url: cleartext http requires backend.allow_http".to_string(),
        ));
    }
    if backend.timeout_ms < MIN_BACKEND_TIMEOUT_MS || backend.timeout_ms > MAX_BACKEND_TIMEOUT_MS {
        return Err(ConfigError::Invalid(format!(
            "backend.timeout_ms: must be in {MIN_BACKEND_TIMEOUT_MS}..={MAX_BACKEND_TIMEOUT_MS}"
        )));
    }
    if backend.max_response_bytes == 0 {
        return Err(ConfigError::Invalid(
            "backend.max_response_bytes: must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
