//! Configuration loading and resolution
//!
//! Process configuration (upstream credentials, endpoints, sheet URLs) is
//! resolved with ENV → TOML priority: environment variables are the
//! operational override, the TOML file is the durable default. When a value
//! is present in both sources a warning is logged and the environment wins.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Raw TOML configuration file contents (all fields optional)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlConfig {
    /// Upstream inventory API login endpoint
    pub login_url: Option<String>,
    /// Upstream inventory API search endpoint
    pub search_url: Option<String>,
    /// Upstream API login (user)
    pub api_login: Option<String>,
    /// Upstream API password
    pub api_senha: Option<String>,
    /// Fixed User-Agent header required by the upstream
    pub user_agent: Option<String>,
    /// Fixed Origin header required by the upstream
    pub origin: Option<String>,
    /// Fixed Referer header required by the upstream
    pub referer: Option<String>,
    /// Fixed Host header required by the upstream
    pub host_header: Option<String>,
    /// Published CSV URL of the lot reference sheet
    pub lot_sheet_url: Option<String>,
    /// Published CSV URL of the generic-product reference sheet
    pub generic_sheet_url: Option<String>,
    /// SQLite database path for the authoritative store
    pub database_path: Option<String>,
    /// HTTP bind address for the service
    pub bind_address: Option<String>,
    /// HTTP call timeout in seconds
    pub http_timeout_secs: Option<u64>,
    /// Cached credential time-to-live in seconds
    pub token_ttl_secs: Option<u64>,
    /// Cached reference-table time-to-live in seconds
    pub reference_ttl_secs: Option<u64>,
}

/// Fixed headers the upstream inventory API requires on every call
#[derive(Debug, Clone, Default)]
pub struct UpstreamHeaders {
    pub user_agent: Option<String>,
    pub origin: Option<String>,
    pub referer: Option<String>,
    pub host: Option<String>,
}

/// Fully-resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub login_url: String,
    pub search_url: String,
    pub api_login: String,
    pub api_senha: String,
    pub headers: UpstreamHeaders,
    pub lot_sheet_url: String,
    pub generic_sheet_url: String,
    pub database_path: PathBuf,
    pub bind_address: String,
    pub http_timeout: Duration,
    pub token_ttl: Duration,
    pub reference_ttl: Duration,
}

/// Default HTTP call timeout (transport failures are reported after this)
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 12;

/// Default credential TTL: safety margin under typical 30-minute bearer
/// lifetimes, so proactive refresh happens before the upstream rejects
const DEFAULT_TOKEN_TTL_SECS: u64 = 20 * 60;

/// Default reference-table TTL
const DEFAULT_REFERENCE_TTL_SECS: u64 = 5 * 60;

const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:5741";

impl ServiceConfig {
    /// Resolve the full configuration from environment + TOML.
    ///
    /// Missing required values (endpoints, credentials, sheet URLs) are a
    /// configuration error, fatal to the operation attempted and never retried.
    pub fn resolve(toml: &TomlConfig) -> Result<Self> {
        let login_url = require("ENDLOC_LOGIN_URL", &toml.login_url, "login_url")?;
        let search_url = require("ENDLOC_SEARCH_URL", &toml.search_url, "search_url")?;
        let api_login = require("ENDLOC_API_LOGIN", &toml.api_login, "api_login")?;
        let api_senha = require("ENDLOC_API_SENHA", &toml.api_senha, "api_senha")?;
        let lot_sheet_url = require("ENDLOC_LOT_SHEET_URL", &toml.lot_sheet_url, "lot_sheet_url")?;
        let generic_sheet_url = require(
            "ENDLOC_GENERIC_SHEET_URL",
            &toml.generic_sheet_url,
            "generic_sheet_url",
        )?;

        let headers = UpstreamHeaders {
            user_agent: optional("ENDLOC_USER_AGENT", &toml.user_agent),
            origin: optional("ENDLOC_ORIGIN", &toml.origin),
            referer: optional("ENDLOC_REFERER", &toml.referer),
            host: optional("ENDLOC_HOST_HEADER", &toml.host_header),
        };

        let database_path = optional("ENDLOC_DATABASE_PATH", &toml.database_path)
            .map(PathBuf::from)
            .unwrap_or_else(default_database_path);

        let bind_address = optional("ENDLOC_BIND_ADDRESS", &toml.bind_address)
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        Ok(Self {
            login_url,
            search_url,
            api_login,
            api_senha,
            headers,
            lot_sheet_url,
            generic_sheet_url,
            database_path,
            bind_address,
            http_timeout: Duration::from_secs(
                toml.http_timeout_secs.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
            ),
            token_ttl: Duration::from_secs(toml.token_ttl_secs.unwrap_or(DEFAULT_TOKEN_TTL_SECS)),
            reference_ttl: Duration::from_secs(
                toml.reference_ttl_secs.unwrap_or(DEFAULT_REFERENCE_TTL_SECS),
            ),
        })
    }
}

/// Resolve a required value with ENV → TOML priority
fn require(env_name: &str, toml_value: &Option<String>, field: &str) -> Result<String> {
    match optional(env_name, toml_value) {
        Some(value) => Ok(value),
        None => Err(Error::Config(format!(
            "{} not configured. Set the {} environment variable or `{}` in the TOML config file.",
            field, env_name, field
        ))),
    }
}

/// Resolve an optional value with ENV → TOML priority
fn optional(env_name: &str, toml_value: &Option<String>) -> Option<String> {
    let env_value = std::env::var(env_name).ok().filter(|v| !v.trim().is_empty());
    let toml_value = toml_value.as_ref().filter(|v| !v.trim().is_empty());

    if env_value.is_some() && toml_value.is_some() {
        warn!(
            "{} found in both environment and TOML config. Using environment (highest priority).",
            env_name
        );
    }

    env_value.or_else(|| toml_value.cloned())
}

/// Default configuration file path for the platform
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("endloc").join("endloc.toml"))
        .unwrap_or_else(|| PathBuf::from("endloc.toml"))
}

/// Default authoritative-store database path
fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("endloc").join("endloc.db"))
        .unwrap_or_else(|| PathBuf::from("endloc.db"))
}

/// Load the TOML configuration file, if present.
///
/// A missing file is not an error (the environment may carry the full
/// configuration); a malformed file is.
pub fn load_toml_config(path: &std::path::Path) -> Result<TomlConfig> {
    if !path.exists() {
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read config failed: {}", e)))?;

    toml::from_str(&content).map_err(|e| Error::Config(format!("Parse config failed: {}", e)))
}
