//! # Configuration
//!
//! Application settings come from an optional TOML file, then `CARDIKIT_*`
//! environment variables override individual values.
//!
//! ```toml
//! [server]
//! addr = "0.0.0.0:8080"
//! workers = 8
//!
//! [security]
//! api_tokens = ["dev-token"]
//! require_tls = true
//!
//! [rate_limit]
//! max_requests = 60
//! window_secs = 60
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Field |
//! |---|---|
//! | `CARDIKIT_ADDR` | `server.addr` |
//! | `CARDIKIT_WORKERS` | `server.workers` |
//! | `CARDIKIT_MAX_BODY_BYTES` | `server.max_body_bytes` |
//! | `CARDIKIT_API_TOKENS` | `security.api_tokens` (comma separated) |
//! | `CARDIKIT_REQUIRE_TLS` | `security.require_tls` |
//! | `CARDIKIT_TRUST_PROXY` | `security.trust_proxy` |
//! | `CARDIKIT_RATE_LIMIT_MAX` | `rate_limit.max_requests` |
//! | `CARDIKIT_RATE_LIMIT_WINDOW_SECS` | `rate_limit.window_secs` |

use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value `{value}` for {key}")]
    InvalidEnv { key: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub addr: String,
    pub workers: usize,
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8080".to_string(),
            workers: 4,
            max_body_bytes: 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SecurityConfig {
    /// Tokens accepted by the auth gate. Empty means every gated route
    /// answers 401.
    pub api_tokens: Vec<String>,
    pub require_tls: bool,
    /// Honour `X-Forwarded-Proto`. Only enable behind a proxy that
    /// overwrites it.
    pub trust_proxy: bool,
    pub allow_loopback: bool,
    pub security_headers: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            api_tokens: Vec::new(),
            require_tls: false,
            trust_proxy: false,
            allow_loopback: true,
            security_headers: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CsrfConfig {
    pub enabled: bool,
    pub header: String,
    pub cookie: String,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            header: "x-csrf-token".to_string(),
            cookie: "csrf_token".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 60,
            window_secs: 60,
        }
    }
}

impl RateLimitConfig {
    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Full application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub security: SecurityConfig,
    pub csrf: CsrfConfig,
    pub rate_limit: RateLimitConfig,
}

impl AppConfig {
    /// Parse a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed TOML or unknown keys.
    pub fn from_toml_str(src: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(src).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Read a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] or [`ConfigError::Parse`].
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let src = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&src, path)
    }

    /// Load from `path` when given (defaults otherwise), then apply the
    /// process environment.
    ///
    /// # Errors
    ///
    /// Propagates file and environment errors.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `CARDIKIT_*` overrides read through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] for values that do not parse.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("CARDIKIT_ADDR") {
            self.server.addr = addr;
        }
        if let Some(v) = parse_env(&lookup, "CARDIKIT_WORKERS")? {
            self.server.workers = v;
        }
        if let Some(v) = parse_env(&lookup, "CARDIKIT_MAX_BODY_BYTES")? {
            self.server.max_body_bytes = v;
        }
        if let Some(tokens) = lookup("CARDIKIT_API_TOKENS") {
            self.security.api_tokens = tokens
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(v) = parse_env(&lookup, "CARDIKIT_REQUIRE_TLS")? {
            self.security.require_tls = v;
        }
        if let Some(v) = parse_env(&lookup, "CARDIKIT_TRUST_PROXY")? {
            self.security.trust_proxy = v;
        }
        if let Some(v) = parse_env(&lookup, "CARDIKIT_RATE_LIMIT_MAX")? {
            self.rate_limit.max_requests = v;
        }
        if let Some(v) = parse_env(&lookup, "CARDIKIT_RATE_LIMIT_WINDOW_SECS")? {
            self.rate_limit.window_secs = v;
        }
        Ok(())
    }
}

fn parse_env<F, T>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv {
                key: key.to_string(),
                value,
            }),
    }
}
