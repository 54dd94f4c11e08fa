use std::net::SocketAddr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::{defaults, envconfig::EnvConfig, validate};

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub logging: LoggingConfig,
    pub database: Option<DatabaseConfig>,
    pub auth: AuthConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        <Self as EnvConfig>::from_env()
    }
}

impl EnvConfig for AppConfig {
    fn validate(&self) -> Result<()> {
        validate::validate(self)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneralConfig {
    pub host: String,
    pub port: u16,
}

impl GeneralConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid host/port {}:{}", self.host, self.port))
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            host: defaults::DEFAULT_HOST.to_string(),
            port: defaults::DEFAULT_PORT,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub rust_log: String,
    pub format: LogFormat,
    /// Include the module path of each event.
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            rust_log: defaults::DEFAULT_RUST_LOG.to_string(),
            format: LogFormat::default(),
            with_target: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_db_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_db_min_idle")]
    pub min_idle: u32,
}

/// Session and token lifetimes plus the optional admin seed.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    pub session_ttl_hours: i64,
    pub verification_ttl_hours: i64,
    pub reset_ttl_minutes: i64,
    /// Refuse login until the email address is verified.
    pub require_verified_email: bool,
    /// `0` disables the background sweep.
    pub sweep_interval_secs: u64,
    /// How long expired verification and reset rows are kept so they still report
    /// expired or already used. `0` keeps them forever; only sessions are swept.
    pub token_retention_hours: i64,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_hours: defaults::DEFAULT_SESSION_TTL_HOURS,
            verification_ttl_hours: defaults::DEFAULT_VERIFICATION_TTL_HOURS,
            reset_ttl_minutes: defaults::DEFAULT_RESET_TTL_MINUTES,
            require_verified_email: false,
            sweep_interval_secs: defaults::DEFAULT_SWEEP_INTERVAL_SECS,
            token_retention_hours: defaults::DEFAULT_TOKEN_RETENTION_HOURS,
            admin_email: None,
            admin_password: None,
        }
    }
}

fn default_db_max_connections() -> u32 {
    defaults::DEFAULT_DB_MAX_CONNECTIONS
}

fn default_db_min_idle() -> u32 {
    defaults::DEFAULT_DB_MIN_IDLE
}
