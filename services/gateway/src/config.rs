//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The admin token is loaded from the GATEWAY_ADMIN_TOKEN env var or
//! admin_token_file, never stored in the TOML directly to avoid leaking
//! secrets. Base provider settings live under `[providers.<type>]` as open
//! tables; record credential fields are merged over them at resolution and
//! probe time.

use common::Secret;
use serde::Deserialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use provider_pool::BaseConfigs;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub pool: PoolConfig,
    /// Base provider configuration per type, merged under pool records
    #[serde(default)]
    pub providers: HashMap<String, serde_json::Map<String, serde_json::Value>>,
}

/// HTTP server settings
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    #[serde(skip)]
    pub admin_token: Option<Secret<String>>,
    /// Path to a file containing the admin token (alternative to
    /// GATEWAY_ADMIN_TOKEN env var)
    #[serde(default)]
    pub admin_token_file: Option<PathBuf>,
}

/// Provider pool settings
#[derive(Debug, Deserialize)]
pub struct PoolConfig {
    #[serde(default = "default_pool_file")]
    pub file: PathBuf,
    #[serde(default = "default_max_error_count")]
    pub max_error_count: u32,
    #[serde(default = "default_health_check_interval_ms")]
    pub health_check_interval_ms: u64,
    #[serde(default = "default_save_debounce_ms")]
    pub save_debounce_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            file: default_pool_file(),
            max_error_count: default_max_error_count(),
            health_check_interval_ms: default_health_check_interval_ms(),
            save_debounce_ms: default_save_debounce_ms(),
        }
    }
}

fn default_max_connections() -> usize {
    1000
}

fn default_pool_file() -> PathBuf {
    PathBuf::from("providers.json")
}

fn default_max_error_count() -> u32 {
    3
}

fn default_health_check_interval_ms() -> u64 {
    600_000
}

fn default_save_debounce_ms() -> u64 {
    1000
}

impl PoolConfig {
    pub fn health_check_interval(&self) -> Duration {
        Duration::from_millis(self.health_check_interval_ms)
    }

    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// Admin token resolution order:
    /// 1. GATEWAY_ADMIN_TOKEN env var
    /// 2. admin_token_file path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if config.server.max_connections == 0 {
            return Err(common::Error::Config(
                "max_connections must be greater than 0".into(),
            ));
        }
        if config.pool.max_error_count == 0 {
            return Err(common::Error::Config(
                "max_error_count must be greater than 0".into(),
            ));
        }
        if config.pool.health_check_interval_ms == 0 {
            return Err(common::Error::Config(
                "health_check_interval_ms must be greater than 0".into(),
            ));
        }
        if config.pool.save_debounce_ms == 0 {
            return Err(common::Error::Config(
                "save_debounce_ms must be greater than 0".into(),
            ));
        }

        // Resolve admin token: env var takes precedence over file
        if let Ok(token) = std::env::var("GATEWAY_ADMIN_TOKEN") {
            config.server.admin_token = Some(Secret::new(token));
        } else if let Some(ref token_file) = config.server.admin_token_file {
            config.server.admin_token = Secret::read_from_file(token_file)?;
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("provider-gateway.toml")
    }

    /// Base provider configurations in the form the pool core consumes.
    pub fn base_configs(&self) -> BaseConfigs {
        self.providers.clone()
    }
}
