//! Layered server configuration.
//!
//! Sources, lowest priority first:
//! 1. Built-in defaults
//! 2. YAML file passed with `--config`
//! 3. `ZTG_` environment variables, `__` separating nested keys
//!    (`ZTG_SERVER__BIND_ADDR=0.0.0.0:9000`, `ZTG_GUARD__SESSION_TTL_SECS=30`)

use std::net::SocketAddr;
use std::path::Path;

use anyhow::{Context, ensure};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use static_store_plugin::StaticStoreConfig;
use tenant_guard::TenantGuardConfig;

pub const ENV_PREFIX: &str = "ZTG_";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub guard: TenantGuardConfig,
    pub store: StaticStoreConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8087)),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    /// JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load defaults, then `path` (if given), then the environment.
    ///
    /// # Errors
    /// Returns an error if the file does not exist, any source fails to
    /// parse, or the guard settings are invalid.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            ensure!(
                path.is_file(),
                "config file {} does not exist",
                path.display()
            );
            figment = figment.merge(Yaml::file(path));
        }
        let config: Self = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("failed to load configuration")?;
        config
            .guard
            .validate()
            .context("invalid tenant guard configuration")?;
        Ok(config)
    }
}
