//! Application configuration schemas.
//!
//! Configuration is deserialized from TOML files via the `config` crate,
//! overlaid with `CREATORHUB`-prefixed environment variables.

pub mod cache;
pub mod logging;

use serde::{Deserialize, Serialize};

use self::cache::CacheConfig;
use self::logging::LoggingConfig;

use crate::error::AppError;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Cache layer settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file, then an optional
    /// `config/{env}` overlay.
    ///
    /// Missing files are not an error; every field has a default. Values
    /// from environment variables prefixed with `CREATORHUB` take precedence.
    pub fn load(path: &str, env: Option<&str>) -> Result<Self, AppError> {
        let mut builder =
            config::Config::builder().add_source(config::File::with_name(path).required(false));
        if let Some(env) = env {
            builder =
                builder.add_source(config::File::with_name(&format!("config/{env}")).required(false));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("CREATORHUB")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }

    /// Reject values that deserialize but cannot work.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.cache.memory.max_capacity == 0 {
            return Err(AppError::validation("cache.memory.max_capacity must be > 0"));
        }
        if self.cache.redis.enabled && self.cache.redis.port == 0 {
            return Err(AppError::validation("cache.redis.port must be > 0"));
        }
        if self.cache.redis.command_timeout_ms == 0 || self.cache.redis.connect_timeout_ms == 0 {
            return Err(AppError::validation("cache.redis timeouts must be > 0"));
        }
        if !matches!(self.logging.format.as_str(), "json" | "pretty") {
            return Err(AppError::validation(format!(
                "logging.format must be \"json\" or \"pretty\", got \"{}\"",
                self.logging.format
            )));
        }
        Ok(())
    }
}
