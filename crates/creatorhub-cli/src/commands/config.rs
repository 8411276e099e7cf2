//! Configuration management CLI commands.

use clap::{Args, Subcommand};

use crate::output::{self, OutputFormat};
use creatorhub_cache::TtlPolicy;
use creatorhub_cache::redis::mask_redis_url;
use creatorhub_core::config::AppConfig;
use creatorhub_core::error::AppError;

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show effective configuration
    Show,
    /// Validate configuration
    Validate,
    /// Write the default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "config/generated.toml")]
        output: String,
    },
}

/// Execute config commands
pub async fn execute(
    args: &ConfigArgs,
    config: &AppConfig,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        ConfigCommand::Show => {
            let mut shown = config.clone();
            if shown.cache.redis.password.is_some() {
                shown.cache.redis.password = Some("****".to_string());
            }
            output::print_item(&shown, format);
        }
        ConfigCommand::Validate => {
            if let Err(e) = config.validate() {
                output::print_error(&format!("Configuration invalid: {}", e));
                return Err(e);
            }

            let cache = &config.cache;
            let ttl = TtlPolicy::from_config(&cache.ttl);
            output::print_success(&format!("Configuration '{}' is valid", config_path));
            output::print_kv("Context", &cache.execution_context.to_string());
            output::print_kv(
                "Redis",
                &if cache.redis.enabled {
                    mask_redis_url(&cache.redis.connection_url())
                } else {
                    "disabled".to_string()
                },
            );
            output::print_kv("Local capacity", &cache.memory.max_capacity.to_string());
            output::print_kv("Default TTL", &format!("{}s", ttl.default_ttl().as_secs()));
            output::print_kv(
                "Pattern purge",
                if cache.local_pattern_invalidation {
                    "remote + local"
                } else {
                    "remote only"
                },
            );
        }
        ConfigCommand::Generate { output: out_path } => {
            let default_config = include_str!("../../../../config/default.toml");

            if let Some(parent) = std::path::Path::new(out_path).parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| AppError::internal(format!("Failed to create dir: {}", e)))?;
            }

            tokio::fs::write(out_path, default_config)
                .await
                .map_err(|e| AppError::internal(format!("Failed to write config: {}", e)))?;

            output::print_success(&format!("Default config written to '{}'", out_path));
        }
    }

    Ok(())
}
