//! CLI command definitions and dispatch.

pub mod cache;
pub mod config;

use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::output::{self, OutputFormat};
use creatorhub_cache::CacheCoordinator;
use creatorhub_core::config::AppConfig;
use creatorhub_core::error::AppError;

/// CreatorHub cache administration
#[derive(Debug, Parser)]
#[command(name = "creatorhub", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Environment overlay loaded from `config/{env}.toml`
    #[arg(short, long)]
    pub env: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Inspect and purge the cache
    Cache(cache::CacheArgs),
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self, config: AppConfig) -> Result<(), AppError> {
        match &self.command {
            Commands::Cache(args) => cache::execute(args, &config, self.format).await,
            Commands::Config(args) => {
                config::execute(args, &config, &self.config, self.format).await
            }
        }
    }
}

/// Helper: load configuration from file
pub fn load_config(config_path: &str, env: Option<&str>) -> Result<AppConfig, AppError> {
    AppConfig::load(config_path, env)
}

/// Helper: build the cache and give the remote tier up to `wait` to connect
pub async fn build_cache(config: &AppConfig, wait: Duration) -> Result<CacheCoordinator, AppError> {
    let cache = CacheCoordinator::from_config(&config.cache)?;

    if cache.remote_status().is_some() && !cache.wait_remote_ready(wait).await {
        output::print_warning(&format!(
            "Redis not ready after {}ms, using local tier only",
            wait.as_millis()
        ));
    }

    Ok(cache)
}
