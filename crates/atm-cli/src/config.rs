//! Configuration loading
//!
//! Sources, later ones winning:
//! 1. file passed with `--config`
//! 2. `config/default` and `config/local` (any format the `config` crate knows)
//! 3. `ATM__`-prefixed environment variables, `__` between sections,
//!    e.g. `ATM__LIMITS__DAILY_DEPOSIT=2500`
//!
//! Command-line flags are applied on top by `main`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use atm_core::AtmConfig;

/// Everything the binary needs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Account, security, limits and currency sections
    #[serde(flatten)]
    pub atm: AtmConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (json, compact, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,

    /// File the audit log is appended to
    #[serde(default = "default_log_file")]
    pub file: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: default_log_file(),
        }
    }
}

fn default_log_level() -> String {
    "debug".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_log_file() -> PathBuf {
    PathBuf::from("atm.log")
}

impl CliConfig {
    /// Load configuration from files and environment
    pub fn load(config_path: Option<&str>) -> anyhow::Result<Self> {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let mut builder = config::Config::builder();

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false));

        builder = builder.add_source(
            config::Environment::with_prefix("ATM")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let cli_config: CliConfig = config.try_deserialize()?;

        Ok(cli_config)
    }
}
