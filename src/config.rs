use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub alpaca: AlpacaConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlpacaConfig {
    /// Trading API endpoint (paper sandbox by default)
    #[serde(default = "default_trading_url")]
    pub trading_url: String,
    /// Market data API endpoint
    #[serde(default = "default_data_url")]
    pub data_url: String,
    /// API key id; usually supplied via APCA_API_KEY_ID
    #[serde(default)]
    pub api_key: Option<String>,
    /// API secret; usually supplied via APCA_API_SECRET_KEY
    #[serde(default)]
    pub api_secret: Option<String>,
}

fn default_trading_url() -> String {
    "https://paper-api.alpaca.markets".to_string()
}

fn default_data_url() -> String {
    "https://data.alpaca.markets".to_string()
}

impl Default for AlpacaConfig {
    fn default() -> Self {
        Self {
            trading_url: default_trading_url(),
            data_url: default_data_url(),
            api_key: None,
            api_secret: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    /// Polling interval while waiting for cancellations to confirm (ms)
    #[serde(default = "default_cancel_poll_ms")]
    pub cancel_poll_ms: u64,
    /// Upper bound on waiting for cancellations to confirm (ms)
    #[serde(default = "default_cancel_timeout_ms")]
    pub cancel_timeout_ms: u64,
    /// Pause between successive closes during bulk liquidation (ms)
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
}

fn default_cancel_poll_ms() -> u64 {
    250
}

fn default_cancel_timeout_ms() -> u64 {
    5000
}

fn default_pacing_ms() -> u64 {
    500
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            cancel_poll_ms: default_cancel_poll_ms(),
            cancel_timeout_ms: default_cancel_timeout_ms(),
            pacing_ms: default_pacing_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Override with environment variables (PAPERTRADER_EXECUTION__PACING_MS, etc.)
            .add_source(
                Environment::with_prefix("PAPERTRADER")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.execution.cancel_poll_ms == 0 {
            errors.push("cancel_poll_ms must be positive".to_string());
        }

        if self.execution.cancel_timeout_ms < self.execution.cancel_poll_ms {
            errors.push("cancel_timeout_ms must be at least cancel_poll_ms".to_string());
        }

        if self.alpaca.trading_url.is_empty() {
            errors.push("alpaca.trading_url must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
