use std::fs;
use serde::Deserialize;
use crate::shared::errors::AppError;

/// Конфигурация приложения: базовая валюта, таймауты и прокси.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_base_currency")]
    pub base_currency: String,

    /// Static proxy endpoint. When unset the rotating free-proxy pool is
    /// used as fallback.
    #[serde(default)]
    pub proxy_url: Option<String>,

    /// Per-request timeout in seconds for marketplace fetches.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Timeout for the exchange-rate API.
    #[serde(default = "default_rate_timeout")]
    pub rate_timeout_secs: u64,

    /// Proxy rotation attempts before the final unprotected request.
    #[serde(default = "default_proxy_attempts")]
    pub proxy_attempts: usize,

    /// Tracked-query results younger than this are reused instead of
    /// re-fetched (unless forced).
    #[serde(default = "default_reuse_window")]
    pub reuse_window_secs: i64,
}

fn default_base_currency() -> String {
    "RUB".to_string()
}

fn default_request_timeout() -> u64 {
    12
}

fn default_rate_timeout() -> u64 {
    6
}

fn default_proxy_attempts() -> usize {
    5
}

fn default_reuse_window() -> i64 {
    3600
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_currency: default_base_currency(),
            proxy_url: None,
            request_timeout_secs: default_request_timeout(),
            rate_timeout_secs: default_rate_timeout(),
            proxy_attempts: default_proxy_attempts(),
            reuse_window_secs: default_reuse_window(),
        }
    }
}

/// Загрузчик конфигурации
pub struct ConfigLoader;

impl ConfigLoader {
    /// Загрузить конфигурацию из файла Config.toml
    pub fn load_config(path: &str) -> Result<AppConfig, AppError> {
        let config_content = fs::read_to_string(path)
            .map_err(|e| AppError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let mut config: AppConfig = toml::from_str(&config_content)
            .map_err(|e| AppError::ConfigError(format!("Failed to parse config file: {}", e)))?;

        if config.proxy_url.is_none() {
            config.proxy_url = std::env::var("PROXY_URL").ok();
        }
        Ok(config)
    }

    /// Default config with the PROXY_URL environment override applied.
    pub fn load_default() -> AppConfig {
        let mut config = AppConfig::default();
        config.proxy_url = std::env::var("PROXY_URL").ok();
        config
    }
}
