//! Configuration for the clinical gateway.

use std::time::Duration;

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;

/// Main configuration structure for the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    /// Model adapter endpoints. Unset slots answer with `model_unavailable`.
    #[serde(default)]
    pub adapters: AdaptersConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Request policy applied by the prediction gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Upper bound for a single adapter call, including slot acquisition.
    #[serde(default = "default_deadline_ms")]
    pub deadline_ms: u64,
    /// Largest accepted image upload in bytes.
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,
    /// Predictions above this value must carry recommended tests.
    #[serde(default = "default_recommendation_threshold")]
    pub recommendation_threshold: f64,
}

impl GatewayConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            deadline_ms: default_deadline_ms(),
            max_image_bytes: default_max_image_bytes(),
            recommendation_threshold: default_recommendation_threshold(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Fallback filter when RUST_LOG is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins; a single "*" allows any origin.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AdaptersConfig {
    pub tabular: Option<RemoteAdapterConfig>,
    pub chest_xray: Option<RemoteAdapterConfig>,
    pub skin_cancer: Option<RemoteAdapterConfig>,
    pub brain_tumor: Option<RemoteAdapterConfig>,
}

/// An HTTP model-serving endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteAdapterConfig {
    /// Full URL the request is POSTed to (e.g. "http://localhost:8000/predict").
    pub url: String,
    /// Maximum in-flight calls to this endpoint. Unset means unbounded.
    #[serde(default)]
    pub max_concurrent: Option<usize>,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_deadline_ms() -> u64 {
    5_000
}
fn default_max_image_bytes() -> usize {
    10 * 1024 * 1024
}
fn default_recommendation_threshold() -> f64 {
    0.5
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}
fn default_connect_timeout_ms() -> u64 {
    1_000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            gateway: GatewayConfig::default(),
            logging: LoggingConfig::default(),
            cors: CorsConfig::default(),
            adapters: AdaptersConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Configuration sources (in order of precedence):
    /// 1. Environment variables (GATEWAY__SECTION__KEY format)
    /// 2. config.toml file (if present)
    /// 3. Built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Same as [`Config::load`] with an explicit file base name.
    pub fn load_from(file: &str) -> Result<Self, ConfigError> {
        let config = ConfigLoader::builder()
            .set_default("api.host", default_host())?
            .set_default("api.port", default_port() as i64)?
            .set_default("gateway.deadline_ms", default_deadline_ms() as i64)?
            .set_default("gateway.max_image_bytes", default_max_image_bytes() as i64)?
            .set_default("gateway.recommendation_threshold", default_recommendation_threshold())?
            .add_source(File::with_name(file).required(false))
            .add_source(
                Environment::with_prefix("GATEWAY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.gateway.deadline_ms == 0 {
            return Err(ConfigError::Message(
                "gateway.deadline_ms must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.gateway.recommendation_threshold) {
            return Err(ConfigError::Message(
                "gateway.recommendation_threshold must be within [0, 1]".to_string(),
            ));
        }
        let slots = [
            ("tabular", &self.adapters.tabular),
            ("chest_xray", &self.adapters.chest_xray),
            ("skin_cancer", &self.adapters.skin_cancer),
            ("brain_tumor", &self.adapters.brain_tumor),
        ];
        for (name, slot) in slots {
            if let Some(adapter) = slot {
                if adapter.max_concurrent == Some(0) {
                    return Err(ConfigError::Message(format!(
                        "adapters.{}.max_concurrent must be greater than zero",
                        name
                    )));
                }
            }
        }
        Ok(())
    }
}
