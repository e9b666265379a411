//! Configuration management for the stroke risk API

use crate::types::prediction::RiskThresholds;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;
use std::path::Path;

/// Default configuration file, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Prefix for `STROKE__SECTION__KEY` environment overrides
pub const ENV_PREFIX: &str = "STROKE";

/// Where the service is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Deployment {
    /// Local process, `.env` files honoured
    Local,
    /// Vercel serverless function, environment comes from the dashboard
    Vercel,
}

impl Deployment {
    /// Vercel sets `VERCEL_ENV` on every deployment
    pub fn detect() -> Self {
        Self::from_env(|key| std::env::var(key).ok())
    }

    pub fn from_env(var: impl Fn(&str) -> Option<String>) -> Self {
        if var("VERCEL_ENV").is_some() {
            Deployment::Vercel
        } else {
            Deployment::Local
        }
    }

    /// Hosted deployments never read `.env`
    pub fn is_hosted(&self) -> bool {
        !matches!(self, Deployment::Local)
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub models: ModelsConfig,
    pub risk: RiskThresholds,
    pub cors: CorsConfig,
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface or host name to bind
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        match self.host.parse::<IpAddr>() {
            Ok(IpAddr::V6(ip)) => format!("[{}]:{}", ip, self.port),
            _ => format!("{}:{}", self.host, self.port),
        }
    }

    /// Host must be an IP address or a DNS name; nothing is resolved here
    pub fn validate_host(&self) -> Result<()> {
        let host = self.host.as_str();
        if host.parse::<IpAddr>().is_ok() {
            return Ok(());
        }

        let valid_label = |label: &str| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        };
        if host.len() <= 253 && host.split('.').all(valid_label) {
            Ok(())
        } else {
            anyhow::bail!("server.host '{}' is neither an IP address nor a hostname", host)
        }
    }
}

/// Model artifact configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Directory containing the model artifacts (relative paths are searched)
    pub models_dir: String,
    /// Random forest ONNX file name
    pub random_forest_file: String,
    /// SVM ONNX file name
    pub svm_file: String,
    /// Scaling parameters JSON file name
    pub scaling_params_file: String,
    /// Number of threads for ONNX inference per model
    pub onnx_threads: usize,
    /// Model weights for score averaging (missing models weigh 1.0)
    #[serde(default)]
    pub weights: HashMap<String, f64>,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            models_dir: "models".to_string(),
            random_forest_file: "stroke_rf.onnx".to_string(),
            svm_file: "stroke_svm.onnx".to_string(),
            scaling_params_file: "scaling_params.json".to_string(),
            onnx_threads: 1,
            weights: HashMap::new(),
        }
    }
}

/// Cross-origin configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Comma-separated list of allowed origins (`*` allows any)
    pub allow_origins: String,
}

impl CorsConfig {
    /// Allowed origins with whitespace and blank entries removed
    pub fn origins(&self) -> Vec<String> {
        self.allow_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: "http://localhost:5173,http://127.0.0.1:5173".to_string(),
        }
    }
}

/// Metrics reporting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Seconds between logged summaries (0 disables the reporter)
    pub report_interval_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: LogFormat,
}

impl AppConfig {
    /// Load configuration from all layers, including the legacy deployment
    /// variables read from the process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut app_config = Self::load_from(path)?;
        app_config.apply_legacy_env(|key| std::env::var(key).ok())?;
        Ok(app_config)
    }

    /// Load configuration layered as defaults, file, then `STROKE__*` environment.
    ///
    /// An explicitly given file must exist; the default one is optional.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let defaults =
            Config::try_from(&AppConfig::default()).context("Failed to build default configuration")?;

        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_PATH).required(false),
        };

        let config = Config::builder()
            .add_source(defaults)
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Apply `ALLOW_ORIGINS`, `MODEL_DIR`, `HOST` and `PORT` overrides
    pub fn apply_legacy_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(origins) = var("ALLOW_ORIGINS") {
            self.cors.allow_origins = origins;
        }
        if let Some(models_dir) = var("MODEL_DIR") {
            self.models.models_dir = models_dir;
        }
        if let Some(host) = var("HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid PORT value '{}'", port))?;
        }
        Ok(())
    }

    /// Reject values the service cannot run with
    pub fn validate(&self) -> Result<()> {
        self.risk.validate().context("Invalid [risk] configuration")?;

        if self.models.onnx_threads == 0 {
            anyhow::bail!("models.onnx_threads must be at least 1");
        }
        for (model, weight) in &self.models.weights {
            if !weight.is_finite() || *weight < 0.0 {
                anyhow::bail!("Weight for model '{}' must be a non-negative number, got {}", model, weight);
            }
        }
        if self.server.host.trim().is_empty() {
            anyhow::bail!("server.host must not be empty");
        }
        self.server.validate_host()?;
        if self.logging.level.trim().is_empty() {
            anyhow::bail!("logging.level must not be empty");
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            models: ModelsConfig::default(),
            risk: RiskThresholds::default(),
            cors: CorsConfig::default(),
            metrics: MetricsConfig {
                report_interval_secs: 300,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: LogFormat::Pretty,
            },
        }
    }
}
