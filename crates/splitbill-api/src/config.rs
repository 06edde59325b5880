use anyhow::Context;
use serde::Deserialize;
use std::fs;
use tracing::{info, warn};

const DEFAULT_CONFIG: &str = r#"[environment]
env_type = "default"
[server]
host = "127.0.0.1"
port = 3000
[limits]
max_image_size_mb = 10
[extraction]
model = "gemini-2.0-flash"
"#;

#[derive(Deserialize, Debug, Clone)]
pub struct Environment {
    pub env_type: String,
}

impl Default for Environment {
    fn default() -> Self {
        Self { env_type: "default".to_string() }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct LimitsConfig {
    #[serde(default = "default_max_image_size_mb")]
    pub max_image_size_mb: usize,
}

impl LimitsConfig {
    pub fn max_image_bytes(&self) -> usize {
        self.max_image_size_mb * 1024 * 1024
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self { max_image_size_mb: default_max_image_size_mb() }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct ExtractionConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Empty means extraction requests fail with a configuration message
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key: String::new(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct SplitbillConfig {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
}

impl SplitbillConfig {
    /// Read the TOML file named by `SPLITBILL_CONFIG_PATH` (default
    /// `splitbill.toml`), falling back to built-in defaults when it is missing
    pub fn load() -> anyhow::Result<Self> {
        let config_path = std::env::var("SPLITBILL_CONFIG_PATH")
            .unwrap_or_else(|_| "splitbill.toml".to_string());

        let config_str = fs::read_to_string(&config_path).unwrap_or_else(|_| {
            warn!(
                "Configuration file '{}' not found. Using default configuration.",
                config_path
            );
            DEFAULT_CONFIG.to_string()
        });

        Self::from_toml(&config_str)
            .with_context(|| format!("Failed to parse configuration file '{config_path}'"))
    }

    pub fn from_toml(config_str: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(config_str)?)
    }

    pub fn apply_profile(mut self) -> Self {
        info!(
            "Applying configuration profile for '{}' environment.",
            self.environment.env_type
        );

        if let Ok(host) = std::env::var("SPLITBILL_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("SPLITBILL_PORT") {
            if let Ok(port_num) = port.parse::<u16>() {
                self.server.port = port_num;
            }
        }

        if let Ok(max_size) = std::env::var("SPLITBILL_MAX_IMAGE_SIZE_MB") {
            if let Ok(max_size_num) = max_size.parse::<usize>() {
                self.limits.max_image_size_mb = max_size_num;
            }
        }

        if let Ok(model) = std::env::var("SPLITBILL_GEMINI_MODEL") {
            self.extraction.model = model;
        }
        if let Ok(api_key) = std::env::var("SPLITBILL_GEMINI_API_KEY") {
            self.extraction.api_key = api_key;
        }
        if let Ok(timeout) = std::env::var("SPLITBILL_EXTRACTION_TIMEOUT_SECONDS") {
            if let Ok(timeout_num) = timeout.parse::<u64>() {
                self.extraction.timeout_seconds = timeout_num;
            }
        }

        self
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    3000
}
fn default_max_image_size_mb() -> usize {
    10
}
fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}
fn default_timeout_seconds() -> u64 {
    60
}
