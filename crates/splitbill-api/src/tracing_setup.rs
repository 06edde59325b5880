//! Structured logging setup
//!
//! JSON lines in production, human-readable output during development. The
//! filter comes from `RUST_LOG` when set.

use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "splitbill_api=debug,splitbill_core=debug,splitbill_calculator=info,tower_http=debug,info";

/// Output format of the log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Configuration for structured logging
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Service name attached to the startup record
    pub service_name: String,
    /// Service version
    pub service_version: String,
    /// Environment (dev, staging, prod)
    pub environment: String,
    pub format: LogFormat,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            service_name: "splitbill-api".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl TracingConfig {
    /// Create configuration from environment variables
    pub fn from_environment() -> Self {
        let environment = std::env::var("SPLITBILL_ENVIRONMENT")
            .unwrap_or_else(|_| "development".to_string());
        let format = match std::env::var("SPLITBILL_LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            Ok("pretty") => LogFormat::Pretty,
            _ if environment == "production" => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Self {
            service_name: std::env::var("SPLITBILL_SERVICE_NAME")
                .unwrap_or_else(|_| "splitbill-api".to_string()),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            environment,
            format,
        }
    }
}

/// Install the global subscriber
pub fn init_tracing(config: TracingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());

    let (json_layer, pretty_layer) = match config.format {
        LogFormat::Json => {
            (Some(tracing_subscriber::fmt::layer().json().with_current_span(true)), None)
        }
        LogFormat::Pretty => (None, Some(tracing_subscriber::fmt::layer().with_target(false))),
    };

    tracing_subscriber::registry().with(filter).with(json_layer).with(pretty_layer).try_init()?;

    info!(
        service_name = %config.service_name,
        service_version = %config.service_version,
        environment = %config.environment,
        format = ?config.format,
        "Tracing initialized"
    );
    Ok(())
}
