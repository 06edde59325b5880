use std::env;
use std::sync::Arc;

use anyhow::Context;
use splitbill_api::config::SplitbillConfig;
use splitbill_api::gemini::GeminiExtractor;
use splitbill_api::tracing_setup::{TracingConfig, init_tracing};
use splitbill_api::{AppState, create_app};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = env::args().collect::<Vec<_>>();
    if let Some(cmd) = args.get(1) {
        match cmd.as_str() {
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            _ => {
                eprintln!("Unknown command: {cmd}");
                print_help();
                return Ok(());
            }
        }
    }

    init_tracing(TracingConfig::from_environment())?;
    info!(version = env!("CARGO_PKG_VERSION"), "Starting splitbill");

    start_server().await
}

fn print_help() {
    println!("splitbill v{}", env!("CARGO_PKG_VERSION"));
    println!("Usage: splitbill");
    println!();
    println!("Starts the HTTP relay for one bill session.");
    println!();
    println!("Environment:");
    println!("  SPLITBILL_CONFIG_PATH      configuration file (default splitbill.toml)");
    println!("  SPLITBILL_HOST / _PORT     bind address overrides");
    println!("  SPLITBILL_GEMINI_API_KEY   key for receipt extraction");
    println!("  SPLITBILL_LOG_FORMAT       json or pretty");
}

async fn start_server() -> anyhow::Result<()> {
    let config = SplitbillConfig::load()?.apply_profile();
    if config.extraction.api_key.is_empty() {
        warn!("No Gemini API key configured; receipt uploads will fail");
    }

    let extractor = GeminiExtractor::new(&config.extraction)
        .context("Failed to create the receipt extractor")?;
    let addr = config.bind_address();
    info!(
        %addr,
        model = %config.extraction.model,
        max_image_size_mb = config.limits.max_image_size_mb,
        "Configuring web server"
    );

    let state = Arc::new(AppState::new(config, Arc::new(extractor)));
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Web server started successfully");
    axum::serve(listener, app).await?;

    Ok(())
}
