//! loopy-api entry point.
//!
//! Loads settings from the environment and `.env`, initializes tracing, builds the
//! MongoDB-backed debug probe, sets up the Axum router and starts the HTTP server.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use loopy_api::config::{
    LogFormat, Settings, DEBUG_PROBE_TIMEOUT_SECS, DEFAULT_ENV_FILE, DEFAULT_LOG_FILTER,
};
use loopy_api::http::start_server;
use loopy_api::store::MongoConnector;
use loopy_api::{create_router, AppState, DebugProbe};

/// loopy-api: health and diagnostics for the CGM data API
#[derive(Parser, Debug)]
#[command(name = "loopy-api", version, about)]
struct Args {
    /// Path to a .env file (ignored if missing)
    #[arg(short, long, default_value = DEFAULT_ENV_FILE)]
    env_file: String,

    /// Log level filter (e.g., "loopy_api=debug,tower_http=info")
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let settings = Settings::load(Some(Path::new(&args.env_file)));

    // Initialize tracing with priority: CLI > env > default
    let log_filter = args
        .log_level
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
    let log_format = settings
        .as_ref()
        .map(|s| s.log_format)
        .unwrap_or_default();
    init_tracing(&log_filter, log_format);

    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    match run(settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Server terminated with error");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(filter: &str, format: LogFormat) {
    let registry =
        tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::new(filter));

    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

async fn run(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        database = %settings.mongodb_database,
        uri_template = %settings.mongodb_uri_template,
        cors_origins = ?settings.cors_origin_list(),
        api_key_configured = settings.api_key_configured,
        "Loaded configuration"
    );

    if !settings.api_key_configured {
        tracing::info!("API_KEY not set, generated a random key for this process");
    }
    if settings.api_reload {
        tracing::warn!("API_RELOAD is set but hot reload is not supported, ignoring");
    }

    let addr = settings.bind_addr().await?;

    let probe_timeout = Duration::from_secs(DEBUG_PROBE_TIMEOUT_SECS);
    let probe = DebugProbe::new(Arc::new(MongoConnector::new(probe_timeout)), probe_timeout);

    let state = AppState::new(settings, probe);
    let app = create_router(state);

    start_server(app, addr).await?;
    Ok(())
}
