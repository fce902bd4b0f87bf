//! meterd - Water-meter reading daemon
//!
//! Serves `POST /upload`: a photo of a seven-segment meter goes in, the
//! decoded reading comes out and is appended to the reading store.
//!
//! Usage:
//!   meterd [--config meterd.toml] [--model model.onnx] [--host 0.0.0.0] [--port 5000]

mod config;
mod model;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use meter_api::{create_router, AppState};
use meter_infer::TractEngine;
use meter_store::SqliteStore;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::ServiceConfig;

const DEFAULT_FILTER: &str =
    "meterd=info,meter_api=info,meter_infer=info,meter_store=info,tower_http=info";

#[derive(Parser)]
#[command(name = "meterd")]
#[command(version, about = "Water-meter reading service")]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Model file, overrides [model].path
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Listen address, overrides [server].host
    #[arg(long)]
    host: Option<String>,

    /// Listen port, overrides [server].port
    #[arg(short, long)]
    port: Option<u16>,

    /// Log as JSON lines
    #[arg(long)]
    log_json: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);

    tracing::info!("Starting meterd (water-meter reading service)");

    let mut config = match args.config {
        Some(ref path) => {
            tracing::info!("Loading config from: {}", path.display());
            ServiceConfig::load(path)?
        }
        None => ServiceConfig::default(),
    };
    if let Some(model) = args.model {
        config.model.path = model;
    }
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let cwd = std::env::current_dir().context("Failed to determine working directory")?;
    let model_path = match model::resolve_model(&config.model.path, &cwd) {
        Ok(path) => path,
        Err(missing) => {
            eprintln!("{}", missing);
            std::process::exit(1);
        }
    };
    tracing::info!(model = %model_path.display(), "Using model");

    config.upload.create_staging_dir().with_context(|| {
        format!(
            "Failed to create upload directory: {}",
            config.upload.dir.display()
        )
    })?;

    let engine = TractEngine::new(config.model.clone());
    // Warm the plan cache; a broken model still starts the service and fails per request
    if let Err(e) = engine.load(&model_path) {
        tracing::warn!(error = %e, "Model could not be loaded at startup");
    }

    let mut state = AppState::new(Arc::new(engine), model_path, config.upload.clone());

    if config.store.enabled {
        let store = SqliteStore::new(config.store.clone());
        match store.init() {
            Ok(()) => tracing::info!(path = %store.path().display(), "Reading store ready"),
            Err(e) => tracing::warn!(
                path = %store.path().display(),
                error = %e,
                "Reading store unavailable, readings will not be persisted until it is"
            ),
        }
        state = state.with_store(Arc::new(store));
    } else {
        tracing::info!("Reading store disabled");
    }

    let app = create_router(state);

    let addr = config.server.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
