//! meter-api - HTTP layer of the water-meter reading service
//!
//! Exposes `POST /upload`, which stages an uploaded meter photo, runs it
//! through an [`InferenceEngine`](meter_core::InferenceEngine), decodes the
//! reading and stores it in a [`ReadingStore`](meter_core::ReadingStore)
//! when one is reachable.
//!
//! # Usage
//!
//! ```ignore
//! use meter_api::{create_router, AppState, UploadConfig};
//!
//! let state = AppState::new(engine, model_path, UploadConfig::default()).with_store(store);
//! let router = create_router(state);
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod staging;
pub mod state;

pub use config::UploadConfig;
pub use error::ApiError;
pub use state::AppState;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Create the reading service router with the given application state
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let max_bytes = state.upload().max_bytes;

    Router::new()
        // Health check
        .route("/health", get(|| async { "OK" }))
        .route("/upload", post(handlers::upload::upload_image))
        // Oversized bodies are rejected with 413 before the handler reads them
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
