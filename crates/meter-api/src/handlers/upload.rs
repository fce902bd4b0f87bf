//! Meter photo upload handler
//!
//! `POST /upload` with a multipart file part named `image`. The photo is
//! staged, recognized, decoded into a reading and persisted when a store is
//! reachable. Persistence is best-effort: an unreachable store only costs
//! durability, while a store that rejects the insert is reported as an error
//! carrying the reading anyway.

use std::path::PathBuf;

use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::Json;
use chrono::Local;
use meter_core::{DecodedReading, InferenceError, StoreConnection};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::staging::{self, UploadRejection};
use crate::state::AppState;

/// Name of the multipart file part carrying the photo
pub const IMAGE_FIELD: &str = "image";

/// Response for a processed upload
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    /// Decoded meter value
    pub reading: String,
    /// One entry per character of `reading`
    pub digits: Vec<String>,
    /// Mean probability of the decoded symbols
    ///
    /// 0 for an empty reading, and also for a non-empty reading from an
    /// engine that reports label indices without probabilities.
    pub confidence: f32,
}

/// POST /upload
/// Recognize the reading on an uploaded meter photo
pub async fn upload_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    // Not a multipart body at all, so there is no image field either
    let mut multipart = multipart.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Upload is not a multipart request");
        ApiError::from(UploadRejection::MissingFile)
    })?;
    let (original_name, data) = read_image_field(&mut multipart).await?;
    let file_name = staging::validate_filename(&original_name, &state.upload().allowed_extensions)?;

    let path = staging::stage(&state.upload().dir, &file_name, &data)
        .await
        .map_err(|e| {
            tracing::warn!(file = %file_name, error = %e, "Failed to stage upload");
            ApiError::Processing(format!("failed to stage {}: {}", file_name, e))
        })?;

    tracing::info!(file = %file_name, size = data.len(), "Upload staged");

    let decoded = recognize(&state, path.clone()).await;

    if !state.upload().retain_uploads {
        if let Err(e) = tokio::fs::remove_file(&path).await {
            tracing::warn!(file = %path.display(), error = %e, "Failed to remove staged upload");
        }
    }

    let decoded = decoded.map_err(|e| {
        tracing::warn!(file = %file_name, error = %e, "Recognition failed");
        ApiError::Processing(e.to_string())
    })?;

    tracing::info!(
        file = %file_name,
        reading = %decoded.reading,
        confidence = decoded.confidence,
        "Image processed"
    );

    if let Some(connection) = open_store(&state).await {
        persist(connection, &decoded).await?;
    }

    let DecodedReading {
        reading,
        digits,
        confidence,
    } = decoded;

    Ok(Json(UploadResponse {
        message: "Image processed successfully".to_string(),
        reading,
        digits,
        confidence,
    }))
}

/// Pull the first file part named [`IMAGE_FIELD`] out of the form
///
/// Non-file parts with that name do not count as an image.
async fn read_image_field(multipart: &mut Multipart) -> Result<(String, Bytes), ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };

        let data = field.bytes().await?;
        return Ok((file_name, data));
    }

    Err(UploadRejection::MissingFile.into())
}

/// Run the engine on a blocking thread and decode its first sequence
async fn recognize(state: &AppState, image_path: PathBuf) -> Result<DecodedReading, InferenceError> {
    let engine = state.engine();
    let model_path = state.model_path().to_path_buf();

    let prediction = tokio::task::spawn_blocking(move || engine.predict(&image_path, &model_path))
        .await
        .map_err(|e| InferenceError::Internal(format!("inference task failed: {}", e)))??;

    state.alphabet().decode(prediction.first())
}

/// Open a store connection, or `None` if there is no reachable store
async fn open_store(state: &AppState) -> Option<Box<dyn StoreConnection>> {
    let store = state.store()?;

    match store.connect().await {
        Ok(connection) => Some(connection),
        Err(e) => {
            tracing::warn!(error = %e, "Reading store unavailable, skipping persistence");
            None
        }
    }
}

/// Insert the reading and release the connection on every path
async fn persist(
    mut connection: Box<dyn StoreConnection>,
    decoded: &DecodedReading,
) -> Result<(), ApiError> {
    let result = connection
        .insert_reading(&decoded.reading, Local::now().naive_local())
        .await;
    connection.close().await;

    match result {
        Ok(()) => {
            tracing::info!(reading = %decoded.reading, "Reading stored");
            Ok(())
        }
        Err(e) => Err(ApiError::Persistence {
            message: e.to_string(),
            reading: decoded.reading.clone(),
            confidence: decoded.confidence,
        }),
    }
}
