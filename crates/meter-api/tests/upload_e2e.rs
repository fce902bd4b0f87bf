//! E2E tests for the upload API using meter-client
//!
//! Each test spins up the real router on an ephemeral port with a mock
//! engine and a mock (or SQLite) store, then drives it over HTTP.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use meter_api::{create_router, AppState, UploadConfig};
use meter_client::testing::{RawResponse, TestServer};
use meter_client::{ErrorBody, MeterClientError};
use meter_core::{
    InferenceEngine, InferenceError, InferenceResult, Label, Prediction, ReadingStore,
    StoreConnection, StoreError, StoreResult,
};
use meter_store::{SqliteStore, StoreConfig};
use reqwest::multipart::{Form, Part};

// =============================================================================
// Mock Engine
// =============================================================================

/// Engine returning a fixed label sequence (or a fixed failure)
struct MockEngine {
    labels: Vec<Label>,
    fail: bool,
    calls: AtomicUsize,
}

impl MockEngine {
    fn reading(indices: &[i64]) -> Self {
        Self {
            labels: indices
                .iter()
                .map(|&i| Label::with_probability(i, 0.95))
                .collect(),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Index-only output, as from a model with decoding baked in
    fn indices_only(indices: &[i64]) -> Self {
        Self {
            labels: indices.iter().copied().map(Label::new).collect(),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    fn failing() -> Self {
        Self {
            labels: Vec::new(),
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl InferenceEngine for MockEngine {
    fn predict(&self, image_path: &Path, model_path: &Path) -> InferenceResult<Prediction> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(image_path.is_file(), "image must be staged before inference");
        assert_eq!(model_path, Path::new("/models/meter.onnx"));

        if self.fail {
            return Err(InferenceError::MalformedInput("not a meter photo".into()));
        }
        Ok(Prediction::single(self.labels.clone()))
    }
}

// =============================================================================
// Mock Store
// =============================================================================

#[derive(Clone, Copy, PartialEq)]
enum StoreMode {
    Healthy,
    Unreachable,
    RejectInsert,
}

/// Store recording rows in memory and tracking open connections
struct MockStore {
    mode: StoreMode,
    rows: Arc<Mutex<Vec<(String, NaiveDateTime)>>>,
    connects: AtomicUsize,
    open: Arc<AtomicUsize>,
}

impl MockStore {
    fn new(mode: StoreMode) -> Self {
        Self {
            mode,
            rows: Arc::new(Mutex::new(Vec::new())),
            connects: AtomicUsize::new(0),
            open: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn readings(&self) -> Vec<String> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .map(|(reading, _)| reading.clone())
            .collect()
    }

    fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    fn open_connections(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReadingStore for MockStore {
    async fn connect(&self) -> StoreResult<Box<dyn StoreConnection>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.mode == StoreMode::Unreachable {
            return Err(StoreError::Unavailable("connection refused".into()));
        }

        self.open.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockConnection {
            reject: self.mode == StoreMode::RejectInsert,
            rows: self.rows.clone(),
            open: self.open.clone(),
        }))
    }
}

struct MockConnection {
    reject: bool,
    rows: Arc<Mutex<Vec<(String, NaiveDateTime)>>>,
    open: Arc<AtomicUsize>,
}

#[async_trait]
impl StoreConnection for MockConnection {
    async fn insert_reading(&mut self, reading: &str, timestamp: NaiveDateTime) -> StoreResult<()> {
        if self.reject {
            return Err(StoreError::Query("Duplicate entry for key 'reading'".into()));
        }
        self.rows
            .lock()
            .unwrap()
            .push((reading.to_string(), timestamp));
        Ok(())
    }

    async fn close(self: Box<Self>) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}

// =============================================================================
// Test Helpers
// =============================================================================

struct Harness {
    server: TestServer,
    engine: Arc<MockEngine>,
    store: Option<Arc<MockStore>>,
    staging: tempfile::TempDir,
}

impl Harness {
    fn store(&self) -> &MockStore {
        self.store.as_deref().expect("harness has a store")
    }

    fn staged_files(&self) -> Vec<String> {
        std::fs::read_dir(self.staging.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    async fn post_form(&self, form: Form) -> RawResponse {
        self.server.post_upload(Some(form)).await.unwrap()
    }
}

async fn harness_with(
    engine: MockEngine,
    store: Option<MockStore>,
    configure: impl FnOnce(&mut UploadConfig),
) -> Harness {
    let staging = tempfile::tempdir().unwrap();
    let mut upload = UploadConfig::in_dir(staging.path());
    configure(&mut upload);

    let engine = Arc::new(engine);
    let store = store.map(Arc::new);

    let mut state = AppState::new(engine.clone(), "/models/meter.onnx", upload);
    if let Some(ref store) = store {
        state = state.with_store(store.clone());
    }

    let server = TestServer::start(create_router(state))
        .await
        .expect("Failed to start test server");

    Harness {
        server,
        engine,
        store,
        staging,
    }
}

async fn harness(engine: MockEngine, mode: StoreMode) -> Harness {
    harness_with(engine, Some(MockStore::new(mode)), |_| {}).await
}

fn image_part(file_name: &str) -> Part {
    Part::bytes(b"\x89PNG fake image bytes".to_vec()).file_name(file_name.to_string())
}

fn expect_server_error(result: meter_client::Result<meter_client::UploadResponse>) -> (u16, String) {
    match result {
        Err(MeterClientError::ServerError {
            status, message, ..
        }) => (status, message),
        other => panic!("expected server error, got {:?}", other),
    }
}

// =============================================================================
// Success Path
// =============================================================================

#[tokio::test]
async fn test_upload_persists_one_row() {
    // "0123.4" with blanks and padding mixed in
    let h = harness(MockEngine::reading(&[0, 37, 1, 2, -1, 3, 36, 4, 37]), StoreMode::Healthy).await;

    let response = h
        .server
        .client
        .upload_image("meter.png", b"fake".to_vec())
        .await
        .unwrap();

    assert_eq!(response.message, "Image processed successfully");
    assert_eq!(response.reading, "0123.4");
    assert_eq!(response.digits, vec!["0", "1", "2", "3", ".", "4"]);
    assert_eq!(response.digits.len(), response.reading.len());
    assert!((response.confidence - 0.95).abs() < 1e-6);

    assert_eq!(h.store().readings(), vec!["0123.4".to_string()]);
    assert_eq!(h.store().open_connections(), 0);
    assert_eq!(h.staged_files(), vec!["meter.png".to_string()]);
}

#[tokio::test]
async fn test_repeated_upload_adds_independent_rows() {
    let h = harness(MockEngine::reading(&[4, 2]), StoreMode::Healthy).await;

    for _ in 0..2 {
        let response = h
            .server
            .client
            .upload_image("meter.jpg", b"fake".to_vec())
            .await
            .unwrap();
        assert_eq!(response.reading, "42");
    }

    assert_eq!(h.store().readings(), vec!["42".to_string(), "42".to_string()]);
    assert_eq!(h.engine.calls(), 2);
    // Same sanitized name, so the second upload replaced the first
    assert_eq!(h.staged_files().len(), 1);
}

#[tokio::test]
async fn test_empty_prediction_has_zero_confidence() {
    let h = harness(MockEngine::reading(&[37, -1, 37]), StoreMode::Healthy).await;

    let response = h
        .server
        .client
        .upload_image("meter.jpeg", b"fake".to_vec())
        .await
        .unwrap();

    assert_eq!(response.reading, "");
    assert!(response.digits.is_empty());
    assert_eq!(response.confidence, 0.0);
    assert_eq!(h.store().readings(), vec![String::new()]);
}

#[tokio::test]
async fn test_index_only_engine_reports_zero_confidence() {
    let h = harness(MockEngine::indices_only(&[3, 37, 1, 4]), StoreMode::Healthy).await;

    let response = h
        .server
        .client
        .upload_image("meter.png", b"fake".to_vec())
        .await
        .unwrap();

    assert_eq!(response.reading, "314");
    assert_eq!(response.digits.len(), 3);
    assert_eq!(response.confidence, 0.0);
    assert_eq!(h.store().readings(), vec!["314".to_string()]);
}

#[tokio::test]
async fn test_filename_is_sanitized_before_staging() {
    let h = harness(MockEngine::reading(&[7]), StoreMode::Healthy).await;

    h.server
        .client
        .upload_image("../../Meter Photo.PNG", b"fake".to_vec())
        .await
        .unwrap();

    assert_eq!(h.staged_files(), vec!["Meter_Photo.PNG".to_string()]);
}

#[tokio::test]
async fn test_staged_file_removed_when_not_retained() {
    let h = harness_with(
        MockEngine::reading(&[1]),
        Some(MockStore::new(StoreMode::Healthy)),
        |upload| upload.retain_uploads = false,
    )
    .await;

    h.server
        .client
        .upload_image("meter.png", b"fake".to_vec())
        .await
        .unwrap();

    assert_eq!(h.engine.calls(), 1);
    assert!(h.staged_files().is_empty());
}

// =============================================================================
// Validation
// =============================================================================

#[tokio::test]
async fn test_disallowed_extensions_are_rejected_without_side_effects() {
    let h = harness(MockEngine::reading(&[1]), StoreMode::Healthy).await;

    for name in ["meter.gif", "notes.txt", "meter", "meter.png.exe"] {
        let (status, message) =
            expect_server_error(h.server.client.upload_image(name, b"fake".to_vec()).await);
        assert_eq!(status, 400, "{}", name);
        assert_eq!(message, "File type not allowed");
    }

    assert!(h.staged_files().is_empty());
    assert_eq!(h.engine.calls(), 0);
    assert_eq!(h.store().connects(), 0);
}

#[tokio::test]
async fn test_missing_image_field() {
    let h = harness(MockEngine::reading(&[1]), StoreMode::Healthy).await;

    let response = h.post_form(Form::new().part("photo", image_part("meter.png"))).await;
    assert_eq!(response.status, 400);
    assert_eq!(response.body, serde_json::json!({ "error": "No image provided" }));

    // A plain text field named "image" is not a file
    let response = h.post_form(Form::new().text("image", "meter.png")).await;
    assert_eq!(response.status, 400);
    assert_eq!(response.error(), Some("No image provided"));

    assert!(h.staged_files().is_empty());
    assert_eq!(h.store().connects(), 0);
}

#[tokio::test]
async fn test_non_multipart_request_is_missing_image() {
    let h = harness(MockEngine::reading(&[1]), StoreMode::Healthy).await;

    let response = h.server.post_upload(None).await.unwrap();
    assert_eq!(response.status, 400);
    assert!(response.is_json(), "{:?}", response);
    assert_eq!(response.body, serde_json::json!({ "error": "No image provided" }));

    assert_eq!(h.engine.calls(), 0);
    assert_eq!(h.store().connects(), 0);
}

#[tokio::test]
async fn test_empty_filename() {
    let h = harness(MockEngine::reading(&[1]), StoreMode::Healthy).await;

    let response = h.post_form(Form::new().part("image", image_part(""))).await;
    assert_eq!(response.status, 400);
    assert_eq!(response.error(), Some("No selected file"));
    assert!(h.staged_files().is_empty());
}

#[tokio::test]
async fn test_oversized_upload_is_rejected() {
    let h = harness_with(
        MockEngine::reading(&[1]),
        Some(MockStore::new(StoreMode::Healthy)),
        |upload| upload.max_bytes = 1024,
    )
    .await;

    let result = h
        .server
        .client
        .upload_image("meter.png", vec![0u8; 8 * 1024])
        .await;

    let err = result.err().expect("oversized upload must fail");
    assert_eq!(err.status(), Some(413));
    assert_eq!(h.engine.calls(), 0);
    assert!(h.staged_files().is_empty());
}

// =============================================================================
// Inference Failures
// =============================================================================

#[tokio::test]
async fn test_inference_failure_is_500() {
    let h = harness(MockEngine::failing(), StoreMode::Healthy).await;

    let (status, message) =
        expect_server_error(h.server.client.upload_image("meter.png", b"fake".to_vec()).await);

    assert_eq!(status, 500);
    assert!(message.starts_with("Error processing image:"), "{}", message);
    assert!(message.contains("not a meter photo"));
    assert_eq!(h.store().connects(), 0);
    // Staged regardless of the failure
    assert_eq!(h.staged_files(), vec!["meter.png".to_string()]);
}

#[tokio::test]
async fn test_staging_failure_is_a_processing_error() {
    let h = harness_with(
        MockEngine::reading(&[1]),
        Some(MockStore::new(StoreMode::Healthy)),
        |upload| upload.dir = upload.dir.join("not-created"),
    )
    .await;

    let (status, message) =
        expect_server_error(h.server.client.upload_image("meter.png", b"fake".to_vec()).await);

    assert_eq!(status, 500);
    assert!(message.starts_with("Error processing image:"), "{}", message);
    assert!(message.contains("meter.png"));
    assert_eq!(h.engine.calls(), 0);
    assert_eq!(h.store().connects(), 0);
}

#[tokio::test]
async fn test_out_of_alphabet_index_is_500() {
    let h = harness(MockEngine::reading(&[1, 99]), StoreMode::Healthy).await;

    let (status, message) =
        expect_server_error(h.server.client.upload_image("meter.png", b"fake".to_vec()).await);

    assert_eq!(status, 500);
    assert!(message.starts_with("Error processing image:"));
    assert!(h.store().readings().is_empty());
}

// =============================================================================
// Persistence
// =============================================================================

#[tokio::test]
async fn test_unreachable_store_still_returns_reading() {
    let h = harness(MockEngine::reading(&[5, 6]), StoreMode::Unreachable).await;

    let response = h
        .server
        .client
        .upload_image("meter.png", b"fake".to_vec())
        .await
        .unwrap();

    assert_eq!(response.reading, "56");
    assert_eq!(h.store().connects(), 1);
    assert!(h.store().readings().is_empty());
}

#[tokio::test]
async fn test_no_store_configured() {
    let h = harness_with(MockEngine::reading(&[3]), None, |_| {}).await;

    let response = h
        .server
        .client
        .upload_image("meter.png", b"fake".to_vec())
        .await
        .unwrap();
    assert_eq!(response.reading, "3");
}

#[tokio::test]
async fn test_rejected_insert_surfaces_reading_and_closes_connection() {
    let h = harness(MockEngine::reading(&[9, 8, 7]), StoreMode::RejectInsert).await;

    let response = h.post_form(Form::new().part("image", image_part("meter.png"))).await;
    assert_eq!(response.status, 500);

    let body: ErrorBody = serde_json::from_value(response.body).unwrap();
    assert!(body.error.contains("Duplicate entry"));
    assert_eq!(body.reading.as_deref(), Some("987"));
    assert!((body.confidence.unwrap() - 0.95).abs() < 1e-6);

    assert_eq!(h.store().connects(), 1);
    assert_eq!(h.store().open_connections(), 0);
    assert!(h.store().readings().is_empty());
}

#[tokio::test]
async fn test_sqlite_store_round_trip() {
    let db_dir = tempfile::tempdir().unwrap();
    let sqlite = SqliteStore::new(StoreConfig::at(db_dir.path().join("water_meter.db")));
    sqlite.init().unwrap();

    let staging = tempfile::tempdir().unwrap();
    let state = AppState::new(
        Arc::new(MockEngine::reading(&[1, 2, 3])),
        "/models/meter.onnx",
        UploadConfig::in_dir(staging.path()),
    )
    .with_store(Arc::new(sqlite.clone()));
    let server = TestServer::start(create_router(state)).await.unwrap();

    let response = server
        .client
        .upload_image("meter.png", b"fake".to_vec())
        .await
        .unwrap();

    let rows = sqlite.recent(10).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].reading, response.reading);
}

#[tokio::test]
async fn test_sqlite_store_missing_database_is_unreachable() {
    let db_dir = tempfile::tempdir().unwrap();
    let db_path = db_dir.path().join("never_created.db");
    let sqlite = SqliteStore::new(StoreConfig::at(&db_path));

    let staging = tempfile::tempdir().unwrap();
    let state = AppState::new(
        Arc::new(MockEngine::reading(&[4])),
        "/models/meter.onnx",
        UploadConfig::in_dir(staging.path()),
    )
    .with_store(Arc::new(sqlite));
    let server = TestServer::start(create_router(state)).await.unwrap();

    let response = server
        .client
        .upload_image("meter.png", b"fake".to_vec())
        .await
        .unwrap();

    assert_eq!(response.reading, "4");
    assert!(!db_path.exists());
}

#[tokio::test]
async fn test_health() {
    let h = harness(MockEngine::reading(&[]), StoreMode::Healthy).await;
    assert_eq!(h.server.client.health().await.unwrap(), "OK");
}
