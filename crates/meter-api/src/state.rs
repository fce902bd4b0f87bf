//! Application state for the reading API

use std::path::{Path, PathBuf};
use std::sync::Arc;

use meter_core::{Alphabet, InferenceEngine, ReadingStore};

use crate::config::UploadConfig;

/// Application state shared across all handlers
///
/// Set up once at startup and read-only afterwards.
#[derive(Clone)]
pub struct AppState {
    /// Engine used for every upload
    engine: Arc<dyn InferenceEngine>,
    /// Absolute model path handed to the engine
    model_path: Arc<PathBuf>,
    /// Optional persistence; `None` runs without a store
    store: Option<Arc<dyn ReadingStore>>,
    alphabet: Arc<Alphabet>,
    upload: Arc<UploadConfig>,
}

impl AppState {
    /// Create a new AppState without a store
    pub fn new(
        engine: Arc<dyn InferenceEngine>,
        model_path: impl Into<PathBuf>,
        upload: UploadConfig,
    ) -> Self {
        Self {
            engine,
            model_path: Arc::new(model_path.into()),
            store: None,
            alphabet: Arc::new(Alphabet::default()),
            upload: Arc::new(upload),
        }
    }

    /// Attach a reading store
    pub fn with_store(mut self, store: Arc<dyn ReadingStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Replace the default alphabet
    pub fn with_alphabet(mut self, alphabet: Alphabet) -> Self {
        self.alphabet = Arc::new(alphabet);
        self
    }

    /// Get the engine Arc (for moving onto a blocking thread)
    pub fn engine(&self) -> Arc<dyn InferenceEngine> {
        self.engine.clone()
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn store(&self) -> Option<&Arc<dyn ReadingStore>> {
        self.store.as_ref()
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn upload(&self) -> &UploadConfig {
        &self.upload
    }
}
