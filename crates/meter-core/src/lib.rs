//! meter-core - Core traits and types for the water-meter reading service
//!
//! This crate defines the seams the HTTP layer is written against:
//! - [`InferenceEngine`] turns a staged image into label indices
//! - [`ReadingStore`] persists decoded readings
//! - [`Alphabet`] decodes label indices into a textual reading
//!
//! Concrete engines and stores live in their own crates (`meter-infer`,
//! `meter-store`) so the API layer stays implementation-agnostic.

pub mod alphabet;
pub mod engine;
pub mod error;
pub mod models;
pub mod store;

pub use alphabet::{Alphabet, NO_PREDICTION};
pub use engine::{InferenceEngine, Label, Prediction};
pub use error::{InferenceError, InferenceResult, StoreError, StoreResult};
pub use models::{DecodedReading, ReadingRecord};
pub use store::{ReadingStore, StoreConnection};
