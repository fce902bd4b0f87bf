//! HTTP request handlers
//!
//! Handlers only talk to the engine and store traits held in
//! [`AppState`](crate::AppState).

pub mod upload;
