//! Water-meter reading service client
//!
//! Provides a typed HTTP client for the reading service.
//!
//! # Example
//!
//! ```rust,no_run
//! use meter_client::MeterClient;
//!
//! # async fn run() -> meter_client::Result<()> {
//! let client = MeterClient::new("http://localhost:5000")?;
//!
//! let photo = std::fs::read("meter.jpg")?;
//! let response = client.upload_image("meter.jpg", photo).await?;
//! println!("{} ({:.2})", response.reading, response.confidence);
//! # Ok(())
//! # }
//! ```
//!
//! # Testing
//!
//! The `testing` module runs a router on an ephemeral port:
//!
//! ```rust,ignore
//! use meter_client::testing::TestServer;
//! use meter_api::{create_router, AppState};
//!
//! let server = TestServer::start(create_router(state)).await?;
//! let response = server.client.upload_image("meter.png", bytes).await?;
//! ```

mod client;
mod error;
pub mod testing;
mod types;

pub use client::MeterClient;
pub use error::{MeterClientError, Result};
pub use types::*;
