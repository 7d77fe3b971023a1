//! REST API server module.
//!
//! Thin HTTP surface over the job engine: uploads, operation submission,
//! status polling, downloads and callback registration.

pub mod error;
pub mod models;
pub mod routes;
pub mod server;

pub use server::{ApiServer, ApiServerConfig, AppState};
