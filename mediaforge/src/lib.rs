//! mediaforge library crate.
//!
//! Media jobs over HTTP: operations are compiled into ffmpeg invocations,
//! tracked through a small lifecycle and announced to registered callbacks.

pub mod api;
pub mod captions;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod notification;
pub mod pipeline;
pub mod probe;
pub mod registry;
pub mod storage;
pub mod tts;

pub use error::{Error, Result};
