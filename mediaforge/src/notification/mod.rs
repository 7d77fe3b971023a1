//! Completion notifications.
//!
//! A job with a registered callback produces at most one [`CompletionEvent`].
//! Delivery goes through the [`CompletionNotifier`] trait so the transport
//! (and its delivery guarantees) can be swapped without touching the engine.

mod dispatcher;
pub mod events;
mod webhook;

pub use dispatcher::Dispatcher;
pub use events::{CallbackTarget, CompletionEvent};
pub use webhook::WebhookNotifier;

use async_trait::async_trait;

use crate::Result;

/// Transport for completion events.
#[async_trait]
pub trait CompletionNotifier: Send + Sync {
    async fn notify(&self, target: &CallbackTarget, event: &CompletionEvent) -> Result<()>;
}
