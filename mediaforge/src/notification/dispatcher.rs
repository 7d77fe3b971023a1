//! Best-effort, at-most-once delivery of completion events.

use std::sync::Arc;

use tokio_util::task::TaskTracker;
use tracing::{info, warn};

use super::CompletionNotifier;
use super::events::{CallbackTarget, CompletionEvent};

/// Sends completion events through a [`CompletionNotifier`].
///
/// Failures are logged and dropped. Nothing is retried.
#[derive(Clone)]
pub struct Dispatcher {
    notifier: Arc<dyn CompletionNotifier>,
    tracker: TaskTracker,
}

impl Dispatcher {
    pub fn new(notifier: Arc<dyn CompletionNotifier>, tracker: TaskTracker) -> Self {
        Self { notifier, tracker }
    }

    /// Deliver in the background; the caller never waits on the network.
    pub fn dispatch(&self, target: CallbackTarget, event: CompletionEvent) {
        let this = self.clone();
        self.tracker.spawn(async move {
            this.deliver(&target, &event).await;
        });
    }

    /// Deliver and wait for the outcome. Returns whether the target accepted it.
    pub async fn deliver(&self, target: &CallbackTarget, event: &CompletionEvent) -> bool {
        match self.notifier.notify(target, event).await {
            Ok(()) => {
                info!(job_id = %event.id, status = %event.status, "Completion notification sent");
                true
            }
            Err(e) => {
                warn!(
                    job_id = %event.id,
                    url = %target.url,
                    error = %e,
                    "Completion notification failed, not retrying"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::JobStatus;
    use crate::{Error, Result};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recording {
        sent: Mutex<Vec<CompletionEvent>>,
        fail: bool,
    }

    #[async_trait]
    impl CompletionNotifier for Recording {
        async fn notify(&self, _target: &CallbackTarget, event: &CompletionEvent) -> Result<()> {
            self.sent.lock().push(event.clone());
            if self.fail {
                return Err(Error::NotificationDelivery("unreachable".into()));
            }
            Ok(())
        }
    }

    fn event() -> CompletionEvent {
        CompletionEvent {
            id: "j".into(),
            status: JobStatus::Failed,
            path: None,
        }
    }

    #[tokio::test]
    async fn test_dispatch_runs_on_tracker() {
        let notifier = Arc::new(Recording::default());
        let tracker = TaskTracker::new();
        let dispatcher = Dispatcher::new(notifier.clone(), tracker.clone());

        dispatcher.dispatch(CallbackTarget::parse("http://h/x").unwrap(), event());
        tracker.close();
        tracker.wait().await;

        assert_eq!(notifier.sent.lock().as_slice(), &[event()]);
    }

    #[tokio::test]
    async fn test_failed_delivery_is_reported_once() {
        let notifier = Arc::new(Recording {
            fail: true,
            ..Default::default()
        });
        let dispatcher = Dispatcher::new(notifier.clone(), TaskTracker::new());

        let delivered = dispatcher
            .deliver(&CallbackTarget::parse("http://h/x").unwrap(), &event())
            .await;
        assert!(!delivered);
        assert_eq!(notifier.sent.lock().len(), 1);
    }
}
