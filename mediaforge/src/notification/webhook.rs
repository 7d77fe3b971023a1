//! HTTP webhook delivery.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::CompletionNotifier;
use super::events::{CallbackTarget, CompletionEvent};
use crate::{Error, Result};

/// Posts completion events as JSON.
pub struct WebhookNotifier {
    client: Client,
}

impl WebhookNotifier {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("mediaforge/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self { client }
    }
}

#[async_trait]
impl CompletionNotifier for WebhookNotifier {
    async fn notify(&self, target: &CallbackTarget, event: &CompletionEvent) -> Result<()> {
        let response = self
            .client
            .post(target.url.clone())
            .json(event)
            .send()
            .await
            .map_err(|e| Error::NotificationDelivery(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::NotificationDelivery(format!(
                "callback responded {} - {}",
                status, body
            )));
        }

        debug!(job_id = %event.id, url = %target.url, "Completion webhook delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::JobStatus;
    use axum::{Json, Router, http::StatusCode, routing::post};
    use std::sync::Arc;
    use tokio::sync::Mutex;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/hook")
    }

    #[tokio::test]
    async fn test_posts_event_as_json() {
        let received: Arc<Mutex<Vec<serde_json::Value>>> = Arc::default();
        let sink = received.clone();
        let router = Router::new().route(
            "/hook",
            post(move |Json(body): Json<serde_json::Value>| {
                let sink = sink.clone();
                async move {
                    sink.lock().await.push(body);
                    StatusCode::NO_CONTENT
                }
            }),
        );
        let url = serve(router).await;

        let notifier = WebhookNotifier::new(Duration::from_secs(5));
        let event = CompletionEvent {
            id: "job-1".into(),
            status: JobStatus::Failed,
            path: None,
        };
        notifier
            .notify(&CallbackTarget::parse(&url).unwrap(), &event)
            .await
            .unwrap();

        let received = received.lock().await;
        assert_eq!(
            received.as_slice(),
            &[serde_json::json!({"id": "job-1", "status": "failed"})]
        );
    }

    #[tokio::test]
    async fn test_non_success_status_is_delivery_error() {
        let router = Router::new().route("/hook", post(|| async { StatusCode::BAD_GATEWAY }));
        let url = serve(router).await;

        let notifier = WebhookNotifier::new(Duration::from_secs(5));
        let event = CompletionEvent {
            id: "job-1".into(),
            status: JobStatus::Ready,
            path: Some("/storage/job-1.mp4".into()),
        };
        let err = notifier
            .notify(&CallbackTarget::parse(&url).unwrap(), &event)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotificationDelivery(_)));
    }
}
