//! Request and response bodies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::registry::{JobRecord, JobStatus};
use crate::storage::DeleteOutcome;

/// Returned when an upload or a job was accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptedResponse {
    pub file_id: String,
    pub status: JobStatus,
}

impl From<&JobRecord> for AcceptedResponse {
    fn from(record: &JobRecord) -> Self {
        Self {
            file_id: record.id.clone(),
            status: record.status,
        }
    }
}

/// Client view of a record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub file_id: String,
    pub status: JobStatus,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Download location, once ready.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<JobRecord> for StatusResponse {
    fn from(record: JobRecord) -> Self {
        let content_url = (record.status == JobStatus::Ready)
            .then(|| format!("/api/v1/media/{}/content", record.id));
        Self {
            file_id: record.id,
            status: record.status,
            kind: record.kind,
            progress: record.progress,
            error: record.error,
            content_url,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TtsRequest {
    pub text: String,
    #[serde(default)]
    pub voice: Option<String>,
    #[serde(default)]
    pub callback_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookRequest {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookDelivery {
    /// Sent when the job finishes.
    Pending,
    /// The job had already finished; the notification was sent.
    Delivered,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub file_id: String,
    pub delivery: WebhookDelivery,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub file_id: String,
    /// False when nothing was stored under the id.
    pub removed: bool,
}

impl DeleteResponse {
    pub fn new(file_id: String, outcome: DeleteOutcome) -> Self {
        Self {
            file_id,
            removed: outcome == DeleteOutcome::Removed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub jobs_in_flight: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateLogFilterRequest {
    pub filter: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogFilterResponse {
    pub filter: String,
}
