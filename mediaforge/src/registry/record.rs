//! Asset and job records.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Record kind for raw uploads.
pub const UPLOAD_KIND: &str = "upload";

/// Lifecycle status of a record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Work is in flight; the entry state of every job.
    Processing,
    /// Terminal: the artifact at `path` is complete.
    Ready,
    /// Terminal: the work failed, see `error`.
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }
}

/// One entry of the registry, shared by uploads and job outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    pub status: JobStatus,
    /// Operation that produced the record, or `upload`.
    pub kind: String,
    /// Artifact location; written once, at creation (uploads) or on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Best-effort completion gauge in `[0, 100]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    /// A fresh job in the `processing` state.
    pub fn processing(id: impl Into<String>, kind: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            status: JobStatus::Processing,
            kind: kind.into(),
            path: None,
            progress: Some(0.0),
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// An uploaded asset, ready from the start.
    pub fn upload(id: impl Into<String>, path: PathBuf) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            status: JobStatus::Ready,
            kind: UPLOAD_KIND.to_string(),
            path: Some(path),
            progress: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn ensure_processing(&self, to: JobStatus) -> Result<()> {
        if self.status.is_terminal() {
            return Err(Error::InvalidStateTransition {
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        Ok(())
    }

    /// Commit the successful terminal transition.
    pub fn mark_ready(&mut self, path: PathBuf) -> Result<()> {
        self.ensure_processing(JobStatus::Ready)?;
        if self.path.is_some() {
            return Err(Error::Conflict(format!(
                "artifact path of record '{}' is already set",
                self.id
            )));
        }
        self.status = JobStatus::Ready;
        self.path = Some(path);
        self.progress = Some(100.0);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Commit the failed terminal transition.
    pub fn mark_failed(&mut self, error: impl Into<String>) -> Result<()> {
        self.ensure_processing(JobStatus::Failed)?;
        self.status = JobStatus::Failed;
        self.error = Some(error.into());
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Raise the progress gauge. Lower values and updates after the
    /// terminal transition are ignored. Returns whether the gauge moved.
    pub fn advance_progress(&mut self, percent: f32) -> bool {
        if self.status.is_terminal() || !percent.is_finite() {
            return false;
        }
        let percent = percent.clamp(0.0, 100.0);
        if self.progress.is_some_and(|current| percent <= current) {
            return false;
        }
        self.progress = Some(percent);
        self.updated_at = Utc::now();
        true
    }
}
