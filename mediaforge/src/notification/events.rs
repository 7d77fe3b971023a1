//! Completion events and callback targets.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::registry::{JobRecord, JobStatus};
use crate::{Error, Result};

/// Where a completion notification is posted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackTarget {
    pub url: Url,
}

impl CallbackTarget {
    /// Parse a callback URL; only `http` and `https` are accepted.
    pub fn parse(raw: &str) -> Result<Self> {
        let url = Url::parse(raw.trim())
            .map_err(|e| Error::validation(format!("invalid callback url '{raw}': {e}")))?;
        match url.scheme() {
            "http" | "https" => Ok(Self { url }),
            scheme => Err(Error::validation(format!(
                "unsupported callback url scheme '{scheme}'"
            ))),
        }
    }
}

/// Body of a completion notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionEvent {
    pub id: String,
    pub status: JobStatus,
    /// Output location, absent unless the job is ready.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl CompletionEvent {
    pub fn from_record(record: &JobRecord) -> Self {
        let path = match record.status {
            JobStatus::Ready => record.path.as_ref().map(|p| p.display().to_string()),
            _ => None,
        };
        Self {
            id: record.id.clone(),
            status: record.status,
            path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_callback_target_parse() {
        assert!(CallbackTarget::parse("https://example.com/hook").is_ok());
        assert!(matches!(
            CallbackTarget::parse("ftp://example.com/hook"),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            CallbackTarget::parse("not a url"),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_failed_event_has_no_path() {
        let mut record = JobRecord::processing("j", "concat");
        record.mark_failed("engine exited with code 1").unwrap();
        let event = CompletionEvent::from_record(&record);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json, serde_json::json!({"id": "j", "status": "failed"}));
    }

    #[test]
    fn test_ready_event_carries_path() {
        let mut record = JobRecord::processing("j", "concat");
        record.mark_ready(PathBuf::from("/storage/j.mp4")).unwrap();
        let event = CompletionEvent::from_record(&record);
        assert_eq!(event.path.as_deref(), Some("/storage/j.mp4"));
        assert_eq!(event.status, JobStatus::Ready);
    }
}
