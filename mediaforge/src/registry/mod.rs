//! Asset and job registry.
//!
//! The [`Registry`] is the only way to read or change records. It wraps an
//! injected [`RecordStore`] and owns the callback book, so terminal commits,
//! callback registration and deletion are serialized against each other.

mod record;
mod store;

pub use record::{JobRecord, JobStatus, UPLOAD_KIND};
pub use store::{InMemoryRecordStore, RecordStore};

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::notification::CallbackTarget;
use crate::storage::{BlobStore, DeleteOutcome};
use crate::{Error, Result};

/// Outcome of a terminal transition.
#[derive(Debug, Clone)]
pub struct TerminalCommit {
    pub record: JobRecord,
    /// Callback to notify, handed out at most once per record.
    pub callback: Option<CallbackTarget>,
}

/// Outcome of [`Registry::register_callback`].
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackRegistration {
    /// Stored; delivered when the job reaches its terminal state.
    Pending,
    /// The record is already terminal and the caller must deliver now.
    DeliverNow(JobRecord),
}

#[derive(Debug, Clone)]
enum CallbackSlot {
    Pending(CallbackTarget),
    Delivered,
}

#[derive(Debug, Default)]
struct CallbackBook {
    slots: HashMap<String, CallbackSlot>,
    /// Ids of deleted records; never handed out again.
    retired: HashSet<String>,
}

impl CallbackBook {
    /// Hand out the pending callback for `id`, marking it delivered.
    fn take(&mut self, id: &str) -> Option<CallbackTarget> {
        match self.slots.get(id) {
            Some(CallbackSlot::Pending(_)) => {
                match self.slots.insert(id.to_string(), CallbackSlot::Delivered) {
                    Some(CallbackSlot::Pending(target)) => Some(target),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

pub struct Registry {
    store: Arc<dyn RecordStore>,
    blobs: BlobStore,
    callbacks: Mutex<CallbackBook>,
}

impl Registry {
    pub fn new(store: Arc<dyn RecordStore>, blobs: BlobStore) -> Self {
        Self {
            store,
            blobs,
            callbacks: Mutex::new(CallbackBook::default()),
        }
    }

    /// Registry over a fresh in-memory store.
    pub fn in_memory(blobs: BlobStore) -> Self {
        Self::new(Arc::new(InMemoryRecordStore::new()), blobs)
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    /// A fresh unguessable id that was never used by this registry.
    pub fn allocate_id(&self) -> String {
        let book = self.callbacks.lock();
        loop {
            let id = Uuid::new_v4().to_string();
            if !book.retired.contains(&id) && self.store.get(&id).is_none() {
                return id;
            }
        }
    }

    fn insert(&self, record: JobRecord) -> Result<JobRecord> {
        let book = self.callbacks.lock();
        if book.retired.contains(&record.id) {
            return Err(Error::Conflict(format!(
                "id '{}' belonged to a deleted record",
                record.id
            )));
        }
        self.store.insert(record.clone())?;
        Ok(record)
    }

    /// Register an uploaded asset stored at `path` under `id`.
    pub fn create_upload(&self, id: String, path: PathBuf) -> Result<JobRecord> {
        let record = self.insert(JobRecord::upload(id, path))?;
        debug!(id = %record.id, "Registered upload");
        Ok(record)
    }

    /// Create a job record in the `processing` state.
    pub fn create_job(&self, kind: &str) -> Result<JobRecord> {
        let record = self.insert(JobRecord::processing(self.allocate_id(), kind))?;
        debug!(job_id = %record.id, kind, "Created job");
        Ok(record)
    }

    pub fn get(&self, id: &str) -> Result<JobRecord> {
        self.store.get(id).ok_or_else(|| Error::reference("job", id))
    }

    /// Path of a `ready` record usable as an operation input.
    pub fn resolve_ready(&self, id: &str) -> Result<PathBuf> {
        let record = self
            .store
            .get(id)
            .ok_or_else(|| Error::reference("asset", id))?;
        match (record.status, record.path) {
            (JobStatus::Ready, Some(path)) => Ok(path),
            _ => Err(Error::reference("ready asset", id)),
        }
    }

    /// Update the progress gauge of a processing job. Unknown ids, terminal
    /// records and regressions are ignored.
    pub fn report_progress(&self, id: &str, percent: f32) {
        let result = self.store.update(id, &mut |record| {
            record.advance_progress(percent);
            Ok(())
        });
        if result.is_err() {
            debug!(job_id = %id, "Dropped progress for missing job");
        }
    }

    /// Commit `ready` with the output at `path`.
    pub fn complete(&self, id: &str, path: PathBuf) -> Result<TerminalCommit> {
        let mut book = self.callbacks.lock();
        let record = self
            .store
            .update(id, &mut |record| record.mark_ready(path.clone()))?;
        let callback = book.take(id);
        Ok(TerminalCommit { record, callback })
    }

    /// Commit `failed` with a human-readable reason.
    pub fn fail(&self, id: &str, error: &str) -> Result<TerminalCommit> {
        let mut book = self.callbacks.lock();
        let record = self
            .store
            .update(id, &mut |record| record.mark_failed(error))?;
        let callback = book.take(id);
        Ok(TerminalCommit { record, callback })
    }

    /// Register a completion callback.
    ///
    /// Replaces a pending target. If the record is already terminal the
    /// caller gets [`CallbackRegistration::DeliverNow`] and owns the single
    /// delivery; once a notification was handed out any further registration
    /// is a conflict.
    pub fn register_callback(
        &self,
        id: &str,
        target: CallbackTarget,
    ) -> Result<CallbackRegistration> {
        let mut book = self.callbacks.lock();
        let record = self.get(id)?;
        if matches!(book.slots.get(id), Some(CallbackSlot::Delivered)) {
            return Err(Error::Conflict(format!(
                "a completion notification was already sent for '{id}'"
            )));
        }
        if record.status.is_terminal() {
            book.slots.insert(id.to_string(), CallbackSlot::Delivered);
            return Ok(CallbackRegistration::DeliverNow(record));
        }
        book.slots
            .insert(id.to_string(), CallbackSlot::Pending(target));
        Ok(CallbackRegistration::Pending)
    }

    /// Remove a record and its callback, then best-effort delete its file.
    ///
    /// Deleting an unknown or already deleted id succeeds.
    pub async fn delete(&self, id: &str) -> DeleteOutcome {
        let removed = {
            let mut book = self.callbacks.lock();
            book.slots.remove(id);
            let removed = self.store.remove(id);
            if removed.is_some() {
                book.retired.insert(id.to_string());
            }
            removed
        };

        let Some(record) = removed else {
            return DeleteOutcome::AlreadyAbsent;
        };
        if let Some(path) = &record.path {
            match self.blobs.delete(path).await {
                Ok(outcome) => debug!(id, ?outcome, "Deleted backing file"),
                Err(e) => warn!(id, error = %e, "Failed to delete backing file"),
            }
        }
        DeleteOutcome::Removed
    }

    /// Snapshot of every record.
    pub fn list(&self) -> Vec<JobRecord> {
        self.store.list()
    }

    /// Number of jobs still in flight.
    pub fn processing_count(&self) -> usize {
        self.store
            .list()
            .iter()
            .filter(|record| record.status == JobStatus::Processing)
            .count()
    }
}
