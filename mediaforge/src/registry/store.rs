//! Storage backends for registry records.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::record::JobRecord;
use crate::{Error, Result};

/// Storage interface behind the [`Registry`](super::Registry).
///
/// Implementations must make `update` atomic per record.
pub trait RecordStore: Send + Sync {
    /// Insert a new record. An existing id is a conflict.
    fn insert(&self, record: JobRecord) -> Result<()>;

    fn get(&self, id: &str) -> Option<JobRecord>;

    /// Read-modify-write one record, returning the updated copy.
    ///
    /// If `apply` fails the stored record is left as `apply` found it.
    fn update(
        &self,
        id: &str,
        apply: &mut dyn FnMut(&mut JobRecord) -> Result<()>,
    ) -> Result<JobRecord>;

    fn remove(&self, id: &str) -> Option<JobRecord>;

    /// Snapshot of every record.
    fn list(&self) -> Vec<JobRecord>;
}

/// Volatile store kept in a concurrent hash map.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: DashMap<String, JobRecord>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for InMemoryRecordStore {
    fn insert(&self, record: JobRecord) -> Result<()> {
        match self.records.entry(record.id.clone()) {
            Entry::Occupied(_) => Err(Error::Conflict(format!(
                "record '{}' already exists",
                record.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    fn get(&self, id: &str) -> Option<JobRecord> {
        self.records.get(id).map(|r| r.value().clone())
    }

    fn update(
        &self,
        id: &str,
        apply: &mut dyn FnMut(&mut JobRecord) -> Result<()>,
    ) -> Result<JobRecord> {
        let mut entry = self
            .records
            .get_mut(id)
            .ok_or_else(|| Error::reference("job", id))?;
        let mut draft = entry.value().clone();
        apply(&mut draft)?;
        *entry.value_mut() = draft.clone();
        Ok(draft)
    }

    fn remove(&self, id: &str) -> Option<JobRecord> {
        self.records.remove(id).map(|(_, record)| record)
    }

    fn list(&self) -> Vec<JobRecord> {
        self.records.iter().map(|r| r.value().clone()).collect()
    }
}
