//! In-process record store

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{record_title, RecordId, RecordStatus, StoredRecord};

use super::RecordStore;

#[derive(Debug, Default)]
struct Inner {
    records: Vec<MemoryRecord>,
    next_id: RecordId,
}

#[derive(Debug, Clone)]
struct MemoryRecord {
    record: StoredRecord,
    open: bool,
    comments: Vec<String>,
}

/// Record store kept in memory. Contents are lost when the process exits.
///
/// Write counters make it easy to observe how many backend calls an operation made.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    body_writes: AtomicUsize,
    label_writes: AtomicUsize,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record as-is, bypassing the title convention. Returns its id.
    pub fn insert(&self, title: &str, body: &str, labels: &[&str]) -> RecordId {
        let mut inner = self.inner.write();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.records.push(MemoryRecord {
            record: StoredRecord {
                id,
                title: title.to_string(),
                body: body.to_string(),
                labels: labels.iter().map(|l| (*l).to_string()).collect(),
                comments: 0,
            },
            open: true,
            comments: Vec::new(),
        });
        id
    }

    /// Snapshot of a record by id
    pub fn get(&self, id: RecordId) -> Option<StoredRecord> {
        self.inner
            .read()
            .records
            .iter()
            .find(|r| r.record.id == id)
            .map(|r| r.record.clone())
    }

    /// Comments posted on a record, oldest first
    pub fn comments(&self, id: RecordId) -> Vec<String> {
        self.inner
            .read()
            .records
            .iter()
            .find(|r| r.record.id == id)
            .map(|r| r.comments.clone())
            .unwrap_or_default()
    }

    /// Close a record so it no longer shows up in lookups or scans
    #[cfg(test)]
    fn close(&self, id: RecordId) {
        if let Some(r) = self.inner.write().records.iter_mut().find(|r| r.record.id == id) {
            r.open = false;
        }
    }

    /// Number of body replacements performed so far
    pub fn body_writes(&self) -> usize {
        self.body_writes.load(Ordering::Relaxed)
    }

    /// Number of tag additions and removals performed so far
    pub fn label_writes(&self) -> usize {
        self.label_writes.load(Ordering::Relaxed)
    }

    fn with_record<T>(&self, id: RecordId, f: impl FnOnce(&mut MemoryRecord) -> T) -> Result<T> {
        let mut inner = self.inner.write();
        let record = inner
            .records
            .iter_mut()
            .find(|r| r.record.id == id)
            .ok_or_else(|| Error::not_found("record", id.to_string()))?;
        Ok(f(record))
    }
}

#[async_trait::async_trait]
impl RecordStore for MemoryStore {
    async fn find(&self, owner: &str) -> Result<Option<StoredRecord>> {
        let title = record_title(owner);
        let inner = self.inner.read();
        Ok(inner
            .records
            .iter()
            .find(|r| r.open && r.record.title == title)
            .map(|r| r.record.clone()))
    }

    async fn create(&self, owner: &str, body: &str, initial: RecordStatus) -> Result<StoredRecord> {
        let labels: Vec<&str> = initial.label().into_iter().collect();
        let id = self.insert(&record_title(owner), body, &labels);
        debug!(id, owner, "Created record");
        self.get(id)
            .ok_or_else(|| Error::internal("record vanished after insert"))
    }

    async fn update_body(&self, id: RecordId, body: &str) -> Result<()> {
        self.with_record(id, |r| r.record.body = body.to_string())?;
        self.body_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn list_open(&self) -> Result<Vec<StoredRecord>> {
        let inner = self.inner.read();
        Ok(inner
            .records
            .iter()
            .filter(|r| r.open)
            .map(|r| r.record.clone())
            .collect())
    }

    async fn add_label(&self, id: RecordId, label: &str) -> Result<()> {
        self.with_record(id, |r| {
            if !r.record.has_label(label) {
                r.record.labels.push(label.to_string());
            }
        })?;
        self.label_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn remove_label(&self, id: RecordId, label: &str) -> Result<()> {
        self.with_record(id, |r| r.record.labels.retain(|l| l != label))?;
        self.label_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn comment(&self, id: RecordId, text: &str) -> Result<()> {
        self.with_record(id, |r| {
            r.comments.push(text.to_string());
            r.record.comments += 1;
        })
    }
}
