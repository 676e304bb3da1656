//! Record store layer
//!
//! A record store holds one open record per owner: a title used as the lookup key, a
//! text body, a tag set and a comment thread. The core only talks to [`RecordStore`];
//! backends are swappable.

mod github;
mod memory;

pub use github::GitHubStore;
pub use memory::MemoryStore;

use std::sync::Arc;

use crate::config::{StoreBackend, StoreConfig};
use crate::error::Result;
use crate::models::{RecordId, RecordStatus, StoredRecord};

/// Capability interface over the issue tracker used as a record database.
///
/// All body writes are full replacements. There is no optimistic concurrency control:
/// two writers updating the same record race and the last one wins.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Find the open record titled `keepalive: {owner}`.
    ///
    /// If the backend reports several matches the first one wins.
    async fn find(&self, owner: &str) -> Result<Option<StoredRecord>>;

    /// Create a record for `owner`, tagged with `initial`'s label if it has one
    async fn create(&self, owner: &str, body: &str, initial: RecordStatus) -> Result<StoredRecord>;

    /// Replace a record's body
    async fn update_body(&self, id: RecordId, body: &str) -> Result<()>;

    /// All open records, whatever their title
    async fn list_open(&self) -> Result<Vec<StoredRecord>>;

    /// Attach a tag
    async fn add_label(&self, id: RecordId, label: &str) -> Result<()>;

    /// Detach a tag
    async fn remove_label(&self, id: RecordId, label: &str) -> Result<()>;

    /// Post a comment
    async fn comment(&self, id: RecordId, text: &str) -> Result<()>;
}

/// Build the store selected by configuration
pub fn from_config(config: &StoreConfig) -> Result<Arc<dyn RecordStore>> {
    let store: Arc<dyn RecordStore> = match config.backend {
        StoreBackend::Github => Arc::new(GitHubStore::new(config)?),
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    };
    Ok(store)
}
