//! Storage module for persisting listings and run state
//!
//! This module handles all database operations, including:
//! - The document-store interface with optimistic concurrency
//! - SQLite initialization and schema management
//! - Grouping indexes for aggregate queries
//! - Simple key/value entries such as the last run status

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{
    Document, DocumentStore, FieldFilter, GroupCount, SortOrder, StoreError, StoreResult,
    VersionToken,
};

use crate::model::{SimpleEntry, StoredItem};
use std::path::Path;

/// Opens (creating if needed) a store at the given path
pub fn open_store(path: &Path) -> StoreResult<SqliteStore> {
    SqliteStore::open(path)
}

impl Document {
    /// Decodes the body as a stored item, carrying the version along
    pub fn into_item(self) -> StoreResult<StoredItem> {
        let mut item: StoredItem = serde_json::from_value(self.body)?;
        item.version = Some(self.version);
        Ok(item)
    }
}

/// Writes a simple entry, reading first so the write presents the current version
pub fn put_entry(store: &dyn DocumentStore, entry: &SimpleEntry) -> StoreResult<VersionToken> {
    let current = store.get(&entry.key)?;
    let body = serde_json::to_value(entry)?;
    store.put(&entry.key, &body, current.as_ref().map(|doc| &doc.version))
}

/// Reads a simple entry; `Ok(None)` when the key is absent
pub fn get_entry(store: &dyn DocumentStore, key: &str) -> StoreResult<Option<SimpleEntry>> {
    match store.get(key)? {
        Some(doc) => Ok(Some(serde_json::from_value(doc.body)?)),
        None => Ok(None),
    }
}

/// Reads a stored item by product key; `Ok(None)` when the key is absent
pub fn get_item(store: &dyn DocumentStore, key: &str) -> StoreResult<Option<StoredItem>> {
    store.get(key)?.map(Document::into_item).transpose()
}
