//! Storage traits and error types
//!
//! This module defines the document-store interface the crawler and the
//! queries are written against, plus the value types that cross it.

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// The presented version token is not the current one
    #[error("Version conflict on key {key}")]
    Conflict { key: String },

    /// A grouped query named an index that was never materialized
    #[error("Grouping index not defined: {0}")]
    MissingIndex(String),

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Invalid field path: {0}")]
    InvalidField(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Corrupt store state: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// True when a fresh read followed by a new write may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// True when the error reflects missing setup rather than bad data
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::MissingIndex(_))
    }
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Opaque optimistic-concurrency token: `<generation>-<digest>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionToken(String);

impl VersionToken {
    /// Computes the token that follows `previous` for a document body
    pub fn next(previous: Option<&VersionToken>, body: &str) -> Self {
        let generation = previous.map(VersionToken::generation).unwrap_or(0) + 1;
        let digest = hex::encode(Sha256::digest(body.as_bytes()));
        Self(format!("{}-{}", generation, &digest[..16]))
    }

    /// Write count encoded in the token; 0 if the token is malformed
    pub fn generation(&self) -> u64 {
        self.0
            .split_once('-')
            .and_then(|(generation, _)| generation.parse().ok())
            .unwrap_or(0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for VersionToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for VersionToken {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored JSON document with its current version
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub key: String,
    pub body: Value,
    pub version: VersionToken,
}

/// One row of a grouped count
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupCount {
    /// Values of the grouped fields, in index order
    pub key: Vec<String>,
    pub count: u64,
}

/// Sort direction for field queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Equality filter over dotted field paths (`listing.brand`)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldFilter {
    pub equals: Vec<(String, Value)>,
    pub sort: Option<(String, SortOrder)>,
    pub limit: Option<usize>,
}

impl FieldFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.equals.push((field.to_string(), value.into()));
        self
    }

    pub fn sort_by(mut self, field: &str, order: SortOrder) -> Self {
        self.sort = Some((field.to_string(), order));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Trait for document store backends
///
/// The store is a single flat keyed namespace. Every mutation is
/// version-checked: `put` with `None` only creates, `put` with a token only
/// replaces the revision that token names. Implementations must be safe to
/// share across tasks.
pub trait DocumentStore: Send + Sync {
    /// Reads a document; `Ok(None)` when the key is absent
    fn get(&self, key: &str) -> StoreResult<Option<Document>>;

    /// Writes a document, returning its new version
    ///
    /// Fails with `StoreError::Conflict` when `expected` is not the current
    /// version (including creating a key that already exists).
    fn put(&self, key: &str, body: &Value, expected: Option<&VersionToken>)
        -> StoreResult<VersionToken>;

    /// Deletes a document at the given version
    fn delete(&self, key: &str, expected: &VersionToken) -> StoreResult<()>;

    /// Lists every key in the namespace
    fn list_keys(&self) -> StoreResult<Vec<String>>;

    /// Materializes a grouping index over the given fields
    fn define_grouping_index(&self, name: &str, fields: &[&str]) -> StoreResult<()>;

    /// Counts documents grouped by the index fields
    ///
    /// `prefix` fixes the leading key components. Documents missing any
    /// grouped field are not counted. Fails with `StoreError::MissingIndex`
    /// when the index was never defined.
    fn query_grouped(&self, index: &str, prefix: Option<&[&str]>) -> StoreResult<Vec<GroupCount>>;

    /// Returns documents matching every equality in the filter
    fn query_by_fields(&self, filter: &FieldFilter) -> StoreResult<Vec<Document>>;
}
