use crate::model::{ListingRecord, PricePoint};
use crate::storage::VersionToken;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Key of the entry holding the last crawl summary
pub const STATUS_KEY: &str = "status";

/// The persisted aggregate for one product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredItem {
    /// Stringified product identifier; unique within the store
    pub key: String,
    pub listing: ListingRecord,
    /// Most recent observation, whether or not it changed the price
    pub last_price: PricePoint,
    /// Chronological, append-only; one entry per observed price change
    pub price_history: Vec<PricePoint>,
    pub updated_at: DateTime<Utc>,
    /// Version the item was read or written at; not part of the document body
    #[serde(skip)]
    pub version: Option<VersionToken>,
}

impl StoredItem {
    /// Builds the record for a product seen for the first time
    pub fn first_sighting(listing: ListingRecord, point: PricePoint, now: DateTime<Utc>) -> Self {
        Self {
            key: listing.key(),
            listing,
            last_price: point.clone(),
            price_history: vec![point],
            updated_at: now,
            version: None,
        }
    }
}

/// A plain key/value record sharing the item namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleEntry {
    pub key: String,
    pub value: String,
}

impl SimpleEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}
