//! Idempotent merge of observations into stored items
//!
//! Every observation is folded into the product's stored record with a
//! read-modify-write that presents the version it read. A price change
//! appends to the history; an unchanged price only refreshes `lastPrice`.

use crate::limiter::RateLimiter;
use crate::model::{ListingRecord, PricePoint, StoredItem};
use crate::storage::{get_item, DocumentStore, StoreResult};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Folds a new observation into the previously stored item, if any
///
/// - no previous item: a new item whose history is `[point]`
/// - previous item: listing fields carried forward, `lastPrice` replaced,
///   `point` appended to the history only when the price differs
pub fn merge_observation(
    existing: Option<StoredItem>,
    listing: ListingRecord,
    point: PricePoint,
    now: DateTime<Utc>,
) -> StoredItem {
    match existing {
        None => StoredItem::first_sighting(listing, point, now),
        Some(mut item) => {
            // Offer-only changes do not reach the history
            if item.last_price.price != point.price {
                item.price_history.push(point.clone());
            }
            item.last_price = point;
            item.updated_at = now;
            item
        }
    }
}

/// Persists observations with optimistic concurrency
///
/// Reads and writes each draw from their own rate limiter. A version conflict
/// is returned to the caller as `StoreError::Conflict`; nothing is retried here.
pub struct MergeEngine {
    store: Arc<dyn DocumentStore>,
    read_limiter: Arc<RateLimiter>,
    write_limiter: Arc<RateLimiter>,
}

impl MergeEngine {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        read_limiter: Arc<RateLimiter>,
        write_limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            store,
            read_limiter,
            write_limiter,
        }
    }

    /// Merges one observation and writes the result
    ///
    /// # Returns
    ///
    /// * `Ok(StoredItem)` - The persisted item, carrying its new version
    /// * `Err(StoreError::Conflict)` - Someone else wrote the key since it was read
    pub async fn merge(&self, listing: ListingRecord, point: PricePoint) -> StoreResult<StoredItem> {
        let key = listing.key();

        self.read_limiter.acquire().await;
        let existing = get_item(self.store.as_ref(), &key)?;
        let expected = existing.as_ref().and_then(|item| item.version.clone());

        if let Some(item) = &existing {
            if item.last_price.price != point.price {
                tracing::debug!(
                    "Price of {} changed: {} -> {}",
                    key,
                    item.last_price.price,
                    point.price
                );
            }
        } else {
            tracing::debug!("First sighting of {}", key);
        }

        let mut item = merge_observation(existing, listing, point, Utc::now());
        let body = serde_json::to_value(&item)?;

        self.write_limiter.acquire().await;
        let version = self.store.put(&key, &body, expected.as_ref())?;
        item.version = Some(version);

        Ok(item)
    }
}
