//! Record types for listings, price observations and persisted items
//!
//! # Components
//!
//! - `RawListing`: one listing as extracted from a catalog page, price included
//! - `ListingRecord`: the descriptive part of a listing (no price)
//! - `PricePoint`: a single timestamped price observation
//! - `StoredItem`: the persisted aggregate per product, with price history
//! - `SimpleEntry`: a plain key/value record for non-listing state

mod item;
mod listing;

pub use item::{SimpleEntry, StoredItem, STATUS_KEY};
pub use listing::{BoxStatus, ListingRecord, PapersStatus, PricePoint, RawListing};
