use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a watch is sold with its box
///
/// Cells that mention neither yes nor no are recorded as `New`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoxStatus {
    Yes,
    No,
    New,
}

impl BoxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
            Self::New => "new",
        }
    }
}

impl fmt::Display for BoxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a watch is sold with its papers
///
/// `Unknown` is stored as the empty string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PapersStatus {
    #[serde(rename = "yes")]
    Yes,
    #[serde(rename = "no")]
    No,
    #[serde(rename = "")]
    Unknown,
}

impl PapersStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
            Self::Unknown => "",
        }
    }
}

impl fmt::Display for PapersStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptive fields of one catalog item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingRecord {
    /// Stable identifier assigned by the catalog
    #[serde(rename = "productID")]
    pub product_id: u64,
    pub brand: String,
    pub series: String,
    pub model: String,
    /// Age in years
    pub age: i32,
    #[serde(rename = "box")]
    pub box_status: BoxStatus,
    pub papers: PapersStatus,
    #[serde(rename = "imageURL")]
    pub image_url: String,
    #[serde(rename = "detailURL")]
    pub detail_url: String,
    /// Tag of the catalog this listing came from
    pub source: String,
}

impl ListingRecord {
    /// Store key for this product: the decimal product identifier
    pub fn key(&self) -> String {
        self.product_id.to_string()
    }
}

/// A single price observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePoint {
    pub price: f64,
    pub offer: Option<f64>,
    pub observed_at: DateTime<Utc>,
}

/// A listing as extracted from a page, before it is timestamped
#[derive(Debug, Clone, PartialEq)]
pub struct RawListing {
    pub listing: ListingRecord,
    pub price: f64,
    pub offer: Option<f64>,
}

impl RawListing {
    /// Builds the tentative price point for an observation made at `observed_at`
    pub fn observe(&self, observed_at: DateTime<Utc>) -> PricePoint {
        PricePoint {
            price: self.price,
            offer: self.offer,
            observed_at,
        }
    }
}
