//! Read-only views over stored items
//!
//! Grouped counts run against grouping indexes that must be materialized
//! first (see [`CatalogQuery::ensure_indexes`]); querying before that fails
//! with `StoreError::MissingIndex`.

use crate::model::StoredItem;
use crate::storage::{Document, DocumentStore, FieldFilter, SortOrder, StoreResult};
use serde::Serialize;
use std::sync::Arc;

/// Grouping index over `listing.brand`
pub const BRAND_INDEX: &str = "brand";

/// Grouping index over `listing.brand`, `listing.series`
pub const BRAND_SERIES_INDEX: &str = "brand-series";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrandCount {
    pub brand: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesCount {
    pub series: String,
    pub count: u64,
}

/// A series of one brand with an image to illustrate it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesListing {
    pub series: String,
    pub count: u64,
    pub image_url: Option<String>,
}

/// Aggregate and keyed lookups over the item collection
#[derive(Clone)]
pub struct CatalogQuery {
    store: Arc<dyn DocumentStore>,
}

impl CatalogQuery {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Materializes the grouping indexes the counts rely on
    pub fn ensure_indexes(&self) -> StoreResult<()> {
        self.store
            .define_grouping_index(BRAND_INDEX, &["listing.brand"])?;
        self.store
            .define_grouping_index(BRAND_SERIES_INDEX, &["listing.brand", "listing.series"])?;
        Ok(())
    }

    /// Number of stored items per brand
    pub fn count_by_brand(&self) -> StoreResult<Vec<BrandCount>> {
        let groups = self.store.query_grouped(BRAND_INDEX, None)?;
        Ok(groups
            .into_iter()
            .filter_map(|group| {
                let brand = group.key.into_iter().next()?;
                Some(BrandCount {
                    brand,
                    count: group.count,
                })
            })
            .collect())
    }

    /// Number of stored items per series of one brand; empty for unknown brands
    pub fn count_by_brand_and_series(&self, brand: &str) -> StoreResult<Vec<SeriesCount>> {
        let groups = self
            .store
            .query_grouped(BRAND_SERIES_INDEX, Some(&[brand]))?;
        Ok(groups
            .into_iter()
            .filter_map(|group| {
                let series = group.key.into_iter().nth(1)?;
                Some(SeriesCount {
                    series,
                    count: group.count,
                })
            })
            .collect())
    }

    /// Image URL of any one item of the series
    pub fn representative_image(&self, brand: &str, series: &str) -> StoreResult<Option<String>> {
        let filter = FieldFilter::new()
            .eq("listing.brand", brand)
            .eq("listing.series", series)
            .limit(1);

        let image = self
            .store
            .query_by_fields(&filter)?
            .into_iter()
            .next()
            .and_then(|doc| {
                doc.body
                    .pointer("/listing/imageURL")
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
            })
            .filter(|url| !url.is_empty());

        Ok(image)
    }

    /// Series counts of one brand, each with a representative image
    pub fn series_with_images(&self, brand: &str) -> StoreResult<Vec<SeriesListing>> {
        self.count_by_brand_and_series(brand)?
            .into_iter()
            .map(|series| {
                let image_url = self.representative_image(brand, &series.series)?;
                Ok(SeriesListing {
                    series: series.series,
                    count: series.count,
                    image_url,
                })
            })
            .collect()
    }

    /// All items of one series
    pub fn items_by_series(&self, brand: &str, series: &str) -> StoreResult<Vec<StoredItem>> {
        let filter = FieldFilter::new()
            .eq("listing.brand", brand)
            .eq("listing.series", series);
        self.items(&filter)
    }

    /// All items of one model, most expensive first
    pub fn items_by_model(&self, brand: &str, model: &str) -> StoreResult<Vec<StoredItem>> {
        let filter = FieldFilter::new()
            .eq("listing.brand", brand)
            .eq("listing.model", model)
            .sort_by("lastPrice.price", SortOrder::Descending);
        self.items(&filter)
    }

    fn items(&self, filter: &FieldFilter) -> StoreResult<Vec<StoredItem>> {
        self.store
            .query_by_fields(filter)?
            .into_iter()
            .map(Document::into_item)
            .collect()
    }
}
