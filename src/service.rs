//! Service facade over the crawl pipeline and the stored catalog
//!
//! [`WatchService`] is the single entry point a CLI (or any other front end)
//! talks to. It owns one store, one limiter per budget and one pipeline, all
//! built from the loaded [`Config`] when the service opens.

use crate::config::Config;
use crate::crawler::{CrawlPipeline, CrawlReport, Fetcher, HttpFetcher, MergeEngine, PageExtractor, PageUrls};
use crate::limiter::RateLimiter;
use crate::model::{SimpleEntry, StoredItem, STATUS_KEY};
use crate::query::{BrandCount, CatalogQuery, SeriesListing};
use crate::storage::{get_entry, open_store, put_entry, DocumentStore, StoreError, StoreResult};
use crate::Result;
use std::sync::Arc;
use tokio::task::JoinHandle;

pub struct WatchService {
    store: Arc<dyn DocumentStore>,
    pipeline: Arc<CrawlPipeline>,
    query: CatalogQuery,
}

impl WatchService {
    /// Opens the configured database and an HTTP fetcher
    pub fn open(config: &Config) -> Result<Self> {
        let path = config.storage.resolved_path();
        tracing::info!("Opening database: {}", path.display());
        let store: Arc<dyn DocumentStore> = Arc::new(open_store(&path)?);

        let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::from_config(
            &config.user_agent,
            config.catalog.request_timeout_secs,
        )?);

        Self::with_parts(config, store, fetcher)
    }

    /// Builds the service around an existing store and fetcher
    pub fn with_parts(
        config: &Config,
        store: Arc<dyn DocumentStore>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self> {
        let limits = &config.rate_limits;
        let fetch_limiter = Arc::new(RateLimiter::from_config(&limits.fetch));
        let read_limiter = Arc::new(RateLimiter::from_config(&limits.store_read));
        let write_limiter = Arc::new(RateLimiter::from_config(&limits.store_write));

        let merge = Arc::new(MergeEngine::new(store.clone(), read_limiter, write_limiter));
        let pipeline = CrawlPipeline::new(
            fetcher,
            PageExtractor::from_config(&config.catalog)?,
            merge,
            fetch_limiter,
            PageUrls::from_config(&config.catalog)?,
        );

        let query = CatalogQuery::new(store.clone());
        query.ensure_indexes()?;

        Ok(Self {
            store,
            pipeline: Arc::new(pipeline),
            query,
        })
    }

    /// Starts a crawl in the background
    ///
    /// The run status entry is written once the crawl completes. The handle
    /// resolves to the crawl report; dropping it leaves the crawl running.
    pub fn run_crawl(&self, test_mode: bool) -> JoinHandle<CrawlReport> {
        let pipeline = self.pipeline.clone();
        let store = self.store.clone();

        tokio::spawn(async move {
            pipeline
                .run_with(test_mode, |report| {
                    let summary = report.summary();
                    match put_entry(store.as_ref(), &SimpleEntry::new(STATUS_KEY, &summary)) {
                        Ok(_) => tracing::info!("{}", summary),
                        Err(e) => tracing::warn!("Failed to record run status: {}", e),
                    }
                })
                .await
        })
    }

    /// Summary of the last completed crawl, if any
    pub fn get_status(&self) -> StoreResult<Option<String>> {
        Ok(get_entry(self.store.as_ref(), STATUS_KEY)?.map(|entry| entry.value))
    }

    pub fn list_brands(&self) -> StoreResult<Vec<BrandCount>> {
        self.query.count_by_brand()
    }

    pub fn list_series(&self, brand: &str) -> StoreResult<Vec<SeriesListing>> {
        self.query.series_with_images(brand)
    }

    pub fn list_items_by_series(&self, brand: &str, series: &str) -> StoreResult<Vec<StoredItem>> {
        self.query.items_by_series(brand, series)
    }

    pub fn list_items_by_model(&self, brand: &str, model: &str) -> StoreResult<Vec<StoredItem>> {
        self.query.items_by_model(brand, model)
    }

    pub fn list_keys(&self) -> StoreResult<Vec<String>> {
        self.store.list_keys()
    }

    /// Deletes a document, presenting the version just read
    pub fn delete_item(&self, key: &str) -> StoreResult<()> {
        let doc = self
            .store
            .get(key)?
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        self.store.delete(key, &doc.version)?;
        tracing::info!("Deleted {}", key);
        Ok(())
    }
}
