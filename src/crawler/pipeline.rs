//! Crawl pipeline - paginated fetch/extract/ingest loop
//!
//! The pipeline walks the catalog one page at a time:
//!
//! ```text
//! Fetching(1) -> Extracting -> Ingesting -> Fetching(2) -> ... -> Done
//! ```
//!
//! An empty page is the only normal end of a crawl. A failed fetch ends it
//! early with whatever was collected. Items of one page are merged
//! concurrently, bounded by the store rate limiters; the next page is not
//! requested until the current page's merges have finished.

use crate::config::CatalogConfig;
use crate::crawler::extractor::PageExtractor;
use crate::crawler::fetcher::{FetchError, Fetcher};
use crate::crawler::merge::MergeEngine;
use crate::limiter::RateLimiter;
use crate::model::{ListingRecord, PricePoint, RawListing};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::task::JoinSet;
use url::Url;

/// Builds the URL of each catalog page
#[derive(Debug, Clone)]
pub struct PageUrls {
    listing: Url,
    sort_order: String,
    page_param: String,
}

impl PageUrls {
    pub fn from_config(config: &CatalogConfig) -> Result<Self, url::ParseError> {
        let listing = Url::parse(&config.base_url)?.join(&config.listing_path)?;
        Ok(Self {
            listing,
            sort_order: config.sort_order.clone(),
            page_param: config.page_param.clone(),
        })
    }

    /// `<listing>?orderby=<sort>&<page-param>=<page>`
    pub fn page_url(&self, page: u32) -> Url {
        let mut url = self.listing.clone();
        url.query_pairs_mut()
            .append_pair("orderby", &self.sort_order)
            .append_pair(&self.page_param, &page.to_string());
        url
    }
}

/// One extracted listing with the price point it was observed at
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub listing: ListingRecord,
    pub price: PricePoint,
}

/// Why a crawl stopped
#[derive(Debug, Clone, PartialEq)]
pub enum StopReason {
    /// A page held no product cards
    EmptyPage { page: u32 },
    /// A page could not be fetched; the crawl is truncated there
    FetchFailed { page: u32, error: FetchError },
    /// Single-page validation run
    TestMode,
}

/// Outcome of a crawl, handed to the completion callback
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// Every listing extracted, whether or not it was persisted
    pub observations: Vec<Observation>,
    /// Pages answered with a 2xx response
    pub pages_fetched: u32,
    pub persisted: usize,
    pub failed: usize,
    pub stop_reason: StopReason,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CrawlReport {
    fn start() -> Self {
        let now = Utc::now();
        Self {
            observations: Vec::new(),
            pages_fetched: 0,
            persisted: 0,
            failed: 0,
            stop_reason: StopReason::TestMode,
            started_at: now,
            finished_at: now,
        }
    }

    /// Human-readable summary recorded as the run status
    pub fn summary(&self) -> String {
        format!(
            "{} watches watched at {}",
            self.observations.len(),
            self.finished_at.to_rfc3339()
        )
    }
}

enum CrawlState {
    Fetching(u32),
    Extracting { page: u32, body: String },
    Ingesting { page: u32, items: Vec<RawListing> },
    Done(StopReason),
}

/// Orchestrates fetching, extraction and merging of the whole catalog
pub struct CrawlPipeline {
    fetcher: Arc<dyn Fetcher>,
    extractor: PageExtractor,
    merge: Arc<MergeEngine>,
    fetch_limiter: Arc<RateLimiter>,
    pages: PageUrls,
}

impl CrawlPipeline {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        extractor: PageExtractor,
        merge: Arc<MergeEngine>,
        fetch_limiter: Arc<RateLimiter>,
        pages: PageUrls,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            merge,
            fetch_limiter,
            pages,
        }
    }

    /// Runs a crawl to completion
    ///
    /// With `test_mode` only the first item of the first page is processed.
    /// Never fails: fetch errors truncate the crawl, merge errors are counted
    /// per item.
    pub async fn run(&self, test_mode: bool) -> CrawlReport {
        let mut report = CrawlReport::start();
        let mut state = CrawlState::Fetching(1);

        loop {
            state = match state {
                CrawlState::Fetching(page) => self.fetch_page(page, &mut report).await,

                CrawlState::Extracting { page, body } => {
                    let extraction = self.extractor.extract(&body);
                    if !extraction.had_any_items {
                        tracing::info!("No more listings on page {}, stopping", page);
                        CrawlState::Done(StopReason::EmptyPage { page })
                    } else {
                        tracing::info!(
                            "Page {} had {} listings",
                            page,
                            extraction.items.len()
                        );
                        let mut items = extraction.items;
                        if test_mode {
                            items.truncate(1);
                        }
                        CrawlState::Ingesting { page, items }
                    }
                }

                CrawlState::Ingesting { page, items } => {
                    self.ingest(items, &mut report).await;
                    if test_mode {
                        CrawlState::Done(StopReason::TestMode)
                    } else {
                        CrawlState::Fetching(page + 1)
                    }
                }

                CrawlState::Done(reason) => {
                    report.stop_reason = reason;
                    break;
                }
            };
        }

        report.finished_at = Utc::now();
        tracing::info!(
            "Crawl finished after {} pages: {} listings, {} persisted, {} failed",
            report.pages_fetched,
            report.observations.len(),
            report.persisted,
            report.failed
        );

        report
    }

    /// Runs a crawl, then hands the report to `on_complete`
    pub async fn run_with<F>(&self, test_mode: bool, on_complete: F) -> CrawlReport
    where
        F: FnOnce(&CrawlReport),
    {
        let report = self.run(test_mode).await;
        on_complete(&report);
        report
    }

    async fn fetch_page(&self, page: u32, report: &mut CrawlReport) -> CrawlState {
        let url = self.pages.page_url(page);

        self.fetch_limiter.acquire().await;
        tracing::info!("Requesting page {} ...", page);

        let result = match self.fetcher.fetch(url.as_str()).await {
            Ok(fetched) if fetched.is_success() => Ok(fetched.body),
            Ok(fetched) => Err(FetchError::Status {
                url: url.to_string(),
                status: fetched.status_code,
            }),
            Err(e) => Err(e),
        };

        match result {
            Ok(body) => {
                report.pages_fetched += 1;
                CrawlState::Extracting { page, body }
            }
            Err(error) => {
                tracing::warn!("Stopping crawl at page {}: {}", page, error);
                CrawlState::Done(StopReason::FetchFailed { page, error })
            }
        }
    }

    async fn ingest(&self, items: Vec<RawListing>, report: &mut CrawlReport) {
        let mut tasks = JoinSet::new();

        for raw in items {
            let price = raw.observe(Utc::now());
            let listing = raw.listing;
            report.observations.push(Observation {
                listing: listing.clone(),
                price: price.clone(),
            });

            let merge = self.merge.clone();
            tasks.spawn(async move {
                let key = listing.key();
                (key, merge.merge(listing, price).await)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((key, Ok(item))) => {
                    report.persisted += 1;
                    tracing::debug!(
                        "Stored {} ({} price points)",
                        key,
                        item.price_history.len()
                    );
                }
                Ok((key, Err(e))) => {
                    report.failed += 1;
                    tracing::warn!("Failed to store {}: {}", key, e);
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!("Ingestion task failed: {}", e);
                }
            }
        }
    }
}
