//! Crawler module for catalog fetching and ingestion
//!
//! This module contains the crawl-ingest pipeline, including:
//! - HTTP fetching behind the `Fetcher` trait
//! - Listing extraction from catalog pages
//! - The version-checked merge of observations into stored items
//! - The paginated crawl loop itself

mod extractor;
mod fetcher;
mod merge;
mod pipeline;

pub use extractor::{parse_amount, parse_product_id, ExtractError, PageExtraction, PageExtractor};
pub use fetcher::{build_http_client, FetchError, FetchedPage, Fetcher, HttpFetcher};
pub use merge::{merge_observation, MergeEngine};
pub use pipeline::{CrawlPipeline, CrawlReport, Observation, PageUrls, StopReason};
