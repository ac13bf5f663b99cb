use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure for Watchwatcher
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub catalog: CatalogConfig,
    #[serde(rename = "rate-limits", default)]
    pub rate_limits: RateLimitsConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub storage: StorageConfig,
}

/// Where the catalog lives and how its pages are addressed
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// Origin of the catalog site, also used to absolutize detail links
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Path of the paginated listing
    #[serde(rename = "listing-path", default = "default_listing_path")]
    pub listing_path: String,

    /// Value sent as the `orderby` query parameter
    #[serde(rename = "sort-order", default = "default_sort_order")]
    pub sort_order: String,

    /// Name of the page-number query parameter
    #[serde(rename = "page-param", default = "default_page_param")]
    pub page_param: String,

    /// Tag written into every extracted listing
    #[serde(default = "default_source")]
    pub source: String,

    /// Timeout for a single page request (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_timeout")]
    pub request_timeout_secs: u64,
}

/// Budgets for the three independent token buckets
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RateLimitsConfig {
    #[serde(default)]
    pub fetch: BucketConfig,

    #[serde(rename = "store-read", default)]
    pub store_read: BucketConfig,

    #[serde(rename = "store-write", default)]
    pub store_write: BucketConfig,
}

/// A single token bucket: `tokens` permits every `interval_ms` milliseconds
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BucketConfig {
    pub tokens: u32,

    #[serde(rename = "interval-ms")]
    pub interval_ms: u64,
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            tokens: 1,
            interval_ms: 150,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the header value: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Deployment environment; anything but `production` gets its own database
    #[serde(default)]
    pub environment: Option<String>,
}

impl StorageConfig {
    /// Resolves the database file, suffixing the stem with the environment name
    /// outside production (`watches.db` -> `watches-staging.db`)
    pub fn resolved_path(&self) -> PathBuf {
        let path = PathBuf::from(&self.database_path);
        let env = match self.environment.as_deref() {
            Some(env) if !env.is_empty() && env != "production" => env,
            _ => return path,
        };

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file_name = match path.extension() {
            Some(ext) => format!("{}-{}.{}", stem, env, ext.to_string_lossy()),
            None => format!("{}-{}", stem, env),
        };
        path.with_file_name(file_name)
    }
}

fn default_listing_path() -> String {
    "/all-watches".to_string()
}

fn default_sort_order() -> String {
    "PriceHighToLow".to_string()
}

fn default_page_param() -> String {
    "pageno".to_string()
}

fn default_source() -> String {
    "watchfinder".to_string()
}

fn default_timeout() -> u64 {
    30
}
