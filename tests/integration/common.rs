//! Shared fixtures: a catalog config pointing at a mock server and card markup

use std::path::PathBuf;
use tempfile::TempDir;
use watchwatcher::config::load_config;
use watchwatcher::{Config, WatchService};

/// Writes a config file pointing at `base_url` and loads it
///
/// The returned directory holds the config and the database; keep it alive
/// for the duration of the test.
pub fn write_config(base_url: &str) -> (Config, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("watches.db");

    let toml = format!(
        r#"
[catalog]
base-url = "{base_url}"
listing-path = "/all-watches"
source = "watchfinder"
request-timeout-secs = 5

[rate-limits]
fetch = {{ tokens = 10, interval-ms = 10 }}
store-read = {{ tokens = 50, interval-ms = 10 }}
store-write = {{ tokens = 50, interval-ms = 10 }}

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[storage]
database-path = "{db}"
"#,
        db = db_path.display()
    );

    let config_path: PathBuf = dir.path().join("watchwatcher.toml");
    std::fs::write(&config_path, toml).expect("Failed to write config");
    let config = load_config(&config_path).expect("Failed to load config");

    (config, dir)
}

pub fn open_service(config: &Config) -> WatchService {
    WatchService::open(config).expect("Failed to open service")
}

/// One product card as the catalog renders it
pub fn card(id: u64, brand: &str, series: &str, model: &str, price: &str) -> String {
    format!(
        r#"<div class="prods_item-card">
            <a class="redirect" href="/{brand}/{series}/{model}/{id}" data-src="https://img.example.com/{id}.jpg">
                <span class="prods_code">Code: {id}</span>
            </a>
            <span class="prods_brand">{brand}</span>
            <span class="prods_series">{series}</span>
            <span class="prods_model">{model}</span>
            <span class="prods_price">{price}</span>
            <span class="prods_age">2018 (6)</span>
            <span class="prods_box">Box: Yes</span>
            <span class="prods_papers">Papers: No</span>
        </div>"#
    )
}

pub fn page(cards: &[String]) -> String {
    format!(
        "<html><head><title>All watches</title></head><body><div class=\"prods\">{}</div></body></html>",
        cards.join("\n")
    )
}

pub fn empty_page() -> String {
    page(&[])
}
