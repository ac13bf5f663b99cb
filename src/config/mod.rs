//! Configuration module for Watchwatcher
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use watchwatcher::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("watchwatcher.toml")).unwrap();
//! println!("Crawling {}", config.catalog.base_url);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BucketConfig, CatalogConfig, Config, RateLimitsConfig, StorageConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
