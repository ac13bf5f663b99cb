use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads, parses and validates the configuration file at `path`
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use watchwatcher::config::load_config;
///
/// let config = load_config(Path::new("watchwatcher.toml")).unwrap();
/// println!("Catalog: {}", config.catalog.base_url);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Hex-encoded SHA-256 of the configuration file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(hash_content(&content))
}

/// Loads a configuration and returns it with the hash of the exact text parsed
///
/// # Returns
///
/// * `Ok((Config, String))` - Validated configuration and its content hash
/// * `Err(ConfigError)` - Failed to read, parse, or validate the file
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    Ok((config, hash_content(&content)))
}

fn hash_content(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    const VALID_CONFIG: &str = r#"
[catalog]
base-url = "http://www.watchfinder.co.uk"
source = "watchfinder"

[rate-limits]
fetch = { tokens = 1, interval-ms = 500 }
store-write = { tokens = 2, interval-ms = 150 }

[user-agent]
crawler-name = "WatchWatcher"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"

[storage]
database-path = "./watches.db"
environment = "development"
"#;

    #[test]
    fn test_load_valid_config() {
        let file = create_temp_config(VALID_CONFIG);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.catalog.base_url, "http://www.watchfinder.co.uk");
        assert_eq!(config.catalog.listing_path, "/all-watches");
        assert_eq!(config.catalog.sort_order, "PriceHighToLow");
        assert_eq!(config.catalog.page_param, "pageno");
        assert_eq!(config.rate_limits.fetch.interval_ms, 500);
        assert_eq!(config.rate_limits.store_write.tokens, 2);
        // Unspecified buckets fall back to 1 token per 150ms
        assert_eq!(config.rate_limits.store_read.tokens, 1);
        assert_eq!(config.rate_limits.store_read.interval_ms, 150);
        assert_eq!(config.user_agent.crawler_name, "WatchWatcher");
        assert_eq!(config.storage.environment.as_deref(), Some("development"));
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let config_content = "this is not valid TOML {{{";
        let file = create_temp_config(config_content);
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let config_content = VALID_CONFIG.replace("tokens = 2", "tokens = 0");
        let file = create_temp_config(&config_content);
        let result = load_config(file.path());
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_hash_matches_loaded_content() {
        let file = create_temp_config(VALID_CONFIG);

        let (config, hash) = load_config_with_hash(file.path()).unwrap();
        assert_eq!(config.catalog.source, "watchfinder");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, compute_config_hash(file.path()).unwrap());
    }

    #[test]
    fn test_edited_config_changes_hash() {
        let original = create_temp_config(VALID_CONFIG);
        let edited = create_temp_config(&VALID_CONFIG.replace("interval-ms = 500", "interval-ms = 250"));

        assert_ne!(
            compute_config_hash(original.path()).unwrap(),
            compute_config_hash(edited.path()).unwrap()
        );
    }

    #[test]
    fn test_missing_rate_limits_section_uses_defaults() {
        let without_limits = VALID_CONFIG
            .replace("[rate-limits]", "")
            .replace("fetch = { tokens = 1, interval-ms = 500 }", "")
            .replace("store-write = { tokens = 2, interval-ms = 150 }", "");
        let config = parse_config(&without_limits).unwrap();

        assert_eq!(config.rate_limits.fetch.interval_ms, 150);
        assert_eq!(config.rate_limits.store_write.tokens, 1);
    }

    #[test]
    fn test_parse_config_without_file() {
        let config = parse_config(VALID_CONFIG).unwrap();
        assert_eq!(
            config.storage.resolved_path(),
            Path::new("./watches-development.db")
        );
    }
}
