//! Listing extraction from catalog pages
//!
//! Each catalog page is a grid of product cards. This module turns the cards
//! of one page into [`RawListing`]s:
//! - price and offer with currency formatting stripped
//! - product identifier from the digits of the code cell
//! - age from an explicit `(N)` annotation, else `current year - year`
//! - box/papers from the first case-insensitive "yes"/"no" anywhere in the cell
//! - a price that does not parse is recorded as 0

use crate::config::CatalogConfig;
use crate::model::{BoxStatus, ListingRecord, PapersStatus, RawListing};
use chrono::{Datelike, Utc};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use url::Url;

/// Errors building an extractor
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Invalid base URL: {0}")]
    BaseUrl(#[from] url::ParseError),
}

/// Result of extracting one page
#[derive(Debug, Clone, Default)]
pub struct PageExtraction {
    pub items: Vec<RawListing>,
    /// False when the page held no product cards at all
    pub had_any_items: bool,
}

struct CardSelectors {
    card: Selector,
    code: Selector,
    price: Selector,
    offer: Selector,
    brand: Selector,
    series: Selector,
    model: Selector,
    age: Selector,
    box_cell: Selector,
    papers: Selector,
    link: Selector,
}

impl CardSelectors {
    fn compile() -> Result<Self, ExtractError> {
        Ok(Self {
            card: selector("div.prods_item-card")?,
            code: selector(".prods_code")?,
            price: selector(".prods_price")?,
            offer: selector(".prods_offer")?,
            brand: selector(".prods_brand")?,
            series: selector(".prods_series")?,
            model: selector(".prods_model")?,
            age: selector(".prods_age")?,
            box_cell: selector(".prods_box")?,
            papers: selector(".prods_papers")?,
            link: selector(".redirect")?,
        })
    }
}

fn selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::Selector {
        selector: css.to_string(),
        message: format!("{:?}", e),
    })
}

/// Parses catalog page markup into listings
pub struct PageExtractor {
    selectors: CardSelectors,
    age_annotation: Regex,
    yes_no: Regex,
    base_url: Url,
    source: String,
}

impl PageExtractor {
    /// Creates an extractor that absolutizes links against `base_url`
    pub fn new(base_url: &str, source: &str) -> Result<Self, ExtractError> {
        Ok(Self {
            selectors: CardSelectors::compile()?,
            age_annotation: Regex::new(r"\(([^)]+)\)")?,
            yes_no: Regex::new(r"(?i)(yes|no)")?,
            base_url: Url::parse(base_url)?,
            source: source.to_string(),
        })
    }

    pub fn from_config(config: &CatalogConfig) -> Result<Self, ExtractError> {
        Self::new(&config.base_url, &config.source)
    }

    /// Extracts every listing on the page, deriving ages against the current year
    pub fn extract(&self, markup: &str) -> PageExtraction {
        self.extract_at(markup, Utc::now().year())
    }

    /// Extracts every listing on the page, deriving ages against `current_year`
    ///
    /// Cards without a usable product code are skipped but still count
    /// towards `had_any_items`.
    pub fn extract_at(&self, markup: &str, current_year: i32) -> PageExtraction {
        let document = Html::parse_document(markup);
        let mut extraction = PageExtraction::default();

        for card in document.select(&self.selectors.card) {
            extraction.had_any_items = true;

            match self.extract_card(&card, current_year) {
                Some(item) => extraction.items.push(item),
                None => tracing::warn!(
                    "Skipping card without product code: {:?}",
                    cell_text(&card, &self.selectors.code)
                ),
            }
        }

        extraction
    }

    fn extract_card(&self, card: &ElementRef<'_>, current_year: i32) -> Option<RawListing> {
        let s = &self.selectors;

        let product_id = parse_product_id(&cell_text(card, &s.code))?;
        let price_text = cell_text(card, &s.price);
        let price = parse_amount(&price_text).unwrap_or_else(|| {
            tracing::warn!("Unparseable price {:?} for {}, recording 0", price_text, product_id);
            0.0
        });
        let offer = parse_amount(&cell_text(card, &s.offer));

        let link = card.select(&s.link).next();
        let image_url = link
            .and_then(|a| a.value().attr("data-src"))
            .unwrap_or_default()
            .to_string();
        let detail_url = link
            .and_then(|a| a.value().attr("href"))
            .and_then(|href| self.base_url.join(href).ok())
            .map(|url| url.to_string())
            .unwrap_or_default();

        let listing = ListingRecord {
            product_id,
            brand: cell_text(card, &s.brand),
            series: cell_text(card, &s.series),
            model: cell_text(card, &s.model),
            age: self
                .parse_age(&cell_text(card, &s.age), current_year)
                .unwrap_or_default(),
            box_status: self.parse_box(&cell_text(card, &s.box_cell)),
            papers: self.parse_papers(&cell_text(card, &s.papers)),
            image_url,
            detail_url,
            source: self.source.clone(),
        };

        Some(RawListing {
            listing,
            price,
            offer,
        })
    }

    /// Age in years: the `(N)` annotation wins, else `current_year - year`
    pub fn parse_age(&self, text: &str, current_year: i32) -> Option<i32> {
        if let Some(captures) = self.age_annotation.captures(text) {
            return captures[1].trim().parse().ok();
        }

        let digits: String = text.chars().filter(char::is_ascii_digit).collect();
        let year: i32 = digits.parse().ok()?;
        Some(current_year - year)
    }

    /// `New` when the cell mentions neither yes nor no
    pub fn parse_box(&self, text: &str) -> BoxStatus {
        match self.yes_or_no(text) {
            Some(true) => BoxStatus::Yes,
            Some(false) => BoxStatus::No,
            None => BoxStatus::New,
        }
    }

    /// `Unknown` (stored as "") when the cell mentions neither yes nor no
    pub fn parse_papers(&self, text: &str) -> PapersStatus {
        match self.yes_or_no(text) {
            Some(true) => PapersStatus::Yes,
            Some(false) => PapersStatus::No,
            None => PapersStatus::Unknown,
        }
    }

    fn yes_or_no(&self, text: &str) -> Option<bool> {
        self.yes_no
            .captures(text)
            .map(|captures| captures[1].eq_ignore_ascii_case("yes"))
    }
}

/// Numeric amount with everything but digits, `.` and `-` removed
pub fn parse_amount(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    cleaned.parse().ok()
}

/// Product identifier from the digits of a code cell
pub fn parse_product_id(text: &str) -> Option<u64> {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

fn cell_text(card: &ElementRef<'_>, selector: &Selector) -> String {
    card.select(selector)
        .next()
        .map(|cell| cell.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}
