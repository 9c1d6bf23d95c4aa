//! Listing extraction from search-result pages
//!
//! This module turns one page body into records:
//! - Every item wrapper node becomes one [`Record`]
//! - Each of the eight fields is looked up independently
//! - A missing node, attribute, or token yields the sentinel for that field only
//! - The pagination control tells whether another page exists
//!
//! Extraction is pure: the same body always yields the same records.

use crate::record::{Record, SENTINEL};
use crate::HarvestError;
use scraper::{ElementRef, Html, Selector};

/// CSS selectors for a listing page
pub mod css {
    pub const ITEM_WRAPPER: &str = "div.s-item__wrapper";
    pub const TITLE: &str = "div.s-item__title";
    pub const PRICE: &str = "span.s-item__price";
    pub const LINK: &str = "a.s-item__link";
    pub const SUBTITLE: &str = "div.s-item__subtitle";
    pub const REVIEWS: &str = "span.s-item__reviews-count";
    pub const SELLER_INFO: &str = "span.s-item__seller-info-text";
    pub const LOCATION: &str = "span.s-item__location";
    pub const QUANTITY_SOLD: &str = "span.s-item__quantity-sold";
    pub const NEXT_PAGE: &str = "a.pagination__next";
}

/// Prefix removed from location text
const LOCATION_PREFIX: &str = "from ";

/// Records and pagination state extracted from one page
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPage {
    /// Listings in page order
    pub records: Vec<Record>,

    /// Whether an enabled next-page control exists
    pub has_next_page: bool,
}

/// Compiled selectors for one listing page layout
#[derive(Debug, Clone)]
pub struct ListingSelectors {
    item: Selector,
    title: Selector,
    price: Selector,
    link: Selector,
    subtitle: Selector,
    reviews: Selector,
    seller_info: Selector,
    location: Selector,
    quantity_sold: Selector,
    next_page: Selector,
}

impl ListingSelectors {
    /// Compiles the default selector set
    pub fn new() -> Result<Self, HarvestError> {
        Ok(Self {
            item: compile(css::ITEM_WRAPPER)?,
            title: compile(css::TITLE)?,
            price: compile(css::PRICE)?,
            link: compile(css::LINK)?,
            subtitle: compile(css::SUBTITLE)?,
            reviews: compile(css::REVIEWS)?,
            seller_info: compile(css::SELLER_INFO)?,
            location: compile(css::LOCATION)?,
            quantity_sold: compile(css::QUANTITY_SOLD)?,
            next_page: compile(css::NEXT_PAGE)?,
        })
    }
}

fn compile(selector: &str) -> Result<Selector, HarvestError> {
    Selector::parse(selector).map_err(|e| HarvestError::Selector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}

/// Extracts records from listing pages
#[derive(Debug, Clone)]
pub struct RecordExtractor {
    selectors: ListingSelectors,
}

impl RecordExtractor {
    pub fn new() -> Result<Self, HarvestError> {
        Ok(Self {
            selectors: ListingSelectors::new()?,
        })
    }

    /// Parses a page body into records and its next-page state
    ///
    /// # Example
    ///
    /// ```
    /// use listing_harvester::harvester::RecordExtractor;
    ///
    /// let html = r#"<div class="s-item__wrapper"><div class="s-item__title">Laptop</div></div>"#;
    /// let page = RecordExtractor::new().unwrap().parse_page(html);
    /// assert_eq!(page.records[0].title, "Laptop");
    /// assert_eq!(page.records[0].price, "N/A");
    /// assert!(!page.has_next_page);
    /// ```
    pub fn parse_page(&self, body: &str) -> ParsedPage {
        let document = Html::parse_document(body);

        let records = document
            .select(&self.selectors.item)
            .map(|item| self.extract_record(&item))
            .collect();

        ParsedPage {
            records,
            has_next_page: self.has_next_page(&document),
        }
    }

    /// Parses a page body into records only
    pub fn extract(&self, body: &str) -> Vec<Record> {
        self.parse_page(body).records
    }

    fn extract_record(&self, item: &ElementRef) -> Record {
        let s = &self.selectors;

        Record {
            title: extract_or_default(item, &s.title, SENTINEL, text),
            price: extract_or_default(item, &s.price, SENTINEL, text),
            url: extract_or_default(item, &s.link, SENTINEL, |el| attr(el, "href")),
            description: extract_or_default(item, &s.subtitle, SENTINEL, text),
            review_count: extract_or_default(item, &s.reviews, SENTINEL, first_token),
            rating: extract_or_default(item, &s.seller_info, SENTINEL, text),
            location: extract_or_default(item, &s.location, SENTINEL, location),
            units_sold: extract_or_default(item, &s.quantity_sold, SENTINEL, first_token),
        }
    }

    /// Returns true if the page has a next-page control that is not disabled
    fn has_next_page(&self, document: &Html) -> bool {
        document
            .select(&self.selectors.next_page)
            .next()
            .map(|next| !is_disabled(&next))
            .unwrap_or(false)
    }
}

/// Looks up the first `selector` match under `node` and applies `pick` to it
///
/// Falls back to `default` when the node is missing or `pick` yields nothing.
/// `pick` results that are empty after trimming also fall back, so a field is
/// never an empty string.
pub fn extract_or_default<F>(node: &ElementRef, selector: &Selector, default: &str, pick: F) -> String
where
    F: FnOnce(&ElementRef) -> Option<String>,
{
    node.select(selector)
        .next()
        .and_then(|found| pick(&found))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Trimmed text content of an element
fn text(element: &ElementRef) -> Option<String> {
    Some(element.text().collect::<String>().trim().to_string())
}

fn attr(element: &ElementRef, name: &str) -> Option<String> {
    element.value().attr(name).map(str::to_string)
}

/// First whitespace-delimited token of the element's text
fn first_token(element: &ElementRef) -> Option<String> {
    text(element)?.split_whitespace().next().map(str::to_string)
}

/// Location text with the leading "from " removed
fn location(element: &ElementRef) -> Option<String> {
    let raw = text(element)?;
    Some(match raw.strip_prefix(LOCATION_PREFIX) {
        Some(rest) => rest.to_string(),
        None => raw,
    })
}

fn is_disabled(element: &ElementRef) -> bool {
    element.value().classes().any(|class| class == "disabled")
        || element.value().attr("aria-disabled") == Some("true")
}

/// Convenience function for extracting records with the default selectors
pub fn extract_records(body: &str) -> Vec<Record> {
    RecordExtractor::new()
        .map(|extractor| extractor.extract(body))
        .unwrap_or_default()
}
