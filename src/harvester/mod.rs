//! Harvester module for paced, paginated listing collection
//!
//! This module contains the core harvesting logic, including:
//! - HTTP fetching with bounded backoff
//! - Listing extraction from result pages
//! - Fixed-delay request pacing
//! - The pagination state machine tying it together

mod client;
mod controller;
mod extractor;
mod pacing;
mod retry;

pub use client::{
    browser_headers, build_http_client, is_retryable_status, looks_like_name_resolution,
    FetchError, FetchRequest, FetchResult, HttpPageSource, PageSource, CATEGORY_ID,
    RETRYABLE_STATUS_CODES,
};
pub use controller::{harvest, HarvestOutcome, Harvester, RunConfig};
pub use extractor::{css, extract_or_default, extract_records, ListingSelectors, ParsedPage, RecordExtractor};
pub use pacing::RateLimiter;
pub use retry::{retry_with_backoff, BackoffPolicy, NameResolutionRetry};
