//! Pagination controller - the harvest loop
//!
//! This module drives a run through the [`HarvestState`] machine:
//! - Pacing every fetch through the rate limiter
//! - Retrying a page after name-resolution failures
//! - Extracting records and appending them in page order
//! - Enforcing the record cap, truncating mid-page
//! - Detecting end of results
//!
//! A run never fails outright. Whatever was gathered before a fatal fetch
//! error is returned together with the [`StopReason`].

use crate::config::{Config, HarvestConfig, HttpConfig, PacingConfig};
use crate::harvester::client::{FetchRequest, HttpPageSource, PageSource};
use crate::harvester::extractor::RecordExtractor;
use crate::harvester::pacing::RateLimiter;
use crate::harvester::retry::NameResolutionRetry;
use crate::record::Record;
use crate::state::{HarvestState, RetryReason, StopReason};
use crate::HarvestError;
use std::time::{Duration, Instant};

/// Parameters of one harvest run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub keyword: String,
    pub max_records: i64,
    pub page_size: u32,
}

impl RunConfig {
    pub fn new(keyword: impl Into<String>, max_records: i64, page_size: u32) -> Self {
        Self {
            keyword: keyword.into(),
            max_records,
            page_size,
        }
    }

    pub fn from_config(config: &HarvestConfig) -> Self {
        Self::new(config.keyword.clone(), config.max_records, config.page_size)
    }

    /// The record cap, or `None` if the run should not fetch anything
    pub fn cap(&self) -> Option<usize> {
        if self.max_records <= 0 {
            None
        } else {
            Some(usize::try_from(self.max_records).unwrap_or(usize::MAX))
        }
    }

    /// Request parameters for `page`
    pub fn request(&self, page: u32) -> FetchRequest {
        FetchRequest {
            keyword: self.keyword.clone(),
            page,
            page_size: self.page_size,
        }
    }
}

/// Result of a harvest run
#[derive(Debug, Clone, PartialEq)]
pub struct HarvestOutcome {
    /// Records in page order, then in-page order, at most the cap
    pub records: Vec<Record>,

    /// Why the run stopped
    pub stop_reason: StopReason,

    /// Pages fetched successfully
    pub pages_fetched: u32,

    /// Fetch calls issued, including name-resolution retries
    pub fetch_calls: u32,

    /// The fetch error that ended the run, if any
    pub last_error: Option<String>,
}

impl HarvestOutcome {
    fn empty(stop_reason: StopReason) -> Self {
        Self {
            records: Vec::new(),
            stop_reason,
            pages_fetched: 0,
            fetch_calls: 0,
            last_error: None,
        }
    }
}

/// Runs the pagination state machine against a page source
pub struct Harvester<S: PageSource> {
    source: S,
    extractor: RecordExtractor,
    limiter: RateLimiter,
    dns_retry: NameResolutionRetry,
}

impl<S: PageSource> Harvester<S> {
    /// Creates a harvester over `source`, paced by `pacing`
    ///
    /// # Arguments
    ///
    /// * `source` - Where pages come from
    /// * `pacing` - Request delay and name-resolution retry settings
    ///
    /// # Returns
    ///
    /// * `Ok(Harvester)` - Ready to run
    /// * `Err(HarvestError)` - Selectors failed to compile
    pub fn new(source: S, pacing: &PacingConfig) -> Result<Self, HarvestError> {
        Ok(Self {
            source,
            extractor: RecordExtractor::new()?,
            limiter: RateLimiter::from_config(pacing),
            dns_retry: NameResolutionRetry::new(
                Duration::from_millis(pacing.dns_retry_delay_ms),
                pacing.dns_max_retries,
            ),
        })
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Runs one harvest to completion
    ///
    /// Loop per page:
    /// 1. Pace, then fetch the page
    /// 2. On a name-resolution failure, wait and fetch the same page again
    /// 3. On any other fetch failure, stop with `FetchExhausted`
    /// 4. Extract records; an empty page stops with `NoItemsOnPage`
    /// 5. Append records up to the cap; reaching it stops with `CapReached`
    /// 6. Without an enabled next-page control, stop with `NoNextPage`
    /// 7. Otherwise continue with the next page
    pub async fn run(&mut self, run: &RunConfig) -> HarvestOutcome {
        let cap = match run.cap() {
            Some(cap) => cap,
            None => {
                tracing::info!(
                    "max-records is {}, nothing to harvest for '{}'",
                    run.max_records,
                    run.keyword
                );
                return HarvestOutcome::empty(StopReason::CapReached);
            }
        };

        tracing::info!(
            "Starting harvest for '{}' (cap {}, page size {})",
            run.keyword,
            cap,
            run.page_size
        );

        let start_time = Instant::now();
        let mut records: Vec<Record> = Vec::new();
        let mut pages_fetched = 0u32;
        let mut fetch_calls = 0u32;
        let mut dns_retries = 0u32;
        let mut last_error = None;
        let mut state = HarvestState::initial();

        let stop_reason = loop {
            if let Some(reason) = state.stop_reason() {
                break reason;
            }
            tracing::trace!(state = %state, "Harvest state");

            state = match state {
                HarvestState::Fetching { page } => {
                    self.limiter.before_request().await;
                    fetch_calls += 1;

                    match self.source.fetch_page(&run.request(page)).await {
                        Ok(result) => {
                            dns_retries = 0;
                            pages_fetched += 1;
                            tracing::info!(
                                page,
                                status = result.status_code,
                                attempts = result.attempts,
                                "Fetched page {} ({} bytes)",
                                page,
                                result.body.len()
                            );
                            HarvestState::Extracting {
                                page,
                                body: result.body,
                            }
                        }
                        Err(err) if err.is_name_resolution() => {
                            let retry = dns_retries + 1;
                            if self.dns_retry.allows(retry) {
                                dns_retries = retry;
                                tracing::warn!(
                                    page,
                                    retry,
                                    "Name resolution failed, retrying page {} in {:?}: {}",
                                    page,
                                    self.dns_retry.delay,
                                    err
                                );
                                HarvestState::Retrying {
                                    page,
                                    reason: RetryReason::NameResolution { retry },
                                }
                            } else {
                                tracing::error!(
                                    page,
                                    "Giving up on page {} after {} name-resolution retries: {}",
                                    page,
                                    dns_retries,
                                    err
                                );
                                last_error = Some(err.to_string());
                                HarvestState::Done(StopReason::FetchExhausted)
                            }
                        }
                        Err(err) => {
                            tracing::error!(page, kind = err.kind(), "Fetch failed: {}", err);
                            last_error = Some(err.to_string());
                            HarvestState::Done(StopReason::FetchExhausted)
                        }
                    }
                }

                HarvestState::Retrying { page, reason } => {
                    tracing::debug!(page, ?reason, "Waiting before refetch");
                    tokio::time::sleep(self.dns_retry.delay).await;
                    HarvestState::Fetching { page }
                }

                HarvestState::Extracting { page, body } => {
                    let parsed = self.extractor.parse_page(&body);
                    tracing::debug!(page, "Extracted {} records", parsed.records.len());

                    if parsed.records.is_empty() {
                        HarvestState::Done(StopReason::NoItemsOnPage)
                    } else {
                        HarvestState::Evaluating {
                            page,
                            records: parsed.records,
                            has_next_page: parsed.has_next_page,
                        }
                    }
                }

                HarvestState::Evaluating {
                    page,
                    records: page_records,
                    has_next_page,
                } => {
                    let room = cap.saturating_sub(records.len());
                    records.extend(page_records.into_iter().take(room));

                    if records.len() >= cap {
                        HarvestState::Done(StopReason::CapReached)
                    } else if !has_next_page {
                        HarvestState::Done(StopReason::NoNextPage)
                    } else {
                        HarvestState::Fetching { page: page + 1 }
                    }
                }

                done @ HarvestState::Done(_) => done,
            };
        };

        if stop_reason.is_end_of_results() {
            tracing::debug!("Reached the last result page for '{}'", run.keyword);
        }

        tracing::info!(
            reason = %stop_reason,
            "Harvest for '{}' stopped: {} records from {} pages in {:?}",
            run.keyword,
            records.len(),
            pages_fetched,
            start_time.elapsed()
        );

        HarvestOutcome {
            records,
            stop_reason,
            pages_fetched,
            fetch_calls,
            last_error,
        }
    }
}

impl Harvester<HttpPageSource> {
    /// Creates a network-backed harvester from a full configuration
    pub fn from_config(config: &Config) -> Result<Self, HarvestError> {
        let source = HttpPageSource::new(&config.http)?;
        Self::new(source, &config.pacing)
    }
}

/// Harvests `keyword` from the default endpoint with default pacing
///
/// Returns at most `max_records` records. A `max_records` of zero or less
/// returns an empty result without touching the network.
///
/// # Example
///
/// ```no_run
/// use listing_harvester::harvest;
///
/// # async fn example() -> listing_harvester::Result<()> {
/// let records = harvest("gaming laptop", 50, 50).await?;
/// println!("{} records", records.len());
/// # Ok(())
/// # }
/// ```
pub async fn harvest(keyword: &str, max_records: i64, page_size: u32) -> crate::Result<Vec<Record>> {
    let source = HttpPageSource::new(&HttpConfig::default())?;
    let mut harvester = Harvester::new(source, &PacingConfig::default())?;
    let outcome = harvester
        .run(&RunConfig::new(keyword, max_records, page_size))
        .await;
    Ok(outcome.records)
}
