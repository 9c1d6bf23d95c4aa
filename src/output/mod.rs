//! Output module for exporting records and summarizing runs
//!
//! This module handles:
//! - Exporting harvested records to CSV
//! - Computing price and rating statistics
//! - Generating markdown summaries of harvest runs

mod csv_export;
mod markdown;
pub mod stats;
mod summary;

pub use csv_export::export_csv;
pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use stats::{
    clean_price, clean_rating, load_statistics, print_statistics, HarvestStatistics,
    LocationPrice,
};
pub use summary::{OutputError, OutputResult, RunSummary};

use crate::storage::Storage;
use crate::HarvestError;

/// Generates a summary of the latest run from storage
///
/// # Arguments
///
/// * `storage` - The storage backend containing harvest data
///
/// # Returns
///
/// * `Ok(RunSummary)` - Successfully generated summary
/// * `Err(HarvestError)` - No run stored, or storage failed
pub fn generate_summary(storage: &dyn Storage) -> Result<RunSummary, HarvestError> {
    let run = storage.get_latest_run()?.ok_or(OutputError::NoRuns)?;

    let duration_seconds = match (
        run.started_at.parse::<chrono::DateTime<chrono::Utc>>(),
        run.finished_at
            .as_deref()
            .map(|f| f.parse::<chrono::DateTime<chrono::Utc>>()),
    ) {
        (Ok(started), Some(Ok(finished))) => {
            Some((finished - started).num_seconds().max(0) as u64)
        }
        _ => None,
    };

    let statistics = stats::load_statistics(storage)?;

    Ok(RunSummary {
        run_id: run.id,
        keyword: run.keyword,
        started_at: run.started_at,
        finished_at: run.finished_at,
        duration_seconds,
        status: run.status.to_db_string().to_string(),
        stop_reason: run.stop_reason.map(|r| r.to_db_string().to_string()),
        config_hash: run.config_hash,
        run_records: run.record_count,
        statistics,
    })
}
