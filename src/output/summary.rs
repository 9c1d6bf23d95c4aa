//! Output error types and the run summary
//!
//! This module defines the data a run summary is rendered from and the
//! errors output writers can return.

use crate::output::stats::HarvestStatistics;
use crate::storage::StorageError;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("No harvest runs found in database")]
    NoRuns,

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Summary of one harvest run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    // Run metadata
    pub run_id: i64,
    pub keyword: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub duration_seconds: Option<u64>,
    pub status: String,
    pub stop_reason: Option<String>,
    pub config_hash: String,

    /// Records collected by this run
    pub run_records: u64,

    /// Statistics over every stored record
    pub statistics: HarvestStatistics,
}

impl RunSummary {
    /// Creates a new empty summary
    pub fn new() -> Self {
        Self::default()
    }
}
