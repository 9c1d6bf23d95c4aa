//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::record::Record;
use crate::state::StopReason;
use crate::storage::RunRecord;
use thiserror::Error;

/// Maximum number of records returned by [`Storage::find`]
pub const FIND_LIMIT: usize = 100;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Invalid stored value in {column}: {value}")]
    InvalidValue { column: &'static str, value: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// The harvest loop itself never touches storage; the caller persists the
/// outcome of a run and later queries it.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new harvest run in the `running` state
    ///
    /// # Arguments
    ///
    /// * `keyword` - The search keyword of the run
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, keyword: &str, config_hash: &str) -> StorageResult<i64>;

    /// Records how a run ended and stamps its finish time
    fn finish_run(
        &mut self,
        run_id: i64,
        stop_reason: StopReason,
        record_count: usize,
    ) -> StorageResult<()>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    // ===== Records =====

    /// Appends records for a run, keeping their order
    ///
    /// # Returns
    ///
    /// The number of records inserted
    fn persist(&mut self, run_id: i64, records: &[Record]) -> StorageResult<usize>;

    /// Finds records whose title or description contains `query`
    ///
    /// Matching is a case-sensitive substring match. At most [`FIND_LIMIT`]
    /// records are returned, oldest first.
    fn find(&self, query: &str) -> StorageResult<Vec<Record>>;

    /// Loads stored records in insertion order, optionally limited
    fn load_records(&self, limit: Option<usize>) -> StorageResult<Vec<Record>>;

    /// Counts all stored records
    fn count_records(&self) -> StorageResult<u64>;
}
