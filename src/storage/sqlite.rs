//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::record::Record;
use crate::state::StopReason;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult, FIND_LIMIT};
use crate::storage::{RunRecord, RunStatus};
use crate::HarvestError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const RUN_COLUMNS: &str =
    "id, keyword, started_at, finished_at, config_hash, status, stop_reason, record_count";

const RECORD_COLUMNS: &str =
    "title, price, url, description, reviews, rating, location, units_sold";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(HarvestError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, HarvestError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, HarvestError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn run_from_row(row: &Row) -> rusqlite::Result<(RunRecord, String, Option<String>)> {
    let status: String = row.get(5)?;
    let stop_reason: Option<String> = row.get(6)?;
    let record_count: i64 = row.get(7)?;

    let run = RunRecord {
        id: row.get(0)?,
        keyword: row.get(1)?,
        started_at: row.get(2)?,
        finished_at: row.get(3)?,
        config_hash: row.get(4)?,
        status: RunStatus::Running,
        stop_reason: None,
        record_count: u64::try_from(record_count).unwrap_or(0),
    };

    Ok((run, status, stop_reason))
}

/// Decodes the string-coded columns of a run row
fn decode_run(
    (mut run, status, stop_reason): (RunRecord, String, Option<String>),
) -> StorageResult<RunRecord> {
    run.status = RunStatus::from_db_string(&status).ok_or(StorageError::InvalidValue {
        column: "runs.status",
        value: status,
    })?;

    run.stop_reason = match stop_reason {
        Some(code) => Some(StopReason::from_db_string(&code).ok_or(
            StorageError::InvalidValue {
                column: "runs.stop_reason",
                value: code,
            },
        )?),
        None => None,
    };

    Ok(run)
}

fn record_from_row(row: &Row) -> rusqlite::Result<Record> {
    Ok(Record {
        title: row.get(0)?,
        price: row.get(1)?,
        url: row.get(2)?,
        description: row.get(3)?,
        review_count: row.get(4)?,
        rating: row.get(5)?,
        location: row.get(6)?,
        units_sold: row.get(7)?,
    })
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, keyword: &str, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (keyword, started_at, config_hash, status) VALUES (?1, ?2, ?3, ?4)",
            params![keyword, now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        stop_reason: StopReason,
        record_count: usize,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let status = RunStatus::for_outcome(stop_reason, record_count);
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, stop_reason = ?2, record_count = ?3, finished_at = ?4
             WHERE id = ?5",
            params![
                status.to_db_string(),
                stop_reason.to_db_string(),
                record_count as i64,
                now,
                run_id
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let raw = self
            .conn
            .query_row(
                &format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))?;

        decode_run(raw)
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let raw = self
            .conn
            .query_row(
                &format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS),
                [],
                run_from_row,
            )
            .optional()?;

        raw.map(decode_run).transpose()
    }

    // ===== Records =====

    fn persist(&mut self, run_id: i64, records: &[Record]) -> StorageResult<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO records (run_id, {}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                RECORD_COLUMNS
            ))?;

            for record in records {
                stmt.execute(params![
                    run_id,
                    record.title,
                    record.price,
                    record.url,
                    record.description,
                    record.review_count,
                    record.rating,
                    record.location,
                    record.units_sold,
                ])?;
            }
        }
        tx.commit()?;

        tracing::debug!("Persisted {} records for run {}", records.len(), run_id);
        Ok(records.len())
    }

    fn find(&self, query: &str) -> StorageResult<Vec<Record>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM records
             WHERE instr(title, ?1) > 0 OR instr(description, ?1) > 0
             ORDER BY id LIMIT ?2",
            RECORD_COLUMNS
        ))?;

        let records = stmt
            .query_map(params![query, FIND_LIMIT as i64], record_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn load_records(&self, limit: Option<usize>) -> StorageResult<Vec<Record>> {
        // A negative LIMIT means no limit in SQLite
        let limit = limit.map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX));

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM records ORDER BY id LIMIT ?1",
            RECORD_COLUMNS
        ))?;

        let records = stmt
            .query_map(params![limit], record_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn count_records(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
