//! Bulk import/export job tracking.
//!
//! Jobs are owned by the user who created them: every read and write goes
//! through an ownership check against the acting [`Actor`].

pub mod status;

pub use status::{JobStatus, JobType, ParseJobEnumError};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;

use crate::context::Actor;
use crate::db::{in_savepoint, now_us};
use crate::error::{GraphError, Result};

const JOB_COLUMNS: &str = "job_id, job_type, status, description, created_at_us, start_at_us, \
     end_at_us, created_by_id, results, title, content, gdrive_metadata";

/// A stored import/export job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportExportJob {
    pub id: i64,
    pub job_type: JobType,
    pub status: JobStatus,
    pub description: Option<String>,
    pub created_at_us: i64,
    pub start_at_us: Option<i64>,
    pub end_at_us: Option<i64>,
    pub created_by_id: i64,
    /// JSON text.
    pub results: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    /// JSON text.
    pub gdrive_metadata: Option<String>,
}

/// Listing form of a job: no payload, parsed results, ISO timestamps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobLog {
    pub id: i64,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub status: JobStatus,
    pub description: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub created_by_id: i64,
    pub title: Option<String>,
    pub results: Option<serde_json::Value>,
}

impl ImportExportJob {
    /// # Errors
    ///
    /// Returns `Json` if the stored results are not valid JSON.
    pub fn log_json(&self) -> Result<JobLog> {
        let results: Option<serde_json::Value> = self
            .results
            .as_deref()
            .filter(|raw| !raw.is_empty())
            .map(serde_json::from_str)
            .transpose()?;

        Ok(JobLog {
            id: self.id,
            job_type: self.job_type,
            status: self.status,
            description: self.description.clone(),
            created_at: DateTime::<Utc>::from_timestamp_micros(self.created_at_us),
            start_at: self.start_at_us.and_then(DateTime::<Utc>::from_timestamp_micros),
            end_at: self.end_at_us.and_then(DateTime::<Utc>::from_timestamp_micros),
            created_by_id: self.created_by_id,
            title: self.title.clone(),
            results,
        })
    }
}

/// Input for [`create_job`]. Unset type and status default to
/// `Import` / `Not Started`.
#[derive(Debug, Clone, Default)]
pub struct NewJob {
    pub job_type: Option<JobType>,
    pub status: Option<JobStatus>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub results: Option<serde_json::Value>,
    pub gdrive_metadata: Option<serde_json::Value>,
}

/// Record a new job owned by `actor`.
///
/// # Errors
///
/// Returns an error if serialization or the insert fails.
pub fn create_job(conn: &Connection, actor: &Actor, new: NewJob) -> Result<ImportExportJob> {
    let results = new.results.as_ref().map(serde_json::to_string).transpose()?;
    let gdrive_metadata = new
        .gdrive_metadata
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    let job_type = new.job_type.unwrap_or_default();
    let status = new.status.unwrap_or_default();
    let now = now_us();

    conn.execute(
        "INSERT INTO import_exports (
            job_type, status, description, created_at_us, created_by_id,
            results, title, content, gdrive_metadata
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            job_type.as_str(),
            status.as_str(),
            new.description,
            now,
            actor.user_id,
            results,
            new.title,
            new.content,
            gdrive_metadata
        ],
    )?;

    let id = conn.last_insert_rowid();
    tracing::info!(job_id = id, job_type = %job_type, owner = actor.user_id, "created job");

    Ok(ImportExportJob {
        id,
        job_type,
        status,
        description: new.description,
        created_at_us: now,
        start_at_us: None,
        end_at_us: None,
        created_by_id: actor.user_id,
        results,
        title: new.title,
        content: new.content,
        gdrive_metadata,
    })
}

/// The actor's jobs of `job_type`, optionally restricted to `ids`.
///
/// An empty id list means no restriction.
///
/// # Errors
///
/// Returns an error if the query fails or stored results are not JSON.
pub fn get_jobs(
    conn: &Connection,
    actor: &Actor,
    job_type: JobType,
    ids: Option<&[i64]>,
) -> Result<Vec<JobLog>> {
    let ids = ids.filter(|ids| !ids.is_empty());
    let mut sql = format!(
        "SELECT {JOB_COLUMNS} FROM import_exports \
         WHERE created_by_id = ?1 AND job_type = ?2"
    );
    if ids.is_some() {
        sql.push_str(" AND job_id IN (SELECT value FROM json_each(?3))");
    }
    sql.push_str(" ORDER BY job_id");

    let mut stmt = conn.prepare(&sql)?;
    let jobs = match ids {
        Some(ids) => stmt
            .query_map(
                params![actor.user_id, job_type.as_str(), serde_json::to_string(ids)?],
                row_to_job,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?,
        None => stmt
            .query_map(params![actor.user_id, job_type.as_str()], row_to_job)?
            .collect::<rusqlite::Result<Vec<_>>>()?,
    };

    jobs.iter().map(ImportExportJob::log_json).collect()
}

/// Clear the actor's pending imports before starting a new one.
///
/// Deletes imports in `Not Started` or `Blocked`. Returns the number of
/// jobs removed.
///
/// # Errors
///
/// `BadRequest("Import in progress")` when the actor has an import in
/// `Analysis` or `In Progress`.
pub fn delete_previous_imports(conn: &Connection, actor: &Actor) -> Result<usize> {
    in_savepoint(conn, "delete_previous_imports", || {
        let active: bool = conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM import_exports
                WHERE created_by_id = ?1 AND job_type = ?2 AND status IN (?3, ?4)
             )",
            params![
                actor.user_id,
                JobType::Import.as_str(),
                JobStatus::Analysis.as_str(),
                JobStatus::InProgress.as_str()
            ],
            |row| row.get(0),
        )?;
        if active {
            return Err(GraphError::BadRequest("Import in progress".to_string()));
        }

        let removed = conn.execute(
            "DELETE FROM import_exports
             WHERE created_by_id = ?1 AND job_type = ?2 AND status IN (?3, ?4)",
            params![
                actor.user_id,
                JobType::Import.as_str(),
                JobStatus::NotStarted.as_str(),
                JobStatus::Blocked.as_str()
            ],
        )?;
        tracing::debug!(owner = actor.user_id, removed, "deleted previous imports");
        Ok(removed)
    })
}

/// Fetch a job the actor owns.
///
/// # Errors
///
/// `NotFound` when absent, `Forbidden` when owned by another user.
pub fn get(conn: &Connection, actor: &Actor, id: i64) -> Result<ImportExportJob> {
    let sql = format!("SELECT {JOB_COLUMNS} FROM import_exports WHERE job_id = ?1");
    let job = conn
        .query_row(&sql, [id], row_to_job)
        .optional()?
        .ok_or_else(|| GraphError::NotFound {
            kind: "job",
            key: id.to_string(),
        })?;

    if job.created_by_id != actor.user_id {
        return Err(GraphError::Forbidden(format!(
            "job {id} belongs to another user"
        )));
    }
    Ok(job)
}

/// Move a job to `status`, stamping `start_at` on entering `In Progress`
/// and `end_at` on entering a terminal status.
///
/// # Errors
///
/// Any [`get`] failure, or `InvalidTransition`.
pub fn update_status(
    conn: &Connection,
    actor: &Actor,
    id: i64,
    status: JobStatus,
) -> Result<ImportExportJob> {
    in_savepoint(conn, "job_status", || {
        let mut job = get(conn, actor, id)?;
        job.status.can_transition_to(status)?;

        let now = now_us();
        if status == JobStatus::InProgress && job.start_at_us.is_none() {
            job.start_at_us = Some(now);
        }
        if status.is_terminal() {
            job.end_at_us = Some(now);
        }

        conn.execute(
            "UPDATE import_exports SET status = ?1, start_at_us = ?2, end_at_us = ?3
             WHERE job_id = ?4",
            params![status.as_str(), job.start_at_us, job.end_at_us, id],
        )?;
        tracing::info!(job_id = id, from = %job.status, to = %status, "job status changed");

        job.status = status;
        Ok(job)
    })
}

/// Replace a job's results document.
///
/// # Errors
///
/// Any [`get`] failure, or a serialization/storage error.
pub fn set_results(
    conn: &Connection,
    actor: &Actor,
    id: i64,
    results: &serde_json::Value,
) -> Result<ImportExportJob> {
    in_savepoint(conn, "job_results", || {
        let mut job = get(conn, actor, id)?;
        let encoded = serde_json::to_string(results)?;
        conn.execute(
            "UPDATE import_exports SET results = ?1 WHERE job_id = ?2",
            params![encoded, id],
        )?;
        job.results = Some(encoded);
        Ok(job)
    })
}

fn row_to_job(row: &rusqlite::Row<'_>) -> rusqlite::Result<ImportExportJob> {
    Ok(ImportExportJob {
        id: row.get(0)?,
        job_type: parse_column(row, 1)?,
        status: parse_column(row, 2)?,
        description: row.get(3)?,
        created_at_us: row.get(4)?,
        start_at_us: row.get(5)?,
        end_at_us: row.get(6)?,
        created_by_id: row.get(7)?,
        results: row.get(8)?,
        title: row.get(9)?,
        content: row.get(10)?,
        gdrive_metadata: row.get(11)?,
    })
}

fn parse_column<T>(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = ParseJobEnumError>,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
