//! SQLite store utilities.
//!
//! Runtime defaults:
//! - `journal_mode = WAL` so readers do not block the single writer
//! - `busy_timeout = 5s` to ride out transient lock contention
//! - `foreign_keys = ON` so `parent_id` / `automapping_id` actions fire

pub mod migrations;
pub mod objects;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::model::Stub;
use std::{path::Path, time::Duration};

/// Busy timeout used for store connections.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open (or create) the store database, apply runtime pragmas, and migrate
/// the schema to the latest version.
///
/// # Errors
///
/// Returns an error if opening/configuring/migrating the database fails.
pub fn open_store(path: &Path) -> Result<Connection> {
    open_store_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
}

/// [`open_store`] with an explicit busy timeout.
///
/// # Errors
///
/// Returns an error if opening/configuring/migrating the database fails.
pub fn open_store_with_timeout(path: &Path, busy_timeout: Duration) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create store directory {}", parent.display()))?;
    }

    let mut conn =
        Connection::open(path).with_context(|| format!("open store {}", path.display()))?;

    configure_connection(&conn, busy_timeout).context("configure sqlite pragmas")?;
    migrations::migrate(&mut conn).context("apply store migrations")?;

    Ok(conn)
}

/// Open a migrated in-memory store.
///
/// # Errors
///
/// Returns an error if configuring or migrating the database fails.
pub fn open_in_memory() -> Result<Connection> {
    let mut conn = Connection::open_in_memory().context("open in-memory store")?;
    conn.pragma_update(None, "foreign_keys", "ON")
        .context("enable foreign keys")?;
    migrations::migrate(&mut conn).context("apply store migrations")?;
    Ok(conn)
}

fn configure_connection(conn: &Connection, busy_timeout: Duration) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    let _journal_mode: String =
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.busy_timeout(busy_timeout)?;
    Ok(())
}

/// Wall-clock timestamp in microseconds, used for audit columns.
pub(crate) fn now_us() -> i64 {
    chrono::Utc::now().timestamp_micros()
}

/// Run `f` inside a named savepoint: released on `Ok`, rolled back on `Err`.
///
/// Savepoints nest, so callers may wrap several graph operations in their
/// own outer transaction.
pub(crate) fn in_savepoint<T, E>(
    conn: &Connection,
    name: &str,
    f: impl FnOnce() -> std::result::Result<T, E>,
) -> std::result::Result<T, E>
where
    E: From<rusqlite::Error>,
{
    conn.execute_batch(&format!("SAVEPOINT {name}"))?;
    match f() {
        Ok(value) => {
            conn.execute_batch(&format!("RELEASE {name}"))?;
            Ok(value)
        }
        Err(err) => {
            let rollback_sql = format!("ROLLBACK TO {name}; RELEASE {name}");
            if let Err(rollback) = conn.execute_batch(&rollback_sql) {
                tracing::warn!(savepoint = name, error = %rollback, "savepoint rollback failed");
            }
            Err(err)
        }
    }
}

/// Encode a stub set as one JSON parameter: `[["Control",1],["Risk",5]]`.
///
/// Binding the whole set as a single value keeps batch lookups to one
/// statement regardless of SQLite's host-parameter limit.
pub(crate) fn stub_set_param<'a>(
    stubs: impl IntoIterator<Item = &'a Stub>,
) -> serde_json::Result<String> {
    let pairs: Vec<(&str, i64)> = stubs
        .into_iter()
        .map(|stub| (stub.object_type.as_str(), stub.id))
        .collect();
    serde_json::to_string(&pairs)
}

/// Row-value subquery expanding a [`stub_set_param`] bound at `?{param}`.
pub(crate) fn stub_set_subquery(param: usize) -> String {
    format!(
        "SELECT json_extract(value, '$[0]'), json_extract(value, '$[1]') FROM json_each(?{param})"
    )
}

/// Whether `err` is a UNIQUE / PRIMARY KEY constraint failure.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        }
        _ => false,
    }
}
