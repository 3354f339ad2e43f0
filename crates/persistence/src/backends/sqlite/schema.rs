//! SQLite schema definitions and migrations.

use rusqlite::Connection;
use tracing::info;

use crate::error::{BackendError, StorageError, StorageResult};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema.
pub fn initialize_schema(conn: &Connection) -> StorageResult<()> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        create_schema_v1(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
        info!(version = SCHEMA_VERSION, "Created SQLite schema");
    }

    Ok(())
}

fn schema_error(what: &str, e: rusqlite::Error) -> StorageError {
    StorageError::Backend(BackendError::Internal {
        backend_name: "sqlite".to_string(),
        message: format!("Failed to {}: {}", what, e),
        source: None,
    })
}

/// Get the current schema version.
fn get_schema_version(conn: &Connection) -> StorageResult<i32> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER NOT NULL
        )",
        [],
    )
    .map_err(|e| schema_error("create schema_version table", e))?;

    let version: Option<i32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .ok();

    Ok(version.unwrap_or(0))
}

/// Set the schema version.
fn set_schema_version(conn: &Connection, version: i32) -> StorageResult<()> {
    conn.execute("DELETE FROM schema_version", [])
        .map_err(|e| schema_error("clear schema_version", e))?;

    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])
        .map_err(|e| schema_error("set schema_version", e))?;

    Ok(())
}

/// Create the initial schema (version 1).
fn create_schema_v1(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS patients (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            record_id TEXT UNIQUE NOT NULL,
            age INTEGER NOT NULL,
            sex TEXT NOT NULL,
            admission_date TEXT NOT NULL,
            diagnosis TEXT NOT NULL,
            injury_origin TEXT NOT NULL DEFAULT '',
            helmet_use INTEGER,
            associated_injuries TEXT NOT NULL DEFAULT '',
            requires_icp INTEGER NOT NULL DEFAULT 0,
            requires_ventilation INTEGER NOT NULL DEFAULT 0,
            requires_craniectomy INTEGER NOT NULL DEFAULT 0,
            has_drain INTEGER NOT NULL DEFAULT 0,
            drain_type TEXT,
            icu_days_elapsed INTEGER NOT NULL DEFAULT 0,
            glasgow_on_admission INTEGER NOT NULL,
            glasgow_current INTEGER NOT NULL,
            post_icu_destination TEXT NOT NULL,
            sequelae_motor INTEGER NOT NULL DEFAULT 0,
            sequelae_neurological INTEGER NOT NULL DEFAULT 0,
            sequelae_cognitive INTEGER NOT NULL DEFAULT 0,
            notes TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_patients_admission
            ON patients (admission_date DESC);

        CREATE TABLE IF NOT EXISTS evolutions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            record_id TEXT NOT NULL,
            recorded_at TEXT NOT NULL,
            icu_days_elapsed INTEGER,
            glasgow_current INTEGER,
            requires_icp INTEGER,
            requires_ventilation INTEGER,
            requires_craniectomy INTEGER,
            note TEXT NOT NULL DEFAULT ''
        );

        CREATE INDEX IF NOT EXISTS idx_evolutions_record
            ON evolutions (record_id, recorded_at DESC);",
    )
    .map_err(|e| schema_error("create schema", e))
}
