//! SQLite backend implementation.
//!
//! This module provides the embedded storage backend. It supports both
//! in-memory databases (great for testing) and file-based databases (the
//! default deployment when no remote credentials are configured).
//!
//! # Features
//!
//! - In-memory and file-based modes
//! - Duplicate record identifiers rejected by a UNIQUE constraint
//! - Sparse update and evolution append in a single transaction
//! - Permanent deletion
//!
//! # Example
//!
//! ```no_run
//! use tbi_persistence::backends::sqlite::SqliteBackend;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Create an in-memory database
//! let backend = SqliteBackend::in_memory()?;
//!
//! // Initialize the schema
//! backend.init_schema()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE patients (
//!     id INTEGER PRIMARY KEY AUTOINCREMENT,
//!     record_id TEXT UNIQUE NOT NULL,
//!     -- one column per patient attribute, booleans as INTEGER 0/1
//!     created_at TEXT NOT NULL,
//!     updated_at TEXT NOT NULL
//! );
//!
//! CREATE TABLE evolutions (
//!     id INTEGER PRIMARY KEY AUTOINCREMENT,
//!     record_id TEXT NOT NULL,
//!     recorded_at TEXT NOT NULL,
//!     icu_days_elapsed INTEGER,
//!     glasgow_current INTEGER,
//!     requires_icp INTEGER,
//!     requires_ventilation INTEGER,
//!     requires_craniectomy INTEGER,
//!     note TEXT NOT NULL DEFAULT ''
//! );
//! ```

mod backend;
mod schema;
mod storage;

pub use backend::{SqliteBackend, SqliteBackendConfig};
pub use schema::SCHEMA_VERSION;
