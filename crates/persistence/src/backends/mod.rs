//! Storage backend implementations.
//!
//! Each backend is gated behind a feature flag; all three are enabled by
//! default.
//!
//! # Available Backends
//!
//! | Backend | Feature | Description |
//! |---------|---------|-------------|
//! | SQLite | `sqlite` | Local embedded database, the default fallback |
//! | Google Sheets | `sheets` | A shared spreadsheet, one sheet per table |
//! | Supabase | `supabase` | Hosted PostgreSQL through PostgREST |
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "sqlite")]
//! use tbi_persistence::backends::sqlite::SqliteBackend;
//!
//! # #[cfg(feature = "sqlite")]
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Create an in-memory SQLite backend
//! let backend = SqliteBackend::in_memory()?;
//!
//! // Or use a file-based database
//! let backend = SqliteBackend::open("./data/pacientes.db")?;
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sheets")]
pub mod sheets;

#[cfg(feature = "supabase")]
pub mod supabase;
