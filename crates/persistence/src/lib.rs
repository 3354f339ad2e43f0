//! TBI Patient Registry Persistence Layer
//!
//! This crate stores and retrieves traumatic brain injury (TBI) patients
//! followed in an intensive-care unit, together with the append-only
//! evolution log written each time a clinically relevant field changes.
//!
//! # Features
//!
//! - **Interchangeable Backends**: SQLite, Google Sheets, Supabase
//! - **Single Storage Contract**: every backend implements [`PatientStorage`]
//! - **Evolution Log**: updates touching tracked fields append a history entry
//! - **Record Service**: validation and duplicate/not-found reporting
//! - **Reporting**: cohort statistics and CSV export
//!
//! # Backend Features
//!
//! Enable backends with feature flags in `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! tbi-persistence = { version = "0.1", default-features = false, features = ["sqlite"] }
//! ```
//!
//! Available backend features (all enabled by default):
//! - `sqlite` - SQLite with in-memory and file modes, the fallback backend
//! - `sheets` - Google Sheets through the Sheets API v4
//! - `supabase` - Supabase hosted PostgreSQL through PostgREST
//!
//! # Architecture
//!
//! - [`types`] - Patients, evolutions, sparse updates, vocabularies
//! - [`error`] - Error types for all operations
//! - [`core`] - The storage contract and the evolution decision function
//! - [`coercion`] - Lenient decoding of loosely typed remote rows
//! - [`backends`] - Backend implementations
//! - [`adapter`] - Picks one backend at startup
//! - [`service`] - Validated record operations
//! - [`stats`] and [`export`] - Read-only projections over the listing
//!
//! # Quick Start
//!
//! ```no_run
//! use chrono::NaiveDate;
//! use tbi_persistence::backends::sqlite::SqliteBackend;
//! use tbi_persistence::core::Backend;
//! use tbi_persistence::service::PatientService;
//! use tbi_persistence::types::{PatientDraft, PatientUpdate, Sex};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = SqliteBackend::in_memory()?;
//! backend.initialize().await?;
//! let service = PatientService::new(backend);
//!
//! let draft = PatientDraft::new(
//!     "HC-001",
//!     34,
//!     Sex::Male,
//!     NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
//!     "Severe TBI",
//! );
//! service.register(draft).await?;
//!
//! let update = PatientUpdate {
//!     glasgow_current: Some(11),
//!     ..Default::default()
//! };
//! service.evolve("HC-001", update, "improving").await?;
//!
//! assert_eq!(service.evolutions("HC-001").await?.len(), 1);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

#[cfg(feature = "sqlite")]
pub mod adapter;
pub mod backends;
pub mod coercion;
pub mod core;
pub mod error;
pub mod export;
pub mod service;
pub mod stats;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{StorageError, StorageResult};
pub use service::PatientService;
pub use stats::CohortStatistics;
pub use types::{Evolution, Patient, PatientDraft, PatientFilter, PatientUpdate};

// Re-export core traits
pub use core::{Backend, BackendCapability, BackendKind, PatientStorage};

#[cfg(feature = "sqlite")]
pub use adapter::{BackendDescription, SelectedBackend, StorageSettings, select_backend};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
