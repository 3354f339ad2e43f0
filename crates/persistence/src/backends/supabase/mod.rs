//! Supabase backend implementation.
//!
//! Stores patients and evolutions in two tables of a hosted PostgreSQL
//! database, accessed through Supabase's PostgREST endpoint
//! (`{url}/rest/v1/{table}`). The tables are provisioned out-of-band from
//! the Supabase dashboard; [`initialize`](crate::core::Backend::initialize)
//! only probes them and logs a hint when they are missing.
//!
//! # Duplicate detection
//!
//! Inserts check for an existing `record_id` first. When the table carries a
//! UNIQUE constraint on `record_id`, a concurrent insert that slips between
//! the check and the write is rejected with `409 Conflict`, which is
//! reported as a duplicate.
//!
//! # Example
//!
//! ```ignore
//! use tbi_persistence::backends::supabase::{SupabaseBackend, SupabaseConfig};
//!
//! let config = SupabaseConfig::new("https://xyzcompany.supabase.co", api_key);
//! let backend = SupabaseBackend::new(config)?;
//! backend.initialize().await?;
//! ```

mod backend;
mod storage;

pub use backend::{SupabaseBackend, SupabaseConfig};
