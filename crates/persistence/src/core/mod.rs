//! Core storage traits and abstractions.
//!
//! This module provides the foundational pieces of the persistence layer:
//!
//! - [`Backend`] - Driver identity, capabilities and schema setup
//! - [`PatientStorage`] - The patient and evolution persistence contract
//! - [`evolution_for_update`] / [`append_note`] - The evolution log rules
//!
//! # Trait Hierarchy
//!
//! ```text
//! Backend
//!     └── PatientStorage
//! ```
//!
//! # Backend Capabilities
//!
//! Not all backends support all features. Deletion in particular is only
//! available on SQLite:
//!
//! ```ignore
//! use tbi_persistence::core::{Backend, BackendCapability};
//!
//! fn describe<B: Backend>(backend: &B) {
//!     println!("Backend: {}", backend.kind());
//!     println!("Supports delete: {}", backend.supports(BackendCapability::Delete));
//! }
//! ```

mod backend;
pub mod history;
mod storage;

pub use backend::{Backend, BackendCapability, BackendKind};
pub use history::{append_note, evolution_for_update};
pub use storage::PatientStorage;
