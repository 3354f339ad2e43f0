//! HTTP request handlers.
//!
//! - [`patients`] - List, register, read and remove patients
//! - [`evolutions`] - Record an evolution and read the evolution log
//! - [`reports`] - Cohort statistics and CSV export
//! - [`health`] - Health, readiness and backend description

pub mod evolutions;
pub mod health;
pub mod patients;
pub mod reports;

// Re-export handlers for convenience
pub use evolutions::{evolve_handler, history_handler};
pub use health::{backend_handler, health_handler, readiness_handler};
pub use patients::{create_handler, delete_handler, list_handler, read_handler};
pub use reports::{export_handler, statistics_handler};
