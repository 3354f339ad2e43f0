//! Backend abstraction for storage drivers.
//!
//! This module defines the [`Backend`] trait, which every storage driver
//! implements to report what it is, what it can do, and to prepare its
//! schema.

use std::fmt::Debug;

use async_trait::async_trait;

use crate::error::BackendError;

/// Identifies the type of storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// SQLite database (file-based or in-memory).
    Sqlite,
    /// Google Sheets spreadsheet.
    Sheets,
    /// Supabase hosted PostgreSQL, through PostgREST.
    Supabase,
}

impl BackendKind {
    /// Human-readable label for diagnostic display.
    pub fn label(&self) -> &'static str {
        match self {
            BackendKind::Sqlite => "SQLite (local)",
            BackendKind::Sheets => "Google Sheets",
            BackendKind::Supabase => "Supabase (PostgreSQL)",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Sqlite => write!(f, "sqlite"),
            BackendKind::Sheets => write!(f, "sheets"),
            BackendKind::Supabase => write!(f, "supabase"),
        }
    }
}

/// Capabilities that a backend may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendCapability {
    /// Insert, read and sparse update of patients.
    Crud,
    /// Evolution log.
    History,
    /// Permanent patient deletion.
    Delete,
    /// Update and evolution append commit atomically.
    Transactions,
    /// Duplicate record identifiers are rejected by the storage engine itself.
    UniqueConstraint,
    /// Schema is created by [`Backend::initialize`] rather than provisioned out-of-band.
    ManagedSchema,
}

impl std::fmt::Display for BackendCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BackendCapability::Crud => "crud",
            BackendCapability::History => "history",
            BackendCapability::Delete => "delete",
            BackendCapability::Transactions => "transactions",
            BackendCapability::UniqueConstraint => "unique-constraint",
            BackendCapability::ManagedSchema => "managed-schema",
        };
        write!(f, "{}", name)
    }
}

/// A storage driver.
///
/// # Example
///
/// ```ignore
/// use tbi_persistence::core::{Backend, BackendCapability};
///
/// if backend.supports(BackendCapability::Delete) {
///     storage.delete_patient("HC-001").await?;
/// }
/// ```
#[async_trait]
pub trait Backend: Send + Sync + Debug {
    /// Returns the kind of backend.
    fn kind(&self) -> BackendKind;

    /// Returns a short name for this backend, used in logs and errors.
    fn name(&self) -> &'static str;

    /// Returns all capabilities supported by this backend.
    fn capabilities(&self) -> Vec<BackendCapability>;

    /// Checks if this backend supports the given capability.
    fn supports(&self, capability: BackendCapability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// Checks if the backend is reachable.
    async fn health_check(&self) -> Result<(), BackendError>;

    /// Ensures the persistent schema exists.
    ///
    /// Idempotent. Backends whose schema is provisioned out-of-band log a
    /// hint and return `Ok` when they cannot create it.
    async fn initialize(&self) -> Result<(), BackendError>;
}
