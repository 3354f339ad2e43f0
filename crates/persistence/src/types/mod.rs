//! Core types for the patient registry.
//!
//! This module contains the record types shared by every backend:
//!
//! - [`Patient`] and [`PatientDraft`]: the registered record and its
//!   submission form
//! - [`PatientUpdate`]: sparse field changes, with [`TrackedField`] naming
//!   the fields that feed the evolution log
//! - [`Evolution`]: one append-only history entry
//! - [`PatientFilter`]: cohort filters for listings
//! - Controlled vocabularies ([`Sex`], [`DrainType`], [`PostIcuDestination`],
//!   [`InjuryOrigin`])
//! - [`PatientColumn`] / [`EvolutionColumn`]: the shared column layout

mod columns;
mod evolution;
mod filter;
mod patient;
mod update;
mod vocabulary;

pub use columns::{EvolutionColumn, FieldValue, PatientColumn, timestamp_text};
pub use evolution::{Evolution, sort_newest_first};
pub use filter::{FlagFilter, PatientFilter};
pub use patient::{AGE_RANGE, GLASGOW_RANGE, Patient, PatientDraft, normalize_record_id};
pub use update::{PatientUpdate, TrackedField};
pub use vocabulary::{
    ASSOCIATED_INJURIES, DrainType, InjuryOrigin, PostIcuDestination, Sex,
    compose_associated_injuries, is_motorcycle_origin,
};
