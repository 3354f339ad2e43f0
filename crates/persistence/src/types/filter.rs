//! Cohort filters for the patient listing.

use serde::{Deserialize, Serialize};

use super::patient::Patient;
use super::vocabulary::Sex;

/// Tri-state filter over a boolean attribute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagFilter {
    /// Do not filter.
    #[default]
    Any,
    /// Keep patients where the flag is set.
    Yes,
    /// Keep patients where the flag is clear.
    No,
}

impl FlagFilter {
    /// Returns true if `value` passes the filter.
    pub fn matches(&self, value: bool) -> bool {
        match self {
            FlagFilter::Any => true,
            FlagFilter::Yes => value,
            FlagFilter::No => !value,
        }
    }
}

/// Filter applied to the patient listing.
///
/// An empty `sexes` list keeps every patient.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientFilter {
    /// Sexes to keep.
    #[serde(default)]
    pub sexes: Vec<Sex>,

    /// ICP monitoring filter.
    #[serde(default)]
    pub icp: FlagFilter,

    /// Mechanical ventilation filter.
    #[serde(default)]
    pub ventilation: FlagFilter,
}

impl PatientFilter {
    /// Returns true if `patient` passes every criterion.
    pub fn matches(&self, patient: &Patient) -> bool {
        (self.sexes.is_empty() || self.sexes.contains(&patient.sex))
            && self.icp.matches(patient.requires_icp)
            && self.ventilation.matches(patient.requires_ventilation)
    }

    /// Keeps the matching patients, preserving order.
    pub fn apply(&self, patients: Vec<Patient>) -> Vec<Patient> {
        patients.into_iter().filter(|p| self.matches(p)).collect()
    }
}
