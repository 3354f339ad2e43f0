//! Controlled vocabularies for patient records.
//!
//! Enumerated attributes serialize in kebab-case. Parsing is lenient: it
//! also accepts the Spanish display labels of the clinical forms
//! (`Masculino`, `DVE (Drenaje Ventricular Externo)`, ...) when they are
//! found in a cell.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Patient sex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Sex {
    /// Male.
    Male,
    /// Female.
    Female,
    /// Stored value could not be read. Never accepted on input.
    Unknown,
}

impl Sex {
    /// Returns the canonical string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "male",
            Sex::Female => "female",
            Sex::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sex {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" | "masculino" => Ok(Sex::Male),
            "female" | "f" | "femenino" => Ok(Sex::Female),
            "unknown" => Ok(Sex::Unknown),
            other => Err(invalid("sex", other)),
        }
    }
}

/// Type of drain placed in addition to ICP monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DrainType {
    /// External ventricular drain (DVE).
    ExternalVentricular,
    /// Aspirative drain.
    Aspirative,
}

impl DrainType {
    /// Returns the canonical string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            DrainType::ExternalVentricular => "external-ventricular",
            DrainType::Aspirative => "aspirative",
        }
    }
}

impl fmt::Display for DrainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DrainType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        if normalized == "external-ventricular"
            || normalized.starts_with("dve")
            || normalized.contains("ventricular")
        {
            Ok(DrainType::ExternalVentricular)
        } else if normalized == "aspirative" || normalized.starts_with("aspirativ") {
            Ok(DrainType::Aspirative)
        } else {
            Err(invalid("drain_type", &normalized))
        }
    }
}

/// Where the patient went after the ICU stay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PostIcuDestination {
    /// Patient remains in the ICU.
    #[default]
    StillInIcu,
    /// Discharged to a general ward.
    GeneralWard,
    /// Moved to intermediate care.
    IntermediateCare,
    /// Transferred to another facility.
    Transferred,
    /// Patient died.
    Deceased,
}

impl PostIcuDestination {
    /// All destinations in display order.
    pub const ALL: [PostIcuDestination; 5] = [
        PostIcuDestination::StillInIcu,
        PostIcuDestination::GeneralWard,
        PostIcuDestination::IntermediateCare,
        PostIcuDestination::Transferred,
        PostIcuDestination::Deceased,
    ];

    /// Returns the canonical string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            PostIcuDestination::StillInIcu => "still-in-icu",
            PostIcuDestination::GeneralWard => "general-ward",
            PostIcuDestination::IntermediateCare => "intermediate-care",
            PostIcuDestination::Transferred => "transferred",
            PostIcuDestination::Deceased => "deceased",
        }
    }
}

impl fmt::Display for PostIcuDestination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostIcuDestination {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "still-in-icu" | "aún en uti" | "aun en uti" => Ok(PostIcuDestination::StillInIcu),
            "general-ward" | "cuidados generales" => Ok(PostIcuDestination::GeneralWard),
            "intermediate-care" | "utim" => Ok(PostIcuDestination::IntermediateCare),
            "transferred" | "derivado a otro centro" => Ok(PostIcuDestination::Transferred),
            "deceased" | "óbito" | "obito" => Ok(PostIcuDestination::Deceased),
            other => Err(invalid("post_icu_destination", other)),
        }
    }
}

/// Fixed vocabulary for the mechanism of injury.
///
/// `injury_origin` is stored as free text: one of these labels, or the
/// clinician's own description when [`InjuryOrigin::OTHER`] was chosen.
pub struct InjuryOrigin;

#[allow(missing_docs)]
impl InjuryOrigin {
    pub const MOTORCYCLE_ACCIDENT: &'static str = "motorcycle accident";
    pub const CAR_ACCIDENT: &'static str = "car accident";
    pub const PEDESTRIAN_ACCIDENT: &'static str = "pedestrian accident";
    pub const FALL_FROM_HEIGHT: &'static str = "fall from height";
    pub const SAME_LEVEL_FALL: &'static str = "same-level fall";
    pub const ASSAULT: &'static str = "assault";
    pub const WORK_ACCIDENT: &'static str = "work accident";
    pub const OTHER: &'static str = "other";

    /// The selectable origins in display order.
    pub const ALL: [&'static str; 8] = [
        Self::MOTORCYCLE_ACCIDENT,
        Self::CAR_ACCIDENT,
        Self::PEDESTRIAN_ACCIDENT,
        Self::FALL_FROM_HEIGHT,
        Self::SAME_LEVEL_FALL,
        Self::ASSAULT,
        Self::WORK_ACCIDENT,
        Self::OTHER,
    ];

    /// Resolves the stored origin from a selection and optional free text.
    ///
    /// Free text replaces the "other" selection when it is non-empty.
    pub fn resolve(selected: &str, other_text: Option<&str>) -> String {
        if selected == Self::OTHER {
            if let Some(text) = other_text.map(str::trim).filter(|t| !t.is_empty()) {
                return text.to_string();
            }
        }
        selected.to_string()
    }
}

/// Returns true if the origin describes a motorcycle incident.
///
/// Helmet use is only meaningful for these origins.
pub fn is_motorcycle_origin(origin: &str) -> bool {
    origin.to_lowercase().contains("moto")
}

/// Multi-select vocabulary for injuries associated with the TBI.
pub const ASSOCIATED_INJURIES: [&str; 11] = [
    "subdural hematoma",
    "epidural hematoma",
    "cerebral contusion",
    "subarachnoid hemorrhage",
    "skull fracture",
    "thoracic trauma",
    "abdominal trauma",
    "limb fractures",
    "facial trauma",
    "spinal cord injury",
    "no other injuries",
];

/// Composes the stored `associated_injuries` text.
///
/// Selected entries are joined with `", "`; free text follows after `" | "`,
/// or stands alone when nothing was selected.
pub fn compose_associated_injuries<S: AsRef<str>>(selected: &[S], free_text: &str) -> String {
    let mut composed = selected
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(", ");
    let free_text = free_text.trim();
    if !free_text.is_empty() {
        if composed.is_empty() {
            composed = free_text.to_string();
        } else {
            composed.push_str(" | ");
            composed.push_str(free_text);
        }
    }
    composed
}

fn invalid(field: &str, value: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        message: format!("unrecognized value '{}'", value),
    }
}
