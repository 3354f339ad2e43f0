//! Descriptive statistics over the patient cohort.
//!
//! Everything here is a pure projection over a slice of patients; nothing
//! is cached or persisted.

use std::collections::BTreeMap;

use chrono::Datelike;
use serde::Serialize;

use crate::types::{GLASGOW_RANGE, Patient, is_motorcycle_origin};

/// Summary of a numeric attribute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericSummary {
    /// Number of observations.
    pub count: usize,
    /// Arithmetic mean.
    pub mean: f64,
    /// Median; the mean of the two middle values for even counts.
    pub median: f64,
    /// Smallest value.
    pub min: f64,
    /// Largest value.
    pub max: f64,
    /// Most frequent value; the smallest one on ties.
    pub mode: f64,
}

impl NumericSummary {
    /// Summarizes `values`, or returns `None` when there are none.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        let mean = sorted.iter().sum::<f64>() / count as f64;
        let median = if count % 2 == 1 {
            sorted[count / 2]
        } else {
            (sorted[count / 2 - 1] + sorted[count / 2]) / 2.0
        };

        // Runs of equal values in sorted order; strict `>` keeps the first.
        let mut mode = sorted[0];
        let mut best_run = 0;
        let mut run_start = 0;
        for i in 1..=count {
            if i == count || sorted[i] != sorted[run_start] {
                let run = i - run_start;
                if run > best_run {
                    best_run = run;
                    mode = sorted[run_start];
                }
                run_start = i;
            }
        }

        Some(Self {
            count,
            mean,
            median,
            min: sorted[0],
            max: sorted[count - 1],
            mode,
        })
    }
}

/// Helmet use among motorcycle cases.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HelmetStatistics {
    /// Patients whose injury origin is a motorcycle accident.
    pub motorcycle_cases: usize,
    /// Wearing a helmet.
    pub with_helmet: usize,
    /// Not wearing a helmet.
    pub without_helmet: usize,
    /// Helmet use not recorded.
    pub unknown: usize,
    /// `with_helmet` as a percentage of all motorcycle cases.
    pub with_helmet_pct: Option<f64>,
    /// `without_helmet` as a percentage of all motorcycle cases.
    pub without_helmet_pct: Option<f64>,
}

/// Sequelae counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SequelaeStatistics {
    /// Motor sequelae.
    pub motor: usize,
    /// Neurological sequelae.
    pub neurological: usize,
    /// Cognitive sequelae.
    pub cognitive: usize,
    /// Patients with at least one sequela.
    pub any: usize,
}

/// Cohort-wide descriptive statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CohortStatistics {
    /// Number of patients.
    pub total: usize,
    /// Patients with intracranial pressure monitoring.
    pub with_icp: usize,
    /// Patients on mechanical ventilation.
    pub with_ventilation: usize,
    /// Patients who underwent craniectomy.
    pub with_craniectomy: usize,
    /// Patients with a drain.
    pub with_drain: usize,
    /// Patients per injury origin.
    pub by_origin: BTreeMap<String, usize>,
    /// Patients per sex.
    pub by_sex: BTreeMap<String, usize>,
    /// Patients per post-ICU destination.
    pub by_destination: BTreeMap<String, usize>,
    /// Drain type among patients with a drain.
    pub by_drain_type: BTreeMap<String, usize>,
    /// Helmet use among motorcycle cases.
    pub helmet: HelmetStatistics,
    /// Sequelae counts.
    pub sequelae: SequelaeStatistics,
    /// Admissions per month, keyed `YYYY-MM`.
    pub admissions_per_month: BTreeMap<String, usize>,
    /// Patients per Glasgow score on admission; every score from 3 to 15
    /// is present.
    pub glasgow_on_admission_histogram: BTreeMap<u8, usize>,
    /// Age in years.
    pub age: Option<NumericSummary>,
    /// Days in the ICU.
    pub icu_days: Option<NumericSummary>,
    /// Glasgow score on admission.
    pub glasgow_on_admission: Option<NumericSummary>,
}

fn percentage(part: usize, whole: usize) -> Option<f64> {
    (whole > 0).then(|| part as f64 / whole as f64 * 100.0)
}

fn bump(map: &mut BTreeMap<String, usize>, key: impl Into<String>) {
    *map.entry(key.into()).or_default() += 1;
}

impl CohortStatistics {
    /// Computes statistics for `patients`.
    pub fn from_patients(patients: &[Patient]) -> Self {
        let mut stats = Self {
            total: patients.len(),
            glasgow_on_admission_histogram: (GLASGOW_RANGE.0..=GLASGOW_RANGE.1)
                .map(|score| (score, 0))
                .collect(),
            ..Default::default()
        };

        for patient in patients {
            stats.with_icp += usize::from(patient.requires_icp);
            stats.with_ventilation += usize::from(patient.requires_ventilation);
            stats.with_craniectomy += usize::from(patient.requires_craniectomy);
            stats.with_drain += usize::from(patient.has_drain);

            bump(&mut stats.by_origin, patient.injury_origin.as_str());
            bump(&mut stats.by_sex, patient.sex.as_str());
            bump(&mut stats.by_destination, patient.post_icu_destination.as_str());
            if let Some(drain) = patient.drain_type.filter(|_| patient.has_drain) {
                bump(&mut stats.by_drain_type, drain.as_str());
            }

            if is_motorcycle_origin(&patient.injury_origin) {
                stats.helmet.motorcycle_cases += 1;
                match patient.helmet_use {
                    Some(true) => stats.helmet.with_helmet += 1,
                    Some(false) => stats.helmet.without_helmet += 1,
                    None => stats.helmet.unknown += 1,
                }
            }

            stats.sequelae.motor += usize::from(patient.sequelae_motor);
            stats.sequelae.neurological += usize::from(patient.sequelae_neurological);
            stats.sequelae.cognitive += usize::from(patient.sequelae_cognitive);
            stats.sequelae.any += usize::from(
                patient.sequelae_motor || patient.sequelae_neurological || patient.sequelae_cognitive,
            );

            let month = format!(
                "{:04}-{:02}",
                patient.admission_date.year(),
                patient.admission_date.month()
            );
            bump(&mut stats.admissions_per_month, month);
            *stats
                .glasgow_on_admission_histogram
                .entry(patient.glasgow_on_admission)
                .or_default() += 1;
        }

        let helmet = &mut stats.helmet;
        helmet.with_helmet_pct = percentage(helmet.with_helmet, helmet.motorcycle_cases);
        helmet.without_helmet_pct = percentage(helmet.without_helmet, helmet.motorcycle_cases);

        let ages: Vec<f64> = patients.iter().map(|p| f64::from(p.age)).collect();
        let icu_days: Vec<f64> = patients.iter().map(|p| f64::from(p.icu_days_elapsed)).collect();
        let glasgow: Vec<f64> = patients
            .iter()
            .map(|p| f64::from(p.glasgow_on_admission))
            .collect();
        stats.age = NumericSummary::from_values(&ages);
        stats.icu_days = NumericSummary::from_values(&icu_days);
        stats.glasgow_on_admission = NumericSummary::from_values(&glasgow);

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    use crate::types::{DrainType, InjuryOrigin, PatientDraft, Sex};

    fn patient(id: &str, age: u8, origin: &str, helmet: Option<bool>, month: u32) -> Patient {
        let mut draft = PatientDraft::new(
            id,
            age,
            Sex::Male,
            NaiveDate::from_ymd_opt(2024, month, 10).unwrap(),
            "TBI",
        );
        draft.injury_origin = origin.to_string();
        draft.helmet_use = helmet;
        Patient::from_draft(draft, Utc::now())
    }

    #[test]
    fn test_numeric_summary() {
        let summary = NumericSummary::from_values(&[7.0, 3.0, 7.0, 10.0]).unwrap();
        assert_eq!(summary.count, 4);
        assert_eq!(summary.mean, 6.75);
        assert_eq!(summary.median, 7.0);
        assert_eq!(summary.min, 3.0);
        assert_eq!(summary.max, 10.0);
        assert_eq!(summary.mode, 7.0);

        let odd = NumericSummary::from_values(&[5.0, 1.0, 3.0]).unwrap();
        assert_eq!(odd.median, 3.0);
        assert_eq!(odd.mode, 1.0);

        assert!(NumericSummary::from_values(&[]).is_none());
    }

    #[test]
    fn test_empty_cohort() {
        let stats = CohortStatistics::from_patients(&[]);
        assert_eq!(stats.total, 0);
        assert!(stats.age.is_none());
        assert_eq!(stats.glasgow_on_admission_histogram.len(), 13);
        assert!(stats.helmet.with_helmet_pct.is_none());
    }

    #[test]
    fn test_helmet_use_among_motorcycle_cases() {
        let patients = vec![
            patient("A", 20, InjuryOrigin::MOTORCYCLE_ACCIDENT, Some(true), 1),
            patient("B", 30, InjuryOrigin::MOTORCYCLE_ACCIDENT, Some(false), 1),
            patient("C", 40, InjuryOrigin::MOTORCYCLE_ACCIDENT, Some(false), 2),
            patient("D", 50, InjuryOrigin::MOTORCYCLE_ACCIDENT, None, 3),
            patient("E", 60, InjuryOrigin::CAR_ACCIDENT, None, 3),
        ];
        let stats = CohortStatistics::from_patients(&patients);
        assert_eq!(stats.helmet.motorcycle_cases, 4);
        assert_eq!(stats.helmet.with_helmet, 1);
        assert_eq!(stats.helmet.without_helmet, 2);
        assert_eq!(stats.helmet.unknown, 1);
        assert_eq!(stats.helmet.with_helmet_pct, Some(25.0));
        assert_eq!(stats.helmet.without_helmet_pct, Some(50.0));

        assert_eq!(stats.by_origin[InjuryOrigin::MOTORCYCLE_ACCIDENT], 4);
        assert_eq!(stats.admissions_per_month["2024-01"], 2);
        assert_eq!(stats.admissions_per_month["2024-03"], 2);
        assert_eq!(stats.age.as_ref().unwrap().median, 40.0);
    }

    #[test]
    fn test_interventions_and_drains() {
        let mut a = patient("A", 20, InjuryOrigin::FALL_FROM_HEIGHT, None, 5);
        a.requires_icp = true;
        a.has_drain = true;
        a.drain_type = Some(DrainType::ExternalVentricular);
        a.sequelae_motor = true;
        a.sequelae_cognitive = true;
        let mut b = patient("B", 30, InjuryOrigin::ASSAULT, None, 5);
        b.glasgow_on_admission = 8;

        let stats = CohortStatistics::from_patients(&[a, b]);
        assert_eq!(stats.with_icp, 1);
        assert_eq!(stats.with_drain, 1);
        assert_eq!(stats.by_drain_type["external-ventricular"], 1);
        assert_eq!(stats.sequelae.motor, 1);
        assert_eq!(stats.sequelae.any, 1);
        assert_eq!(stats.glasgow_on_admission_histogram[&8], 1);
        assert_eq!(stats.glasgow_on_admission_histogram[&15], 1);
        assert_eq!(stats.by_sex["male"], 2);
    }

    #[test]
    fn test_unreadable_sex_counted_separately() {
        let mut unread = patient("C", 51, InjuryOrigin::ASSAULT, None, 6);
        unread.sex = Sex::Unknown;

        let stats = CohortStatistics::from_patients(&[patient("A", 40, "", None, 4), unread]);
        assert_eq!(stats.total, 2);
        assert_eq!(stats.by_sex["male"], 1);
        assert_eq!(stats.by_sex["unknown"], 1);
    }
}
