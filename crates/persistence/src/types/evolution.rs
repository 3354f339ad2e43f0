//! Evolution (history) entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One append-only history entry written when a tracked field changes.
///
/// Snapshot fields hold the values supplied by the triggering update; a
/// field the update did not touch stays `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evolution {
    /// The patient this entry belongs to.
    pub record_id: String,

    /// When the update was applied.
    pub recorded_at: DateTime<Utc>,

    /// ICU days at the time of the update.
    #[serde(default)]
    pub icu_days_elapsed: Option<u32>,

    /// Glasgow score at the time of the update.
    #[serde(default)]
    pub glasgow_current: Option<u8>,

    /// ICP monitoring flag at the time of the update.
    #[serde(default)]
    pub requires_icp: Option<bool>,

    /// Ventilation flag at the time of the update.
    #[serde(default)]
    pub requires_ventilation: Option<bool>,

    /// Craniectomy flag at the time of the update.
    #[serde(default)]
    pub requires_craniectomy: Option<bool>,

    /// Note entered with the update.
    #[serde(default)]
    pub note: String,
}

/// Orders evolutions newest first.
///
/// The sort is stable, so entries with equal timestamps keep their
/// relative order; callers pass them newest-append first.
pub fn sort_newest_first(evolutions: &mut [Evolution]) {
    evolutions.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn evolution(note: &str, hour: u32) -> Evolution {
        Evolution {
            record_id: "HC-001".to_string(),
            recorded_at: Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap(),
            icu_days_elapsed: None,
            glasgow_current: Some(11),
            requires_icp: None,
            requires_ventilation: None,
            requires_craniectomy: None,
            note: note.to_string(),
        }
    }

    #[test]
    fn test_sort_newest_first() {
        let mut entries = vec![evolution("a", 8), evolution("c", 12), evolution("b", 10)];
        sort_newest_first(&mut entries);
        let notes: Vec<_> = entries.iter().map(|e| e.note.as_str()).collect();
        assert_eq!(notes, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_sort_is_stable_for_ties() {
        let mut entries = vec![evolution("later-append", 9), evolution("earlier-append", 9)];
        sort_newest_first(&mut entries);
        assert_eq!(entries[0].note, "later-append");
    }
}
