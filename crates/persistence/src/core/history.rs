//! Evolution log decisions.
//!
//! Whether an update writes an evolution entry depends only on the set of
//! fields it carries. Every backend calls [`evolution_for_update`] instead of
//! inspecting the update itself.

use chrono::{DateTime, Utc};

use crate::types::{Evolution, PatientUpdate};

/// Builds the evolution entry an update must append, if any.
///
/// Returns `Some` iff the update carries at least one tracked field. The
/// entry snapshots the tracked values supplied by the update and the
/// update's evolution note.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use tbi_persistence::core::evolution_for_update;
/// use tbi_persistence::types::PatientUpdate;
///
/// let update = PatientUpdate {
///     glasgow_current: Some(11),
///     evolution_note: Some("improving".to_string()),
///     ..Default::default()
/// };
/// let entry = evolution_for_update("HC-001", &update, Utc::now()).unwrap();
/// assert_eq!(entry.glasgow_current, Some(11));
/// assert_eq!(entry.note, "improving");
///
/// let untracked = PatientUpdate {
///     diagnosis: Some("Revised".to_string()),
///     ..Default::default()
/// };
/// assert!(evolution_for_update("HC-001", &untracked, Utc::now()).is_none());
/// ```
pub fn evolution_for_update(
    record_id: &str,
    update: &PatientUpdate,
    now: DateTime<Utc>,
) -> Option<Evolution> {
    if update.tracked_fields().is_empty() {
        return None;
    }
    Some(Evolution {
        record_id: record_id.to_string(),
        recorded_at: now,
        icu_days_elapsed: update.icu_days_elapsed,
        glasgow_current: update.glasgow_current,
        requires_icp: update.requires_icp,
        requires_ventilation: update.requires_ventilation,
        requires_craniectomy: update.requires_craniectomy,
        note: update.evolution_note.clone().unwrap_or_default(),
    })
}

/// Appends a timestamped entry to an existing narrative.
///
/// Prior text is kept byte for byte; the entry follows after a blank line as
/// `[YYYY-MM-DD HH:MM] note`.
pub fn append_note(existing: &str, note: &str, at: DateTime<Utc>) -> String {
    let entry = format!("[{}] {}", at.format("%Y-%m-%d %H:%M"), note.trim());
    if existing.is_empty() {
        entry
    } else {
        format!("{}\n\n{}", existing, entry)
    }
}
