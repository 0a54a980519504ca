//! Shift overlap detection.

use chrono::NaiveDateTime;

use crate::models::{ConflictInfo, ConflictKind, ConflictSeverity, Shift};

/// Half-open interval overlap: `[a_start, a_end)` and `[b_start, b_end)`.
///
/// Touching intervals (one ends exactly when the other starts) do not overlap.
pub fn overlaps(
    a_start: NaiveDateTime,
    a_end: NaiveDateTime,
    b_start: NaiveDateTime,
    b_end: NaiveDateTime,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// Existing shifts of the candidate's employee that overlap the candidate.
///
/// The candidate itself (same id) is never reported, so this also works for
/// updates of a stored shift.
pub fn find_conflicts<'a>(candidate: &Shift, existing: &'a [Shift]) -> Vec<&'a Shift> {
    existing
        .iter()
        .filter(|other| other.id != candidate.id)
        .filter(|other| other.employee_id == candidate.employee_id)
        .filter(|other| {
            overlaps(
                candidate.start_time,
                candidate.end_time,
                other.start_time,
                other.end_time,
            )
        })
        .collect()
}

/// Conflict summary for a shift, `None` when nothing overlaps.
pub fn conflict_info(candidate: &Shift, conflicts: &[&Shift]) -> Option<ConflictInfo> {
    if conflicts.is_empty() {
        return None;
    }

    let windows: Vec<String> = conflicts
        .iter()
        .map(|s| format!("{} - {}", s.start_time.format("%d.%m. %H:%M"), s.end_time.format("%H:%M")))
        .collect();

    Some(ConflictInfo {
        kind: ConflictKind::Overlap,
        description: format!(
            "Shift {} - {} overlaps {} existing shift(s): {}",
            candidate.start_time.format("%d.%m. %H:%M"),
            candidate.end_time.format("%H:%M"),
            conflicts.len(),
            windows.join(", ")
        ),
        severity: ConflictSeverity::High,
        conflicting_shift_ids: conflicts.iter().map(|s| s.id.clone()).collect(),
    })
}
