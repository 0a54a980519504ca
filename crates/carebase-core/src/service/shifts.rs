//! Shift operations with advisory overlap detection.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use super::{ensure, required};
use crate::db::Database;
use crate::models::{
    ConflictInfo, ConflictQuery, ConflictReport, NewShift, Shift, ShiftFilter, ShiftPatch, ShiftType,
};
use crate::scheduling::{conflict_info, find_conflicts};
use crate::{CareCore, CareResult};

pub(super) fn validate_shift(shift: &Shift) -> CareResult<()> {
    ensure(
        shift.end_time > shift.start_time,
        format!(
            "shift end {} must be after its start {}",
            shift.end_time, shift.start_time
        ),
    )
}

/// Refresh `shift.conflict_info` against the employee's stored shifts and
/// return the overlapping ones.
pub(super) fn annotate_conflicts(db: &Database, shift: &mut Shift) -> CareResult<Vec<Shift>> {
    let existing = db.shifts_intersecting(&shift.employee_id, shift.start_time, shift.end_time)?;
    let conflicts = find_conflicts(shift, &existing);
    shift.conflict_info = conflict_info(shift, &conflicts);

    if let Some(info) = &shift.conflict_info {
        warn!(
            shift_id = %shift.id,
            employee_id = %shift.employee_id,
            conflicting = ?info.conflicting_shift_ids,
            "shift overlaps existing shifts"
        );
    }
    Ok(conflicts.into_iter().cloned().collect())
}

/// Re-check the shifts a write touched: the ones the written shift
/// overlapped before (`before`) and the ones it overlaps now (`now`), so
/// their `conflict_info` stays in step with the roster.
pub(super) fn refresh_neighbours(
    db: &Database,
    before: Option<&ConflictInfo>,
    now: &[Shift],
) -> CareResult<()> {
    let ids: BTreeSet<&str> = before
        .into_iter()
        .flat_map(|info| info.conflicting_shift_ids.iter().map(String::as_str))
        .chain(now.iter().map(|s| s.id.as_str()))
        .collect();

    for id in ids {
        let Some(mut neighbour) = db.get_shift(id)? else {
            continue;
        };
        let previous = neighbour.conflict_info.clone();
        annotate_conflicts(db, &mut neighbour)?;
        if neighbour.conflict_info != previous {
            debug!(shift_id = %id, "conflict info refreshed");
            neighbour.touch();
            db.update_shift(&neighbour)?;
        }
    }
    Ok(())
}

impl CareCore {
    /// Store a shift. Overlaps are recorded in `conflict_info` but never
    /// block saving.
    pub fn create_shift(&self, input: NewShift) -> CareResult<Shift> {
        let mut shift = input.into_shift();
        validate_shift(&shift)?;

        let db = self.lock()?;
        required(db.get_employee(&shift.employee_id)?, "employee", &shift.employee_id)?;
        db.in_transaction(|db| -> CareResult<()> {
            let conflicts = annotate_conflicts(db, &mut shift)?;
            db.insert_shift(&shift)?;
            refresh_neighbours(db, None, &conflicts)
        })?;

        info!(shift_id = %shift.id, employee_id = %shift.employee_id, "shift created");
        Ok(shift)
    }

    pub fn get_shift(&self, id: &str) -> CareResult<Shift> {
        let db = self.lock()?;
        required(db.get_shift(id)?, "shift", id)
    }

    pub fn list_shifts(&self, filter: &ShiftFilter) -> CareResult<Vec<Shift>> {
        let db = self.lock()?;
        Ok(db.list_shifts(filter)?)
    }

    pub fn update_shift(&self, id: &str, patch: ShiftPatch) -> CareResult<Shift> {
        let db = self.lock()?;
        let mut shift = required(db.get_shift(id)?, "shift", id)?;
        let before = shift.conflict_info.clone();
        let reassigned = patch.employee_id.is_some();
        patch.apply(&mut shift);
        validate_shift(&shift)?;
        if reassigned {
            required(db.get_employee(&shift.employee_id)?, "employee", &shift.employee_id)?;
        }

        db.in_transaction(|db| -> CareResult<()> {
            let conflicts = annotate_conflicts(db, &mut shift)?;
            db.update_shift(&shift)?;
            refresh_neighbours(db, before.as_ref(), &conflicts)
        })?;
        info!(shift_id = %id, "shift updated");
        Ok(shift)
    }

    pub fn delete_shift(&self, id: &str) -> CareResult<()> {
        let db = self.lock()?;
        let shift = required(db.get_shift(id)?, "shift", id)?;
        db.in_transaction(|db| -> CareResult<()> {
            db.delete_shift(id)?;
            refresh_neighbours(db, shift.conflict_info.as_ref(), &[])
        })?;
        info!(shift_id = %id, "shift deleted");
        Ok(())
    }

    /// Dry run: which stored shifts would a shift in this window overlap?
    pub fn check_shift_conflicts(&self, query: ConflictQuery) -> CareResult<ConflictReport> {
        ensure(
            query.end_time > query.start_time,
            "end_time must be after start_time",
        )?;

        let mut candidate = Shift::new(
            query.employee_id,
            query.start_time,
            query.end_time,
            ShiftType::Regular,
        );
        if let Some(id) = query.shift_id {
            candidate.id = id;
        }

        let db = self.lock()?;
        let conflicts = annotate_conflicts(&db, &mut candidate)?;
        Ok(ConflictReport {
            has_conflicts: !conflicts.is_empty(),
            conflicts,
            conflict_info: candidate.conflict_info,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConflictKind, ConflictSeverity, NewEmployee};
    use crate::CareError;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn setup() -> (CareCore, String) {
        let core = CareCore::open_in_memory().unwrap();
        let employee = core
            .create_employee(NewEmployee {
                first_name: "Jonas".into(),
                last_name: "Weber".into(),
                role: "nurse".into(),
                email: None,
                phone: None,
                qualifications: Default::default(),
                working_hours: Default::default(),
                max_patients_per_day: None,
            })
            .unwrap();
        (core, employee.id)
    }

    fn new_shift(employee_id: &str, start: NaiveDateTime, end: NaiveDateTime) -> NewShift {
        NewShift {
            employee_id: employee_id.to_string(),
            start_time: start,
            end_time: end,
            shift_type: ShiftType::Regular,
            notes: None,
        }
    }

    #[test]
    fn test_touching_shifts_do_not_conflict() {
        let (core, emp) = setup();
        core.create_shift(new_shift(&emp, at(6, 10, 0), at(6, 14, 0))).unwrap();
        let second = core.create_shift(new_shift(&emp, at(6, 14, 0), at(6, 18, 0))).unwrap();
        assert!(second.conflict_info.is_none());
    }

    #[test]
    fn test_overlap_is_recorded_but_saved() {
        let (core, emp) = setup();
        let first = core.create_shift(new_shift(&emp, at(6, 14, 0), at(6, 18, 0))).unwrap();
        let second = core.create_shift(new_shift(&emp, at(6, 10, 0), at(6, 14, 1))).unwrap();

        let info = second.conflict_info.clone().unwrap();
        assert_eq!(info.kind, ConflictKind::Overlap);
        assert_eq!(info.severity, ConflictSeverity::High);
        assert_eq!(info.conflicting_shift_ids, vec![first.id]);
        assert_eq!(core.get_shift(&second.id).unwrap(), second);
    }

    #[test]
    fn test_inverted_shift_rejected() {
        let (core, emp) = setup();
        assert!(matches!(
            core.create_shift(new_shift(&emp, at(6, 14, 0), at(6, 14, 0))),
            Err(CareError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_unknown_employee_rejected() {
        let (core, _) = setup();
        assert!(matches!(
            core.create_shift(new_shift("nobody", at(6, 8, 0), at(6, 12, 0))),
            Err(CareError::NotFound(_))
        ));
    }

    #[test]
    fn test_update_excludes_itself() {
        let (core, emp) = setup();
        let shift = core.create_shift(new_shift(&emp, at(6, 8, 0), at(6, 12, 0))).unwrap();
        let moved = core
            .update_shift(
                &shift.id,
                ShiftPatch {
                    end_time: Some(at(6, 13, 0)),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(moved.conflict_info.is_none());
        assert_eq!(moved.end_time, at(6, 13, 0));
    }

    #[test]
    fn test_dry_run_check() {
        let (core, emp) = setup();
        let stored = core.create_shift(new_shift(&emp, at(6, 8, 0), at(6, 12, 0))).unwrap();

        let report = core
            .check_shift_conflicts(ConflictQuery {
                employee_id: emp.clone(),
                start_time: at(6, 11, 0),
                end_time: at(6, 15, 0),
                shift_id: None,
            })
            .unwrap();
        assert!(report.has_conflicts);
        assert_eq!(report.conflicts, vec![stored.clone()]);

        let report = core
            .check_shift_conflicts(ConflictQuery {
                employee_id: emp,
                start_time: at(6, 11, 0),
                end_time: at(6, 15, 0),
                shift_id: Some(stored.id),
            })
            .unwrap();
        assert!(!report.has_conflicts);
        assert!(report.conflict_info.is_none());

        // nothing stored by a dry run
        assert_eq!(core.list_shifts(&ShiftFilter::default()).unwrap().len(), 1);
    }

    #[test]
    fn test_delete_missing_shift() {
        let (core, _) = setup();
        assert!(matches!(core.delete_shift("x"), Err(CareError::NotFound(_))));
    }

    #[test]
    fn test_overlap_is_recorded_on_both_shifts() {
        let (core, emp) = setup();
        let first = core.create_shift(new_shift(&emp, at(6, 8, 0), at(6, 12, 0))).unwrap();
        let second = core.create_shift(new_shift(&emp, at(6, 11, 0), at(6, 15, 0))).unwrap();

        let first = core.get_shift(&first.id).unwrap();
        assert_eq!(
            first.conflict_info.unwrap().conflicting_shift_ids,
            vec![second.id]
        );
    }

    #[test]
    fn test_deleting_conflicting_shift_clears_survivor() {
        let (core, emp) = setup();
        let first = core.create_shift(new_shift(&emp, at(6, 8, 0), at(6, 12, 0))).unwrap();
        let second = core.create_shift(new_shift(&emp, at(6, 11, 0), at(6, 15, 0))).unwrap();
        assert!(second.conflict_info.is_some());

        core.delete_shift(&first.id).unwrap();
        assert!(core.get_shift(&second.id).unwrap().conflict_info.is_none());
    }

    #[test]
    fn test_moving_shift_away_clears_old_neighbour() {
        let (core, emp) = setup();
        let first = core.create_shift(new_shift(&emp, at(6, 8, 0), at(6, 12, 0))).unwrap();
        let second = core.create_shift(new_shift(&emp, at(6, 11, 0), at(6, 15, 0))).unwrap();

        let moved = core
            .update_shift(
                &second.id,
                ShiftPatch {
                    start_time: Some(at(7, 11, 0)),
                    end_time: Some(at(7, 15, 0)),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(moved.conflict_info.is_none());
        assert!(core.get_shift(&first.id).unwrap().conflict_info.is_none());
    }
}
