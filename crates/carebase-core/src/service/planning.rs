//! Shift templates, preferences and change requests.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use super::shifts::{annotate_conflicts, refresh_neighbours, validate_shift};
use super::{ensure, period, required};
use crate::models::{
    ChangeRequestKind, ChangeRequestStatus, NewShiftChangeRequest, NewShiftTemplate, Shift,
    ShiftChangeRequest, ShiftPreference, ShiftPreferenceInput, ShiftTemplate,
};
use crate::{CareCore, CareError, CareResult};

/// Longest range a template may be applied to in one call, in days.
const MAX_TEMPLATE_RANGE_DAYS: i64 = 92;

/// A decided change request and the shift it left behind (`None` after a
/// cancellation or a rejection).
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChangeRequestOutcome {
    pub request: ShiftChangeRequest,
    pub shift: Option<Shift>,
}

fn pending(request: &ShiftChangeRequest) -> CareResult<()> {
    if request.status != ChangeRequestStatus::Pending {
        return Err(CareError::Conflict(format!(
            "change request {} is already {}",
            request.id,
            request.status.as_str()
        )));
    }
    Ok(())
}

fn decide(request: &mut ShiftChangeRequest, status: ChangeRequestStatus) {
    let now = chrono::Utc::now().to_rfc3339();
    request.status = status;
    request.decided_at = Some(now.clone());
    request.updated_at = now;
}

impl CareCore {
    // =========================================================================
    // Templates
    // =========================================================================

    pub fn create_shift_template(&self, input: NewShiftTemplate) -> CareResult<ShiftTemplate> {
        ensure(!input.name.trim().is_empty(), "template name is required")?;
        ensure(!input.weekdays.is_empty(), "template needs at least one weekday")?;
        ensure(input.start != input.end, "template start and end must differ")?;

        let template = input.into_template();
        let db = self.lock()?;
        db.insert_shift_template(&template)?;
        info!(template_id = %template.id, name = %template.name, "shift template created");
        Ok(template)
    }

    pub fn get_shift_template(&self, id: &str) -> CareResult<ShiftTemplate> {
        let db = self.lock()?;
        required(db.get_shift_template(id)?, "shift template", id)
    }

    pub fn list_shift_templates(&self) -> CareResult<Vec<ShiftTemplate>> {
        let db = self.lock()?;
        Ok(db.list_shift_templates()?)
    }

    pub fn delete_shift_template(&self, id: &str) -> CareResult<()> {
        let db = self.lock()?;
        if !db.delete_shift_template(id)? {
            return Err(CareError::NotFound(format!("shift template {}", id)));
        }
        info!(template_id = %id, "shift template deleted");
        Ok(())
    }

    /// Create one shift per matching weekday in `[from, to]`. Each shift is
    /// checked against everything stored before it, including the shifts
    /// created earlier in the same call.
    pub fn apply_shift_template(
        &self,
        template_id: &str,
        employee_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> CareResult<Vec<Shift>> {
        let range = period(from, to)?;
        ensure(
            (range.end - range.start).num_days() < MAX_TEMPLATE_RANGE_DAYS,
            format!("a template covers at most {} days per call", MAX_TEMPLATE_RANGE_DAYS),
        )?;

        let db = self.lock()?;
        let template = required(db.get_shift_template(template_id)?, "shift template", template_id)?;
        required(db.get_employee(employee_id)?, "employee", employee_id)?;

        let shifts = db.in_transaction(|db| -> CareResult<Vec<Shift>> {
            let mut created = Vec::new();
            for mut shift in template.instantiate(employee_id, range.start, range.end) {
                let conflicts = annotate_conflicts(db, &mut shift)?;
                db.insert_shift(&shift)?;
                refresh_neighbours(db, None, &conflicts)?;
                created.push(shift);
            }
            Ok(created)
        })?;

        info!(
            template_id = %template_id,
            employee_id = %employee_id,
            shifts = shifts.len(),
            "shift template applied"
        );
        Ok(shifts)
    }

    // =========================================================================
    // Preferences
    // =========================================================================

    pub fn upsert_shift_preference(
        &self,
        employee_id: &str,
        input: ShiftPreferenceInput,
    ) -> CareResult<ShiftPreference> {
        if let Some(max) = input.max_shifts_per_week {
            ensure(max > 0, "max_shifts_per_week must be at least 1")?;
        }

        let db = self.lock()?;
        required(db.get_employee(employee_id)?, "employee", employee_id)?;
        let preference = input.into_preference(employee_id.to_string());
        db.upsert_shift_preference(&preference)?;
        info!(employee_id = %employee_id, "shift preference saved");
        Ok(preference)
    }

    pub fn list_shift_preferences(&self) -> CareResult<Vec<ShiftPreference>> {
        let db = self.lock()?;
        Ok(db.list_shift_preferences()?)
    }

    // =========================================================================
    // Change requests
    // =========================================================================

    pub fn create_change_request(&self, input: NewShiftChangeRequest) -> CareResult<ShiftChangeRequest> {
        input.validate().map_err(CareError::InvalidInput)?;

        let db = self.lock()?;
        required(db.get_shift(&input.shift_id)?, "shift", &input.shift_id)?;
        required(db.get_employee(&input.requested_by)?, "employee", &input.requested_by)?;
        if let Some(target) = &input.swap_with_employee_id {
            required(db.get_employee(target)?, "employee", target)?;
        }

        let request = input.into_request();
        db.insert_change_request(&request)?;
        info!(
            request_id = %request.id,
            shift_id = %request.shift_id,
            kind = request.kind.as_str(),
            "shift change requested"
        );
        Ok(request)
    }

    pub fn list_change_requests(
        &self,
        status: Option<ChangeRequestStatus>,
    ) -> CareResult<Vec<ShiftChangeRequest>> {
        let db = self.lock()?;
        Ok(db.list_change_requests(status)?)
    }

    /// Approve a pending request and carry it out on the shift.
    pub fn approve_change_request(&self, id: &str) -> CareResult<ChangeRequestOutcome> {
        let db = self.lock()?;
        let mut request = required(db.get_change_request(id)?, "change request", id)?;
        pending(&request)?;
        let mut shift = required(db.get_shift(&request.shift_id)?, "shift", &request.shift_id)?;

        let outcome = db.in_transaction(|db| -> CareResult<ChangeRequestOutcome> {
            let shift = match request.kind {
                ChangeRequestKind::Cancel => {
                    db.delete_shift(&shift.id)?;
                    refresh_neighbours(db, shift.conflict_info.as_ref(), &[])?;
                    None
                }
                ChangeRequestKind::TimeChange => {
                    let (Some(start), Some(end)) = (request.proposed_start, request.proposed_end)
                    else {
                        return Err(CareError::InvalidInput(
                            "time_change request has no proposed times".into(),
                        ));
                    };
                    shift.start_time = start;
                    shift.end_time = end;
                    validate_shift(&shift)?;
                    shift.touch();
                    let before = shift.conflict_info.clone();
                    let conflicts = annotate_conflicts(db, &mut shift)?;
                    db.update_shift(&shift)?;
                    refresh_neighbours(db, before.as_ref(), &conflicts)?;
                    Some(shift)
                }
                ChangeRequestKind::Swap => {
                    let Some(target) = request.swap_with_employee_id.clone() else {
                        return Err(CareError::InvalidInput(
                            "swap request has no target employee".into(),
                        ));
                    };
                    required(db.get_employee(&target)?, "employee", &target)?;
                    shift.employee_id = target;
                    shift.touch();
                    let before = shift.conflict_info.clone();
                    let conflicts = annotate_conflicts(db, &mut shift)?;
                    db.update_shift(&shift)?;
                    refresh_neighbours(db, before.as_ref(), &conflicts)?;
                    Some(shift)
                }
            };

            decide(&mut request, ChangeRequestStatus::Approved);
            db.update_change_request_status(&request)?;
            Ok(ChangeRequestOutcome {
                request: request.clone(),
                shift,
            })
        })?;

        info!(request_id = %id, kind = outcome.request.kind.as_str(), "shift change approved");
        Ok(outcome)
    }

    pub fn reject_change_request(&self, id: &str) -> CareResult<ChangeRequestOutcome> {
        let db = self.lock()?;
        let mut request = required(db.get_change_request(id)?, "change request", id)?;
        pending(&request)?;

        decide(&mut request, ChangeRequestStatus::Rejected);
        db.update_change_request_status(&request)?;
        info!(request_id = %id, "shift change rejected");
        Ok(ChangeRequestOutcome {
            shift: db.get_shift(&request.shift_id)?,
            request,
        })
    }
}
