//! Glue between the store and the assistant.
//!
//! Snapshots are read under the core lock, the assistant is called after the
//! lock is released.

use chrono::{Duration, NaiveDate, NaiveTime};
use carebase_core::models::{Patient, ShiftFilter, Tour};
use carebase_core::routing::is_reordering;
use carebase_core::CareError;
use carebase_llm::{
    EmployeeSnapshot, PatientSnapshot, ScheduleRequest, ShiftSnapshot, TourStopSnapshot,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Documentation entries shown to the assistant per patient.
const RECENT_DOCUMENTATION: usize = 5;

/// Result of asking the assistant for a better visit order.
#[derive(Debug, Clone, Serialize)]
pub struct OptimizeOutcome {
    pub tour: Tour,
    pub applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub shifted_tour_ids: Vec<String>,
}

impl OptimizeOutcome {
    fn kept(tour: Tour, message: String) -> Self {
        Self {
            tour,
            applied: false,
            message: Some(message),
            shifted_tour_ids: Vec::new(),
        }
    }
}

fn stop_snapshot(patient: &Patient) -> TourStopSnapshot {
    let at = patient.coordinates();
    TourStopSnapshot {
        patient_id: patient.id.clone(),
        name: patient.full_name(),
        lat: at.lat,
        lng: at.lng,
        care_level: patient.care_level.get(),
    }
}

/// Ask the assistant to reorder a tour and apply the answer when it is a
/// permutation of the tour's patients. Any other answer, or an assistant
/// failure, keeps the current order.
pub async fn optimize_tour(state: &AppState, tour_id: &str) -> ApiResult<OptimizeOutcome> {
    let id = tour_id.to_string();
    let (tour, patients) = state
        .run(move |core| {
            let tour = core.get_tour(&id)?;
            let mut patients = Vec::new();
            for patient_id in &tour.patient_ids {
                match core.get_patient(patient_id) {
                    Ok(patient) => patients.push(patient),
                    Err(CareError::NotFound(_)) => {}
                    Err(e) => return Err(e),
                }
            }
            Ok((tour, patients))
        })
        .await?;

    if patients.len() < 2 {
        return Ok(OptimizeOutcome::kept(
            tour,
            "tour has fewer than two patients; nothing to optimize".into(),
        ));
    }

    let stops: Vec<TourStopSnapshot> = patients.iter().map(stop_snapshot).collect();
    let suggestion = match state.assistant.suggest_tour_order(&stops).await {
        Ok(suggestion) => suggestion,
        Err(e) => {
            warn!(tour_id = %tour.id, error = %e, "tour optimization unavailable");
            return Ok(OptimizeOutcome::kept(
                tour,
                format!("could not generate an optimized route: {}; original order kept", e),
            ));
        }
    };

    let live: Vec<String> = stops.iter().map(|s| s.patient_id.clone()).collect();
    if !is_reordering(&live, &suggestion.patient_ids) {
        warn!(
            tour_id = %tour.id,
            suggested = ?suggestion.patient_ids,
            "suggested order is not a permutation of the tour; ignored"
        );
        return Ok(OptimizeOutcome::kept(
            tour,
            "suggested order does not match the tour's patients; original order kept".into(),
        ));
    }

    // Deleted patients stay at the end; rerouting drops them.
    let mut order = suggestion.patient_ids;
    order.extend(
        tour.patient_ids
            .iter()
            .filter(|id| !live.contains(id))
            .cloned(),
    );

    let id = tour.id.clone();
    let mutation = state.run(move |core| core.reorder_tour(&id, order)).await?;
    info!(
        tour_id = %mutation.tour.id,
        shifted = mutation.shifted_tour_ids.len(),
        "applied optimized tour order"
    );

    Ok(OptimizeOutcome {
        tour: mutation.tour,
        applied: true,
        message: suggestion.reasoning,
        shifted_tour_ids: mutation.shifted_tour_ids,
    })
}

/// What the assistant may see of one patient.
pub async fn patient_snapshot(state: &AppState, patient_id: &str) -> ApiResult<PatientSnapshot> {
    let id = patient_id.to_string();
    state
        .run(move |core| {
            let patient = core.get_patient(&id)?;
            // Newest first
            let docs = core.list_documentation(Some(&id))?;
            let today = chrono::Local::now().date_naive();
            Ok(PatientSnapshot {
                name: patient.full_name(),
                age: patient.age_on(today),
                care_level: patient.care_level.get(),
                medications: patient.medications.clone(),
                notes: patient.notes.clone(),
                recent_documentation: docs
                    .into_iter()
                    .filter(|d| !d.content.trim().is_empty())
                    .take(RECENT_DOCUMENTATION)
                    .map(|d| format!("{}: {}", d.date, d.content))
                    .collect(),
            })
        })
        .await
}

/// Roster context for a schedule proposal covering `from..=to`.
pub async fn schedule_request(
    state: &AppState,
    from: NaiveDate,
    to: NaiveDate,
) -> ApiResult<ScheduleRequest> {
    if from > to {
        return Err(ApiError::BadRequest(format!(
            "period start {} is after its end {}",
            from, to
        )));
    }

    state
        .run(move |core| {
            let employees = core.list_employees()?;
            let preferences = core.list_shift_preferences()?;
            let shifts = core.list_shifts(&ShiftFilter {
                employee_id: None,
                from: Some(from.and_time(NaiveTime::MIN)),
                to: Some((to + Duration::days(1)).and_time(NaiveTime::MIN)),
            })?;

            let employees = employees
                .iter()
                .map(|e| {
                    let pref = preferences.iter().find(|p| p.employee_id == e.id);
                    EmployeeSnapshot {
                        id: e.id.clone(),
                        name: e.full_name(),
                        preferred_shift_types: pref
                            .map(|p| {
                                p.preferred_shift_types
                                    .iter()
                                    .map(|t| t.as_str().to_string())
                                    .collect()
                            })
                            .unwrap_or_default(),
                        unavailable_weekdays: pref
                            .map(|p| {
                                p.unavailable_weekdays
                                    .iter()
                                    .map(|d| d.as_str().to_string())
                                    .collect()
                            })
                            .unwrap_or_default(),
                        max_shifts_per_week: pref.and_then(|p| p.max_shifts_per_week),
                    }
                })
                .collect();

            Ok(ScheduleRequest {
                from: from.to_string(),
                to: to.to_string(),
                employees,
                existing_shifts: shifts
                    .iter()
                    .map(|s| ShiftSnapshot {
                        employee_id: s.employee_id.clone(),
                        start_time: s.start_time.format("%Y-%m-%dT%H:%M").to_string(),
                        end_time: s.end_time.format("%Y-%m-%dT%H:%M").to_string(),
                    })
                    .collect(),
            })
        })
        .await
}
