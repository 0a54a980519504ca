//! Tour operations: creation, patient insertion and removal, and the
//! cascading reschedule of the caregiver's later tours.

use std::collections::HashSet;

use chrono::NaiveDateTime;
use tracing::{error, info, warn};

use super::{ensure, required};
use crate::db::Database;
use crate::models::{NewTour, Tour, TourFilter, TourMutation, TourPatch};
use crate::routing::{cascade, is_reordering, sequence, Stop};
use crate::{CareCore, CareError, CareResult};

/// Stops for every listed patient; an unknown id is a not-found error.
fn stops_strict(db: &Database, patient_ids: &[String]) -> CareResult<Vec<Stop>> {
    patient_ids
        .iter()
        .map(|id| {
            let patient = required(db.get_patient(id)?, "patient", id)?;
            Ok(Stop::from_patient(&patient))
        })
        .collect()
}

/// Stops for the listed patients that still exist, plus the ids skipped.
fn stops_lenient(db: &Database, tour_id: &str, patient_ids: &[String]) -> CareResult<(Vec<Stop>, Vec<String>)> {
    let mut stops = Vec::with_capacity(patient_ids.len());
    let mut skipped = Vec::new();
    for id in patient_ids {
        match db.get_patient(id)? {
            Some(patient) => stops.push(Stop::from_patient(&patient)),
            None => {
                warn!(tour_id = %tour_id, patient_id = %id, "patient no longer exists, skipping stop");
                skipped.push(id.clone());
            }
        }
    }
    Ok((stops, skipped))
}

fn ensure_unique(patient_ids: &[String]) -> CareResult<()> {
    let mut seen = HashSet::new();
    for id in patient_ids {
        if !seen.insert(id) {
            return Err(CareError::Conflict(format!("patient {} is listed twice", id)));
        }
    }
    Ok(())
}

/// Re-sequence `tour` from `start`, cascade the caregiver's later tours and
/// write everything. Must run inside a transaction.
fn reroute(db: &Database, mut tour: Tour, start: NaiveDateTime) -> CareResult<TourMutation> {
    let (stops, skipped) = stops_lenient(db, &tour.id, &tour.patient_ids)?;
    tour.start_time = start;
    tour.optimized_route = sequence(&stops, start);
    tour.touch();

    let mut day = db.tours_for_employee_on(&tour.employee_id, tour.date)?;
    match day.iter_mut().find(|t| t.id == tour.id) {
        Some(slot) => *slot = tour.clone(),
        None => day.push(tour.clone()),
    }

    let shifted = cascade(&mut day, &tour.id)?;

    db.update_tour(&tour)?;
    for later in day.iter().filter(|t| shifted.contains(&t.id)) {
        db.update_tour(later)?;
    }

    Ok(TourMutation {
        tour,
        shifted_tour_ids: shifted,
        skipped_patient_ids: skipped,
    })
}

impl CareCore {
    /// Create a tour and sequence its visits. Unknown patients are rejected.
    pub fn create_tour(&self, input: NewTour) -> CareResult<TourMutation> {
        ensure_unique(&input.patient_ids)?;
        let start = input
            .date
            .and_time(input.start_time.unwrap_or(self.settings.default_start_time));

        let db = self.lock()?;
        required(db.get_employee(&input.employee_id)?, "employee", &input.employee_id)?;
        let stops = stops_strict(&db, &input.patient_ids)?;

        let mut tour = Tour::new(input.employee_id, start);
        tour.patient_ids = input.patient_ids;
        tour.optimized_route = sequence(&stops, start);
        db.insert_tour(&tour)?;

        info!(
            tour_id = %tour.id,
            employee_id = %tour.employee_id,
            stops = tour.patient_ids.len(),
            duration = tour.optimized_route.estimated_duration,
            "tour created"
        );
        Ok(TourMutation {
            tour,
            shifted_tour_ids: Vec::new(),
            skipped_patient_ids: Vec::new(),
        })
    }

    pub fn get_tour(&self, id: &str) -> CareResult<Tour> {
        let db = self.lock()?;
        required(db.get_tour(id)?, "tour", id)
    }

    pub fn list_tours(&self, filter: &TourFilter) -> CareResult<Vec<Tour>> {
        let db = self.lock()?;
        Ok(db.list_tours(filter)?)
    }

    /// Apply a patch. A new start time or patient list re-sequences the tour
    /// and cascades; a status change alone does not.
    pub fn update_tour(&self, id: &str, patch: TourPatch) -> CareResult<TourMutation> {
        let db = self.lock()?;
        let mut tour = required(db.get_tour(id)?, "tour", id)?;

        if let Some(status) = patch.status {
            tour.status = status;
        }

        let reroute_needed = patch.start_time.is_some() || patch.patient_ids.is_some();
        if !reroute_needed {
            tour.touch();
            db.update_tour(&tour)?;
            info!(tour_id = %id, status = tour.status.as_str(), "tour status updated");
            return Ok(TourMutation {
                tour,
                shifted_tour_ids: Vec::new(),
                skipped_patient_ids: Vec::new(),
            });
        }

        if let Some(patient_ids) = patch.patient_ids {
            ensure_unique(&patient_ids)?;
            let added: Vec<String> = patient_ids
                .iter()
                .filter(|p| !tour.contains_patient(p))
                .cloned()
                .collect();
            stops_strict(&db, &added)?;
            tour.patient_ids = patient_ids;
        }
        let start = patch
            .start_time
            .map(|t| tour.date.and_time(t))
            .unwrap_or(tour.start_time);

        self.commit_reroute(&db, tour, start)
    }

    pub fn delete_tour(&self, id: &str) -> CareResult<()> {
        let db = self.lock()?;
        if !db.delete_tour(id)? {
            return Err(CareError::NotFound(format!("tour {}", id)));
        }
        info!(tour_id = %id, "tour deleted");
        Ok(())
    }

    /// Insert a patient at `position` (appended when absent, clamped to the
    /// list length) and re-sequence.
    pub fn add_patient_to_tour(
        &self,
        tour_id: &str,
        patient_id: &str,
        position: Option<usize>,
    ) -> CareResult<TourMutation> {
        let db = self.lock()?;
        let mut tour = required(db.get_tour(tour_id)?, "tour", tour_id)?;
        required(db.get_patient(patient_id)?, "patient", patient_id)?;
        if tour.contains_patient(patient_id) {
            return Err(CareError::Conflict(format!(
                "patient {} is already on tour {}",
                patient_id, tour_id
            )));
        }

        let at = position
            .unwrap_or(tour.patient_ids.len())
            .min(tour.patient_ids.len());
        tour.patient_ids.insert(at, patient_id.to_string());
        let start = tour.start_time;

        info!(tour_id = %tour_id, patient_id = %patient_id, position = at, "adding patient to tour");
        self.commit_reroute(&db, tour, start)
    }

    /// Remove a patient and re-sequence.
    pub fn remove_patient_from_tour(&self, tour_id: &str, patient_id: &str) -> CareResult<TourMutation> {
        let db = self.lock()?;
        let mut tour = required(db.get_tour(tour_id)?, "tour", tour_id)?;
        let Some(at) = tour.patient_ids.iter().position(|p| p == patient_id) else {
            return Err(CareError::NotFound(format!(
                "patient {} on tour {}",
                patient_id, tour_id
            )));
        };
        tour.patient_ids.remove(at);
        let start = tour.start_time;

        info!(tour_id = %tour_id, patient_id = %patient_id, "removing patient from tour");
        self.commit_reroute(&db, tour, start)
    }

    /// Replace the visit order. The new order must contain exactly the
    /// tour's current patients.
    pub fn reorder_tour(&self, tour_id: &str, order: Vec<String>) -> CareResult<TourMutation> {
        let db = self.lock()?;
        let mut tour = required(db.get_tour(tour_id)?, "tour", tour_id)?;
        ensure(
            is_reordering(&tour.patient_ids, &order),
            "new order must contain exactly the tour's patients",
        )?;
        tour.patient_ids = order;
        let start = tour.start_time;

        info!(tour_id = %tour_id, "reordering tour");
        self.commit_reroute(&db, tour, start)
    }

    fn commit_reroute(&self, db: &Database, tour: Tour, start: NaiveDateTime) -> CareResult<TourMutation> {
        let tour_id = tour.id.clone();
        let mutation = db
            .in_transaction(|db| reroute(db, tour, start))
            .map_err(|e| {
                error!(tour_id = %tour_id, error = %e, "tour update rolled back, later tours unchanged");
                match e {
                    CareError::Database(msg) => CareError::Database(format!(
                        "{}; tour {} and later tours were not changed",
                        msg, tour_id
                    )),
                    other => other,
                }
            })?;

        if !mutation.shifted_tour_ids.is_empty() {
            info!(
                tour_id = %tour_id,
                shifted = mutation.shifted_tour_ids.len(),
                "later tours rescheduled"
            );
        }
        Ok(mutation)
    }
}
