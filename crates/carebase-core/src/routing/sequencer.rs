//! Waypoint sequencing: assign start times to an ordered list of stops.

use chrono::{Duration, NaiveDateTime};

use super::geo::{care_minutes, distance_km, travel_minutes, Coordinates};
use crate::models::{CareLevel, OptimizedRoute, Patient, Waypoint};

/// A patient visit waiting to be placed on the timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Stop {
    pub patient_id: String,
    pub location: Coordinates,
    pub care_level: CareLevel,
}

impl Stop {
    pub fn from_patient(patient: &Patient) -> Self {
        Self {
            patient_id: patient.id.clone(),
            location: patient.coordinates(),
            care_level: patient.care_level,
        }
    }
}

/// Walk the stops once, accumulating visit and travel minutes.
///
/// Waypoint `i` starts at `start + Σ_{k<i} (visit_k + travel_k)`. The last
/// waypoint has no onward travel. An empty stop list gives an empty route.
pub fn sequence(stops: &[Stop], start: NaiveDateTime) -> OptimizedRoute {
    let mut waypoints = Vec::with_capacity(stops.len());
    let mut elapsed: u32 = 0;
    let mut total_distance = 0.0;

    for (i, stop) in stops.iter().enumerate() {
        let travel = stops
            .get(i + 1)
            .map(|next| travel_minutes(stop.location, next.location))
            .unwrap_or(0);
        let visit = care_minutes(stop.care_level);
        let distance = distance_km(travel);

        waypoints.push(Waypoint {
            patient_id: stop.patient_id.clone(),
            lat: stop.location.lat,
            lng: stop.location.lng,
            estimated_time: start + Duration::minutes(i64::from(elapsed)),
            visit_duration: visit,
            travel_time_to_next: travel,
            distance_to_next: distance,
        });

        elapsed += visit + travel;
        total_distance += distance;
    }

    OptimizedRoute {
        waypoints,
        total_distance,
        estimated_duration: elapsed,
    }
}

/// True when `proposed` visits exactly the patients of `current`, each once.
pub fn is_reordering(current: &[String], proposed: &[String]) -> bool {
    if current.len() != proposed.len() {
        return false;
    }
    let mut a: Vec<&String> = current.iter().collect();
    let mut b: Vec<&String> = proposed.iter().collect();
    a.sort();
    b.sort();
    a == b
}
