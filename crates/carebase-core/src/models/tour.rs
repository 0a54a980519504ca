//! Tour models: one caregiver's ordered visits for a day.

use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::routing::Coordinates;

/// Tour lifecycle status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TourStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl TourStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TourStatus::Scheduled => "scheduled",
            TourStatus::InProgress => "in_progress",
            TourStatus::Completed => "completed",
            TourStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for TourStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(TourStatus::Scheduled),
            "in_progress" => Ok(TourStatus::InProgress),
            "completed" => Ok(TourStatus::Completed),
            "cancelled" => Ok(TourStatus::Cancelled),
            other => Err(format!("unknown tour status: {}", other)),
        }
    }
}

/// A single stop of a tour with its planned timing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Waypoint {
    pub patient_id: String,
    pub lat: f64,
    pub lng: f64,
    pub estimated_time: NaiveDateTime,
    /// Minutes spent at the patient
    pub visit_duration: u32,
    /// Minutes of travel to the next stop, 0 for the last one
    pub travel_time_to_next: u32,
    /// Kilometres to the next stop
    pub distance_to_next: f64,
}

impl Waypoint {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.lat, self.lng)
    }
}

/// Planned route of a tour.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OptimizedRoute {
    pub waypoints: Vec<Waypoint>,
    /// Sum of leg distances in km
    pub total_distance: f64,
    /// Sum of visit and travel minutes
    pub estimated_duration: u32,
}

impl OptimizedRoute {
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn first(&self) -> Option<&Waypoint> {
        self.waypoints.first()
    }

    pub fn last(&self) -> Option<&Waypoint> {
        self.waypoints.last()
    }

    /// Move every waypoint by the same offset.
    pub fn shift_by(&mut self, delta: Duration) {
        for waypoint in &mut self.waypoints {
            waypoint.estimated_time += delta;
        }
    }

    /// Check that each waypoint starts when the previous one's visit and
    /// travel are over.
    pub fn is_consistent(&self) -> bool {
        self.waypoints.windows(2).all(|pair| {
            let expected = pair[0].estimated_time
                + Duration::minutes(i64::from(
                    pair[0].visit_duration + pair[0].travel_time_to_next,
                ));
            pair[1].estimated_time == expected
        })
    }
}

/// A caregiver's sequence of patient visits for one day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tour {
    pub id: String,
    pub employee_id: String,
    /// Day the tour belongs to; used to group tours for rescheduling
    pub date: NaiveDate,
    pub start_time: NaiveDateTime,
    pub patient_ids: Vec<String>,
    pub status: TourStatus,
    pub optimized_route: OptimizedRoute,
    pub created_at: String,
    pub updated_at: String,
}

impl Tour {
    pub fn new(employee_id: String, start_time: NaiveDateTime) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            employee_id,
            date: start_time.date(),
            start_time,
            patient_ids: Vec::new(),
            status: TourStatus::Scheduled,
            optimized_route: OptimizedRoute::default(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// When the last visit is over.
    pub fn end_time(&self) -> NaiveDateTime {
        self.start_time + Duration::minutes(i64::from(self.optimized_route.estimated_duration))
    }

    pub fn contains_patient(&self, patient_id: &str) -> bool {
        self.patient_ids.iter().any(|id| id == patient_id)
    }

    /// Move the tour to a new start, carrying its waypoints along.
    pub fn reschedule(&mut self, new_start: NaiveDateTime) {
        let delta = new_start - self.start_time;
        self.start_time = new_start;
        self.optimized_route.shift_by(delta);
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }
}

/// Input for creating a tour.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTour {
    pub employee_id: String,
    pub date: NaiveDate,
    /// Defaults to the configured tour start
    pub start_time: Option<NaiveTime>,
    #[serde(default)]
    pub patient_ids: Vec<String>,
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TourPatch {
    pub start_time: Option<NaiveTime>,
    pub patient_ids: Option<Vec<String>>,
    pub status: Option<TourStatus>,
}

/// Filter for listing tours.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TourFilter {
    pub date: Option<NaiveDate>,
    pub employee_id: Option<String>,
}

/// Result of a tour edit, including the knock-on effects.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TourMutation {
    pub tour: Tour,
    /// Later tours of the same caregiver and day whose start moved
    pub shifted_tour_ids: Vec<String>,
    /// Patients referenced by the tour that no longer exist
    pub skipped_patient_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 6)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn waypoint(id: &str, time: NaiveDateTime, visit: u32, travel: u32) -> Waypoint {
        Waypoint {
            patient_id: id.into(),
            lat: 52.5,
            lng: 13.4,
            estimated_time: time,
            visit_duration: visit,
            travel_time_to_next: travel,
            distance_to_next: f64::from(travel) / 2.0,
        }
    }

    #[test]
    fn test_end_time_of_empty_tour() {
        let tour = Tour::new("emp-1".into(), at(8, 0));
        assert_eq!(tour.end_time(), at(8, 0));
        assert_eq!(tour.date, at(8, 0).date());
    }

    #[test]
    fn test_reschedule_moves_waypoints() {
        let mut tour = Tour::new("emp-1".into(), at(9, 30));
        tour.optimized_route = OptimizedRoute {
            waypoints: vec![
                waypoint("p1", at(9, 30), 30, 5),
                waypoint("p2", at(10, 5), 40, 0),
            ],
            total_distance: 2.5,
            estimated_duration: 75,
        };

        tour.reschedule(at(8, 45));

        assert_eq!(tour.start_time, at(8, 45));
        assert_eq!(tour.optimized_route.waypoints[0].estimated_time, at(8, 45));
        assert_eq!(tour.optimized_route.waypoints[1].estimated_time, at(9, 20));
        assert!(tour.optimized_route.is_consistent());
        assert_eq!(tour.end_time(), at(10, 0));
    }

    #[test]
    fn test_inconsistent_route_detected() {
        let route = OptimizedRoute {
            waypoints: vec![
                waypoint("p1", at(8, 0), 30, 5),
                waypoint("p2", at(8, 30), 30, 0),
            ],
            total_distance: 2.5,
            estimated_duration: 65,
        };
        assert!(!route.is_consistent());
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            TourStatus::Scheduled,
            TourStatus::InProgress,
            TourStatus::Completed,
            TourStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<TourStatus>().unwrap(), status);
        }
    }
}
