//! Cascading reschedule of a caregiver's later tours after an edit.

use chrono::Duration;
use tracing::debug;

use super::geo::travel_minutes;
use crate::models::{OptimizedRoute, Tour};
use crate::{CareError, CareResult};

/// Travel between the end of one tour and the start of the next.
///
/// Zero when either tour has no waypoints: an empty tour gives no anchor
/// point to travel from or to.
pub fn inter_tour_travel(previous: &OptimizedRoute, next: &OptimizedRoute) -> u32 {
    match (previous.last(), next.first()) {
        (Some(from), Some(to)) => travel_minutes(from.coordinates(), to.coordinates()),
        _ => 0,
    }
}

/// Sort a caregiver's tours for one day by start time, id as tie-breaker.
pub fn sort_day(day: &mut [Tour]) {
    day.sort_by(|a, b| a.start_time.cmp(&b.start_time).then_with(|| a.id.cmp(&b.id)));
}

/// Re-chain every tour after `edited_id` so it starts when its predecessor
/// ends plus the travel between them.
///
/// `day` must hold all tours of one caregiver on one day, with the edited
/// tour already carrying its new route. Tours before the edited one are left
/// alone. Returns the ids of tours whose start moved, or a conflict when a
/// tour would be pushed onto the next day.
pub fn cascade(day: &mut [Tour], edited_id: &str) -> CareResult<Vec<String>> {
    sort_day(day);

    let Some(pos) = day.iter().position(|t| t.id == edited_id) else {
        return Ok(Vec::new());
    };

    let mut shifted = Vec::new();
    for i in pos + 1..day.len() {
        let (before, after) = day.split_at_mut(i);
        let previous = &before[i - 1];
        let next = &mut after[0];

        let travel = inter_tour_travel(&previous.optimized_route, &next.optimized_route);
        let new_start = previous.end_time() + Duration::minutes(i64::from(travel));
        if new_start.date() != next.date {
            return Err(CareError::Conflict(format!(
                "tour {} would start after midnight ({})",
                next.id, new_start
            )));
        }
        if new_start != next.start_time {
            debug!(
                tour_id = %next.id,
                from = %next.start_time,
                to = %new_start,
                "rescheduling later tour"
            );
            next.reschedule(new_start);
            shifted.push(next.id.clone());
        }
    }

    Ok(shifted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CareLevel;
    use crate::routing::{sequence, Coordinates, Stop};
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 6)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn tour(id: &str, start: NaiveDateTime, stops: &[(f64, f64, u8)]) -> Tour {
        let stops: Vec<Stop> = stops
            .iter()
            .enumerate()
            .map(|(i, (lat, lng, level))| Stop {
                patient_id: format!("{}-p{}", id, i),
                location: Coordinates::new(*lat, *lng),
                care_level: CareLevel::new(*level).unwrap(),
            })
            .collect();
        let mut t = Tour::new("emp-1".into(), start);
        t.id = id.into();
        t.patient_ids = stops.iter().map(|s| s.patient_id.clone()).collect();
        t.optimized_route = sequence(&stops, start);
        t
    }

    #[test]
    fn test_later_tour_moves_up() {
        // A: two level-1 visits at the same spot -> 60 min
        let mut a = tour("a", at(8, 0), &[(52.50, 13.40, 1), (52.50, 13.40, 1)]);
        // B: one level-2 visit 0.01° north -> 2 min from A's last stop
        let b = tour("b", at(9, 30), &[(52.51, 13.40, 2)]);
        assert_eq!(a.optimized_route.estimated_duration, 60);

        // drop A's second patient -> 30 min
        let first = a.optimized_route.waypoints[0].clone();
        a.patient_ids.truncate(1);
        a.optimized_route = OptimizedRoute {
            estimated_duration: first.visit_duration,
            total_distance: 0.0,
            waypoints: vec![first],
        };

        let mut day = vec![b, a];
        let shifted = cascade(&mut day, "a").unwrap();

        assert_eq!(shifted, vec!["b".to_string()]);
        let b = day.iter().find(|t| t.id == "b").unwrap();
        assert_eq!(b.start_time, at(8, 32));
        assert_eq!(b.optimized_route.waypoints[0].estimated_time, at(8, 32));
    }

    #[test]
    fn test_earlier_tours_untouched() {
        let early = tour("early", at(7, 0), &[(52.5, 13.4, 1)]);
        let edited = tour("edited", at(9, 0), &[(52.5, 13.4, 1)]);
        let late = tour("late", at(12, 0), &[(52.5, 13.4, 1)]);

        let mut day = vec![late, edited, early];
        let shifted = cascade(&mut day, "edited").unwrap();

        assert_eq!(shifted, vec!["late".to_string()]);
        assert_eq!(day[0].id, "early");
        assert_eq!(day[0].start_time, at(7, 0));
        assert_eq!(day[2].start_time, at(9, 30));
    }

    #[test]
    fn test_chain_of_three() {
        let edited = tour("t1", at(8, 0), &[(52.5, 13.4, 5)]); // 70 min
        let second = tour("t2", at(11, 0), &[(52.5, 13.4, 1)]); // 30 min
        let third = tour("t3", at(14, 0), &[(52.5, 13.4, 2)]);

        let mut day = vec![edited, second, third];
        let shifted = cascade(&mut day, "t1").unwrap();

        assert_eq!(shifted.len(), 2);
        assert_eq!(day[1].start_time, at(9, 10));
        assert_eq!(day[2].start_time, at(9, 40));
    }

    #[test]
    fn test_empty_edited_tour_contributes_no_travel() {
        let mut emptied = tour("a", at(8, 0), &[(52.5, 13.4, 1)]);
        emptied.patient_ids.clear();
        emptied.optimized_route = OptimizedRoute::default();
        let b = tour("b", at(10, 0), &[(53.5, 13.4, 1)]);

        let mut day = vec![emptied, b];
        let shifted = cascade(&mut day, "a").unwrap();

        assert_eq!(shifted, vec!["b".to_string()]);
        assert_eq!(day[1].start_time, at(8, 0));
    }

    #[test]
    fn test_unknown_edited_tour_is_noop() {
        let mut day = vec![tour("a", at(8, 0), &[(52.5, 13.4, 1)])];
        assert!(cascade(&mut day, "missing").unwrap().is_empty());
    }

    #[test]
    fn test_already_chained_tours_not_reported() {
        let a = tour("a", at(8, 0), &[(52.5, 13.4, 1)]);
        let b = tour("b", at(8, 30), &[(52.5, 13.4, 1)]);
        let mut day = vec![a, b];
        assert!(cascade(&mut day, "a").unwrap().is_empty());
    }

    #[test]
    fn test_push_past_midnight_is_conflict() {
        let edited = tour("late", at(22, 0), &[(52.5, 13.4, 5), (52.5, 13.4, 5)]); // 140 min
        let night = tour("night", at(23, 30), &[(52.5, 13.4, 1)]);

        let mut day = vec![edited, night];
        match cascade(&mut day, "late") {
            Err(CareError::Conflict(msg)) => assert!(msg.contains("night"), "{}", msg),
            other => panic!("expected conflict, got {:?}", other),
        }
    }
}
