//! Documentation gate checked before a billing entry is opened.
//!
//! Every tour visit of the patient in the billing period, and every shift of
//! a caregiver who visited the patient that day, needs a documentation entry
//! for the patient on the same day that references it. The check is
//! advisory: callers may override it.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{Documentation, Shift, Tour};

/// Which kind of record lacks documentation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum DocumentedKind {
    Tour,
    Shift,
}

/// A tour or shift without matching documentation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MissingDocumentation {
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: DocumentedKind,
    pub id: String,
}

/// Inclusive date range of a billing period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }
}

/// List the tours and shifts in `period` that have no documentation for
/// `patient_id`, sorted by date.
pub fn find_missing_documentation(
    patient_id: &str,
    period: Period,
    tours: &[Tour],
    shifts: &[Shift],
    docs: &[Documentation],
) -> Vec<MissingDocumentation> {
    let patient_docs: Vec<&Documentation> =
        docs.iter().filter(|d| d.patient_id == patient_id).collect();

    let visits: Vec<&Tour> = tours
        .iter()
        .filter(|t| period.contains(t.date) && t.contains_patient(patient_id))
        .collect();

    // (employee, day) pairs on which the patient was visited
    let visit_days: HashSet<(&str, NaiveDate)> = visits
        .iter()
        .map(|t| (t.employee_id.as_str(), t.date))
        .collect();

    let mut missing: Vec<MissingDocumentation> = visits
        .iter()
        .filter(|tour| {
            !patient_docs
                .iter()
                .any(|d| d.date == tour.date && d.tour_id.as_deref() == Some(tour.id.as_str()))
        })
        .map(|tour| MissingDocumentation {
            date: tour.date,
            kind: DocumentedKind::Tour,
            id: tour.id.clone(),
        })
        .collect();

    missing.extend(
        shifts
            .iter()
            .filter(|s| period.contains(s.day()))
            .filter(|s| visit_days.contains(&(s.employee_id.as_str(), s.day())))
            .filter(|shift| {
                !patient_docs.iter().any(|d| {
                    d.date == shift.day() && d.shift_id.as_deref() == Some(shift.id.as_str())
                })
            })
            .map(|shift| MissingDocumentation {
                date: shift.day(),
                kind: DocumentedKind::Shift,
                id: shift.id.clone(),
            }),
    );

    missing.sort_by(|a, b| (a.date, a.kind, &a.id).cmp(&(b.date, b.kind, &b.id)));
    missing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ShiftType;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn tour_on(d: u32, employee: &str, patients: &[&str]) -> Tour {
        let mut tour = Tour::new(employee.into(), day(d).and_hms_opt(8, 0, 0).unwrap());
        tour.patient_ids = patients.iter().map(|p| p.to_string()).collect();
        tour
    }

    fn shift_on(d: u32, employee: &str) -> Shift {
        Shift::new(
            employee.into(),
            day(d).and_hms_opt(6, 0, 0).unwrap(),
            day(d).and_hms_opt(14, 0, 0).unwrap(),
            ShiftType::Regular,
        )
    }

    fn doc_for(patient: &str, d: u32, tour: Option<&Tour>, shift: Option<&Shift>) -> Documentation {
        let mut doc = Documentation::new(patient.into(), day(d), "visit".into());
        doc.tour_id = tour.map(|t| t.id.clone());
        doc.shift_id = shift.map(|s| s.id.clone());
        doc
    }

    #[test]
    fn test_single_undocumented_tour() {
        let tour = tour_on(3, "emp-1", &["p1"]);
        let missing = find_missing_documentation(
            "p1",
            Period::new(day(1), day(31)),
            &[tour.clone()],
            &[],
            &[],
        );

        assert_eq!(
            missing,
            vec![MissingDocumentation {
                date: day(3),
                kind: DocumentedKind::Tour,
                id: tour.id,
            }]
        );
    }

    #[test]
    fn test_documented_tour_passes() {
        let tour = tour_on(3, "emp-1", &["p1"]);
        let doc = doc_for("p1", 3, Some(&tour), None);
        let missing =
            find_missing_documentation("p1", Period::new(day(1), day(31)), &[tour], &[], &[doc]);
        assert!(missing.is_empty());
    }

    #[test]
    fn test_doc_on_wrong_day_does_not_count() {
        let tour = tour_on(3, "emp-1", &["p1"]);
        let doc = doc_for("p1", 4, Some(&tour), None);
        let missing =
            find_missing_documentation("p1", Period::new(day(1), day(31)), &[tour], &[], &[doc]);
        assert_eq!(missing.len(), 1);
    }

    #[test]
    fn test_other_patients_tours_ignored() {
        let tour = tour_on(3, "emp-1", &["p2"]);
        let missing =
            find_missing_documentation("p1", Period::new(day(1), day(31)), &[tour], &[], &[]);
        assert!(missing.is_empty());
    }

    #[test]
    fn test_outside_period_ignored() {
        let tour = tour_on(3, "emp-1", &["p1"]);
        let missing =
            find_missing_documentation("p1", Period::new(day(4), day(31)), &[tour], &[], &[]);
        assert!(missing.is_empty());
    }

    #[test]
    fn test_shift_of_visiting_caregiver_needs_documentation() {
        let tour = tour_on(3, "emp-1", &["p1"]);
        let visiting_shift = shift_on(3, "emp-1");
        let unrelated_shift = shift_on(3, "emp-2");
        let other_day_shift = shift_on(4, "emp-1");
        let doc = doc_for("p1", 3, Some(&tour), None);

        let missing = find_missing_documentation(
            "p1",
            Period::new(day(1), day(31)),
            &[tour],
            &[visiting_shift.clone(), unrelated_shift, other_day_shift],
            &[doc],
        );

        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].kind, DocumentedKind::Shift);
        assert_eq!(missing[0].id, visiting_shift.id);
    }

    #[test]
    fn test_sorted_by_date() {
        let late = tour_on(20, "emp-1", &["p1"]);
        let early = tour_on(2, "emp-1", &["p1"]);
        let missing = find_missing_documentation(
            "p1",
            Period::new(day(1), day(31)),
            &[late, early],
            &[],
            &[],
        );
        assert_eq!(missing[0].date, day(2));
        assert_eq!(missing[1].date, day(20));
    }

    #[test]
    fn test_wire_format() {
        let item = MissingDocumentation {
            date: day(3),
            kind: DocumentedKind::Tour,
            id: "t1".into(),
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "tour");
        assert_eq!(json["date"], "2024-05-03");
    }
}
