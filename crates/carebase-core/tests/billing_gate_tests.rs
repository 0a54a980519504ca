//! Documentation gate and billing lifecycle through the public API.

use carebase_core::models::{
    BillingStatus, CareLevel, Insurance, NewBilling, NewDocumentation, NewEmployee, NewPatient,
    NewShift, NewTour, ShiftType,
};
use carebase_core::{CareCore, CareError, DocumentedKind, MissingDocumentation};
use chrono::NaiveDate;

fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
}

struct Ward {
    core: CareCore,
    patient: String,
    nurse: String,
}

impl Ward {
    fn new() -> Self {
        let core = CareCore::open_in_memory().unwrap();
        let patient = core
            .create_patient(NewPatient {
                first_name: "Greta".into(),
                last_name: "Lang".into(),
                birth_date: NaiveDate::from_ymd_opt(1938, 2, 14),
                care_level: CareLevel::new(3).unwrap(),
                address: "52.52,13.405".into(),
                location: None,
                phone: None,
                medications: vec!["Metformin".into()],
                insurance: Insurance {
                    provider: "TK".into(),
                    number: "T-778".into(),
                },
                emergency_contact: None,
                notes: None,
            })
            .unwrap()
            .id;
        let nurse = core
            .create_employee(NewEmployee {
                first_name: "Ilse".into(),
                last_name: "Kern".into(),
                role: "nurse".into(),
                email: None,
                phone: None,
                qualifications: Default::default(),
                working_hours: Default::default(),
                max_patients_per_day: None,
            })
            .unwrap()
            .id;
        Self { core, patient, nurse }
    }

    fn visit(&self, d: u32) -> String {
        self.core
            .create_tour(NewTour {
                employee_id: self.nurse.clone(),
                date: date(d),
                start_time: None,
                patient_ids: vec![self.patient.clone()],
            })
            .unwrap()
            .tour
            .id
    }

    fn shift(&self, d: u32) -> String {
        self.core
            .create_shift(NewShift {
                employee_id: self.nurse.clone(),
                start_time: date(d).and_hms_opt(6, 0, 0).unwrap(),
                end_time: date(d).and_hms_opt(14, 0, 0).unwrap(),
                shift_type: ShiftType::Regular,
                notes: None,
            })
            .unwrap()
            .id
    }

    fn document(&self, d: u32, tour_id: Option<&str>, shift_id: Option<&str>) {
        self.core
            .create_documentation(NewDocumentation {
                patient_id: self.patient.clone(),
                tour_id: tour_id.map(String::from),
                shift_id: shift_id.map(String::from),
                author_id: Some(self.nurse.clone()),
                date: date(d),
                content: "Insulin administered".into(),
            })
            .unwrap();
    }

    fn billing(&self, force: bool) -> NewBilling {
        NewBilling {
            patient_id: self.patient.clone(),
            insurance_provider: None,
            billing_date: Some(date(30)),
            period_start: date(1),
            period_end: date(30),
            services: vec![],
            notes: None,
            force,
        }
    }

    fn missing(&self) -> Vec<MissingDocumentation> {
        self.core
            .missing_documentation(&self.patient, date(1), date(30))
            .unwrap()
    }
}

#[test]
fn test_one_undocumented_tour_is_one_missing_item() {
    let ward = Ward::new();
    let tour_id = ward.visit(3);

    let missing = ward.missing();
    assert_eq!(
        missing,
        vec![MissingDocumentation {
            date: date(3),
            kind: DocumentedKind::Tour,
            id: tour_id,
        }]
    );
}

#[test]
fn test_shift_on_visit_day_needs_its_own_entry() {
    let ward = Ward::new();
    let tour_id = ward.visit(3);
    let shift_id = ward.shift(3);
    ward.shift(4);
    ward.document(3, Some(&tour_id), None);

    let missing = ward.missing();
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].kind, DocumentedKind::Shift);
    assert_eq!(missing[0].id, shift_id);

    ward.document(3, None, Some(&shift_id));
    assert!(ward.missing().is_empty());
}

#[test]
fn test_missing_items_sorted_by_date() {
    let ward = Ward::new();
    let late = ward.visit(20);
    let early = ward.visit(2);
    let middle = ward.visit(11);

    let ids: Vec<String> = ward.missing().into_iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![early, middle, late]);
}

#[test]
fn test_gate_failure_carries_items() {
    let ward = Ward::new();
    ward.visit(3);

    let Err(CareError::MissingDocumentation(items)) = ward.core.create_billing(ward.billing(false)) else {
        panic!("billing should be blocked by missing documentation");
    };
    assert_eq!(items.len(), 1);
    assert!(ward.core.list_billings(None).unwrap().is_empty());

    let forced = ward.core.create_billing(ward.billing(true)).unwrap();
    assert_eq!(forced.insurance_provider, "TK");
}

#[test]
fn test_billing_from_suggestions() {
    let ward = Ward::new();
    let tour_id = ward.visit(3);
    ward.document(3, Some(&tour_id), None);

    let services = ward
        .core
        .suggest_billing_services(&ward.patient, date(1), date(30))
        .unwrap();
    assert_eq!(services.len(), 1);
    assert_eq!(services[0].quantity, 50);

    let mut input = ward.billing(false);
    input.services = services;
    let billing = ward.core.create_billing(input).unwrap();
    assert_eq!(billing.total_cents, 50 * 50);

    let export = ward.core.export_billing(&billing.id).unwrap();
    assert_eq!(export.metadata.insurance_number, "T-778");
    assert!(export.to_csv().contains("HV-L3"));
}

#[test]
fn test_draft_cannot_jump_to_paid() {
    let ward = Ward::new();
    let billing = ward.core.create_billing(ward.billing(false)).unwrap();
    assert_eq!(billing.status, BillingStatus::Draft);

    assert!(matches!(
        ward.core.set_billing_status(&billing.id, BillingStatus::Paid),
        Err(CareError::Conflict(_))
    ));
    assert_eq!(
        ward.core.get_billing(&billing.id).unwrap().status,
        BillingStatus::Draft
    );
}

#[test]
fn test_referenced_patient_cannot_be_deleted() {
    let ward = Ward::new();
    ward.visit(3);
    assert!(matches!(
        ward.core.delete_patient(&ward.patient),
        Err(CareError::Conflict(_))
    ));
    assert!(matches!(
        ward.core.delete_employee(&ward.nurse),
        Err(CareError::Conflict(_))
    ));
}
