//! Patient and employee operations.

use tracing::info;

use super::{ensure, required};
use crate::models::{Employee, EmployeePatch, NewEmployee, NewPatient, Patient, PatientPatch};
use crate::{CareCore, CareError, CareResult};

fn validate_patient(patient: &Patient) -> CareResult<()> {
    ensure(
        !patient.first_name.trim().is_empty() && !patient.last_name.trim().is_empty(),
        "patient first and last name are required",
    )?;
    if let Some(location) = patient.location {
        ensure(
            location.is_valid(),
            format!("invalid coordinates {},{}", location.lat, location.lng),
        )?;
    }
    Ok(())
}

fn validate_employee(employee: &Employee) -> CareResult<()> {
    ensure(
        !employee.first_name.trim().is_empty() && !employee.last_name.trim().is_empty(),
        "employee first and last name are required",
    )?;
    ensure(
        employee.max_patients_per_day > 0,
        "max_patients_per_day must be at least 1",
    )?;
    for (day, hours) in &employee.working_hours {
        ensure(
            !hours.is_working_day || hours.start < hours.end,
            format!("working hours on {} end before they start", day),
        )?;
    }
    Ok(())
}

impl CareCore {
    // =========================================================================
    // Patients
    // =========================================================================

    pub fn create_patient(&self, input: NewPatient) -> CareResult<Patient> {
        let patient = input.into_patient();
        validate_patient(&patient)?;

        let db = self.lock()?;
        db.insert_patient(&patient)?;
        info!(patient_id = %patient.id, care_level = %patient.care_level, "patient created");
        Ok(patient)
    }

    pub fn get_patient(&self, id: &str) -> CareResult<Patient> {
        let db = self.lock()?;
        required(db.get_patient(id)?, "patient", id)
    }

    pub fn list_patients(&self) -> CareResult<Vec<Patient>> {
        let db = self.lock()?;
        Ok(db.list_patients()?)
    }

    pub fn update_patient(&self, id: &str, patch: PatientPatch) -> CareResult<Patient> {
        let db = self.lock()?;
        let mut patient = required(db.get_patient(id)?, "patient", id)?;
        patch.apply(&mut patient);
        validate_patient(&patient)?;
        db.update_patient(&patient)?;
        info!(patient_id = %id, "patient updated");
        Ok(patient)
    }

    /// Delete a patient that no tour, documentation or billing refers to.
    pub fn delete_patient(&self, id: &str) -> CareResult<()> {
        let db = self.lock()?;
        required(db.get_patient(id)?, "patient", id)?;
        let references = db.patient_reference_count(id)?;
        if references > 0 {
            return Err(CareError::Conflict(format!(
                "patient {} is referenced by {} tour(s), documentation or billing record(s)",
                id, references
            )));
        }
        db.delete_patient(id)?;
        info!(patient_id = %id, "patient deleted");
        Ok(())
    }

    // =========================================================================
    // Employees
    // =========================================================================

    pub fn create_employee(&self, input: NewEmployee) -> CareResult<Employee> {
        let employee = input.into_employee();
        validate_employee(&employee)?;

        let db = self.lock()?;
        db.insert_employee(&employee)?;
        info!(employee_id = %employee.id, "employee created");
        Ok(employee)
    }

    pub fn get_employee(&self, id: &str) -> CareResult<Employee> {
        let db = self.lock()?;
        required(db.get_employee(id)?, "employee", id)
    }

    pub fn list_employees(&self) -> CareResult<Vec<Employee>> {
        let db = self.lock()?;
        Ok(db.list_employees()?)
    }

    pub fn update_employee(&self, id: &str, patch: EmployeePatch) -> CareResult<Employee> {
        let db = self.lock()?;
        let mut employee = required(db.get_employee(id)?, "employee", id)?;
        patch.apply(&mut employee);
        validate_employee(&employee)?;
        db.update_employee(&employee)?;
        info!(employee_id = %id, "employee updated");
        Ok(employee)
    }

    /// Delete an employee without tours or shifts.
    pub fn delete_employee(&self, id: &str) -> CareResult<()> {
        let db = self.lock()?;
        required(db.get_employee(id)?, "employee", id)?;
        let references = db.employee_reference_count(id)?;
        if references > 0 {
            return Err(CareError::Conflict(format!(
                "employee {} still has {} tour(s) or shift(s)",
                id, references
            )));
        }
        db.delete_employee(id)?;
        info!(employee_id = %id, "employee deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CareLevel, Insurance};
    use crate::routing::Coordinates;

    fn new_patient(address: &str) -> NewPatient {
        NewPatient {
            first_name: "Anna".into(),
            last_name: "Schmidt".into(),
            birth_date: None,
            care_level: CareLevel::new(3).unwrap(),
            address: address.into(),
            location: None,
            phone: None,
            medications: vec![],
            insurance: Insurance::default(),
            emergency_contact: None,
            notes: None,
        }
    }

    fn new_employee() -> NewEmployee {
        NewEmployee {
            first_name: "Maria".into(),
            last_name: "Keller".into(),
            role: "nurse".into(),
            email: None,
            phone: None,
            qualifications: Default::default(),
            working_hours: Default::default(),
            max_patients_per_day: None,
        }
    }

    #[test]
    fn test_create_patient_parses_legacy_location() {
        let core = CareCore::open_in_memory().unwrap();
        let patient = core.create_patient(new_patient("52.52,13.405")).unwrap();
        assert_eq!(patient.location, Some(Coordinates::new(52.52, 13.405)));

        let stored = core.get_patient(&patient.id).unwrap();
        assert_eq!(stored, patient);
    }

    #[test]
    fn test_blank_name_rejected() {
        let core = CareCore::open_in_memory().unwrap();
        let mut input = new_patient("Somewhere 1");
        input.last_name = "  ".into();
        assert!(matches!(
            core.create_patient(input),
            Err(CareError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_update_missing_patient() {
        let core = CareCore::open_in_memory().unwrap();
        assert!(matches!(
            core.update_patient("nope", PatientPatch::default()),
            Err(CareError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_unreferenced_patient() {
        let core = CareCore::open_in_memory().unwrap();
        let patient = core.create_patient(new_patient("")).unwrap();
        core.delete_patient(&patient.id).unwrap();
        assert!(matches!(
            core.get_patient(&patient.id),
            Err(CareError::NotFound(_))
        ));
    }

    #[test]
    fn test_employee_crud() {
        let core = CareCore::open_in_memory().unwrap();
        let employee = core.create_employee(new_employee()).unwrap();
        assert_eq!(employee.max_patients_per_day, 10);

        let updated = core
            .update_employee(
                &employee.id,
                EmployeePatch {
                    max_patients_per_day: Some(7),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.max_patients_per_day, 7);
        assert_eq!(core.list_employees().unwrap().len(), 1);

        core.delete_employee(&employee.id).unwrap();
        assert!(core.list_employees().unwrap().is_empty());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let core = CareCore::open_in_memory().unwrap();
        let mut input = new_employee();
        input.max_patients_per_day = Some(0);
        assert!(matches!(
            core.create_employee(input),
            Err(CareError::InvalidInput(_))
        ));
    }
}
