//! Patient database operations.

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::{CareLevel, EmergencyContact, Insurance, Patient};
use crate::routing::Coordinates;

const PATIENT_COLUMNS: &str = r#"
    id, first_name, last_name, birth_date, care_level, address, lat, lng,
    phone, medications, insurance, emergency_contact, notes, created_at, updated_at
"#;

impl Database {
    /// Insert a new patient.
    pub fn insert_patient(&self, patient: &Patient) -> DbResult<()> {
        let medications_json = serde_json::to_string(&patient.medications)?;
        let insurance_json = serde_json::to_string(&patient.insurance)?;
        let contact_json = patient
            .emergency_contact
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.conn.execute(
            r#"
            INSERT INTO patients (
                id, first_name, last_name, birth_date, care_level, address, lat, lng,
                phone, medications, insurance, emergency_contact, notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
            params![
                patient.id,
                patient.first_name,
                patient.last_name,
                patient.birth_date,
                patient.care_level.get(),
                patient.address,
                patient.location.map(|c| c.lat),
                patient.location.map(|c| c.lng),
                patient.phone,
                medications_json,
                insurance_json,
                contact_json,
                patient.notes,
                patient.created_at,
                patient.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Update an existing patient.
    pub fn update_patient(&self, patient: &Patient) -> DbResult<bool> {
        let medications_json = serde_json::to_string(&patient.medications)?;
        let insurance_json = serde_json::to_string(&patient.insurance)?;
        let contact_json = patient
            .emergency_contact
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let rows_affected = self.conn.execute(
            r#"
            UPDATE patients SET
                first_name = ?2,
                last_name = ?3,
                birth_date = ?4,
                care_level = ?5,
                address = ?6,
                lat = ?7,
                lng = ?8,
                phone = ?9,
                medications = ?10,
                insurance = ?11,
                emergency_contact = ?12,
                notes = ?13,
                updated_at = ?14
            WHERE id = ?1
            "#,
            params![
                patient.id,
                patient.first_name,
                patient.last_name,
                patient.birth_date,
                patient.care_level.get(),
                patient.address,
                patient.location.map(|c| c.lat),
                patient.location.map(|c| c.lng),
                patient.phone,
                medications_json,
                insurance_json,
                contact_json,
                patient.notes,
                patient.updated_at,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get a patient by ID.
    pub fn get_patient(&self, id: &str) -> DbResult<Option<Patient>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM patients WHERE id = ?", PATIENT_COLUMNS),
                [id],
                PatientRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List all patients, ordered by name.
    pub fn list_patients(&self) -> DbResult<Vec<Patient>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM patients ORDER BY last_name, first_name",
            PATIENT_COLUMNS
        ))?;

        let rows = stmt.query_map([], PatientRow::from_row)?;

        let mut patients = Vec::new();
        for row in rows {
            patients.push(row?.try_into()?);
        }
        Ok(patients)
    }

    /// Delete a patient.
    pub fn delete_patient(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM patients WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }

    /// Number of tours, documentation entries and billings referencing a patient.
    pub fn patient_reference_count(&self, id: &str) -> DbResult<u32> {
        let count: u32 = self.conn.query_row(
            r#"
            SELECT
                (SELECT COUNT(*) FROM tours, json_each(tours.patient_ids)
                    WHERE json_each.value = ?1)
              + (SELECT COUNT(*) FROM documentation WHERE patient_id = ?1)
              + (SELECT COUNT(*) FROM insurance_billings WHERE patient_id = ?1)
            "#,
            [id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

/// Intermediate row struct for database mapping.
struct PatientRow {
    id: String,
    first_name: String,
    last_name: String,
    birth_date: Option<NaiveDate>,
    care_level: u8,
    address: String,
    lat: Option<f64>,
    lng: Option<f64>,
    phone: Option<String>,
    medications: String,
    insurance: String,
    emergency_contact: Option<String>,
    notes: Option<String>,
    created_at: String,
    updated_at: String,
}

impl PatientRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            first_name: row.get(1)?,
            last_name: row.get(2)?,
            birth_date: row.get(3)?,
            care_level: row.get(4)?,
            address: row.get(5)?,
            lat: row.get(6)?,
            lng: row.get(7)?,
            phone: row.get(8)?,
            medications: row.get(9)?,
            insurance: row.get(10)?,
            emergency_contact: row.get(11)?,
            notes: row.get(12)?,
            created_at: row.get(13)?,
            updated_at: row.get(14)?,
        })
    }
}

impl TryFrom<PatientRow> for Patient {
    type Error = DbError;

    fn try_from(row: PatientRow) -> Result<Self, Self::Error> {
        let care_level = CareLevel::try_from(row.care_level).map_err(DbError::Constraint)?;
        let medications: Vec<String> = serde_json::from_str(&row.medications)?;
        let insurance: Insurance = serde_json::from_str(&row.insurance)?;
        let emergency_contact: Option<EmergencyContact> = row
            .emergency_contact
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;
        let location = match (row.lat, row.lng) {
            (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)),
            _ => None,
        };

        Ok(Patient {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            birth_date: row.birth_date,
            care_level,
            address: row.address,
            location,
            phone: row.phone,
            medications,
            insurance,
            emergency_contact,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
