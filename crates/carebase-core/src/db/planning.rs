//! Shift template, preference and change request operations.

use chrono::{NaiveDateTime, NaiveTime};
use rusqlite::{params, OptionalExtension, Row};

use super::{parse_column, Database, DbError, DbResult};
use crate::models::{ChangeRequestStatus, ShiftChangeRequest, ShiftPreference, ShiftTemplate};

const REQUEST_COLUMNS: &str = r#"
    id, shift_id, requested_by, kind, reason, proposed_start, proposed_end,
    swap_with_employee_id, status, decided_at, created_at, updated_at
"#;

impl Database {
    // =========================================================================
    // Templates
    // =========================================================================

    /// Insert a new shift template.
    pub fn insert_shift_template(&self, template: &ShiftTemplate) -> DbResult<()> {
        let weekdays_json = serde_json::to_string(&template.weekdays)?;
        self.conn.execute(
            r#"
            INSERT INTO shift_templates (
                id, name, start_time, end_time, shift_type, weekdays, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                template.id,
                template.name,
                template.start,
                template.end,
                template.shift_type.as_str(),
                weekdays_json,
                template.created_at,
                template.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Get a shift template by ID.
    pub fn get_shift_template(&self, id: &str) -> DbResult<Option<ShiftTemplate>> {
        self.conn
            .query_row(
                r#"
                SELECT id, name, start_time, end_time, shift_type, weekdays, created_at, updated_at
                FROM shift_templates
                WHERE id = ?
                "#,
                [id],
                TemplateRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List all shift templates by name.
    pub fn list_shift_templates(&self) -> DbResult<Vec<ShiftTemplate>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, name, start_time, end_time, shift_type, weekdays, created_at, updated_at
            FROM shift_templates
            ORDER BY name
            "#,
        )?;
        let rows = stmt.query_map([], TemplateRow::from_row)?;

        let mut templates = Vec::new();
        for row in rows {
            templates.push(row?.try_into()?);
        }
        Ok(templates)
    }

    /// Delete a shift template.
    pub fn delete_shift_template(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM shift_templates WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }

    // =========================================================================
    // Preferences
    // =========================================================================

    /// Insert or replace the preference of an employee.
    pub fn upsert_shift_preference(&self, preference: &ShiftPreference) -> DbResult<()> {
        let types_json = serde_json::to_string(&preference.preferred_shift_types)?;
        let weekdays_json = serde_json::to_string(&preference.unavailable_weekdays)?;

        self.conn.execute(
            r#"
            INSERT INTO shift_preferences (
                employee_id, preferred_shift_types, unavailable_weekdays,
                max_shifts_per_week, notes, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(employee_id) DO UPDATE SET
                preferred_shift_types = excluded.preferred_shift_types,
                unavailable_weekdays = excluded.unavailable_weekdays,
                max_shifts_per_week = excluded.max_shifts_per_week,
                notes = excluded.notes,
                updated_at = excluded.updated_at
            "#,
            params![
                preference.employee_id,
                types_json,
                weekdays_json,
                preference.max_shifts_per_week,
                preference.notes,
                preference.updated_at,
            ],
        )?;
        Ok(())
    }

    /// List all stored preferences.
    pub fn list_shift_preferences(&self) -> DbResult<Vec<ShiftPreference>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT employee_id, preferred_shift_types, unavailable_weekdays,
                   max_shifts_per_week, notes, updated_at
            FROM shift_preferences
            ORDER BY employee_id
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(PreferenceRow {
                employee_id: row.get(0)?,
                preferred_shift_types: row.get(1)?,
                unavailable_weekdays: row.get(2)?,
                max_shifts_per_week: row.get(3)?,
                notes: row.get(4)?,
                updated_at: row.get(5)?,
            })
        })?;

        let mut preferences = Vec::new();
        for row in rows {
            preferences.push(row?.try_into()?);
        }
        Ok(preferences)
    }

    // =========================================================================
    // Change requests
    // =========================================================================

    /// Insert a new change request.
    pub fn insert_change_request(&self, request: &ShiftChangeRequest) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO shift_change_requests (
                id, shift_id, requested_by, kind, reason, proposed_start, proposed_end,
                swap_with_employee_id, status, decided_at, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                request.id,
                request.shift_id,
                request.requested_by,
                request.kind.as_str(),
                request.reason,
                request.proposed_start,
                request.proposed_end,
                request.swap_with_employee_id,
                request.status.as_str(),
                request.decided_at,
                request.created_at,
                request.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Store the decision on a change request.
    pub fn update_change_request_status(&self, request: &ShiftChangeRequest) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE shift_change_requests SET
                status = ?2,
                decided_at = ?3,
                updated_at = ?4
            WHERE id = ?1
            "#,
            params![
                request.id,
                request.status.as_str(),
                request.decided_at,
                request.updated_at,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get a change request by ID.
    pub fn get_change_request(&self, id: &str) -> DbResult<Option<ShiftChangeRequest>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM shift_change_requests WHERE id = ?", REQUEST_COLUMNS),
                [id],
                RequestRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List change requests, newest first, optionally by status.
    pub fn list_change_requests(
        &self,
        status: Option<ChangeRequestStatus>,
    ) -> DbResult<Vec<ShiftChangeRequest>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {} FROM shift_change_requests
            WHERE ?1 IS NULL OR status = ?1
            ORDER BY created_at DESC
            "#,
            REQUEST_COLUMNS
        ))?;

        let rows = stmt.query_map([status.map(|s| s.as_str())], RequestRow::from_row)?;

        let mut requests = Vec::new();
        for row in rows {
            requests.push(row?.try_into()?);
        }
        Ok(requests)
    }
}

/// Intermediate row struct for database mapping.
struct TemplateRow {
    id: String,
    name: String,
    start: NaiveTime,
    end: NaiveTime,
    shift_type: String,
    weekdays: String,
    created_at: String,
    updated_at: String,
}

impl TemplateRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            start: row.get(2)?,
            end: row.get(3)?,
            shift_type: row.get(4)?,
            weekdays: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }
}

impl TryFrom<TemplateRow> for ShiftTemplate {
    type Error = DbError;

    fn try_from(row: TemplateRow) -> Result<Self, Self::Error> {
        Ok(ShiftTemplate {
            id: row.id,
            name: row.name,
            start: row.start,
            end: row.end,
            shift_type: parse_column(&row.shift_type)?,
            weekdays: serde_json::from_str(&row.weekdays)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

struct PreferenceRow {
    employee_id: String,
    preferred_shift_types: String,
    unavailable_weekdays: String,
    max_shifts_per_week: Option<u32>,
    notes: Option<String>,
    updated_at: String,
}

impl TryFrom<PreferenceRow> for ShiftPreference {
    type Error = DbError;

    fn try_from(row: PreferenceRow) -> Result<Self, Self::Error> {
        Ok(ShiftPreference {
            employee_id: row.employee_id,
            preferred_shift_types: serde_json::from_str(&row.preferred_shift_types)?,
            unavailable_weekdays: serde_json::from_str(&row.unavailable_weekdays)?,
            max_shifts_per_week: row.max_shifts_per_week,
            notes: row.notes,
            updated_at: row.updated_at,
        })
    }
}

struct RequestRow {
    id: String,
    shift_id: String,
    requested_by: String,
    kind: String,
    reason: Option<String>,
    proposed_start: Option<NaiveDateTime>,
    proposed_end: Option<NaiveDateTime>,
    swap_with_employee_id: Option<String>,
    status: String,
    decided_at: Option<String>,
    created_at: String,
    updated_at: String,
}

impl RequestRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            shift_id: row.get(1)?,
            requested_by: row.get(2)?,
            kind: row.get(3)?,
            reason: row.get(4)?,
            proposed_start: row.get(5)?,
            proposed_end: row.get(6)?,
            swap_with_employee_id: row.get(7)?,
            status: row.get(8)?,
            decided_at: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }
}

impl TryFrom<RequestRow> for ShiftChangeRequest {
    type Error = DbError;

    fn try_from(row: RequestRow) -> Result<Self, Self::Error> {
        Ok(ShiftChangeRequest {
            id: row.id,
            shift_id: row.shift_id,
            requested_by: row.requested_by,
            kind: parse_column(&row.kind)?,
            reason: row.reason,
            proposed_start: row.proposed_start,
            proposed_end: row.proposed_end,
            swap_with_employee_id: row.swap_with_employee_id,
            status: parse_column(&row.status)?,
            decided_at: row.decided_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ChangeRequestKind, Employee, NewShiftChangeRequest, NewShiftTemplate,
        ShiftPreferenceInput, ShiftType, Weekday,
    };

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_template_roundtrip() {
        let db = setup_db();
        let template = NewShiftTemplate {
            name: "Night".into(),
            start: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
            shift_type: ShiftType::Regular,
            weekdays: vec![Weekday::Friday, Weekday::Saturday],
        }
        .into_template();
        db.insert_shift_template(&template).unwrap();

        assert_eq!(db.get_shift_template(&template.id).unwrap().unwrap(), template);
        assert_eq!(db.list_shift_templates().unwrap().len(), 1);
        assert!(db.delete_shift_template(&template.id).unwrap());
        assert!(db.get_shift_template(&template.id).unwrap().is_none());
    }

    #[test]
    fn test_preference_upsert_replaces() {
        let db = setup_db();
        let employee = Employee::new("Maria".into(), "Keller".into(), "nurse".into());
        db.insert_employee(&employee).unwrap();

        let first = ShiftPreferenceInput {
            preferred_shift_types: vec![ShiftType::Regular],
            ..Default::default()
        }
        .into_preference(employee.id.clone());
        db.upsert_shift_preference(&first).unwrap();

        let second = ShiftPreferenceInput {
            unavailable_weekdays: vec![Weekday::Sunday],
            max_shifts_per_week: Some(4),
            ..Default::default()
        }
        .into_preference(employee.id.clone());
        db.upsert_shift_preference(&second).unwrap();

        let stored = db.list_shift_preferences().unwrap();
        assert_eq!(stored, vec![second]);
    }

    #[test]
    fn test_change_request_status_filter() {
        let db = setup_db();
        let mut request = NewShiftChangeRequest {
            shift_id: "shift-1".into(),
            requested_by: "emp-1".into(),
            kind: ChangeRequestKind::Cancel,
            reason: Some("sick".into()),
            proposed_start: None,
            proposed_end: None,
            swap_with_employee_id: None,
        }
        .into_request();
        db.insert_change_request(&request).unwrap();

        assert_eq!(
            db.list_change_requests(Some(ChangeRequestStatus::Pending))
                .unwrap()
                .len(),
            1
        );

        request.status = ChangeRequestStatus::Rejected;
        request.decided_at = Some(chrono::Utc::now().to_rfc3339());
        assert!(db.update_change_request_status(&request).unwrap());

        assert!(db
            .list_change_requests(Some(ChangeRequestStatus::Pending))
            .unwrap()
            .is_empty());
        assert_eq!(db.list_change_requests(None).unwrap().len(), 1);
        assert_eq!(db.get_change_request(&request.id).unwrap().unwrap(), request);
    }
}
