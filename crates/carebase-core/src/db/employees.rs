//! Employee database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::Employee;

const EMPLOYEE_COLUMNS: &str = r#"
    id, first_name, last_name, role, email, phone, qualifications,
    working_hours, max_patients_per_day, created_at, updated_at
"#;

impl Database {
    /// Insert a new employee.
    pub fn insert_employee(&self, employee: &Employee) -> DbResult<()> {
        let qualifications_json = serde_json::to_string(&employee.qualifications)?;
        let hours_json = serde_json::to_string(&employee.working_hours)?;

        self.conn.execute(
            r#"
            INSERT INTO employees (
                id, first_name, last_name, role, email, phone, qualifications,
                working_hours, max_patients_per_day, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                employee.id,
                employee.first_name,
                employee.last_name,
                employee.role,
                employee.email,
                employee.phone,
                qualifications_json,
                hours_json,
                employee.max_patients_per_day,
                employee.created_at,
                employee.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Update an existing employee.
    pub fn update_employee(&self, employee: &Employee) -> DbResult<bool> {
        let qualifications_json = serde_json::to_string(&employee.qualifications)?;
        let hours_json = serde_json::to_string(&employee.working_hours)?;

        let rows_affected = self.conn.execute(
            r#"
            UPDATE employees SET
                first_name = ?2,
                last_name = ?3,
                role = ?4,
                email = ?5,
                phone = ?6,
                qualifications = ?7,
                working_hours = ?8,
                max_patients_per_day = ?9,
                updated_at = ?10
            WHERE id = ?1
            "#,
            params![
                employee.id,
                employee.first_name,
                employee.last_name,
                employee.role,
                employee.email,
                employee.phone,
                qualifications_json,
                hours_json,
                employee.max_patients_per_day,
                employee.updated_at,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get an employee by ID.
    pub fn get_employee(&self, id: &str) -> DbResult<Option<Employee>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM employees WHERE id = ?", EMPLOYEE_COLUMNS),
                [id],
                EmployeeRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List all employees, ordered by name.
    pub fn list_employees(&self) -> DbResult<Vec<Employee>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM employees ORDER BY last_name, first_name",
            EMPLOYEE_COLUMNS
        ))?;

        let rows = stmt.query_map([], EmployeeRow::from_row)?;

        let mut employees = Vec::new();
        for row in rows {
            employees.push(row?.try_into()?);
        }
        Ok(employees)
    }

    /// Delete an employee.
    pub fn delete_employee(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM employees WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }

    /// Number of tours and shifts assigned to an employee.
    pub fn employee_reference_count(&self, id: &str) -> DbResult<u32> {
        let count: u32 = self.conn.query_row(
            r#"
            SELECT
                (SELECT COUNT(*) FROM tours WHERE employee_id = ?1)
              + (SELECT COUNT(*) FROM shifts WHERE employee_id = ?1)
            "#,
            [id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

/// Intermediate row struct for database mapping.
struct EmployeeRow {
    id: String,
    first_name: String,
    last_name: String,
    role: String,
    email: Option<String>,
    phone: Option<String>,
    qualifications: String,
    working_hours: String,
    max_patients_per_day: u32,
    created_at: String,
    updated_at: String,
}

impl EmployeeRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            first_name: row.get(1)?,
            last_name: row.get(2)?,
            role: row.get(3)?,
            email: row.get(4)?,
            phone: row.get(5)?,
            qualifications: row.get(6)?,
            working_hours: row.get(7)?,
            max_patients_per_day: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }
}

impl TryFrom<EmployeeRow> for Employee {
    type Error = DbError;

    fn try_from(row: EmployeeRow) -> Result<Self, Self::Error> {
        Ok(Employee {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            role: row.role,
            email: row.email,
            phone: row.phone,
            qualifications: serde_json::from_str(&row.qualifications)?,
            working_hours: serde_json::from_str(&row.working_hours)?,
            max_patients_per_day: row.max_patients_per_day,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Weekday, WorkingDay};
    use chrono::NaiveTime;

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_insert_and_get() {
        let db = setup_db();

        let mut employee = Employee::new("Maria".into(), "Keller".into(), "nurse".into());
        employee.qualifications.wound_care = true;
        employee.working_hours.insert(
            Weekday::Monday,
            WorkingDay {
                start: NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
                end: NaiveTime::from_hms_opt(15, 30, 0).unwrap(),
                is_working_day: true,
            },
        );

        db.insert_employee(&employee).unwrap();

        let retrieved = db.get_employee(&employee.id).unwrap().unwrap();
        assert_eq!(retrieved, employee);
    }

    #[test]
    fn test_update_employee() {
        let db = setup_db();
        let mut employee = Employee::new("Maria".into(), "Keller".into(), "nurse".into());
        db.insert_employee(&employee).unwrap();

        employee.max_patients_per_day = 6;
        employee.role = "lead nurse".into();
        assert!(db.update_employee(&employee).unwrap());

        let retrieved = db.get_employee(&employee.id).unwrap().unwrap();
        assert_eq!(retrieved.max_patients_per_day, 6);
        assert_eq!(retrieved.role, "lead nurse");
    }

    #[test]
    fn test_delete_missing_employee() {
        let db = setup_db();
        assert!(!db.delete_employee("nope").unwrap());
    }
}
