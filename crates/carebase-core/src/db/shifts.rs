//! Shift database operations.

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, params_from_iter, types::ToSql, OptionalExtension, Params, Row};

use super::{parse_column, Database, DbError, DbResult};
use crate::models::{Shift, ShiftFilter};

const SHIFT_COLUMNS: &str = r#"
    id, employee_id, start_time, end_time, shift_type, notes,
    conflict_info, created_at, updated_at
"#;

impl Database {
    /// Insert a new shift.
    pub fn insert_shift(&self, shift: &Shift) -> DbResult<()> {
        let conflict_json = shift
            .conflict_info
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.conn.execute(
            r#"
            INSERT INTO shifts (
                id, employee_id, start_time, end_time, shift_type, notes,
                conflict_info, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                shift.id,
                shift.employee_id,
                shift.start_time,
                shift.end_time,
                shift.shift_type.as_str(),
                shift.notes,
                conflict_json,
                shift.created_at,
                shift.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Update an existing shift.
    pub fn update_shift(&self, shift: &Shift) -> DbResult<bool> {
        let conflict_json = shift
            .conflict_info
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let rows_affected = self.conn.execute(
            r#"
            UPDATE shifts SET
                employee_id = ?2,
                start_time = ?3,
                end_time = ?4,
                shift_type = ?5,
                notes = ?6,
                conflict_info = ?7,
                updated_at = ?8
            WHERE id = ?1
            "#,
            params![
                shift.id,
                shift.employee_id,
                shift.start_time,
                shift.end_time,
                shift.shift_type.as_str(),
                shift.notes,
                conflict_json,
                shift.updated_at,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get a shift by ID.
    pub fn get_shift(&self, id: &str) -> DbResult<Option<Shift>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM shifts WHERE id = ?", SHIFT_COLUMNS),
                [id],
                ShiftRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List shifts matching the filter, ordered by start time.
    ///
    /// `from`/`to` select shifts intersecting the window.
    pub fn list_shifts(&self, filter: &ShiftFilter) -> DbResult<Vec<Shift>> {
        let mut sql = format!("SELECT {} FROM shifts WHERE 1 = 1", SHIFT_COLUMNS);
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(employee_id) = &filter.employee_id {
            sql.push_str(" AND employee_id = ?");
            values.push(Box::new(employee_id.clone()));
        }
        if let Some(from) = filter.from {
            sql.push_str(" AND end_time > ?");
            values.push(Box::new(from));
        }
        if let Some(to) = filter.to {
            sql.push_str(" AND start_time < ?");
            values.push(Box::new(to));
        }
        sql.push_str(" ORDER BY start_time, id");

        self.query_shifts(&sql, params_from_iter(values.iter()))
    }

    /// Shifts of an employee intersecting `[start, end)`.
    pub fn shifts_intersecting(
        &self,
        employee_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> DbResult<Vec<Shift>> {
        let sql = format!(
            r#"
            SELECT {} FROM shifts
            WHERE employee_id = ? AND start_time < ? AND end_time > ?
            ORDER BY start_time, id
            "#,
            SHIFT_COLUMNS
        );
        self.query_shifts(&sql, params![employee_id, end, start])
    }

    /// Shifts starting on any day within `[from, to]`.
    pub fn shifts_starting_between(&self, from: NaiveDate, to: NaiveDate) -> DbResult<Vec<Shift>> {
        let sql = format!(
            r#"
            SELECT {} FROM shifts
            WHERE date(start_time) BETWEEN ? AND ?
            ORDER BY start_time, id
            "#,
            SHIFT_COLUMNS
        );
        self.query_shifts(&sql, params![from, to])
    }

    /// Delete a shift.
    pub fn delete_shift(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute("DELETE FROM shifts WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }

    fn query_shifts<P: Params>(&self, sql: &str, params: P) -> DbResult<Vec<Shift>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, ShiftRow::from_row)?;

        let mut shifts = Vec::new();
        for row in rows {
            shifts.push(row?.try_into()?);
        }
        Ok(shifts)
    }
}

/// Intermediate row struct for database mapping.
struct ShiftRow {
    id: String,
    employee_id: String,
    start_time: NaiveDateTime,
    end_time: NaiveDateTime,
    shift_type: String,
    notes: Option<String>,
    conflict_info: Option<String>,
    created_at: String,
    updated_at: String,
}

impl ShiftRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            employee_id: row.get(1)?,
            start_time: row.get(2)?,
            end_time: row.get(3)?,
            shift_type: row.get(4)?,
            notes: row.get(5)?,
            conflict_info: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }
}

impl TryFrom<ShiftRow> for Shift {
    type Error = DbError;

    fn try_from(row: ShiftRow) -> Result<Self, Self::Error> {
        Ok(Shift {
            id: row.id,
            employee_id: row.employee_id,
            start_time: row.start_time,
            end_time: row.end_time,
            shift_type: parse_column(&row.shift_type)?,
            notes: row.notes,
            conflict_info: row
                .conflict_info
                .as_deref()
                .map(serde_json::from_str)
                .transpose()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
