//! Tour database operations.

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, params_from_iter, types::ToSql, OptionalExtension, Params, Row};

use super::{parse_column, Database, DbError, DbResult};
use crate::models::{Tour, TourFilter};

const TOUR_COLUMNS: &str = r#"
    id, employee_id, date, start_time, patient_ids, status,
    optimized_route, created_at, updated_at
"#;

impl Database {
    /// Insert a new tour.
    pub fn insert_tour(&self, tour: &Tour) -> DbResult<()> {
        let patient_ids_json = serde_json::to_string(&tour.patient_ids)?;
        let route_json = serde_json::to_string(&tour.optimized_route)?;

        self.conn.execute(
            r#"
            INSERT INTO tours (
                id, employee_id, date, start_time, patient_ids, status,
                optimized_route, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                tour.id,
                tour.employee_id,
                tour.date,
                tour.start_time,
                patient_ids_json,
                tour.status.as_str(),
                route_json,
                tour.created_at,
                tour.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Update an existing tour.
    pub fn update_tour(&self, tour: &Tour) -> DbResult<bool> {
        let patient_ids_json = serde_json::to_string(&tour.patient_ids)?;
        let route_json = serde_json::to_string(&tour.optimized_route)?;

        let rows_affected = self.conn.execute(
            r#"
            UPDATE tours SET
                employee_id = ?2,
                date = ?3,
                start_time = ?4,
                patient_ids = ?5,
                status = ?6,
                optimized_route = ?7,
                updated_at = ?8
            WHERE id = ?1
            "#,
            params![
                tour.id,
                tour.employee_id,
                tour.date,
                tour.start_time,
                patient_ids_json,
                tour.status.as_str(),
                route_json,
                tour.updated_at,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get a tour by ID.
    pub fn get_tour(&self, id: &str) -> DbResult<Option<Tour>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM tours WHERE id = ?", TOUR_COLUMNS),
                [id],
                TourRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List tours matching the filter, ordered by start time.
    pub fn list_tours(&self, filter: &TourFilter) -> DbResult<Vec<Tour>> {
        let mut sql = format!("SELECT {} FROM tours WHERE 1 = 1", TOUR_COLUMNS);
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(date) = filter.date {
            sql.push_str(" AND date = ?");
            values.push(Box::new(date));
        }
        if let Some(employee_id) = &filter.employee_id {
            sql.push_str(" AND employee_id = ?");
            values.push(Box::new(employee_id.clone()));
        }
        sql.push_str(" ORDER BY start_time, id");

        self.query_tours(&sql, params_from_iter(values.iter()))
    }

    /// All tours of one employee on one day, ordered by start time then id.
    pub fn tours_for_employee_on(&self, employee_id: &str, date: NaiveDate) -> DbResult<Vec<Tour>> {
        let sql = format!(
            "SELECT {} FROM tours WHERE employee_id = ? AND date = ? ORDER BY start_time, id",
            TOUR_COLUMNS
        );
        self.query_tours(&sql, params![employee_id, date])
    }

    /// Tours dated within `[from, to]` that visit the given patient.
    pub fn tours_with_patient_between(
        &self,
        patient_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<Vec<Tour>> {
        let sql = format!(
            r#"
            SELECT {} FROM tours
            WHERE date BETWEEN ? AND ?
              AND EXISTS (SELECT 1 FROM json_each(tours.patient_ids) WHERE json_each.value = ?)
            ORDER BY date, start_time, id
            "#,
            TOUR_COLUMNS
        );
        self.query_tours(&sql, params![from, to, patient_id])
    }

    /// Delete a tour.
    pub fn delete_tour(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute("DELETE FROM tours WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }

    fn query_tours<P: Params>(&self, sql: &str, params: P) -> DbResult<Vec<Tour>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, TourRow::from_row)?;

        let mut tours = Vec::new();
        for row in rows {
            tours.push(row?.try_into()?);
        }
        Ok(tours)
    }
}

/// Intermediate row struct for database mapping.
struct TourRow {
    id: String,
    employee_id: String,
    date: NaiveDate,
    start_time: NaiveDateTime,
    patient_ids: String,
    status: String,
    optimized_route: String,
    created_at: String,
    updated_at: String,
}

impl TourRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            employee_id: row.get(1)?,
            date: row.get(2)?,
            start_time: row.get(3)?,
            patient_ids: row.get(4)?,
            status: row.get(5)?,
            optimized_route: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }
}

impl TryFrom<TourRow> for Tour {
    type Error = DbError;

    fn try_from(row: TourRow) -> Result<Self, Self::Error> {
        Ok(Tour {
            id: row.id,
            employee_id: row.employee_id,
            date: row.date,
            start_time: row.start_time,
            patient_ids: serde_json::from_str(&row.patient_ids)?,
            status: parse_column(&row.status)?,
            optimized_route: serde_json::from_str(&row.optimized_route)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
