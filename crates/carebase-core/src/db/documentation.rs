//! Care documentation database operations.

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Params, Row};

use super::{parse_column, Database, DbError, DbResult};
use crate::models::Documentation;

const DOC_COLUMNS: &str = r#"
    id, patient_id, tour_id, shift_id, author_id, date, content,
    status, created_at, updated_at
"#;

impl Database {
    /// Insert a new documentation entry.
    pub fn insert_documentation(&self, doc: &Documentation) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO documentation (
                id, patient_id, tour_id, shift_id, author_id, date, content,
                status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                doc.id,
                doc.patient_id,
                doc.tour_id,
                doc.shift_id,
                doc.author_id,
                doc.date,
                doc.content,
                doc.status.as_str(),
                doc.created_at,
                doc.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Update an existing documentation entry.
    pub fn update_documentation(&self, doc: &Documentation) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE documentation SET
                tour_id = ?2,
                shift_id = ?3,
                author_id = ?4,
                date = ?5,
                content = ?6,
                status = ?7,
                updated_at = ?8
            WHERE id = ?1
            "#,
            params![
                doc.id,
                doc.tour_id,
                doc.shift_id,
                doc.author_id,
                doc.date,
                doc.content,
                doc.status.as_str(),
                doc.updated_at,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get a documentation entry by ID.
    pub fn get_documentation(&self, id: &str) -> DbResult<Option<Documentation>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM documentation WHERE id = ?", DOC_COLUMNS),
                [id],
                DocRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List documentation, newest day first, optionally for one patient.
    pub fn list_documentation(&self, patient_id: Option<&str>) -> DbResult<Vec<Documentation>> {
        let sql = format!(
            r#"
            SELECT {} FROM documentation
            WHERE ?1 IS NULL OR patient_id = ?1
            ORDER BY date DESC, created_at DESC
            "#,
            DOC_COLUMNS
        );
        self.query_documentation(&sql, [patient_id])
    }

    /// Documentation of a patient dated within `[from, to]`.
    pub fn documentation_for_patient_between(
        &self,
        patient_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<Vec<Documentation>> {
        let sql = format!(
            r#"
            SELECT {} FROM documentation
            WHERE patient_id = ? AND date BETWEEN ? AND ?
            ORDER BY date, created_at
            "#,
            DOC_COLUMNS
        );
        self.query_documentation(&sql, params![patient_id, from, to])
    }

    /// Delete a documentation entry.
    pub fn delete_documentation(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM documentation WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }

    fn query_documentation<P: Params>(&self, sql: &str, params: P) -> DbResult<Vec<Documentation>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, DocRow::from_row)?;

        let mut docs = Vec::new();
        for row in rows {
            docs.push(row?.try_into()?);
        }
        Ok(docs)
    }
}

/// Intermediate row struct for database mapping.
struct DocRow {
    id: String,
    patient_id: String,
    tour_id: Option<String>,
    shift_id: Option<String>,
    author_id: Option<String>,
    date: NaiveDate,
    content: String,
    status: String,
    created_at: String,
    updated_at: String,
}

impl DocRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            patient_id: row.get(1)?,
            tour_id: row.get(2)?,
            shift_id: row.get(3)?,
            author_id: row.get(4)?,
            date: row.get(5)?,
            content: row.get(6)?,
            status: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }
}

impl TryFrom<DocRow> for Documentation {
    type Error = DbError;

    fn try_from(row: DocRow) -> Result<Self, Self::Error> {
        Ok(Documentation {
            id: row.id,
            patient_id: row.patient_id,
            tour_id: row.tour_id,
            shift_id: row.shift_id,
            author_id: row.author_id,
            date: row.date,
            content: row.content,
            status: parse_column(&row.status)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
