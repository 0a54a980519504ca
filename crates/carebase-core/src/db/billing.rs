//! Insurance billing database operations.

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};

use super::{parse_column, Database, DbError, DbResult};
use crate::models::InsuranceBilling;

const BILLING_COLUMNS: &str = r#"
    id, patient_id, insurance_provider, billing_date, period_start, period_end,
    services, total_cents, notes, status, created_at, updated_at
"#;

impl Database {
    /// Insert a new billing.
    pub fn insert_billing(&self, billing: &InsuranceBilling) -> DbResult<()> {
        let services_json = serde_json::to_string(&billing.services)?;

        self.conn.execute(
            r#"
            INSERT INTO insurance_billings (
                id, patient_id, insurance_provider, billing_date, period_start, period_end,
                services, total_cents, notes, status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                billing.id,
                billing.patient_id,
                billing.insurance_provider,
                billing.billing_date,
                billing.period_start,
                billing.period_end,
                services_json,
                billing.total_cents,
                billing.notes,
                billing.status.as_str(),
                billing.created_at,
                billing.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Update an existing billing.
    pub fn update_billing(&self, billing: &InsuranceBilling) -> DbResult<bool> {
        let services_json = serde_json::to_string(&billing.services)?;

        let rows_affected = self.conn.execute(
            r#"
            UPDATE insurance_billings SET
                insurance_provider = ?2,
                billing_date = ?3,
                period_start = ?4,
                period_end = ?5,
                services = ?6,
                total_cents = ?7,
                notes = ?8,
                status = ?9,
                updated_at = ?10
            WHERE id = ?1
            "#,
            params![
                billing.id,
                billing.insurance_provider,
                billing.billing_date,
                billing.period_start,
                billing.period_end,
                services_json,
                billing.total_cents,
                billing.notes,
                billing.status.as_str(),
                billing.updated_at,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get a billing by ID.
    pub fn get_billing(&self, id: &str) -> DbResult<Option<InsuranceBilling>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM insurance_billings WHERE id = ?", BILLING_COLUMNS),
                [id],
                BillingRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List billings, newest billing date first, optionally for one patient.
    pub fn list_billings(&self, patient_id: Option<&str>) -> DbResult<Vec<InsuranceBilling>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {} FROM insurance_billings
            WHERE ?1 IS NULL OR patient_id = ?1
            ORDER BY billing_date DESC, created_at DESC
            "#,
            BILLING_COLUMNS
        ))?;

        let rows = stmt.query_map([patient_id], BillingRow::from_row)?;

        let mut billings = Vec::new();
        for row in rows {
            billings.push(row?.try_into()?);
        }
        Ok(billings)
    }

    /// Delete a billing.
    pub fn delete_billing(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM insurance_billings WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }
}

/// Intermediate row struct for database mapping.
struct BillingRow {
    id: String,
    patient_id: String,
    insurance_provider: String,
    billing_date: NaiveDate,
    period_start: NaiveDate,
    period_end: NaiveDate,
    services: String,
    total_cents: i64,
    notes: Option<String>,
    status: String,
    created_at: String,
    updated_at: String,
}

impl BillingRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            patient_id: row.get(1)?,
            insurance_provider: row.get(2)?,
            billing_date: row.get(3)?,
            period_start: row.get(4)?,
            period_end: row.get(5)?,
            services: row.get(6)?,
            total_cents: row.get(7)?,
            notes: row.get(8)?,
            status: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }
}

impl TryFrom<BillingRow> for InsuranceBilling {
    type Error = DbError;

    fn try_from(row: BillingRow) -> Result<Self, Self::Error> {
        Ok(InsuranceBilling {
            id: row.id,
            patient_id: row.patient_id,
            insurance_provider: row.insurance_provider,
            billing_date: row.billing_date,
            period_start: row.period_start,
            period_end: row.period_end,
            services: serde_json::from_str(&row.services)?,
            total_cents: row.total_cents,
            notes: row.notes,
            status: parse_column(&row.status)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
