//! Expiry-tracked inventory operations.

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbResult};
use crate::models::ExpiryItem;

const ITEM_COLUMNS: &str = r#"
    id, name, category, quantity, unit, expiry_date, location, notes,
    created_at, updated_at
"#;

impl Database {
    /// Insert a new item.
    pub fn insert_expiry_item(&self, item: &ExpiryItem) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO expiry_items (
                id, name, category, quantity, unit, expiry_date, location, notes,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                item.id,
                item.name,
                item.category,
                item.quantity,
                item.unit,
                item.expiry_date,
                item.location,
                item.notes,
                item.created_at,
                item.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Update an existing item.
    pub fn update_expiry_item(&self, item: &ExpiryItem) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE expiry_items SET
                name = ?2,
                category = ?3,
                quantity = ?4,
                unit = ?5,
                expiry_date = ?6,
                location = ?7,
                notes = ?8,
                updated_at = ?9
            WHERE id = ?1
            "#,
            params![
                item.id,
                item.name,
                item.category,
                item.quantity,
                item.unit,
                item.expiry_date,
                item.location,
                item.notes,
                item.updated_at,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get an item by ID.
    pub fn get_expiry_item(&self, id: &str) -> DbResult<Option<ExpiryItem>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM expiry_items WHERE id = ?", ITEM_COLUMNS),
                [id],
                item_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// List items by expiry date, optionally only those expiring on or before `until`.
    pub fn list_expiry_items(&self, until: Option<NaiveDate>) -> DbResult<Vec<ExpiryItem>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {} FROM expiry_items
            WHERE ?1 IS NULL OR expiry_date <= ?1
            ORDER BY expiry_date, name
            "#,
            ITEM_COLUMNS
        ))?;

        let rows = stmt.query_map([until], item_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Delete an item.
    pub fn delete_expiry_item(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM expiry_items WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<ExpiryItem> {
    Ok(ExpiryItem {
        id: row.get(0)?,
        name: row.get(1)?,
        category: row.get(2)?,
        quantity: row.get(3)?,
        unit: row.get(4)?,
        expiry_date: row.get(5)?,
        location: row.get(6)?,
        notes: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}
