//! Expiry-tracked inventory.

use chrono::Duration;
use tracing::info;

use super::{ensure, required, today};
use crate::models::{ExpiryItem, ExpiryItemPatch, NewExpiryItem};
use crate::{CareCore, CareError, CareResult};

impl CareCore {
    pub fn create_expiry_item(&self, input: NewExpiryItem) -> CareResult<ExpiryItem> {
        ensure(!input.name.trim().is_empty(), "item name is required")?;
        let item = input.into_item();

        let db = self.lock()?;
        db.insert_expiry_item(&item)?;
        info!(item_id = %item.id, expiry_date = %item.expiry_date, "expiry item created");
        Ok(item)
    }

    pub fn get_expiry_item(&self, id: &str) -> CareResult<ExpiryItem> {
        let db = self.lock()?;
        required(db.get_expiry_item(id)?, "expiry item", id)
    }

    /// Items by expiry date. With `within_days`, only those expiring within
    /// that many days from today, already expired ones included.
    pub fn list_expiry_items(&self, within_days: Option<u32>) -> CareResult<Vec<ExpiryItem>> {
        let until = within_days.map(|days| today() + Duration::days(i64::from(days)));
        let db = self.lock()?;
        Ok(db.list_expiry_items(until)?)
    }

    pub fn update_expiry_item(&self, id: &str, patch: ExpiryItemPatch) -> CareResult<ExpiryItem> {
        let db = self.lock()?;
        let mut item = required(db.get_expiry_item(id)?, "expiry item", id)?;
        patch.apply(&mut item);
        ensure(!item.name.trim().is_empty(), "item name is required")?;
        db.update_expiry_item(&item)?;
        info!(item_id = %id, "expiry item updated");
        Ok(item)
    }

    pub fn delete_expiry_item(&self, id: &str) -> CareResult<()> {
        let db = self.lock()?;
        if !db.delete_expiry_item(id)? {
            return Err(CareError::NotFound(format!("expiry item {}", id)));
        }
        info!(item_id = %id, "expiry item deleted");
        Ok(())
    }
}
