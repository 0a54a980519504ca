//! Expiry-tracked inventory (dressings, medication stock, test strips).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExpiryItem {
    pub id: String,
    pub name: String,
    pub category: Option<String>,
    pub quantity: u32,
    pub unit: Option<String>,
    pub expiry_date: NaiveDate,
    /// Storage place, e.g. "car 3" or "office fridge"
    pub location: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl ExpiryItem {
    pub fn new(name: String, quantity: u32, expiry_date: NaiveDate) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            category: None,
            quantity,
            unit: None,
            expiry_date,
            location: None,
            notes: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Days left until expiry; negative once expired.
    pub fn days_until_expiry(&self, today: NaiveDate) -> i64 {
        (self.expiry_date - today).num_days()
    }

    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry_date < today
    }

    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewExpiryItem {
    pub name: String,
    pub category: Option<String>,
    #[serde(default)]
    pub quantity: u32,
    pub unit: Option<String>,
    pub expiry_date: NaiveDate,
    pub location: Option<String>,
    pub notes: Option<String>,
}

impl NewExpiryItem {
    pub fn into_item(self) -> ExpiryItem {
        let mut item = ExpiryItem::new(self.name, self.quantity, self.expiry_date);
        item.category = self.category;
        item.unit = self.unit;
        item.location = self.location;
        item.notes = self.notes;
        item
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpiryItemPatch {
    pub name: Option<String>,
    pub category: Option<String>,
    pub quantity: Option<u32>,
    pub unit: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub location: Option<String>,
    pub notes: Option<String>,
}

impl ExpiryItemPatch {
    pub fn apply(self, item: &mut ExpiryItem) {
        if let Some(v) = self.name {
            item.name = v;
        }
        if let Some(v) = self.category {
            item.category = Some(v);
        }
        if let Some(v) = self.quantity {
            item.quantity = v;
        }
        if let Some(v) = self.unit {
            item.unit = Some(v);
        }
        if let Some(v) = self.expiry_date {
            item.expiry_date = v;
        }
        if let Some(v) = self.location {
            item.location = Some(v);
        }
        if let Some(v) = self.notes {
            item.notes = Some(v);
        }
        item.touch();
    }
}
