//! Billing export for insurance submission.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db::{Database, DbError, DbResult};
use crate::models::{BillingStatus, InsuranceBilling};

/// Billing export for a single billing record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingExport {
    /// Export metadata
    pub metadata: BillingMetadata,
    /// Line items for billing
    pub line_items: Vec<BillingLineItem>,
}

/// Billing export metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingMetadata {
    pub billing_id: String,
    pub patient_id: String,
    /// Display name of the patient at export time
    pub patient_name: String,
    pub insurance_provider: String,
    pub insurance_number: String,
    pub billing_date: NaiveDate,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub status: BillingStatus,
    pub total_cents: i64,
    pub exported_at: String,
}

/// Single line item for billing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingLineItem {
    pub code: String,
    pub description: String,
    pub date: NaiveDate,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub amount_cents: i64,
}

impl BillingExport {
    /// Create billing export from a billing and the patient's identifiers.
    pub fn from_billing(billing: &InsuranceBilling, patient_name: &str, insurance_number: &str) -> Self {
        let line_items = billing
            .services
            .iter()
            .map(|service| BillingLineItem {
                code: service.code.clone(),
                description: service.description.clone(),
                date: service.date,
                quantity: service.quantity,
                unit_price_cents: service.unit_price_cents,
                amount_cents: service.amount_cents(),
            })
            .collect();

        Self {
            metadata: BillingMetadata {
                billing_id: billing.id.clone(),
                patient_id: billing.patient_id.clone(),
                patient_name: patient_name.to_string(),
                insurance_provider: billing.insurance_provider.clone(),
                insurance_number: insurance_number.to_string(),
                billing_date: billing.billing_date,
                period_start: billing.period_start,
                period_end: billing.period_end,
                status: billing.status,
                total_cents: billing.total_cents,
                exported_at: chrono::Utc::now().to_rfc3339(),
            },
            line_items,
        }
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export to CSV format.
    pub fn to_csv(&self) -> String {
        let mut csv = String::from(CSV_HEADER);
        self.push_csv_lines(&mut csv);
        csv
    }

    fn push_csv_lines(&self, csv: &mut String) {
        for item in &self.line_items {
            csv.push_str(&format!(
                "{},{},{},{},{},{},{},{},{},{},{}\n",
                escape_csv(&self.metadata.billing_id),
                escape_csv(&self.metadata.patient_id),
                escape_csv(&self.metadata.patient_name),
                escape_csv(&self.metadata.insurance_provider),
                escape_csv(&self.metadata.insurance_number),
                item.date,
                escape_csv(&item.code),
                escape_csv(&item.description),
                item.quantity,
                item.unit_price_cents,
                item.amount_cents,
            ));
        }
    }
}

const CSV_HEADER: &str = "billing_id,patient_id,patient_name,insurance_provider,insurance_number,date,code,description,quantity,unit_price_cents,amount_cents\n";

/// Batch billing export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchBillingExport {
    /// Export timestamp
    pub exported_at: String,
    /// Individual billing exports
    pub billings: Vec<BillingExport>,
    /// Total line item count
    pub total_items: usize,
    /// Sum over all billings
    pub total_cents: i64,
}

impl BatchBillingExport {
    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export to CSV format.
    pub fn to_csv(&self) -> String {
        let mut csv = String::from(CSV_HEADER);
        for export in &self.billings {
            export.push_csv_lines(&mut csv);
        }
        csv
    }
}

/// Billing exporter.
pub struct BillingExporter<'a> {
    db: &'a Database,
}

impl<'a> BillingExporter<'a> {
    /// Create a new billing exporter.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Export a single billing.
    pub fn export_by_id(&self, billing_id: &str) -> DbResult<BillingExport> {
        let billing = self
            .db
            .get_billing(billing_id)?
            .ok_or_else(|| DbError::NotFound(format!("billing {}", billing_id)))?;
        self.export(&billing)
    }

    /// Export every billing, optionally only those with one status.
    pub fn export_all(&self, status: Option<BillingStatus>) -> DbResult<BatchBillingExport> {
        let mut billings = Vec::new();
        let mut total_items = 0;
        let mut total_cents = 0;

        for billing in self.db.list_billings(None)? {
            if status.is_some_and(|s| s != billing.status) {
                continue;
            }
            let export = self.export(&billing)?;
            total_items += export.line_items.len();
            total_cents += export.metadata.total_cents;
            billings.push(export);
        }

        Ok(BatchBillingExport {
            exported_at: chrono::Utc::now().to_rfc3339(),
            billings,
            total_items,
            total_cents,
        })
    }

    fn export(&self, billing: &InsuranceBilling) -> DbResult<BillingExport> {
        let (name, number) = match self.db.get_patient(&billing.patient_id)? {
            Some(patient) => (patient.full_name(), patient.insurance.number),
            None => (String::new(), String::new()),
        };
        Ok(BillingExport::from_billing(billing, &name, &number))
    }
}

/// Escape a string for CSV output.
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
