//! Insurance billing models.

use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Billing lifecycle status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BillingStatus {
    Draft,
    Pending,
    Submitted,
    Paid,
    Rejected,
}

impl BillingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingStatus::Draft => "draft",
            BillingStatus::Pending => "pending",
            BillingStatus::Submitted => "submitted",
            BillingStatus::Paid => "paid",
            BillingStatus::Rejected => "rejected",
        }
    }

    /// `draft -> pending -> submitted -> paid | rejected`, with
    /// `pending -> draft` and `rejected -> draft` for rework.
    pub fn can_transition_to(self, next: BillingStatus) -> bool {
        use BillingStatus::*;
        matches!(
            (self, next),
            (Draft, Pending)
                | (Pending, Draft)
                | (Pending, Submitted)
                | (Submitted, Paid)
                | (Submitted, Rejected)
                | (Rejected, Draft)
        )
    }

    /// Whether line items may still be edited.
    pub fn is_editable(self) -> bool {
        self == BillingStatus::Draft
    }
}

impl FromStr for BillingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(BillingStatus::Draft),
            "pending" => Ok(BillingStatus::Pending),
            "submitted" => Ok(BillingStatus::Submitted),
            "paid" => Ok(BillingStatus::Paid),
            "rejected" => Ok(BillingStatus::Rejected),
            other => Err(format!("unknown billing status: {}", other)),
        }
    }
}

/// One billable service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BillingService {
    pub code: String,
    pub description: String,
    pub date: NaiveDate,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

impl BillingService {
    pub fn amount_cents(&self) -> i64 {
        i64::from(self.quantity) * self.unit_price_cents
    }
}

/// A bill to a patient's insurer for a period.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InsuranceBilling {
    pub id: String,
    pub patient_id: String,
    pub insurance_provider: String,
    pub billing_date: NaiveDate,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub services: Vec<BillingService>,
    /// Always the sum of the service amounts
    pub total_cents: i64,
    pub notes: Option<String>,
    pub status: BillingStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl InsuranceBilling {
    pub fn new(
        patient_id: String,
        insurance_provider: String,
        billing_date: NaiveDate,
        period_start: NaiveDate,
        period_end: NaiveDate,
    ) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            patient_id,
            insurance_provider,
            billing_date,
            period_start,
            period_end,
            services: Vec::new(),
            total_cents: 0,
            notes: None,
            status: BillingStatus::Draft,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn recompute_total(&mut self) {
        self.total_cents = self.services.iter().map(BillingService::amount_cents).sum();
    }

    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }
}

/// Input for opening a billing entry.
#[derive(Debug, Clone, Deserialize)]
pub struct NewBilling {
    pub patient_id: String,
    /// Defaults to the patient's insurer
    pub insurance_provider: Option<String>,
    /// Defaults to today
    pub billing_date: Option<NaiveDate>,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    #[serde(default)]
    pub services: Vec<BillingService>,
    pub notes: Option<String>,
    /// Proceed even when documentation is missing
    #[serde(default)]
    pub force: bool,
}

/// Partial update; only allowed while the billing is a draft.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BillingPatch {
    pub insurance_provider: Option<String>,
    pub billing_date: Option<NaiveDate>,
    pub services: Option<Vec<BillingService>>,
    pub notes: Option<String>,
}

impl BillingPatch {
    pub fn apply(self, billing: &mut InsuranceBilling) {
        if let Some(v) = self.insurance_provider {
            billing.insurance_provider = v;
        }
        if let Some(v) = self.billing_date {
            billing.billing_date = v;
        }
        if let Some(v) = self.services {
            billing.services = v;
        }
        if let Some(v) = self.notes {
            billing.notes = Some(v);
        }
        billing.recompute_total();
        billing.touch();
    }
}
