//! Insurance billing: documentation gate, lifecycle, suggestions and export.

use chrono::NaiveDate;
use tracing::{info, warn};

use super::{ensure, period, required, today};
use crate::db::Database;
use crate::export::{BatchBillingExport, BillingExport, BillingExporter};
use crate::gate::{find_missing_documentation, MissingDocumentation, Period};
use crate::models::{
    BillingPatch, BillingService, BillingStatus, InsuranceBilling, NewBilling,
};
use crate::routing::care_minutes;
use crate::{CareCore, CareError, CareResult};

fn missing_in(db: &Database, patient_id: &str, period: Period) -> CareResult<Vec<MissingDocumentation>> {
    let tours = db.tours_with_patient_between(patient_id, period.start, period.end)?;
    let shifts = db.shifts_starting_between(period.start, period.end)?;
    let docs = db.documentation_for_patient_between(patient_id, period.start, period.end)?;
    Ok(find_missing_documentation(patient_id, period, &tours, &shifts, &docs))
}

fn validate_services(services: &[BillingService]) -> CareResult<()> {
    for service in services {
        ensure(!service.code.trim().is_empty(), "service code is required")?;
        ensure(
            service.unit_price_cents >= 0,
            format!("service {} has a negative price", service.code),
        )?;
    }
    Ok(())
}

impl CareCore {
    /// Tours and shifts of the period that lack documentation for the patient.
    pub fn missing_documentation(
        &self,
        patient_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> CareResult<Vec<MissingDocumentation>> {
        let range = period(from, to)?;
        let db = self.lock()?;
        required(db.get_patient(patient_id)?, "patient", patient_id)?;
        missing_in(&db, patient_id, range)
    }

    /// Open a draft billing. Missing documentation blocks creation unless
    /// `force` is set.
    pub fn create_billing(&self, input: NewBilling) -> CareResult<InsuranceBilling> {
        let range = period(input.period_start, input.period_end)?;
        validate_services(&input.services)?;

        let db = self.lock()?;
        let patient = required(db.get_patient(&input.patient_id)?, "patient", &input.patient_id)?;

        let missing = missing_in(&db, &patient.id, range)?;
        if !missing.is_empty() {
            if !input.force {
                return Err(CareError::MissingDocumentation(missing));
            }
            warn!(
                patient_id = %patient.id,
                missing = missing.len(),
                "billing created despite missing documentation"
            );
        }

        let provider = input
            .insurance_provider
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| patient.insurance.provider.clone());
        ensure(!provider.trim().is_empty(), "insurance provider is required")?;

        let mut billing = InsuranceBilling::new(
            patient.id,
            provider,
            input.billing_date.unwrap_or_else(today),
            range.start,
            range.end,
        );
        billing.services = input.services;
        billing.notes = input.notes;
        billing.recompute_total();
        db.insert_billing(&billing)?;

        info!(
            billing_id = %billing.id,
            patient_id = %billing.patient_id,
            total_cents = billing.total_cents,
            "billing created"
        );
        Ok(billing)
    }

    pub fn get_billing(&self, id: &str) -> CareResult<InsuranceBilling> {
        let db = self.lock()?;
        required(db.get_billing(id)?, "billing", id)
    }

    pub fn list_billings(&self, patient_id: Option<&str>) -> CareResult<Vec<InsuranceBilling>> {
        let db = self.lock()?;
        Ok(db.list_billings(patient_id)?)
    }

    /// Edit a draft billing. The total follows the services.
    pub fn update_billing(&self, id: &str, patch: BillingPatch) -> CareResult<InsuranceBilling> {
        if let Some(services) = &patch.services {
            validate_services(services)?;
        }

        let db = self.lock()?;
        let mut billing = required(db.get_billing(id)?, "billing", id)?;
        if !billing.status.is_editable() {
            return Err(CareError::Conflict(format!(
                "billing {} is {} and can no longer be edited",
                id,
                billing.status.as_str()
            )));
        }

        patch.apply(&mut billing);
        db.update_billing(&billing)?;
        info!(billing_id = %id, total_cents = billing.total_cents, "billing updated");
        Ok(billing)
    }

    /// Only drafts can be deleted.
    pub fn delete_billing(&self, id: &str) -> CareResult<()> {
        let db = self.lock()?;
        let billing = required(db.get_billing(id)?, "billing", id)?;
        if billing.status != BillingStatus::Draft {
            return Err(CareError::Conflict(format!(
                "billing {} is {}; only drafts can be deleted",
                id,
                billing.status.as_str()
            )));
        }
        db.delete_billing(id)?;
        info!(billing_id = %id, "billing deleted");
        Ok(())
    }

    pub fn set_billing_status(&self, id: &str, status: BillingStatus) -> CareResult<InsuranceBilling> {
        let db = self.lock()?;
        let mut billing = required(db.get_billing(id)?, "billing", id)?;
        if !billing.status.can_transition_to(status) {
            return Err(CareError::Conflict(format!(
                "billing cannot move from {} to {}",
                billing.status.as_str(),
                status.as_str()
            )));
        }

        billing.status = status;
        billing.touch();
        db.update_billing(&billing)?;
        info!(billing_id = %id, status = status.as_str(), "billing status changed");
        Ok(billing)
    }

    /// One line item per documented tour visit of the patient in the period.
    pub fn suggest_billing_services(
        &self,
        patient_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> CareResult<Vec<BillingService>> {
        let range = period(from, to)?;
        let db = self.lock()?;
        let patient = required(db.get_patient(patient_id)?, "patient", patient_id)?;
        let tours = db.tours_with_patient_between(patient_id, range.start, range.end)?;
        let docs = db.documentation_for_patient_between(patient_id, range.start, range.end)?;

        let level = patient.care_level.get();
        let minutes = care_minutes(patient.care_level);
        Ok(tours
            .iter()
            .filter(|tour| {
                docs.iter()
                    .any(|d| d.date == tour.date && d.tour_id.as_deref() == Some(tour.id.as_str()))
            })
            .map(|tour| BillingService {
                code: format!("HV-L{}", level),
                description: format!("Home visit, care level {}", level),
                date: tour.date,
                quantity: minutes,
                unit_price_cents: self.settings.cents_per_minute,
            })
            .collect())
    }

    pub fn export_billing(&self, id: &str) -> CareResult<BillingExport> {
        let db = self.lock()?;
        Ok(BillingExporter::new(&db).export_by_id(id)?)
    }

    pub fn export_billings(&self, status: Option<BillingStatus>) -> CareResult<BatchBillingExport> {
        let db = self.lock()?;
        Ok(BillingExporter::new(&db).export_all(status)?)
    }
}
