//! Care documentation operations.

use tracing::info;

use super::required;
use crate::db::Database;
use crate::models::{Documentation, DocumentationPatch, DocumentationStatus, NewDocumentation};
use crate::{CareCore, CareError, CareResult};

/// Linked tour, shift and author must exist when set.
fn check_links(db: &Database, doc: &Documentation) -> CareResult<()> {
    if let Some(tour_id) = &doc.tour_id {
        required(db.get_tour(tour_id)?, "tour", tour_id)?;
    }
    if let Some(shift_id) = &doc.shift_id {
        required(db.get_shift(shift_id)?, "shift", shift_id)?;
    }
    if let Some(author_id) = &doc.author_id {
        required(db.get_employee(author_id)?, "employee", author_id)?;
    }
    Ok(())
}

impl CareCore {
    pub fn create_documentation(&self, input: NewDocumentation) -> CareResult<Documentation> {
        let doc = input.into_documentation();

        let db = self.lock()?;
        required(db.get_patient(&doc.patient_id)?, "patient", &doc.patient_id)?;
        check_links(&db, &doc)?;
        db.insert_documentation(&doc)?;

        info!(documentation_id = %doc.id, patient_id = %doc.patient_id, date = %doc.date, "documentation created");
        Ok(doc)
    }

    pub fn get_documentation(&self, id: &str) -> CareResult<Documentation> {
        let db = self.lock()?;
        required(db.get_documentation(id)?, "documentation", id)
    }

    /// Newest first, optionally for one patient.
    pub fn list_documentation(&self, patient_id: Option<&str>) -> CareResult<Vec<Documentation>> {
        let db = self.lock()?;
        Ok(db.list_documentation(patient_id)?)
    }

    pub fn update_documentation(&self, id: &str, patch: DocumentationPatch) -> CareResult<Documentation> {
        let db = self.lock()?;
        let mut doc = required(db.get_documentation(id)?, "documentation", id)?;
        patch.apply(&mut doc);
        check_links(&db, &doc)?;
        db.update_documentation(&doc)?;
        info!(documentation_id = %id, "documentation updated");
        Ok(doc)
    }

    pub fn delete_documentation(&self, id: &str) -> CareResult<()> {
        let db = self.lock()?;
        if !db.delete_documentation(id)? {
            return Err(CareError::NotFound(format!("documentation {}", id)));
        }
        info!(documentation_id = %id, "documentation deleted");
        Ok(())
    }

    /// Move a documentation entry along `pending <-> review <-> completed`.
    pub fn set_documentation_status(
        &self,
        id: &str,
        status: DocumentationStatus,
    ) -> CareResult<Documentation> {
        let db = self.lock()?;
        let mut doc = required(db.get_documentation(id)?, "documentation", id)?;
        if !doc.status.can_transition_to(status) {
            return Err(CareError::Conflict(format!(
                "documentation cannot move from {} to {}",
                doc.status.as_str(),
                status.as_str()
            )));
        }

        doc.status = status;
        doc.touch();
        db.update_documentation(&doc)?;
        info!(documentation_id = %id, status = status.as_str(), "documentation status changed");
        Ok(doc)
    }
}
