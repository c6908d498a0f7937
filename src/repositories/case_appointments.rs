use std::sync::Arc;

use crate::adapter::DocumentCollectionAdapter;
use crate::context::RunContext;
use crate::driver::CollectionDriver;
use crate::errors::StoreError;
use crate::model::{CASE_APPOINTMENT_DOCUMENT_TYPE, CaseAppointment, now_iso};
use crate::query::{Direction, and, equals, missing, order_by};

const MODULE_NAME: &str = "CASE-APPOINTMENTS-REPOSITORY";
pub const COLLECTION_NAME: &str = "trustee-appointments";

/// Trustee appointment history per case.
#[derive(Clone)]
pub struct CaseAppointmentsRepository {
    adapter: DocumentCollectionAdapter<CaseAppointment>,
}

impl CaseAppointmentsRepository {
    pub fn new(ctx: &RunContext) -> Result<Self, StoreError> {
        Ok(Self::from_collection(ctx.collection(COLLECTION_NAME)?))
    }

    pub fn from_collection(collection: Arc<dyn CollectionDriver>) -> Self {
        Self { adapter: DocumentCollectionAdapter::new(MODULE_NAME, collection) }
    }

    /// The case's open appointment, if any.
    ///
    /// # Errors
    /// `NotFound` when more than one open appointment exists for the case.
    pub async fn get_active_case_appointment(&self, case_id: &str) -> Result<Option<CaseAppointment>, StoreError> {
        let query = and(vec![
            equals("documentType", CASE_APPOINTMENT_DOCUMENT_TYPE),
            equals("caseId", case_id),
            missing("unassignedOn"),
        ]);
        let mut open = self.adapter.find(Some(&query), None).await?;
        match open.len() {
            0 => Ok(None),
            1 => Ok(open.pop()),
            n => {
                log::error!("[{MODULE_NAME}] {n} open appointments found for case {case_id}");
                Err(StoreError::not_found(
                    MODULE_NAME,
                    format!("Ambiguous appointment history: {n} open appointments for case {case_id}."),
                ))
            }
        }
    }

    pub async fn create_case_appointment(&self, appointment: &CaseAppointment) -> Result<CaseAppointment, StoreError> {
        let id = self.adapter.insert_one(appointment).await?;
        log::debug!(
            "[{MODULE_NAME}] appointed trustee {} to case {}",
            appointment.trustee_id,
            appointment.case_id
        );
        Ok(CaseAppointment { id: Some(id), ..appointment.clone() })
    }

    /// Replaces the stored appointment with the same id.
    ///
    /// # Errors
    /// `BadInput` when `appointment` has no id; `NotFound` when no stored
    /// appointment carries it.
    pub async fn update_case_appointment(&self, appointment: &CaseAppointment) -> Result<CaseAppointment, StoreError> {
        let Some(id) = appointment.id.as_deref() else {
            return Err(StoreError::bad_input(MODULE_NAME, "Appointment id is required for update."));
        };
        let query = and(vec![equals("documentType", CASE_APPOINTMENT_DOCUMENT_TYPE), equals("id", id)]);
        let mut next = appointment.clone();
        next.updated_on = now_iso();
        match self.adapter.replace_one(&query, &next, false).await? {
            Some(_) => Ok(next),
            None => Err(StoreError::not_found(
                MODULE_NAME,
                format!("Failed to update appointment {id}: no documents modified."),
            )),
        }
    }

    /// Every appointment recorded for a case, oldest first.
    pub async fn find_case_appointments(&self, case_id: &str) -> Result<Vec<CaseAppointment>, StoreError> {
        let query = and(vec![
            equals("documentType", CASE_APPOINTMENT_DOCUMENT_TYPE),
            equals("caseId", case_id),
        ]);
        let sort = order_by(vec![("assignedOn".to_string(), Direction::Ascending)]);
        self.adapter.find(Some(&query), Some(&sort)).await
    }
}
