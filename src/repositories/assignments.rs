use std::sync::Arc;

use crate::adapter::DocumentCollectionAdapter;
use crate::context::RunContext;
use crate::driver::CollectionDriver;
use crate::errors::StoreError;
use crate::model::{ASSIGNMENT_DOCUMENT_TYPE, CaseAssignment, now_iso};
use crate::query::{Direction, and, equals, missing, order_by};

const MODULE_NAME: &str = "CASE-ASSIGNMENT-REPOSITORY";
pub const COLLECTION_NAME: &str = "assignments";

#[derive(Clone)]
pub struct CaseAssignmentRepository {
    adapter: DocumentCollectionAdapter<CaseAssignment>,
}

impl CaseAssignmentRepository {
    pub fn new(ctx: &RunContext) -> Result<Self, StoreError> {
        Ok(Self::from_collection(ctx.collection(COLLECTION_NAME)?))
    }

    pub fn from_collection(collection: Arc<dyn CollectionDriver>) -> Self {
        Self { adapter: DocumentCollectionAdapter::new(MODULE_NAME, collection) }
    }

    pub async fn create(&self, assignment: &CaseAssignment) -> Result<String, StoreError> {
        let id = self.adapter.insert_one(assignment).await?;
        log::debug!("[{MODULE_NAME}] assigned {} to case {}", assignment.user_id, assignment.case_id);
        Ok(id)
    }

    /// Replaces the stored assignment with the same id.
    ///
    /// # Errors
    /// `BadInput` when `assignment` has no id; `NotFound` when no stored
    /// assignment carries it.
    pub async fn update(&self, assignment: &CaseAssignment) -> Result<String, StoreError> {
        let Some(id) = assignment.id.as_deref() else {
            return Err(StoreError::bad_input(MODULE_NAME, "Assignment id is required for update."));
        };
        let query = and(vec![equals("documentType", ASSIGNMENT_DOCUMENT_TYPE), equals("id", id)]);
        let mut next = assignment.clone();
        next.updated_on = now_iso();
        match self.adapter.replace_one(&query, &next, false).await? {
            Some(id) => Ok(id),
            None => Err(StoreError::not_found(
                MODULE_NAME,
                format!("Failed to update assignment {id}: no documents modified."),
            )),
        }
    }

    /// All assignments ever made on a case, oldest first.
    pub async fn find_by_case_id(&self, case_id: &str) -> Result<Vec<CaseAssignment>, StoreError> {
        let query = and(vec![
            equals("documentType", ASSIGNMENT_DOCUMENT_TYPE),
            equals("caseId", case_id),
        ]);
        let sort = order_by(vec![("assignedOn".to_string(), Direction::Ascending)]);
        self.adapter.find(Some(&query), Some(&sort)).await
    }

    /// Active assignments for a user; records marked unassigned are excluded.
    pub async fn find_by_assignee(&self, user_id: &str) -> Result<Vec<CaseAssignment>, StoreError> {
        let query = and(vec![
            equals("documentType", ASSIGNMENT_DOCUMENT_TYPE),
            equals("userId", user_id),
            missing("unassignedOn"),
        ]);
        self.adapter.find(Some(&query), None).await
    }
}
