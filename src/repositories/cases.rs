use bson::Document;
use std::sync::Arc;

use crate::adapter::DocumentCollectionAdapter;
use crate::context::RunContext;
use crate::driver::CollectionDriver;
use crate::errors::StoreError;
use crate::model::{SYNCED_CASE_DOCUMENT_TYPE, SyncedCase};
use crate::query::{Query, and, equals};

const MODULE_NAME: &str = "CASES-REPOSITORY";
pub const COLLECTION_NAME: &str = "cases";

#[derive(Clone)]
pub struct CasesRepository {
    adapter: DocumentCollectionAdapter<SyncedCase>,
    // Untyped view of the same collection, for writes that must keep fields
    // `SyncedCase` does not model.
    raw: DocumentCollectionAdapter<Document>,
}

impl CasesRepository {
    pub fn new(ctx: &RunContext) -> Result<Self, StoreError> {
        Ok(Self::from_collection(ctx.collection(COLLECTION_NAME)?))
    }

    pub fn from_collection(collection: Arc<dyn CollectionDriver>) -> Self {
        Self {
            adapter: DocumentCollectionAdapter::new(MODULE_NAME, collection.clone()),
            raw: DocumentCollectionAdapter::new(MODULE_NAME, collection),
        }
    }

    fn case_query(case_id: &str) -> Query {
        and(vec![equals("documentType", SYNCED_CASE_DOCUMENT_TYPE), equals("caseId", case_id)])
    }

    /// # Errors
    /// `NotFound` when the case has not been synchronized.
    pub async fn get_synced_case(&self, case_id: &str) -> Result<SyncedCase, StoreError> {
        self.adapter.find_one(&Self::case_query(case_id)).await
    }

    /// Replaces the case document keyed by case id, creating it if absent.
    pub async fn sync_case(&self, synced: &SyncedCase) -> Result<String, StoreError> {
        self.adapter.replace_one(&Self::case_query(&synced.case_id), synced, true).await?.ok_or_else(|| {
            StoreError::unknown(MODULE_NAME, format!("Upsert of case {} returned no id.", synced.case_id))
        })
    }

    /// Sets the case's `trusteeId`, leaving every other stored field as it
    /// was. Returns `false` without writing when the case already carries
    /// `trustee_id`.
    ///
    /// # Errors
    /// `NotFound` when the case has not been synchronized.
    pub async fn link_trustee(&self, case_id: &str, trustee_id: &str) -> Result<bool, StoreError> {
        let query = Self::case_query(case_id);
        let mut stored = self.raw.find_one(&query).await?;
        if stored.get_str("trusteeId").ok() == Some(trustee_id) {
            return Ok(false);
        }
        stored.insert("trusteeId", trustee_id);
        match self.raw.replace_one(&query, &stored, false).await {
            Ok(Some(_)) => Ok(true),
            Ok(None) => Err(StoreError::not_found(MODULE_NAME, format!("Case {case_id} not found."))),
            // An unacknowledged replace reports NotFound; here the case was just read.
            Err(e) if e.is_not_found() => Err(StoreError::unknown(
                MODULE_NAME,
                format!("Failed to link case {case_id}: write not acknowledged."),
            )),
            Err(e) => Err(e),
        }
    }
}
