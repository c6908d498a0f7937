use std::sync::Arc;

use crate::adapter::DocumentCollectionAdapter;
use crate::context::RunContext;
use crate::driver::CollectionDriver;
use crate::errors::StoreError;
use crate::model::{TRUSTEE_DOCUMENT_TYPE, Trustee};
use crate::query::{Direction, and, equals, matches_pattern, order_by};

const MODULE_NAME: &str = "TRUSTEES-REPOSITORY";
pub const COLLECTION_NAME: &str = "trustees";

/// Trims and collapses internal whitespace.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Case-insensitive pattern matching `normalized` against stored names
/// whatever their whitespace.
fn name_pattern(normalized: &str) -> String {
    let tokens: Vec<String> = normalized.split(' ').map(regex::escape).collect();
    format!("(?i)^\\s*{}\\s*$", tokens.join("\\s+"))
}

#[derive(Clone)]
pub struct TrusteesRepository {
    adapter: DocumentCollectionAdapter<Trustee>,
}

impl TrusteesRepository {
    pub fn new(ctx: &RunContext) -> Result<Self, StoreError> {
        Ok(Self::from_collection(ctx.collection(COLLECTION_NAME)?))
    }

    pub fn from_collection(collection: Arc<dyn CollectionDriver>) -> Self {
        Self { adapter: DocumentCollectionAdapter::new(MODULE_NAME, collection) }
    }

    pub async fn list_trustees(&self) -> Result<Vec<Trustee>, StoreError> {
        let query = equals("documentType", TRUSTEE_DOCUMENT_TYPE);
        let sort = order_by(vec![("name".to_string(), Direction::Ascending)]);
        self.adapter.find(Some(&query), Some(&sort)).await
    }

    /// Every trustee whose name matches `name`, ignoring case and extra
    /// whitespace. More than one result is returned as-is.
    ///
    /// # Errors
    /// `BadInput` when `name` is blank.
    pub async fn find_trustees_by_name(&self, name: &str) -> Result<Vec<Trustee>, StoreError> {
        let normalized = normalize_name(name);
        if normalized.is_empty() {
            return Err(StoreError::bad_input(MODULE_NAME, "Trustee name must not be blank."));
        }
        let query = and(vec![
            equals("documentType", TRUSTEE_DOCUMENT_TYPE),
            matches_pattern("name", name_pattern(&normalized)),
        ]);
        self.adapter.find(Some(&query), None).await
    }

    pub async fn read(&self, trustee_id: &str) -> Result<Trustee, StoreError> {
        let query = and(vec![
            equals("documentType", TRUSTEE_DOCUMENT_TYPE),
            equals("trusteeId", trustee_id),
        ]);
        self.adapter.find_one(&query).await
    }

    /// Stores `trustee` with its name normalized.
    pub async fn create_trustee(&self, trustee: &Trustee) -> Result<Trustee, StoreError> {
        let mut trustee = trustee.clone();
        trustee.name = normalize_name(&trustee.name);
        let id = self.adapter.insert_one(&trustee).await?;
        log::info!("[{MODULE_NAME}] created trustee {} ({})", trustee.trustee_id, trustee.name);
        Ok(Trustee { id: Some(id), ..trustee })
    }
}
