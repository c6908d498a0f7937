use std::sync::Arc;

use crate::adapter::DocumentCollectionAdapter;
use crate::context::RunContext;
use crate::driver::CollectionDriver;
use crate::errors::StoreError;
use crate::model::RuntimeState;
use crate::query::equals;

const MODULE_NAME: &str = "RUNTIME-STATE-REPOSITORY";
pub const COLLECTION_NAME: &str = "runtime-state";

/// Watermark persistence: exactly one record per stream.
#[derive(Clone)]
pub struct RuntimeStateRepository {
    adapter: DocumentCollectionAdapter<RuntimeState>,
}

impl RuntimeStateRepository {
    pub fn new(ctx: &RunContext) -> Result<Self, StoreError> {
        Ok(Self::from_collection(ctx.collection(COLLECTION_NAME)?))
    }

    pub fn from_collection(collection: Arc<dyn CollectionDriver>) -> Self {
        Self { adapter: DocumentCollectionAdapter::new(MODULE_NAME, collection) }
    }

    /// The stream's record, or `None` before its first run.
    ///
    /// # Errors
    /// `NotFound` when more than one record exists for the stream.
    pub async fn find(&self, stream: &str) -> Result<Option<RuntimeState>, StoreError> {
        let mut states = self.adapter.find(Some(&equals("documentType", stream)), None).await?;
        match states.len() {
            0 => Ok(None),
            1 => Ok(states.pop()),
            n => {
                log::error!("[{MODULE_NAME}] {n} runtime state records found for {stream}");
                Err(StoreError::not_found(
                    MODULE_NAME,
                    format!("Ambiguous runtime state: {n} records found for {stream}."),
                ))
            }
        }
    }

    /// # Errors
    /// `NotFound` when zero or several records exist for the stream.
    pub async fn read(&self, stream: &str) -> Result<RuntimeState, StoreError> {
        self.find(stream).await?.ok_or_else(|| {
            StoreError::not_found(MODULE_NAME, format!("Runtime state not found for {stream}."))
        })
    }

    /// Replaces the stream's record, creating it on the first run.
    pub async fn upsert(&self, state: &RuntimeState) -> Result<RuntimeState, StoreError> {
        let mut next = state.clone();
        if next.id.is_none() {
            next.id = self.find(&state.document_type).await?.and_then(|s| s.id);
        }
        let query = equals("documentType", state.document_type.as_str());
        let id = self.adapter.replace_one(&query, &next, true).await?;
        next.id = id;
        Ok(next)
    }
}
