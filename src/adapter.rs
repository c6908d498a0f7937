//! Generic CRUD over a [`CollectionDriver`], speaking [`Query`] instead of
//! native filters.
//!
//! The adapter owns record identity: ids are generated here on insert and
//! any caller-supplied `id` / `_id` is discarded. Every write is checked for
//! driver acknowledgment before it is reported as successful.

use bson::Document;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::sync::Arc;
use uuid::Uuid;

use crate::driver::CollectionDriver;
use crate::errors::StoreError;
use crate::query::{MongoDialect, Pagination, Query, Sort, render, render_sort};

pub struct DocumentCollectionAdapter<T> {
    module: String,
    collection: Arc<dyn CollectionDriver>,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for DocumentCollectionAdapter<T> {
    fn clone(&self) -> Self {
        Self { module: self.module.clone(), collection: self.collection.clone(), _record: PhantomData }
    }
}

impl<T> DocumentCollectionAdapter<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    pub fn new(module: &str, collection: Arc<dyn CollectionDriver>) -> Self {
        Self { module: module.to_string(), collection, _record: PhantomData }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub async fn find(&self, query: Option<&Query>, sort: Option<&Sort>) -> Result<Vec<T>, StoreError> {
        self.find_page(query, sort, None).await
    }

    pub async fn find_page(
        &self,
        query: Option<&Query>,
        sort: Option<&Sort>,
        page: Option<Pagination>,
    ) -> Result<Vec<T>, StoreError> {
        let filter = render(query, &MongoDialect);
        let sort = sort.map(|s| render_sort(s, &MongoDialect));
        let docs = self
            .collection
            .find(filter, sort, page)
            .await
            .map_err(|e| self.driver_error("find", e))?;
        docs.into_iter().map(|d| self.decode(d)).collect()
    }

    pub async fn get_all(&self, sort: Option<&Sort>) -> Result<Vec<T>, StoreError> {
        self.find(None, sort).await
    }

    /// The single record matching `query`.
    ///
    /// # Errors
    /// `NotFound` when no record matches, or when more than one does.
    pub async fn find_one(&self, query: &Query) -> Result<T, StoreError> {
        let filter = render(Some(query), &MongoDialect);
        let mut found = self
            .collection
            .find(filter, None, Some(Pagination { limit: 2, skip: 0 }))
            .await
            .map_err(|e| self.driver_error("find_one", e))?;
        match found.len() {
            0 => Err(StoreError::not_found(&self.module, "No matching item found.")),
            1 => self.decode(found.remove(0)),
            _ => {
                log::error!("[{}] find_one matched more than one record in {}", self.module, self.collection.name());
                Err(StoreError::not_found(&self.module, "Ambiguous match: more than one item found."))
            }
        }
    }

    /// Inserts `item` under a freshly generated id and returns that id.
    pub async fn insert_one(&self, item: &T) -> Result<String, StoreError> {
        let (doc, id) = self.with_fresh_id(item)?;
        let result = self
            .collection
            .insert_one(doc)
            .await
            .map_err(|e| self.driver_error("insert_one", e))?;
        if !result.acknowledged {
            return Err(StoreError::unknown(&self.module, "Failed to insert document into database."));
        }
        Ok(id)
    }

    /// # Errors
    /// `Internal` (carrying the generated ids) when the driver accepted fewer
    /// documents than were submitted.
    pub async fn insert_many(&self, items: &[T]) -> Result<Vec<String>, StoreError> {
        let mut docs = Vec::with_capacity(items.len());
        let mut ids = Vec::with_capacity(items.len());
        for item in items {
            let (doc, id) = self.with_fresh_id(item)?;
            docs.push(doc);
            ids.push(id);
        }
        let result = self
            .collection
            .insert_many(docs)
            .await
            .map_err(|e| self.driver_error("insert_many", e))?;
        if !result.acknowledged {
            return Err(StoreError::unknown(&self.module, "Failed to insert documents into database."));
        }
        if result.inserted_count != ids.len() as u64 {
            log::error!(
                "[{}] insert_many accepted {} of {} documents",
                self.module,
                result.inserted_count,
                ids.len()
            );
            return Err(StoreError::internal(&self.module, "Not all items inserted", ids));
        }
        Ok(ids)
    }

    /// Whole-document replace of the first record matching `query`.
    ///
    /// Returns the record id when a document matched or was upserted, `None`
    /// when nothing matched and `upsert` is off.
    pub async fn replace_one(
        &self,
        query: &Query,
        item: &T,
        upsert: bool,
    ) -> Result<Option<String>, StoreError> {
        let filter = render(Some(query), &MongoDialect);
        let mut doc = self.encode(item)?;
        doc.remove("_id");
        let id = match doc.get_str("id") {
            Ok(existing) => existing.to_string(),
            Err(_) => {
                let fresh = Uuid::new_v4().to_string();
                doc.insert("id", fresh.clone());
                fresh
            }
        };
        let result = self
            .collection
            .replace_one(filter, doc, upsert)
            .await
            .map_err(|e| self.driver_error("replace_one", e))?;
        if !result.acknowledged {
            return Err(if upsert {
                StoreError::unknown(&self.module, "Failed to insert document into database.")
            } else {
                StoreError::not_found(&self.module, "No matching item found.")
            });
        }
        if result.matched_count > 0 || result.upserted_id.is_some() {
            Ok(Some(id))
        } else {
            Ok(None)
        }
    }

    /// # Errors
    /// `NotFound` unless exactly one document was deleted.
    pub async fn delete_one(&self, query: &Query) -> Result<u64, StoreError> {
        let filter = render(Some(query), &MongoDialect);
        let result = self
            .collection
            .delete_one(filter)
            .await
            .map_err(|e| self.driver_error("delete_one", e))?;
        if !result.acknowledged {
            return Err(StoreError::unknown(&self.module, "Delete was not acknowledged."));
        }
        if result.deleted_count != 1 {
            return Err(StoreError::not_found(&self.module, "No items deleted"));
        }
        Ok(result.deleted_count)
    }

    /// # Errors
    /// `NotFound` when nothing was deleted.
    pub async fn delete_many(&self, query: &Query) -> Result<u64, StoreError> {
        let filter = render(Some(query), &MongoDialect);
        let result = self
            .collection
            .delete_many(filter)
            .await
            .map_err(|e| self.driver_error("delete_many", e))?;
        if !result.acknowledged {
            return Err(StoreError::unknown(&self.module, "Delete was not acknowledged."));
        }
        if result.deleted_count < 1 {
            return Err(StoreError::not_found(&self.module, "No items deleted"));
        }
        Ok(result.deleted_count)
    }

    pub async fn count_documents(&self, query: &Query) -> Result<u64, StoreError> {
        let filter = render(Some(query), &MongoDialect);
        self.collection.count_documents(filter).await.map_err(|e| self.driver_error("count_documents", e))
    }

    pub async fn count_all_documents(&self) -> Result<u64, StoreError> {
        let filter = render(None, &MongoDialect);
        self.collection
            .count_documents(filter)
            .await
            .map_err(|e| self.driver_error("count_all_documents", e))
    }

    fn with_fresh_id(&self, item: &T) -> Result<(Document, String), StoreError> {
        let mut doc = self.encode(item)?;
        doc.remove("_id");
        doc.remove("id");
        let id = Uuid::new_v4().to_string();
        doc.insert("id", id.clone());
        Ok((doc, id))
    }

    fn encode(&self, item: &T) -> Result<Document, StoreError> {
        bson::serialize_to_document(item).map_err(|e| {
            StoreError::unknown_with(&self.module, "Failed to encode record.", e)
        })
    }

    fn decode(&self, mut doc: Document) -> Result<T, StoreError> {
        doc.remove("_id");
        bson::deserialize_from_document(doc).map_err(|e| {
            StoreError::unknown_with(&self.module, "Failed to decode record.", e)
        })
    }

    fn driver_error(&self, op: &str, err: crate::errors::DriverError) -> StoreError {
        log::error!("[{}] {op} on {} failed: {err}", self.module, self.collection.name());
        StoreError::from_driver(&self.module, err)
    }
}
