//! Store driver contract.
//!
//! Drivers accept native filter documents (see [`crate::query::MongoDialect`])
//! and return driver-shaped results; the adapter layer normalizes them.

pub mod matcher;
pub mod memory;

use async_trait::async_trait;
use bson::{Bson, Document};
use std::sync::Arc;

use crate::errors::DriverError;
use crate::query::Pagination;

pub use memory::{FaultPlan, MemoryStore};

#[derive(Debug, Clone, PartialEq)]
pub struct InsertOneResult {
    pub acknowledged: bool,
    pub inserted_id: Bson,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertManyResult {
    pub acknowledged: bool,
    pub inserted_count: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceResult {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
    pub upserted_id: Option<Bson>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteResult {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

/// One collection of a document store.
#[async_trait]
pub trait CollectionDriver: Send + Sync {
    fn name(&self) -> &str;

    async fn find(
        &self,
        filter: Document,
        sort: Option<Document>,
        page: Option<Pagination>,
    ) -> Result<Vec<Document>, DriverError>;

    async fn find_one(&self, filter: Document) -> Result<Option<Document>, DriverError>;

    async fn insert_one(&self, doc: Document) -> Result<InsertOneResult, DriverError>;

    async fn insert_many(&self, docs: Vec<Document>) -> Result<InsertManyResult, DriverError>;

    async fn replace_one(
        &self,
        filter: Document,
        replacement: Document,
        upsert: bool,
    ) -> Result<ReplaceResult, DriverError>;

    async fn delete_one(&self, filter: Document) -> Result<DeleteResult, DriverError>;

    async fn delete_many(&self, filter: Document) -> Result<DeleteResult, DriverError>;

    async fn count_documents(&self, filter: Document) -> Result<u64, DriverError>;
}

/// A live connection handed out by a [`StoreConnector`].
pub trait DocumentClient: Send + Sync {
    /// # Errors
    /// Returns `DriverError::Closed` once the client has been closed.
    fn collection(
        &self,
        database: &str,
        name: &str,
    ) -> Result<Arc<dyn CollectionDriver>, DriverError>;

    fn close(&self);

    fn is_closed(&self) -> bool;
}

/// Process-wide connection pool.
pub trait StoreConnector: Send + Sync {
    /// # Errors
    /// Returns `DriverError::Connection` when the store cannot be reached.
    fn connect(&self) -> Result<Arc<dyn DocumentClient>, DriverError>;
}
