use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::{Bson, Document};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use super::matcher::{compare_docs, eval_filter, parse_filter, parse_sort};
use super::{
    CollectionDriver, DeleteResult, DocumentClient, InsertManyResult, InsertOneResult,
    ReplaceResult, StoreConnector,
};
use crate::errors::DriverError;
use crate::query::Pagination;

/// Faults the in-memory store injects into subsequent operations.
#[derive(Debug, Clone, Default)]
pub struct FaultPlan {
    /// Writes are applied but reported as not acknowledged.
    pub unacknowledged_writes: bool,
    /// `insert_many` accepts at most this many documents.
    pub insert_many_limit: Option<usize>,
    /// Every operation on these collections fails with a command error.
    pub failing_collections: Vec<String>,
    /// `connect` fails.
    pub refuse_connections: bool,
}

type CollectionKey = (String, String);

#[derive(Default)]
struct StoreInner {
    collections: RwLock<HashMap<CollectionKey, Arc<RwLock<Vec<Document>>>>>,
    faults: RwLock<FaultPlan>,
    opened: AtomicU64,
    closed: AtomicU64,
}

/// In-memory document store speaking the Mongo filter dialect.
///
/// Cloning shares the underlying data, like cloning a pool handle.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<StoreInner>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("collections", &self.inner.collections.read().len())
            .field("open_connections", &self.open_connections())
            .finish()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_faults(&self, plan: FaultPlan) {
        *self.inner.faults.write() = plan;
    }

    pub fn clear_faults(&self) {
        *self.inner.faults.write() = FaultPlan::default();
    }

    /// Snapshot of a collection's raw documents, in insertion order.
    pub fn documents(&self, database: &str, collection: &str) -> Vec<Document> {
        let key = (database.to_string(), collection.to_string());
        self.inner.collections.read().get(&key).map(|c| c.read().clone()).unwrap_or_default()
    }

    /// Writes a raw document, bypassing any adapter identity handling.
    pub fn insert_raw(&self, database: &str, collection: &str, mut doc: Document) {
        if !doc.contains_key("_id") {
            doc.insert("_id", ObjectId::new());
        }
        self.inner.collection(database, collection).write().push(doc);
    }

    pub fn open_connections(&self) -> u64 {
        self.inner.opened.load(Ordering::SeqCst) - self.inner.closed.load(Ordering::SeqCst)
    }

    pub fn total_connections(&self) -> u64 {
        self.inner.opened.load(Ordering::SeqCst)
    }
}

impl StoreInner {
    fn collection(&self, database: &str, name: &str) -> Arc<RwLock<Vec<Document>>> {
        let key = (database.to_string(), name.to_string());
        if let Some(c) = self.collections.read().get(&key) {
            return c.clone();
        }
        self.collections.write().entry(key).or_default().clone()
    }
}

impl StoreConnector for MemoryStore {
    fn connect(&self) -> Result<Arc<dyn DocumentClient>, DriverError> {
        if self.inner.faults.read().refuse_connections {
            return Err(DriverError::Connection("connection refused".into()));
        }
        self.inner.opened.fetch_add(1, Ordering::SeqCst);
        log::debug!("memory store: opened connection #{}", self.total_connections());
        Ok(Arc::new(MemoryClient { store: self.inner.clone(), closed: Arc::new(AtomicBool::new(false)) }))
    }
}

pub struct MemoryClient {
    store: Arc<StoreInner>,
    closed: Arc<AtomicBool>,
}

impl DocumentClient for MemoryClient {
    fn collection(
        &self,
        database: &str,
        name: &str,
    ) -> Result<Arc<dyn CollectionDriver>, DriverError> {
        if self.is_closed() {
            return Err(DriverError::Closed);
        }
        Ok(Arc::new(MemoryCollection {
            name: name.to_string(),
            docs: self.store.collection(database, name),
            store: self.store.clone(),
            client_closed: self.closed.clone(),
        }))
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.store.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

pub struct MemoryCollection {
    name: String,
    docs: Arc<RwLock<Vec<Document>>>,
    store: Arc<StoreInner>,
    client_closed: Arc<AtomicBool>,
}

impl MemoryCollection {
    fn check(&self) -> Result<(), DriverError> {
        if self.client_closed.load(Ordering::SeqCst) {
            return Err(DriverError::Closed);
        }
        if self.store.faults.read().failing_collections.iter().any(|c| c == &self.name) {
            return Err(DriverError::Command(format!("injected failure on {}", self.name)));
        }
        Ok(())
    }

    fn acknowledged(&self) -> bool {
        !self.store.faults.read().unacknowledged_writes
    }
}

fn with_object_id(mut doc: Document) -> (Document, Bson) {
    let id = match doc.get("_id") {
        Some(id) => id.clone(),
        None => {
            let id = Bson::ObjectId(ObjectId::new());
            doc.insert("_id", id.clone());
            id
        }
    };
    (doc, id)
}

#[async_trait]
impl CollectionDriver for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn find(
        &self,
        filter: Document,
        sort: Option<Document>,
        page: Option<Pagination>,
    ) -> Result<Vec<Document>, DriverError> {
        self.check()?;
        let filter = parse_filter(&filter)?;
        let sort = sort.as_ref().map(parse_sort).transpose()?;
        let mut out: Vec<Document> =
            self.docs.read().iter().filter(|d| eval_filter(d, &filter)).cloned().collect();
        if let Some(sort) = sort {
            out.sort_by(|a, b| compare_docs(a, b, &sort));
        }
        if let Some(page) = page {
            out = out.into_iter().skip(page.skip).take(page.limit).collect();
        }
        Ok(out)
    }

    async fn find_one(&self, filter: Document) -> Result<Option<Document>, DriverError> {
        self.check()?;
        let filter = parse_filter(&filter)?;
        Ok(self.docs.read().iter().find(|d| eval_filter(d, &filter)).cloned())
    }

    async fn insert_one(&self, doc: Document) -> Result<InsertOneResult, DriverError> {
        self.check()?;
        let (doc, inserted_id) = with_object_id(doc);
        self.docs.write().push(doc);
        Ok(InsertOneResult { acknowledged: self.acknowledged(), inserted_id })
    }

    async fn insert_many(&self, docs: Vec<Document>) -> Result<InsertManyResult, DriverError> {
        self.check()?;
        let limit = self.store.faults.read().insert_many_limit.unwrap_or(usize::MAX);
        let mut stored = self.docs.write();
        let mut inserted_count = 0u64;
        for doc in docs.into_iter().take(limit) {
            stored.push(with_object_id(doc).0);
            inserted_count += 1;
        }
        Ok(InsertManyResult { acknowledged: self.acknowledged(), inserted_count })
    }

    async fn replace_one(
        &self,
        filter: Document,
        replacement: Document,
        upsert: bool,
    ) -> Result<ReplaceResult, DriverError> {
        self.check()?;
        let filter = parse_filter(&filter)?;
        let acknowledged = self.acknowledged();
        let mut stored = self.docs.write();
        if let Some(existing) = stored.iter_mut().find(|d| eval_filter(d, &filter)) {
            let mut next = replacement;
            next.remove("_id");
            if let Some(id) = existing.get("_id") {
                next.insert("_id", id.clone());
            }
            let modified_count = u64::from(*existing != next);
            *existing = next;
            return Ok(ReplaceResult { acknowledged, matched_count: 1, modified_count, upserted_id: None });
        }
        if upsert {
            let (doc, id) = with_object_id(replacement);
            stored.push(doc);
            return Ok(ReplaceResult {
                acknowledged,
                matched_count: 0,
                modified_count: 0,
                upserted_id: Some(id),
            });
        }
        Ok(ReplaceResult { acknowledged, matched_count: 0, modified_count: 0, upserted_id: None })
    }

    async fn delete_one(&self, filter: Document) -> Result<DeleteResult, DriverError> {
        self.check()?;
        let filter = parse_filter(&filter)?;
        let mut stored = self.docs.write();
        let deleted_count = match stored.iter().position(|d| eval_filter(d, &filter)) {
            Some(pos) => {
                stored.remove(pos);
                1
            }
            None => 0,
        };
        Ok(DeleteResult { acknowledged: self.acknowledged(), deleted_count })
    }

    async fn delete_many(&self, filter: Document) -> Result<DeleteResult, DriverError> {
        self.check()?;
        let filter = parse_filter(&filter)?;
        let mut stored = self.docs.write();
        let before = stored.len();
        stored.retain(|d| !eval_filter(d, &filter));
        let deleted_count = (before - stored.len()) as u64;
        Ok(DeleteResult { acknowledged: self.acknowledged(), deleted_count })
    }

    async fn count_documents(&self, filter: Document) -> Result<u64, DriverError> {
        self.check()?;
        let filter = parse_filter(&filter)?;
        Ok(self.docs.read().iter().filter(|d| eval_filter(d, &filter)).count() as u64)
    }
}
