//! Per-invocation context and scoped resource release.
//!
//! Every connection a [`RunContext`] opens is registered in its
//! [`ResourceArena`] and closed exactly once when the context's work ends,
//! whether the work succeeded, failed, or the context was simply dropped.

use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::driver::{CollectionDriver, DocumentClient, StoreConnector};
use crate::errors::StoreError;

const MODULE_NAME: &str = "RUN-CONTEXT";

/// A resource that must be released at the end of a scope.
pub trait Closable: Send + Sync {
    fn label(&self) -> &str;
    fn close(&self);
}

#[derive(Default)]
pub struct ResourceArena {
    entries: Mutex<Vec<Arc<dyn Closable>>>,
}

impl ResourceArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, resource: Arc<dyn Closable>) {
        self.entries.lock().push(resource);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Closes and forgets every registered resource, newest first. Returns how
    /// many were closed.
    pub fn release_all(&self) -> usize {
        let drained: Vec<Arc<dyn Closable>> = std::mem::take(&mut *self.entries.lock());
        let n = drained.len();
        for resource in drained.into_iter().rev() {
            log::debug!("releasing {}", resource.label());
            resource.close();
        }
        n
    }
}

impl Drop for ResourceArena {
    fn drop(&mut self) {
        let n = self.release_all();
        if n > 0 {
            log::debug!("released {n} resource(s) on drop");
        }
    }
}

struct ClientLease {
    label: String,
    client: Arc<dyn DocumentClient>,
}

impl Closable for ClientLease {
    fn label(&self) -> &str {
        &self.label
    }

    fn close(&self) {
        self.client.close();
    }
}

/// Owns everything a single request or pipeline run needs: configuration,
/// the pooled connector, and the arena its connections are released through.
pub struct RunContext {
    invocation_id: String,
    config: Arc<AppConfig>,
    connector: Arc<dyn StoreConnector>,
    client: Mutex<Option<Arc<dyn DocumentClient>>>,
    arena: ResourceArena,
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("invocation_id", &self.invocation_id)
            .field("resources", &self.arena.len())
            .finish()
    }
}

impl RunContext {
    pub fn new(config: AppConfig, connector: Arc<dyn StoreConnector>) -> Self {
        Self {
            invocation_id: uuid::Uuid::new_v4().to_string(),
            config: Arc::new(config),
            connector,
            client: Mutex::new(None),
            arena: ResourceArena::new(),
        }
    }

    /// Runs `body` with a fresh context and releases the context's resources
    /// once the body's future completes.
    pub async fn scope<F, Fut, R>(config: AppConfig, connector: Arc<dyn StoreConnector>, body: F) -> R
    where
        F: FnOnce(Arc<RunContext>) -> Fut,
        Fut: Future<Output = R>,
    {
        let ctx = Arc::new(Self::new(config, connector));
        let out = body(ctx.clone()).await;
        let released = ctx.release();
        log::debug!("[{MODULE_NAME}] {} released {released} resource(s)", ctx.invocation_id);
        out
    }

    pub fn invocation_id(&self) -> &str {
        &self.invocation_id
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn arena(&self) -> &ResourceArena {
        &self.arena
    }

    /// The context's store connection, opened on first use.
    ///
    /// # Errors
    /// `Unknown` when the store cannot be reached.
    pub fn client(&self) -> Result<Arc<dyn DocumentClient>, StoreError> {
        let mut slot = self.client.lock();
        if let Some(client) = slot.as_ref().filter(|c| !c.is_closed()) {
            return Ok(client.clone());
        }
        let client = self.connector.connect().map_err(|e| {
            log::error!("[{MODULE_NAME}] cannot connect to document store: {e}");
            StoreError::from_driver(MODULE_NAME, e)
        })?;
        self.arena.register(Arc::new(ClientLease {
            label: format!("document client for {}", self.invocation_id),
            client: client.clone(),
        }));
        *slot = Some(client.clone());
        Ok(client)
    }

    /// A handle to `name` in the configured database.
    ///
    /// # Errors
    /// `ServerConfig` when no target database is configured; `Unknown` on
    /// connection faults.
    pub fn collection(&self, name: &str) -> Result<Arc<dyn CollectionDriver>, StoreError> {
        let database = self.config.store.database.trim();
        if database.is_empty() {
            return Err(StoreError::server_config(MODULE_NAME, "No target database is configured."));
        }
        self.client()?
            .collection(database, name)
            .map_err(|e| StoreError::from_driver(MODULE_NAME, e))
    }

    /// Closes every resource opened through this context.
    pub fn release(&self) -> usize {
        self.client.lock().take();
        self.arena.release_all()
    }
}
