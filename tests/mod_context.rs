use docsync::config::AppConfig;
use docsync::context::{Closable, ResourceArena, RunContext};
use docsync::driver::{FaultPlan, MemoryStore};
use docsync::errors::ErrorKind;
use docsync::repositories::Repositories;
use parking_lot::Mutex;
use std::sync::Arc;

struct TrackedResource {
    name: String,
    log: Arc<Mutex<Vec<String>>>,
}

impl Closable for TrackedResource {
    fn label(&self) -> &str {
        &self.name
    }

    fn close(&self) {
        self.log.lock().push(self.name.clone());
    }
}

#[test]
fn arena_releases_newest_first_exactly_once() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let arena = ResourceArena::new();
    for name in ["a", "b", "c"] {
        arena.register(Arc::new(TrackedResource { name: name.into(), log: log.clone() }));
    }
    assert_eq!(arena.len(), 3);
    assert_eq!(arena.release_all(), 3);
    assert_eq!(arena.release_all(), 0);
    drop(arena);
    assert_eq!(*log.lock(), vec!["c", "b", "a"]);
}

#[test]
fn arena_releases_on_drop() {
    let log = Arc::new(Mutex::new(Vec::new()));
    {
        let arena = ResourceArena::new();
        arena.register(Arc::new(TrackedResource { name: "conn".into(), log: log.clone() }));
    }
    assert_eq!(*log.lock(), vec!["conn"]);
}

#[tokio::test]
async fn scope_closes_connections_on_success_and_error() {
    let store = MemoryStore::new();
    let connector = Arc::new(store.clone());

    let ok: Result<usize, docsync::StoreError> = RunContext::scope(AppConfig::default(), connector.clone(), |ctx| async move {
        let repos = Repositories::open(&ctx)?;
        let _ = repos.trustees.list_trustees().await?;
        Ok(ctx.arena().len())
    })
    .await;
    assert_eq!(ok.unwrap(), 1);
    assert_eq!(store.total_connections(), 1);
    assert_eq!(store.open_connections(), 0);

    store.set_faults(FaultPlan { failing_collections: vec!["trustees".into()], ..FaultPlan::default() });
    let err = RunContext::scope(AppConfig::default(), connector, |ctx| async move {
        let repos = Repositories::open(&ctx)?;
        repos.trustees.list_trustees().await
    })
    .await
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unknown);
    assert_eq!(store.total_connections(), 2);
    assert_eq!(store.open_connections(), 0);
}

#[test]
fn dropped_context_releases_its_connection() {
    let store = MemoryStore::new();
    {
        let ctx = RunContext::new(AppConfig::default(), Arc::new(store.clone()));
        ctx.collection("cases").unwrap();
        ctx.collection("trustees").unwrap();
        assert_eq!(store.open_connections(), 1);
    }
    assert_eq!(store.open_connections(), 0);
}

#[test]
fn missing_database_is_server_config() {
    let mut cfg = AppConfig::default();
    cfg.store.database = "  ".into();
    let ctx = RunContext::new(cfg, Arc::new(MemoryStore::new()));
    let err = Repositories::open(&ctx).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::ServerConfig);
    assert_eq!(err.status(), 500);
}

#[test]
fn unreachable_store_is_unknown() {
    let store = MemoryStore::new();
    store.set_faults(FaultPlan { refuse_connections: true, ..FaultPlan::default() });
    let ctx = RunContext::new(AppConfig::default(), Arc::new(store));
    assert_eq!(ctx.collection("cases").err().unwrap().kind(), ErrorKind::Unknown);
    assert!(ctx.arena().is_empty());
}
