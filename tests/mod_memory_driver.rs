use bson::doc;
use docsync::driver::{CollectionDriver, DocumentClient, FaultPlan, MemoryStore, StoreConnector};
use docsync::errors::DriverError;
use docsync::query::Pagination;
use std::sync::Arc;

fn collection(store: &MemoryStore, name: &str) -> Arc<dyn CollectionDriver> {
    store.connect().unwrap().collection("db", name).unwrap()
}

#[tokio::test]
async fn find_filters_sorts_and_pages() {
    let store = MemoryStore::new();
    let col = collection(&store, "people");
    for (name, age) in [("carol", 35), ("alice", 30), ("bob", 40), ("dave", 25)] {
        col.insert_one(doc! { "name": name, "age": age }).await.unwrap();
    }
    let found = col
        .find(doc! { "age": { "$gte": 30 } }, Some(doc! { "age": -1 }), Some(Pagination { limit: 2, skip: 1 }))
        .await
        .unwrap();
    let names: Vec<_> = found.iter().map(|d| d.get_str("name").unwrap()).collect();
    assert_eq!(names, vec!["carol", "alice"]);
    assert_eq!(col.count_documents(doc! {}).await.unwrap(), 4);
}

#[tokio::test]
async fn nor_and_in_operators() {
    let store = MemoryStore::new();
    let col = collection(&store, "codes");
    for code in ["081", "091", "071"] {
        col.insert_one(doc! { "code": code }).await.unwrap();
    }
    let n = col
        .count_documents(doc! { "$nor": [{ "code": { "$in": ["081", "091"] } }] })
        .await
        .unwrap();
    assert_eq!(n, 1);
}

#[tokio::test]
async fn unknown_operator_is_a_command_error() {
    let store = MemoryStore::new();
    let col = collection(&store, "x");
    let err = col.find(doc! { "a": { "$where": "1" } }, None, None).await.unwrap_err();
    assert!(matches!(err, DriverError::Command(_)));
}

#[tokio::test]
async fn replace_keeps_native_id_and_upserts() {
    let store = MemoryStore::new();
    let col = collection(&store, "x");
    col.insert_one(doc! { "k": 1, "v": "a" }).await.unwrap();
    let before = store.documents("db", "x")[0].get_object_id("_id").unwrap();

    let r = col.replace_one(doc! { "k": 1 }, doc! { "k": 1, "v": "b" }, false).await.unwrap();
    assert_eq!((r.matched_count, r.modified_count), (1, 1));
    assert_eq!(store.documents("db", "x")[0].get_object_id("_id").unwrap(), before);

    let same = col.replace_one(doc! { "k": 1 }, doc! { "k": 1, "v": "b" }, false).await.unwrap();
    assert_eq!(same.modified_count, 0);

    let miss = col.replace_one(doc! { "k": 2 }, doc! { "k": 2 }, false).await.unwrap();
    assert_eq!(miss.matched_count, 0);
    assert!(miss.upserted_id.is_none());

    let up = col.replace_one(doc! { "k": 2 }, doc! { "k": 2 }, true).await.unwrap();
    assert!(up.upserted_id.is_some());
    assert_eq!(store.documents("db", "x").len(), 2);
}

#[tokio::test]
async fn faults_are_injected() {
    let store = MemoryStore::new();
    let col = collection(&store, "x");
    store.set_faults(FaultPlan { unacknowledged_writes: true, ..FaultPlan::default() });
    let r = col.insert_one(doc! { "a": 1 }).await.unwrap();
    assert!(!r.acknowledged);
    assert_eq!(store.documents("db", "x").len(), 1);

    store.set_faults(FaultPlan { insert_many_limit: Some(1), ..FaultPlan::default() });
    let r = col.insert_many(vec![doc! { "a": 2 }, doc! { "a": 3 }]).await.unwrap();
    assert_eq!(r.inserted_count, 1);

    store.set_faults(FaultPlan { failing_collections: vec!["x".into()], ..FaultPlan::default() });
    assert!(col.count_documents(doc! {}).await.is_err());

    store.set_faults(FaultPlan { refuse_connections: true, ..FaultPlan::default() });
    assert!(matches!(store.connect(), Err(DriverError::Connection(_))));
    store.clear_faults();
    assert_eq!(col.count_documents(doc! {}).await.unwrap(), 2);
}

#[tokio::test]
async fn closed_client_rejects_operations() {
    let store = MemoryStore::new();
    let client = store.connect().unwrap();
    let col = client.collection("db", "x").unwrap();
    assert_eq!(store.open_connections(), 1);
    client.close();
    client.close();
    assert_eq!(store.open_connections(), 0);
    assert!(matches!(col.find_one(doc! {}).await, Err(DriverError::Closed)));
    assert!(matches!(client.collection("db", "y"), Err(DriverError::Closed)));
}
