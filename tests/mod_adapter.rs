use docsync::driver::{DocumentClient, FaultPlan, MemoryStore, StoreConnector};
use docsync::errors::ErrorKind;
use docsync::query::{Direction, Pagination, and, equals, field, order_by};
use docsync::DocumentCollectionAdapter;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Widget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    size: i32,
}

fn widget(name: &str, size: i32) -> Widget {
    Widget { id: None, name: name.into(), size }
}

fn setup() -> (MemoryStore, DocumentCollectionAdapter<Widget>) {
    let store = MemoryStore::new();
    let col = store.connect().unwrap().collection("db", "widgets").unwrap();
    (store, DocumentCollectionAdapter::new("WIDGETS", col))
}

#[tokio::test]
async fn insert_one_never_trusts_client_ids() {
    let (store, adapter) = setup();
    let mut w = widget("X", 1);
    w.id = Some("client-supplied".into());
    let id = adapter.insert_one(&w).await.unwrap();
    assert_ne!(id, "client-supplied");
    let stored = store.documents("db", "widgets");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].get_str("id").unwrap(), id);

    let read = adapter.find_one(&equals("id", id.as_str())).await.unwrap();
    assert_eq!(read.id.as_deref(), Some(id.as_str()));
    assert!(adapter.find_one(&equals("id", "client-supplied")).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn find_returns_empty_not_error() {
    let (_store, adapter) = setup();
    assert!(adapter.find(Some(&equals("name", "none")), None).await.unwrap().is_empty());
    let err = adapter.find_one(&equals("name", "none")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.module(), "WIDGETS");
}

#[tokio::test]
async fn find_sorts_and_pages() {
    let (_store, adapter) = setup();
    adapter.insert_many(&[widget("b", 2), widget("c", 3), widget("a", 1)]).await.unwrap();
    let sort = order_by(vec![("size".to_string(), Direction::Descending)]);
    let all = adapter.get_all(Some(&sort)).await.unwrap();
    let names: Vec<_> = all.iter().map(|w| w.name.as_str()).collect();
    assert_eq!(names, vec!["c", "b", "a"]);
    let page = adapter
        .find_page(Some(&field("size").greater_than(1)), Some(&sort), Some(Pagination { limit: 1, skip: 1 }))
        .await
        .unwrap();
    assert_eq!(page[0].name, "b");
    assert_eq!(adapter.count_documents(&field("size").less_or_equal(2)).await.unwrap(), 2);
    assert_eq!(adapter.count_all_documents().await.unwrap(), 3);
}

#[tokio::test]
async fn unacknowledged_insert_is_unknown() {
    let (store, adapter) = setup();
    store.set_faults(FaultPlan { unacknowledged_writes: true, ..FaultPlan::default() });
    let err = adapter.insert_one(&widget("X", 1)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unknown);
    // Data landed, but the write still counts as failed.
    assert_eq!(store.documents("db", "widgets").len(), 1);
}

#[tokio::test]
async fn partial_insert_many_is_internal_with_ids() {
    let (store, adapter) = setup();
    store.set_faults(FaultPlan { insert_many_limit: Some(1), ..FaultPlan::default() });
    let err = adapter.insert_many(&[widget("a", 1), widget("b", 2)]).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    match err {
        docsync::StoreError::Internal { data, .. } => assert_eq!(data.len(), 2),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn replace_one_semantics() {
    let (store, adapter) = setup();
    let id = adapter.insert_one(&widget("a", 1)).await.unwrap();
    let q = equals("id", id.as_str());

    let mut next = adapter.find_one(&q).await.unwrap();
    next.size = 10;
    assert_eq!(adapter.replace_one(&q, &next, false).await.unwrap(), Some(id.clone()));
    assert_eq!(adapter.find_one(&q).await.unwrap().size, 10);

    assert_eq!(adapter.replace_one(&equals("id", "nope"), &widget("z", 0), false).await.unwrap(), None);

    let upserted = adapter.replace_one(&equals("name", "z"), &widget("z", 0), true).await.unwrap();
    let upserted = upserted.unwrap();
    assert_eq!(adapter.find_one(&equals("name", "z")).await.unwrap().id, Some(upserted));

    store.set_faults(FaultPlan { unacknowledged_writes: true, ..FaultPlan::default() });
    let err = adapter.replace_one(&q, &next, false).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = adapter.replace_one(&q, &next, true).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unknown);
}

#[tokio::test]
async fn delete_counts_are_checked() {
    let (_store, adapter) = setup();
    adapter.insert_many(&[widget("a", 1), widget("a", 2), widget("b", 3)]).await.unwrap();
    assert_eq!(adapter.delete_one(&equals("name", "b")).await.unwrap(), 1);
    assert!(adapter.delete_one(&equals("name", "b")).await.unwrap_err().is_not_found());
    assert_eq!(adapter.delete_many(&equals("name", "a")).await.unwrap(), 2);
    assert!(adapter.delete_many(&equals("name", "a")).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn driver_faults_become_unknown_with_cause() {
    let (store, adapter) = setup();
    store.set_faults(FaultPlan { failing_collections: vec!["widgets".into()], ..FaultPlan::default() });
    let err = adapter.find(Some(&and(vec![equals("a", 1)])), None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unknown);
    assert!(std::error::Error::source(&err).is_some());
}

#[tokio::test]
async fn find_one_refuses_to_pick_among_several() {
    let (_store, adapter) = setup();
    adapter.insert_many(&[widget("x", 1), widget("x", 2), widget("y", 3)]).await.unwrap();

    let err = adapter.find_one(&equals("name", "x")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(err.message().contains("more than one"));

    assert_eq!(adapter.find_one(&equals("name", "y")).await.unwrap().size, 3);
    let none = adapter.find_one(&equals("name", "z")).await.unwrap_err();
    assert!(none.message().contains("No matching"));
}
