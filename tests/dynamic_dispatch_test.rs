use payflow::domain::ports::{
    SharedExecutor, SharedInstanceIdProvider, SnapshotStoreBox,
};
use payflow::domain::request::{ApiRequest, Endpoint};
use payflow::infrastructure::in_memory::InMemorySnapshotStore;
use payflow::infrastructure::scripted::ScriptedExecutor;
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn test_ports_as_trait_objects() {
    let scripted = ScriptedExecutor::authorized().with_instance_id("inst-7");
    scripted.respond(json!({ "ok": true }));
    let executor: SharedExecutor = Arc::new(scripted.clone());
    let instance_ids: SharedInstanceIdProvider = Arc::new(scripted.clone());
    let store: SnapshotStoreBox = Box::new(InMemorySnapshotStore::new());

    // Verify Send + Sync by spawning tasks
    let exec_handle = tokio::spawn(async move {
        executor
            .execute(ApiRequest::new(Endpoint::RequestPayment))
            .await
            .unwrap()
    });

    let id_handle = tokio::spawn(async move { instance_ids.instance_id("client").await.unwrap() });

    let store_handle = tokio::spawn(async move {
        store.save("k", json!("v")).await.unwrap();
        store.load("k").await.unwrap().unwrap()
    });

    assert_eq!(exec_handle.await.unwrap()["ok"], true);
    assert_eq!(id_handle.await.unwrap(), "inst-7");
    assert_eq!(store_handle.await.unwrap(), json!("v"));
    assert_eq!(scripted.call_count(), 1);
}
