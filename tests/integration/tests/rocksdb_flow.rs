//! Issuance on the primary RocksDB instance, verification through a
//! secondary instance, as the two services run in production.

use axum::http::StatusCode;
use futures::future::join_all;
use serde_json::json;
use std::sync::Arc;

use kubecred_integration_tests::{memory_config, temp_data_dir, Services};
use kubecred_service::config::StoreBackend;
use kubecred_service::{open_store, ServiceKind};
use kubecred_store::MemoryStore;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_rocksdb_issue_and_verify() {
    let mut config = memory_config(None);
    config.store.backend = StoreBackend::Rocksdb;
    config.store.data_dir = temp_data_dir();

    let primary = open_store(&config, ServiceKind::Issuance).unwrap();
    let secondary = open_store(&config, ServiceKind::Verification).unwrap();
    let svc = Arc::new(Services::split(
        primary.clone(),
        secondary.clone(),
        "issuer-1",
        "verifier-1",
    ));

    let calls = (0..8).map(|_| {
        let svc = svc.clone();
        async move { svc.issue(json!({"id": "cred-disk", "holder": "alice"})).await }
    });
    let created = join_all(calls)
        .await
        .into_iter()
        .filter(|(status, _)| *status == StatusCode::CREATED)
        .count();
    assert_eq!(created, 1);

    let (status, body) = svc.verify("cred-disk").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["workerId"], "verifier-1");

    let (status, _) = svc.verify("cred-missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    secondary.close().await.unwrap();
    primary.close().await.unwrap();
    std::fs::remove_dir_all(&config.store.data_dir).ok();
}

#[tokio::test]
async fn test_rocksdb_records_survive_restart() {
    let mut config = memory_config(None);
    config.store.backend = StoreBackend::Rocksdb;
    config.store.data_dir = temp_data_dir();

    let store = open_store(&config, ServiceKind::Issuance).unwrap();
    let svc = Services::shared(store.clone(), "issuer-1", "verifier-1");
    let (status, first) = svc.issue(json!({"id": "cred-persist"})).await;
    assert_eq!(status, StatusCode::CREATED);
    store.close().await.unwrap();
    drop(svc);

    let store = open_store(&config, ServiceKind::Issuance).unwrap();
    let svc = Services::shared(store.clone(), "issuer-2", "verifier-1");
    let (status, second) = svc.issue(json!({"id": "cred-persist"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["workerId"], first["workerId"]);

    store.close().await.unwrap();
    std::fs::remove_dir_all(&config.store.data_dir).ok();
}

#[tokio::test]
async fn test_verification_starts_before_issuance() {
    let mut config = memory_config(None);
    config.store.backend = StoreBackend::Rocksdb;
    config.store.data_dir = temp_data_dir();

    let secondary = open_store(&config, ServiceKind::Verification).unwrap();
    let svc = Services::split(
        Arc::new(MemoryStore::new()),
        secondary.clone(),
        "issuer-1",
        "verifier-1",
    );
    let (status, body) = svc.verify("cred-unknown").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"verified": false}));

    // The issuance service can still take the primary afterwards.
    let primary = open_store(&config, ServiceKind::Issuance).unwrap();
    let svc = Services::split(primary.clone(), secondary.clone(), "issuer-1", "verifier-1");
    let (status, _) = svc.issue(json!({"id": "cred-late"})).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = svc.verify("cred-late").await;
    assert_eq!(status, StatusCode::OK);

    secondary.close().await.unwrap();
    primary.close().await.unwrap();
    std::fs::remove_dir_all(&config.store.data_dir).ok();
}
