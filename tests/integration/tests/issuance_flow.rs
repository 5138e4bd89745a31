//! End-to-end issuance and verification over HTTP, both services sharing one
//! in-memory store.

use axum::http::StatusCode;
use futures::future::join_all;
use serde_json::json;
use std::sync::Arc;

use kubecred_integration_tests::Services;
use kubecred_store::fault::{Fault, FaultStore};
use kubecred_store::{CredentialStore, MemoryStore};

fn services() -> (Arc<MemoryStore>, Services) {
    let store = Arc::new(MemoryStore::new());
    let services = Services::shared(store.clone(), "issuer-1", "verifier-1");
    (store, services)
}

// =========================================================================
// Issue then verify
// =========================================================================

#[tokio::test]
async fn test_issue_then_verify() {
    let (_, svc) = services();

    let (status, issued) = svc
        .issue(json!({"id": "cred-1", "holder": "alice", "metadata": {"type": "test"}}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(issued["message"], "credential issued");
    assert_eq!(issued["workerId"], "issuer-1");

    let (status, verified) = svc.verify("cred-1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verified["verified"], true);
    assert_eq!(verified["workerId"], "verifier-1");
    assert_eq!(verified["issuedAt"], issued["issuedAt"]);
}

#[tokio::test]
async fn test_reissue_is_idempotent() {
    let (store, svc) = services();

    let (_, first) = svc.issue(json!({"id": "cred-1", "holder": "alice"})).await;
    let (status, second) = svc.issue(json!({"id": "cred-1", "holder": "mallory"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        second,
        json!({"message": "credential already issued", "workerId": first["workerId"]})
    );

    // The first submission wins; later payloads are not merged in.
    let stored = store.find_by_id("cred-1").await.unwrap().unwrap();
    assert_eq!(stored.credential.holder.as_deref(), Some("alice"));
}

#[tokio::test]
async fn test_sequential_reissues_create_once() {
    let (store, svc) = services();

    let mut created = 0;
    for _ in 0..10 {
        let (status, _) = svc.issue(json!({"id": "cred-seq"})).await;
        if status == StatusCode::CREATED {
            created += 1;
        } else {
            assert_eq!(status, StatusCode::OK);
        }
    }
    assert_eq!(created, 1);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_verify_unknown_credential() {
    let (_, svc) = services();
    let (status, body) = svc.verify("never-issued").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"verified": false}));
}

#[tokio::test]
async fn test_verify_does_not_create_records() {
    let (store, svc) = services();
    svc.verify("ghost").await;
    svc.verify("ghost").await;
    assert!(store.is_empty());
}

// =========================================================================
// Concurrency
// =========================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_callers_same_id() {
    let (store, svc) = services();
    let svc = Arc::new(svc);

    let calls = (0..24).map(|i| {
        let svc = svc.clone();
        async move { svc.issue(json!({"id": "cred-hot", "holder": format!("h{}", i)})).await }
    });
    let results = join_all(calls).await;

    let created = results
        .iter()
        .filter(|(status, _)| *status == StatusCode::CREATED)
        .count();
    assert_eq!(created, 1);
    for (status, body) in &results {
        if *status != StatusCode::CREATED {
            assert_eq!(*status, StatusCode::OK);
            assert!(body["message"]
                .as_str()
                .unwrap()
                .starts_with("credential already issued"));
        }
    }
    assert_eq!(store.len(), 1);

    let (status, _) = svc.verify("cred-hot").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_distinct_ids() {
    let (store, svc) = services();
    let svc = Arc::new(svc);

    let calls = (0..16).map(|i| {
        let svc = svc.clone();
        async move { svc.issue(json!({"id": format!("cred-{}", i)})).await }
    });
    for (status, _) in join_all(calls).await {
        assert_eq!(status, StatusCode::CREATED);
    }
    assert_eq!(store.len(), 16);
}

// =========================================================================
// Input validation and failures
// =========================================================================

#[tokio::test]
async fn test_invalid_issue_payloads() {
    let (store, svc) = services();
    for body in [json!({}), json!({"id": ""}), json!({"id": null}), json!({"holder": "x"})] {
        let (status, resp) = svc.issue(body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(resp, json!({"error": "credential must contain id"}));
    }
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_verify_empty_id() {
    let (_, svc) = services();
    let (status, resp) = svc.verify("").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp, json!({"error": "credential id required"}));
}

#[tokio::test]
async fn test_store_outage_surfaces_500() {
    let store = Arc::new(FaultStore::with_fault(Fault::FindFails(
        "Database connection failed".into(),
    )));
    let svc = Services::shared(store.clone(), "issuer-1", "verifier-1");

    let (status, body) = svc.issue(json!({"id": "cred-1"})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Database connection failed"}));
    assert_eq!(store.insert_calls(), 0);

    let (status, _) = svc.verify("cred-1").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    store.set_fault(Fault::None);
    let (status, _) = svc.issue(json!({"id": "cred-1"})).await;
    assert_eq!(status, StatusCode::CREATED);
}
