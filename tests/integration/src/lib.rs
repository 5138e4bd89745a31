//! Harness for driving both services in-process over one shared store.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;

use kubecred_service::config::StoreBackend;
use kubecred_service::{build_app, ServiceConfig, ServiceKind};
use kubecred_store::CredentialStore;

/// In-memory configuration with an optional fixed worker id.
pub fn memory_config(worker: Option<&str>) -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.store.backend = StoreBackend::Memory;
    config.worker.id = worker.map(String::from);
    config
}

/// A fresh RocksDB data directory under the system temp dir.
pub fn temp_data_dir() -> PathBuf {
    std::env::temp_dir().join(format!("kubecred-it-{}", rand::random::<u64>()))
}

/// An issuance and a verification router.
pub struct Services {
    pub issuance: Router,
    pub verification: Router,
}

impl Services {
    /// Both services over the same store.
    pub fn shared(store: Arc<dyn CredentialStore>, issuer_worker: &str, verifier_worker: &str) -> Self {
        Self::split(store.clone(), store, issuer_worker, verifier_worker)
    }

    /// Each service over its own store handle.
    pub fn split(
        issuance_store: Arc<dyn CredentialStore>,
        verification_store: Arc<dyn CredentialStore>,
        issuer_worker: &str,
        verifier_worker: &str,
    ) -> Self {
        let issuance = build_app(
            ServiceKind::Issuance,
            &memory_config(Some(issuer_worker)),
            issuance_store,
        )
        .expect("issuance app");
        let verification = build_app(
            ServiceKind::Verification,
            &memory_config(Some(verifier_worker)),
            verification_store,
        )
        .expect("verification app");
        Self {
            issuance,
            verification,
        }
    }

    pub async fn issue(&self, body: Value) -> (StatusCode, Value) {
        post_json(&self.issuance, "/issue", body).await
    }

    pub async fn verify(&self, id: &str) -> (StatusCode, Value) {
        post_json(&self.verification, "/verify", serde_json::json!({ "id": id })).await
    }
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request");
    send(app, request).await
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}
