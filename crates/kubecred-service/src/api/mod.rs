//! HTTP routers for the issuance and verification services.

pub mod issuance;
pub mod verification;

use axum::Json;
use serde::Serialize;

use kubecred_core::WorkerIdentity;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    /// Configured worker identity, or null.
    pub worker: Option<String>,
}

fn health(workers: &WorkerIdentity) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        worker: workers.configured().map(String::from),
    })
}
