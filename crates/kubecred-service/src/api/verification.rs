//! Verification service: `POST /verify`, `GET /health`.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use kubecred_credentials::CredentialVerifier;

use super::HealthResponse;
use crate::error::ApiError;

pub const MISSING_ID: &str = "credential id required";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub verified: bool,
    /// Worker that answered this verification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<String>,
}

async fn handle_verify(
    State(verifier): State<Arc<CredentialVerifier>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<VerifyResponse>), ApiError> {
    let Json(body) = body?;
    let id = body
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::BadRequest(MISSING_ID.into()))?;

    let result = verifier
        .verify(id)
        .await
        .map_err(|e| ApiError::from_credential(e, MISSING_ID))?;

    match result.record {
        Some(record) => Ok((
            StatusCode::OK,
            Json(VerifyResponse {
                verified: true,
                worker_id: Some(verifier.workers().resolve()),
                issued_at: Some(record.issued_at_string()),
            }),
        )),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(VerifyResponse {
                verified: false,
                worker_id: None,
                issued_at: None,
            }),
        )),
    }
}

async fn handle_health(State(verifier): State<Arc<CredentialVerifier>>) -> Json<HealthResponse> {
    super::health(verifier.workers())
}

pub fn build_router(verifier: Arc<CredentialVerifier>) -> Router {
    Router::new()
        .route("/verify", post(handle_verify))
        .route("/health", get(handle_health))
        .with_state(verifier)
}
