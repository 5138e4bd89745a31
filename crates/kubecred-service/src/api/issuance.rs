//! Issuance service: `POST /issue`, `GET /health`.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use kubecred_core::Credential;
use kubecred_credentials::{CredentialIssuer, IssueOutcome};

use super::HealthResponse;
use crate::error::ApiError;

pub const MISSING_ID: &str = "credential must contain id";
pub const MSG_ISSUED: &str = "credential issued";
pub const MSG_ALREADY_ISSUED: &str = "credential already issued";
pub const MSG_ALREADY_ISSUED_RACE: &str = "credential already issued (race)";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueResponse {
    pub message: String,
    pub worker_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<String>,
}

impl IssueResponse {
    fn from_outcome(outcome: &IssueOutcome) -> (StatusCode, Self) {
        match outcome {
            IssueOutcome::Issued(record) => (
                StatusCode::CREATED,
                Self {
                    message: MSG_ISSUED.into(),
                    worker_id: record.worker_id.clone(),
                    issued_at: Some(record.issued_at_string()),
                },
            ),
            IssueOutcome::AlreadyIssued(record) => (
                StatusCode::OK,
                Self {
                    message: MSG_ALREADY_ISSUED.into(),
                    worker_id: record.worker_id.clone(),
                    issued_at: None,
                },
            ),
            IssueOutcome::RaceLost { .. } => (
                StatusCode::OK,
                Self {
                    message: MSG_ALREADY_ISSUED_RACE.into(),
                    worker_id: outcome.worker_id().into(),
                    issued_at: None,
                },
            ),
        }
    }
}

async fn handle_issue(
    State(issuer): State<Arc<CredentialIssuer>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<IssueResponse>), ApiError> {
    let Json(body) = body?;
    let credential =
        Credential::from_json(body).map_err(|_| ApiError::BadRequest(MISSING_ID.into()))?;

    let outcome = issuer
        .issue(credential)
        .await
        .map_err(|e| ApiError::from_credential(e, MISSING_ID))?;

    let (status, response) = IssueResponse::from_outcome(&outcome);
    Ok((status, Json(response)))
}

async fn handle_health(State(issuer): State<Arc<CredentialIssuer>>) -> Json<HealthResponse> {
    super::health(issuer.workers())
}

pub fn build_router(issuer: Arc<CredentialIssuer>) -> Router {
    Router::new()
        .route("/issue", post(handle_issue))
        .route("/health", get(handle_health))
        .with_state(issuer)
}
