//! HTTP client for the issuance and verification services.
//!
//! Requests time out after `timeout_ms`. Transport failures, 5xx and 429
//! answers are retried with exponential backoff; any other answer is final.

use clap::{Args, ValueEnum};
use reqwest::{RequestBuilder, StatusCode};
use serde_json::Value;
use std::time::Duration;

const DEFAULT_ISSUANCE_URL: &str = "http://localhost:4001";
const DEFAULT_VERIFY_URL: &str = "http://localhost:4002";

#[derive(Args, Debug, Clone)]
pub struct ClientOptions {
    /// Base URL of the issuance service.
    #[arg(long, env = "KUBECRED_ISSUANCE_URL", default_value = DEFAULT_ISSUANCE_URL, global = true)]
    pub issuance_url: String,

    /// Base URL of the verification service.
    #[arg(long, env = "KUBECRED_VERIFY_URL", default_value = DEFAULT_VERIFY_URL, global = true)]
    pub verify_url: String,

    /// Per-request timeout in milliseconds.
    #[arg(long, env = "KUBECRED_TIMEOUT_MS", default_value_t = 15000,
          value_parser = clap::value_parser!(u64).range(1..), global = true)]
    pub timeout_ms: u64,

    /// Total attempts per request.
    #[arg(long, env = "KUBECRED_RETRY_ATTEMPTS", default_value_t = 3,
          value_parser = clap::value_parser!(u32).range(1..), global = true)]
    pub retries: u32,

    /// Backoff base delay in milliseconds.
    #[arg(long, env = "KUBECRED_RETRY_DELAY_MS", default_value_t = 500,
          value_parser = clap::value_parser!(u64).range(1..), global = true)]
    pub retry_delay_ms: u64,
}

/// Which service a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Service {
    Issuance,
    Verification,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Status codes worth another attempt.
pub fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

/// Trim a base URL, dropping one trailing `/`. Blank values use `fallback`.
pub fn normalize_base(raw: &str, fallback: &str) -> String {
    let trimmed = raw.trim();
    let base = if trimmed.is_empty() { fallback } else { trimmed };
    base.strip_suffix('/').unwrap_or(base).to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("could not reach {url} after {attempts} attempt(s): {source}")]
    Unreachable {
        url: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// A final answer from a service.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    /// JSON body, or the raw text as a string when it is not JSON.
    pub body: Value,
}

impl ApiResponse {
    /// The `error` field of an error body, if present.
    pub fn error_message(&self) -> Option<&str> {
        self.body.get("error").and_then(Value::as_str)
    }
}

pub struct ApiClient {
    http: reqwest::Client,
    issuance_base: String,
    verify_base: String,
    retry: RetryPolicy,
}

impl ApiClient {
    pub fn new(options: &ClientOptions) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(options.timeout_ms))
            .build()?;
        Ok(Self {
            http,
            issuance_base: normalize_base(&options.issuance_url, DEFAULT_ISSUANCE_URL),
            verify_base: normalize_base(&options.verify_url, DEFAULT_VERIFY_URL),
            retry: RetryPolicy {
                attempts: options.retries.max(1),
                base_delay: Duration::from_millis(options.retry_delay_ms),
            },
        })
    }

    fn base(&self, service: Service) -> &str {
        match service {
            Service::Issuance => &self.issuance_base,
            Service::Verification => &self.verify_base,
        }
    }

    /// `POST /issue`.
    pub async fn issue(&self, payload: &Value) -> Result<ApiResponse, ClientError> {
        let url = format!("{}/issue", self.issuance_base);
        self.send_with_retry(&url, || self.http.post(&url).json(payload))
            .await
    }

    /// `POST /verify`.
    pub async fn verify(&self, id: &str) -> Result<ApiResponse, ClientError> {
        let url = format!("{}/verify", self.verify_base);
        let payload = serde_json::json!({ "id": id });
        self.send_with_retry(&url, || self.http.post(&url).json(&payload))
            .await
    }

    /// `GET /health`.
    pub async fn health(&self, service: Service) -> Result<ApiResponse, ClientError> {
        let url = format!("{}/health", self.base(service));
        self.send_with_retry(&url, || self.http.get(&url)).await
    }

    async fn send_with_retry<F>(&self, url: &str, build: F) -> Result<ApiResponse, ClientError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match build().send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if is_retryable(status) && attempt < self.retry.attempts {
                        tracing::warn!(url, %status, attempt, "retrying request");
                        tokio::time::sleep(self.retry.delay_for(attempt)).await;
                        continue;
                    }
                    let text = resp.text().await.unwrap_or_default();
                    let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
                    return Ok(ApiResponse { status, body });
                }
                Err(e) => {
                    if attempt < self.retry.attempts {
                        tracing::warn!(url, error = %e, attempt, "retrying request");
                        tokio::time::sleep(self.retry.delay_for(attempt)).await;
                        continue;
                    }
                    return Err(ClientError::Unreachable {
                        url: url.to_string(),
                        attempts: attempt,
                        source: e,
                    });
                }
            }
        }
    }
}
