pub mod health;
pub mod issue;
pub mod verify;

use crate::client::ApiResponse;

/// Turn an unexpected answer into an error carrying the service's message.
pub(crate) fn unexpected(action: &str, resp: &ApiResponse) -> anyhow::Error {
    match resp.error_message() {
        Some(msg) => anyhow::anyhow!("{} failed (HTTP {}): {}", action, resp.status, msg),
        None => anyhow::anyhow!("{} failed (HTTP {})", action, resp.status),
    }
}
