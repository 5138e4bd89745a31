//! Kubecred verification service entry point.

use kubecred_service::{cli, ServiceKind};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::run(ServiceKind::Verification).await
}
