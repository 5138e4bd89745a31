//! `kubecred health`: probe a service's health endpoint.

use clap::Args;

use crate::client::{ApiClient, Service};

#[derive(Args, Debug)]
pub struct HealthArgs {
    /// Service to probe.
    #[arg(short, long, value_enum, default_value_t = Service::Issuance)]
    pub service: Service,
}

pub async fn run(client: &ApiClient, args: &HealthArgs) -> anyhow::Result<()> {
    let resp = client.health(args.service).await?;
    if !resp.status.is_success() {
        return Err(super::unexpected("health check", &resp));
    }
    println!("{}", serde_json::to_string_pretty(&resp.body)?);
    Ok(())
}
