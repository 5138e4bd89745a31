//! `kubecred verify`: check a credential id against the verification service.

use clap::Args;
use reqwest::StatusCode;

use crate::client::ApiClient;

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Credential id to look up.
    #[arg(short, long)]
    pub id: String,
}

pub async fn run(client: &ApiClient, args: &VerifyArgs) -> anyhow::Result<()> {
    let id = args.id.trim();
    if id.is_empty() {
        anyhow::bail!("credential id must not be empty");
    }

    let resp = client.verify(id).await?;
    match resp.status {
        StatusCode::OK => println!("Credential {} is VERIFIED", id),
        StatusCode::NOT_FOUND => println!("Credential {} is NOT VERIFIED", id),
        _ => return Err(super::unexpected("verification", &resp)),
    }
    println!();
    println!("{}", serde_json::to_string_pretty(&resp.body)?);
    Ok(())
}
