//! `kubecred issue`: submit a credential to the issuance service.

use clap::Args;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::client::ApiClient;

pub const DEFAULT_HOLDER: &str = "Unknown Holder";

#[derive(Args, Debug)]
pub struct IssueArgs {
    /// Credential id. Generated when omitted.
    #[arg(short, long)]
    pub id: Option<String>,

    /// Holder name.
    #[arg(long, default_value = DEFAULT_HOLDER)]
    pub holder: String,

    /// Metadata as a JSON object.
    #[arg(short, long)]
    pub metadata: Option<String>,
}

#[derive(Debug, Serialize)]
struct IssueRequest {
    id: String,
    holder: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<Map<String, Value>>,
}

fn generate_id() -> String {
    format!("cred-{}", uuid::Uuid::now_v7())
}

fn parse_metadata(raw: Option<&str>) -> anyhow::Result<Option<Map<String, Value>>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    match serde_json::from_str(raw) {
        Ok(Value::Object(map)) => Ok(Some(map)),
        Ok(_) => anyhow::bail!("metadata must be a JSON object"),
        Err(e) => anyhow::bail!("invalid metadata JSON: {}", e),
    }
}

fn build_request(args: &IssueArgs) -> anyhow::Result<IssueRequest> {
    let id = match args.id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => generate_id(),
    };
    let holder = match args.holder.trim() {
        "" => DEFAULT_HOLDER.to_string(),
        holder => holder.to_string(),
    };
    Ok(IssueRequest {
        id,
        holder,
        metadata: parse_metadata(args.metadata.as_deref())?,
    })
}

pub async fn run(client: &ApiClient, args: &IssueArgs) -> anyhow::Result<()> {
    let request = build_request(args)?;
    let payload = serde_json::to_value(&request)?;
    let resp = client.issue(&payload).await?;

    match resp.status {
        StatusCode::CREATED => println!("Credential issued: {}", request.id),
        StatusCode::OK => println!("Credential already issued: {}", request.id),
        _ => return Err(super::unexpected("issuance", &resp)),
    }
    println!();
    println!("{}", serde_json::to_string_pretty(&resp.body)?);
    Ok(())
}
