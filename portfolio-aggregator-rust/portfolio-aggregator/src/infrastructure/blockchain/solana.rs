use anyhow::{anyhow, Result};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::json_rpc;
use crate::domain::amount::lamports_to_sol;

/// `getBalance`, converted from lamports.
pub async fn fetch_solana_balance(client: &Client, rpc_endpoint: &str, address: &str) -> Option<f64> {
    match query_balance(client, rpc_endpoint, address).await {
        Ok(balance) => {
            debug!(rpc = rpc_endpoint, address, balance, "SOL balance fetched");
            Some(balance)
        }
        Err(e) => {
            warn!(rpc = rpc_endpoint, address, error = %e, "SOL balance unavailable");
            None
        }
    }
}

/// `getSignaturesForAddress`, newest first, entries returned untouched.
pub async fn fetch_solana_signatures(
    client: &Client,
    rpc_endpoint: &str,
    address: &str,
    limit: usize,
) -> Option<Vec<Value>> {
    match query_signatures(client, rpc_endpoint, address, limit).await {
        Ok(signatures) => {
            debug!(rpc = rpc_endpoint, address, count = signatures.len(), "Solana signatures fetched");
            Some(signatures)
        }
        Err(e) => {
            warn!(rpc = rpc_endpoint, address, error = %e, "Solana signatures unavailable");
            None
        }
    }
}

async fn query_balance(client: &Client, rpc_endpoint: &str, address: &str) -> Result<f64> {
    let result = json_rpc(client, rpc_endpoint, "getBalance", json!([address])).await?;

    let lamports = result["value"]
        .as_u64()
        .ok_or_else(|| anyhow!("getBalance result has no lamport value: {}", result))?;

    lamports_to_sol(lamports).ok_or_else(|| anyhow!("failed to scale {} lamports", lamports))
}

async fn query_signatures(client: &Client, rpc_endpoint: &str, address: &str, limit: usize) -> Result<Vec<Value>> {
    let result = json_rpc(
        client,
        rpc_endpoint,
        "getSignaturesForAddress",
        json!([address, { "limit": limit }]),
    )
    .await?;

    match result {
        Value::Array(entries) => Ok(entries),
        other => Err(anyhow!("getSignaturesForAddress result is not an array: {}", other)),
    }
}
