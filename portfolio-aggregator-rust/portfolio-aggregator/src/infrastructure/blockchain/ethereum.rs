use anyhow::{anyhow, Result};
use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use super::json_rpc;
use crate::domain::amount::{parse_hex_quantity, wei_to_native};

/// `eth_getBalance` at `latest`, converted from wei.
pub async fn fetch_native_balance(client: &Client, rpc_endpoint: &str, address: &str) -> Option<f64> {
    match query_native_balance(client, rpc_endpoint, address).await {
        Ok(balance) => {
            debug!(rpc = rpc_endpoint, address, balance, "EVM native balance fetched");
            Some(balance)
        }
        Err(e) => {
            warn!(rpc = rpc_endpoint, address, error = %e, "EVM native balance unavailable");
            None
        }
    }
}

async fn query_native_balance(client: &Client, rpc_endpoint: &str, address: &str) -> Result<f64> {
    let result = json_rpc(client, rpc_endpoint, "eth_getBalance", json!([address, "latest"])).await?;

    let quantity = result
        .as_str()
        .ok_or_else(|| anyhow!("eth_getBalance result is not a hex string: {}", result))?;
    let wei = parse_hex_quantity(quantity)
        .ok_or_else(|| anyhow!("eth_getBalance returned malformed quantity '{}'", quantity))?;

    wei_to_native(wei).ok_or_else(|| anyhow!("failed to scale {} wei", wei))
}
