//! Public-RPC adapters for native balances and Solana signature history.
//!
//! Every adapter returns `None` for "unavailable": transport errors, non-2xx
//! statuses, JSON-RPC errors and malformed results are logged here and never
//! reach the caller as errors.

pub mod ethereum;
pub mod solana;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::domain::network::{NetworkDescriptor, NetworkKind};

/// Default page size for Solana signature history.
pub const SOLANA_SIGNATURE_LIMIT: usize = 20;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Native balance in whole coins.
    async fn native_balance(&self, network: &NetworkDescriptor, address: &str) -> Option<f64>;

    /// Raw `getSignaturesForAddress` entries. EVM networks always yield `None`.
    async fn recent_signatures(
        &self,
        network: &NetworkDescriptor,
        address: &str,
        limit: usize,
    ) -> Option<Vec<Value>>;
}

/// Dispatches to the EVM or Solana adapter by network kind.
#[derive(Debug, Clone)]
pub struct PublicRpc {
    client: Client,
}

impl PublicRpc {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChainRpc for PublicRpc {
    async fn native_balance(&self, network: &NetworkDescriptor, address: &str) -> Option<f64> {
        match network.kind {
            NetworkKind::Evm => {
                ethereum::fetch_native_balance(&self.client, &network.rpc_endpoint, address).await
            }
            NetworkKind::Solana => {
                solana::fetch_solana_balance(&self.client, &network.rpc_endpoint, address).await
            }
        }
    }

    async fn recent_signatures(
        &self,
        network: &NetworkDescriptor,
        address: &str,
        limit: usize,
    ) -> Option<Vec<Value>> {
        match network.kind {
            NetworkKind::Solana => {
                solana::fetch_solana_signatures(&self.client, &network.rpc_endpoint, address, limit).await
            }
            NetworkKind::Evm => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// One JSON-RPC 2.0 call. A `null` or missing result is an error.
pub(crate) async fn json_rpc(client: &Client, endpoint: &str, method: &str, params: Value) -> Result<Value> {
    let payload = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": method,
        "params": params,
    });

    let response = client
        .post(endpoint)
        .json(&payload)
        .send()
        .await?
        .error_for_status()?;

    let body: JsonRpcResponse = response.json().await?;
    if let Some(err) = body.error {
        bail!("{} failed with code {}: {}", method, err.code, err.message);
    }

    body.result
        .filter(|result| !result.is_null())
        .ok_or_else(|| anyhow!("{} returned no result", method))
}
