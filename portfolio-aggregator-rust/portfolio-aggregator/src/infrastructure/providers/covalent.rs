use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{
    build_portfolio, decode_items, lenient_decimals, lenient_f64, native_value_from_wei, normalize_timestamp, RawHolding,
    TokenDataProvider,
};
use crate::domain::network::NetworkDescriptor;
use crate::domain::portfolio::{TokenPortfolio, TransactionRecord};

/// Covalent (GoldRush) unified API, addressed by chain slug.
/// Serves token balances on every network, transactions on EVM networks.
#[derive(Debug, Clone)]
pub struct CovalentProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    data: Option<Page>,
    #[serde(default)]
    error: bool,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    items: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct BalanceItem {
    contract_name: Option<String>,
    contract_ticker_symbol: Option<String>,
    #[serde(default, deserialize_with = "lenient_decimals")]
    contract_decimals: u32,
    balance: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    quote: Option<f64>,
    #[serde(default)]
    native_token: bool,
}

#[derive(Debug, Deserialize)]
struct TransactionItem {
    tx_hash: String,
    from_address: Option<String>,
    to_address: Option<String>,
    value: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    value_quote: Option<f64>,
    block_signed_at: Option<String>,
    #[serde(default)]
    successful: bool,
}

impl CovalentProvider {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    async fn get_items<T: DeserializeOwned>(&self, api_key: &str, url: &str) -> Result<Vec<T>> {
        let envelope: Envelope = self
            .client
            .get(url)
            .bearer_auth(api_key)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if envelope.error {
            return Err(anyhow!(
                "covalent reported error: {}",
                envelope.error_message.unwrap_or_default()
            ));
        }

        envelope
            .data
            .map(|page| decode_items(self.name(), page.items))
            .ok_or_else(|| anyhow!("covalent response has no data"))
    }

    async fn query_balances(&self, api_key: &str, slug: &str, address: &str) -> Result<TokenPortfolio> {
        let url = format!("{}/v1/{}/address/{}/balances_v2/", self.base_url, slug, address);
        let items: Vec<BalanceItem> = self.get_items(api_key, &url).await?;

        Ok(build_portfolio(items.into_iter().filter_map(|item| {
            Some(RawHolding {
                name: item.contract_name.unwrap_or_default(),
                symbol: item.contract_ticker_symbol.unwrap_or_default(),
                raw_balance: item.balance?,
                decimals: item.contract_decimals,
                usd_value: item.quote,
                is_native: item.native_token,
            })
        })))
    }

    async fn query_transactions(&self, api_key: &str, slug: &str, address: &str) -> Result<Vec<TransactionRecord>> {
        let url = format!("{}/v1/{}/address/{}/transactions_v3/", self.base_url, slug, address);
        let items: Vec<TransactionItem> = self.get_items(api_key, &url).await?;

        Ok(items
            .into_iter()
            .map(|item| TransactionRecord {
                native_value: native_value_from_wei(item.value.as_deref()),
                usd_value: item.value_quote,
                timestamp: normalize_timestamp(item.block_signed_at.as_deref()),
                successful: item.successful,
                hash: item.tx_hash,
                from: item.from_address.unwrap_or_default(),
                to: item.to_address.unwrap_or_default(),
            })
            .collect())
    }
}

#[async_trait]
impl TokenDataProvider for CovalentProvider {
    fn name(&self) -> &'static str {
        "covalent"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn serves_token_balances(&self, network: &NetworkDescriptor) -> bool {
        network.provider_slugs.covalent.is_some()
    }

    fn serves_transactions(&self, network: &NetworkDescriptor) -> bool {
        !network.is_solana() && network.provider_slugs.covalent.is_some()
    }

    async fn fetch_token_balances(&self, network: &NetworkDescriptor, address: &str) -> Option<TokenPortfolio> {
        let (Some(api_key), Some(slug)) = (self.api_key.as_deref(), network.provider_slugs.covalent) else {
            return None;
        };

        match self.query_balances(api_key, slug, address).await {
            Ok(portfolio) => {
                debug!(network = network.id, tokens = portfolio.tokens.len(), "covalent balances fetched");
                Some(portfolio)
            }
            Err(e) => {
                warn!(network = network.id, address, error = %e, "covalent balances unavailable");
                None
            }
        }
    }

    async fn fetch_transactions(&self, network: &NetworkDescriptor, address: &str) -> Option<Vec<TransactionRecord>> {
        if !self.serves_transactions(network) {
            return None;
        }
        let (Some(api_key), Some(slug)) = (self.api_key.as_deref(), network.provider_slugs.covalent) else {
            return None;
        };

        match self.query_transactions(api_key, slug, address).await {
            Ok(records) => {
                debug!(network = network.id, count = records.len(), "covalent transactions fetched");
                Some(records)
            }
            Err(e) => {
                warn!(network = network.id, address, error = %e, "covalent transactions unavailable");
                None
            }
        }
    }
}
