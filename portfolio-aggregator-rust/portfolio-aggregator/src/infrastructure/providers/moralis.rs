use anyhow::Result;
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

const API_KEY_HEADER: &str = "X-API-Key";

/// Moralis Web3 Data API. EVM only; chains are addressed by hex chain id.
#[derive(Debug, Clone)]
pub struct MoralisProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResultPage {
    #[serde(default)]
    result: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct TokenItem {
    name: Option<String>,
    symbol: Option<String>,
    #[serde(default, deserialize_with = "lenient_decimals")]
    decimals: u32,
    balance: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    usd_value: Option<f64>,
    #[serde(default)]
    native_token: bool,
}

#[derive(Debug, Deserialize)]
struct TransactionItem {
    hash: String,
    from_address: Option<String>,
    to_address: Option<String>,
    value: Option<String>,
    block_timestamp: Option<String>,
    receipt_status: Option<String>,
}

impl MoralisProvider {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    async fn get_results<T: DeserializeOwned>(&self, api_key: &str, url: &str, chain: &str) -> Result<Vec<T>> {
        let page: ResultPage = self
            .client
            .get(url)
            .header(API_KEY_HEADER, api_key)
            .query(&[("chain", chain)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(decode_items(self.name(), page.result))
    }

    async fn query_tokens(&self, api_key: &str, chain: &str, address: &str) -> Result<TokenPortfolio> {
        let url = format!("{}/api/v2.2/wallets/{}/tokens", self.base_url, address);
        let items: Vec<TokenItem> = self.get_results(api_key, &url, chain).await?;

        Ok(build_portfolio(items.into_iter().filter_map(|item| {
            Some(RawHolding {
                name: item.name.unwrap_or_default(),
                symbol: item.symbol.unwrap_or_default(),
                raw_balance: item.balance?,
                decimals: item.decimals,
                usd_value: item.usd_value,
                is_native: item.native_token,
            })
        })))
    }

    async fn query_transactions(&self, api_key: &str, chain: &str, address: &str) -> Result<Vec<TransactionRecord>> {
        let url = format!("{}/api/v2.2/{}", self.base_url, address);
        let items: Vec<TransactionItem> = self.get_results(api_key, &url, chain).await?;

        Ok(items
            .into_iter()
            .map(|item| TransactionRecord {
                native_value: native_value_from_wei(item.value.as_deref()),
                usd_value: None,
                timestamp: normalize_timestamp(item.block_timestamp.as_deref()),
                successful: item.receipt_status.as_deref() == Some("1"),
                hash: item.hash,
                from: item.from_address.unwrap_or_default(),
                to: item.to_address.unwrap_or_default(),
            })
            .collect())
    }

    fn credentials<'a>(&'a self, network: &NetworkDescriptor) -> Option<(&'a str, &'static str)> {
        Some((self.api_key.as_deref()?, network.provider_slugs.moralis?))
    }
}

#[async_trait]
impl TokenDataProvider for MoralisProvider {
    fn name(&self) -> &'static str {
        "moralis"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn serves_token_balances(&self, network: &NetworkDescriptor) -> bool {
        network.provider_slugs.moralis.is_some()
    }

    fn serves_transactions(&self, network: &NetworkDescriptor) -> bool {
        network.provider_slugs.moralis.is_some()
    }

    async fn fetch_token_balances(&self, network: &NetworkDescriptor, address: &str) -> Option<TokenPortfolio> {
        let (api_key, chain) = self.credentials(network)?;

        match self.query_tokens(api_key, chain, address).await {
            Ok(portfolio) => {
                debug!(network = network.id, tokens = portfolio.tokens.len(), "moralis balances fetched");
                Some(portfolio)
            }
            Err(e) => {
                warn!(network = network.id, address, error = %e, "moralis balances unavailable");
                None
            }
        }
    }

    async fn fetch_transactions(&self, network: &NetworkDescriptor, address: &str) -> Option<Vec<TransactionRecord>> {
        let (api_key, chain) = self.credentials(network)?;

        match self.query_transactions(api_key, chain, address).await {
            Ok(records) => {
                debug!(network = network.id, count = records.len(), "moralis transactions fetched");
                Some(records)
            }
            Err(e) => {
                warn!(network = network.id, address, error = %e, "moralis transactions unavailable");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::network::NetworkRegistry;
    use serde_json::json;
    use wiremock::matchers::{any, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer, key: Option<&str>) -> MoralisProvider {
        MoralisProvider::new(Client::new(), server.uri(), key.map(str::to_string))
    }

    #[tokio::test]
    async fn test_tokens_use_hex_chain_and_api_key_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2.2/wallets/0xabc/tokens"))
            .and(query_param("chain", "0x38"))
            .and(header("x-api-key", "moralis_test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "cursor": null,
                "result": [
                    {"name": "BNB", "symbol": "BNB", "decimals": 18,
                     "balance": "3000000000000000000", "usd_value": 1800.0, "native_token": true},
                    {"name": "PancakeSwap Token", "symbol": "CAKE", "decimals": "18",
                     "balance": "10000000000000000000", "usd_value": 25.0, "native_token": false},
                    {"name": "Empty", "symbol": "EMP", "decimals": 18,
                     "balance": "0", "usd_value": null, "native_token": false}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let registry = NetworkRegistry::default();
        let portfolio = provider(&server, Some("moralis_test"))
            .fetch_token_balances(registry.resolve("bsc").unwrap(), "0xabc")
            .await
            .unwrap();

        assert_eq!(portfolio.tokens.len(), 1);
        assert_eq!(portfolio.tokens[0].symbol, "CAKE");
        assert_eq!(portfolio.tokens[0].balance, 10.0);
        assert_eq!(portfolio.total_usd, 25.0);
        assert_eq!(portfolio.native_from_provider.unwrap().balance, 3.0);
    }

    #[tokio::test]
    async fn test_solana_is_never_requested() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let registry = NetworkRegistry::default();
        let solana = registry.resolve("solana").unwrap();
        let moralis = provider(&server, Some("moralis_test"));
        assert!(!moralis.serves_token_balances(solana));
        assert!(!moralis.serves_transactions(solana));
        assert!(moralis.fetch_token_balances(solana, "Wallet111").await.is_none());
        assert!(moralis.fetch_transactions(solana, "Wallet111").await.is_none());
    }

    #[tokio::test]
    async fn test_missing_key_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let registry = NetworkRegistry::default();
        let moralis = provider(&server, None);
        assert!(!moralis.is_configured());
        assert!(moralis
            .fetch_token_balances(registry.resolve("ethereum").unwrap(), "0xabc")
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_transactions_mapped_without_usd_value() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2.2/0xabc"))
            .and(query_param("chain", "0x89"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": [
                    {"hash": "0xbeef", "from_address": "0xabc", "to_address": "0xdef",
                     "value": "2000000000000000000", "block_timestamp": "2024-06-01T08:15:30.000Z",
                     "receipt_status": "1"},
                    {"hash": "0xdead", "from_address": "0xdef", "to_address": "0xabc",
                     "value": "0", "block_timestamp": "not a date", "receipt_status": "0"}
                ]
            })))
            .mount(&server)
            .await;

        let registry = NetworkRegistry::default();
        let records = provider(&server, Some("moralis_test"))
            .fetch_transactions(registry.resolve("polygon").unwrap(), "0xabc")
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].hash, "0xbeef");
        assert_eq!(records[0].native_value, Some(2.0));
        assert_eq!(records[0].usd_value, None);
        assert_eq!(records[0].timestamp.as_deref(), Some("2024-06-01T08:15:30Z"));
        assert!(records[0].successful);
        assert_eq!(records[1].timestamp, None);
        assert!(!records[1].successful);
    }

    #[tokio::test]
    async fn test_server_error_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let registry = NetworkRegistry::default();
        let moralis = provider(&server, Some("moralis_test"));
        let ethereum = registry.resolve("ethereum").unwrap();
        assert!(moralis.fetch_token_balances(ethereum, "0xabc").await.is_none());
        assert!(moralis.fetch_transactions(ethereum, "0xabc").await.is_none());
    }

    #[tokio::test]
    async fn test_garbage_decimals_drop_only_that_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2.2/wallets/0xabc/tokens"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": [
                    {"name": "USD Coin", "symbol": "USDC", "decimals": 6,
                     "balance": "2500000", "usd_value": 2.5, "native_token": false},
                    {"name": "Broken", "symbol": "BRK", "decimals": "",
                     "balance": "100", "usd_value": 1.0, "native_token": false}
                ]
            })))
            .mount(&server)
            .await;

        let registry = NetworkRegistry::default();
        let portfolio = provider(&server, Some("moralis_test"))
            .fetch_token_balances(registry.resolve("ethereum").unwrap(), "0xabc")
            .await
            .unwrap();

        assert_eq!(portfolio.tokens.len(), 1);
        assert_eq!(portfolio.tokens[0].symbol, "USDC");
        assert_eq!(portfolio.tokens[0].balance, 2.5);
        assert_eq!(portfolio.total_usd, 2.5);
    }
}
