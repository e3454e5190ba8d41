use anyhow::Result;
use reqwest::Client;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::domain::network::{NetworkDescriptor, NetworkRegistry, RegistryError};
use crate::domain::portfolio::{
    AggregatedBalanceResponse, AggregatedTransactionResponse, BalanceQueryResult, TokenPortfolio,
    TransactionHistory,
};
use crate::infrastructure::blockchain::{ChainRpc, PublicRpc, SOLANA_SIGNATURE_LIMIT};
use crate::infrastructure::config::Config;
use crate::infrastructure::price::{CoinGeckoPriceSource, PriceSource};
use crate::infrastructure::providers::{CovalentProvider, MoralisProvider, TokenDataProvider};

/// Answers balance and transaction queries for one network and address.
///
/// Holds no per-request state; every call resolves the network, fans out to
/// the applicable sources and merges what comes back.
pub struct Aggregator {
    registry: NetworkRegistry,
    rpc: Arc<dyn ChainRpc>,
    /// Preference order. At most one is queried per request.
    providers: Vec<Arc<dyn TokenDataProvider>>,
    prices: Arc<dyn PriceSource>,
}

impl Aggregator {
    pub fn new(
        registry: NetworkRegistry,
        rpc: Arc<dyn ChainRpc>,
        providers: Vec<Arc<dyn TokenDataProvider>>,
        prices: Arc<dyn PriceSource>,
    ) -> Self {
        Self {
            registry,
            rpc,
            providers,
            prices,
        }
    }

    /// Wires the public RPC, Covalent, Moralis and CoinGecko adapters over one
    /// shared HTTP client.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let providers: Vec<Arc<dyn TokenDataProvider>> = vec![
            Arc::new(CovalentProvider::new(
                client.clone(),
                config.endpoints.covalent_base_url.clone(),
                config.providers.covalent_api_key.clone(),
            )),
            Arc::new(MoralisProvider::new(
                client.clone(),
                config.endpoints.moralis_base_url.clone(),
                config.providers.moralis_api_key.clone(),
            )),
        ];

        let aggregator = Self::new(
            config.network_registry(),
            Arc::new(PublicRpc::new(client.clone())),
            providers,
            Arc::new(CoinGeckoPriceSource::new(client, config.endpoints.price_base_url.clone())),
        );

        for (name, configured) in aggregator.provider_status() {
            info!(provider = name, configured, "token data provider");
        }
        Ok(aggregator)
    }

    pub fn registry(&self) -> &NetworkRegistry {
        &self.registry
    }

    /// Provider name to whether its key is present.
    pub fn provider_status(&self) -> BTreeMap<&'static str, bool> {
        self.providers
            .iter()
            .map(|provider| (provider.name(), provider.is_configured()))
            .collect()
    }

    pub async fn balances(&self, network_id: &str, address: &str) -> Result<AggregatedBalanceResponse, RegistryError> {
        let network = self.registry.resolve(network_id)?;
        let provider = self.token_provider(network);
        debug!(
            network = network.id,
            address,
            provider = provider.map(|p| p.name()),
            "balance query"
        );

        let token_data = async {
            match provider {
                Some(provider) => provider.fetch_token_balances(network, address).await,
                None => None,
            }
        };

        let (native, portfolio, price) = tokio::join!(
            self.rpc.native_balance(network, address),
            token_data,
            self.prices.usd_price(network.price_id),
        );

        Ok(AggregatedBalanceResponse::new(
            network,
            address,
            merge_balances(native, portfolio, price),
        ))
    }

    pub async fn transactions(
        &self,
        network_id: &str,
        address: &str,
    ) -> Result<AggregatedTransactionResponse, RegistryError> {
        let network = self.registry.resolve(network_id)?;

        let transactions = if network.is_solana() {
            self.rpc
                .recent_signatures(network, address, SOLANA_SIGNATURE_LIMIT)
                .await
                .map(TransactionHistory::Signatures)
        } else {
            match self.transaction_provider(network) {
                Some(provider) => {
                    debug!(network = network.id, address, provider = provider.name(), "transaction query");
                    provider
                        .fetch_transactions(network, address)
                        .await
                        .map(TransactionHistory::Records)
                }
                None => None,
            }
        };

        Ok(AggregatedTransactionResponse::new(network, address, transactions))
    }

    /// First configured provider covering the network. Selection is by key
    /// presence only; a failing provider does not hand over to the next one.
    fn token_provider(&self, network: &NetworkDescriptor) -> Option<&dyn TokenDataProvider> {
        self.providers
            .iter()
            .find(|p| p.is_configured() && p.serves_token_balances(network))
            .map(|p| p.as_ref())
    }

    fn transaction_provider(&self, network: &NetworkDescriptor) -> Option<&dyn TokenDataProvider> {
        self.providers
            .iter()
            .find(|p| p.is_configured() && p.serves_transactions(network))
            .map(|p| p.as_ref())
    }
}

/// Combines the three balance fetches.
///
/// The USD value is computed from the RPC balance first. Provider-reported
/// native figures only fill gaps; they never override RPC data.
pub fn merge_balances(
    native: Option<f64>,
    portfolio: Option<TokenPortfolio>,
    price: Option<f64>,
) -> BalanceQueryResult {
    let native = native.filter(|balance| !balance.is_nan());
    let price = price.filter(|price| price.is_finite());
    let from_provider = portfolio.as_ref().and_then(|p| p.native_from_provider);

    let native_usd_value = native
        .zip(price)
        .map(|(balance, price)| balance * price)
        .or_else(|| from_provider.and_then(|holding| holding.usd_value));
    let native_balance = native.or_else(|| from_provider.map(|holding| holding.balance));

    let (tokens, token_portfolio_usd) = match portfolio {
        Some(portfolio) => (Some(portfolio.tokens), Some(portfolio.total_usd)),
        None => (None, None),
    };

    BalanceQueryResult {
        native_balance,
        native_usd_value,
        tokens,
        token_portfolio_usd,
    }
}
