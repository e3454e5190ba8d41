use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::network::NetworkDescriptor;

/// A non-native token holding, already scaled by its decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenBalance {
    pub name: String,
    pub symbol: String,
    pub balance: f64,
    pub decimals: u32,
    /// USD value of the holding.
    #[serde(rename = "quote")]
    pub usd_value: f64,
}

/// The network's native coin as reported inline by a provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NativeHolding {
    pub balance: f64,
    pub usd_value: Option<f64>,
}

/// Normalized token data from one provider call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TokenPortfolio {
    pub tokens: Vec<TokenBalance>,
    /// Sum of the non-native token USD values.
    pub total_usd: f64,
    /// Kept out of `tokens` so native value is never counted twice.
    pub native_from_provider: Option<NativeHolding>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub hash: String,
    pub from: String,
    pub to: String,
    pub native_value: Option<f64>,
    pub usd_value: Option<f64>,
    /// RFC 3339, UTC.
    pub timestamp: Option<String>,
    pub successful: bool,
}

/// Merged balance figures for one request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BalanceQueryResult {
    pub native_balance: Option<f64>,
    pub native_usd_value: Option<f64>,
    pub tokens: Option<Vec<TokenBalance>>,
    pub token_portfolio_usd: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedBalanceResponse {
    pub network: String,
    pub address: String,
    pub native_balance: Option<f64>,
    pub native_symbol: String,
    pub native_value_usd: Option<f64>,
    pub token_balances: Option<Vec<TokenBalance>>,
    pub token_portfolio_value_usd: Option<f64>,
}

impl AggregatedBalanceResponse {
    pub fn new(network: &NetworkDescriptor, address: &str, result: BalanceQueryResult) -> Self {
        Self {
            network: network.id.to_string(),
            address: address.to_string(),
            native_balance: result.native_balance,
            native_symbol: network.native_symbol.to_string(),
            native_value_usd: result.native_usd_value,
            token_balances: result.tokens,
            token_portfolio_value_usd: result.token_portfolio_usd,
        }
    }
}

/// Solana history is passed through as raw signature entries; EVM history is
/// normalized provider records.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TransactionHistory {
    Records(Vec<TransactionRecord>),
    Signatures(Vec<Value>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedTransactionResponse {
    pub network: String,
    pub address: String,
    pub transactions: Option<TransactionHistory>,
}

impl AggregatedTransactionResponse {
    pub fn new(network: &NetworkDescriptor, address: &str, transactions: Option<TransactionHistory>) -> Self {
        Self {
            network: network.id.to_string(),
            address: address.to_string(),
            transactions,
        }
    }
}
