//! Optional third-party token/transaction data providers.
//!
//! Both providers sit behind [`TokenDataProvider`]; the aggregator holds them
//! as a preference-ordered list and queries at most one per request.

pub mod covalent;
pub mod moralis;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

use crate::domain::amount::{from_base_units, parse_decimal_amount, EVM_NATIVE_DECIMALS};
use crate::domain::network::NetworkDescriptor;
use crate::domain::portfolio::{NativeHolding, TokenBalance, TokenPortfolio, TransactionRecord};

pub use covalent::CovalentProvider;
pub use moralis::MoralisProvider;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenDataProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// True when an API key is present.
    fn is_configured(&self) -> bool;

    fn serves_token_balances(&self, network: &NetworkDescriptor) -> bool;

    fn serves_transactions(&self, network: &NetworkDescriptor) -> bool;

    /// `None` without a key, for unsupported networks, and on any failure.
    async fn fetch_token_balances(&self, network: &NetworkDescriptor, address: &str) -> Option<TokenPortfolio>;

    async fn fetch_transactions(&self, network: &NetworkDescriptor, address: &str) -> Option<Vec<TransactionRecord>>;
}

/// A provider holding before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawHolding {
    pub name: String,
    pub symbol: String,
    /// Base-unit integer as a decimal string.
    pub raw_balance: String,
    pub decimals: u32,
    pub usd_value: Option<f64>,
    pub is_native: bool,
}

/// Drops zero and unparseable balances, scales the rest, and moves the
/// native coin out of the token list. Only the first native entry is kept.
pub fn build_portfolio<I>(holdings: I) -> TokenPortfolio
where
    I: IntoIterator<Item = RawHolding>,
{
    let mut portfolio = TokenPortfolio::default();

    for holding in holdings {
        let Some(amount) = parse_decimal_amount(&holding.raw_balance) else {
            continue;
        };
        if amount.is_zero() {
            continue;
        }
        let Some(balance) = from_base_units(amount, holding.decimals) else {
            continue;
        };

        if holding.is_native {
            portfolio.native_from_provider.get_or_insert(NativeHolding {
                balance,
                usd_value: holding.usd_value,
            });
            continue;
        }

        let usd_value = holding.usd_value.filter(|v| v.is_finite()).unwrap_or(0.0);
        portfolio.total_usd += usd_value;
        portfolio.tokens.push(TokenBalance {
            name: holding.name,
            symbol: holding.symbol,
            balance,
            decimals: holding.decimals,
            usd_value,
        });
    }

    portfolio
}

/// Decodes page items one by one. A malformed item is dropped without
/// taking the rest of the page with it.
pub(crate) fn decode_items<T: DeserializeOwned>(provider: &'static str, items: Vec<Value>) -> Vec<T> {
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                debug!(provider, error = %e, "skipping malformed item");
                None
            }
        })
        .collect()
}

/// Wei string to native units; absent when missing or malformed.
pub fn native_value_from_wei(value: Option<&str>) -> Option<f64> {
    value
        .and_then(parse_decimal_amount)
        .and_then(|wei| from_base_units(wei, EVM_NATIVE_DECIMALS))
}

/// Re-emits an upstream timestamp as RFC 3339 UTC with second precision.
pub fn normalize_timestamp(raw: Option<&str>) -> Option<String> {
    let parsed = DateTime::parse_from_rfc3339(raw?.trim()).ok()?;
    Some(
        parsed
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Secs, true),
    )
}

/// Accepts `18`, `"18"` or `null` (as 0) for token decimals.
pub(crate) fn lenient_decimals<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Decimals {
        Number(u32),
        Text(String),
    }

    match Option::<Decimals>::deserialize(deserializer)? {
        None => Ok(0),
        Some(Decimals::Number(n)) => Ok(n),
        Some(Decimals::Text(s)) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Accepts a number, a numeric string or `null`.
pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Amount {
        Number(f64),
        Text(String),
    }

    Ok(match Option::<Amount>::deserialize(deserializer)? {
        Some(Amount::Number(n)) => Some(n),
        Some(Amount::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holding(symbol: &str, raw: &str, decimals: u32, usd: Option<f64>, native: bool) -> RawHolding {
        RawHolding {
            name: format!("{symbol} Token"),
            symbol: symbol.to_string(),
            raw_balance: raw.to_string(),
            decimals,
            usd_value: usd,
            is_native: native,
        }
    }

    #[test]
    fn test_balances_are_scaled_by_decimals() {
        let portfolio = build_portfolio(vec![holding("ABC", "150000", 3, Some(30.0), false)]);
        assert_eq!(portfolio.tokens.len(), 1);
        assert_eq!(portfolio.tokens[0].balance, 150.0);
        assert_eq!(portfolio.tokens[0].decimals, 3);
        assert_eq!(portfolio.total_usd, 30.0);
    }

    #[test]
    fn test_zero_and_malformed_balances_are_dropped() {
        let portfolio = build_portfolio(vec![
            holding("ZERO", "0", 18, Some(0.0), false),
            holding("PADDED", "000", 6, None, false),
            holding("BAD", "n/a", 6, Some(4.0), false),
            holding("USDC", "2500000", 6, Some(2.5), false),
        ]);
        let symbols: Vec<_> = portfolio.tokens.iter().map(|t| t.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["USDC"]);
        assert_eq!(portfolio.total_usd, 2.5);
    }

    #[test]
    fn test_native_token_is_kept_out_of_list_and_total() {
        let portfolio = build_portfolio(vec![
            holding("ETH", "2000000000000000000", 18, Some(4000.0), true),
            holding("USDC", "1000000", 6, Some(1.0), false),
        ]);

        assert_eq!(portfolio.tokens.len(), 1);
        assert_eq!(portfolio.total_usd, 1.0);
        assert_eq!(
            portfolio.native_from_provider,
            Some(NativeHolding { balance: 2.0, usd_value: Some(4000.0) })
        );
    }

    #[test]
    fn test_portfolio_without_native_entry() {
        let portfolio = build_portfolio(vec![holding("DAI", "1000000000000000000", 18, None, false)]);
        assert!(portfolio.native_from_provider.is_none());
        assert_eq!(portfolio.tokens[0].usd_value, 0.0);
        assert_eq!(portfolio.total_usd, 0.0);
    }

    #[test]
    fn test_timestamp_normalization() {
        assert_eq!(
            normalize_timestamp(Some("2024-03-01T12:30:45.000Z")),
            Some("2024-03-01T12:30:45Z".to_string())
        );
        assert_eq!(
            normalize_timestamp(Some("2024-03-01T14:30:45+02:00")),
            Some("2024-03-01T12:30:45Z".to_string())
        );
        assert_eq!(normalize_timestamp(Some("yesterday")), None);
        assert_eq!(normalize_timestamp(None), None);
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        hash: String,
        #[serde(default, deserialize_with = "lenient_decimals")]
        decimals: u32,
    }

    #[test]
    fn test_malformed_items_are_dropped_individually() {
        let items = vec![
            serde_json::json!({"hash": "0x01", "decimals": 6}),
            serde_json::json!({"hash": null, "decimals": 6}),
            serde_json::json!({"hash": "0x03", "decimals": ""}),
            serde_json::json!({"hash": "0x04", "decimals": "18"}),
            serde_json::json!("not an object"),
        ];
        let decoded: Vec<Item> = decode_items("test", items);
        assert_eq!(
            decoded,
            vec![
                Item { hash: "0x01".to_string(), decimals: 6 },
                Item { hash: "0x04".to_string(), decimals: 18 },
            ]
        );
    }

    #[test]
    fn test_wei_values() {
        assert_eq!(native_value_from_wei(Some("1000000000000000000")), Some(1.0));
        assert_eq!(native_value_from_wei(Some("0")), Some(0.0));
        assert_eq!(native_value_from_wei(Some("0x10")), None);
        assert_eq!(native_value_from_wei(None), None);
    }
}
