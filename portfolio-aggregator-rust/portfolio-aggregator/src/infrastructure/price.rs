use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Spot USD price. Best effort: one attempt, no cache.
    async fn usd_price(&self, price_id: &str) -> Option<f64>;
}

/// CoinGecko `simple/price` lookup keyed by coin id.
#[derive(Debug, Clone)]
pub struct CoinGeckoPriceSource {
    client: Client,
    base_url: String,
}

impl CoinGeckoPriceSource {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn query_price(&self, price_id: &str) -> Result<f64> {
        let url = format!("{}/api/v3/simple/price", self.base_url);
        let body: Value = self
            .client
            .get(&url)
            .query(&[("ids", price_id), ("vs_currencies", "usd")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        body[price_id]["usd"]
            .as_f64()
            .filter(|price| price.is_finite())
            .ok_or_else(|| anyhow!("no usd price for '{}' in {}", price_id, body))
    }
}

#[async_trait]
impl PriceSource for CoinGeckoPriceSource {
    async fn usd_price(&self, price_id: &str) -> Option<f64> {
        match self.query_price(price_id).await {
            Ok(price) => {
                debug!(price_id, price, "price fetched");
                Some(price)
            }
            Err(e) => {
                warn!(price_id, error = %e, "price unavailable");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_price_read_from_coin_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/simple/price"))
            .and(query_param("ids", "matic-network"))
            .and(query_param("vs_currencies", "usd"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"matic-network": {"usd": 0.72}})))
            .expect(1)
            .mount(&server)
            .await;

        let prices = CoinGeckoPriceSource::new(Client::new(), server.uri());
        assert_eq!(prices.usd_price("matic-network").await, Some(0.72));
    }

    #[tokio::test]
    async fn test_missing_id_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(path("/api/v3/simple/price"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let prices = CoinGeckoPriceSource::new(Client::new(), server.uri());
        assert_eq!(prices.usd_price("solana").await, None);
    }

    #[tokio::test]
    async fn test_rate_limited_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(path("/api/v3/simple/price"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({"status": {"error_code": 429}})))
            .expect(1)
            .mount(&server)
            .await;

        let prices = CoinGeckoPriceSource::new(Client::new(), format!("{}/", server.uri()));
        assert_eq!(prices.usd_price("ethereum").await, None);
    }
}
