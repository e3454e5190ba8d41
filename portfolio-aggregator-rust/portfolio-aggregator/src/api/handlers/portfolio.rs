use actix_web::web::{Data, Query};
use actix_web::{get, HttpResponse};
use serde::Deserialize;
use std::sync::Arc;

use crate::app::Aggregator;
use crate::domain::error::ApiError;

/// `?network=<id>&address=<addr>`, shared by both portfolio endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PortfolioQuery {
    pub network: Option<String>,
    pub address: Option<String>,
}

impl PortfolioQuery {
    /// Checks presence in order: network, then address. Blank values count
    /// as missing. Whether the network is supported is left to the registry.
    pub fn required(&self) -> Result<(&str, &str), ApiError> {
        let network = non_blank(self.network.as_deref()).ok_or(ApiError::MissingParameter("network"))?;
        let address = non_blank(self.address.as_deref()).ok_or(ApiError::MissingParameter("address"))?;
        Ok((network, address))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[get("/api/balances")]
pub async fn get_balances(
    aggregator: Data<Arc<Aggregator>>,
    query: Query<PortfolioQuery>,
) -> Result<HttpResponse, ApiError> {
    let (network, address) = query.required()?;
    let response = aggregator.balances(network, address).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[get("/api/transactions")]
pub async fn get_transactions(
    aggregator: Data<Arc<Aggregator>>,
    query: Query<PortfolioQuery>,
) -> Result<HttpResponse, ApiError> {
    let (network, address) = query.required()?;
    let response = aggregator.transactions(network, address).await?;
    Ok(HttpResponse::Ok().json(response))
}
