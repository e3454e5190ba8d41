use actix_web::web::Data;
use actix_web::{get, HttpResponse, Responder};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use crate::app::Aggregator;
use crate::domain::network::NetworkKind;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NetworkSummary {
    id: &'static str,
    native_symbol: &'static str,
    kind: NetworkKind,
}

#[get("/health")]
pub async fn health(aggregator: Data<Arc<Aggregator>>) -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "providers": aggregator.provider_status(),
    }))
}

/// Supported networks in registry order, for the front end's selector.
#[get("/api/networks")]
pub async fn list_networks(aggregator: Data<Arc<Aggregator>>) -> impl Responder {
    let networks: Vec<NetworkSummary> = aggregator
        .registry()
        .iter()
        .map(|network| NetworkSummary {
            id: network.id,
            native_symbol: network.native_symbol,
            kind: network.kind,
        })
        .collect();

    HttpResponse::Ok().json(json!({ "networks": networks }))
}
