use actix_web::{web, App, HttpServer};
use std::io::{Error, ErrorKind};
use std::sync::Arc;
use tracing::{error, info};

use portfolio_aggregator::api;
use portfolio_aggregator::app::Aggregator;
use portfolio_aggregator::infrastructure::config::Config;
use portfolio_aggregator::infrastructure::logger::{LogConfig, Logger};
use portfolio_aggregator::middleware::{cors_headers, ErrorHandlingMiddleware};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config = match Config::new() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return Err(Error::new(ErrorKind::Other, format!("Configuration initialization failed: {e}")));
        }
    };

    Logger::init(&LogConfig::from(&config));
    info!("Starting portfolio aggregator v{}", env!("CARGO_PKG_VERSION"));

    let aggregator = match Aggregator::from_config(&config) {
        Ok(aggregator) => Arc::new(aggregator),
        Err(e) => {
            error!("Failed to initialize aggregator: {}", e);
            return Err(Error::new(ErrorKind::Other, format!("Aggregator initialization failed: {e}")));
        }
    };

    for network in aggregator.registry().iter() {
        info!(network = network.id, rpc = %network.rpc_endpoint, "network registered");
    }
    info!("Listening on {}:{}", config.host, config.port);

    HttpServer::new(move || {
        App::new()
            .wrap(ErrorHandlingMiddleware::new())
            .wrap(cors_headers())
            .wrap(actix_web::middleware::Logger::default())
            .app_data(web::Data::new(Arc::clone(&aggregator)))
            .configure(api::configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
