//! HTTP surface: route table, query extraction errors and the fallback.

pub mod handlers;

use actix_web::error::InternalError;
use actix_web::http::Method;
use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;

use crate::domain::error::not_found_response;
pub use handlers::*;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::QueryConfig::default().error_handler(|err, _req| {
        let body = json!({ "error": err.to_string() });
        InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
    }))
    .service(health)
    .service(list_networks)
    .service(get_balances)
    .service(get_transactions)
    .default_service(web::to(fallback));
}

/// Preflight on any path gets 204; everything else unmatched is a 404.
pub async fn fallback(req: HttpRequest) -> HttpResponse {
    if req.method() == Method::OPTIONS {
        HttpResponse::NoContent().finish()
    } else {
        not_found_response()
    }
}
