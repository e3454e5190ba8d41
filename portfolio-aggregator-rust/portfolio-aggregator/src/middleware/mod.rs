use actix_web::middleware::DefaultHeaders;

pub mod error_handling;

pub use error_handling::ErrorHandlingMiddleware;

pub const CORS_HEADERS: [(&str, &str); 3] = [
    ("access-control-allow-origin", "*"),
    ("access-control-allow-methods", "GET, OPTIONS"),
    ("access-control-allow-headers", "Content-Type"),
];

/// Permissive CORS headers attached to every response, preflights included.
pub fn cors_headers() -> DefaultHeaders {
    CORS_HEADERS
        .into_iter()
        .fold(DefaultHeaders::new(), |headers, pair| headers.add(pair))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test, web, App, HttpResponse};

    #[actix_web::test]
    async fn test_cors_headers_on_every_response() {
        let app = test::init_service(
            App::new()
                .wrap(cors_headers())
                .route("/ok", web::get().to(HttpResponse::Ok))
                .default_service(web::to(HttpResponse::NotFound)),
        )
        .await;

        for uri in ["/ok", "/missing"] {
            let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
            let headers = resp.headers();
            assert_eq!(headers.get("access-control-allow-origin").unwrap(), "*");
            assert_eq!(headers.get("access-control-allow-methods").unwrap(), "GET, OPTIONS");
            assert_eq!(headers.get("access-control-allow-headers").unwrap(), "Content-Type");
            if uri == "/missing" {
                assert_eq!(resp.status(), StatusCode::NOT_FOUND);
            }
        }
    }
}
