use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    error::InternalError,
    http::header::{HeaderName, HeaderValue},
    Error,
};
use futures_util::future::{ready, FutureExt, LocalBoxFuture, Ready};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::rc::Rc;
use std::time::Instant;
use tracing::{debug, error};

use super::CORS_HEADERS;
use crate::domain::error::{internal_error_response, ApiError};

/// Last line of defence for unexpected faults.
///
/// Service errors, 5xx responses and panics inside the wrapped service all
/// become the generic `{"error":"Internal server error"}` 500. The original
/// cause is logged and never sent to the client.
///
/// The request is never cloned here: the router needs sole ownership of it
/// to record path matches.
#[derive(Debug, Clone, Default)]
pub struct ErrorHandlingMiddleware;

impl ErrorHandlingMiddleware {
    pub fn new() -> Self {
        Self
    }
}

impl<S, B> Transform<S, ServiceRequest> for ErrorHandlingMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Transform = ErrorHandlingService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ErrorHandlingService {
            service: Rc::new(service),
        }))
    }
}

pub struct ErrorHandlingService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for ErrorHandlingService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    actix_web::dev::forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let method = req.method().to_string();
        let path = req.path().to_string();
        let start_time = Instant::now();

        Box::pin(async move {
            // `call` itself runs inside the guarded future so synchronous
            // panics are caught too.
            let outcome = AssertUnwindSafe(async move { service.call(req).await })
                .catch_unwind()
                .await;
            let elapsed_ms = start_time.elapsed().as_millis() as u64;

            match outcome {
                Ok(Ok(response)) if response.status().is_server_error() => {
                    let cause = response
                        .response()
                        .error()
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| response.status().to_string());
                    error!(%method, %path, elapsed_ms, error = %cause, "request failed");
                    Ok(response.into_response(internal_error_response()))
                }
                Ok(Ok(response)) => {
                    debug!(%method, %path, status = response.status().as_u16(), elapsed_ms, "request completed");
                    Ok(response.map_into_boxed_body())
                }
                Ok(Err(e)) => {
                    error!(%method, %path, elapsed_ms, error = %e, "request errored");
                    Err(fault(e.to_string()))
                }
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    error!(%method, %path, elapsed_ms, panic = %message, "handler panicked");
                    Err(fault(format!("handler panicked: {message}")))
                }
            }
        })
    }
}

/// No request is left to build a `ServiceResponse` from, so the fault travels
/// as an error carrying its finished response. Outer middleware is skipped on
/// this path, hence the CORS headers are set here.
fn fault(cause: String) -> Error {
    let mut response = internal_error_response();
    for (name, value) in CORS_HEADERS {
        response
            .headers_mut()
            .insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }
    InternalError::from_response(ApiError::internal(cause), response).into()
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::cors_headers;
    use actix_web::body::to_bytes;
    use actix_web::{http::StatusCode, test, web, App, HttpResponse};
    use serde_json::{json, Value};

    /// The client-facing response, whether the fault came back as a
    /// response or as an error.
    fn into_http_response(result: Result<ServiceResponse<BoxBody>, Error>) -> HttpResponse {
        match result {
            Ok(response) => response.into_parts().1,
            Err(e) => e.error_response(),
        }
    }

    async fn handler_panics() -> HttpResponse {
        panic!("boom");
    }

    async fn handler_errors() -> Result<HttpResponse, Error> {
        Err(actix_web::error::ErrorInternalServerError("db password leaked here"))
    }

    async fn handler_bad_request() -> HttpResponse {
        HttpResponse::BadRequest().json(json!({ "error": "Missing required query parameter: network" }))
    }

    async fn handler_ok(path: web::Path<String>) -> HttpResponse {
        HttpResponse::Ok().json(json!({ "id": path.into_inner() }))
    }

    async fn body_json(response: HttpResponse) -> Value {
        let bytes = to_bytes(response.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[actix_web::test]
    async fn test_routed_requests_reach_handlers() {
        let app = test::init_service(
            App::new()
                .wrap(ErrorHandlingMiddleware::new())
                .wrap(cors_headers())
                .route("/networks/{id}", web::get().to(handler_ok))
                .default_service(web::to(crate::api::fallback)),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/networks/base").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({ "id": "base" }));

        let resp = test::call_service(&app, test::TestRequest::get().uri("/nowhere").to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::default()
            .method(actix_web::http::Method::OPTIONS)
            .uri("/nowhere")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }

    #[actix_web::test]
    async fn test_panic_becomes_generic_500_with_cors() {
        let app = test::init_service(
            App::new()
                .wrap(ErrorHandlingMiddleware::new())
                .wrap(cors_headers())
                .route("/panic", web::get().to(handler_panics)),
        )
        .await;

        let result = test::try_call_service(&app, test::TestRequest::get().uri("/panic").to_request()).await;
        let resp = into_http_response(result);
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp.headers().get("access-control-allow-origin").unwrap(), "*");
        assert_eq!(body_json(resp).await, json!({ "error": "Internal server error" }));
    }

    #[actix_web::test]
    async fn test_error_detail_is_hidden() {
        let app = test::init_service(
            App::new()
                .wrap(ErrorHandlingMiddleware::new())
                .route("/error", web::get().to(handler_errors)),
        )
        .await;

        let result = test::try_call_service(&app, test::TestRequest::get().uri("/error").to_request()).await;
        let resp = into_http_response(result);
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(resp).await, json!({ "error": "Internal server error" }));
    }

    #[actix_web::test]
    async fn test_client_errors_pass_through() {
        let app = test::init_service(
            App::new()
                .wrap(ErrorHandlingMiddleware::new())
                .route("/bad", web::get().to(handler_bad_request)),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/bad").to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Missing required query parameter: network");
    }

    #[::core::prelude::v1::test]
    fn test_panic_payloads_are_described() {
        let text: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(text.as_ref()), "boom");
        let owned: Box<dyn Any + Send> = Box::new(String::from("bad state"));
        assert_eq!(panic_message(owned.as_ref()), "bad state");
        let other: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(other.as_ref()), "unknown panic");
    }
}
