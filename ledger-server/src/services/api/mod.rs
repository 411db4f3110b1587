use std::time::Duration;

use ledger_common::request_io::ServerErrorResponse;

use actix_web::error::{JsonPayloadError, PathError, QueryPayloadError};
use actix_web::web::*;
use actix_web::{HttpRequest, HttpResponse};

use crate::handlers::error::{DoesNotExistType, HttpErrorResponse};
use crate::middleware::Limiter;

mod auth;
mod budget;
mod category;
mod health;
mod transaction;

#[derive(Clone)]
pub struct RouteLimiters {
    pub create_user: Limiter,
    pub password: Limiter,
    pub refresh_tokens: Limiter,
}

impl Default for RouteLimiters {
    fn default() -> Self {
        const CLEAR_FREQUENCY: Duration = Duration::from_secs(3600 * 24);

        Self {
            create_user: Limiter::new(5, Duration::from_secs(1200), CLEAR_FREQUENCY),
            password: Limiter::new(10, Duration::from_secs(600), CLEAR_FREQUENCY),
            refresh_tokens: Limiter::new(20, Duration::from_secs(180), CLEAR_FREQUENCY),
        }
    }
}

pub fn configure(cfg: &mut ServiceConfig, limiters: RouteLimiters) {
    cfg.app_data(JsonConfig::default().error_handler(json_error_handler))
        .app_data(QueryConfig::default().error_handler(query_error_handler))
        .app_data(PathConfig::default().error_handler(path_error_handler))
        .service(
            scope("/api")
                .configure(|cfg| auth::configure(cfg, limiters))
                .configure(budget::configure)
                .configure(category::configure)
                .configure(health::configure)
                .configure(transaction::configure)
                .default_service(to(route_not_found)),
        )
        .default_service(to(route_not_found));
}

async fn route_not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ServerErrorResponse::from(HttpErrorResponse::DoesNotExist(
        String::from("Route not found"),
        DoesNotExistType::Route,
    )))
}

fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    HttpErrorResponse::IncorrectlyFormed(err.to_string()).into()
}

fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    HttpErrorResponse::IncorrectlyFormed(err.to_string()).into()
}

fn path_error_handler(_err: PathError, req: &HttpRequest) -> actix_web::Error {
    let dne_type = if req.path().contains("/transactions/") {
        DoesNotExistType::Transaction
    } else {
        DoesNotExistType::Route
    };

    HttpErrorResponse::DoesNotExist(String::from("No resource at this path"), dne_type).into()
}

#[cfg(test)]
mod tests {
    use ledger_common::request_io::{ErrorType, ServerErrorResponse};

    use actix_web::body::to_bytes;
    use actix_web::dev::Service;
    use actix_web::http::StatusCode;
    use actix_web::test::{self, TestRequest};
    use actix_web::App;
    use serde_json::json;

    use crate::handlers::test_utils;

    #[actix_web::test]
    async fn test_unknown_routes_are_json_404s() {
        let store = test_utils::memory_store();
        let app = test::init_service(App::new().configure(test_utils::configure_app(store))).await;

        for uri in ["/api/does-not-exist", "/nowhere", "/api/transactions/a/b"] {
            let req = TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND);

            let body: ServerErrorResponse = test::read_body_json(resp).await;
            assert!(!body.success);
            assert_eq!(body.err_type, ErrorType::RouteDoesNotExist);
            assert_eq!(body.message, "Does not exist: Route not found");
        }
    }

    #[actix_web::test]
    async fn test_health_routes() {
        let store = test_utils::memory_store();
        let app = test::init_service(App::new().configure(test_utils::configure_app(store))).await;

        for uri in ["/api/health", "/api/heartbeat"] {
            let req = TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::OK);
        }
    }

    #[actix_web::test]
    async fn test_signup_is_rate_limited() {
        let store = test_utils::memory_store();
        let app = test::init_service(App::new().configure(test_utils::configure_app(store))).await;

        let signup_request = || {
            TestRequest::post()
                .uri("/api/auth/signup")
                .insert_header(("test-ip", "10.1.2.3"))
                .set_json(json!({ "name": "", "email": "someone@example.com", "password": "" }))
                .to_request()
        };

        for _ in 0..5 {
            let resp = test::call_service(&app, signup_request()).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        }

        let err = app.call(signup_request()).await.err().unwrap();
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);

        let body = to_bytes(resp.into_body()).await.unwrap();
        let body: ServerErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(body.err_type, ErrorType::TooManyRequests);

        // Login is limited separately
        let req = TestRequest::post()
            .uri("/api/auth/login")
            .insert_header(("test-ip", "10.1.2.3"))
            .set_json(json!({ "email": "someone@example.com", "password": "anything" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
