use ledger_common::request_io::OutputHealth;

use actix_web::{HttpResponse, Responder};
use chrono::Utc;

pub async fn heartbeat() -> impl Responder {
    HttpResponse::Ok()
}

pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(OutputHealth {
        success: true,
        message: String::from("Ledger API is running"),
        timestamp: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use actix_web::http::StatusCode;
    use actix_web::test::{self, TestRequest};
    use actix_web::{web, App};

    #[actix_web::test]
    async fn test_heartbeat() {
        let app =
            test::init_service(App::new().route("/heartbeat", web::get().to(heartbeat))).await;

        let req = TestRequest::get().uri("/heartbeat").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_health() {
        let app = test::init_service(App::new().route("/health", web::get().to(health))).await;

        let before = Utc::now();
        let req = TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);

        let body: OutputHealth = test::read_body_json(resp).await;
        assert!(body.success);
        assert_eq!(body.message, "Ledger API is running");
        assert!(body.timestamp >= before);
    }
}
