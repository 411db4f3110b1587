use ledger_common::db::Store;
use ledger_common::ledger;
use ledger_common::request_io::{InputCategory, InputCategoryPatch, OutputEnvelope, OutputMessage};

use actix_web::{web, HttpResponse};
use chrono::Utc;

use crate::handlers::error::HttpErrorResponse;
use crate::middleware::auth::{Access, VerifiedToken};
use crate::middleware::FromBearer;

pub async fn list(
    store: web::Data<dyn Store>,
    user_access_token: VerifiedToken<Access, FromBearer>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let owner = user_access_token.claims.user_id;
    let store = store.into_inner();

    let categories = web::block(move || ledger::list_categories(&*store, owner)).await??;

    Ok(HttpResponse::Ok().json(OutputEnvelope::counted(categories)))
}

pub async fn get(
    store: web::Data<dyn Store>,
    user_access_token: VerifiedToken<Access, FromBearer>,
    category_id: web::Path<String>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let owner = user_access_token.claims.user_id;
    let store = store.into_inner();

    let category =
        web::block(move || ledger::get_category(&*store, owner, &category_id)).await??;

    Ok(HttpResponse::Ok().json(OutputEnvelope::new(category)))
}

pub async fn create(
    store: web::Data<dyn Store>,
    user_access_token: VerifiedToken<Access, FromBearer>,
    category_data: web::Json<InputCategory>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let owner = user_access_token.claims.user_id;
    let store = store.into_inner();

    let category =
        web::block(move || ledger::create_category(&*store, owner, &category_data, Utc::now()))
            .await??;

    Ok(HttpResponse::Created().json(OutputEnvelope::new(category)))
}

pub async fn update(
    store: web::Data<dyn Store>,
    user_access_token: VerifiedToken<Access, FromBearer>,
    category_id: web::Path<String>,
    category_data: web::Json<InputCategoryPatch>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let owner = user_access_token.claims.user_id;
    let store = store.into_inner();

    let category = web::block(move || {
        ledger::update_category(&*store, owner, &category_id, &category_data, Utc::now())
    })
    .await??;

    Ok(HttpResponse::Ok().json(OutputEnvelope::new(category)))
}

pub async fn delete(
    store: web::Data<dyn Store>,
    user_access_token: VerifiedToken<Access, FromBearer>,
    category_id: web::Path<String>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let owner = user_access_token.claims.user_id;
    let store = store.into_inner();

    web::block(move || ledger::delete_category(&*store, owner, &category_id)).await??;

    Ok(HttpResponse::Ok().json(OutputMessage::new("Category deleted")))
}

#[cfg(test)]
mod tests {
    use super::*;

    use ledger_common::models::category::{Category, DEFAULT_CATEGORIES};
    use ledger_common::request_io::{ErrorType, ServerErrorResponse};

    use actix_web::http::StatusCode;
    use actix_web::test::{self, TestRequest};
    use actix_web::App;
    use rust_decimal_macros::dec;
    use serde_json::json;

    use crate::handlers::test_utils::{self, bearer};

    #[actix_web::test]
    async fn test_list_includes_defaults() {
        let store = test_utils::memory_store();
        let app = test::init_service(App::new().configure(test_utils::configure_app(store))).await;
        let auth = test_utils::sign_up(&app, "Avery", "avery@example.com").await;

        let req = TestRequest::get()
            .uri("/api/categories")
            .insert_header(bearer(&auth))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: OutputEnvelope<Vec<Category>> = test::read_body_json(resp).await;
        assert_eq!(body.count, Some(DEFAULT_CATEGORIES.len()));
        assert!(body.data.iter().all(|c| c.is_default && c.user_id.is_none()));
        assert!(body.data.iter().any(|c| c.id == "food"));
    }

    #[actix_web::test]
    async fn test_category_lifecycle() {
        let store = test_utils::memory_store();
        let app = test::init_service(App::new().configure(test_utils::configure_app(store))).await;
        let auth = test_utils::sign_up(&app, "Avery", "avery@example.com").await;

        let req = TestRequest::post()
            .uri("/api/categories")
            .insert_header(bearer(&auth))
            .set_json(json!({ "label": "Pet Care & Vet", "budget": 120 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body: OutputEnvelope<Category> = test::read_body_json(resp).await;
        let created = body.data;
        assert_eq!(created.id, "pet-care-vet");
        assert_eq!(created.user_id, Some(auth.user.id));
        assert!(!created.is_default);
        assert_eq!(created.budget, Some(dec!(120)));

        let req = TestRequest::post()
            .uri("/api/categories")
            .insert_header(bearer(&auth))
            .set_json(json!({ "id": "pet-care-vet", "label": "Duplicate" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: ServerErrorResponse = test::read_body_json(resp).await;
        assert_eq!(body.err_type, ErrorType::ConflictWithExisting);

        let req = TestRequest::put()
            .uri("/api/categories/pet-care-vet")
            .insert_header(bearer(&auth))
            .set_json(json!({ "color": "#10b981", "budget": null }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: OutputEnvelope<Category> = test::read_body_json(resp).await;
        assert_eq!(body.data.label, "Pet Care & Vet");
        assert_eq!(body.data.color, "#10b981");
        assert_eq!(body.data.budget, None);

        let req = TestRequest::get()
            .uri("/api/categories/pet-care-vet")
            .insert_header(bearer(&auth))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = TestRequest::delete()
            .uri("/api/categories/pet-care-vet")
            .insert_header(bearer(&auth))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = TestRequest::get()
            .uri("/api/categories/pet-care-vet")
            .insert_header(bearer(&auth))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: ServerErrorResponse = test::read_body_json(resp).await;
        assert_eq!(body.err_type, ErrorType::CategoryDoesNotExist);
    }

    #[actix_web::test]
    async fn test_default_override_is_private() {
        let store = test_utils::memory_store();
        let app = test::init_service(App::new().configure(test_utils::configure_app(store))).await;
        let avery = test_utils::sign_up(&app, "Avery", "avery@example.com").await;
        let blake = test_utils::sign_up(&app, "Blake", "blake@example.com").await;

        let req = TestRequest::put()
            .uri("/api/categories/food")
            .insert_header(bearer(&avery))
            .set_json(json!({ "budget": 300 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: OutputEnvelope<Category> = test::read_body_json(resp).await;
        assert_eq!(body.data.budget, Some(dec!(300)));
        assert_eq!(body.data.label, "Food & Dining");
        assert_eq!(body.data.user_id, Some(avery.user.id));

        let req = TestRequest::get()
            .uri("/api/categories/food")
            .insert_header(bearer(&blake))
            .to_request();
        let resp = test::call_service(&app, req).await;
        let body: OutputEnvelope<Category> = test::read_body_json(resp).await;
        assert_eq!(body.data.budget, None);
        assert!(body.data.user_id.is_none());

        // Defaults cannot be deleted, only an override of one
        let req = TestRequest::delete()
            .uri("/api/categories/food")
            .insert_header(bearer(&blake))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = TestRequest::delete()
            .uri("/api/categories/food")
            .insert_header(bearer(&avery))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = TestRequest::get()
            .uri("/api/categories/food")
            .insert_header(bearer(&avery))
            .to_request();
        let resp = test::call_service(&app, req).await;
        let body: OutputEnvelope<Category> = test::read_body_json(resp).await;
        assert_eq!(body.data.budget, None);
        assert!(body.data.is_default);
    }

    #[actix_web::test]
    async fn test_create_requires_label() {
        let store = test_utils::memory_store();
        let app = test::init_service(App::new().configure(test_utils::configure_app(store))).await;
        let auth = test_utils::sign_up(&app, "Avery", "avery@example.com").await;

        let req = TestRequest::post()
            .uri("/api/categories")
            .insert_header(bearer(&auth))
            .set_json(json!({ "id": "travel" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = TestRequest::post()
            .uri("/api/categories")
            .insert_header(bearer(&auth))
            .set_json(json!({ "id": "food", "label": "My Food" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
