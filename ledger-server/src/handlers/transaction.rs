use ledger_common::db::Store;
use ledger_common::ledger;
use ledger_common::request_io::{
    InputTransaction, InputTransactionQuery, InputTrendQuery, OutputEnvelope, OutputMessage,
};

use actix_web::{web, HttpResponse};
use chrono::Utc;
use uuid::Uuid;

use crate::handlers::error::HttpErrorResponse;
use crate::middleware::auth::{Access, VerifiedToken};
use crate::middleware::FromBearer;

pub async fn list(
    store: web::Data<dyn Store>,
    user_access_token: VerifiedToken<Access, FromBearer>,
    query: web::Query<InputTransactionQuery>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let filter = query.to_filter()?;
    let owner = user_access_token.claims.user_id;
    let store = store.into_inner();

    let transactions =
        web::block(move || ledger::list_transactions(&*store, owner, &filter)).await??;

    Ok(HttpResponse::Ok().json(OutputEnvelope::counted(transactions)))
}

pub async fn get(
    store: web::Data<dyn Store>,
    user_access_token: VerifiedToken<Access, FromBearer>,
    transaction_id: web::Path<Uuid>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let owner = user_access_token.claims.user_id;
    let transaction_id = transaction_id.into_inner();
    let store = store.into_inner();

    let transaction =
        web::block(move || ledger::get_transaction(&*store, owner, transaction_id)).await??;

    Ok(HttpResponse::Ok().json(OutputEnvelope::new(transaction)))
}

pub async fn create(
    store: web::Data<dyn Store>,
    user_access_token: VerifiedToken<Access, FromBearer>,
    transaction_data: web::Json<InputTransaction>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let owner = user_access_token.claims.user_id;
    let store = store.into_inner();

    let transaction = web::block(move || {
        ledger::create_transaction(&*store, owner, &transaction_data, Utc::now())
    })
    .await??;

    Ok(HttpResponse::Created().json(OutputEnvelope::new(transaction)))
}

pub async fn update(
    store: web::Data<dyn Store>,
    user_access_token: VerifiedToken<Access, FromBearer>,
    transaction_id: web::Path<Uuid>,
    transaction_data: web::Json<InputTransaction>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let owner = user_access_token.claims.user_id;
    let transaction_id = transaction_id.into_inner();
    let store = store.into_inner();

    let transaction = web::block(move || {
        ledger::update_transaction(&*store, owner, transaction_id, &transaction_data, Utc::now())
    })
    .await??;

    Ok(HttpResponse::Ok().json(OutputEnvelope::new(transaction)))
}

pub async fn delete(
    store: web::Data<dyn Store>,
    user_access_token: VerifiedToken<Access, FromBearer>,
    transaction_id: web::Path<Uuid>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let owner = user_access_token.claims.user_id;
    let transaction_id = transaction_id.into_inner();
    let store = store.into_inner();

    web::block(move || ledger::delete_transaction(&*store, owner, transaction_id)).await??;

    Ok(HttpResponse::Ok().json(OutputMessage::new("Transaction deleted")))
}

pub async fn stats(
    store: web::Data<dyn Store>,
    user_access_token: VerifiedToken<Access, FromBearer>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let owner = user_access_token.claims.user_id;
    let store = store.into_inner();

    let summary = web::block(move || ledger::compute_summary(&*store, owner)).await??;

    Ok(HttpResponse::Ok().json(OutputEnvelope::new(summary)))
}

pub async fn monthly(
    store: web::Data<dyn Store>,
    user_access_token: VerifiedToken<Access, FromBearer>,
    query: web::Query<InputTrendQuery>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let months = query.months()?;
    let owner = user_access_token.claims.user_id;
    let store = store.into_inner();

    let trend = web::block(move || ledger::monthly_trend(&*store, owner, months)).await??;

    Ok(HttpResponse::Ok().json(OutputEnvelope::new(trend)))
}
