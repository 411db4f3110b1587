use ledger_common::db::Store;
use ledger_common::ledger;
use ledger_common::request_io::OutputEnvelope;

use actix_web::{web, HttpResponse};
use chrono::Utc;

use crate::handlers::error::HttpErrorResponse;
use crate::middleware::auth::{Access, VerifiedToken};
use crate::middleware::FromBearer;

pub async fn status(
    store: web::Data<dyn Store>,
    user_access_token: VerifiedToken<Access, FromBearer>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let owner = user_access_token.claims.user_id;
    let store = store.into_inner();

    let statuses =
        web::block(move || ledger::evaluate_budgets(&*store, owner, Utc::now())).await??;

    Ok(HttpResponse::Ok().json(OutputEnvelope::counted(statuses)))
}
