use actix_web::web::*;

use crate::handlers::budget;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(scope("/budgets").route("/status", get().to(budget::status)));
}
