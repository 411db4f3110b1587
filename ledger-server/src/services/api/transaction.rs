use actix_web::web::*;

use crate::handlers::transaction;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/transactions")
            .service(
                resource("")
                    .route(get().to(transaction::list))
                    .route(post().to(transaction::create)),
            )
            // Registered ahead of "/{transaction_id}" so "stats" is not parsed as an id
            .route("/stats", get().to(transaction::stats))
            .route("/stats/monthly", get().to(transaction::monthly))
            .service(
                resource("/{transaction_id}")
                    .route(get().to(transaction::get))
                    .route(put().to(transaction::update))
                    .route(delete().to(transaction::delete)),
            ),
    );
}
