use actix_web::web::*;

use crate::handlers::category;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/categories")
            .service(
                resource("")
                    .route(get().to(category::list))
                    .route(post().to(category::create)),
            )
            .service(
                resource("/{category_id}")
                    .route(get().to(category::get))
                    .route(put().to(category::update))
                    .route(delete().to(category::delete)),
            ),
    );
}
