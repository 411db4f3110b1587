use actix_web::web::*;

use crate::handlers::auth;

use super::RouteLimiters;

pub fn configure(cfg: &mut ServiceConfig, limiters: RouteLimiters) {
    cfg.service(
        scope("/auth")
            .service(
                resource("/signup")
                    .route(post().to(auth::sign_up))
                    .wrap(limiters.create_user),
            )
            .service(
                resource("/login")
                    .route(post().to(auth::log_in))
                    .wrap(limiters.password),
            )
            .service(
                resource("/token/refresh")
                    .route(post().to(auth::refresh_tokens))
                    .wrap(limiters.refresh_tokens),
            )
            .service(resource("/me").route(get().to(auth::me))),
    );
}
