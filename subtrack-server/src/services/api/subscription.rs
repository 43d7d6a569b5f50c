use actix_web::web::*;

use crate::handlers::subscription;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/subscriptions")
            .service(
                resource("")
                    .route(post().to(subscription::create))
                    .route(get().to(subscription::get_all)),
            )
            .service(
                resource("/{subscription_id}")
                    .route(get().to(subscription::get_one))
                    .route(patch().to(subscription::edit))
                    .route(delete().to(subscription::delete)),
            )
            .service(
                resource("/{subscription_id}/history")
                    .route(get().to(subscription::get_history)),
            ),
    );
}
