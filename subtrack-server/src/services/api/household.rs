use actix_web::web::*;

use crate::handlers::household;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/household")
            .service(
                resource("")
                    .route(post().to(household::create))
                    .route(get().to(household::get))
                    .route(delete().to(household::leave)),
            )
            .service(resource("/invite").route(post().to(household::invite)))
            .service(resource("/accept").route(put().to(household::accept_invitation))),
    );
}
