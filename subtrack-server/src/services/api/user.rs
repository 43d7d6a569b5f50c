use actix_web::web::*;

use crate::handlers::user;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/user")
            .service(
                resource("")
                    .route(get().to(user::get))
                    .route(patch().to(user::edit_prefs)),
            ),
    );
}
