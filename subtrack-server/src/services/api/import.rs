use actix_web::web::*;

use crate::handlers::import;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/import").service(resource("/reconcile").route(post().to(import::reconcile))),
    );
}
