use actix_web::web::*;

use crate::handlers::spending;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/spending")
            .service(resource("/history").route(get().to(spending::history)))
            .service(resource("/categories").route(get().to(spending::categories)))
            .service(resource("/rates").route(get().to(spending::rates))),
    );
}
