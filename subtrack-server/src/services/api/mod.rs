use actix_web::web::*;

mod auth;
mod health;
mod household;
mod import;
mod spending;
mod subscription;
mod user;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/api")
            .configure(auth::configure)
            .configure(health::configure)
            .configure(household::configure)
            .configure(import::configure)
            .configure(spending::configure)
            .configure(subscription::configure)
            .configure(user::configure),
    );
}
