use actix_web::HttpResponse;

pub async fn heartbeat() -> HttpResponse {
    HttpResponse::Ok().finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    use actix_web::http::StatusCode;
    use actix_web::web;
    use actix_web::{test, App};

    #[actix_web::test]
    async fn test_heartbeat() {
        let app = test::init_service(
            App::new().route("/api/health", web::get().to(heartbeat)),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/health").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
    }
}
