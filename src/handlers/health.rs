// src/handlers/health.rs
// DOCUMENTATION: Health check handlers
// PURPOSE: Service liveness and managed backend reachability

use crate::config::Config;
use crate::handlers::method_not_allowed;
use crate::services::BackendHealthService;
use actix_web::{web, HttpResponse, Responder};
use serde_json::json;

pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "service": "vango",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// GET /health/backend
pub async fn backend_health(
    config: web::Data<Config>,
    http: web::Data<reqwest::Client>,
) -> impl Responder {
    let report = BackendHealthService::check(http.get_ref(), config.get_ref()).await;
    HttpResponse::Ok().json(report)
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/health")
            .route(web::get().to(health_check))
            .default_service(web::route().to(method_not_allowed)),
    )
    .service(
        web::resource("/health/backend")
            .route(web::get().to(backend_health))
            .default_service(web::route().to(method_not_allowed)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test, App};

    #[actix_web::test]
    async fn test_health_and_backend_health() {
        let mut config = Config::for_tests();
        config.backend_anon_key = String::new();

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(config))
                .app_data(web::Data::new(reqwest::Client::new()))
                .configure(super::config),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::get().uri("/health/backend").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["environment"]["backendAnonKeyConfigured"], false);
        assert_eq!(body["connectivity"]["reachable"], false);

        let resp = test::call_service(&app, test::TestRequest::post().uri("/health").to_request()).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
