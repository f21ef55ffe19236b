// src/handlers/geocoding.rs
// DOCUMENTATION: Geocoding diagnostic handlers
// PURPOSE: Exercise the configured geocoder against known addresses

use crate::handlers::method_not_allowed;
use crate::services::{GeocodingService, TEST_ADDRESSES};
use actix_web::{web, HttpResponse, Responder};

/// GET /geocoding/test
/// Geocode the fixed Danish test addresses, spaced out to respect API quotas
pub async fn test_geocoding(service: web::Data<GeocodingService>) -> impl Responder {
    let report = service.run_diagnostics(&TEST_ADDRESSES).await;
    HttpResponse::Ok().json(report)
}

/// GET /geocoding/validate-key
pub async fn validate_key(service: web::Data<GeocodingService>) -> impl Responder {
    HttpResponse::Ok().json(service.validate_key().await)
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/geocoding")
            .service(
                web::resource("/test")
                    .route(web::get().to(test_geocoding))
                    .default_service(web::route().to(method_not_allowed)),
            )
            .service(
                web::resource("/validate-key")
                    .route(web::get().to(validate_key))
                    .default_service(web::route().to(method_not_allowed)),
            ),
    );
}
