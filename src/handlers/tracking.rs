// src/handlers/tracking.rs
// DOCUMENTATION: HTTP handlers for booking location tracking
// PURPOSE: Let transporter apps report positions and customers read them

use crate::errors::VangoError;
use crate::handlers::method_not_allowed;
use crate::models::{LocationReportRequest, StartTrackingRequest};
use crate::services::LocationService;
use actix_web::{web, HttpResponse, Responder};
use serde_json::json;
use validator::Validate;

/// POST /tracking/{booking_id}/start
pub async fn start_tracking(
    service: web::Data<LocationService>,
    path: web::Path<String>,
    req: web::Json<StartTrackingRequest>,
) -> Result<impl Responder, VangoError> {
    if let Err(e) = req.validate() {
        return Err(VangoError::ValidationError(e.to_string()));
    }

    let booking_id = path.into_inner();
    let started = service.start_tracking(&booking_id, &req.transporter_id).await;

    Ok(HttpResponse::Ok().json(json!({
        "bookingId": booking_id,
        "tracking": started
    })))
}

/// POST /tracking/{booking_id}/location
/// Record one position report
pub async fn report_location(
    service: web::Data<LocationService>,
    path: web::Path<String>,
    req: web::Json<LocationReportRequest>,
) -> Result<impl Responder, VangoError> {
    if let Err(e) = req.validate() {
        return Err(VangoError::ValidationError(e.to_string()));
    }

    let booking_id = path.into_inner();
    let update = service
        .update_location(&booking_id, &req.transporter_id, req.lat, req.lng)
        .await?;

    Ok(HttpResponse::Created().json(update))
}

/// GET /tracking/{booking_id}/latest
pub async fn latest_location(
    service: web::Data<LocationService>,
    path: web::Path<String>,
) -> Result<impl Responder, VangoError> {
    let booking_id = path.into_inner();

    match service.get_latest_location(&booking_id).await? {
        Some(update) => Ok(HttpResponse::Ok().json(update)),
        None => Err(VangoError::NotFound(format!(
            "No location reported for booking {}",
            booking_id
        ))),
    }
}

/// GET /tracking/{booking_id}/history
pub async fn location_history(
    service: web::Data<LocationService>,
    path: web::Path<String>,
) -> Result<impl Responder, VangoError> {
    let history = service.get_location_history(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(history))
}

/// GET /tracking/{booking_id}/trail
/// Route so far as a GeoJSON LineString feature
pub async fn trail(
    service: web::Data<LocationService>,
    path: web::Path<String>,
) -> Result<impl Responder, VangoError> {
    let booking_id = path.into_inner();
    let feature = service.trail_geojson(&booking_id).await?;

    let points = feature
        .property("points")
        .and_then(|p| p.as_u64())
        .unwrap_or(0);
    if points == 0 {
        return Err(VangoError::NotFound(format!(
            "No location reported for booking {}",
            booking_id
        )));
    }

    Ok(HttpResponse::Ok()
        .content_type("application/geo+json")
        .json(feature))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/tracking/{booking_id}")
            .service(
                web::resource("/start")
                    .route(web::post().to(start_tracking))
                    .default_service(web::route().to(method_not_allowed)),
            )
            .service(
                web::resource("/location")
                    .route(web::post().to(report_location))
                    .default_service(web::route().to(method_not_allowed)),
            )
            .service(
                web::resource("/latest")
                    .route(web::get().to(latest_location))
                    .default_service(web::route().to(method_not_allowed)),
            )
            .service(
                web::resource("/history")
                    .route(web::get().to(location_history))
                    .default_service(web::route().to(method_not_allowed)),
            )
            .service(
                web::resource("/trail")
                    .route(web::get().to(trail))
                    .default_service(web::route().to(method_not_allowed)),
            ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendClient;
    use crate::handlers::json_config;
    use actix_web::{http::StatusCode, test, App};

    fn service() -> web::Data<LocationService> {
        web::Data::new(LocationService::new(&BackendClient::in_memory(
            "http://backend.test",
        )))
    }

    #[actix_web::test]
    async fn test_report_then_read_latest_and_trail() {
        let app = test::init_service(
            App::new()
                .app_data(service())
                .app_data(json_config())
                .configure(super::config),
        )
        .await;

        let req = test::TestRequest::get().uri("/tracking/b1/latest").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::post()
            .uri("/tracking/b1/start")
            .set_json(json!({"transporterId": "t1"}))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["tracking"], true);

        for (lat, lng) in [(55.6761, 12.5683), (55.6800, 12.5700)] {
            let req = test::TestRequest::post()
                .uri("/tracking/b1/location")
                .set_json(json!({"transporterId": "t1", "lat": lat, "lng": lng}))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::CREATED);
        }

        let req = test::TestRequest::get().uri("/tracking/b1/latest").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["bookingId"], "b1");
        assert_eq!(body["lat"], 55.68);

        let req = test::TestRequest::get().uri("/tracking/b1/trail").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["geometry"]["type"], "LineString");
        assert_eq!(body["properties"]["points"], 2);

        let req = test::TestRequest::get().uri("/tracking/b1/history").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.as_array().map(|a| a.len()), Some(2));
    }

    #[actix_web::test]
    async fn test_rejects_bad_reports() {
        let app = test::init_service(
            App::new()
                .app_data(service())
                .app_data(json_config())
                .configure(super::config),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/tracking/b1/location")
            .set_json(json!({"transporterId": "t1", "lat": 95.0, "lng": 12.0}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/tracking/b1/location")
            .set_json(json!({"transporterId": "t1"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get().uri("/tracking/b1/trail").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::delete().uri("/tracking/b1/latest").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
