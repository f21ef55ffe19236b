// src/handlers/photos.rs
// DOCUMENTATION: HTTP handlers for booking photos
// PURPOSE: Upload data-URL photos, list them, sign and delete objects

use crate::errors::VangoError;
use crate::handlers::method_not_allowed;
use crate::models::{PhotoPathQuery, PhotoUploadRequest, SignedUrlRequest};
use crate::services::{decode_data_url, PhotoService, DEFAULT_MAX_WIDTH, DEFAULT_SIGNED_URL_TTL};
use actix_web::{web, HttpResponse, Responder};
use serde_json::json;

/// POST /bookings/{booking_id}/photos
/// Body carries the image as a base64 data URL
pub async fn upload_photo(
    service: web::Data<PhotoService>,
    path: web::Path<String>,
    req: web::Json<PhotoUploadRequest>,
) -> Result<impl Responder, VangoError> {
    let booking_id = path.into_inner();
    let req = req.into_inner();

    let user_id = req
        .user_id
        .filter(|u| !u.is_empty())
        .ok_or(VangoError::MissingFields)?;
    let data_url = req
        .data_url
        .filter(|d| !d.is_empty())
        .ok_or(VangoError::MissingFields)?;

    let mut file = decode_data_url(&data_url, req.file_name.as_deref())?;

    // Check the declared type before compression turns it into image/jpeg
    PhotoService::ensure_valid_file(&file)?;

    // Decoding and re-encoding is CPU bound
    if req.compress.unwrap_or(true) {
        file = web::block(move || PhotoService::compress_image(file, DEFAULT_MAX_WIDTH))
            .await
            .map_err(|e| VangoError::InternalError(e.to_string()))?;
    }

    let uploaded = service.upload_photo(file, &booking_id, &user_id).await?;
    Ok(HttpResponse::Created().json(uploaded))
}

/// GET /bookings/{booking_id}/photos
pub async fn list_photos(
    service: web::Data<PhotoService>,
    path: web::Path<String>,
) -> Result<impl Responder, VangoError> {
    let booking_id = path.into_inner();
    let photos = service.list_booking_photos(&booking_id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "bookingId": booking_id,
        "photos": photos
    })))
}

/// POST /photos/signed-url
pub async fn signed_url(
    service: web::Data<PhotoService>,
    req: web::Json<SignedUrlRequest>,
) -> Result<impl Responder, VangoError> {
    let path = req
        .path
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or(VangoError::MissingFields)?;
    let expires_in = req.expires_in.unwrap_or(DEFAULT_SIGNED_URL_TTL);

    let url = service.get_signed_url(path, expires_in).await?;

    Ok(HttpResponse::Ok().json(json!({
        "signedUrl": url,
        "expiresIn": expires_in
    })))
}

/// DELETE /photos?path=<key>
pub async fn delete_photo(
    service: web::Data<PhotoService>,
    query: web::Query<PhotoPathQuery>,
) -> Result<impl Responder, VangoError> {
    if service.delete_photo(&query.path).await? {
        Ok(HttpResponse::NoContent().finish())
    } else {
        Err(VangoError::NotFound(format!("photo {}", query.path)))
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/bookings/{booking_id}/photos")
            .route(web::post().to(upload_photo))
            .route(web::get().to(list_photos))
            .default_service(web::route().to(method_not_allowed)),
    )
    .service(
        web::resource("/photos/signed-url")
            .route(web::post().to(signed_url))
            .default_service(web::route().to(method_not_allowed)),
    )
    .service(
        web::resource("/photos")
            .route(web::delete().to(delete_photo))
            .default_service(web::route().to(method_not_allowed)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendClient;
    use crate::handlers::json_config;
    use actix_web::{http::StatusCode, test, App};
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use std::io::Cursor;

    fn png_data_url() -> String {
        let img = image::RgbImage::from_pixel(8, 6, image::Rgb([10, 120, 200]));
        let mut buf = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        format!("data:image/png;base64,{}", STANDARD.encode(buf.into_inner()))
    }

    async fn service() -> web::Data<PhotoService> {
        let backend = BackendClient::in_memory("http://backend.test");
        let service = PhotoService::new(&backend, "booking-photos");
        assert!(service.initialize_bucket().await);
        web::Data::new(service)
    }

    #[actix_web::test]
    async fn test_upload_list_sign_delete() {
        let app = test::init_service(
            App::new()
                .app_data(service().await)
                .app_data(json_config())
                .configure(super::config),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/bookings/b1/photos")
            .set_json(json!({"userId": "u1", "dataUrl": png_data_url()}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let uploaded: serde_json::Value = test::read_body_json(resp).await;
        let key = uploaded["path"].as_str().unwrap().to_string();
        assert!(key.starts_with("b1/u1/"));
        assert!(key.ends_with(".jpg"));

        let req = test::TestRequest::post()
            .uri("/bookings/b1/photos")
            .set_json(json!({"userId": "u2", "dataUrl": png_data_url(), "compress": false}))
            .to_request();
        let uploaded: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert!(uploaded["path"].as_str().unwrap().ends_with(".png"));

        let req = test::TestRequest::get().uri("/bookings/b1/photos").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["photos"].as_array().map(|p| p.len()), Some(2));

        let req = test::TestRequest::post()
            .uri("/photos/signed-url")
            .set_json(json!({"path": key}))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["expiresIn"], 3600);
        assert!(body["signedUrl"].as_str().is_some());

        let req = test::TestRequest::delete()
            .uri(&format!("/photos?path={}", key))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let req = test::TestRequest::delete()
            .uri(&format!("/photos?path={}", key))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_upload_requires_fields() {
        let app = test::init_service(
            App::new()
                .app_data(service().await)
                .app_data(json_config())
                .configure(super::config),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/bookings/b1/photos")
            .set_json(json!({"dataUrl": png_data_url()}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/bookings/b1/photos")
            .set_json(json!({"userId": "u1", "dataUrl": "data:text/plain;base64,aGVsbG8="}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        // PNG bytes under a type outside the allow-list stay rejected
        let disguised = png_data_url().replacen("image/png", "application/octet-stream", 1);
        let req = test::TestRequest::post()
            .uri("/bookings/b1/photos")
            .set_json(json!({"userId": "u1", "dataUrl": disguised}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get().uri("/bookings/b1/photos").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["photos"].as_array().map(|p| p.len()), Some(0));

        let req = test::TestRequest::put().uri("/bookings/b1/photos").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
