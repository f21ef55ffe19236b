// src/handlers/payment_methods.rs
// DOCUMENTATION: HTTP handlers for saved payment methods
// PURPOSE: List, save, select default and delete a user's cards

use crate::errors::VangoError;
use crate::handlers::method_not_allowed;
use crate::models::NewPaymentMethod;
use crate::services::PaymentMethodService;
use actix_web::{web, HttpResponse, Responder};
use serde_json::json;
use uuid::Uuid;

/// GET /users/{user_id}/payment-methods
pub async fn list_payment_methods(
    service: web::Data<PaymentMethodService>,
    path: web::Path<String>,
) -> Result<impl Responder, VangoError> {
    let methods = service.get_user_payment_methods(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(methods))
}

/// POST /users/{user_id}/payment-methods
/// Refuses a card the user already saved (same last4 and expiry)
pub async fn save_payment_method(
    service: web::Data<PaymentMethodService>,
    path: web::Path<String>,
    req: web::Json<NewPaymentMethod>,
) -> Result<impl Responder, VangoError> {
    let mut method = req.into_inner();
    method.user_id = path.into_inner();

    let duplicate = service
        .check_duplicate_card(
            &method.user_id,
            &method.card_last4,
            method.card_exp_month,
            method.card_exp_year,
        )
        .await?;
    if duplicate {
        return Err(VangoError::AlreadyExists(format!(
            "card ending in {}",
            method.card_last4
        )));
    }

    let saved = service.save_payment_method(method).await?;
    Ok(HttpResponse::Created().json(saved))
}

/// GET /users/{user_id}/payment-methods/default
/// `data` is null when the user has no default
pub async fn default_payment_method(
    service: web::Data<PaymentMethodService>,
    path: web::Path<String>,
) -> Result<impl Responder, VangoError> {
    let method = service
        .get_default_payment_method(&path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "data": method })))
}

/// PUT /users/{user_id}/payment-methods/{id}/default
pub async fn set_default_payment_method(
    service: web::Data<PaymentMethodService>,
    path: web::Path<(String, Uuid)>,
) -> Result<impl Responder, VangoError> {
    let (user_id, id) = path.into_inner();
    let updated = service.set_default_payment_method(id, &user_id).await?;
    Ok(HttpResponse::Ok().json(updated))
}

/// DELETE /users/{user_id}/payment-methods/{id}
pub async fn delete_payment_method(
    service: web::Data<PaymentMethodService>,
    path: web::Path<(String, Uuid)>,
) -> Result<impl Responder, VangoError> {
    let (user_id, id) = path.into_inner();

    if service.delete_payment_method(id, &user_id).await? {
        Ok(HttpResponse::NoContent().finish())
    } else {
        Err(VangoError::NotFound(format!("payment method {}", id)))
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/users/{user_id}/payment-methods")
            .service(
                web::resource("")
                    .route(web::get().to(list_payment_methods))
                    .route(web::post().to(save_payment_method))
                    .default_service(web::route().to(method_not_allowed)),
            )
            .service(
                web::resource("/default")
                    .route(web::get().to(default_payment_method))
                    .default_service(web::route().to(method_not_allowed)),
            )
            .service(
                web::resource("/{id}/default")
                    .route(web::put().to(set_default_payment_method))
                    .default_service(web::route().to(method_not_allowed)),
            )
            .service(
                web::resource("/{id}")
                    .route(web::delete().to(delete_payment_method))
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

    fn service() -> web::Data<PaymentMethodService> {
        web::Data::new(PaymentMethodService::new(
            &BackendClient::in_memory("http://backend.test"),
            false,
        ))
    }

    fn visa(last4: &str) -> serde_json::Value {
        json!({
            "cardLast4": last4,
            "cardExpMonth": 12,
            "cardExpYear": 2030,
            "cardBrand": "visa"
        })
    }

    #[actix_web::test]
    async fn test_save_duplicate_and_default() {
        let app = test::init_service(
            App::new()
                .app_data(service())
                .app_data(json_config())
                .configure(super::config),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/users/u1/payment-methods")
            .set_json(visa("4242"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let saved: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(saved["userId"], "u1");
        let id = saved["id"].as_str().unwrap().to_string();

        let req = test::TestRequest::post()
            .uri("/users/u1/payment-methods")
            .set_json(visa("4242"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let req = test::TestRequest::get()
            .uri("/users/u1/payment-methods/default")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert!(body["data"].is_null());

        let req = test::TestRequest::put()
            .uri(&format!("/users/u1/payment-methods/{}/default", id))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["isDefault"], true);

        let req = test::TestRequest::get()
            .uri("/users/u1/payment-methods/default")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["id"], id.as_str());

        let req = test::TestRequest::get().uri("/users/u1/payment-methods").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.as_array().map(|m| m.len()), Some(1));
    }

    #[actix_web::test]
    async fn test_delete_and_unknown_ids() {
        let app = test::init_service(
            App::new()
                .app_data(service())
                .app_data(json_config())
                .configure(super::config),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/users/u1/payment-methods")
            .set_json(visa("1111"))
            .to_request();
        let saved: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let id = saved["id"].as_str().unwrap().to_string();

        // Another user cannot delete it
        let req = test::TestRequest::delete()
            .uri(&format!("/users/u2/payment-methods/{}", id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::delete()
            .uri(&format!("/users/u1/payment-methods/{}", id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let req = test::TestRequest::put()
            .uri(&format!("/users/u1/payment-methods/{}/default", Uuid::new_v4()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::post()
            .uri("/users/u1/payment-methods")
            .set_json(json!({"cardLast4": "12", "cardExpMonth": 1, "cardExpYear": 2030}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
