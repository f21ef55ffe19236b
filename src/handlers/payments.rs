// src/handlers/payments.rs
// DOCUMENTATION: HTTP handlers for payment operations
// PURPOSE: Card intents, MobilePay payments and refunds (POST only)

use crate::errors::VangoError;
use crate::handlers::method_not_allowed;
use crate::models::{PaymentRequest, RefundRequest};
use crate::services::PaymentProvider;
use actix_web::{web, HttpResponse, Responder};
use validator::Validate;

/// POST /payment/create-intent
pub async fn create_intent(
    provider: web::Data<dyn PaymentProvider>,
    req: web::Json<PaymentRequest>,
) -> Result<impl Responder, VangoError> {
    let order = req.to_order().ok_or(VangoError::MissingFields)?;

    if let Err(e) = req.validate() {
        return Err(VangoError::ValidationError(e.to_string()));
    }

    let intent = provider.create_intent(&order).await?;
    log::info!(
        "Created payment intent {} for booking {} via {}",
        intent.id,
        order.booking_id,
        provider.name()
    );

    Ok(HttpResponse::Ok().json(intent))
}

/// POST /payment/mobilepay
pub async fn create_mobilepay(
    provider: web::Data<dyn PaymentProvider>,
    req: web::Json<PaymentRequest>,
) -> Result<impl Responder, VangoError> {
    let order = req.to_order().ok_or(VangoError::MissingFields)?;

    if let Err(e) = req.validate() {
        return Err(VangoError::ValidationError(e.to_string()));
    }

    let payment = provider.create_mobilepay_payment(&order).await?;
    log::info!(
        "Created MobilePay payment {} for booking {}",
        payment.payment_id,
        order.booking_id
    );

    Ok(HttpResponse::Ok().json(payment))
}

/// POST /payment/refund
pub async fn refund(
    provider: web::Data<dyn PaymentProvider>,
    req: web::Json<RefundRequest>,
) -> Result<impl Responder, VangoError> {
    let payment_intent_id = req
        .payment_intent_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or(VangoError::MissingFields)?;
    let amount = req
        .amount
        .filter(|a| *a != 0)
        .ok_or(VangoError::MissingFields)?;

    if let Err(e) = req.validate() {
        return Err(VangoError::ValidationError(e.to_string()));
    }

    let refund = provider.refund(payment_intent_id, amount).await?;
    log::info!("Refunded {} on {}", amount, payment_intent_id);

    Ok(HttpResponse::Ok().json(refund))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/payment")
            .service(
                web::resource("/create-intent")
                    .route(web::post().to(create_intent))
                    .default_service(web::route().to(method_not_allowed)),
            )
            .service(
                web::resource("/mobilepay")
                    .route(web::post().to(create_mobilepay))
                    .default_service(web::route().to(method_not_allowed)),
            )
            .service(
                web::resource("/refund")
                    .route(web::post().to(refund))
                    .default_service(web::route().to(method_not_allowed)),
            ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::json_config;
    use crate::services::MockPaymentProvider;
    use actix_web::{http::StatusCode, test, App};
    use serde_json::json;
    use std::sync::Arc;

    fn provider() -> web::Data<dyn PaymentProvider> {
        let provider: Arc<dyn PaymentProvider> =
            Arc::new(MockPaymentProvider::new("http://localhost:3000".to_string()));
        web::Data::from(provider)
    }

    #[actix_web::test]
    async fn test_create_intent() {
        let app = test::init_service(
            App::new()
                .app_data(provider())
                .app_data(json_config())
                .configure(super::config),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/payment/create-intent")
            .set_json(json!({"bookingId": "b1", "amount": 1000}))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["status"], "requires_payment_method");
        assert_eq!(body["amount"], 1000);
        assert_eq!(body["currency"], "dkk");
        assert!(body["id"].as_str().unwrap().starts_with("pi_"));
        assert!(body["clientSecret"].as_str().unwrap().contains("_secret_"));
    }

    #[actix_web::test]
    async fn test_missing_fields_and_wrong_method() {
        let app = test::init_service(
            App::new()
                .app_data(provider())
                .app_data(json_config())
                .configure(super::config),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/payment/create-intent")
            .set_json(json!({"bookingId": "b1"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Missing required fields");

        let req = test::TestRequest::get().uri("/payment/create-intent").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);

        let req = test::TestRequest::post()
            .uri("/payment/refund")
            .set_json(json!({"amount": 500}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_mobilepay_and_refund() {
        let app = test::init_service(
            App::new()
                .app_data(provider())
                .app_data(json_config())
                .configure(super::config),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/payment/mobilepay")
            .set_json(json!({"bookingId": "b7", "amount": 2500}))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert!(body["redirectUrl"]
            .as_str()
            .unwrap()
            .starts_with("http://localhost:3000/booking/b7/payment/mobilepay"));
        assert_eq!(body["amount"], 2500);

        let req = test::TestRequest::post()
            .uri("/payment/refund")
            .set_json(json!({"paymentIntentId": "pi_1", "amount": 2500}))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
        assert!(body["refundId"].as_str().unwrap().starts_with("re_"));
    }
}
