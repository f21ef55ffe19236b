// src/services/payment_provider.rs
// DOCUMENTATION: Payment provider integrations
// PURPOSE: Create card intents, MobilePay payments and refunds through a
// provider selected by configuration

use crate::config::{Config, PaymentProviderKind};
use crate::errors::VangoError;
use crate::models::{MobilePayPayment, PaymentIntent, PaymentOrder, Refund};
use async_trait::async_trait;
use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;

/// Operations the payment routes need from a provider
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn create_intent(&self, order: &PaymentOrder) -> Result<PaymentIntent, VangoError>;

    async fn create_mobilepay_payment(
        &self,
        order: &PaymentOrder,
    ) -> Result<MobilePayPayment, VangoError>;

    async fn refund(&self, payment_intent_id: &str, amount: i64) -> Result<Refund, VangoError>;
}

/// Build the provider named by PAYMENT_PROVIDER
pub fn provider_from_config(config: &Config, http: Client) -> Arc<dyn PaymentProvider> {
    match config.payment_provider {
        PaymentProviderKind::Mock => {
            log::warn!("Using mock payment provider - no money moves");
            Arc::new(MockPaymentProvider::new(config.site_url.clone()))
        }
        PaymentProviderKind::Stripe => Arc::new(StripePaymentProvider::new(
            http,
            config.stripe_secret_key.clone(),
            config.site_url.clone(),
        )),
    }
}

/// Where the user lands after approving a MobilePay payment
fn mobilepay_return_url(site_url: &str, booking_id: &str) -> String {
    format!("{}/booking/{}/payment/mobilepay", site_url, booking_id)
}

/// Placeholder provider returning synthetic identifiers
/// DOCUMENTATION: Ids look like `pi_<epoch_ms>_<9 random chars>`; nothing is
/// persisted and nothing is charged.
pub struct MockPaymentProvider {
    site_url: String,
}

impl MockPaymentProvider {
    pub fn new(site_url: String) -> Self {
        Self { site_url }
    }

    fn synthetic_id(prefix: &str) -> String {
        format!("{}_{}_{}", prefix, Utc::now().timestamp_millis(), random_suffix())
    }
}

fn random_suffix() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(|c| (c as char).to_ascii_lowercase())
        .collect()
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn create_intent(&self, order: &PaymentOrder) -> Result<PaymentIntent, VangoError> {
        let id = Self::synthetic_id("pi");
        log::info!(
            "Mock payment intent {} for booking {}: {} {}",
            id,
            order.booking_id,
            order.amount,
            order.currency
        );

        Ok(PaymentIntent {
            client_secret: format!("{}_secret_{}", id, random_suffix()),
            id,
            amount: order.amount,
            currency: order.currency.clone(),
            status: "requires_payment_method".to_string(),
        })
    }

    async fn create_mobilepay_payment(
        &self,
        order: &PaymentOrder,
    ) -> Result<MobilePayPayment, VangoError> {
        let payment_id = Self::synthetic_id("mp");
        let redirect_url = format!(
            "{}?paymentId={}",
            mobilepay_return_url(&self.site_url, &order.booking_id),
            payment_id
        );

        log::info!("Mock MobilePay payment {} for booking {}", payment_id, order.booking_id);

        Ok(MobilePayPayment {
            payment_id,
            redirect_url,
            amount: order.amount,
        })
    }

    async fn refund(&self, payment_intent_id: &str, amount: i64) -> Result<Refund, VangoError> {
        let refund_id = Self::synthetic_id("re");
        log::info!("Mock refund {} of {} for {}", refund_id, amount, payment_intent_id);

        Ok(Refund {
            success: true,
            refund_id,
            amount,
        })
    }
}

/// Stripe REST API provider
pub struct StripePaymentProvider {
    client: Client,
    secret_key: String,
    site_url: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct StripeIntent {
    id: String,
    client_secret: Option<String>,
    amount: i64,
    currency: String,
    status: String,
    next_action: Option<StripeNextAction>,
}

#[derive(Debug, Deserialize)]
struct StripeNextAction {
    redirect_to_url: Option<StripeRedirect>,
}

#[derive(Debug, Deserialize)]
struct StripeRedirect {
    url: String,
}

#[derive(Debug, Deserialize)]
struct StripeRefund {
    id: String,
    amount: i64,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
}

impl StripePaymentProvider {
    pub fn new(client: Client, secret_key: String, site_url: String) -> Self {
        Self {
            client,
            secret_key,
            site_url,
            base_url: "https://api.stripe.com/v1".to_string(),
        }
    }

    async fn post_form<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        form: &[(&str, String)],
    ) -> Result<T, VangoError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.secret_key, None::<&str>)
            .form(form)
            .send()
            .await
            .map_err(|e| {
                log::error!("Stripe request to {} failed: {}", path, e);
                VangoError::ExternalApiError(format!("Request failed: {}", e))
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            log::error!("Stripe rate limit hit on {}", path);
            return Err(VangoError::RateLimitExceeded);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<StripeErrorBody>(&body)
                .ok()
                .and_then(|b| b.error.message)
                .unwrap_or(body);
            log::error!("Stripe API error {} on {}: {}", status, path, message);
            return Err(VangoError::ExternalApiError(message));
        }

        response.json::<T>().await.map_err(|e| {
            log::error!("Failed to parse Stripe response from {}: {}", path, e);
            VangoError::ExternalApiError(format!("Parse error: {}", e))
        })
    }
}

#[async_trait]
impl PaymentProvider for StripePaymentProvider {
    fn name(&self) -> &'static str {
        "stripe"
    }

    async fn create_intent(&self, order: &PaymentOrder) -> Result<PaymentIntent, VangoError> {
        let intent: StripeIntent = self
            .post_form(
                "/payment_intents",
                &[
                    ("amount", order.amount.to_string()),
                    ("currency", order.currency.clone()),
                    ("metadata[booking_id]", order.booking_id.clone()),
                    ("automatic_payment_methods[enabled]", "true".to_string()),
                ],
            )
            .await?;

        Ok(PaymentIntent {
            id: intent.id,
            client_secret: intent.client_secret.unwrap_or_default(),
            amount: intent.amount,
            currency: intent.currency,
            status: intent.status,
        })
    }

    async fn create_mobilepay_payment(
        &self,
        order: &PaymentOrder,
    ) -> Result<MobilePayPayment, VangoError> {
        let intent: StripeIntent = self
            .post_form(
                "/payment_intents",
                &[
                    ("amount", order.amount.to_string()),
                    ("currency", order.currency.clone()),
                    ("metadata[booking_id]", order.booking_id.clone()),
                    ("payment_method_types[]", "mobilepay".to_string()),
                    ("payment_method_data[type]", "mobilepay".to_string()),
                    ("confirm", "true".to_string()),
                    (
                        "return_url",
                        mobilepay_return_url(&self.site_url, &order.booking_id),
                    ),
                ],
            )
            .await?;

        let redirect_url = intent
            .next_action
            .and_then(|a| a.redirect_to_url)
            .map(|r| r.url)
            .ok_or_else(|| {
                VangoError::ExternalApiError("MobilePay payment has no redirect URL".to_string())
            })?;

        Ok(MobilePayPayment {
            payment_id: intent.id,
            redirect_url,
            amount: intent.amount,
        })
    }

    async fn refund(&self, payment_intent_id: &str, amount: i64) -> Result<Refund, VangoError> {
        let refund: StripeRefund = self
            .post_form(
                "/refunds",
                &[
                    ("payment_intent", payment_intent_id.to_string()),
                    ("amount", amount.to_string()),
                ],
            )
            .await?;

        let success = matches!(refund.status.as_deref(), Some("succeeded") | Some("pending"));

        Ok(Refund {
            success,
            refund_id: refund.id,
            amount: refund.amount,
        })
    }
}
