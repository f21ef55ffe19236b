// src/models/payment.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

pub const DEFAULT_CURRENCY: &str = "dkk";

/// Payment intent as handed back to the client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
}

/// MobilePay payment awaiting the user's approval
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MobilePayPayment {
    pub payment_id: String,
    pub redirect_url: String,
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Refund {
    pub success: bool,
    pub refund_id: String,
    pub amount: i64,
}

/// Body of POST /payment/create-intent and POST /payment/mobilepay
/// DOCUMENTATION: Fields are optional so a missing field becomes a 400 with
/// "Missing required fields" instead of a deserialization error.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub booking_id: Option<String>,
    #[validate(range(min = 1))]
    pub amount: Option<i64>,
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
}

/// Body of POST /payment/refund
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RefundRequest {
    pub payment_intent_id: Option<String>,
    #[validate(range(min = 1))]
    pub amount: Option<i64>,
}

/// Fields of a payment request that passed the presence check
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentOrder {
    pub booking_id: String,
    pub amount: i64,
    pub currency: String,
}

impl PaymentRequest {
    /// Presence check: bookingId non-empty, amount present and non-zero
    pub fn to_order(&self) -> Option<PaymentOrder> {
        let booking_id = self.booking_id.clone().filter(|b| !b.is_empty())?;
        let amount = self.amount.filter(|a| *a != 0)?;
        let currency = self
            .currency
            .clone()
            .filter(|c| !c.is_empty())
            .map(|c| c.to_lowercase())
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

        Some(PaymentOrder {
            booking_id,
            amount,
            currency,
        })
    }
}
