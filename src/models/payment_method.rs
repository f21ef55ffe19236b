// src/models/payment_method.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// A card a user saved for later bookings
/// DOCUMENTATION: `is_default` is not unique per user at the storage level,
/// so several rows may carry it at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SavedPaymentMethod {
    pub id: Uuid,
    pub user_id: String,
    pub card_last4: String,
    pub card_exp_month: i32,
    pub card_exp_year: i32,
    pub card_brand: Option<String>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

/// Request to save a new payment method
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewPaymentMethod {
    #[serde(default)]
    pub user_id: String,
    #[validate(length(equal = 4))]
    pub card_last4: String,
    #[validate(range(min = 1, max = 12))]
    pub card_exp_month: i32,
    #[validate(range(min = 2000, max = 2100))]
    pub card_exp_year: i32,
    pub card_brand: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

impl NewPaymentMethod {
    /// Last4 must be exactly four ASCII digits
    pub fn has_numeric_last4(&self) -> bool {
        self.card_last4.len() == 4 && self.card_last4.chars().all(|c| c.is_ascii_digit())
    }
}
