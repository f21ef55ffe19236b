// src/services/payment_method_service.rs
// DOCUMENTATION: Saved payment methods
// PURPOSE: List, save, select default, delete and de-duplicate user cards

use crate::config::BackendClient;
use crate::db::PaymentMethodStore;
use crate::errors::VangoError;
use crate::models::{NewPaymentMethod, SavedPaymentMethod};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

pub struct PaymentMethodService {
    store: Arc<dyn PaymentMethodStore>,
    /// Clear the user's other defaults when a new default is set
    exclusive_default: bool,
}

impl PaymentMethodService {
    pub fn new(backend: &BackendClient, exclusive_default: bool) -> Self {
        Self {
            store: backend.payment_methods.clone(),
            exclusive_default,
        }
    }

    /// Default first, then newest first
    pub async fn get_user_payment_methods(
        &self,
        user_id: &str,
    ) -> Result<Vec<SavedPaymentMethod>, VangoError> {
        self.store.list_for_user(user_id).await
    }

    /// Ok(None) when the user has no default
    pub async fn get_default_payment_method(
        &self,
        user_id: &str,
    ) -> Result<Option<SavedPaymentMethod>, VangoError> {
        self.store.find_default(user_id).await
    }

    /// Insert a payment method
    /// DOCUMENTATION: Does not de-duplicate; call check_duplicate_card first.
    /// In exclusive mode a card saved as default replaces the user's other
    /// defaults.
    pub async fn save_payment_method(
        &self,
        method: NewPaymentMethod,
    ) -> Result<SavedPaymentMethod, VangoError> {
        if method.user_id.is_empty() {
            return Err(VangoError::MissingFields);
        }

        if let Err(e) = method.validate() {
            return Err(VangoError::ValidationError(e.to_string()));
        }

        if !method.has_numeric_last4() {
            return Err(VangoError::ValidationError(
                "cardLast4 must be four digits".to_string(),
            ));
        }

        let saved = self
            .store
            .insert(&method, self.exclusive_default)
            .await?;
        log::info!("Saved payment method {} for user {}", saved.id, saved.user_id);
        Ok(saved)
    }

    /// Mark a payment method as the user's default
    /// DOCUMENTATION: Unless exclusive mode is on, the user's other defaults
    /// are left set, so several rows can be default at once.
    pub async fn set_default_payment_method(
        &self,
        id: Uuid,
        user_id: &str,
    ) -> Result<SavedPaymentMethod, VangoError> {
        let updated = self
            .store
            .set_default(id, user_id, self.exclusive_default)
            .await?
            .ok_or_else(|| VangoError::NotFound(format!("payment method {}", id)))?;

        log::info!("Payment method {} is now default for user {}", id, user_id);
        Ok(updated)
    }

    /// True when a row was removed
    pub async fn delete_payment_method(&self, id: Uuid, user_id: &str) -> Result<bool, VangoError> {
        let deleted = self.store.delete(id, user_id).await?;
        if deleted {
            log::info!("Deleted payment method {} for user {}", id, user_id);
        }
        Ok(deleted)
    }

    /// Whether the user already saved a card with this last4 and expiry
    /// DOCUMENTATION: Advisory only; concurrent saves can still duplicate.
    pub async fn check_duplicate_card(
        &self,
        user_id: &str,
        last4: &str,
        exp_month: i32,
        exp_year: i32,
    ) -> Result<bool, VangoError> {
        self.store
            .card_exists(user_id, last4, exp_month, exp_year)
            .await
    }
}
