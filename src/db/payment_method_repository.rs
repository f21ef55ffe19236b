// src/db/payment_method_repository.rs
// DOCUMENTATION: Saved payment method storage
// PURPOSE: CRUD over the saved_payment_methods table

use crate::errors::VangoError;
use crate::models::{NewPaymentMethod, SavedPaymentMethod};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Storage seam for saved payment methods
#[async_trait]
pub trait PaymentMethodStore: Send + Sync {
    /// Default first, then newest first
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<SavedPaymentMethod>, VangoError>;

    /// A row with is_default set, None when the user has none
    async fn find_default(&self, user_id: &str) -> Result<Option<SavedPaymentMethod>, VangoError>;

    /// Insert a row. With `exclusive` and `is_default` set, the user's
    /// other defaults are cleared in the same write.
    async fn insert(
        &self,
        method: &NewPaymentMethod,
        exclusive: bool,
    ) -> Result<SavedPaymentMethod, VangoError>;

    /// Set is_default on one row. With `exclusive`, the user's other rows
    /// are cleared too. None (and nothing changed) when no row matches id
    /// and user.
    async fn set_default(
        &self,
        id: Uuid,
        user_id: &str,
        exclusive: bool,
    ) -> Result<Option<SavedPaymentMethod>, VangoError>;

    /// True when a row was removed
    async fn delete(&self, id: Uuid, user_id: &str) -> Result<bool, VangoError>;

    async fn card_exists(
        &self,
        user_id: &str,
        last4: &str,
        exp_month: i32,
        exp_year: i32,
    ) -> Result<bool, VangoError>;
}

pub struct PgPaymentMethodStore {
    pool: PgPool,
}

impl PgPaymentMethodStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>, VangoError> {
        self.pool.begin().await.map_err(|e| {
            log::error!("Failed to open transaction: {}", e);
            VangoError::DatabaseError(format!("Begin failed: {}", e))
        })
    }
}

const COLUMNS: &str =
    "id, user_id, card_last4, card_exp_month, card_exp_year, card_brand, is_default, created_at";

/// Unset is_default on the user's rows, except `keep`
async fn clear_defaults(
    tx: &mut Transaction<'_, Postgres>,
    user_id: &str,
    keep: Option<Uuid>,
) -> Result<(), VangoError> {
    sqlx::query(
        "UPDATE saved_payment_methods SET is_default = FALSE \
         WHERE user_id = $1 AND is_default = TRUE AND ($2::uuid IS NULL OR id <> $2)",
    )
    .bind(user_id)
    .bind(keep)
    .execute(&mut **tx)
    .await
    .map_err(|e| {
        log::error!("Failed to clear default payment methods for user {}: {}", user_id, e);
        VangoError::DatabaseError(format!("Clear defaults failed: {}", e))
    })?;

    Ok(())
}

async fn commit(tx: Transaction<'_, Postgres>) -> Result<(), VangoError> {
    tx.commit().await.map_err(|e| {
        log::error!("Failed to commit payment method change: {}", e);
        VangoError::DatabaseError(format!("Commit failed: {}", e))
    })
}

#[async_trait]
impl PaymentMethodStore for PgPaymentMethodStore {
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<SavedPaymentMethod>, VangoError> {
        let sql = format!(
            "SELECT {} FROM saved_payment_methods WHERE user_id = $1 \
             ORDER BY is_default DESC, created_at DESC",
            COLUMNS
        );

        sqlx::query_as::<_, SavedPaymentMethod>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                log::error!("Failed to fetch payment methods for user {}: {}", user_id, e);
                VangoError::DatabaseError(format!("Fetch payment methods failed: {}", e))
            })
    }

    async fn find_default(&self, user_id: &str) -> Result<Option<SavedPaymentMethod>, VangoError> {
        let sql = format!(
            "SELECT {} FROM saved_payment_methods WHERE user_id = $1 AND is_default = TRUE \
             ORDER BY created_at DESC LIMIT 1",
            COLUMNS
        );

        sqlx::query_as::<_, SavedPaymentMethod>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                log::error!("Failed to fetch default payment method for user {}: {}", user_id, e);
                VangoError::DatabaseError(format!("Fetch default failed: {}", e))
            })
    }

    async fn insert(
        &self,
        method: &NewPaymentMethod,
        exclusive: bool,
    ) -> Result<SavedPaymentMethod, VangoError> {
        let mut tx = self.begin().await?;

        if exclusive && method.is_default {
            clear_defaults(&mut tx, &method.user_id, None).await?;
        }

        let sql = format!(
            "INSERT INTO saved_payment_methods \
             (user_id, card_last4, card_exp_month, card_exp_year, card_brand, is_default) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            COLUMNS
        );

        let saved = sqlx::query_as::<_, SavedPaymentMethod>(&sql)
            .bind(&method.user_id)
            .bind(&method.card_last4)
            .bind(method.card_exp_month)
            .bind(method.card_exp_year)
            .bind(&method.card_brand)
            .bind(method.is_default)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                log::error!("Failed to save payment method: {}", e);
                VangoError::DatabaseError(format!("Save payment method failed: {}", e))
            })?;

        commit(tx).await?;
        Ok(saved)
    }

    async fn set_default(
        &self,
        id: Uuid,
        user_id: &str,
        exclusive: bool,
    ) -> Result<Option<SavedPaymentMethod>, VangoError> {
        let mut tx = self.begin().await?;

        let sql = format!(
            "UPDATE saved_payment_methods SET is_default = TRUE \
             WHERE id = $1 AND user_id = $2 RETURNING {}",
            COLUMNS
        );

        let updated = sqlx::query_as::<_, SavedPaymentMethod>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| {
                log::error!("Failed to set default payment method {}: {}", id, e);
                VangoError::DatabaseError(format!("Set default failed: {}", e))
            })?;

        // Dropping tx without commit rolls back; other defaults stay as they were
        let Some(updated) = updated else {
            return Ok(None);
        };

        if exclusive {
            clear_defaults(&mut tx, user_id, Some(id)).await?;
        }

        commit(tx).await?;
        Ok(Some(updated))
    }

    async fn delete(&self, id: Uuid, user_id: &str) -> Result<bool, VangoError> {
        let result = sqlx::query("DELETE FROM saved_payment_methods WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                log::error!("Failed to delete payment method {}: {}", id, e);
                VangoError::DatabaseError(format!("Delete payment method failed: {}", e))
            })?;

        Ok(result.rows_affected() > 0)
    }

    async fn card_exists(
        &self,
        user_id: &str,
        last4: &str,
        exp_month: i32,
        exp_year: i32,
    ) -> Result<bool, VangoError> {
        let found: Option<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM saved_payment_methods \
             WHERE user_id = $1 AND card_last4 = $2 AND card_exp_month = $3 AND card_exp_year = $4 \
             LIMIT 1",
        )
        .bind(user_id)
        .bind(last4)
        .bind(exp_month)
        .bind(exp_year)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            log::error!("Failed to check duplicate card for user {}: {}", user_id, e);
            VangoError::DatabaseError(format!("Duplicate check failed: {}", e))
        })?;

        Ok(found.is_some())
    }
}
