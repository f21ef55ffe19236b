// src/db/location_repository.rs
// DOCUMENTATION: Location row storage and change feed
// PURPOSE: Insert and read transporter positions, stream new rows per booking

use crate::errors::VangoError;
use crate::models::{LocationUpdate, NewLocationUpdate};
use async_trait::async_trait;
use sqlx::postgres::PgListener;
use sqlx::PgPool;
use tokio::sync::mpsc;

/// Postgres channel the insert trigger notifies with the new row as JSON
pub const LOCATION_CHANNEL: &str = "location_updates";

/// Capacity of a per-subscription delivery queue
pub const FEED_CAPACITY: usize = 64;

/// Storage seam for location rows
#[async_trait]
pub trait LocationStore: Send + Sync {
    async fn insert(&self, update: &NewLocationUpdate) -> Result<LocationUpdate, VangoError>;

    /// Newest row for the booking, None when the booking has no rows
    async fn latest(&self, booking_id: &str) -> Result<Option<LocationUpdate>, VangoError>;

    /// All rows for the booking, oldest first
    async fn history(&self, booking_id: &str) -> Result<Vec<LocationUpdate>, VangoError>;

    /// Receive every row inserted for the booking after this call
    async fn subscribe(&self, booking_id: &str)
        -> Result<mpsc::Receiver<LocationUpdate>, VangoError>;
}

pub struct PgLocationStore {
    pool: PgPool,
}

impl PgLocationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LocationStore for PgLocationStore {
    async fn insert(&self, update: &NewLocationUpdate) -> Result<LocationUpdate, VangoError> {
        sqlx::query_as::<_, LocationUpdate>(
            r#"
            INSERT INTO location_updates (booking_id, transporter_id, lat, lng)
            VALUES ($1, $2, $3, $4)
            RETURNING id, booking_id, transporter_id, lat, lng, created_at
            "#,
        )
        .bind(&update.booking_id)
        .bind(&update.transporter_id)
        .bind(update.lat)
        .bind(update.lng)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            log::error!("Failed to insert location for booking {}: {}", update.booking_id, e);
            VangoError::DatabaseError(format!("Insert location failed: {}", e))
        })
    }

    async fn latest(&self, booking_id: &str) -> Result<Option<LocationUpdate>, VangoError> {
        sqlx::query_as::<_, LocationUpdate>(
            r#"
            SELECT id, booking_id, transporter_id, lat, lng, created_at
            FROM location_updates
            WHERE booking_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            log::error!("Failed to fetch latest location for booking {}: {}", booking_id, e);
            VangoError::DatabaseError(format!("Fetch location failed: {}", e))
        })
    }

    async fn history(&self, booking_id: &str) -> Result<Vec<LocationUpdate>, VangoError> {
        sqlx::query_as::<_, LocationUpdate>(
            r#"
            SELECT id, booking_id, transporter_id, lat, lng, created_at
            FROM location_updates
            WHERE booking_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            log::error!("Failed to fetch location history for booking {}: {}", booking_id, e);
            VangoError::DatabaseError(format!("Fetch history failed: {}", e))
        })
    }

    async fn subscribe(
        &self,
        booking_id: &str,
    ) -> Result<mpsc::Receiver<LocationUpdate>, VangoError> {
        let mut listener = PgListener::connect_with(&self.pool).await.map_err(|e| {
            log::error!("Failed to open location listener: {}", e);
            VangoError::DatabaseError(format!("Listen failed: {}", e))
        })?;

        listener.listen(LOCATION_CHANNEL).await.map_err(|e| {
            log::error!("Failed to LISTEN on {}: {}", LOCATION_CHANNEL, e);
            VangoError::DatabaseError(format!("Listen failed: {}", e))
        })?;

        let (tx, rx) = mpsc::channel(FEED_CAPACITY);
        let booking_id = booking_id.to_string();

        tokio::spawn(async move {
            loop {
                let received = tokio::select! {
                    // Subscriber dropped: hand the listener connection back
                    _ = tx.closed() => {
                        log::debug!("Location subscriber for booking {} went away", booking_id);
                        break;
                    }
                    received = listener.recv() => received,
                };

                let notification = match received {
                    Ok(n) => n,
                    Err(e) => {
                        log::error!("Location feed for booking {} closed: {}", booking_id, e);
                        break;
                    }
                };

                let update: LocationUpdate = match serde_json::from_str(notification.payload()) {
                    Ok(u) => u,
                    Err(e) => {
                        log::warn!("Skipping malformed location notification: {}", e);
                        continue;
                    }
                };

                if update.booking_id != booking_id {
                    continue;
                }

                if tx.send(update).await.is_err() {
                    log::debug!("Location subscriber for booking {} went away", booking_id);
                    break;
                }
            }
        });

        Ok(rx)
    }
}
