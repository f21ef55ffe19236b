// src/db/memory.rs
// DOCUMENTATION: In-process backend tables
// PURPOSE: Run the service without Postgres (local development and tests)

use crate::db::{LocationStore, PaymentMethodStore, FEED_CAPACITY};
use crate::errors::VangoError;
use crate::models::{LocationUpdate, NewLocationUpdate, NewPaymentMethod, SavedPaymentMethod};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{broadcast, mpsc, RwLock};
use uuid::Uuid;

/// Location and payment method tables held in memory
/// DOCUMENTATION: Mirrors the Postgres behaviour the services rely on,
/// including the non-exclusive default flag and the per-booking change feed.
pub struct MemoryBackend {
    locations: RwLock<Vec<LocationUpdate>>,
    payment_methods: RwLock<Vec<SavedPaymentMethod>>,
    feed: broadcast::Sender<LocationUpdate>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        let (feed, _) = broadcast::channel(256);
        Self {
            locations: RwLock::new(Vec::new()),
            payment_methods: RwLock::new(Vec::new()),
            feed,
        }
    }

    /// Number of stored location rows (all bookings)
    pub async fn location_count(&self) -> usize {
        self.locations.read().await.len()
    }

    /// Live change feed subscriptions (all bookings)
    pub fn subscriber_count(&self) -> usize {
        self.feed.receiver_count()
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LocationStore for MemoryBackend {
    async fn insert(&self, update: &NewLocationUpdate) -> Result<LocationUpdate, VangoError> {
        let row = LocationUpdate {
            id: Uuid::new_v4(),
            booking_id: update.booking_id.clone(),
            transporter_id: update.transporter_id.clone(),
            lat: update.lat,
            lng: update.lng,
            created_at: Utc::now(),
        };

        self.locations.write().await.push(row.clone());

        // No receivers is fine
        let _ = self.feed.send(row.clone());

        Ok(row)
    }

    async fn latest(&self, booking_id: &str) -> Result<Option<LocationUpdate>, VangoError> {
        let rows = self.locations.read().await;
        Ok(rows
            .iter()
            .filter(|r| r.booking_id == booking_id)
            .max_by_key(|r| r.created_at)
            .cloned())
    }

    async fn history(&self, booking_id: &str) -> Result<Vec<LocationUpdate>, VangoError> {
        let rows = self.locations.read().await;
        let mut history: Vec<LocationUpdate> = rows
            .iter()
            .filter(|r| r.booking_id == booking_id)
            .cloned()
            .collect();
        history.sort_by_key(|r| r.created_at);
        Ok(history)
    }

    async fn subscribe(
        &self,
        booking_id: &str,
    ) -> Result<mpsc::Receiver<LocationUpdate>, VangoError> {
        let mut feed = self.feed.subscribe();
        let (tx, rx) = mpsc::channel(FEED_CAPACITY);
        let booking_id = booking_id.to_string();

        tokio::spawn(async move {
            loop {
                let received = tokio::select! {
                    // Subscriber dropped: release the feed right away
                    _ = tx.closed() => break,
                    received = feed.recv() => received,
                };

                match received {
                    Ok(update) if update.booking_id == booking_id => {
                        if tx.send(update).await.is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        log::warn!("Location feed lagged, {} updates skipped", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(rx)
    }
}

#[async_trait]
impl PaymentMethodStore for MemoryBackend {
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<SavedPaymentMethod>, VangoError> {
        let rows = self.payment_methods.read().await;
        // Newest inserted first so the stable sort keeps it ahead on equal timestamps
        let mut methods: Vec<SavedPaymentMethod> = rows
            .iter()
            .rev()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect();
        methods.sort_by(|a, b| {
            b.is_default
                .cmp(&a.is_default)
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(methods)
    }

    async fn find_default(&self, user_id: &str) -> Result<Option<SavedPaymentMethod>, VangoError> {
        let rows = self.payment_methods.read().await;
        Ok(rows
            .iter()
            .rev()
            .find(|m| m.user_id == user_id && m.is_default)
            .cloned())
    }

    async fn insert(
        &self,
        method: &NewPaymentMethod,
        exclusive: bool,
    ) -> Result<SavedPaymentMethod, VangoError> {
        let row = SavedPaymentMethod {
            id: Uuid::new_v4(),
            user_id: method.user_id.clone(),
            card_last4: method.card_last4.clone(),
            card_exp_month: method.card_exp_month,
            card_exp_year: method.card_exp_year,
            card_brand: method.card_brand.clone(),
            is_default: method.is_default,
            created_at: Utc::now(),
        };

        let mut rows = self.payment_methods.write().await;
        if exclusive && row.is_default {
            for other in rows.iter_mut().filter(|m| m.user_id == row.user_id) {
                other.is_default = false;
            }
        }
        rows.push(row.clone());
        Ok(row)
    }

    async fn set_default(
        &self,
        id: Uuid,
        user_id: &str,
        exclusive: bool,
    ) -> Result<Option<SavedPaymentMethod>, VangoError> {
        let mut rows = self.payment_methods.write().await;

        if !rows.iter().any(|m| m.id == id && m.user_id == user_id) {
            return Ok(None);
        }

        let mut updated = None;
        for row in rows.iter_mut().filter(|m| m.user_id == user_id) {
            if row.id == id {
                row.is_default = true;
                updated = Some(row.clone());
            } else if exclusive {
                row.is_default = false;
            }
        }

        Ok(updated)
    }

    async fn delete(&self, id: Uuid, user_id: &str) -> Result<bool, VangoError> {
        let mut rows = self.payment_methods.write().await;
        let before = rows.len();
        rows.retain(|m| !(m.id == id && m.user_id == user_id));
        Ok(rows.len() < before)
    }

    async fn card_exists(
        &self,
        user_id: &str,
        last4: &str,
        exp_month: i32,
        exp_year: i32,
    ) -> Result<bool, VangoError> {
        let rows = self.payment_methods.read().await;
        Ok(rows.iter().any(|m| {
            m.user_id == user_id
                && m.card_last4 == last4
                && m.card_exp_month == exp_month
                && m.card_exp_year == exp_year
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(booking: &str, lat: f64) -> NewLocationUpdate {
        NewLocationUpdate {
            booking_id: booking.to_string(),
            transporter_id: "t1".to_string(),
            lat,
            lng: 12.0,
        }
    }

    #[tokio::test]
    async fn test_latest_and_history() {
        let backend = MemoryBackend::new();
        LocationStore::insert(&backend, &location("b1", 55.0)).await.unwrap();
        LocationStore::insert(&backend, &location("b2", 56.0)).await.unwrap();
        LocationStore::insert(&backend, &location("b1", 55.5)).await.unwrap();

        let latest = backend.latest("b1").await.unwrap().unwrap();
        assert_eq!(latest.lat, 55.5);

        let history = backend.history("b1").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].lat, 55.0);

        assert!(backend.latest("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_feed_filters_booking() {
        let backend = MemoryBackend::new();
        let mut rx = backend.subscribe("b1").await.unwrap();

        LocationStore::insert(&backend, &location("b2", 1.0)).await.unwrap();
        LocationStore::insert(&backend, &location("b1", 2.0)).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.booking_id, "b1");
        assert_eq!(received.lat, 2.0);
    }

    #[tokio::test]
    async fn test_dropped_subscription_releases_feed() {
        let backend = MemoryBackend::new();
        for _ in 0..10 {
            let rx = backend.subscribe("done-booking").await.unwrap();
            drop(rx);
        }

        let released = tokio::time::timeout(std::time::Duration::from_secs(1), async {
            while backend.subscriber_count() > 0 {
                tokio::task::yield_now().await;
            }
        })
        .await;
        assert!(released.is_ok(), "{} feeds still open", backend.subscriber_count());

        // Unrelated traffic still flows
        LocationStore::insert(&backend, &location("other", 1.0)).await.unwrap();
    }
}
