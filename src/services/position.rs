// src/services/position.rs
// DOCUMENTATION: Device position sources
// PURPOSE: Abstract the transporter device's geolocation for tracking

use crate::errors::VangoError;
use crate::models::Coordinates;
use async_trait::async_trait;
use tokio::sync::{watch, Mutex};

/// Where the tracking loop gets device fixes from
#[async_trait]
pub trait PositionSource: Send + Sync {
    /// Wait for a fix newer than any already returned.
    /// Err when the device denies access, fails, or has no feed.
    async fn current_position(&self) -> Result<Coordinates, VangoError>;
}

/// Sending half of a watch-backed source; the device side publishes fixes here
pub struct PositionFeed {
    tx: watch::Sender<Option<Coordinates>>,
}

impl PositionFeed {
    pub fn publish(&self, fix: Coordinates) {
        // Fails only when the source is gone
        if self.tx.send(Some(fix)).is_err() {
            log::debug!("Dropping position fix, no tracker listening");
        }
    }
}

/// Position source fed through a watch channel
/// DOCUMENTATION: Never re-serves a fix it has already returned, so every
/// call waits for fresh data. Closes (Err) once the feed is dropped.
pub struct WatchPositionSource {
    rx: Mutex<watch::Receiver<Option<Coordinates>>>,
}

impl WatchPositionSource {
    pub fn channel() -> (PositionFeed, WatchPositionSource) {
        let (tx, rx) = watch::channel(None);
        (
            PositionFeed { tx },
            WatchPositionSource { rx: Mutex::new(rx) },
        )
    }
}

#[async_trait]
impl PositionSource for WatchPositionSource {
    async fn current_position(&self) -> Result<Coordinates, VangoError> {
        let mut rx = self.rx.lock().await;

        rx.changed()
            .await
            .map_err(|_| VangoError::InternalError("position feed closed".to_string()))?;

        let fix = *rx.borrow_and_update();
        fix.ok_or_else(|| VangoError::InternalError("position feed sent no fix".to_string()))
    }
}
