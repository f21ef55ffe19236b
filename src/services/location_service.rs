// src/services/location_service.rs
// DOCUMENTATION: Transporter location tracking
// PURPOSE: Record positions per booking, read them back, push them to
// subscribers and drive the periodic tracking loop

use crate::config::BackendClient;
use crate::db::LocationStore;
use crate::errors::VangoError;
use crate::models::{Coordinates, LocationUpdate, NewLocationUpdate};
use crate::services::geo::path_length;
use crate::services::PositionSource;
use geo_types::{LineString, Point};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use validator::Validate;

/// How long a device gets to produce a fix
pub const POSITION_TIMEOUT: Duration = Duration::from_secs(5);

/// Default period of continuous tracking
pub const TRACKING_INTERVAL: Duration = Duration::from_secs(10);

/// Live delivery of a booking's new location rows
/// DOCUMENTATION: Delivery stops on unsubscribe() or drop.
pub struct LocationSubscription {
    booking_id: String,
    task: JoinHandle<()>,
}

impl LocationSubscription {
    pub fn booking_id(&self) -> &str {
        &self.booking_id
    }

    pub fn unsubscribe(self) {
        log::info!("Unsubscribing from location updates for booking {}", self.booking_id);
    }
}

impl Drop for LocationSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// A running continuous tracking loop
pub struct TrackingHandle {
    booking_id: String,
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl TrackingHandle {
    pub fn booking_id(&self) -> &str {
        &self.booking_id
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[derive(Clone)]
pub struct LocationService {
    store: Arc<dyn LocationStore>,
}

impl LocationService {
    pub fn new(backend: &BackendClient) -> Self {
        Self {
            store: backend.locations.clone(),
        }
    }

    /// Begin tracking a booking
    /// DOCUMENTATION: Only checks for an existing row and logs what it finds.
    /// It takes no lock and always returns true.
    pub async fn start_tracking(&self, booking_id: &str, transporter_id: &str) -> bool {
        match self.store.latest(booking_id).await {
            Ok(Some(existing)) => log::info!(
                "Tracking already active for booking {} (last fix by {} at {})",
                booking_id,
                existing.transporter_id,
                existing.created_at
            ),
            Ok(None) => log::info!(
                "Starting tracking for booking {} with transporter {}",
                booking_id,
                transporter_id
            ),
            Err(e) => log::warn!(
                "Could not check existing tracking for booking {}: {}",
                booking_id,
                e
            ),
        }

        true
    }

    /// Insert one position row. Not retried on failure.
    pub async fn update_location(
        &self,
        booking_id: &str,
        transporter_id: &str,
        lat: f64,
        lng: f64,
    ) -> Result<LocationUpdate, VangoError> {
        let update = NewLocationUpdate {
            booking_id: booking_id.to_string(),
            transporter_id: transporter_id.to_string(),
            lat,
            lng,
        };

        if let Err(e) = update.validate() {
            return Err(VangoError::ValidationError(e.to_string()));
        }

        if !update.has_valid_coordinates() {
            return Err(VangoError::InvalidInput(format!(
                "Coordinates out of range: {}, {}",
                lat, lng
            )));
        }

        let row = self.store.insert(&update).await?;
        log::debug!("Location updated for booking {}: {}, {}", booking_id, lat, lng);
        Ok(row)
    }

    /// Current position of a booking; Ok(None) when nothing was reported yet
    pub async fn get_latest_location(
        &self,
        booking_id: &str,
    ) -> Result<Option<LocationUpdate>, VangoError> {
        self.store.latest(booking_id).await
    }

    /// Every reported position, oldest first
    pub async fn get_location_history(
        &self,
        booking_id: &str,
    ) -> Result<Vec<LocationUpdate>, VangoError> {
        self.store.history(booking_id).await
    }

    /// Booking route as a GeoJSON LineString feature
    pub async fn trail_geojson(&self, booking_id: &str) -> Result<geojson::Feature, VangoError> {
        let history = self.get_location_history(booking_id).await?;
        Ok(build_trail(booking_id, &history))
    }

    /// Run `callback` for each new row of the booking
    /// DOCUMENTATION: Ordering and duplicate delivery are whatever the
    /// backend's change feed provides.
    pub async fn subscribe_to_location<F>(
        &self,
        booking_id: &str,
        callback: F,
    ) -> Result<LocationSubscription, VangoError>
    where
        F: Fn(LocationUpdate) + Send + 'static,
    {
        let mut feed = self.store.subscribe(booking_id).await?;
        let channel = booking_id.to_string();

        let task = tokio::spawn(async move {
            while let Some(update) = feed.recv().await {
                callback(update);
            }
            log::debug!("Location feed for booking {} ended", channel);
        });

        log::info!("Subscribed to location updates for booking {}", booking_id);

        Ok(LocationSubscription {
            booking_id: booking_id.to_string(),
            task,
        })
    }

    /// Ask the device for a fresh fix
    /// DOCUMENTATION: Gives up after POSITION_TIMEOUT. Denial, errors and
    /// timeouts all come back as None.
    pub async fn get_current_position(source: &dyn PositionSource) -> Option<Coordinates> {
        match tokio::time::timeout(POSITION_TIMEOUT, source.current_position()).await {
            Ok(Ok(fix)) => Some(fix),
            Ok(Err(e)) => {
                log::warn!("Could not get device position: {}", e);
                None
            }
            Err(_) => {
                log::warn!("Timed out waiting for device position");
                None
            }
        }
    }

    /// Report the device position every `period`
    /// DOCUMENTATION: Single-flight. A tick's fetch and insert finish before
    /// the next tick is awaited; late ticks are delayed rather than bunched.
    pub fn start_continuous_tracking(
        &self,
        booking_id: &str,
        transporter_id: &str,
        source: Arc<dyn PositionSource>,
        period: Duration,
    ) -> TrackingHandle {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let service = self.clone();
        let booking = booking_id.to_string();
        let transporter = transporter_id.to_string();

        log::info!(
            "Starting continuous tracking for booking {} every {:?}",
            booking_id,
            period
        );

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    // Also fires when the handle is dropped
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {}
                }

                // Not raced against stop: an update in flight completes
                match Self::get_current_position(source.as_ref()).await {
                    Some(fix) => {
                        if let Err(e) = service
                            .update_location(&booking, &transporter, fix.latitude, fix.longitude)
                            .await
                        {
                            log::error!("Tracking update failed for booking {}: {}", booking, e);
                        }
                    }
                    None => log::debug!("No position this tick for booking {}", booking),
                }
            }

            log::info!("Continuous tracking stopped for booking {}", booking);
        });

        TrackingHandle {
            booking_id: booking_id.to_string(),
            stop: stop_tx,
            task,
        }
    }

    /// Stop a tracking loop and wait for it to wind down
    pub async fn stop_continuous_tracking(handle: TrackingHandle) {
        let TrackingHandle {
            booking_id,
            stop,
            task,
        } = handle;

        // Loop may already be gone
        let _ = stop.send(());

        if let Err(e) = task.await {
            log::error!("Tracking task for booking {} panicked: {}", booking_id, e);
        }
    }
}

fn build_trail(booking_id: &str, history: &[LocationUpdate]) -> geojson::Feature {
    let points: Vec<Point<f64>> = history.iter().map(|u| Point::new(u.lng, u.lat)).collect();
    let line: LineString<f64> = points.iter().map(|p| (p.x(), p.y())).collect();

    let mut properties = serde_json::Map::new();
    properties.insert("bookingId".to_string(), booking_id.into());
    properties.insert("points".to_string(), history.len().into());
    properties.insert("distanceKm".to_string(), path_length(&points).into());
    if let (Some(first), Some(last)) = (history.first(), history.last()) {
        properties.insert("startedAt".to_string(), first.created_at.to_rfc3339().into());
        properties.insert("lastUpdateAt".to_string(), last.created_at.to_rfc3339().into());
    }

    geojson::Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(geojson::Value::from(&line))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryBackend;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;
    use tokio::sync::mpsc;

    fn service() -> (LocationService, Arc<MemoryBackend>) {
        let tables = Arc::new(MemoryBackend::new());
        let backend = BackendClient {
            locations: tables.clone(),
            payment_methods: tables.clone(),
            storage: Arc::new(crate::storage::MemoryObjectStorage::new("http://backend.test")),
        };
        (LocationService::new(&backend), tables)
    }

    struct FixedSource(Coordinates);

    #[async_trait]
    impl PositionSource for FixedSource {
        async fn current_position(&self) -> Result<Coordinates, VangoError> {
            Ok(self.0)
        }
    }

    struct SilentSource;

    #[async_trait]
    impl PositionSource for SilentSource {
        async fn current_position(&self) -> Result<Coordinates, VangoError> {
            std::future::pending().await
        }
    }

    struct DeniedSource;

    #[async_trait]
    impl PositionSource for DeniedSource {
        async fn current_position(&self) -> Result<Coordinates, VangoError> {
            Err(VangoError::InvalidInput("permission denied".to_string()))
        }
    }

    /// Store whose inserts take longer than the tracking period
    struct SlowStore {
        inner: MemoryBackend,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    #[async_trait]
    impl LocationStore for SlowStore {
        async fn insert(&self, update: &NewLocationUpdate) -> Result<LocationUpdate, VangoError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(15)).await;
            let row = self.inner.insert(update).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            row
        }

        async fn latest(&self, booking_id: &str) -> Result<Option<LocationUpdate>, VangoError> {
            self.inner.latest(booking_id).await
        }

        async fn history(&self, booking_id: &str) -> Result<Vec<LocationUpdate>, VangoError> {
            self.inner.history(booking_id).await
        }

        async fn subscribe(
            &self,
            booking_id: &str,
        ) -> Result<mpsc::Receiver<LocationUpdate>, VangoError> {
            self.inner.subscribe(booking_id).await
        }
    }

    #[tokio::test]
    async fn test_update_location_echoes_inputs() {
        let (service, _) = service();
        let row = service.update_location("b1", "t1", 55.6761, 12.5683).await.unwrap();

        assert_eq!(row.booking_id, "b1");
        assert_eq!(row.transporter_id, "t1");
        assert_eq!(row.lat, 55.6761);
        assert_eq!(row.lng, 12.5683);
    }

    #[tokio::test]
    async fn test_update_location_rejects_bad_input() {
        let (service, tables) = service();

        assert!(matches!(
            service.update_location("b1", "t1", 95.0, 0.0).await,
            Err(VangoError::InvalidInput(_))
        ));
        assert!(matches!(
            service.update_location("", "t1", 55.0, 12.0).await,
            Err(VangoError::ValidationError(_))
        ));
        assert_eq!(tables.location_count().await, 0);
    }

    #[tokio::test]
    async fn test_latest_location_empty_booking_is_none() {
        let (service, _) = service();
        let latest = tokio_test::assert_ok!(service.get_latest_location("empty").await);
        assert!(latest.is_none());
    }

    #[tokio::test]
    async fn test_latest_location_returns_newest() {
        let (service, _) = service();
        service.update_location("b1", "t1", 55.0, 12.0).await.unwrap();
        service.update_location("b1", "t1", 55.1, 12.1).await.unwrap();

        let latest = service.get_latest_location("b1").await.unwrap().unwrap();
        assert_eq!(latest.lat, 55.1);
    }

    #[tokio::test]
    async fn test_start_tracking_always_true() {
        let (service, _) = service();
        assert!(service.start_tracking("b1", "t1").await);
        service.update_location("b1", "t1", 55.0, 12.0).await.unwrap();
        assert!(service.start_tracking("b1", "t1").await);
    }

    #[tokio::test]
    async fn test_subscription_receives_only_its_booking() {
        let (service, _) = service();
        let received = Arc::new(StdMutex::new(Vec::new()));
        let sink = received.clone();

        let subscription = service
            .subscribe_to_location("b1", move |update| {
                sink.lock().unwrap().push(update);
            })
            .await
            .unwrap();
        assert_eq!(subscription.booking_id(), "b1");

        service.update_location("b2", "t9", 1.0, 1.0).await.unwrap();
        service.update_location("b1", "t1", 55.0, 12.0).await.unwrap();

        for _ in 0..50 {
            if !received.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let got = received.lock().unwrap().clone();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].booking_id, "b1");

        subscription.unsubscribe();
    }

    #[tokio::test]
    async fn test_unsubscribe_releases_feed() {
        let (service, tables) = service();

        for _ in 0..10 {
            let subscription = service
                .subscribe_to_location("done-booking", |_| {})
                .await
                .unwrap();
            subscription.unsubscribe();
        }
        service.update_location("other", "t1", 55.0, 12.0).await.unwrap();

        for _ in 0..50 {
            if tables.subscriber_count() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(tables.subscriber_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_current_position_times_out() {
        let started = tokio::time::Instant::now();
        assert!(LocationService::get_current_position(&SilentSource).await.is_none());
        assert!(started.elapsed() >= POSITION_TIMEOUT);
    }

    #[tokio::test]
    async fn test_current_position_denied_is_none() {
        assert!(LocationService::get_current_position(&DeniedSource).await.is_none());
        let fix = Coordinates::new(55.0, 12.0);
        assert_eq!(
            LocationService::get_current_position(&FixedSource(fix)).await,
            Some(fix)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_continuous_tracking_ticks_until_stopped() {
        let (service, tables) = service();
        let source = Arc::new(FixedSource(Coordinates::new(55.0, 12.0)));

        let handle = service.start_continuous_tracking("b1", "t1", source, TRACKING_INTERVAL);
        assert_eq!(handle.booking_id(), "b1");

        // Ticks at 0s, 10s and 20s
        tokio::time::sleep(Duration::from_secs(25)).await;
        LocationService::stop_continuous_tracking(handle).await;
        assert_eq!(tables.location_count().await, 3);

        // Nothing more after stop
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(tables.location_count().await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_continuous_tracking_is_single_flight() {
        let slow = Arc::new(SlowStore {
            inner: MemoryBackend::new(),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        });
        let service = LocationService {
            store: slow.clone(),
        };
        let source = Arc::new(FixedSource(Coordinates::new(55.0, 12.0)));

        let handle = service.start_continuous_tracking("b1", "t1", source, TRACKING_INTERVAL);
        tokio::time::sleep(Duration::from_secs(60)).await;

        // Stop while an insert is in flight; it still lands
        let before = slow.inner.location_count().await;
        LocationService::stop_continuous_tracking(handle).await;
        let after = slow.inner.location_count().await;

        assert_eq!(slow.max_in_flight.load(Ordering::SeqCst), 1);
        assert!(after >= before);
        assert_eq!(slow.in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_trail_geojson() {
        let (service, _) = service();
        service.update_location("b1", "t1", 55.0, 12.0).await.unwrap();
        service.update_location("b1", "t1", 55.1, 12.0).await.unwrap();

        let feature = service.trail_geojson("b1").await.unwrap();
        let properties = feature.properties.unwrap();
        assert_eq!(properties["points"], 2);
        assert!(properties["distanceKm"].as_f64().unwrap() > 10.0);

        match feature.geometry.unwrap().value {
            geojson::Value::LineString(coords) => {
                assert_eq!(coords.len(), 2);
                assert_eq!(coords[0], vec![12.0, 55.0]);
            }
            other => panic!("unexpected geometry {:?}", other),
        }
    }
}
