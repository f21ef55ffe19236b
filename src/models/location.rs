// src/models/location.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// One transporter position report for a booking
/// DOCUMENTATION: Rows are append-only; the newest row per booking is the
/// current position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LocationUpdate {
    pub id: Uuid,
    pub booking_id: String,
    pub transporter_id: String,
    pub lat: f64,
    pub lng: f64,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a location row
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewLocationUpdate {
    #[validate(length(min = 1))]
    pub booking_id: String,
    #[validate(length(min = 1))]
    pub transporter_id: String,
    pub lat: f64,
    pub lng: f64,
}

impl NewLocationUpdate {
    /// Latitude in [-90, 90] and longitude in [-180, 180]
    pub fn has_valid_coordinates(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

/// A device position fix
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Parse a `lat,lng` pair as written by device feeds
    pub fn parse(line: &str) -> Option<Self> {
        let (lat, lng) = line.trim().split_once(',')?;
        let latitude: f64 = lat.trim().parse().ok()?;
        let longitude: f64 = lng.trim().parse().ok()?;

        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return None;
        }

        Some(Self::new(latitude, longitude))
    }
}

impl From<Coordinates> for geo_types::Point<f64> {
    fn from(c: Coordinates) -> Self {
        geo_types::Point::new(c.longitude, c.latitude)
    }
}

/// Body of POST /tracking/{booking_id}/location
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LocationReportRequest {
    #[validate(length(min = 1))]
    pub transporter_id: String,
    pub lat: f64,
    pub lng: f64,
}

/// Body of POST /tracking/{booking_id}/start
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StartTrackingRequest {
    #[validate(length(min = 1))]
    pub transporter_id: String,
}
