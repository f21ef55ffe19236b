// src/models/geocoding.rs

use serde::{Deserialize, Serialize};

/// Outcome of geocoding one address
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocodeResult {
    pub address: String,
    pub formatted_address: String,
    pub lat: f64,
    pub lng: f64,
    /// True when the coordinates came from the built-in table, not the API
    pub is_mock: bool,
}

impl GeocodeResult {
    pub fn point(&self) -> geo_types::Point<f64> {
        geo_types::Point::new(self.lng, self.lat)
    }
}

/// One row of the diagnostic report
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocodeAttempt {
    pub address: String,
    pub success: bool,
    pub result: Option<GeocodeResult>,
    pub error: Option<String>,
}

/// Report of GET /geocoding/test
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocodingDiagnostics {
    pub api_key_configured: bool,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub mock_results: usize,
    pub real_results: usize,
    /// Distance between the first two successful results
    pub distance_km: Option<f64>,
    pub results: Vec<GeocodeAttempt>,
    pub timestamp: String,
}
