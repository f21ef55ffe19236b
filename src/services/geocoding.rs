// src/services/geocoding.rs
// DOCUMENTATION: Address geocoding
// PURPOSE: Resolve addresses through Google Geocoding (or a built-in table)
// and run the geocoding diagnostics

use crate::config::Config;
use crate::errors::VangoError;
use crate::models::{GeocodeAttempt, GeocodeResult, GeocodingDiagnostics};
use crate::services::geo::distance_between;
use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

/// Minimum gap between diagnostic geocoding calls
pub const GEOCODE_SPACING: Duration = Duration::from_millis(200);

/// Addresses exercised by GET /geocoding/test
pub const TEST_ADDRESSES: [&str; 5] = [
    "Rådhuspladsen 1, 1550 København V, Denmark",
    "Store Torv 1, 8000 Aarhus C, Denmark",
    "Flakhaven 2, 5000 Odense C, Denmark",
    "Boulevarden 13, 9000 Aalborg, Denmark",
    "Torvet 19, 6700 Esbjerg, Denmark",
];

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<GeocodeResult, VangoError>;
}

/// Google Geocoding API client
pub struct GoogleGeocoder {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct GoogleGeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GoogleGeocodeResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleGeocodeResult {
    formatted_address: String,
    geometry: GoogleGeometry,
}

#[derive(Debug, Deserialize)]
struct GoogleGeometry {
    location: GoogleLocation,
}

#[derive(Debug, Deserialize)]
struct GoogleLocation {
    lat: f64,
    lng: f64,
}

impl GoogleGeocoder {
    pub fn new(client: Client, api_key: String) -> Self {
        Self {
            client,
            api_key,
            base_url: "https://maps.googleapis.com/maps/api/geocode/json".to_string(),
        }
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    async fn geocode(&self, address: &str) -> Result<GeocodeResult, VangoError> {
        log::debug!("Google geocode lookup: {}", address);

        let response = self
            .client
            .get(&self.base_url)
            .query(&[("address", address), ("key", &self.api_key), ("region", "dk")])
            .send()
            .await
            .map_err(|e| {
                log::error!("Geocoding request failed: {}", e);
                VangoError::ExternalApiError(format!("Request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            log::error!("Geocoding API error {}: {}", status, body);
            return Err(VangoError::ExternalApiError(format!(
                "API error {}: {}",
                status, body
            )));
        }

        let api_response: GoogleGeocodeResponse = response.json().await.map_err(|e| {
            log::error!("Failed to parse geocoding response: {}", e);
            VangoError::ExternalApiError(format!("Parse error: {}", e))
        })?;

        match api_response.status.as_str() {
            "OK" => {
                let first = api_response.results.into_iter().next().ok_or_else(|| {
                    VangoError::ExternalApiError("OK status without results".to_string())
                })?;

                Ok(GeocodeResult {
                    address: address.to_string(),
                    formatted_address: first.formatted_address,
                    lat: first.geometry.location.lat,
                    lng: first.geometry.location.lng,
                    is_mock: false,
                })
            }
            "ZERO_RESULTS" => Err(VangoError::NotFound(format!("No geocoding result for {}", address))),
            "OVER_QUERY_LIMIT" => {
                log::error!("Geocoding API quota exceeded");
                Err(VangoError::RateLimitExceeded)
            }
            other => {
                let msg = api_response
                    .error_message
                    .unwrap_or_else(|| format!("Unexpected status: {}", other));
                log::error!("Geocoding API request rejected: {}", msg);
                Err(VangoError::ExternalApiError(msg))
            }
        }
    }
}

/// Built-in coordinates for the main Danish cities
pub struct MockGeocoder;

const MOCK_CITIES: [(&[&str], &str, f64, f64); 5] = [
    (&["københavn", "copenhagen", "kobenhavn"], "København, Denmark", 55.6761, 12.5683),
    (&["aarhus", "århus"], "Aarhus, Denmark", 56.1629, 10.2039),
    (&["odense"], "Odense, Denmark", 55.4038, 10.4024),
    (&["aalborg", "ålborg"], "Aalborg, Denmark", 57.0488, 9.9217),
    (&["esbjerg"], "Esbjerg, Denmark", 55.4765, 8.4594),
];

#[async_trait]
impl Geocoder for MockGeocoder {
    async fn geocode(&self, address: &str) -> Result<GeocodeResult, VangoError> {
        let lower = address.to_lowercase();

        MOCK_CITIES
            .iter()
            .find(|(keys, _, _, _)| keys.iter().any(|k| lower.contains(k)))
            .map(|(_, name, lat, lng)| GeocodeResult {
                address: address.to_string(),
                formatted_address: name.to_string(),
                lat: *lat,
                lng: *lng,
                is_mock: true,
            })
            .ok_or_else(|| VangoError::NotFound(format!("No mock location for {}", address)))
    }
}

/// Result of GET /geocoding/validate-key
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyValidation {
    pub api_key_configured: bool,
    /// The key answered with real (non-mock) data
    pub valid: bool,
    pub sample: Option<GeocodeResult>,
    pub error: Option<String>,
}

pub struct GeocodingService {
    geocoder: Arc<dyn Geocoder>,
    api_key_configured: bool,
}

impl GeocodingService {
    pub fn new(geocoder: Arc<dyn Geocoder>, api_key_configured: bool) -> Self {
        Self {
            geocoder,
            api_key_configured,
        }
    }

    /// Google when a maps key is configured, the mock table otherwise
    pub fn from_config(config: &Config, http: Client) -> Self {
        if config.google_maps_api_key.is_empty() {
            Self::new(Arc::new(MockGeocoder), false)
        } else {
            Self::new(
                Arc::new(GoogleGeocoder::new(http, config.google_maps_api_key.clone())),
                true,
            )
        }
    }

    pub async fn geocode(&self, address: &str) -> Result<GeocodeResult, VangoError> {
        self.geocoder.geocode(address).await
    }

    /// Geocode each address in turn, spaced by GEOCODE_SPACING
    pub async fn run_diagnostics(&self, addresses: &[&str]) -> GeocodingDiagnostics {
        let quota = Quota::with_period(GEOCODE_SPACING)
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN));
        let limiter = RateLimiter::direct(quota);

        let mut results = Vec::with_capacity(addresses.len());
        for address in addresses {
            limiter.until_ready().await;

            let attempt = match self.geocode(address).await {
                Ok(result) => GeocodeAttempt {
                    address: address.to_string(),
                    success: true,
                    result: Some(result),
                    error: None,
                },
                Err(e) => {
                    log::warn!("Geocoding diagnostic failed for {}: {}", address, e);
                    GeocodeAttempt {
                        address: address.to_string(),
                        success: false,
                        result: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            results.push(attempt);
        }

        let successes: Vec<&GeocodeResult> =
            results.iter().filter_map(|a| a.result.as_ref()).collect();
        let mock_results = successes.iter().filter(|r| r.is_mock).count();

        let distance_km = match successes.as_slice() {
            [a, b, ..] => Some(distance_between(a.point(), b.point())),
            _ => None,
        };

        log::info!(
            "Geocoding diagnostics: {}/{} succeeded ({} mock)",
            successes.len(),
            results.len(),
            mock_results
        );

        GeocodingDiagnostics {
            api_key_configured: self.api_key_configured,
            total: results.len(),
            successful: successes.len(),
            failed: results.len() - successes.len(),
            mock_results,
            real_results: successes.len() - mock_results,
            distance_km,
            results,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Probe the configured key with one address
    pub async fn validate_key(&self) -> KeyValidation {
        match self.geocode(TEST_ADDRESSES[0]).await {
            Ok(result) => KeyValidation {
                api_key_configured: self.api_key_configured,
                valid: !result.is_mock,
                sample: Some(result),
                error: None,
            },
            Err(e) => KeyValidation {
                api_key_configured: self.api_key_configured,
                valid: false,
                sample: None,
                error: Some(e.to_string()),
            },
        }
    }
}
