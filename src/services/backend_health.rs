// src/services/backend_health.rs
// DOCUMENTATION: Managed backend reachability check
// PURPOSE: Report which backend settings are present and whether the REST
// root answers with the configured credentials

use crate::config::{BackendMode, Config};
use reqwest::Client;
use serde::Serialize;
use std::time::Instant;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendEnvironment {
    pub environment: String,
    pub backend_mode: String,
    pub backend_url_configured: bool,
    pub backend_anon_key_configured: bool,
    pub maps_api_key_configured: bool,
    pub site_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendConnectivity {
    pub reachable: bool,
    pub status: Option<u16>,
    pub latency_ms: Option<u128>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendHealthReport {
    pub environment: BackendEnvironment,
    pub connectivity: BackendConnectivity,
    pub timestamp: String,
}

pub struct BackendHealthService;

impl BackendHealthService {
    /// GET <backend>/rest/v1/ with the anon key
    pub async fn check(http: &Client, config: &Config) -> BackendHealthReport {
        let environment = BackendEnvironment {
            environment: config.environment.clone(),
            backend_mode: match config.backend_mode {
                BackendMode::Postgres => "postgres",
                BackendMode::Memory => "memory",
            }
            .to_string(),
            backend_url_configured: !config.backend_url.is_empty(),
            backend_anon_key_configured: !config.backend_anon_key.is_empty(),
            maps_api_key_configured: !config.google_maps_api_key.is_empty(),
            site_url: config.site_url.clone(),
        };

        let connectivity = if config.backend_url.is_empty() || config.backend_anon_key.is_empty() {
            BackendConnectivity {
                reachable: false,
                status: None,
                latency_ms: None,
                error: Some("Backend URL or anon key not configured".to_string()),
            }
        } else {
            Self::probe(http, config).await
        };

        BackendHealthReport {
            environment,
            connectivity,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    async fn probe(http: &Client, config: &Config) -> BackendConnectivity {
        let url = format!("{}/rest/v1/", config.backend_url);
        let started = Instant::now();

        let result = http
            .get(&url)
            .header("apikey", &config.backend_anon_key)
            .bearer_auth(&config.backend_anon_key)
            .send()
            .await;

        let latency_ms = Some(started.elapsed().as_millis());

        match result {
            Ok(response) => {
                let status = response.status();
                if !status.is_success() {
                    log::warn!("Backend REST root answered {}", status);
                }
                BackendConnectivity {
                    reachable: status.is_success(),
                    status: Some(status.as_u16()),
                    latency_ms,
                    error: if status.is_success() {
                        None
                    } else {
                        Some(format!("Unexpected status {}", status))
                    },
                }
            }
            Err(e) => {
                log::error!("Backend health check failed: {}", e);
                BackendConnectivity {
                    reachable: false,
                    status: None,
                    latency_ms,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_backend_reports_not_reachable() {
        let mut config = Config::for_tests();
        config.backend_url = String::new();

        let report = BackendHealthService::check(&Client::new(), &config).await;
        assert!(!report.environment.backend_url_configured);
        assert!(report.environment.backend_anon_key_configured);
        assert!(!report.connectivity.reachable);
        assert!(report.connectivity.error.is_some());
    }
}
