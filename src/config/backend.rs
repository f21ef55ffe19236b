// src/config/backend.rs
// DOCUMENTATION: Backend client handle construction
// PURPOSE: Build the injected handle every service talks to

use crate::config::{init_db_pool, BackendMode, Config};
use crate::db::{
    LocationStore, MemoryBackend, PaymentMethodStore, PgLocationStore, PgPaymentMethodStore,
};
use crate::storage::{MemoryObjectStorage, ObjectStorage, RestObjectStorage};
use std::sync::Arc;

/// Connection handle to the managed backend
/// DOCUMENTATION: Built once at startup and cloned into services; clones
/// share the same pool, feed and HTTP client.
#[derive(Clone)]
pub struct BackendClient {
    pub locations: Arc<dyn LocationStore>,
    pub payment_methods: Arc<dyn PaymentMethodStore>,
    pub storage: Arc<dyn ObjectStorage>,
}

impl BackendClient {
    /// Fully in-memory handle
    pub fn in_memory(base_url: &str) -> Self {
        let tables = Arc::new(MemoryBackend::new());
        Self {
            locations: tables.clone(),
            payment_methods: tables,
            storage: Arc::new(MemoryObjectStorage::new(base_url)),
        }
    }
}

/// Initialize the backend client handle for the configured mode
pub async fn init_backend(config: &Config, http: reqwest::Client) -> Result<BackendClient, sqlx::Error> {
    match config.backend_mode {
        BackendMode::Memory => {
            log::warn!("Using in-memory backend - data is lost on restart");
            Ok(BackendClient::in_memory(&config.backend_url))
        }
        BackendMode::Postgres => {
            let pool = init_db_pool(config).await?;
            Ok(BackendClient {
                locations: Arc::new(PgLocationStore::new(pool.clone())),
                payment_methods: Arc::new(PgPaymentMethodStore::new(pool)),
                storage: Arc::new(RestObjectStorage::new(
                    http,
                    &config.backend_url,
                    config.backend_anon_key.clone(),
                )),
            })
        }
    }
}
