// src/main.rs
// DOCUMENTATION: Application entry point
// PURPOSE: Initialize config, backend handle and services, start HTTP server

use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::io;
use vango::config::{self, Config};
use vango::handlers;
use vango::services::{
    provider_from_config, GeocodingService, LocationService, PaymentMethodService, PhotoService,
};

#[actix_web::main]
async fn main() -> io::Result<()> {
    // 1. Load environment variables
    dotenv().ok();

    // 2. Load configuration
    let config = Config::from_env();

    // 3. Initialize logging
    if std::env::var("RUST_LOG").is_err() {
        let log_level = if !config.log_level.is_empty() {
            &config.log_level
        } else {
            "info,actix_web=info,sqlx=warn"
        };
        std::env::set_var("RUST_LOG", log_level);
    }
    env_logger::init();

    if let Err(e) = config.validate() {
        log::error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    log::info!("Starting vango service...");
    log::info!("Environment: {}", config.environment);
    log::info!(
        "Server Address: {}:{}",
        config.server_address,
        config.server_port
    );

    // 4. Connect the backend handle (tables, change feed, storage)
    let http = reqwest::Client::new();
    let backend = match config::init_backend(&config, http.clone()).await {
        Ok(backend) => backend,
        Err(e) => {
            log::error!("Failed to connect to backend: {}", e);
            std::process::exit(1);
        }
    };

    // 5. Build services
    let location_service = web::Data::new(LocationService::new(&backend));
    let photo_service = web::Data::new(PhotoService::new(&backend, config.photo_bucket.clone()));
    let payment_method_service = web::Data::new(PaymentMethodService::new(
        &backend,
        config.exclusive_default_payment_method,
    ));
    let payment_provider = web::Data::from(provider_from_config(&config, http.clone()));
    let geocoding_service = web::Data::new(GeocodingService::from_config(&config, http.clone()));

    if !photo_service.initialize_bucket().await {
        log::warn!("Photo bucket {} is not available, uploads will fail", photo_service.bucket());
    }

    // 6. Start HTTP server
    let server_addr = format!("{}:{}", config.server_address, config.server_port);
    let config_data = web::Data::new(config);
    let http_data = web::Data::new(http);

    HttpServer::new(move || {
        App::new()
            // Application state
            .app_data(config_data.clone())
            .app_data(http_data.clone())
            .app_data(location_service.clone())
            .app_data(photo_service.clone())
            .app_data(payment_method_service.clone())
            .app_data(payment_provider.clone())
            .app_data(geocoding_service.clone())
            .app_data(handlers::json_config())
            // Middleware
            .wrap(Logger::default())
            .wrap(actix_web::middleware::Compress::default())
            // Routes
            .configure(handlers::health_config)
            .configure(handlers::tracking_config)
            .configure(handlers::photos_config)
            .configure(handlers::payment_methods_config)
            .configure(handlers::payments_config)
            .configure(handlers::geocoding_config)
    })
    .bind(&server_addr)?
    .run()
    .await
}
