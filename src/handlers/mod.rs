// src/handlers/mod.rs
// DOCUMENTATION: Handlers module organization
// PURPOSE: Re-export route configuration for each API area

pub mod geocoding;
pub mod health;
pub mod payment_methods;
pub mod payments;
pub mod photos;
pub mod tracking;

pub use geocoding::config as geocoding_config;
pub use health::config as health_config;
pub use payment_methods::config as payment_methods_config;
pub use payments::config as payments_config;
pub use photos::config as photos_config;
pub use tracking::config as tracking_config;

use crate::errors::VangoError;
use actix_web::{web, HttpResponse};

/// Fallback for methods a resource does not serve
pub async fn method_not_allowed() -> Result<HttpResponse, VangoError> {
    Err(VangoError::MethodNotAllowed)
}

/// JSON extractor settings: malformed bodies become 400 with a message
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(8 * 1024 * 1024)
        .error_handler(|err, _req| {
            log::debug!("Rejected JSON body: {}", err);
            VangoError::InvalidInput(err.to_string()).into()
        })
}
