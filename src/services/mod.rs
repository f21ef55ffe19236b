// src/services/mod.rs
// DOCUMENTATION: Services module organization
// PURPOSE: Re-export service components

pub mod backend_health;
pub mod geo;
pub mod geocoding;
pub mod location_service;
pub mod payment_method_service;
pub mod payment_provider;
pub mod photo_service;
pub mod position;

pub use backend_health::*;
pub use geocoding::*;
pub use location_service::*;
pub use payment_method_service::*;
pub use payment_provider::*;
pub use photo_service::*;
pub use position::*;
