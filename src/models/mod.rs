// src/models/mod.rs
// DOCUMENTATION: Models module organization
// PURPOSE: Re-export model components

pub mod geocoding;
pub mod location;
pub mod payment;
pub mod payment_method;
pub mod photo;

pub use geocoding::*;
pub use location::*;
pub use payment::*;
pub use payment_method::*;
pub use photo::*;
