// src/db/mod.rs
// DOCUMENTATION: Database module organization
// PURPOSE: Re-export table stores and the in-memory backend

pub mod location_repository;
pub mod memory;
pub mod payment_method_repository;

pub use location_repository::*;
pub use memory::*;
pub use payment_method_repository::*;
