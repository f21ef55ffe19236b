// src/config/mod.rs
// DOCUMENTATION: Configuration module organization
// PURPOSE: Re-export configuration components

pub mod backend;
pub mod db;
pub mod env;

pub use backend::{init_backend, BackendClient};
pub use db::init_db_pool;
pub use env::{BackendMode, Config, PaymentProviderKind};
