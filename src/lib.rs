// src/lib.rs
// DOCUMENTATION: Library root
// PURPOSE: Shared modules for the API server and the tracker agent

pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod services;
pub mod storage;
