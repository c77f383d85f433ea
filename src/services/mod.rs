// src/services/mod.rs
//! Business logic and API.

pub mod api_server;
pub mod session_store;
pub mod verifier;
