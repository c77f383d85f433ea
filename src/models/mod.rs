// src/models/mod.rs
//! Data structures shared across the service.

pub mod certificate;
pub mod session;
