// src/storage/mod.rs
//! Certificate record storage.

pub mod http_store;
pub mod memory_store;
pub mod record_store;
