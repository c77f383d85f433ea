// src/utils/mod.rs
//! Helper functions.

pub mod masking;
pub mod serialization;
