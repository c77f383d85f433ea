// src/lib.rs
//! # Certificate Verification Service
//!
//! Lets visitors of the institute website verify a certificate by its
//! registration number, confirm the holder's identity, and download the
//! certificate as a PDF.
//!
//! ## Architecture Overview
//! 1. **Models**: `CertificateRecord` and the caller-owned `VerificationSession`
//! 2. **Storage Layer**: `RecordStore` over the hosted document database
//! 3. **Rendering**: `ArtifactRenderer` producing the printable PDF
//! 4. **Services Layer**: the verification state machine, session registry
//!    and HTTP API

pub mod config;
pub mod error;
pub mod models;    // Data structures
pub mod render;    // Certificate artifacts
pub mod services;  // Business logic and API
pub mod storage;   // Record store clients
pub mod utils;     // Helper functions
