// src/main.rs

//! # Certificate Verification Service - Main Entry Point
//!
//! Initializes configuration, logging and the core components, then starts
//! the API server.
//!
//! ## Record Store Selection
//! - `CERTDESK_STORE__BASE_URL` set: the hosted document database over HTTP
//! - otherwise `CERTDESK_STORE__SEED_FILE` set: an in-memory store seeded from JSON
//! - otherwise an empty in-memory store (every search reports not found)
//!
//! See [`certdesk::config`] for the full list of settings. Log verbosity is
//! controlled with `RUST_LOG` (default: `info`).

use anyhow::Context;
use certdesk::config::Settings;
use certdesk::render::pdf::PdfRenderer;
use certdesk::services::api_server::ApiServer;
use certdesk::services::session_store::SessionStore;
use certdesk::services::verifier::Verifier;
use certdesk::storage::http_store::HttpRecordStore;
use certdesk::storage::memory_store::MemoryRecordStore;
use certdesk::storage::record_store::RecordStore;
use dotenv::dotenv;
use log::{info, warn};
use std::net::SocketAddr;
use std::sync::Arc;

fn build_store(settings: &Settings) -> anyhow::Result<Arc<dyn RecordStore>> {
    if let Some(base_url) = &settings.store.base_url {
        info!(
            "Using document database at {} (collection `{}`)",
            base_url, settings.store.collection
        );
        let store = HttpRecordStore::new(base_url, &settings.store)
            .context("failed to initialize document database client")?;
        return Ok(Arc::new(store));
    }

    if let Some(seed_file) = &settings.store.seed_file {
        let store = MemoryRecordStore::from_seed_file(seed_file)
            .with_context(|| format!("failed to load seed file {}", seed_file.display()))?;
        info!(
            "Using in-memory store with {} certificate(s) from {}",
            store.record_count(),
            seed_file.display()
        );
        return Ok(Arc::new(store));
    }

    warn!("No record store configured; every search will report not found");
    Ok(Arc::new(MemoryRecordStore::new()))
}

/// Main application entry point
///
/// # Initialization Sequence
/// 1. Load `.env` and configuration
/// 2. Initialize logging
/// 3. Build record store, renderer and verifier
/// 4. Start API server
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::load().context("failed to load configuration")?;
    let addr: SocketAddr = settings
        .bind_addr
        .parse()
        .with_context(|| format!("invalid bind address `{}`", settings.bind_addr))?;

    let store = build_store(&settings)?;
    let renderer = Arc::new(PdfRenderer::new(settings.institute_name.clone()));
    let verifier = Verifier::new(store, renderer);
    let sessions = SessionStore::new(settings.session_ttl());

    let api_server = ApiServer::new(verifier, sessions, settings.allowed_origin.as_deref())
        .with_context(|| {
            format!(
                "invalid allowed origin `{}`",
                settings.allowed_origin.as_deref().unwrap_or_default()
            )
        })?;

    info!("Available endpoints:");
    info!("- POST /verify/sessions");
    info!("- GET  /verify/sessions/:id");
    info!("- POST /verify/sessions/:id/search");
    info!("- POST /verify/sessions/:id/confirm");
    info!("- POST /verify/sessions/:id/reset");
    info!("- GET  /verify/sessions/:id/download");

    api_server
        .run(addr)
        .await
        .context("API server terminated")
}
