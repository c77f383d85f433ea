// src/config.rs
//! Service configuration.
//!
//! Settings are layered, later sources overriding earlier ones:
//! 1. Built-in defaults
//! 2. An optional `certdesk.toml` (or `.json`/`.yaml`) in the working directory
//! 3. `CERTDESK_*` environment variables, with `__` separating nested keys
//!
//! ## Environment Variables
//! - `CERTDESK_BIND_ADDR`: listen address (default: 127.0.0.1:3000)
//! - `CERTDESK_INSTITUTE_NAME`: heading printed on certificates
//! - `CERTDESK_ALLOWED_ORIGIN`: website origin allowed by CORS (default: any;
//!   an invalid value stops startup)
//! - `CERTDESK_SESSION_TTL_SECS`: idle verification session lifetime
//! - `CERTDESK_STORE__BASE_URL`: document database REST root
//! - `CERTDESK_STORE__API_KEY`: bearer token for the document database
//! - `CERTDESK_STORE__COLLECTION`: collection name (default: certificates)
//! - `CERTDESK_STORE__TIMEOUT_SECS`: query timeout
//! - `CERTDESK_STORE__SEED_FILE`: JSON file for the in-memory store, used when
//!   no base URL is set

use crate::storage::record_store::CERTIFICATES_COLLECTION;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat};
use config::builder::DefaultState;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level service settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub bind_addr: String,
    pub institute_name: String,
    pub allowed_origin: Option<String>,
    pub session_ttl_secs: u64,
    pub store: StoreSettings,
}

/// Record store connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub collection: String,
    pub timeout_secs: u64,
    pub seed_file: Option<PathBuf>,
}

impl Settings {
    /// Loads settings from defaults, `certdesk.*` and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::defaults()?
            .add_source(File::with_name("certdesk").required(false))
            .add_source(
                Environment::with_prefix("CERTDESK")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }

    /// Loads settings from defaults overlaid with a TOML document.
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        Self::defaults()?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("bind_addr", "127.0.0.1:3000")?
            .set_default("institute_name", "Vocational Training Institute")?
            .set_default("session_ttl_secs", 1800_i64)?
            .set_default("store.collection", CERTIFICATES_COLLECTION)?
            .set_default("store.timeout_secs", 10_i64)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings.bind_addr, "127.0.0.1:3000");
        assert_eq!(settings.session_ttl(), Duration::from_secs(1800));
        assert_eq!(settings.store.collection, "certificates");
        assert_eq!(settings.store.timeout_secs, 10);
        assert!(settings.store.base_url.is_none());
        assert!(settings.allowed_origin.is_none());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let settings = Settings::from_toml(
            r#"
            institute_name = "Jharkhand Technical Institute"
            allowed_origin = "https://jti.example.org"

            [store]
            base_url = "https://db.example.org/v1"
            api_key = "k-123"
            timeout_secs = 3
            "#,
        )
        .unwrap();
        assert_eq!(settings.institute_name, "Jharkhand Technical Institute");
        assert_eq!(settings.store.base_url.as_deref(), Some("https://db.example.org/v1"));
        assert_eq!(settings.store.timeout_secs, 3);
        assert_eq!(settings.store.collection, "certificates");
    }
}
