//! TOML configuration.
//!
//! Every field has a default, so an empty file (or no file) is valid:
//!
//! ```toml
//! [cache]
//! zone_ttl_secs = 3600
//! poles_ttl_secs = 300
//!
//! [elevation]
//! provider = "google"
//! api_key_env = "GOOGLE_MAPS_API_KEY"
//! timeout_secs = 10
//! max_retries = 2
//! # base_url = "http://localhost:8080/api/v1/lookup"
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use pole_guard_cache::{CacheConfig, SnapshotCache};
use pole_guard_elevation::service_registry::{self, ElevationService};
use pole_guard_elevation::{ElevationError, HttpElevationProvider, ProviderOptions};
use pole_guard_store::Store;
use serde::Deserialize;

use crate::PolicyService;

/// Errors loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Config I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML for [`PolicyConfig`].
    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// No enabled elevation provider has this id.
    #[error("Unknown elevation provider: {id}")]
    UnknownProvider {
        /// The configured id.
        id: String,
    },

    /// The elevation client could not be built.
    #[error(transparent)]
    Elevation(#[from] ElevationError),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Snapshot cache TTLs.
    pub cache: CacheSettings,
    /// Elevation provider selection.
    pub elevation: ElevationSettings,
}

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Seconds a zone record stays cached.
    pub zone_ttl_secs: u64,
    /// Seconds an active pole list stays cached.
    pub poles_ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            zone_ttl_secs: 3600,
            poles_ttl_secs: 300,
        }
    }
}

impl CacheSettings {
    /// The TTLs as a [`CacheConfig`].
    #[must_use]
    pub const fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            zone_ttl: Duration::from_secs(self.zone_ttl_secs),
            poles_ttl: Duration::from_secs(self.poles_ttl_secs),
        }
    }
}

/// `[elevation]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ElevationSettings {
    /// Registry id of the provider (`"google"` or `"open_elevation"`).
    pub provider: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Retries for transient failures.
    pub max_retries: u32,
    /// Endpoint override.
    pub base_url: Option<String>,
}

impl Default for ElevationSettings {
    fn default() -> Self {
        Self {
            provider: "google".to_string(),
            api_key_env: "GOOGLE_MAPS_API_KEY".to_string(),
            timeout_secs: 10,
            max_retries: 2,
            base_url: None,
        }
    }
}

impl ElevationSettings {
    /// The registry entry for [`Self::provider`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownProvider`] if no enabled provider has
    /// that id.
    pub fn service(&self) -> Result<ElevationService, ConfigError> {
        service_registry::service(&self.provider).ok_or_else(|| ConfigError::UnknownProvider {
            id: self.provider.clone(),
        })
    }

    /// Client options, with the API key read from [`Self::api_key_env`].
    #[must_use]
    pub fn provider_options(&self) -> ProviderOptions {
        ProviderOptions {
            api_key: std::env::var(&self.api_key_env).ok(),
            timeout: Duration::from_secs(self.timeout_secs),
            max_retries: self.max_retries,
            base_url: self.base_url.clone(),
        }
    }

    /// Builds the configured HTTP elevation client.
    ///
    /// A missing API key is reported on the first lookup, not here.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for an unknown provider or if the HTTP client
    /// cannot be built.
    pub fn build_provider(&self) -> Result<HttpElevationProvider, ConfigError> {
        let service = self.service()?;
        let options = self.provider_options();

        if service.requires_api_key() && options.api_key.is_none() {
            log::warn!(
                "{} is not set; line-of-sight calculations will fail",
                self.api_key_env
            );
        }

        Ok(HttpElevationProvider::new(service, options)?)
    }
}

impl PolicyConfig {
    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] if the input is not valid.
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let input = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&input)?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }
}

impl<S: Store> PolicyService<S, HttpElevationProvider> {
    /// Builds a service over `store` with the configured cache TTLs and
    /// elevation provider.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the elevation provider cannot be built.
    pub fn from_config(store: Arc<S>, config: &PolicyConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            store,
            config.elevation.build_provider()?,
            SnapshotCache::new(config.cache.cache_config()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = PolicyConfig::from_toml("").unwrap();
        assert_eq!(config, PolicyConfig::default());
        assert_eq!(config.cache.cache_config(), CacheConfig::default());
        assert_eq!(config.elevation.provider, "google");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = PolicyConfig::from_toml(
            r#"
            [cache]
            poles_ttl_secs = 60

            [elevation]
            provider = "open_elevation"
            base_url = "http://localhost:8080/api/v1/lookup"
            "#,
        )
        .unwrap();

        assert_eq!(config.cache.zone_ttl_secs, 3600);
        assert_eq!(config.cache.poles_ttl_secs, 60);
        assert_eq!(config.elevation.max_retries, 2);
        assert_eq!(
            config.elevation.provider_options().base_url.as_deref(),
            Some("http://localhost:8080/api/v1/lookup")
        );
        assert_eq!(config.elevation.service().unwrap().id, "open_elevation");
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let config = PolicyConfig::from_toml("[elevation]\nprovider = \"bing\"\n").unwrap();
        assert!(matches!(
            config.elevation.build_provider(),
            Err(ConfigError::UnknownProvider { id }) if id == "bing"
        ));
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(matches!(
            PolicyConfig::from_toml("[cache\n"),
            Err(ConfigError::Toml(_))
        ));
    }
}
