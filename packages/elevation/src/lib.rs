#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Ground elevation lookups.
//!
//! Line-of-sight checks need the terrain elevation under both the pole and
//! the agent. This crate defines the [`ElevationProvider`] seam and an
//! HTTP implementation backed by one of the providers in
//! [`service_registry`]. Lookups are treated as unreliable: transient
//! failures are retried, and anything else surfaces as an
//! [`ElevationError`] rather than a default elevation.

pub mod google;
pub mod open_elevation;
pub mod retry;
pub mod service_registry;

use std::time::Duration;

use async_trait::async_trait;
use pole_guard_zone_models::Coordinate;

use crate::service_registry::{ElevationService, ProviderConfig};

/// Errors that can occur during an elevation lookup.
#[derive(Debug, thiserror::Error)]
pub enum ElevationError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success HTTP status.
    #[error("HTTP status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// The provider answered but reported an error.
    #[error("Elevation API returned {status}: {message}")]
    Api {
        /// Provider status string (e.g. `REQUEST_DENIED`).
        status: String,
        /// Provider error message.
        message: String,
    },

    /// The response held no elevation for the requested point.
    #[error("Elevation API returned no elevation data")]
    MissingResult,

    /// The provider cannot be used as configured (e.g. missing API key).
    #[error("Elevation provider not configured: {message}")]
    NotConfigured {
        /// What is missing.
        message: String,
    },

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },
}

/// Looks up terrain elevation for a coordinate.
#[async_trait]
pub trait ElevationProvider: Send + Sync {
    /// Ground elevation at `at`, in meters above sea level.
    async fn elevation(&self, at: Coordinate) -> Result<f64, ElevationError>;
}

/// Runtime options for [`HttpElevationProvider`].
#[derive(Debug, Clone)]
pub struct ProviderOptions {
    /// API key, required by providers that ask for one.
    pub api_key: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retries for transient failures.
    pub max_retries: u32,
    /// Overrides the registry's endpoint (self-hosted instances, tests).
    pub base_url: Option<String>,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            api_key: None,
            timeout: Duration::from_secs(10),
            max_retries: 2,
            base_url: None,
        }
    }
}

/// [`ElevationProvider`] that calls a registry provider over HTTP.
pub struct HttpElevationProvider {
    client: reqwest::Client,
    service: ElevationService,
    base_url: String,
    api_key: Option<String>,
    max_retries: u32,
}

impl HttpElevationProvider {
    /// Creates a provider for `service`.
    ///
    /// A missing API key is not an error here; it is reported on the first
    /// lookup, so that the rest of the system can run without elevation
    /// configured.
    ///
    /// # Errors
    ///
    /// Returns [`ElevationError::Http`] if the HTTP client cannot be built.
    pub fn new(service: ElevationService, options: ProviderOptions) -> Result<Self, ElevationError> {
        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .build()?;
        let base_url = options
            .base_url
            .unwrap_or_else(|| service.base_url().to_string());
        let api_key = options.api_key.filter(|k| !k.trim().is_empty());

        log::info!(
            "Elevation provider: {} ({base_url}), key configured: {}",
            service.name,
            api_key.is_some()
        );

        Ok(Self {
            client,
            service,
            base_url,
            api_key,
            max_retries: options.max_retries,
        })
    }

    /// The registry entry this provider was built from.
    #[must_use]
    pub const fn service(&self) -> &ElevationService {
        &self.service
    }
}

#[async_trait]
impl ElevationProvider for HttpElevationProvider {
    async fn elevation(&self, at: Coordinate) -> Result<f64, ElevationError> {
        match &self.service.provider {
            ProviderConfig::Google { .. } => {
                let api_key =
                    self.api_key
                        .as_deref()
                        .ok_or_else(|| ElevationError::NotConfigured {
                            message: format!("{} API key not configured", self.service.name),
                        })?;
                google::fetch(&self.client, &self.base_url, api_key, at, self.max_retries).await
            }
            ProviderConfig::OpenElevation { .. } => {
                open_elevation::fetch(&self.client, &self.base_url, at, self.max_retries).await
            }
        }
    }
}
