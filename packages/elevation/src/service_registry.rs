//! Compile-time registry of elevation providers.
//!
//! Each provider is described by a TOML file under `services/`, embedded
//! at compile time and exposed via [`all_services`] and [`service`].

use serde::Deserialize;

/// An elevation provider configuration loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct ElevationService {
    /// Unique identifier (`"google"`, `"open_elevation"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Whether the provider may be selected.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Provider-specific configuration.
    pub provider: ProviderConfig,
}

/// Provider-specific configuration, tagged by `type` in TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Google Maps Elevation API. Requires an API key.
    Google {
        /// Endpoint URL.
        base_url: String,
    },
    /// Open-Elevation public or self-hosted instance. Keyless.
    OpenElevation {
        /// Endpoint URL.
        base_url: String,
    },
}

const fn default_true() -> bool {
    true
}

impl ElevationService {
    /// The provider's endpoint URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        match &self.provider {
            ProviderConfig::Google { base_url } | ProviderConfig::OpenElevation { base_url } => {
                base_url
            }
        }
    }

    /// Whether requests must carry an API key.
    #[must_use]
    pub const fn requires_api_key(&self) -> bool {
        matches!(self.provider, ProviderConfig::Google { .. })
    }
}

const SERVICE_TOMLS: &[(&str, &str)] = &[
    ("google", include_str!("../services/google.toml")),
    ("open_elevation", include_str!("../services/open_elevation.toml")),
];

#[cfg(test)]
const EXPECTED_SERVICE_COUNT: usize = 2;

/// Returns every provider configuration (enabled and disabled).
///
/// # Panics
///
/// Panics if an embedded TOML file is malformed.
#[must_use]
pub fn all_services() -> Vec<ElevationService> {
    SERVICE_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse elevation service '{name}': {e}"))
        })
        .collect()
}

/// Looks up an enabled provider by id.
#[must_use]
pub fn service(id: &str) -> Option<ElevationService> {
    all_services()
        .into_iter()
        .find(|s| s.enabled && s.id == id)
}
