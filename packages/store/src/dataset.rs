use std::path::Path;

use pole_guard_policy_models::LineOfSightCalculation;
use pole_guard_zone_models::{LandOwner, Pole, User, Zone};
use serde::{Deserialize, Serialize};

use crate::StoreError;

/// A complete snapshot of persisted records, as stored in a JSON file.
///
/// Every list is optional in the file so that a dataset can hold only the
/// zones and poles needed for a quick check.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Zone records.
    #[serde(default)]
    pub zones: Vec<Zone>,
    /// Pole records.
    #[serde(default)]
    pub poles: Vec<Pole>,
    /// User accounts.
    #[serde(default)]
    pub users: Vec<User>,
    /// Land owner records.
    #[serde(default)]
    pub land_owners: Vec<LandOwner>,
    /// Line-of-sight history.
    #[serde(default)]
    pub line_of_sight_calculations: Vec<LineOfSightCalculation>,
}

impl Dataset {
    /// Parses a dataset from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Json`] if the input does not describe a valid
    /// dataset (including out-of-range pole coordinates).
    pub fn from_json(input: &str) -> Result<Self, StoreError> {
        Ok(serde_json::from_str(input)?)
    }

    /// Reads a dataset from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the file cannot be read, or
    /// [`StoreError::Json`] if it cannot be parsed.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let contents = std::fs::read_to_string(path)?;
        let dataset = Self::from_json(&contents)?;
        log::info!(
            "Loaded dataset from {}: {} zones, {} poles, {} users, {} calculations",
            path.display(),
            dataset.zones.len(),
            dataset.poles.len(),
            dataset.users.len(),
            dataset.line_of_sight_calculations.len()
        );
        Ok(dataset)
    }

    /// Writes the dataset to a JSON file, replacing its contents.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Json`] if serialization fails, or
    /// [`StoreError::Io`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        log::debug!("Wrote dataset to {}", path.display());
        Ok(())
    }
}
