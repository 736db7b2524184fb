#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Persistence interfaces for zones, poles, users, land owners, and
//! line-of-sight records.
//!
//! The policy service depends only on the traits in this crate. The
//! bundled [`MemoryStore`] backs the CLI and the test suites and can be
//! seeded from (and written back to) a JSON [`Dataset`].

mod dataset;
mod memory;

use async_trait::async_trait;
use pole_guard_policy_models::{LineOfSightCalculation, NewCalculation};
use pole_guard_zone_models::{
    LandOwner, LandOwnerId, NewPole, NewZone, Pole, PoleId, User, UserId, Zone, ZoneId,
};

pub use dataset::Dataset;
pub use memory::MemoryStore;

/// Result type for repository operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from a repository backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested record does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of record.
        entity: &'static str,
        /// Requested id.
        id: i64,
    },

    /// The backend's lock was poisoned by a panicking writer.
    #[error("Store lock poisoned")]
    Poisoned,

    /// A dataset file could not be read or written.
    #[error("Dataset I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A dataset file is not valid JSON for a [`Dataset`].
    #[error("Dataset parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Zone persistence.
#[async_trait]
pub trait ZoneRepository: Send + Sync {
    /// Fetches a zone by id.
    async fn zone(&self, id: ZoneId) -> StoreResult<Option<Zone>>;

    /// Lists every zone, ordered by id.
    async fn zones(&self) -> StoreResult<Vec<Zone>>;

    /// Inserts a new zone and returns it with its assigned id.
    async fn insert_zone(&self, zone: NewZone) -> StoreResult<Zone>;

    /// Replaces an existing zone record.
    ///
    /// Returns [`StoreError::NotFound`] if the id is unknown.
    async fn update_zone(&self, zone: Zone) -> StoreResult<Zone>;

    /// Deletes a zone. Returns whether a record was removed.
    async fn delete_zone(&self, id: ZoneId) -> StoreResult<bool>;
}

/// Pole persistence.
#[async_trait]
pub trait PoleRepository: Send + Sync {
    /// Fetches a pole by id.
    async fn pole(&self, id: PoleId) -> StoreResult<Option<Pole>>;

    /// Every pole of a zone regardless of status, ordered by id.
    async fn poles_in_zone(&self, zone_id: ZoneId) -> StoreResult<Vec<Pole>>;

    /// Active poles of a zone, ordered by id.
    async fn active_poles_in_zone(&self, zone_id: ZoneId) -> StoreResult<Vec<Pole>>;

    /// Every pole, ordered by id.
    async fn poles(&self) -> StoreResult<Vec<Pole>>;

    /// Inserts a new pole and returns it with its assigned id.
    async fn insert_pole(&self, pole: NewPole) -> StoreResult<Pole>;

    /// Replaces an existing pole record.
    ///
    /// Returns [`StoreError::NotFound`] if the id is unknown.
    async fn update_pole(&self, pole: Pole) -> StoreResult<Pole>;

    /// Deletes a pole. Returns whether a record was removed.
    async fn delete_pole(&self, id: PoleId) -> StoreResult<bool>;
}

/// Append-only line-of-sight history.
#[async_trait]
pub trait CalculationRepository: Send + Sync {
    /// Appends a record, assigning its id and creation time atomically.
    async fn insert_calculation(
        &self,
        calculation: NewCalculation,
    ) -> StoreResult<LineOfSightCalculation>;

    /// History of one pole, newest first.
    async fn calculations_for_pole(
        &self,
        pole_id: PoleId,
    ) -> StoreResult<Vec<LineOfSightCalculation>>;

    /// Every record, newest first, optionally restricted to poles of one
    /// zone.
    async fn calculations(
        &self,
        zone_id: Option<ZoneId>,
    ) -> StoreResult<Vec<LineOfSightCalculation>>;
}

/// User lookups needed for zone scoping.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fetches a user by id.
    async fn user(&self, id: UserId) -> StoreResult<Option<User>>;

    /// Users assigned to a zone.
    async fn users_in_zone(&self, zone_id: ZoneId) -> StoreResult<Vec<User>>;
}

/// Land owner lookups.
#[async_trait]
pub trait LandOwnerRepository: Send + Sync {
    /// Fetches a land owner by id.
    async fn land_owner(&self, id: LandOwnerId) -> StoreResult<Option<LandOwner>>;
}

/// Everything the policy service needs from persistence.
pub trait Store:
    ZoneRepository + PoleRepository + CalculationRepository + UserRepository + LandOwnerRepository
{
}

impl<T> Store for T where
    T: ZoneRepository
        + PoleRepository
        + CalculationRepository
        + UserRepository
        + LandOwnerRepository
{
}
