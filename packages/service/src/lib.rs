#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Orchestration layer of the pole guard.
//!
//! [`PolicyService`] ties the pure policy functions to a [`Store`], an
//! [`ElevationProvider`], and a [`SnapshotCache`]:
//!
//! - pole and zone mutations validate, check containment and overlap,
//!   persist, and then invalidate the zone's cached snapshot before
//!   returning;
//! - location checks read the zone and its active poles through the cache;
//! - line-of-sight requests fetch both elevations concurrently and append
//!   an immutable calculation record.
//!
//! Callers are trusted to have scoped the request to the right zone; no
//! authorization happens here.

pub mod config;
mod error;
mod line_of_sight;
mod location;
mod poles;
mod zones;

use std::sync::Arc;

use async_trait::async_trait;
use pole_guard_cache::{Clock, SnapshotCache, SnapshotSource, SystemClock, ZonePoleSnapshot};
use pole_guard_elevation::ElevationProvider;
use pole_guard_store::{Store, StoreError};
use pole_guard_zone_models::{Pole, Zone, ZoneId};

pub use error::ServiceError;
pub use line_of_sight::LineOfSightRequest;

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// The pole guard's entry point.
pub struct PolicyService<S, E, C: Clock = SystemClock> {
    store: Arc<S>,
    elevation: E,
    cache: SnapshotCache<C>,
}

impl<S, E, C> PolicyService<S, E, C>
where
    S: Store,
    E: ElevationProvider,
    C: Clock,
{
    /// Creates a service over `store`, fetching elevations from
    /// `elevation` and caching zone snapshots in `cache`.
    pub const fn new(store: Arc<S>, elevation: E, cache: SnapshotCache<C>) -> Self {
        Self {
            store,
            elevation,
            cache,
        }
    }

    /// The backing store.
    #[must_use]
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The zone's record and active poles, read through the cache.
    async fn snapshot(&self, zone_id: ZoneId) -> ServiceResult<ZonePoleSnapshot> {
        self.cache
            .snapshot(zone_id, &StoreSource(self.store.as_ref()))
            .await?
            .ok_or(ServiceError::ZoneNotFound(zone_id))
    }

    /// Drops the cached snapshot of `zone_id`.
    ///
    /// A cache failure never fails the mutation that triggered it. The
    /// stale entries then expire through their TTLs.
    fn invalidate(&self, zone_id: ZoneId) {
        if let Err(e) = self.cache.invalidate(zone_id) {
            log::warn!("Failed to invalidate snapshot for zone {zone_id}: {e}");
        }
    }
}

/// Feeds cache misses from the store.
struct StoreSource<'a, S>(&'a S);

#[async_trait]
impl<S: Store> SnapshotSource for StoreSource<'_, S> {
    type Error = StoreError;

    async fn load_zone(&self, zone_id: ZoneId) -> Result<Option<Zone>, StoreError> {
        self.0.zone(zone_id).await
    }

    async fn load_active_poles(&self, zone_id: ZoneId) -> Result<Vec<Pole>, StoreError> {
        self.0.active_poles_in_zone(zone_id).await
    }
}
