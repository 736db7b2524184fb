#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Zone/pole snapshot cache.
//!
//! Each zone has two independently expiring entries: the zone record
//! (boundaries change rarely, long TTL) and its active pole list (short
//! TTL). Mutations call [`SnapshotCache::invalidate`], which drops both
//! entries under a single write lock, so a reader never sees a fresh zone
//! paired with a stale pole list from before the mutation.
//!
//! Every slot carries a generation counter that invalidation bumps. A
//! read-through fill only writes back if the generation it started from is
//! still current, so a load that raced a mutation can never repopulate the
//! cache with pre-mutation data.

mod clock;

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use pole_guard_zone_models::{Pole, Zone, ZoneId};

pub use clock::{Clock, SystemClock};

/// How many times a read-through fill restarts after losing a race with
/// an invalidation before falling back to an uncached load.
const MAX_FILL_ATTEMPTS: usize = 3;

/// Errors from the cache itself.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// A thread panicked while holding the cache lock.
    #[error("Snapshot cache lock poisoned")]
    Poisoned,
}

/// Time-to-live settings for the two entry kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// How long a zone record stays fresh.
    pub zone_ttl: Duration,
    /// How long an active pole list stays fresh.
    pub poles_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            zone_ttl: Duration::from_secs(3600),
            poles_ttl: Duration::from_secs(300),
        }
    }
}

/// A zone together with its active poles.
#[derive(Debug, Clone, PartialEq)]
pub struct ZonePoleSnapshot {
    /// The zone record.
    pub zone: Arc<Zone>,
    /// Poles of the zone whose status is active.
    pub active_poles: Arc<Vec<Pole>>,
}

/// The authoritative store a cache miss is filled from.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Error returned by the underlying store.
    type Error: Send;

    /// Loads a zone by id, or `None` if it does not exist.
    async fn load_zone(&self, zone_id: ZoneId) -> Result<Option<Zone>, Self::Error>;

    /// Loads the active poles of a zone.
    async fn load_active_poles(&self, zone_id: ZoneId) -> Result<Vec<Pole>, Self::Error>;
}

struct Timed<T> {
    value: Arc<T>,
    expires_at: Instant,
}

impl<T> Timed<T> {
    fn fresh(&self, now: Instant) -> Option<Arc<T>> {
        (now < self.expires_at).then(|| Arc::clone(&self.value))
    }
}

#[derive(Default)]
struct Slot {
    generation: u64,
    zone: Option<Timed<Zone>>,
    poles: Option<Timed<Vec<Pole>>>,
}

struct Cached {
    generation: u64,
    zone: Option<Arc<Zone>>,
    poles: Option<Arc<Vec<Pole>>>,
}

/// In-process snapshot cache keyed by zone id.
pub struct SnapshotCache<C: Clock = SystemClock> {
    config: CacheConfig,
    clock: C,
    slots: RwLock<BTreeMap<ZoneId, Slot>>,
}

impl SnapshotCache<SystemClock> {
    /// Creates a cache on the system clock.
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> SnapshotCache<C> {
    /// Creates a cache on a caller-provided clock.
    #[must_use]
    pub const fn with_clock(config: CacheConfig, clock: C) -> Self {
        Self {
            config,
            clock,
            slots: RwLock::new(BTreeMap::new()),
        }
    }

    /// The configured TTLs.
    #[must_use]
    pub const fn config(&self) -> CacheConfig {
        self.config
    }

    /// Returns the cached snapshot if both entries are fresh.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Poisoned`] if the cache lock is poisoned.
    pub fn get(&self, zone_id: ZoneId) -> Result<Option<ZonePoleSnapshot>, CacheError> {
        let cached = self.lookup(zone_id)?;
        Ok(match (cached.zone, cached.poles) {
            (Some(zone), Some(active_poles)) => Some(ZonePoleSnapshot { zone, active_poles }),
            _ => None,
        })
    }

    /// Stores both entries of a snapshot with fresh TTLs.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Poisoned`] if the cache lock is poisoned.
    pub fn put(&self, snapshot: &ZonePoleSnapshot) -> Result<(), CacheError> {
        let now = self.clock.now();
        let mut slots = self.slots.write().map_err(|_| CacheError::Poisoned)?;
        let slot = slots.entry(snapshot.zone.id).or_default();
        slot.zone = Some(self.timed_zone(&snapshot.zone, now));
        slot.poles = Some(self.timed_poles(&snapshot.active_poles, now));
        drop(slots);
        Ok(())
    }

    /// Drops both entries for `zone_id` and advances its generation.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Poisoned`] if the cache lock is poisoned.
    pub fn invalidate(&self, zone_id: ZoneId) -> Result<(), CacheError> {
        let mut slots = self.slots.write().map_err(|_| CacheError::Poisoned)?;
        let slot = slots.entry(zone_id).or_default();
        slot.generation = slot.generation.wrapping_add(1);
        slot.zone = None;
        slot.poles = None;
        drop(slots);

        log::debug!("Invalidated snapshot for zone {zone_id}");
        Ok(())
    }

    /// Read-through lookup.
    ///
    /// Serves fresh entries from the cache and loads only the missing or
    /// expired ones from `source`. Returns `Ok(None)` if the zone does not
    /// exist. A poisoned cache degrades to an uncached load.
    ///
    /// # Errors
    ///
    /// Returns the source's error if a load fails.
    pub async fn snapshot<S>(
        &self,
        zone_id: ZoneId,
        source: &S,
    ) -> Result<Option<ZonePoleSnapshot>, S::Error>
    where
        S: SnapshotSource + ?Sized,
    {
        for _ in 0..MAX_FILL_ATTEMPTS {
            let cached = match self.lookup(zone_id) {
                Ok(cached) => cached,
                Err(e) => {
                    log::warn!("Bypassing snapshot cache for zone {zone_id}: {e}");
                    return load_uncached(zone_id, source).await;
                }
            };

            if let (Some(zone), Some(active_poles)) = (&cached.zone, &cached.poles) {
                log::debug!("Snapshot cache hit for zone {zone_id}");
                return Ok(Some(ZonePoleSnapshot {
                    zone: Arc::clone(zone),
                    active_poles: Arc::clone(active_poles),
                }));
            }

            log::debug!(
                "Snapshot cache miss for zone {zone_id} (zone cached: {}, poles cached: {})",
                cached.zone.is_some(),
                cached.poles.is_some()
            );

            let (zone, zone_loaded) = match cached.zone {
                Some(zone) => (zone, false),
                None => match source.load_zone(zone_id).await? {
                    Some(zone) => (Arc::new(zone), true),
                    None => return Ok(None),
                },
            };
            let (active_poles, poles_loaded) = match cached.poles {
                Some(poles) => (poles, false),
                None => (Arc::new(source.load_active_poles(zone_id).await?), true),
            };

            let loaded = Loaded {
                generation: cached.generation,
                zone: zone_loaded.then_some(&zone),
                poles: poles_loaded.then_some(&active_poles),
            };

            match self.fill(zone_id, &loaded) {
                Ok(true) => return Ok(Some(ZonePoleSnapshot { zone, active_poles })),
                Ok(false) => {
                    log::debug!("Zone {zone_id} was invalidated during fill, reloading");
                }
                Err(e) => {
                    log::warn!("Could not populate snapshot cache for zone {zone_id}: {e}");
                    return Ok(Some(ZonePoleSnapshot { zone, active_poles }));
                }
            }
        }

        load_uncached(zone_id, source).await
    }

    fn lookup(&self, zone_id: ZoneId) -> Result<Cached, CacheError> {
        let now = self.clock.now();
        let slots = self.slots.read().map_err(|_| CacheError::Poisoned)?;

        Ok(slots.get(&zone_id).map_or(
            Cached {
                generation: 0,
                zone: None,
                poles: None,
            },
            |slot| Cached {
                generation: slot.generation,
                zone: slot.zone.as_ref().and_then(|t| t.fresh(now)),
                poles: slot.poles.as_ref().and_then(|t| t.fresh(now)),
            },
        ))
    }

    /// Writes freshly loaded entries back if the slot has not been
    /// invalidated since `loaded.generation` was read.
    fn fill(&self, zone_id: ZoneId, loaded: &Loaded<'_>) -> Result<bool, CacheError> {
        let now = self.clock.now();
        let mut slots = self.slots.write().map_err(|_| CacheError::Poisoned)?;
        let slot = slots.entry(zone_id).or_default();

        if slot.generation != loaded.generation {
            return Ok(false);
        }

        if let Some(zone) = loaded.zone {
            slot.zone = Some(self.timed_zone(zone, now));
        }
        if let Some(poles) = loaded.poles {
            slot.poles = Some(self.timed_poles(poles, now));
        }
        drop(slots);

        Ok(true)
    }

    fn timed_zone(&self, zone: &Arc<Zone>, now: Instant) -> Timed<Zone> {
        Timed {
            value: Arc::clone(zone),
            expires_at: now + self.config.zone_ttl,
        }
    }

    fn timed_poles(&self, poles: &Arc<Vec<Pole>>, now: Instant) -> Timed<Vec<Pole>> {
        Timed {
            value: Arc::clone(poles),
            expires_at: now + self.config.poles_ttl,
        }
    }
}

struct Loaded<'a> {
    generation: u64,
    zone: Option<&'a Arc<Zone>>,
    poles: Option<&'a Arc<Vec<Pole>>>,
}

async fn load_uncached<S>(
    zone_id: ZoneId,
    source: &S,
) -> Result<Option<ZonePoleSnapshot>, S::Error>
where
    S: SnapshotSource + ?Sized,
{
    let Some(zone) = source.load_zone(zone_id).await? else {
        return Ok(None);
    };
    let active_poles = source.load_active_poles(zone_id).await?;

    Ok(Some(ZonePoleSnapshot {
        zone: Arc::new(zone),
        active_poles: Arc::new(active_poles),
    }))
}
