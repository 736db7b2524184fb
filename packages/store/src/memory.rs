//! In-memory repository implementation.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use pole_guard_policy_models::{LineOfSightCalculation, NewCalculation};
use pole_guard_zone_models::{
    CalculationId, LandOwner, LandOwnerId, NewPole, NewZone, Pole, PoleId, User, UserId, Zone,
    ZoneId,
};

use crate::{
    CalculationRepository, Dataset, LandOwnerRepository, PoleRepository, StoreError, StoreResult,
    UserRepository, ZoneRepository,
};

/// In-memory store backed by ordered maps.
///
/// Cloning shares the underlying data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    data: Arc<RwLock<MemoryData>>,
}

#[derive(Default)]
struct MemoryData {
    zones: BTreeMap<ZoneId, Zone>,
    poles: BTreeMap<PoleId, Pole>,
    users: BTreeMap<UserId, User>,
    land_owners: BTreeMap<LandOwnerId, LandOwner>,
    calculations: Vec<LineOfSightCalculation>,
    next_zone_id: i64,
    next_pole_id: i64,
    next_calculation_id: i64,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with every record of `dataset`.
    ///
    /// New ids continue after the highest id still referenced anywhere in
    /// the dataset, so a deleted pole's id is never handed out again while
    /// calculations still point at it.
    #[must_use]
    pub fn from_dataset(dataset: Dataset) -> Self {
        let next_zone_id = dataset
            .zones
            .iter()
            .map(|z| z.id.0)
            .chain(dataset.users.iter().filter_map(|u| u.zone_id).map(|id| id.0))
            .chain(dataset.land_owners.iter().map(|o| o.zone_id.0))
            .max()
            .unwrap_or(0);
        let next_pole_id = dataset
            .poles
            .iter()
            .map(|p| p.id.0)
            .chain(dataset.line_of_sight_calculations.iter().map(|c| c.pole_id.0))
            .max()
            .unwrap_or(0);
        let next_calculation_id = dataset
            .line_of_sight_calculations
            .iter()
            .map(|c| c.id.0)
            .max()
            .unwrap_or(0);

        let data = MemoryData {
            zones: dataset.zones.into_iter().map(|z| (z.id, z)).collect(),
            poles: dataset.poles.into_iter().map(|p| (p.id, p)).collect(),
            users: dataset.users.into_iter().map(|u| (u.id, u)).collect(),
            land_owners: dataset
                .land_owners
                .into_iter()
                .map(|o| (o.id, o))
                .collect(),
            calculations: dataset.line_of_sight_calculations,
            next_zone_id,
            next_pole_id,
            next_calculation_id,
        };

        Self {
            data: Arc::new(RwLock::new(data)),
        }
    }

    /// Exports every record as a [`Dataset`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Poisoned`] if the store lock is poisoned.
    pub fn dataset(&self) -> StoreResult<Dataset> {
        let data = self.read()?;
        Ok(Dataset {
            zones: data.zones.values().cloned().collect(),
            poles: data.poles.values().cloned().collect(),
            users: data.users.values().cloned().collect(),
            land_owners: data.land_owners.values().cloned().collect(),
            line_of_sight_calculations: data.calculations.clone(),
        })
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, MemoryData>> {
        self.data.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, MemoryData>> {
        self.data.write().map_err(|_| StoreError::Poisoned)
    }
}

fn newest_first(records: &mut [LineOfSightCalculation]) {
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

#[async_trait]
impl ZoneRepository for MemoryStore {
    async fn zone(&self, id: ZoneId) -> StoreResult<Option<Zone>> {
        Ok(self.read()?.zones.get(&id).cloned())
    }

    async fn zones(&self) -> StoreResult<Vec<Zone>> {
        Ok(self.read()?.zones.values().cloned().collect())
    }

    async fn insert_zone(&self, zone: NewZone) -> StoreResult<Zone> {
        let mut data = self.write()?;
        data.next_zone_id += 1;
        let zone = Zone {
            id: ZoneId(data.next_zone_id),
            name: zone.name,
            boundary: zone.boundary,
            description: zone.description,
            status: zone.status.unwrap_or_default(),
        };
        data.zones.insert(zone.id, zone.clone());
        drop(data);
        Ok(zone)
    }

    async fn update_zone(&self, zone: Zone) -> StoreResult<Zone> {
        let mut data = self.write()?;
        let slot = data.zones.get_mut(&zone.id).ok_or(StoreError::NotFound {
            entity: "Zone",
            id: zone.id.0,
        })?;
        *slot = zone.clone();
        drop(data);
        Ok(zone)
    }

    async fn delete_zone(&self, id: ZoneId) -> StoreResult<bool> {
        Ok(self.write()?.zones.remove(&id).is_some())
    }
}

#[async_trait]
impl PoleRepository for MemoryStore {
    async fn pole(&self, id: PoleId) -> StoreResult<Option<Pole>> {
        Ok(self.read()?.poles.get(&id).cloned())
    }

    async fn poles_in_zone(&self, zone_id: ZoneId) -> StoreResult<Vec<Pole>> {
        Ok(self
            .read()?
            .poles
            .values()
            .filter(|p| p.zone_id == zone_id)
            .cloned()
            .collect())
    }

    async fn active_poles_in_zone(&self, zone_id: ZoneId) -> StoreResult<Vec<Pole>> {
        Ok(self
            .read()?
            .poles
            .values()
            .filter(|p| p.zone_id == zone_id && p.is_active())
            .cloned()
            .collect())
    }

    async fn poles(&self) -> StoreResult<Vec<Pole>> {
        Ok(self.read()?.poles.values().cloned().collect())
    }

    async fn insert_pole(&self, pole: NewPole) -> StoreResult<Pole> {
        let mut data = self.write()?;
        data.next_pole_id += 1;
        let pole = pole.into_pole(PoleId(data.next_pole_id));
        data.poles.insert(pole.id, pole.clone());
        drop(data);
        Ok(pole)
    }

    async fn update_pole(&self, pole: Pole) -> StoreResult<Pole> {
        let mut data = self.write()?;
        let slot = data.poles.get_mut(&pole.id).ok_or(StoreError::NotFound {
            entity: "Pole",
            id: pole.id.0,
        })?;
        *slot = pole.clone();
        drop(data);
        Ok(pole)
    }

    async fn delete_pole(&self, id: PoleId) -> StoreResult<bool> {
        Ok(self.write()?.poles.remove(&id).is_some())
    }
}

#[async_trait]
impl CalculationRepository for MemoryStore {
    async fn insert_calculation(
        &self,
        calculation: NewCalculation,
    ) -> StoreResult<LineOfSightCalculation> {
        let mut data = self.write()?;
        data.next_calculation_id += 1;
        let record =
            calculation.into_calculation(CalculationId(data.next_calculation_id), Utc::now());
        data.calculations.push(record.clone());
        drop(data);
        Ok(record)
    }

    async fn calculations_for_pole(
        &self,
        pole_id: PoleId,
    ) -> StoreResult<Vec<LineOfSightCalculation>> {
        let mut records: Vec<_> = self
            .read()?
            .calculations
            .iter()
            .filter(|c| c.pole_id == pole_id)
            .cloned()
            .collect();
        newest_first(&mut records);
        Ok(records)
    }

    async fn calculations(
        &self,
        zone_id: Option<ZoneId>,
    ) -> StoreResult<Vec<LineOfSightCalculation>> {
        let data = self.read()?;
        let mut records: Vec<_> = data
            .calculations
            .iter()
            .filter(|c| {
                zone_id.is_none_or(|zone_id| {
                    data.poles
                        .get(&c.pole_id)
                        .is_some_and(|p| p.zone_id == zone_id)
                })
            })
            .cloned()
            .collect();
        drop(data);
        newest_first(&mut records);
        Ok(records)
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn user(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn users_in_zone(&self, zone_id: ZoneId) -> StoreResult<Vec<User>> {
        Ok(self
            .read()?
            .users
            .values()
            .filter(|u| u.zone_id == Some(zone_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl LandOwnerRepository for MemoryStore {
    async fn land_owner(&self, id: LandOwnerId) -> StoreResult<Option<LandOwner>> {
        Ok(self.read()?.land_owners.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use pole_guard_policy_models::{LineOfSightOutcome, LineOfSightResult};
    use pole_guard_zone_models::{BoundaryPoint, Coordinate, Status};

    use super::*;

    fn new_zone(name: &str) -> NewZone {
        NewZone {
            name: name.to_string(),
            boundary: vec![
                BoundaryPoint::LatLng { lat: 31.50, lng: 74.30 },
                BoundaryPoint::LatLng { lat: 31.50, lng: 74.31 },
                BoundaryPoint::LatLng { lat: 31.51, lng: 74.31 },
            ],
            description: None,
            status: None,
        }
    }

    fn new_pole(zone_id: ZoneId, name: &str) -> NewPole {
        NewPole {
            pole_name: name.to_string(),
            position: Coordinate::new(31.505, 74.305).unwrap(),
            pole_height: 20.0,
            restricted_radius: 100.0,
            zone_id,
            land_owner_id: None,
            status: None,
        }
    }

    fn new_calculation(pole_id: PoleId) -> NewCalculation {
        NewCalculation {
            pole_id,
            agent: Coordinate::new(31.506, 74.306).unwrap(),
            agent_elevation: 210.0,
            pole_elevation: 205.0,
            distance_from_pole: 140.0,
            outcome: LineOfSightOutcome {
                result: LineOfSightResult::Partial,
                extra_height_required: Some(5.0),
                pole_top_elevation: 225.0,
                elevation_difference: 15.0,
            },
            calculated_by: None,
            calculation_notes: None,
        }
    }

    #[tokio::test]
    async fn assigns_sequential_ids() {
        let store = MemoryStore::new();
        let a = store.insert_zone(new_zone("A")).await.unwrap();
        let b = store.insert_zone(new_zone("B")).await.unwrap();
        assert_eq!(a.id, ZoneId(1));
        assert_eq!(b.id, ZoneId(2));
        assert_eq!(a.status, Status::Active);
    }

    #[tokio::test]
    async fn seeded_store_continues_after_highest_id() {
        let mut zone = MemoryStore::new()
            .insert_zone(new_zone("A"))
            .await
            .unwrap();
        zone.id = ZoneId(41);
        let store = MemoryStore::from_dataset(Dataset {
            zones: vec![zone],
            ..Dataset::default()
        });

        let next = store.insert_zone(new_zone("B")).await.unwrap();
        assert_eq!(next.id, ZoneId(42));
    }

    #[tokio::test]
    async fn deleted_pole_id_is_not_reused_after_reload() {
        let store = MemoryStore::new();
        let zone = store.insert_zone(new_zone("A")).await.unwrap();
        store.insert_pole(new_pole(zone.id, "kept")).await.unwrap();
        let gone = store.insert_pole(new_pole(zone.id, "gone")).await.unwrap();
        store.insert_calculation(new_calculation(gone.id)).await.unwrap();
        assert!(store.delete_pole(gone.id).await.unwrap());

        let reloaded = MemoryStore::from_dataset(store.dataset().unwrap());
        let fresh = reloaded.insert_pole(new_pole(zone.id, "fresh")).await.unwrap();

        assert_eq!(fresh.id, PoleId(3));
        assert!(
            reloaded
                .calculations_for_pole(fresh.id)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn filters_active_poles_by_zone() {
        let store = MemoryStore::new();
        let zone = store.insert_zone(new_zone("A")).await.unwrap();
        let other = store.insert_zone(new_zone("B")).await.unwrap();

        store.insert_pole(new_pole(zone.id, "on")).await.unwrap();
        let mut off = store.insert_pole(new_pole(zone.id, "off")).await.unwrap();
        off.status = Status::Inactive;
        store.update_pole(off).await.unwrap();
        store.insert_pole(new_pole(other.id, "elsewhere")).await.unwrap();

        let active = store.active_poles_in_zone(zone.id).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].pole_name, "on");
        assert_eq!(store.poles_in_zone(zone.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn update_of_missing_pole_is_not_found() {
        let store = MemoryStore::new();
        let pole = new_pole(ZoneId(1), "ghost").into_pole(PoleId(99));
        assert!(matches!(
            store.update_pole(pole).await,
            Err(StoreError::NotFound { entity: "Pole", id: 99 })
        ));
    }

    #[tokio::test]
    async fn history_is_newest_first_and_zone_filtered() {
        let store = MemoryStore::new();
        let zone = store.insert_zone(new_zone("A")).await.unwrap();
        let other = store.insert_zone(new_zone("B")).await.unwrap();
        let pole = store.insert_pole(new_pole(zone.id, "p")).await.unwrap();
        let far = store.insert_pole(new_pole(other.id, "q")).await.unwrap();

        for _ in 0..3 {
            store.insert_calculation(new_calculation(pole.id)).await.unwrap();
        }
        store.insert_calculation(new_calculation(far.id)).await.unwrap();

        let history = store.calculations_for_pole(pole.id).await.unwrap();
        let ids: Vec<_> = history.iter().map(|c| c.id.0).collect();
        assert_eq!(ids, [3, 2, 1]);

        assert_eq!(store.calculations(Some(zone.id)).await.unwrap().len(), 3);
        assert_eq!(store.calculations(None).await.unwrap().len(), 4);
        assert_eq!(store.calculations(None).await.unwrap()[0].id.0, 4);
    }

    #[tokio::test]
    async fn dataset_export_round_trips() {
        let store = MemoryStore::new();
        let zone = store.insert_zone(new_zone("A")).await.unwrap();
        store.insert_pole(new_pole(zone.id, "p")).await.unwrap();

        let reloaded = MemoryStore::from_dataset(store.dataset().unwrap());
        assert_eq!(reloaded.zones().await.unwrap(), vec![zone]);
        assert_eq!(reloaded.poles().await.unwrap().len(), 1);
    }
}
