//! Pole mutations.

use pole_guard_cache::Clock;
use pole_guard_elevation::ElevationProvider;
use pole_guard_policy::{OverlapCandidate, find_overlap_conflict};
use pole_guard_policy_models::OverlapConflict;
use pole_guard_spatial::point_in_zone;
use pole_guard_store::Store;
use pole_guard_zone_models::{
    Coordinate, LandOwnerId, NewPole, Pole, PoleId, PoleUpdate, Zone, ZoneId,
};

use crate::{PolicyService, ServiceError, ServiceResult};

impl<S, E, C> PolicyService<S, E, C>
where
    S: Store,
    E: ElevationProvider,
    C: Clock,
{
    /// Creates a pole.
    ///
    /// The pole must lie inside its zone and its restricted circle must not
    /// intersect that of any other pole in the zone, active or not.
    ///
    /// # Errors
    ///
    /// * [`ServiceError::Validation`] for out-of-range name, height, or radius
    /// * [`ServiceError::ZoneNotFound`] if the zone does not exist
    /// * [`ServiceError::PoleOutsideZone`] if the position is outside the zone
    /// * [`ServiceError::Overlap`] naming the conflicting pole
    /// * [`ServiceError::LandOwnerNotFound`] for an unknown land owner
    pub async fn create_pole(&self, new: NewPole) -> ServiceResult<Pole> {
        new.clone().into_pole(PoleId(0)).validate()?;

        let zone = self.zone(new.zone_id).await?;
        ensure_inside(&zone, new.position)?;

        let candidate = OverlapCandidate::new(new.zone_id, new.position, new.restricted_radius)?;
        self.ensure_no_overlap(&candidate, None).await?;

        if let Some(owner) = new.land_owner_id {
            self.ensure_land_owner(owner).await?;
        }

        let pole = self.store.insert_pole(new).await?;
        self.invalidate(pole.zone_id);

        log::info!(
            "Created pole {} '{}' in zone {}",
            pole.id,
            pole.pole_name,
            pole.zone_id
        );
        Ok(pole)
    }

    /// Applies a partial update to a pole.
    ///
    /// Containment is re-checked only when the position changes. Overlap is
    /// always re-checked against the other poles of the zone.
    ///
    /// # Errors
    ///
    /// Same as [`Self::create_pole`], plus [`ServiceError::PoleNotFound`].
    pub async fn update_pole(&self, id: PoleId, update: PoleUpdate) -> ServiceResult<Pole> {
        let existing = self.pole_or_not_found(id).await?;
        let moved = update.position()?.is_some();
        let new_owner = update.land_owner_id;

        let pole = update.apply(&existing)?;
        pole.validate()?;

        if moved {
            let zone = self.zone(pole.zone_id).await?;
            ensure_inside(&zone, pole.position)?;
        }

        let candidate = OverlapCandidate::for_pole(&pole)?;
        self.ensure_no_overlap(&candidate, Some(pole.id)).await?;

        if let Some(owner) = new_owner {
            self.ensure_land_owner(owner).await?;
        }

        let pole = self.store.update_pole(pole).await?;
        self.invalidate(pole.zone_id);

        log::info!("Updated pole {} '{}'", pole.id, pole.pole_name);
        Ok(pole)
    }

    /// Flips a pole between active and inactive.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::PoleNotFound`] or a store error.
    pub async fn toggle_pole_status(&self, id: PoleId) -> ServiceResult<Pole> {
        let mut pole = self.pole_or_not_found(id).await?;
        pole.status = pole.status.toggled();

        let pole = self.store.update_pole(pole).await?;
        self.invalidate(pole.zone_id);

        log::info!("Pole {} is now {}", pole.id, pole.status);
        Ok(pole)
    }

    /// Deletes a pole. Its line-of-sight history is kept.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::PoleNotFound`] or a store error.
    pub async fn delete_pole(&self, id: PoleId) -> ServiceResult<()> {
        let pole = self.pole_or_not_found(id).await?;

        if self.store.delete_pole(id).await? {
            self.invalidate(pole.zone_id);
            log::info!("Deleted pole {id} '{}'", pole.pole_name);
            Ok(())
        } else {
            Err(ServiceError::PoleNotFound(id))
        }
    }

    /// Lists poles of one zone, or of every zone, regardless of status.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub async fn list_poles(&self, zone_id: Option<ZoneId>) -> ServiceResult<Vec<Pole>> {
        Ok(match zone_id {
            Some(zone_id) => self.store.poles_in_zone(zone_id).await?,
            None => self.store.poles().await?,
        })
    }

    /// Fetches a pole.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::PoleNotFound`] or a store error.
    pub async fn pole(&self, id: PoleId) -> ServiceResult<Pole> {
        self.pole_or_not_found(id).await
    }

    /// Reports the pole a candidate would conflict with, without writing.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub async fn check_overlap(
        &self,
        candidate: &OverlapCandidate,
        exclude: Option<PoleId>,
    ) -> ServiceResult<Option<OverlapConflict>> {
        let others = self.store.poles_in_zone(candidate.zone_id()).await?;
        Ok(find_overlap_conflict(candidate, &others, exclude))
    }

    async fn ensure_no_overlap(
        &self,
        candidate: &OverlapCandidate,
        exclude: Option<PoleId>,
    ) -> ServiceResult<()> {
        match self.check_overlap(candidate, exclude).await? {
            Some(conflict) => {
                log::info!(
                    "Rejected pole at {:?}: overlaps '{}' ({:.2} m apart, {:.2} m required)",
                    candidate.position(),
                    conflict.pole_name,
                    conflict.distance,
                    conflict.combined_radius
                );
                Err(ServiceError::Overlap(conflict))
            }
            None => Ok(()),
        }
    }

    async fn ensure_land_owner(&self, id: LandOwnerId) -> ServiceResult<()> {
        self.store
            .land_owner(id)
            .await?
            .map(|_| ())
            .ok_or(ServiceError::LandOwnerNotFound(id))
    }

    async fn pole_or_not_found(&self, id: PoleId) -> ServiceResult<Pole> {
        self.store
            .pole(id)
            .await?
            .ok_or(ServiceError::PoleNotFound(id))
    }
}

fn ensure_inside(zone: &Zone, position: Coordinate) -> ServiceResult<()> {
    if point_in_zone(position, &zone.boundary) {
        Ok(())
    } else {
        log::info!("Rejected pole at {position:?}: outside zone {}", zone.id);
        Err(ServiceError::PoleOutsideZone)
    }
}

#[cfg(test)]
mod tests {
    use pole_guard_store::{PoleRepository, ZoneRepository};
    use pole_guard_zone_models::{BoundaryPoint, Status, ValidationError};

    use super::*;
    use crate::test_support::{FixedElevation, new_pole, point, service};

    #[tokio::test]
    async fn creates_pole_inside_zone() {
        let svc = service(FixedElevation::new(0.0));
        let pole = svc
            .create_pole(new_pole("P-1", point(31.505, 74.305), 100.0))
            .await
            .unwrap();

        assert_eq!(pole.id, PoleId(1));
        assert_eq!(pole.status, Status::Active);
        assert_eq!(svc.list_poles(Some(ZoneId(1))).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rejects_pole_outside_zone() {
        let svc = service(FixedElevation::new(0.0));
        let err = svc
            .create_pole(new_pole("P-1", point(31.60, 74.305), 100.0))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::PoleOutsideZone));
        assert_eq!(err.to_string(), "Pole coordinates must be within zone boundary");
    }

    #[tokio::test]
    async fn rejects_out_of_range_radius_before_geometry() {
        let svc = service(FixedElevation::new(0.0));
        let err = svc
            .create_pole(new_pole("P-1", point(31.60, 74.305), 20.0))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::RestrictedRadius { .. })
        ));
    }

    #[tokio::test]
    async fn rejects_overlapping_pole_with_its_name() {
        let svc = service(FixedElevation::new(0.0));
        svc.create_pole(new_pole("Mall Road 1", point(31.505, 74.305), 100.0))
            .await
            .unwrap();

        let err = svc
            .create_pole(new_pole("Mall Road 2", point(31.5055, 74.305), 100.0))
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Pole radius overlaps with existing pole: Mall Road 1"
        );
        assert_eq!(svc.list_poles(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn inactive_poles_still_block_overlap() {
        let svc = service(FixedElevation::new(0.0));
        let first = svc
            .create_pole(new_pole("P-1", point(31.505, 74.305), 100.0))
            .await
            .unwrap();
        svc.toggle_pole_status(first.id).await.unwrap();

        let err = svc
            .create_pole(new_pole("P-2", point(31.505, 74.305), 100.0))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Overlap(c) if c.pole_id == first.id));
    }

    #[tokio::test]
    async fn unknown_land_owner_is_rejected() {
        let svc = service(FixedElevation::new(0.0));
        let mut new = new_pole("P-1", point(31.505, 74.305), 100.0);
        new.land_owner_id = Some(LandOwnerId(99));

        let err = svc.create_pole(new).await.unwrap_err();
        assert!(matches!(err, ServiceError::LandOwnerNotFound(LandOwnerId(99))));
    }

    #[tokio::test]
    async fn update_excludes_the_pole_itself_from_overlap() {
        let svc = service(FixedElevation::new(0.0));
        let pole = svc
            .create_pole(new_pole("P-1", point(31.505, 74.305), 100.0))
            .await
            .unwrap();

        let updated = svc
            .update_pole(
                pole.id,
                PoleUpdate {
                    restricted_radius: Some(300.0),
                    ..PoleUpdate::default()
                },
            )
            .await
            .unwrap();

        assert!((updated.restricted_radius - 300.0).abs() < f64::EPSILON);
        assert_eq!(updated.zone_id, pole.zone_id);
    }

    #[tokio::test]
    async fn update_rejects_growing_into_a_neighbour() {
        let svc = service(FixedElevation::new(0.0));
        let a = svc
            .create_pole(new_pole("A", point(31.502, 74.305), 100.0))
            .await
            .unwrap();
        svc.create_pole(new_pole("B", point(31.508, 74.305), 100.0))
            .await
            .unwrap();

        let err = svc
            .update_pole(
                a.id,
                PoleUpdate {
                    restricted_radius: Some(1000.0),
                    ..PoleUpdate::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Overlap(c) if c.pole_name == "B"));
        let stored = svc.store().pole(a.id).await.unwrap().unwrap();
        assert!((stored.restricted_radius - 100.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn moving_a_pole_out_of_its_zone_is_rejected() {
        let svc = service(FixedElevation::new(0.0));
        let pole = svc
            .create_pole(new_pole("P-1", point(31.505, 74.305), 100.0))
            .await
            .unwrap();

        let err = svc
            .update_pole(
                pole.id,
                PoleUpdate {
                    latitude: Some(31.52),
                    longitude: Some(74.305),
                    ..PoleUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::PoleOutsideZone));
    }

    #[tokio::test]
    async fn flat_position_patch_moves_the_pole() {
        let svc = service(FixedElevation::new(0.0));
        let pole = svc
            .create_pole(new_pole("P-1", point(31.505, 74.305), 100.0))
            .await
            .unwrap();

        let update: PoleUpdate =
            serde_json::from_value(serde_json::json!({"latitude": 31.507, "longitude": 74.306}))
                .unwrap();
        let moved = svc.update_pole(pole.id, update).await.unwrap();

        assert_eq!(moved.position, point(31.507, 74.306));
        let stored = svc.store().pole(pole.id).await.unwrap().unwrap();
        assert_eq!(stored.position, point(31.507, 74.306));
    }

    #[tokio::test]
    async fn half_a_position_patch_is_rejected() {
        let svc = service(FixedElevation::new(0.0));
        let pole = svc
            .create_pole(new_pole("P-1", point(31.505, 74.305), 100.0))
            .await
            .unwrap();

        let err = svc
            .update_pole(
                pole.id,
                PoleUpdate {
                    longitude: Some(74.306),
                    ..PoleUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::PartialPosition)
        ));
    }

    #[tokio::test]
    async fn update_without_move_skips_containment() {
        let svc = service(FixedElevation::new(0.0));
        let pole = svc
            .create_pole(new_pole("P-1", point(31.505, 74.305), 100.0))
            .await
            .unwrap();

        // Shrink the zone so the pole now sits outside it.
        let mut zone = svc.store().zone(ZoneId(1)).await.unwrap().unwrap();
        zone.boundary.truncate(3);
        zone.boundary[2] = BoundaryPoint::LatLng {
            lat: 31.501,
            lng: 74.301,
        };
        svc.store().update_zone(zone).await.unwrap();

        let renamed = svc
            .update_pole(
                pole.id,
                PoleUpdate {
                    pole_name: Some("P-1 renamed".to_string()),
                    ..PoleUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.pole_name, "P-1 renamed");
    }

    #[tokio::test]
    async fn delete_missing_pole_is_not_found() {
        let svc = service(FixedElevation::new(0.0));
        assert!(matches!(
            svc.delete_pole(PoleId(7)).await,
            Err(ServiceError::PoleNotFound(PoleId(7)))
        ));
    }

    #[tokio::test]
    async fn check_overlap_reports_without_writing() {
        let svc = service(FixedElevation::new(0.0));
        svc.create_pole(new_pole("P-1", point(31.505, 74.305), 100.0))
            .await
            .unwrap();

        let candidate =
            OverlapCandidate::new(ZoneId(1), point(31.505, 74.306), 100.0).unwrap();
        let conflict = svc.check_overlap(&candidate, None).await.unwrap().unwrap();
        assert_eq!(conflict.pole_name, "P-1");
        assert!((conflict.combined_radius - 200.0).abs() < f64::EPSILON);

        let far = OverlapCandidate::new(ZoneId(1), point(31.509, 74.309), 100.0).unwrap();
        assert!(svc.check_overlap(&far, None).await.unwrap().is_none());
    }
}
