//! Zone mutations.

use pole_guard_cache::Clock;
use pole_guard_elevation::ElevationProvider;
use pole_guard_spatial::normalize_boundary;
use pole_guard_store::Store;
use pole_guard_zone_models::{BoundaryPoint, NewZone, Zone, ZoneId, ZoneUpdate, validate_name};

use crate::{PolicyService, ServiceError, ServiceResult};

impl<S, E, C> PolicyService<S, E, C>
where
    S: Store,
    E: ElevationProvider,
    C: Clock,
{
    /// Creates a zone.
    ///
    /// # Errors
    ///
    /// * [`ServiceError::Validation`] for an empty or overlong name
    /// * [`ServiceError::InvalidBoundary`] if fewer than three boundary
    ///   points are usable
    /// * [`ServiceError::ZoneNameTaken`] if another zone has the same name
    pub async fn create_zone(&self, new: NewZone) -> ServiceResult<Zone> {
        validate_name(&new.name)?;
        ensure_polygon(&new.boundary)?;
        self.ensure_name_free(&new.name, None).await?;

        let zone = self.store.insert_zone(new).await?;
        self.invalidate(zone.id);

        log::info!("Created zone {} '{}'", zone.id, zone.name);
        Ok(zone)
    }

    /// Applies a partial update to a zone.
    ///
    /// Existing poles are not re-checked against a new boundary.
    ///
    /// # Errors
    ///
    /// Same as [`Self::create_zone`], plus [`ServiceError::ZoneNotFound`].
    pub async fn update_zone(&self, id: ZoneId, update: ZoneUpdate) -> ServiceResult<Zone> {
        let mut zone = self.zone(id).await?;

        if let Some(name) = update.name {
            validate_name(&name)?;
            self.ensure_name_free(&name, Some(id)).await?;
            zone.name = name;
        }
        if let Some(boundary) = update.boundary {
            ensure_polygon(&boundary)?;
            zone.boundary = boundary;
        }
        if let Some(description) = update.description {
            zone.description = Some(description);
        }
        if let Some(status) = update.status {
            zone.status = status;
        }

        let zone = self.store.update_zone(zone).await?;
        self.invalidate(zone.id);

        log::info!("Updated zone {} '{}'", zone.id, zone.name);
        Ok(zone)
    }

    /// Flips a zone between active and inactive.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::ZoneNotFound`] or a store error.
    pub async fn toggle_zone_status(&self, id: ZoneId) -> ServiceResult<Zone> {
        let mut zone = self.zone(id).await?;
        zone.status = zone.status.toggled();

        let zone = self.store.update_zone(zone).await?;
        self.invalidate(zone.id);

        log::info!("Zone {} is now {}", zone.id, zone.status);
        Ok(zone)
    }

    /// Deletes a zone that no longer owns poles or users.
    ///
    /// # Errors
    ///
    /// * [`ServiceError::ZoneNotFound`] if the zone does not exist
    /// * [`ServiceError::ZoneInUse`] while poles or users are assigned
    pub async fn delete_zone(&self, id: ZoneId) -> ServiceResult<()> {
        let zone = self.zone(id).await?;

        let poles = self.store.poles_in_zone(id).await?.len();
        let users = self.store.users_in_zone(id).await?.len();
        if poles > 0 || users > 0 {
            log::info!(
                "Refusing to delete zone {id} '{}': {poles} pole(s), {users} user(s)",
                zone.name
            );
            return Err(ServiceError::ZoneInUse {
                zone_id: id,
                poles,
                users,
            });
        }

        if !self.store.delete_zone(id).await? {
            return Err(ServiceError::ZoneNotFound(id));
        }
        self.invalidate(id);

        log::info!("Deleted zone {id} '{}'", zone.name);
        Ok(())
    }

    /// Fetches a zone straight from the store.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::ZoneNotFound`] or a store error.
    pub async fn zone(&self, id: ZoneId) -> ServiceResult<Zone> {
        self.store
            .zone(id)
            .await?
            .ok_or(ServiceError::ZoneNotFound(id))
    }

    /// Lists every zone.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub async fn list_zones(&self) -> ServiceResult<Vec<Zone>> {
        Ok(self.store.zones().await?)
    }

    async fn ensure_name_free(&self, name: &str, except: Option<ZoneId>) -> ServiceResult<()> {
        let wanted = name.trim();
        let taken = self
            .store
            .zones()
            .await?
            .iter()
            .any(|z| Some(z.id) != except && z.name.trim().eq_ignore_ascii_case(wanted));

        if taken {
            Err(ServiceError::ZoneNameTaken {
                name: name.to_string(),
            })
        } else {
            Ok(())
        }
    }
}

fn ensure_polygon(boundary: &[BoundaryPoint]) -> ServiceResult<()> {
    let normalized = normalize_boundary(boundary);
    if normalized.is_polygon() {
        Ok(())
    } else {
        Err(ServiceError::InvalidBoundary {
            usable: normalized.len(),
        })
    }
}
