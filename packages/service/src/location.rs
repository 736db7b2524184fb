//! Agent location checks.

use pole_guard_cache::Clock;
use pole_guard_elevation::ElevationProvider;
use pole_guard_policy::{classify, rank_nearby};
use pole_guard_policy_models::{LocationVerdict, NearbyPole};
use pole_guard_store::Store;
use pole_guard_zone_models::{Coordinate, UserId, ZoneId};

use crate::{PolicyService, ServiceError, ServiceResult};

impl<S, E, C> PolicyService<S, E, C>
where
    S: Store,
    E: ElevationProvider,
    C: Clock,
{
    /// Classifies an agent at `agent` against the poles of `zone_id`.
    ///
    /// `None` means the agent has no zone and yields the unassigned GRAY
    /// verdict without touching the store.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::ZoneNotFound`] or a store error.
    pub async fn check_location(
        &self,
        zone_id: Option<ZoneId>,
        agent: Coordinate,
    ) -> ServiceResult<LocationVerdict> {
        let Some(zone_id) = zone_id else {
            return Ok(classify(agent, None, &[]));
        };

        let snapshot = self.snapshot(zone_id).await?;
        let verdict = classify(agent, Some(&snapshot.zone), &snapshot.active_poles);

        log::debug!(
            "Location check in zone {zone_id} at {agent:?}: {} ({} nearby)",
            verdict.status,
            verdict.nearby_poles.len()
        );
        Ok(verdict)
    }

    /// Classifies a user's position against their assigned zone.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::UserNotFound`], [`ServiceError::ZoneNotFound`],
    /// or a store error.
    pub async fn check_agent_location(
        &self,
        user_id: UserId,
        agent: Coordinate,
    ) -> ServiceResult<LocationVerdict> {
        let user = self
            .store
            .user(user_id)
            .await?
            .ok_or(ServiceError::UserNotFound(user_id))?;

        self.check_location(user.zone_id, agent).await
    }

    /// The `limit` active poles of a zone closest to `point`.
    ///
    /// Unlike [`Self::check_location`], the point does not need to be inside
    /// the zone.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::ZoneNotFound`] or a store error.
    pub async fn nearby_poles(
        &self,
        zone_id: ZoneId,
        point: Coordinate,
        limit: usize,
    ) -> ServiceResult<Vec<NearbyPole>> {
        let snapshot = self.snapshot(zone_id).await?;
        Ok(rank_nearby(point, &snapshot.active_poles, limit))
    }
}

#[cfg(test)]
mod tests {
    use pole_guard_policy_models::VerdictStatus;
    use pole_guard_store::PoleRepository;
    use pole_guard_zone_models::{PoleUpdate, Status};

    use super::*;
    use crate::test_support::{FixedElevation, new_pole, point, service};

    #[tokio::test]
    async fn unassigned_agent_is_gray() {
        let svc = service(FixedElevation::new(0.0));
        let verdict = svc
            .check_agent_location(UserId(2), point(31.505, 74.305))
            .await
            .unwrap();

        assert_eq!(verdict.status, VerdictStatus::Gray);
        assert_eq!(verdict.in_zone, None);
        assert!(!verdict.can_market);
    }

    #[tokio::test]
    async fn agent_outside_zone_is_gray() {
        let svc = service(FixedElevation::new(0.0));
        let verdict = svc
            .check_agent_location(UserId(1), point(31.60, 74.40))
            .await
            .unwrap();

        assert_eq!(verdict.status, VerdictStatus::Gray);
        assert_eq!(verdict.in_zone, Some(false));
        assert!(verdict.nearby_poles.is_empty());
    }

    #[tokio::test]
    async fn unknown_user_is_an_error() {
        let svc = service(FixedElevation::new(0.0));
        assert!(matches!(
            svc.check_agent_location(UserId(42), point(31.505, 74.305))
                .await,
            Err(ServiceError::UserNotFound(UserId(42)))
        ));
    }

    #[tokio::test]
    async fn new_pole_is_visible_on_the_very_next_check() {
        let svc = service(FixedElevation::new(0.0));
        let agent = point(31.505, 74.305);

        let before = svc.check_location(Some(ZoneId(1)), agent).await.unwrap();
        assert_eq!(before.status, VerdictStatus::Green);

        svc.create_pole(new_pole("Mall Road", point(31.5052, 74.305), 100.0))
            .await
            .unwrap();

        let after = svc.check_location(Some(ZoneId(1)), agent).await.unwrap();
        assert_eq!(after.status, VerdictStatus::Red);
        assert_eq!(after.nearest_pole.as_deref(), Some("Mall Road"));
    }

    #[tokio::test]
    async fn deactivated_pole_stops_restricting_immediately() {
        let svc = service(FixedElevation::new(0.0));
        let agent = point(31.505, 74.305);
        let pole = svc
            .create_pole(new_pole("Mall Road", point(31.5052, 74.305), 100.0))
            .await
            .unwrap();
        assert_eq!(
            svc.check_location(Some(ZoneId(1)), agent)
                .await
                .unwrap()
                .status,
            VerdictStatus::Red
        );

        svc.update_pole(
            pole.id,
            PoleUpdate {
                status: Some(Status::Inactive),
                ..PoleUpdate::default()
            },
        )
        .await
        .unwrap();

        let verdict = svc.check_location(Some(ZoneId(1)), agent).await.unwrap();
        assert_eq!(verdict.status, VerdictStatus::Green);
        assert!(verdict.nearby_poles.is_empty());
    }

    #[tokio::test]
    async fn writes_that_bypass_the_service_are_served_stale_until_invalidated() {
        let svc = service(FixedElevation::new(0.0));
        let agent = point(31.505, 74.305);
        svc.check_location(Some(ZoneId(1)), agent).await.unwrap();

        svc.store()
            .insert_pole(new_pole("Direct", point(31.5052, 74.305), 100.0))
            .await
            .unwrap();
        let cached = svc.check_location(Some(ZoneId(1)), agent).await.unwrap();
        assert_eq!(cached.status, VerdictStatus::Green);

        svc.invalidate(ZoneId(1));
        let fresh = svc.check_location(Some(ZoneId(1)), agent).await.unwrap();
        assert_eq!(fresh.status, VerdictStatus::Red);
    }

    #[tokio::test]
    async fn nearby_poles_are_sorted_and_limited() {
        let svc = service(FixedElevation::new(0.0));
        for (i, lat) in [31.509, 31.501, 31.505].into_iter().enumerate() {
            svc.create_pole(new_pole(&format!("P-{i}"), point(lat, 74.305), 50.0))
                .await
                .unwrap();
        }

        let nearby = svc
            .nearby_poles(ZoneId(1), point(31.5, 74.305), 2)
            .await
            .unwrap();

        let names: Vec<_> = nearby.iter().map(|n| n.pole.pole_name.as_str()).collect();
        assert_eq!(names, ["P-1", "P-2"]);
        assert!(nearby[0].distance < nearby[1].distance);
    }

    #[tokio::test]
    async fn missing_zone_is_an_error() {
        let svc = service(FixedElevation::new(0.0));
        assert!(matches!(
            svc.nearby_poles(ZoneId(9), point(31.5, 74.3), 10).await,
            Err(ServiceError::ZoneNotFound(ZoneId(9)))
        ));
    }
}
