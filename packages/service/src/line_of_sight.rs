//! Line-of-sight calculations and their history.

use pole_guard_cache::Clock;
use pole_guard_elevation::ElevationProvider;
use pole_guard_policy::evaluate;
use pole_guard_policy_models::{
    CALCULATIONS_PER_PAGE, CalculationPage, LineOfSightCalculation, LineOfSightReport,
    MAX_NOTES_LEN, NewCalculation,
};
use pole_guard_spatial::distance_meters;
use pole_guard_store::Store;
use pole_guard_zone_models::{Coordinate, PoleId, UserId, ValidationError, ZoneId};
use serde::{Deserialize, Serialize};

use crate::{PolicyService, ServiceError, ServiceResult};

/// A request to check the view from an agent to a pole top.
///
/// On the wire the agent position is the flat `agent_latitude` /
/// `agent_longitude` pair, range-checked on deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "RawLineOfSightRequest",
    into = "RawLineOfSightRequest"
)]
pub struct LineOfSightRequest {
    /// Pole to look at.
    pub pole_id: PoleId,
    /// Where the agent stands.
    pub agent: Coordinate,
    /// Who asked.
    pub calculated_by: Option<UserId>,
    /// Free-form notes, at most 500 characters.
    pub calculation_notes: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct RawLineOfSightRequest {
    pole_id: PoleId,
    agent_latitude: f64,
    agent_longitude: f64,
    #[serde(default)]
    calculated_by: Option<UserId>,
    #[serde(default)]
    calculation_notes: Option<String>,
}

impl TryFrom<RawLineOfSightRequest> for LineOfSightRequest {
    type Error = ValidationError;

    fn try_from(raw: RawLineOfSightRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            pole_id: raw.pole_id,
            agent: Coordinate::new(raw.agent_latitude, raw.agent_longitude)?,
            calculated_by: raw.calculated_by,
            calculation_notes: raw.calculation_notes,
        })
    }
}

impl From<LineOfSightRequest> for RawLineOfSightRequest {
    fn from(request: LineOfSightRequest) -> Self {
        Self {
            pole_id: request.pole_id,
            agent_latitude: request.agent.latitude(),
            agent_longitude: request.agent.longitude(),
            calculated_by: request.calculated_by,
            calculation_notes: request.calculation_notes,
        }
    }
}

impl<S, E, C> PolicyService<S, E, C>
where
    S: Store,
    E: ElevationProvider,
    C: Clock,
{
    /// Runs and records a line-of-sight check.
    ///
    /// Both elevations are fetched concurrently. If either lookup fails the
    /// whole calculation fails and nothing is recorded.
    ///
    /// # Errors
    ///
    /// * [`ServiceError::NotesTooLong`] for notes over 500 characters
    /// * [`ServiceError::PoleNotFound`] if the pole does not exist
    /// * [`ServiceError::ElevationUnavailable`] if an elevation lookup fails
    pub async fn calculate_line_of_sight(
        &self,
        request: LineOfSightRequest,
    ) -> ServiceResult<LineOfSightReport> {
        if let Some(notes) = &request.calculation_notes {
            let length = notes.chars().count();
            if length > MAX_NOTES_LEN {
                return Err(ServiceError::NotesTooLong { length });
            }
        }

        let pole = self.pole(request.pole_id).await?;

        let (pole_elevation, agent_elevation) = tokio::try_join!(
            self.elevation.elevation(pole.position),
            self.elevation.elevation(request.agent),
        )
        .map_err(|e| {
            log::error!(
                "Elevation lookup failed for pole {} / agent {:?}: {e}",
                pole.id,
                request.agent
            );
            ServiceError::ElevationUnavailable(e)
        })?;

        let outcome = evaluate(pole_elevation, pole.pole_height, agent_elevation);
        let distance_from_pole = distance_meters(request.agent, pole.position);

        let calculation = self
            .store
            .insert_calculation(NewCalculation {
                pole_id: pole.id,
                agent: request.agent,
                agent_elevation,
                pole_elevation,
                distance_from_pole,
                outcome,
                calculated_by: request.calculated_by,
                calculation_notes: request.calculation_notes,
            })
            .await?;

        log::info!(
            "Line of sight {} for pole {} '{}': {} ({:.2} m away, difference {:.2} m)",
            calculation.id,
            pole.id,
            pole.pole_name,
            calculation.result,
            distance_from_pole,
            calculation.elevation_difference
        );

        Ok(LineOfSightReport::new(&pole, request.agent, &calculation))
    }

    /// Every calculation recorded for a pole, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::PoleNotFound`] or a store error.
    pub async fn line_of_sight_history(
        &self,
        pole_id: PoleId,
    ) -> ServiceResult<Vec<LineOfSightCalculation>> {
        self.pole(pole_id).await?;
        Ok(self.store.calculations_for_pole(pole_id).await?)
    }

    /// One page of recorded calculations, newest first, optionally limited
    /// to poles of one zone. Pages start at 1 and hold 20 records.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub async fn recent_calculations(
        &self,
        zone_id: Option<ZoneId>,
        page: usize,
    ) -> ServiceResult<CalculationPage> {
        let records = self.store.calculations(zone_id).await?;
        Ok(CalculationPage::paginate(
            records,
            page,
            CALCULATIONS_PER_PAGE,
        ))
    }
}
