//! Restricted-radius overlap detection.
//!
//! Two poles conflict when their restricted circles intersect, i.e. when
//! the distance between them is strictly less than the sum of their radii.
//! Circles that merely touch are allowed.

use pole_guard_policy_models::OverlapConflict;
use pole_guard_spatial::distance_meters;
use pole_guard_zone_models::{
    Coordinate, Pole, PoleId, ValidationError, ZoneId, validate_restricted_radius,
};

/// A proposed pole position and radius, checked before it is persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlapCandidate {
    zone_id: ZoneId,
    position: Coordinate,
    restricted_radius: f64,
}

impl OverlapCandidate {
    /// Creates a candidate after range-checking the radius.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::RestrictedRadius`] if the radius is
    /// outside `[50, 5000]` meters.
    pub fn new(
        zone_id: ZoneId,
        position: Coordinate,
        restricted_radius: f64,
    ) -> Result<Self, ValidationError> {
        validate_restricted_radius(restricted_radius)?;
        Ok(Self {
            zone_id,
            position,
            restricted_radius,
        })
    }

    /// The candidate for an existing (already validated) pole.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::RestrictedRadius`] if the pole carries an
    /// out-of-range radius.
    pub fn for_pole(pole: &Pole) -> Result<Self, ValidationError> {
        Self::new(pole.zone_id, pole.position, pole.restricted_radius)
    }

    /// Zone the candidate will be placed in.
    #[must_use]
    pub const fn zone_id(&self) -> ZoneId {
        self.zone_id
    }

    /// Proposed position.
    #[must_use]
    pub const fn position(&self) -> Coordinate {
        self.position
    }

    /// Proposed restricted radius in meters.
    #[must_use]
    pub const fn restricted_radius(&self) -> f64 {
        self.restricted_radius
    }
}

/// Returns the first pole in `others` whose restricted circle intersects
/// the candidate's.
///
/// Poles in other zones are never compared. Pole status is ignored, so an
/// inactive pole still reserves its area. `exclude` skips the pole being
/// updated.
#[must_use]
pub fn find_overlap<'a>(
    candidate: &OverlapCandidate,
    others: &'a [Pole],
    exclude: Option<PoleId>,
) -> Option<&'a Pole> {
    conflicts(candidate, others, exclude)
        .next()
        .map(|(pole, _)| pole)
}

/// Like [`find_overlap`], but reports the distance and combined radius.
#[must_use]
pub fn find_overlap_conflict(
    candidate: &OverlapCandidate,
    others: &[Pole],
    exclude: Option<PoleId>,
) -> Option<OverlapConflict> {
    conflicts(candidate, others, exclude)
        .next()
        .map(|(pole, distance)| OverlapConflict {
            pole_id: pole.id,
            pole_name: pole.pole_name.clone(),
            distance,
            combined_radius: candidate.restricted_radius + pole.restricted_radius,
        })
}

fn conflicts<'a>(
    candidate: &OverlapCandidate,
    others: &'a [Pole],
    exclude: Option<PoleId>,
) -> impl Iterator<Item = (&'a Pole, f64)> {
    others
        .iter()
        .filter(move |pole| pole.zone_id == candidate.zone_id)
        .filter(move |pole| Some(pole.id) != exclude)
        .filter_map(move |pole| {
            let distance = distance_meters(candidate.position, pole.position);
            (distance < candidate.restricted_radius + pole.restricted_radius)
                .then_some((pole, distance))
        })
}
