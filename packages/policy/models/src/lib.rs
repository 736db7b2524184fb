#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Result types produced by the location classifier and the line-of-sight
//! evaluator.
//!
//! Field names follow the JSON consumed by the existing admin panel and
//! agent app (`can_market`, `nearest_pole`, `extra_height_required`, ...),
//! so these types serialize directly into API responses.

use chrono::{DateTime, Utc};
use pole_guard_zone_models::{CalculationId, Coordinate, Pole, PoleId, UserId};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Maximum number of poles returned in a verdict's nearby list.
pub const NEARBY_POLES_LIMIT: usize = 10;

/// Maximum length of free-form calculation notes.
pub const MAX_NOTES_LEN: usize = 500;

/// Page size of the calculation listing.
pub const CALCULATIONS_PER_PAGE: usize = 20;

/// Rounds to two decimal places, the precision reported to clients.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Outcome of a location check.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum VerdictStatus {
    /// Inside the zone and clear of every restricted radius.
    Green,
    /// Inside the zone but within at least one restricted radius.
    Red,
    /// Outside the assigned zone, or not assigned to any zone.
    Gray,
}

impl VerdictStatus {
    /// Whether marketing is allowed for this status.
    #[must_use]
    pub const fn can_market(self) -> bool {
        matches!(self, Self::Green)
    }
}

/// An active pole annotated with its distance from the queried point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyPole {
    /// The pole record.
    #[serde(flatten)]
    pub pole: Pole,
    /// Distance from the queried point in meters, rounded to 2 decimals.
    pub distance: f64,
    /// Whether the queried point is within this pole's restricted radius.
    pub is_restricted: bool,
}

/// Result of classifying an agent's position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationVerdict {
    /// GREEN, RED, or GRAY.
    pub status: VerdictStatus,
    /// Human-readable explanation shown to the agent.
    pub message: String,
    /// Whether the agent is inside their zone. Absent when unassigned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_zone: Option<bool>,
    /// Whether marketing is allowed here.
    pub can_market: bool,
    /// Name of the closest restricting pole (RED only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nearest_pole: Option<String>,
    /// Distance to the closest restricting pole (RED only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_to_pole: Option<f64>,
    /// Up to ten nearest active poles, closest first.
    pub nearby_poles: Vec<NearbyPole>,
}

impl LocationVerdict {
    /// Message for an agent with no zone assignment.
    pub const UNASSIGNED_MESSAGE: &'static str =
        "You are not assigned to any zone. Contact administrator.";
    /// Message for an agent outside their zone.
    pub const OUTSIDE_MESSAGE: &'static str = "You are outside your assigned zone";
    /// Message for an agent within a restricted radius.
    pub const RESTRICTED_MESSAGE: &'static str = "Marketing NOT allowed - Too close to pole";
    /// Message for an agent in a clear area.
    pub const CLEAR_MESSAGE: &'static str = "Marketing allowed - Clear area";

    /// Verdict for an agent without an assigned zone.
    #[must_use]
    pub fn unassigned() -> Self {
        Self {
            status: VerdictStatus::Gray,
            message: Self::UNASSIGNED_MESSAGE.to_string(),
            in_zone: None,
            can_market: false,
            nearest_pole: None,
            distance_to_pole: None,
            nearby_poles: vec![],
        }
    }

    /// Verdict for an agent outside their zone.
    #[must_use]
    pub fn outside_zone() -> Self {
        Self {
            status: VerdictStatus::Gray,
            message: Self::OUTSIDE_MESSAGE.to_string(),
            in_zone: Some(false),
            can_market: false,
            nearest_pole: None,
            distance_to_pole: None,
            nearby_poles: vec![],
        }
    }

    /// Verdict for an agent within `distance` meters of restricting pole
    /// `pole_name`.
    #[must_use]
    pub fn restricted(pole_name: String, distance: f64, nearby_poles: Vec<NearbyPole>) -> Self {
        Self {
            status: VerdictStatus::Red,
            message: Self::RESTRICTED_MESSAGE.to_string(),
            in_zone: Some(true),
            can_market: false,
            nearest_pole: Some(pole_name),
            distance_to_pole: Some(round2(distance)),
            nearby_poles,
        }
    }

    /// Verdict for an agent inside the zone and clear of every pole.
    #[must_use]
    pub fn clear(nearby_poles: Vec<NearbyPole>) -> Self {
        Self {
            status: VerdictStatus::Green,
            message: Self::CLEAR_MESSAGE.to_string(),
            in_zone: Some(true),
            can_market: true,
            nearest_pole: None,
            distance_to_pole: None,
            nearby_poles,
        }
    }
}

/// A pole whose restricted circle intersects a candidate's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlapConflict {
    /// The conflicting pole.
    pub pole_id: PoleId,
    /// Its display name.
    pub pole_name: String,
    /// Center-to-center distance in meters.
    pub distance: f64,
    /// Sum of both restricted radii in meters.
    pub combined_radius: f64,
}

/// Line-of-sight classification.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum LineOfSightResult {
    /// The agent stands at least a full pole height below the pole top.
    Clear,
    /// The pole top is above the agent but by less than the pole height.
    Partial,
    /// The agent stands above the pole top.
    Blocked,
}

/// Output of the line-of-sight evaluator before it is wrapped in a record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineOfSightOutcome {
    /// The classification.
    pub result: LineOfSightResult,
    /// Additional pole height needed to clear the agent (PARTIAL only).
    pub extra_height_required: Option<f64>,
    /// Ground elevation plus pole height, in meters.
    pub pole_top_elevation: f64,
    /// Pole top elevation minus agent elevation, in meters.
    pub elevation_difference: f64,
}

/// An immutable line-of-sight audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineOfSightCalculation {
    /// Primary key.
    pub id: CalculationId,
    /// The evaluated pole.
    pub pole_id: PoleId,
    /// Agent latitude in degrees.
    pub agent_latitude: f64,
    /// Agent longitude in degrees.
    pub agent_longitude: f64,
    /// Agent ground elevation in meters.
    pub agent_elevation: f64,
    /// Pole ground elevation in meters.
    pub pole_elevation: f64,
    /// Pole top elevation minus agent elevation.
    pub elevation_difference: f64,
    /// Horizontal distance between agent and pole in meters.
    pub distance_from_pole: f64,
    /// The classification.
    pub result: LineOfSightResult,
    /// Extra pole height needed (PARTIAL only).
    #[serde(default)]
    pub extra_height_required: Option<f64>,
    /// User who requested the calculation.
    #[serde(default)]
    pub calculated_by: Option<UserId>,
    /// Free-form notes, at most [`MAX_NOTES_LEN`] characters.
    #[serde(default)]
    pub calculation_notes: Option<String>,
    /// When the record was written.
    pub created_at: DateTime<Utc>,
}

/// Input for writing a [`LineOfSightCalculation`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewCalculation {
    /// The evaluated pole.
    pub pole_id: PoleId,
    /// Agent position.
    pub agent: Coordinate,
    /// Agent ground elevation in meters.
    pub agent_elevation: f64,
    /// Pole ground elevation in meters.
    pub pole_elevation: f64,
    /// Horizontal distance between agent and pole in meters.
    pub distance_from_pole: f64,
    /// Evaluator output.
    pub outcome: LineOfSightOutcome,
    /// User who requested the calculation.
    pub calculated_by: Option<UserId>,
    /// Free-form notes.
    pub calculation_notes: Option<String>,
}

impl NewCalculation {
    /// Materializes the record with the given id and timestamp.
    #[must_use]
    pub fn into_calculation(
        self,
        id: CalculationId,
        created_at: DateTime<Utc>,
    ) -> LineOfSightCalculation {
        LineOfSightCalculation {
            id,
            pole_id: self.pole_id,
            agent_latitude: self.agent.latitude(),
            agent_longitude: self.agent.longitude(),
            agent_elevation: self.agent_elevation,
            pole_elevation: self.pole_elevation,
            elevation_difference: self.outcome.elevation_difference,
            distance_from_pole: self.distance_from_pole,
            result: self.outcome.result,
            extra_height_required: self.outcome.extra_height_required,
            calculated_by: self.calculated_by,
            calculation_notes: self.calculation_notes,
            created_at,
        }
    }
}

/// Pole summary embedded in a [`LineOfSightReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportPole {
    /// Pole id.
    pub id: PoleId,
    /// Pole name.
    pub name: String,
    /// Pole latitude.
    pub latitude: f64,
    /// Pole longitude.
    pub longitude: f64,
    /// Pole height in meters.
    pub height: f64,
}

/// Elevation figures of a [`LineOfSightReport`], rounded to 2 decimals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReportElevations {
    /// Ground elevation at the pole.
    pub pole_ground_elevation: f64,
    /// Ground elevation plus pole height.
    pub pole_top_elevation: f64,
    /// Ground elevation at the agent.
    pub agent_elevation: f64,
    /// Pole top minus agent elevation.
    pub elevation_difference: f64,
}

/// Client-facing summary of a freshly written calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineOfSightReport {
    /// Record id.
    pub id: CalculationId,
    /// The evaluated pole.
    pub pole: ReportPole,
    /// Where the agent stood.
    pub agent_location: Coordinate,
    /// Elevation figures.
    pub elevations: ReportElevations,
    /// Horizontal distance in meters, rounded.
    pub distance_from_pole: f64,
    /// The classification.
    pub result: LineOfSightResult,
    /// Extra pole height needed, rounded (PARTIAL only).
    pub extra_height_required: Option<f64>,
    /// When the record was written.
    pub calculated_at: DateTime<Utc>,
}

impl LineOfSightReport {
    /// Builds the report for `calculation` of `pole`, taken from `agent`.
    #[must_use]
    pub fn new(pole: &Pole, agent: Coordinate, calculation: &LineOfSightCalculation) -> Self {
        Self {
            id: calculation.id,
            pole: ReportPole {
                id: pole.id,
                name: pole.pole_name.clone(),
                latitude: pole.position.latitude(),
                longitude: pole.position.longitude(),
                height: pole.pole_height,
            },
            agent_location: agent,
            elevations: ReportElevations {
                pole_ground_elevation: round2(calculation.pole_elevation),
                pole_top_elevation: round2(calculation.pole_elevation + pole.pole_height),
                agent_elevation: round2(calculation.agent_elevation),
                elevation_difference: round2(calculation.elevation_difference),
            },
            distance_from_pole: round2(calculation.distance_from_pole),
            result: calculation.result,
            extra_height_required: calculation.extra_height_required.map(round2),
            calculated_at: calculation.created_at,
        }
    }
}

/// One page of the calculation listing, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationPage {
    /// Records on this page.
    pub data: Vec<LineOfSightCalculation>,
    /// 1-based page number.
    pub current_page: usize,
    /// Page size.
    pub per_page: usize,
    /// Total matching records.
    pub total: usize,
    /// Last page number (at least 1).
    pub last_page: usize,
}

impl CalculationPage {
    /// Slices `sorted` (already newest first) into page `page` of size
    /// `per_page`. Page numbers below 1 are treated as 1.
    #[must_use]
    pub fn paginate(sorted: Vec<LineOfSightCalculation>, page: usize, per_page: usize) -> Self {
        let per_page = per_page.max(1);
        let current_page = page.max(1);
        let total = sorted.len();
        let last_page = total.div_ceil(per_page).max(1);

        let data = sorted
            .into_iter()
            .skip(current_page.saturating_sub(1).saturating_mul(per_page))
            .take(per_page)
            .collect();

        Self {
            data,
            current_page,
            per_page,
            total,
            last_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;
    use pole_guard_zone_models::{Status, ZoneId};

    use super::*;

    fn pole() -> Pole {
        Pole {
            id: PoleId(7),
            pole_name: "Mall Road 7".to_string(),
            position: Coordinate::new(31.5497, 74.3436).unwrap(),
            pole_height: 20.0,
            restricted_radius: 100.0,
            status: Status::Active,
            zone_id: ZoneId(1),
            land_owner_id: None,
        }
    }

    fn calculation(id: i64) -> LineOfSightCalculation {
        NewCalculation {
            pole_id: PoleId(7),
            agent: Coordinate::new(31.55, 74.344).unwrap(),
            agent_elevation: 215.126,
            pole_elevation: 210.004,
            distance_from_pole: 53.456,
            outcome: LineOfSightOutcome {
                result: LineOfSightResult::Partial,
                extra_height_required: Some(5.122),
                pole_top_elevation: 230.004,
                elevation_difference: 14.878,
            },
            calculated_by: Some(UserId(3)),
            calculation_notes: None,
        }
        .into_calculation(
            CalculationId(id),
            Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap(),
        )
    }

    #[test]
    fn rounds_to_two_decimals() {
        assert!((round2(1.234_56) - 1.23).abs() < f64::EPSILON);
        assert!((round2(1.235_01) - 1.24).abs() < f64::EPSILON);
        assert!((round2(-0.004)).abs() < f64::EPSILON);
    }

    #[test]
    fn unassigned_verdict_omits_in_zone() {
        let value = serde_json::to_value(LocationVerdict::unassigned()).unwrap();
        assert_eq!(value["status"], "GRAY");
        assert_eq!(value["can_market"], false);
        assert!(value.get("in_zone").is_none());
        assert!(value.get("nearest_pole").is_none());
        assert_eq!(value["nearby_poles"], serde_json::json!([]));
    }

    #[test]
    fn restricted_verdict_serializes_wire_names() {
        let verdict = LocationVerdict::restricted("Mall Road 7".to_string(), 12.345_6, vec![]);
        let value = serde_json::to_value(verdict).unwrap();
        assert_eq!(value["status"], "RED");
        assert_eq!(value["message"], "Marketing NOT allowed - Too close to pole");
        assert_eq!(value["in_zone"], true);
        assert_eq!(value["nearest_pole"], "Mall Road 7");
        assert_eq!(value["distance_to_pole"], 12.35);
    }

    #[test]
    fn nearby_pole_flattens_pole_fields() {
        let nearby = NearbyPole {
            pole: pole(),
            distance: 42.5,
            is_restricted: true,
        };
        let value = serde_json::to_value(nearby).unwrap();
        assert_eq!(value["pole_name"], "Mall Road 7");
        assert_eq!(value["latitude"], 31.5497);
        assert_eq!(value["distance"], 42.5);
        assert_eq!(value["is_restricted"], true);
    }

    #[test]
    fn report_rounds_figures() {
        let agent = Coordinate::new(31.55, 74.344).unwrap();
        let report = LineOfSightReport::new(&pole(), agent, &calculation(1));
        assert_eq!(report.agent_location, agent);
        assert!((report.elevations.pole_ground_elevation - 210.0).abs() < 1e-9);
        assert!((report.elevations.pole_top_elevation - 230.0).abs() < 1e-9);
        assert!((report.elevations.agent_elevation - 215.13).abs() < 1e-9);
        assert!((report.distance_from_pole - 53.46).abs() < 1e-9);
        assert_eq!(report.extra_height_required, Some(5.12));
        assert_eq!(report.result, LineOfSightResult::Partial);
        assert_eq!(report.pole.name, "Mall Road 7");
    }

    #[test]
    fn paginates_newest_first_listing() {
        let all: Vec<_> = (1..=45).rev().map(calculation).collect();

        let first = CalculationPage::paginate(all.clone(), 1, CALCULATIONS_PER_PAGE);
        assert_eq!(first.data.len(), 20);
        assert_eq!(first.data[0].id, CalculationId(45));
        assert_eq!(first.total, 45);
        assert_eq!(first.last_page, 3);

        let last = CalculationPage::paginate(all.clone(), 3, CALCULATIONS_PER_PAGE);
        assert_eq!(last.data.len(), 5);
        assert_eq!(last.data[4].id, CalculationId(1));

        let beyond = CalculationPage::paginate(all, 9, CALCULATIONS_PER_PAGE);
        assert!(beyond.data.is_empty());
    }

    #[test]
    fn huge_page_number_is_empty_not_a_panic() {
        let all: Vec<_> = (1..=3).rev().map(calculation).collect();
        let page = CalculationPage::paginate(all, usize::MAX, CALCULATIONS_PER_PAGE);
        assert!(page.data.is_empty());
        assert_eq!(page.current_page, usize::MAX);
        assert_eq!(page.total, 3);

        let page = CalculationPage::paginate(vec![], usize::MAX, usize::MAX);
        assert!(page.data.is_empty());
    }

    #[test]
    fn empty_listing_has_one_page() {
        let page = CalculationPage::paginate(vec![], 0, CALCULATIONS_PER_PAGE);
        assert_eq!(page.current_page, 1);
        assert_eq!(page.last_page, 1);
        assert_eq!(page.total, 0);
    }

    #[test]
    fn results_use_screaming_case() {
        assert_eq!(LineOfSightResult::Blocked.to_string(), "BLOCKED");
        assert_eq!(
            "PARTIAL".parse::<LineOfSightResult>().unwrap(),
            LineOfSightResult::Partial
        );
        assert!(VerdictStatus::Green.can_market());
        assert!(!VerdictStatus::Gray.can_market());
    }
}
