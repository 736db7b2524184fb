//! Elevation-based line-of-sight check between an agent and a pole top.
//!
//! This is a vertical proxy only. It compares the pole-top elevation with
//! the agent's ground elevation and never samples terrain between the two
//! points, so a ridge in between does not affect the result.

use pole_guard_policy_models::{LineOfSightOutcome, LineOfSightResult};

/// Classifies the view from an agent to a pole top.
///
/// With `pole_top = pole_ground_elevation + pole_height` and
/// `difference = pole_top - agent_elevation`:
///
/// * `difference < 0`: BLOCKED, the agent stands above the pole top.
/// * `0 <= difference < pole_height`: PARTIAL, and
///   `extra_height_required = pole_height - difference`.
/// * otherwise: CLEAR.
///
/// BLOCKED reports no extra height even though the same formula would
/// yield one. Consumers rely on BLOCKED meaning "no height fix offered".
#[must_use]
pub fn evaluate(
    pole_ground_elevation: f64,
    pole_height: f64,
    agent_elevation: f64,
) -> LineOfSightOutcome {
    let pole_top_elevation = pole_ground_elevation + pole_height;
    let elevation_difference = pole_top_elevation - agent_elevation;

    let (result, extra_height_required) = if elevation_difference < 0.0 {
        (LineOfSightResult::Blocked, None)
    } else if elevation_difference < pole_height {
        (
            LineOfSightResult::Partial,
            Some(pole_height - elevation_difference),
        )
    } else {
        (LineOfSightResult::Clear, None)
    };

    LineOfSightOutcome {
        result,
        extra_height_required,
        pole_top_elevation,
        elevation_difference,
    }
}
