//! Agent location classification (GREEN / RED / GRAY).

use std::cmp::Ordering;

use pole_guard_policy_models::{LocationVerdict, NEARBY_POLES_LIMIT, NearbyPole, round2};
use pole_guard_spatial::{distance_meters, point_in_zone};
use pole_guard_zone_models::{Coordinate, Pole, Zone};

struct Measured<'a> {
    pole: &'a Pole,
    distance: f64,
    is_restricted: bool,
}

/// Classifies an agent standing at `agent`.
///
/// * No zone: GRAY, the agent is unassigned.
/// * Outside the zone boundary: GRAY, with no pole distances computed.
/// * Within the restricted radius of any active pole (inclusive): RED,
///   naming the closest such pole.
/// * Otherwise: GREEN.
///
/// Inactive poles in `active_poles` are skipped. The zone's own status is
/// not consulted. The nearby list holds the ten closest active poles
/// regardless of the verdict.
#[must_use]
pub fn classify(agent: Coordinate, zone: Option<&Zone>, active_poles: &[Pole]) -> LocationVerdict {
    let Some(zone) = zone else {
        return LocationVerdict::unassigned();
    };

    if !point_in_zone(agent, &zone.boundary) {
        log::debug!("Agent at {agent:?} is outside zone {}", zone.id);
        return LocationVerdict::outside_zone();
    }

    let measured = measure(agent, active_poles);

    let mut closest: Option<&Measured<'_>> = None;
    for entry in measured.iter().filter(|m| m.is_restricted) {
        match closest {
            Some(current) if entry.distance >= current.distance => {}
            _ => closest = Some(entry),
        }
    }
    let closest = closest.map(|m| (m.pole.pole_name.clone(), m.distance));

    let nearby = nearest(measured, NEARBY_POLES_LIMIT);

    match closest {
        Some((name, distance)) => LocationVerdict::restricted(name, distance, nearby),
        None => LocationVerdict::clear(nearby),
    }
}

/// Ranks active poles by distance from `point`, closest first, keeping at
/// most `limit` entries. Each entry is tagged with whether `point` is within
/// that pole's restricted radius.
#[must_use]
pub fn rank_nearby(point: Coordinate, poles: &[Pole], limit: usize) -> Vec<NearbyPole> {
    nearest(measure(point, poles), limit)
}

fn measure(point: Coordinate, poles: &[Pole]) -> Vec<Measured<'_>> {
    poles
        .iter()
        .filter(|pole| pole.is_active())
        .map(|pole| {
            let distance = distance_meters(point, pole.position);
            Measured {
                pole,
                distance,
                is_restricted: distance <= pole.restricted_radius,
            }
        })
        .collect()
}

fn nearest(mut measured: Vec<Measured<'_>>, limit: usize) -> Vec<NearbyPole> {
    measured.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(Ordering::Equal)
    });

    measured
        .into_iter()
        .take(limit)
        .map(|m| NearbyPole {
            pole: m.pole.clone(),
            distance: round2(m.distance),
            is_restricted: m.is_restricted,
        })
        .collect()
}
