//! Open-Elevation client.
//!
//! See <https://github.com/Jorl17/open-elevation/blob/master/docs/api.md>

use pole_guard_zone_models::Coordinate;

use crate::{ElevationError, retry};

/// Fetches the ground elevation at `at` in meters.
///
/// # Errors
///
/// Returns [`ElevationError`] if the request fails or the response holds
/// no elevation.
pub async fn fetch(
    client: &reqwest::Client,
    base_url: &str,
    at: Coordinate,
    max_retries: u32,
) -> Result<f64, ElevationError> {
    let locations = format!("{},{}", at.latitude(), at.longitude());

    let body = retry::send_json(
        || client.get(base_url).query(&[("locations", locations.as_str())]),
        max_retries,
    )
    .await
    .inspect_err(|e| log::error!("Open-Elevation request failed: {e}"))?;

    parse_response(&body)
}

fn parse_response(body: &serde_json::Value) -> Result<f64, ElevationError> {
    if let Some(error) = body.get("error").and_then(serde_json::Value::as_str) {
        return Err(ElevationError::Api {
            status: "ERROR".to_string(),
            message: error.to_string(),
        });
    }

    body.get("results")
        .and_then(|r| r.get(0))
        .and_then(|r| r.get("elevation"))
        .and_then(serde_json::Value::as_f64)
        .ok_or(ElevationError::MissingResult)
}
