//! Google Maps Elevation API client.
//!
//! See <https://developers.google.com/maps/documentation/elevation/requests-elevation>

use pole_guard_zone_models::Coordinate;

use crate::{ElevationError, retry};

/// Fetches the ground elevation at `at` in meters.
///
/// # Errors
///
/// Returns [`ElevationError`] if the request fails, the API reports a
/// non-`OK` status, or the response holds no elevation.
pub async fn fetch(
    client: &reqwest::Client,
    base_url: &str,
    api_key: &str,
    at: Coordinate,
    max_retries: u32,
) -> Result<f64, ElevationError> {
    let locations = format!("{},{}", at.latitude(), at.longitude());

    let body = retry::send_json(
        || {
            client
                .get(base_url)
                .query(&[("locations", locations.as_str()), ("key", api_key)])
        },
        max_retries,
    )
    .await
    .inspect_err(|e| log::error!("Google Elevation API request failed: {e}"))?;

    parse_response(&body)
}

/// Extracts `results[0].elevation` from a Google Elevation response.
fn parse_response(body: &serde_json::Value) -> Result<f64, ElevationError> {
    let status = body
        .get("status")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("UNKNOWN");

    if status != "OK" {
        let message = body
            .get("error_message")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("No error message")
            .to_string();
        log::error!("Google Elevation API returned error: status={status} error_message={message}");
        return Err(ElevationError::Api {
            status: status.to_string(),
            message,
        });
    }

    body.get("results")
        .and_then(|r| r.get(0))
        .and_then(|r| r.get("elevation"))
        .and_then(serde_json::Value::as_f64)
        .ok_or_else(|| {
            log::error!("Google Elevation API returned no elevation data");
            ElevationError::MissingResult
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_result() {
        let body = serde_json::json!({
            "results": [{
                "elevation": 1608.637939453125,
                "location": {"lat": 39.7391536, "lng": -104.9847034},
                "resolution": 4.771975994110107
            }],
            "status": "OK"
        });
        let elevation = parse_response(&body).unwrap();
        assert!((elevation - 1_608.637_939_453_125).abs() < 1e-9);
    }

    #[test]
    fn surfaces_api_error_status() {
        let body = serde_json::json!({
            "error_message": "The provided API key is invalid.",
            "results": [],
            "status": "REQUEST_DENIED"
        });
        match parse_response(&body) {
            Err(ElevationError::Api { status, message }) => {
                assert_eq!(status, "REQUEST_DENIED");
                assert_eq!(message, "The provided API key is invalid.");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn missing_status_is_unknown() {
        let body = serde_json::json!({"results": []});
        assert!(matches!(
            parse_response(&body),
            Err(ElevationError::Api { status, .. }) if status == "UNKNOWN"
        ));
    }

    #[test]
    fn ok_without_results_is_missing() {
        let body = serde_json::json!({"results": [], "status": "OK"});
        assert!(matches!(
            parse_response(&body),
            Err(ElevationError::MissingResult)
        ));
    }
}
