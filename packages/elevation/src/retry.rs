//! HTTP retry for elevation lookups.
//!
//! Elevation calls sit on an interactive request path, so backoff starts
//! at 250 ms and the retry count comes from configuration rather than a
//! fixed constant.

use std::time::Duration;

use crate::ElevationError;

/// Base delay of the exponential backoff.
const BASE_DELAY_MS: u64 = 250;

/// Sends the request built by `build_request` and parses the body as JSON.
///
/// Retries up to `max_retries` times with exponential backoff (250 ms,
/// 500 ms, 1 s, ...) on connection errors, timeouts, HTTP 429, and HTTP
/// 5xx. Other 4xx responses are returned immediately as
/// [`ElevationError::Status`].
///
/// # Errors
///
/// Returns [`ElevationError`] if every attempt fails, the server returns a
/// non-retryable status, or the body is not JSON.
pub async fn send_json<F>(
    build_request: F,
    max_retries: u32,
) -> Result<serde_json::Value, ElevationError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let response = send_inner(&build_request, max_retries).await?;
    let text = response.text().await?;

    serde_json::from_str(&text).map_err(|e| ElevationError::Parse {
        message: format!("invalid JSON body: {e}"),
    })
}

async fn send_inner<F>(
    build_request: &F,
    max_retries: u32,
) -> Result<reqwest::Response, ElevationError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            let delay = Duration::from_millis(BASE_DELAY_MS << (attempt - 1).min(6));
            log::warn!("  elevation retry {attempt}/{max_retries} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }

        match build_request().send().await {
            Err(e) => {
                if is_transient(&e) && attempt < max_retries {
                    log::warn!("  transient error: {e}");
                    attempt += 1;
                    continue;
                }
                return Err(ElevationError::Http(e));
            }
            Ok(response) => {
                let status = response.status();

                if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                    if attempt < max_retries {
                        log::warn!("  HTTP {status}");
                        attempt += 1;
                        continue;
                    }
                    return Err(ElevationError::Status {
                        status: status.as_u16(),
                        body: response.text().await.unwrap_or_default(),
                    });
                }

                if status.is_client_error() {
                    return Err(ElevationError::Status {
                        status: status.as_u16(),
                        body: response.text().await.unwrap_or_default(),
                    });
                }

                return Ok(response);
            }
        }
    }
}

fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}
