//! Exponential-backoff retry for transient registry failures: retry
//! 5xx/429 and connection failures, capped attempts, backoff clamped
//! to a min/max window.

use reqwest::{RequestBuilder, Response, StatusCode};
use tokio::time::sleep;

use crate::error::JellyError;

const MIN_SLEEP_SECS: u64 = 1;
const MAX_SLEEP_SECS: u64 = 8;
const RETRY_MAX: u32 = 3;

fn should_retry(error: &reqwest::Error) -> bool {
    if let Some(status) = error.status() {
        if status == StatusCode::TOO_MANY_REQUESTS {
            return true;
        }
        if status.is_server_error() {
            return true;
        }
    }
    error.is_connect() || error.is_timeout()
}

pub(super) async fn send_with_retry(request: RequestBuilder) -> Result<Response, JellyError> {
    let mut last_error = None;
    for attempt in 0..RETRY_MAX {
        let Some(builder) = request.try_clone() else {
            return request.send().await.map_err(transport_error);
        };
        match builder.send().await {
            Ok(response) if response.status().is_server_error() && attempt + 1 < RETRY_MAX => {
                last_error = Some(format!("HTTP {}", response.status()));
            }
            Ok(response) => return Ok(response),
            Err(err) if should_retry(&err) && attempt + 1 < RETRY_MAX => {
                last_error = Some(err.to_string());
            }
            Err(err) => return Err(transport_error(err)),
        }

        let backoff = (1_u64 << attempt).clamp(MIN_SLEEP_SECS, MAX_SLEEP_SECS);
        sleep(std::time::Duration::from_secs(backoff)).await;
    }

    Err(JellyError::RegistryError {
        status: 0,
        body: format!(
            "request failed after {RETRY_MAX} attempts: {}",
            last_error.unwrap_or_default()
        ),
    })
}

fn transport_error(error: reqwest::Error) -> JellyError {
    JellyError::RegistryError {
        status: error.status().map(|s| s.as_u16()).unwrap_or(0),
        body: error.to_string(),
    }
}
