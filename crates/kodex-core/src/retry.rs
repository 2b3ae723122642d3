use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Response;

pub(crate) const BASE_BACKOFF: Duration = Duration::from_secs(1);
pub(crate) const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Exponential backoff `base * 2^attempt`, capped at [`MAX_BACKOFF`].
pub(crate) fn backoff(base: Duration, attempt: u32) -> Duration {
    base.checked_mul(1_u32.checked_shl(attempt).unwrap_or(u32::MAX))
        .map_or(MAX_BACKOFF, |d| d.min(MAX_BACKOFF))
}

/// Parse the `Retry-After` header value as seconds, falling back to exponential backoff.
pub(crate) fn retry_delay(response: &Response, base: Duration, attempt: u32) -> Duration {
    if let Some(val) = response.headers().get("retry-after")
        && let Ok(s) = val.to_str()
        && let Ok(secs) = s.parse::<u64>()
    {
        return Duration::from_secs(secs).min(MAX_BACKOFF);
    }
    backoff(base, attempt)
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Send a request, retrying up to `max_retries` times on transport errors,
/// 429 and 5xx responses.
///
/// The last response is returned as-is once attempts are exhausted, so the
/// caller decides how to treat a final error status.
///
/// # Errors
///
/// Returns the transport error of the final attempt.
pub(crate) fn send_with_retry<F>(
    endpoint: &str,
    max_retries: u32,
    base: Duration,
    mut f: F,
) -> Result<Response, reqwest::Error>
where
    F: FnMut() -> Result<Response, reqwest::Error>,
{
    let mut attempt = 0;
    loop {
        match f() {
            Ok(response) if is_retryable(response.status()) && attempt < max_retries => {
                let delay = retry_delay(&response, base, attempt);
                tracing::warn!(
                    endpoint,
                    status = %response.status(),
                    attempt = attempt + 1,
                    max_retries,
                    "request failed, retrying in {}ms",
                    delay.as_millis()
                );
                std::thread::sleep(delay);
            }
            Err(e) if attempt < max_retries => {
                let delay = backoff(base, attempt);
                tracing::warn!(
                    endpoint,
                    attempt = attempt + 1,
                    max_retries,
                    "request error: {e}, retrying in {}ms",
                    delay.as_millis()
                );
                std::thread::sleep(delay);
            }
            result => return result,
        }
        attempt += 1;
    }
}
