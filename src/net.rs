//! HTTP plumbing shared by the hosted-endpoint clients.

use std::time::Duration;

pub(crate) const USER_AGENT: &str = concat!("ragshelf/", env!("CARGO_PKG_VERSION"));

/// Statuses worth retrying: rate limiting and server-side failures.
pub(crate) fn retryable_status(status: reqwest::StatusCode) -> bool {
    status.as_u16() == 429 || status.is_server_error()
}

/// Transport failures worth retrying. Anything else (TLS, redirect policy,
/// body construction) repeats identically and is surfaced at once.
pub(crate) fn retryable_transport(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

/// Exponential backoff, saturating at eight seconds.
pub(crate) fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(250 * (1u64 << attempt.min(5)))
}
