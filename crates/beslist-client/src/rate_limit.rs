//! Retry utilities for the affiliate API client.
//!
//! Transient failures (429, 5xx, network errors) are retried after a fixed
//! delay. Everything else is propagated immediately.

use std::future::Future;
use std::time::Duration;

use crate::error::ClientError;

/// Returns `true` if `err` represents a transient condition that should be
/// retried after a backoff delay.
///
/// Retriable errors:
/// - [`ClientError::RateLimited`]: HTTP 429.
/// - [`ClientError::ServerError`]: HTTP 5xx.
/// - [`ClientError::Http`]: connection reset, timeout, DNS failure.
///
/// A 404, any other non-2xx status, or a body that does not parse will
/// produce the same result on the next attempt and is not retried.
pub(crate) fn is_retriable(err: &ClientError) -> bool {
    matches!(
        err,
        ClientError::RateLimited { .. } | ClientError::ServerError { .. } | ClientError::Http(_)
    )
}

/// Executes `operation`, retrying transient errors after a fixed delay of
/// `backoff_secs` seconds.
///
/// With `max_retries = 3` the operation is attempted at most 4 times total.
/// When retries are exhausted the last error is returned, never a partial
/// result.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_secs: u64,
    mut operation: F,
) -> Result<T, ClientError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    let mut attempt = 0u32;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                tracing::warn!(
                    attempt,
                    max_retries,
                    backoff_secs,
                    error = %err,
                    "transient API error, retrying after backoff"
                );
            }
        }

        tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
    }
}
