//! Retry/backoff helper shared by every extractor: base 1s, factor 2,
//! jitter, max 3 attempts.

use std::time::Duration;

use focus_core::error::{Error, Result};

const BASE_DELAY: Duration = Duration::from_secs(1);
const FACTOR: u32 = 2;
const MAX_ATTEMPTS: u32 = 3;

fn delay_for(attempt: u32) -> Duration {
    let backoff = BASE_DELAY * FACTOR.pow(attempt.saturating_sub(1));
    let jitter_ms = (fastrand_like_jitter(attempt) % 250) as u64;
    backoff + Duration::from_millis(jitter_ms)
}

/// A tiny deterministic jitter source so retry timing is exercised in tests
/// without pulling in a second random-number dependency alongside `rand`.
fn fastrand_like_jitter(seed: u32) -> u32 {
    seed.wrapping_mul(2654435761)
}

/// Retries `op` up to [`MAX_ATTEMPTS`] times while `Error::is_retryable`
/// holds, sleeping [`delay_for`] between attempts. Stage-fatal and
/// non-retryable errors return immediately on first failure.
pub async fn with_retry<T, F, Fut>(mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < MAX_ATTEMPTS => {
                let scheduled = delay_for(attempt);
                let delay = match err.retry_delay() {
                    Some(server_delay) => server_delay.max(scheduled),
                    None => scheduled,
                };
                tracing::debug!(
                    target: "focus_extract::retry",
                    attempt,
                    error = %err,
                    delay_ms = delay.as_millis() as u64,
                    "retrying after transient extraction error"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Wraps a lower-level transport error as a retryable [`Error::source_transient`].
pub fn transient(message: impl Into<String>) -> Error {
    Error::source_transient(message)
}
