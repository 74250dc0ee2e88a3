//! Exponential-backoff retry for transient upstream failures, with jitter
//! and a bounded attempt count. Hand-rolled rather than pulling in a
//! dedicated retry crate — the policy (multiplier=1, min=2s, max=30s) is
//! simple enough that a small helper is the better fit.

use std::time::Duration;

use rand::Rng;

use crate::config::RetryConfig;
use crate::error::{ErrorKind, SynapseError};

/// Runs `op`, retrying while the returned error is
/// [`ErrorKind::is_transient`] and the attempt budget isn't exhausted.
///
/// Backoff is `base * 2^attempt`, capped at `max_backoff`, with up to 20%
/// jitter so concurrent retries from many tenants don't synchronize.
pub async fn retry_with_backoff<T, E, F, Fut>(config: &RetryConfig, mut op: F) -> Result<T, E>
where
    E: SynapseError,
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempt += 1;
                if attempt >= config.max_attempts || !err.kind().is_transient() {
                    return Err(err);
                }
                let delay = backoff_delay(config, attempt);
                tracing::warn!(
                    attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    kind = ?err.kind(),
                    "retrying transient upstream failure"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

fn backoff_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let exp = config.base.as_secs_f64() * 2f64.powi(attempt as i32 - 1);
    let capped = exp.min(config.max_backoff.as_secs_f64());
    let jitter = rand::rng().random_range(0.0..0.2 * capped);
    Duration::from_secs_f64(capped + jitter)
}

/// Classifies a kind as worth retrying at all, independent of any concrete
/// error type — used by callers deciding whether to even construct a
/// [`RetryConfig`]-driven loop around a one-off call.
pub fn is_retryable(kind: ErrorKind) -> bool {
    kind.is_transient()
}
