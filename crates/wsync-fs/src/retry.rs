//! Retrying JSON reads for files written non-atomically by other processes.
//!
//! The incremental compiler rewrites its build artifact in place, so a read
//! can observe a truncated document. Reads are retried with exponential
//! backoff (no jitter) until they parse or the attempt budget is spent.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use serde_json::Value;
use tracing::debug;

use crate::{Error, NormalizedPath, Result};

/// Attempt budget and delay schedule for [`read_json_retrying`].
///
/// Attempt `n` (zero-based) that fails waits `base_delay * multiplier^n`
/// before the next one, capped at `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 50,
            base_delay: Duration::from_millis(10),
            multiplier: 1.6,
            max_delay: Duration::from_secs(3600),
        }
    }
}

impl RetryPolicy {
    /// The delay schedule between attempts. It never gives up on its own;
    /// the attempt budget is enforced by [`read_json_retrying`].
    pub fn schedule(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.base_delay)
            .with_randomization_factor(0.0)
            .with_multiplier(self.multiplier)
            .with_max_interval(self.max_delay)
            .with_max_elapsed_time(None)
            .build()
    }
}

/// Read and parse a JSON file, retrying on read or parse failure.
///
/// # Errors
///
/// Returns [`Error::ReadFailure`] once `policy.max_attempts` consecutive
/// attempts have failed.
pub async fn read_json_retrying(path: &NormalizedPath, policy: RetryPolicy) -> Result<Value> {
    let max_attempts = policy.max_attempts.max(1);
    let attempts = AtomicU32::new(0);
    let native = path.to_native();
    let result = backoff::future::retry_notify(
        policy.schedule(),
        || {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            let native = native.clone();
            async move {
                let outcome = match tokio::fs::read_to_string(&native).await {
                    Ok(content) => {
                        serde_json::from_str::<Value>(&content).map_err(|e| e.to_string())
                    }
                    Err(e) => Err(e.to_string()),
                };
                outcome.map_err(|message| {
                    if attempt >= max_attempts {
                        backoff::Error::permanent(message)
                    } else {
                        backoff::Error::transient(message)
                    }
                })
            }
        },
        |message, delay: Duration| {
            debug!(path = %native.display(), ?delay, "retrying read: {}", message);
        },
    )
    .await;

    result.map_err(|message| Error::ReadFailure {
        path: path.to_native(),
        attempts: attempts.load(Ordering::SeqCst),
        message,
    })
}
