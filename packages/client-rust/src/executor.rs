//! Retry/timeout execution of a single capability operation.
//!
//! Each attempt races the operation against its per-attempt timeout. The
//! operation runs as a spawned task: when the timer fires first, the executor
//! drops the join handle, which detaches the task. The in-flight operation
//! is abandoned, not cancelled, and its eventual settlement has no observer.
//! Failed attempts (timeouts included) are retried with exponential backoff
//! up to the configured bound.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;
use tracing::warn;

use capstan_core::{codes, CallOptions};

use crate::capability::{Capability, CapabilityError};

// ---------------------------------------------------------------------------
// Backoff
// ---------------------------------------------------------------------------

/// Backoff schedule between failed attempts: `base * 2^attempt`.
///
/// The shift is clamped so absurd attempt counts saturate instead of
/// overflowing.
#[must_use]
pub fn backoff_delay(base_millis: u64, attempt: u32) -> Duration {
    let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    Duration::from_millis(base_millis.saturating_mul(factor))
}

// ---------------------------------------------------------------------------
// ExecuteError
// ---------------------------------------------------------------------------

/// Terminal failure after all attempts are exhausted.
#[derive(Debug, thiserror::Error)]
pub enum ExecuteError {
    #[error("operation timed out after {timeout_millis}ms")]
    Timeout { timeout_millis: u64 },
    #[error(transparent)]
    Operation(#[from] CapabilityError),
}

impl ExecuteError {
    /// The error code to carry into the envelope. Capability errors without
    /// a code fall back to `EXECUTION_FAILED`.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::Timeout { .. } => codes::TIMEOUT,
            Self::Operation(err) => err.code().unwrap_or(codes::EXECUTION_FAILED),
        }
    }
}

// ---------------------------------------------------------------------------
// execute
// ---------------------------------------------------------------------------

/// Successful execution: the operation's value plus the wall-clock duration
/// of the final (successful) attempt only.
#[derive(Debug)]
pub struct Executed {
    pub value: Value,
    pub elapsed: Duration,
}

/// Run `operation` on `capability` with retry and per-attempt timeout.
///
/// Attempt indices run `0..=max_retries`, so `max_retries = 0` means exactly
/// one attempt. Backoff is unconditional on failure type: a timeout and an
/// operation-raised error both count as retryable attempts.
///
/// # Errors
///
/// Returns the last attempt's error once the retry bound is exhausted.
pub async fn execute(
    capability: Arc<dyn Capability>,
    operation: &str,
    payload: Value,
    options: CallOptions,
    base_backoff_millis: u64,
) -> Result<Executed, ExecuteError> {
    let timeout = Duration::from_millis(options.timeout_millis);
    let mut attempt: u32 = 0;

    loop {
        let cap = capability.clone();
        let op = operation.to_string();
        let attempt_payload = payload.clone();
        let started = Instant::now();

        let handle = tokio::spawn(async move { cap.invoke(&op, attempt_payload).await });

        let outcome = match tokio::time::timeout(timeout, handle).await {
            Ok(Ok(result)) => result.map_err(ExecuteError::from),
            Ok(Err(join_err)) => Err(ExecuteError::Operation(CapabilityError::new(format!(
                "operation task failed: {join_err}"
            )))),
            // Timer won the race: dropping the handle detaches the task, so
            // the operation keeps running with no observer.
            Err(_elapsed) => Err(ExecuteError::Timeout {
                timeout_millis: options.timeout_millis,
            }),
        };

        match outcome {
            Ok(value) => {
                return Ok(Executed {
                    value,
                    elapsed: started.elapsed(),
                })
            }
            Err(err) => {
                if attempt >= options.max_retries {
                    return Err(err);
                }
                let delay = backoff_delay(base_backoff_millis, attempt);
                warn!(
                    operation,
                    attempt,
                    max_retries = options.max_retries,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "attempt failed, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
