//! Retry wrapper for external data-tool and inference calls.
//!
//! Never used around database writes: their failure modes are not assumed
//! idempotent-safe.

use std::future::Future;
use std::time::Duration;

use serde_json::json;
use tokio::time::sleep;

use pitlane_types::{AppError, ErrorKind};

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Backoff before attempt n+1 is `base_delay * 2^(n-1)`.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay: Duration::from_secs(1) }
    }
}

/// Invoke `op` with exponential backoff between failures.
///
/// After exhausting attempts, raises ExternalApiError wrapping the last
/// failure with the attempt count in details.
pub async fn with_retry<T, F, Fut>(
    label: &str,
    policy: RetryPolicy,
    mut op: F,
) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let max = policy.max_attempts.max(1);
    let mut last_err: Option<AppError> = None;

    for attempt in 1..=max {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                tracing::warn!("[{}] attempt {}/{} failed: {}", label, attempt, max, err);
                last_err = Some(err);
                if attempt < max {
                    let delay = policy
                        .base_delay
                        .saturating_mul(2_u32.saturating_pow(attempt.saturating_sub(1)));
                    sleep(delay).await;
                }
            }
        }
    }

    let last = last_err.unwrap_or_else(|| AppError::internal("retry loop without attempts"));
    Err(AppError::new(
        ErrorKind::ExternalApiError,
        format!("{label} failed after {max} attempts: {}", last.message),
    )
    .with_details(json!({ "attempts": max, "last_error": last.message })))
}
