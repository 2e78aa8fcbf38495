// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Caller-side retry advice: exponential backoff with jitter.
//
// The client itself never retries.  Callers that want to can classify an
// error into Transient (retry later), UserAction (change something first),
// or Permanent (give up), and ask for the delay before the next attempt.

use std::time::Duration;

use textwerk_core::error::{ErrorClass, ServiceErrorKind, TextwerkError};
use tracing::{debug, info, warn};

/// Retry configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    pub max_retries: u32,
    /// Base delay between retries (exponential backoff).
    pub base_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

/// Result of evaluating whether to retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after this delay.
    RetryAfter(Duration),
    /// Do not retry; the error is permanent or needs the caller to act.
    GiveUp(ErrorClass),
    /// Maximum retries exhausted.
    Exhausted,
}

/// Classify a `TextwerkError` for retry decisions.
pub fn classify_error(err: &TextwerkError) -> ErrorClass {
    match err {
        TextwerkError::Service(service) => match service.code.as_str() {
            "BadDocumentException" | "UnsupportedDocumentException" | "DocumentTooLargeException" => {
                ErrorClass::Permanent
            }
            _ => match service.kind {
                ServiceErrorKind::Throttling | ServiceErrorKind::Service => ErrorClass::Transient,
                ServiceErrorKind::Validation
                | ServiceErrorKind::AccessDenied
                | ServiceErrorKind::NotFound => ErrorClass::UserAction,
            },
        },

        // Network, or a job that simply needs more time
        TextwerkError::Transport(_) => ErrorClass::Transient,
        TextwerkError::PollLimitExceeded { .. } => ErrorClass::Transient,

        TextwerkError::Validation(_) => ErrorClass::UserAction,
        TextwerkError::Config(_) => ErrorClass::UserAction,

        TextwerkError::Encode(_) => ErrorClass::Permanent,
        TextwerkError::Decode { .. } => ErrorClass::Permanent,
        TextwerkError::JobFailed { .. } => ErrorClass::Permanent,
        TextwerkError::UnexpectedJobStatus { .. } => ErrorClass::Permanent,
        TextwerkError::Pagination(_) => ErrorClass::Permanent,
        TextwerkError::Serialization(_) => ErrorClass::Permanent,

        TextwerkError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                ErrorClass::UserAction
            }
            _ => ErrorClass::Transient,
        },
    }
}

/// Decide whether to retry based on the error class and attempt count.
pub fn should_retry(err: &TextwerkError, attempt: u32, config: &RetryConfig) -> RetryDecision {
    match classify_error(err) {
        ErrorClass::Permanent => {
            info!("permanent error, not retrying");
            RetryDecision::GiveUp(ErrorClass::Permanent)
        }
        ErrorClass::UserAction => {
            info!("caller action required, not retrying");
            RetryDecision::GiveUp(ErrorClass::UserAction)
        }
        ErrorClass::Transient => {
            if attempt >= config.max_retries {
                warn!(attempt, max = config.max_retries, "retry limit exhausted");
                RetryDecision::Exhausted
            } else {
                let delay = compute_delay(attempt, config);
                debug!(attempt, delay_ms = delay.as_millis() as u64, "scheduling retry");
                RetryDecision::RetryAfter(delay)
            }
        }
    }
}

/// delay = min(base * 2^attempt + jitter, max_delay), jitter in [0, base).
pub fn compute_delay(attempt: u32, config: &RetryConfig) -> Duration {
    let base_ms = config.base_delay.as_millis() as u64;
    let exp_ms = base_ms.saturating_mul(1u64 << attempt.min(10));
    let total_ms = exp_ms.saturating_add(jitter(base_ms, attempt));
    let capped_ms = total_ms.min(config.max_delay.as_millis() as u64);
    Duration::from_millis(capped_ms)
}

// Deterministic spread across [0, base).
fn jitter(base_ms: u64, attempt: u32) -> u64 {
    let hash = (attempt as u64).wrapping_mul(6364136223846793005);
    hash % base_ms.max(1)
}
