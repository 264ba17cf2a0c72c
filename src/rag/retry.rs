//! Bounded retry schedule as an explicit state machine.
//!
//! ```text
//! Attempting ──ok──────────────────────────▶ Succeeded
//!     │ retryable error, attempts left
//!     ▼
//! RetryScheduled ──after delay──▶ Attempting
//!     │ fatal error or attempts exhausted
//!     ▼
//! FatalFailed
//! ```
//!
//! The policy decides transitions only; sleeping and calling the backend are
//! left to the driver (see [`GenerationClient`](super::GenerationClient)).

use crate::agent::AgentError;
use crate::config::GenerationConfig;
use std::time::Duration;

#[derive(Debug)]
pub enum AttemptState<T> {
    /// About to run attempt number `attempt` (1-based).
    Attempting { attempt: u32 },
    RetryScheduled {
        next_attempt: u32,
        delay: Duration,
        error: AgentError,
    },
    Succeeded { value: T, attempts: u32 },
    FatalFailed { attempts: u32, error: AgentError },
}

impl<T> AttemptState<T> {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AttemptState::Succeeded { .. } | AttemptState::FatalFailed { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Vec<Duration>,
}

impl RetryPolicy {
    /// `max_attempts` counts the first call and is at least 1. `backoff[i]`
    /// is the wait before attempt `i + 2`; the last entry repeats.
    pub fn new(max_attempts: u32, backoff: Vec<Duration>) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn from_config(config: &GenerationConfig) -> Self {
        Self::new(config.max_attempts, config.backoff_schedule())
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait after attempt `attempt` failed.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let index = attempt.saturating_sub(1) as usize;
        self.backoff
            .get(index)
            .or_else(|| self.backoff.last())
            .copied()
            .unwrap_or(Duration::ZERO)
    }

    /// Next state after attempt `attempt` produced `result`.
    pub fn advance<T>(&self, attempt: u32, result: Result<T, AgentError>) -> AttemptState<T> {
        match result {
            Ok(value) => AttemptState::Succeeded {
                value,
                attempts: attempt,
            },
            Err(error) if error.is_retryable() && attempt < self.max_attempts => {
                AttemptState::RetryScheduled {
                    next_attempt: attempt + 1,
                    delay: self.delay_for(attempt),
                    error,
                }
            }
            Err(error) => AttemptState::FatalFailed {
                attempts: attempt,
                error,
            },
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&GenerationConfig::default())
    }
}
