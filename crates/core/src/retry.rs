//! Dispatch retry policy.
//!
//! Delivery to a machine endpoint is retried under a single policy
//! object parameterized by machine type, instead of per-call-site retry
//! loops. The policy fixes the attempt budget, the per-attempt timeout,
//! the backoff schedule, and how each failure class is handled --
//! including the one genuinely odd case: serverless platforms often
//! accept work they never acknowledge within the timeout, so a timeout
//! there is treated as "assume accepted" and the machine's own callback
//! reconciles the status later.

use std::time::Duration;

use crate::machine::MachineType;

/// Delay schedule between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffSchedule {
    /// Same delay before every retry.
    Fixed(Duration),
    /// `base * 2^(attempt - 1)` before retry number `attempt`.
    Exponential { base: Duration },
}

/// What a per-attempt timeout means for the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutDisposition {
    /// Stop retrying and leave the run's status untouched; the machine
    /// may have accepted the work and will report progress itself.
    AssumeAccepted,
    /// Treat like any other retryable failure.
    Retry,
}

/// A delivery failure, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryFailure {
    /// The endpoint could not be reached at all (DNS, refused, TLS).
    Connect(String),
    /// The attempt exceeded the per-attempt timeout.
    Timeout,
    /// The endpoint answered with a non-success HTTP status.
    Status { status: u16, body: String },
}

/// Retry policy applied uniformly by the dispatcher.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempt budget (first try included).
    pub max_attempts: u32,
    /// Timeout applied to each individual attempt.
    pub per_attempt_timeout: Duration,
    /// Delay schedule between attempts.
    pub backoff: BackoffSchedule,
    /// Disposition of a per-attempt timeout.
    pub on_timeout: TimeoutDisposition,
}

impl RetryPolicy {
    /// The policy for a given machine type.
    pub fn for_machine_type(machine_type: MachineType) -> Self {
        match machine_type {
            MachineType::Serverless | MachineType::TokenServerless => Self {
                max_attempts: 2,
                per_attempt_timeout: Duration::from_secs(15),
                backoff: BackoffSchedule::Fixed(Duration::from_secs(1)),
                on_timeout: TimeoutDisposition::AssumeAccepted,
            },
            MachineType::Classic => Self {
                max_attempts: 3,
                per_attempt_timeout: Duration::from_secs(10),
                backoff: BackoffSchedule::Exponential {
                    base: Duration::from_secs(1),
                },
                on_timeout: TimeoutDisposition::Retry,
            },
        }
    }

    /// Whether a further attempt should follow `failure` on attempt
    /// number `attempt` (1-based).
    ///
    /// Connect-level failures never retry -- an unreachable endpoint
    /// will not become reachable within the attempt budget, and the
    /// caller learns the outcome faster by failing the run. Timeouts
    /// follow the policy's disposition.
    pub fn should_retry(&self, failure: &DeliveryFailure, attempt: u32) -> bool {
        if attempt >= self.max_attempts {
            return false;
        }
        match failure {
            DeliveryFailure::Connect(_) => false,
            DeliveryFailure::Timeout => self.on_timeout == TimeoutDisposition::Retry,
            DeliveryFailure::Status { .. } => true,
        }
    }

    /// Delay to sleep before retry number `attempt` (2-based: the delay
    /// preceding the second attempt is `delay_before(2)`).
    pub fn delay_before(&self, attempt: u32) -> Duration {
        let retries_done = attempt.saturating_sub(2);
        match self.backoff {
            BackoffSchedule::Fixed(d) => d,
            BackoffSchedule::Exponential { base } => base * 2u32.saturating_pow(retries_done),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
