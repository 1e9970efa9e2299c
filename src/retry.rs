//! Retry and backoff shared by both network call sites.
//!
//! Every HTTP exchange is classified into a [`CallOutcome`]. Transient
//! outcomes (HTTP 429 and transport failures) draw from one retry budget
//! per call site and sleep `min(2^n, 10)` seconds before the next attempt.

use crate::error::{CallFailure, TransportError};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retries allowed per call site before giving up.
pub const MAX_RETRIES: u32 = 5;

/// Upper bound on a single backoff sleep.
pub const MAX_BACKOFF: Duration = Duration::from_secs(10);

/// Raw HTTP reply handed back by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Why a call may be retried.
#[derive(Debug, Clone)]
pub enum TransientCause {
    RateLimited,
    Transport(TransportError),
}

impl TransientCause {
    fn exhausted(self, retries: u32) -> CallFailure {
        match self {
            TransientCause::RateLimited => CallFailure::RateLimited { retries },
            TransientCause::Transport(source) => CallFailure::Exhausted { retries, source },
        }
    }
}

/// Uniform classification of one network exchange.
#[derive(Debug, Clone)]
pub enum CallOutcome {
    /// 2xx; carries the body.
    Success(String),
    /// 429 or transport failure.
    Transient(TransientCause),
    /// Any other status.
    Fatal { status: u16, body: String },
}

impl CallOutcome {
    pub fn classify(result: Result<HttpReply, TransportError>) -> Self {
        match result {
            Ok(reply) if (200..300).contains(&reply.status) => CallOutcome::Success(reply.body),
            Ok(reply) if reply.status == 429 => CallOutcome::Transient(TransientCause::RateLimited),
            Ok(reply) => CallOutcome::Fatal {
                status: reply.status,
                body: reply.body,
            },
            Err(e) => CallOutcome::Transient(TransientCause::Transport(e)),
        }
    }
}

/// Backoff schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            max_backoff: MAX_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (zero-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let secs = 2u64.saturating_pow(attempt);
        Duration::from_secs(secs).min(self.max_backoff)
    }
}

/// Pause between attempts.
#[allow(async_fn_in_trait)]
pub trait Sleeper {
    async fn sleep(&self, delay: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// Retry budget for one call site.
///
/// 429s and transport failures share the counter, and it is never reset
/// between successful calls made from the same site.
#[derive(Debug, Clone)]
pub struct RetryBudget {
    policy: RetryPolicy,
    used: u32,
}

impl RetryBudget {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy, used: 0 }
    }

    pub fn used(&self) -> u32 {
        self.used
    }

    /// Run `send` until it succeeds, fails fatally, or the budget runs out.
    pub async fn run<S, F, Fut>(
        &mut self,
        service: &str,
        sleeper: &S,
        mut send: F,
    ) -> Result<String, CallFailure>
    where
        S: Sleeper,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<HttpReply, TransportError>>,
    {
        loop {
            match CallOutcome::classify(send().await) {
                CallOutcome::Success(body) => return Ok(body),
                CallOutcome::Fatal { status, body } => {
                    return Err(CallFailure::Status { status, body })
                }
                CallOutcome::Transient(cause) => {
                    if self.used >= self.policy.max_retries {
                        return Err(cause.exhausted(self.used));
                    }
                    let delay = self.policy.delay_for(self.used);
                    match cause {
                        TransientCause::RateLimited => warn!(
                            "{} rate limited, retrying in {}s ({}/{})",
                            service,
                            delay.as_secs(),
                            self.used + 1,
                            self.policy.max_retries
                        ),
                        TransientCause::Transport(ref e) => warn!(
                            "{} {}, retrying in {}s ({}/{})",
                            service,
                            e,
                            delay.as_secs(),
                            self.used + 1,
                            self.policy.max_retries
                        ),
                    }
                    sleeper.sleep(delay).await;
                    self.used += 1;
                }
            }
        }
    }
}
