//! Creation of roles against an eventually consistent remote service.
//!
//! A freshly created role (or the identity it trusts) may not be visible to
//! the service for a while, so failed calls are retried with a fixed delay
//! until a wall-clock budget runs out. Failures that can never succeed on
//! retry, such as the role already existing, end the loop immediately.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use crate::error::RoleError;
use crate::metrics::{MetricsSink, NoOpSink, OperationStats};
use crate::service::{RoleService, ServiceError};
use crate::types::{AttemptOutcome, CreateAttempt, CreateRoleInput, RoleAttributes};

/// Substrings (lowercase) of remote errors that no retry can fix.
const TERMINAL_FAILURES: &[&str] = &["role already exists", "instance profile exists"];

/// Substrings (lowercase) of remote errors meaning "not visible yet".
const NOT_FOUND_FAILURES: &[&str] = &["not found", "notfound", "no such", "does not exist"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    Retryable,
    Terminal,
}

/// Classify a remote create failure from its message.
///
/// This is the single place where the service's error wording is matched;
/// matching is case-insensitive.
pub fn classify_failure(message: &str) -> FailureClass {
    let message = message.to_lowercase();
    if TERMINAL_FAILURES.iter().any(|m| message.contains(m)) {
        FailureClass::Terminal
    } else {
        FailureClass::Retryable
    }
}

/// Classify a read failure: only "not found" style errors are worth waiting on.
pub fn classify_read_failure(message: &str) -> FailureClass {
    let message = message.to_lowercase();
    if NOT_FOUND_FAILURES.iter().any(|m| message.contains(m)) {
        FailureClass::Retryable
    } else {
        FailureClass::Terminal
    }
}

fn default_delay_ms() -> u64 {
    15_000
}

fn default_timeout_ms() -> u64 {
    120_000
}

/// Fixed-delay retry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RetryPolicy {
    /// Pause between a failed attempt and the next one (default: 15 s).
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Total budget measured from the first attempt (default: 2 min).
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl RetryPolicy {
    pub fn new(delay: Duration, timeout: Duration) -> Self {
        Self {
            delay_ms: delay.as_millis() as u64,
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Upper bound on the number of calls one operation can make.
    pub fn max_attempts(&self) -> u32 {
        if self.delay_ms == 0 {
            return u32::MAX;
        }
        (self.timeout_ms / self.delay_ms).max(1) as u32
    }
}

/// A successfully created role and the calls it took.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedRole {
    pub attributes: RoleAttributes,
    pub attempts: Vec<CreateAttempt>,
}

impl CreatedRole {
    pub fn attempt_count(&self) -> u32 {
        self.attempts.len() as u32
    }
}

/// Drives `create_role` / `get_role` calls under a [`RetryPolicy`].
///
/// Each call to [`RoleCreator::create`] owns its own attempt log; nothing is
/// shared between operations, and attempts of one operation never overlap.
pub struct RoleCreator<S> {
    service: S,
    policy: RetryPolicy,
    sink: Arc<dyn MetricsSink>,
}

impl<S: RoleService> RoleCreator<S> {
    pub fn new(service: S, policy: RetryPolicy) -> Self {
        Self {
            service,
            policy,
            sink: Arc::new(NoOpSink),
        }
    }

    pub fn with_metrics_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Create a role, retrying transient failures.
    ///
    /// Ends with [`RoleError::AlreadyExists`] on a terminal failure (after
    /// one call), [`RoleError::Timeout`] when the budget runs out, or
    /// [`RoleError::Cancelled`] when `cancel` fires first.
    pub async fn create(
        &self,
        input: &CreateRoleInput,
        cancel: &CancellationToken,
    ) -> Result<CreatedRole, RoleError> {
        debug!(
            event = "Create",
            phase = "Pending",
            name = input.name,
            role_type = input.role_type,
            tags = input.tags.len()
        );

        let (attributes, attempts) = self
            .retry(
                "create",
                &input.name,
                cancel,
                || self.service.create_role(input),
                classify_failure,
            )
            .await
            .map_err(|failure| failure.into_create_error(&input.name))?;

        info!(
            event = "Create",
            phase = "Succeeded",
            name = input.name,
            id = attributes.identifier(),
            attempts = attempts.len()
        );
        Ok(CreatedRole {
            attributes,
            attempts,
        })
    }

    /// Poll `get_role` until the role is readable.
    ///
    /// Only "not found" style errors are retried; any other failure is
    /// returned right away as [`RoleError::Remote`].
    pub async fn wait_for_role(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<RoleAttributes, RoleError> {
        let (attributes, attempts) = self
            .retry(
                "read",
                name,
                cancel,
                || self.service.get_role(name),
                classify_read_failure,
            )
            .await
            .map_err(|failure| failure.into_read_error(name))?;

        debug!(
            event = "Read",
            phase = "Visible",
            name,
            attempts = attempts.len()
        );
        Ok(attributes)
    }

    async fn retry<T, F, Fut>(
        &self,
        operation: &'static str,
        name: &str,
        cancel: &CancellationToken,
        mut call: F,
        classify: fn(&str) -> FailureClass,
    ) -> Result<(T, Vec<CreateAttempt>), LoopFailure>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let start = Instant::now();
        let deadline = start + self.policy.timeout();
        let delay = self.policy.delay();
        let max_attempts = self.policy.max_attempts();
        let mut attempts: Vec<CreateAttempt> = Vec::new();

        let outcome = loop {
            let number = attempts.len() as u32 + 1;
            if cancel.is_cancelled() {
                break Err(LoopFailure::Cancelled {
                    attempts: number - 1,
                });
            }

            debug!(event = "Retry", phase = "Calling", operation, name, attempt = number);
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => break Err(LoopFailure::Cancelled { attempts: number }),
                _ = sleep_until(deadline) => break Err(LoopFailure::Timeout {
                    attempts: number,
                    elapsed: start.elapsed(),
                    last_error: last_message(&attempts)
                        .unwrap_or_else(|| "no response before deadline".to_string()),
                }),
                result = call() => result,
            };

            let elapsed = start.elapsed();
            let error = match result {
                Ok(value) => {
                    self.record(name, &mut attempts, number, AttemptOutcome::Succeeded, elapsed);
                    break Ok(value);
                }
                Err(error) => error,
            };

            let message = error.message().to_string();
            if classify(&message) == FailureClass::Terminal {
                self.record(
                    name,
                    &mut attempts,
                    number,
                    AttemptOutcome::TerminalFailure(message.clone()),
                    elapsed,
                );
                break Err(LoopFailure::Terminal {
                    attempts: number,
                    message,
                });
            }

            self.record(
                name,
                &mut attempts,
                number,
                AttemptOutcome::RetryableFailure(message.clone()),
                elapsed,
            );

            // Out of attempts: wait out the budget, then report the timeout.
            let wake = if number >= max_attempts {
                deadline
            } else {
                (Instant::now() + delay).min(deadline)
            };
            warn!(
                event = "Retry",
                phase = "RetryableFailure",
                operation,
                name,
                attempt = number,
                error = message,
                retry_in_ms = wake.saturating_duration_since(Instant::now()).as_millis() as u64
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break Err(LoopFailure::Cancelled { attempts: number }),
                _ = sleep_until(wake) => {}
            }

            if Instant::now() >= deadline {
                break Err(LoopFailure::Timeout {
                    attempts: number,
                    elapsed: start.elapsed(),
                    last_error: message,
                });
            }
        };

        let attempt_count = match &outcome {
            Ok(_) => attempts.len() as u32,
            Err(failure) => failure.attempts(),
        };
        self.sink.on_operation(&OperationStats {
            operation,
            role_name: name.to_string(),
            attempts: attempt_count,
            duration: start.elapsed(),
            succeeded: outcome.is_ok(),
        });

        outcome.map(|value| (value, attempts))
    }

    fn record(
        &self,
        name: &str,
        attempts: &mut Vec<CreateAttempt>,
        number: u32,
        outcome: AttemptOutcome,
        elapsed: Duration,
    ) {
        let attempt = CreateAttempt {
            number,
            outcome,
            elapsed,
        };
        self.sink.on_attempt(name, &attempt);
        attempts.push(attempt);
    }
}

fn last_message(attempts: &[CreateAttempt]) -> Option<String> {
    attempts
        .last()
        .and_then(|a| a.outcome.message())
        .map(str::to_string)
}

/// Why a retry loop stopped without a value.
#[derive(Debug)]
enum LoopFailure {
    Terminal { attempts: u32, message: String },
    Timeout {
        attempts: u32,
        elapsed: Duration,
        last_error: String,
    },
    Cancelled { attempts: u32 },
}

impl LoopFailure {
    fn attempts(&self) -> u32 {
        match self {
            LoopFailure::Terminal { attempts, .. }
            | LoopFailure::Timeout { attempts, .. }
            | LoopFailure::Cancelled { attempts } => *attempts,
        }
    }

    fn into_create_error(self, name: &str) -> RoleError {
        match self {
            LoopFailure::Terminal { attempts, message } => RoleError::AlreadyExists {
                name: name.to_string(),
                attempts,
                message,
            },
            other => other.into_common_error("creating", name),
        }
    }

    fn into_read_error(self, name: &str) -> RoleError {
        match self {
            LoopFailure::Terminal { message, .. } => RoleError::Remote {
                operation: "reading".to_string(),
                name: name.to_string(),
                message,
            },
            other => other.into_common_error("reading", name),
        }
    }

    fn into_common_error(self, operation: &str, name: &str) -> RoleError {
        let operation = operation.to_string();
        let name = name.to_string();
        match self {
            LoopFailure::Timeout {
                attempts,
                elapsed,
                last_error,
            } => RoleError::Timeout {
                operation,
                name,
                attempts,
                elapsed_secs: elapsed.as_secs(),
                last_error,
            },
            LoopFailure::Cancelled { attempts } => RoleError::Cancelled {
                operation,
                name,
                attempts,
            },
            LoopFailure::Terminal { attempts, message } => RoleError::AlreadyExists {
                name,
                attempts,
                message,
            },
        }
    }
}
