//! Records of individual remote create calls.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Outcome of one call to the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "message", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Succeeded,
    RetryableFailure(String),
    TerminalFailure(String),
}

impl AttemptOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Succeeded)
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            AttemptOutcome::Succeeded => None,
            AttemptOutcome::RetryableFailure(msg) | AttemptOutcome::TerminalFailure(msg) => {
                Some(msg)
            }
        }
    }
}

/// One entry in the attempt log of a create operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAttempt {
    /// 1-based, increasing by one per call.
    pub number: u32,
    pub outcome: AttemptOutcome,
    /// Time since the first attempt started.
    pub elapsed: Duration,
}

impl Display for CreateAttempt {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match &self.outcome {
            AttemptOutcome::Succeeded => write!(f, "#{} succeeded", self.number),
            AttemptOutcome::RetryableFailure(msg) => {
                write!(f, "#{} failed (retryable): {msg}", self.number)
            }
            AttemptOutcome::TerminalFailure(msg) => {
                write!(f, "#{} failed (terminal): {msg}", self.number)
            }
        }
    }
}
