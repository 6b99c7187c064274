//! Vendor-agnostic metrics for remote role operations via a pluggable sink.
//!
//! Implement [`MetricsSink`] and hand it to
//! [`RoleCreator::with_metrics_sink`](crate::RoleCreator::with_metrics_sink)
//! to collect per-attempt and per-operation statistics without tying this
//! crate to a specific backend (Prometheus, OpenTelemetry, ...).
//!
//! ```ignore
//! use rolekeeper_core::metrics::{MetricsSink, OperationStats};
//! use std::sync::atomic::{AtomicU64, Ordering};
//!
//! struct Counter {
//!     retries: AtomicU64,
//! }
//!
//! impl MetricsSink for Counter {
//!     fn on_operation(&self, stats: &OperationStats) {
//!         self.retries
//!             .fetch_add(stats.attempts.saturating_sub(1) as u64, Ordering::Relaxed);
//!     }
//! }
//! ```

use std::time::Duration;

use serde::Serialize;

use crate::types::CreateAttempt;

/// Summary of one retried remote operation, passed to
/// [`MetricsSink::on_operation`] once the operation has finished.
#[derive(Debug, Clone, Serialize)]
pub struct OperationStats {
    /// `"create"` or `"read"`.
    pub operation: &'static str,
    pub role_name: String,
    /// Remote calls made, including the last one.
    pub attempts: u32,
    /// Wall-clock time from the first call until the result was known.
    pub duration: Duration,
    pub succeeded: bool,
}

/// Consumer of remote operation metrics.
///
/// Implementations must be thread-safe and should not block; they are
/// called inline from the retry loop.
pub trait MetricsSink: Send + Sync {
    /// Called once per finished operation, successful or not.
    fn on_operation(&self, stats: &OperationStats);

    /// Called after every individual remote call. Default: no-op.
    fn on_attempt(&self, _role_name: &str, _attempt: &CreateAttempt) {}
}

/// Sink that drops everything. Used when no sink is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpSink;

impl MetricsSink for NoOpSink {
    fn on_operation(&self, _stats: &OperationStats) {}
}
