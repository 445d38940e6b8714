/*!
 * Structured Tracing
 * Subscriber setup and timed spans for pipe operations
 *
 * Features:
 * - RUST_LOG driven filtering
 * - Optional JSON output for log shipping
 * - Operation spans that record duration and outcome on drop
 */

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, span, warn, Level};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Operations slower than this are logged at warn level
const SLOW_OPERATION_THRESHOLD: Duration = Duration::from_secs(1);

static NEXT_OPERATION_ID: AtomicU64 = AtomicU64::new(1);

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - PIPEWATCH_TRACE_JSON: Enable JSON output (default: false)
///
/// Calling this more than once is harmless; only the first call installs a subscriber.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var("PIPEWATCH_TRACE_JSON")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
            .is_ok()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_line_number(true)
                    .compact(),
            )
            .try_init()
            .is_ok()
    };

    if installed {
        info!(json = use_json, "Structured tracing initialized");
    }
}

/// Timed span around one pipe operation
pub struct OperationSpan {
    span: tracing::Span,
    start: Instant,
    id: u64,
}

impl OperationSpan {
    pub fn new(operation: &'static str, target: &str) -> Self {
        let id = NEXT_OPERATION_ID.fetch_add(1, Ordering::Relaxed);

        let span = span!(
            Level::DEBUG,
            "pipe_operation",
            op_id = id,
            operation = operation,
            path = target,
            duration_us = tracing::field::Empty,
            result = tracing::field::Empty,
            error = tracing::field::Empty,
        );

        Self {
            span,
            start: Instant::now(),
            id,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn record_result(&self, success: bool) {
        self.span
            .record("result", if success { "success" } else { "error" });
    }

    pub fn record_error(&self, error: &str) {
        self.span.record("error", error);
        self.span.record("result", "error");
    }
}

impl Drop for OperationSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        let _entered = self.span.enter();
        self.span.record("duration_us", duration.as_micros() as u64);

        if duration > SLOW_OPERATION_THRESHOLD {
            warn!(
                op_id = self.id,
                duration_ms = duration.as_millis() as u64,
                slow = true,
                "slow pipe operation"
            );
        } else {
            debug!(
                op_id = self.id,
                duration_us = duration.as_micros() as u64,
                "pipe operation completed"
            );
        }
    }
}

/// Create an operation span
pub fn span_operation(operation: &'static str, target: &str) -> OperationSpan {
    OperationSpan::new(operation, target)
}
