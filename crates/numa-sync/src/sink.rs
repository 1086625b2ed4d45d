//! Error sinks.
//!
//! The engine reports per-transaction failures here and moves on; a
//! deployment can point this at an external telemetry service.  The
//! contract is fire-and-forget: reporting must never fail.

use numa_shared::ErrorSink;

/// Sink that emits a structured `tracing` error event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ErrorSink for TracingSink {
    fn report(&self, context: &str, error: &dyn std::fmt::Display) {
        tracing::error!(context, %error, "sync error reported");
    }
}
