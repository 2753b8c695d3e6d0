//! Execution trace (spec §4.5). Ported from the original's
//! `vectoria::trace::Tracer`: an append-only log of timestamped events the
//! engine emits as it compiles and runs a graph, independent of the
//! `tracing` spans used for developer-facing logging elsewhere in this
//! crate — this is the user-visible, queryable trace the spec describes,
//! not a logging facility.

use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Kind of event recorded by the `Tracer` (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    GraphCompilation,
    MemoryAllocation,
    NodeExecutionStart,
    NodeExecutionEnd,
    KernelDispatch,
}

/// One recorded event. `node_id` is `None` for events with no associated
/// node (e.g. `GraphCompilation`). `details` carries free-form context such
/// as `"Reference"`/`"SIMD"` for a `KernelDispatch` or `"1024 bytes"` for a
/// `MemoryAllocation`, matching the original's `std::string details` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEvent {
    pub event_type: EventType,
    pub timestamp_ns: u64,
    pub node_id: Option<usize>,
    pub details: String,
}

/// Append-only event log with a monotonic clock. Not `Clone`/`Serialize`
/// itself (its `Instant` origin is process-local); read `events()` after a
/// run to inspect or serialize the `TraceEvent`s themselves.
#[derive(Debug)]
pub struct Tracer {
    origin: Instant,
    events: Vec<TraceEvent>,
}

impl Default for Tracer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tracer {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            events: Vec::new(),
        }
    }

    /// Appends an event with a timestamp monotonic relative to this
    /// tracer's construction (the original uses `steady_clock`, not
    /// wall-clock time, for the same reason: elapsed duration matters, the
    /// absolute moment does not).
    pub fn log(&mut self, event_type: EventType, node_id: Option<usize>, details: impl Into<String>) {
        let timestamp_ns = self.origin.elapsed().as_nanos() as u64;
        self.events.push(TraceEvent {
            event_type,
            timestamp_ns,
            node_id,
            details: details.into(),
        });
    }

    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
