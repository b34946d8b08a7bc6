//! QueryDebouncer: trailing-edge query coalescing
//!
//! Rapid keystrokes collapse into one emission per quiet interval, always
//! carrying the latest pushed query; the final keystroke's query is never
//! dropped. Pure timer state over a WASM-safe clock; the host drives it by
//! polling (no callbacks, no background tasks).

use instant::Instant;
use std::time::Duration;

// =============================================================================
// Constants
// =============================================================================

/// Default debounce interval
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

// =============================================================================
// QueryDebouncer
// =============================================================================

/// Trailing-edge debouncer for suggestion queries
pub struct QueryDebouncer {
    interval: Duration,
    pending: Option<String>,
    deadline: Option<Instant>,
    emit_count: u64,
}

impl Default for QueryDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl QueryDebouncer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            pending: None,
            deadline: None,
            emit_count: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of emissions so far
    pub fn emit_count(&self) -> u64 {
        self.emit_count
    }

    /// True while an emission is pending
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Record the latest query and restart the quiet-period timer
    pub fn push(&mut self, query: impl Into<String>, now: Instant) {
        self.pending = Some(query.into());
        self.deadline = Some(now + self.interval);
    }

    /// Emit the pending query once the quiet period has elapsed.
    /// At most one emission per push burst.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        let deadline = self.deadline?;
        if now < deadline {
            return None;
        }
        self.deadline = None;
        self.emit_count += 1;
        self.pending.take()
    }

    /// Cancel any pending emission
    pub fn clear(&mut self) {
        self.pending = None;
        self.deadline = None;
    }
}

// =============================================================================
// Tests
// =============================================================================
