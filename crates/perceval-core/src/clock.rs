//! Pausable competition clock.
//!
//! The clock is the single source of truth for elapsed competition time.
//! It behaves like a stopwatch: while paused, [`PausableClock::now`] keeps
//! returning the instant captured at pause time, and resuming shifts the
//! reference point forward by the paused duration so that elapsed active
//! time is continuous across any number of pause/resume cycles.
//!
//! # Design Principles
//!
//! - Time is read through the [`TimeSource`] trait so tests can drive the
//!   clock deterministically with [`ManualTimeSource`].
//! - All arithmetic is done on [`Duration`] with saturating operations; the
//!   clock never goes backwards and never overflows.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// A monotonic source of "now", expressed as time since an arbitrary origin.
pub trait TimeSource: Send + Sync + std::fmt::Debug {
    /// Return the current time since the source's origin.
    fn now(&self) -> Duration;
}

/// Wall-clock time source backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
}

impl SystemTimeSource {
    /// Create a time source whose origin is the moment of construction.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Manually advanced time source for tests and simulations.
///
/// Clones share the same underlying time, so a test can keep one handle and
/// advance the clock seen by the component under test.
#[derive(Debug, Clone, Default)]
pub struct ManualTimeSource {
    nanos: Arc<AtomicU64>,
}

impl ManualTimeSource {
    /// Create a manual time source starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the time by `delta`.
    pub fn advance(&self, delta: Duration) {
        let delta_nanos = u64::try_from(delta.as_nanos()).unwrap_or(u64::MAX);
        let mut current = self.nanos.load(Ordering::Acquire);
        loop {
            let next = current.saturating_add(delta_nanos);
            match self.nanos.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
    }

    /// Advance the time by a number of (possibly fractional) seconds.
    ///
    /// Negative or non-finite values are ignored.
    pub fn advance_secs(&self, secs: f64) {
        if let Ok(delta) = Duration::try_from_secs_f64(secs) {
            self.advance(delta);
        }
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::Acquire))
    }
}

/// A stopwatch with explicit, idempotent pause and resume.
///
/// The clock holds a *reference* instant (the start of the current round)
/// and reports elapsed time relative to it. Pausing freezes
/// [`now`](Self::now); resuming moves the reference forward by the length
/// of the pause.
#[derive(Debug, Clone)]
pub struct PausableClock {
    /// Underlying time source.
    source: Arc<dyn TimeSource>,

    /// Reference instant from which elapsed time is measured.
    reference: Duration,

    /// Instant frozen at the moment of the last pause.
    paused_at: Duration,

    /// Whether the clock is currently paused.
    paused: bool,
}

impl PausableClock {
    /// Create a clock that starts paused at the current instant.
    pub fn new(source: Arc<dyn TimeSource>) -> Self {
        let now = source.now();
        Self {
            source,
            reference: now,
            paused_at: now,
            paused: true,
        }
    }

    /// Reset the clock to a paused state with zero elapsed time.
    pub fn reset(&mut self) {
        let now = self.source.now();
        self.reference = now;
        self.paused_at = now;
        self.paused = true;
    }

    /// Current clock time: the live time when running, or the frozen
    /// instant when paused.
    pub fn now(&self) -> Duration {
        if self.paused {
            self.paused_at
        } else {
            self.source.now()
        }
    }

    /// Active time elapsed since the reference instant.
    pub fn elapsed(&self) -> Duration {
        self.now().saturating_sub(self.reference)
    }

    /// Move the reference instant to the current clock time, so that
    /// [`elapsed`](Self::elapsed) restarts from zero.
    pub fn restart_reference(&mut self) {
        self.reference = self.now();
    }

    /// Pause the clock. No-op if already paused.
    pub fn pause(&mut self) {
        if self.paused {
            return;
        }
        self.paused_at = self.source.now();
        self.paused = true;
    }

    /// Resume the clock. No-op if already running.
    ///
    /// The reference instant moves forward by the paused duration so that
    /// elapsed time is continuous across the pause.
    pub fn resume(&mut self) {
        if !self.paused {
            return;
        }
        let paused_for = self.source.now().saturating_sub(self.paused_at);
        self.reference = self.reference.saturating_add(paused_for);
        self.paused = false;
    }

    /// Whether the clock is paused.
    pub const fn is_paused(&self) -> bool {
        self.paused
    }
}
