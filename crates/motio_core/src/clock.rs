//! Synchronous-safe time source
//!
//! Animations started in the same synchronous turn must share one time origin,
//! so `Clock::now` returns the frame timestamp during a tick and otherwise a
//! host sample that stays cached until the turn ends.

use crate::frame::FrameData;
use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Something that can report the host time in milliseconds
pub trait TimeSource {
    fn now_ms(&self) -> f64;
}

/// Monotonic wall time measured from construction
#[derive(Debug)]
pub struct MonotonicTime {
    origin: Instant,
}

impl MonotonicTime {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicTime {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicTime {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Manually driven time, for deterministic tests and replay.
///
/// Cloning shares the underlying time.
#[derive(Clone, Debug, Default)]
pub struct ManualTime {
    now: Rc<Cell<f64>>,
}

impl ManualTime {
    pub fn new(start_ms: f64) -> Self {
        Self {
            now: Rc::new(Cell::new(start_ms)),
        }
    }

    pub fn set(&self, ms: f64) {
        self.now.set(ms);
    }

    pub fn advance(&self, ms: f64) {
        self.now.set(self.now.get() + ms);
    }

    pub fn get(&self) -> f64 {
        self.now.get()
    }
}

impl TimeSource for ManualTime {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

/// The engine's notion of "now"
pub struct Clock {
    source: Rc<dyn TimeSource>,
    frame: Rc<Cell<FrameData>>,
    cached: Cell<Option<f64>>,
}

impl Clock {
    pub(crate) fn new(source: Rc<dyn TimeSource>, frame: Rc<Cell<FrameData>>) -> Self {
        Self {
            source,
            frame,
            cached: Cell::new(None),
        }
    }

    /// Current time in milliseconds.
    ///
    /// Two calls without an intervening tick or [`Clock::end_turn`] return the
    /// same value.
    pub fn now(&self) -> f64 {
        let frame = self.frame.get();
        if frame.is_processing {
            return frame.timestamp;
        }

        if let Some(cached) = self.cached.get() {
            return cached;
        }

        let sampled = self.source.now_ms();
        self.cached.set(Some(sampled));
        sampled
    }

    /// Pin "now" to an explicit time for the rest of this turn
    pub fn set(&self, ms: f64) {
        self.cached.set(Some(ms));
    }

    /// Drop the cached sample; the next `now()` reads the host again
    pub fn end_turn(&self) {
        self.cached.set(None);
    }

    /// Sample the host directly, bypassing the cache
    pub fn host_now(&self) -> f64 {
        self.source.now_ms()
    }
}
