//! Tick-driven time utilities
//!
//! Nothing here reads the wall clock. Time only advances when the owner feeds
//! it a simulated delta, so cadence checks are deterministic under test.

/// Fixed-cadence timer driven by accumulated tick deltas
///
/// `tick` returns `true` once per elapsed interval. Long ticks do not queue up
/// multiple firings: the accumulator is reset after each firing.
#[derive(Debug, Clone)]
pub struct IntervalTimer {
    interval: f32,
    accumulated: f32,
    total_time: f32,
    fire_count: u64,
}

impl IntervalTimer {
    /// Create a timer firing every `interval` seconds
    pub fn new(interval: f32) -> Self {
        Self {
            interval: interval.max(f32::EPSILON),
            accumulated: 0.0,
            total_time: 0.0,
            fire_count: 0,
        }
    }

    /// Advance by `delta_time` seconds, returning whether the interval elapsed
    pub fn tick(&mut self, delta_time: f32) -> bool {
        let delta_time = delta_time.max(0.0);
        self.accumulated += delta_time;
        self.total_time += delta_time;

        if self.accumulated >= self.interval {
            self.accumulated = 0.0;
            self.fire_count += 1;
            true
        } else {
            false
        }
    }

    /// Restart the current interval without touching the totals
    pub fn reset(&mut self) {
        self.accumulated = 0.0;
    }

    /// Configured interval in seconds
    pub fn interval(&self) -> f32 {
        self.interval
    }

    /// Total simulated time fed into the timer
    pub fn total_time(&self) -> f32 {
        self.total_time
    }

    /// Number of times the interval has elapsed
    pub fn fire_count(&self) -> u64 {
        self.fire_count
    }
}
