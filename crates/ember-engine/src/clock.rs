//! Wall-clock frame timing.

use std::time::Instant;

use ember_core::strand::MIN_RESUME_DT;

/// Measures the time between frames.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    max_step: f64,
}

impl FrameClock {
    /// Start timing now. Steps are unbounded above.
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
            max_step: f64::INFINITY,
        }
    }

    /// Clamp every step to at most `max_step` seconds, so a stall (a debugger
    /// break, a slow disk) does not turn into one huge simulation step.
    pub fn with_max_step(mut self, max_step: f64) -> Self {
        assert!(max_step >= MIN_RESUME_DT, "max step {max_step} below the minimum step");
        self.max_step = max_step;
        self
    }

    /// Seconds since the previous tick (or since creation), clamped to
    /// `[MIN_RESUME_DT, max_step]`.
    pub fn tick(&mut self) -> f64 {
        let now = Instant::now();
        let step = now.duration_since(self.last).as_secs_f64();
        self.last = now;
        step.clamp(MIN_RESUME_DT, self.max_step)
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
