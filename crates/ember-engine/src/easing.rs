//! Easing curves for scripted motion.
//!
//! A curve maps `(elapsed, duration)` to a weight that is 0.0 at the start and
//! 1.0 when `elapsed == duration`. [`ease`] blends two values with it.

use std::f64::consts::TAU;

/// An easing curve: `(elapsed, duration) -> weight`.
pub type Easing = fn(f64, f64) -> f64;

/// Interpolate from `start` to `end` along `curve`.
#[inline]
pub fn ease(start: f64, end: f64, elapsed: f64, duration: f64, curve: Easing) -> f64 {
    (end - start) * curve(elapsed, duration) + start
}

/// Constant speed.
pub fn linear(elapsed: f64, duration: f64) -> f64 {
    elapsed / duration
}

/// Slow start, fast finish.
pub fn cubic(elapsed: f64, duration: f64) -> f64 {
    let f = elapsed / duration;
    f * f * f
}

/// Wind-up oscillation that overshoots backwards before snapping to the end.
pub fn elastic(elapsed: f64, duration: f64) -> f64 {
    const PERIOD: f64 = 0.42;
    const AMPLITUDE: f64 = 1.5;
    let decay = PERIOD / TAU * (1.0 / AMPLITUDE).asin();
    let f = elapsed / duration - 1.0;
    -(AMPLITUDE * 2f64.powf(10.0 * f) * ((f - decay) * TAU / PERIOD).sin())
}
