//! Waiting and tweening helpers for scripted sequences.
//!
//! Every helper is built on [`Fiber::yield_now`]: it yields once per frame and
//! accumulates the time steps it is resumed with. None of them returns before
//! the first resume.

use ember_core::strand::Fiber;

use crate::easing::{ease, Easing};

/// Yield until at least `seconds` have elapsed. Returns the time actually
/// waited, which overshoots by up to one frame.
pub fn wait_for(fiber: &Fiber<'_>, seconds: f64) -> f64 {
    let mut waited = 0.0;
    while waited < seconds {
        waited += fiber.yield_now();
    }
    waited
}

/// Yield until `done(elapsed)` holds, checking after every resume. Returns
/// the elapsed time.
pub fn wait_until(fiber: &Fiber<'_>, mut done: impl FnMut(f64) -> bool) -> f64 {
    let mut elapsed = fiber.yield_now();
    while !done(elapsed) {
        elapsed += fiber.yield_now();
    }
    elapsed
}

/// Yield until `distance` has been covered at the speed reported each frame
/// by `speed` (units per second). Returns the distance covered.
pub fn travel(fiber: &Fiber<'_>, distance: f64, mut speed: impl FnMut() -> f64) -> f64 {
    let mut covered = 0.0;
    while covered < distance {
        let dt = fiber.yield_now();
        covered += speed() * dt;
    }
    covered
}

/// Drive a value from `from` to `to` over `duration` seconds along `curve`,
/// handing each frame's value to `apply`. The last value applied is exactly
/// `to`.
pub fn ease_to(
    fiber: &Fiber<'_>,
    from: f64,
    to: f64,
    duration: f64,
    curve: Easing,
    mut apply: impl FnMut(f64),
) {
    let mut elapsed = 0.0;
    while elapsed < duration {
        elapsed += fiber.yield_now();
        if elapsed < duration {
            apply(ease(from, to, elapsed, duration, curve));
        }
    }
    apply(to);
}
