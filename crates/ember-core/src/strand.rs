//! Cooperative fibers ("strands") with their own stacks.
//!
//! A [`Strand`] runs its entry function on a dedicated, guard-paged stack. It
//! starts executing as soon as it is spawned and keeps going until it first
//! calls [`Fiber::yield_now`] or returns. From then on the owner drives it with
//! [`Strand::resume`], passing the time step that the fiber receives as the
//! return value of `yield_now`.
//!
//! There is exactly one thread of control. A resume transfers it into the
//! fiber and a yield hands it back to whoever resumed; nothing is preempted
//! and nothing wakes a fiber except an explicit resume. A fiber may spawn and
//! resume its own child strands, forming a tree.
//!
//! ```
//! use ember_core::strand::Strand;
//!
//! let mut strand = Strand::spawn(16 * 1024, |fiber| {
//!     let mut waited = 0.0;
//!     while waited < 1.0 {
//!         waited += fiber.yield_now();
//!     }
//! });
//!
//! strand.resume(0.5);
//! assert!(strand.is_alive());
//! strand.resume(0.5);
//! assert!(!strand.is_alive());
//! strand.destroy();
//! ```

use std::fmt;
use std::mem;

use corosensei::stack::DefaultStack;
use corosensei::{Coroutine, CoroutineResult, Yielder};

use crate::CoreError;

/// Stack size, in machine words, for scripted sequences that do not ask for
/// anything specific.
pub const DEFAULT_STACK_WORDS: usize = 64 * 1024;

/// Smallest time step, in seconds, a strand accepts in debug builds.
///
/// Steps below this are numerically unstable for anything integrating over
/// them. Large steps are always allowed.
pub const MIN_RESUME_DT: f64 = 1.0e-6;

// ---------------------------------------------------------------------------
// Fiber
// ---------------------------------------------------------------------------

/// The running side of a strand, handed to its entry function.
pub struct Fiber<'y> {
    yielder: &'y Yielder<f64, ()>,
}

impl Fiber<'_> {
    /// Suspend this fiber and return control to whoever resumed it.
    ///
    /// Returns the time step passed to the next [`Strand::resume`].
    #[inline]
    pub fn yield_now(&self) -> f64 {
        self.yielder.suspend(())
    }
}

impl fmt::Debug for Fiber<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fiber").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Strand
// ---------------------------------------------------------------------------

/// Owning handle to a cooperative fiber.
///
/// Dropping a strand that is still suspended unwinds its stack, so values
/// living on the fiber's stack are dropped normally.
pub struct Strand {
    coroutine: Coroutine<f64, (), (), DefaultStack>,
    stack_words: usize,
    last_dt: f64,
}

impl Strand {
    /// Spawn a strand with a stack of `stack_words` machine words and run it
    /// until it first yields or returns.
    ///
    /// # Panics
    ///
    /// Panics if `stack_words` is zero or the stack cannot be allocated.
    pub fn spawn<F>(stack_words: usize, entry: F) -> Self
    where
        F: FnOnce(&Fiber<'_>) + 'static,
    {
        Self::try_spawn(stack_words, entry).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Like [`spawn`](Self::spawn), passing `arg` to the entry function.
    pub fn spawn_with<A, F>(stack_words: usize, arg: A, entry: F) -> Self
    where
        A: 'static,
        F: FnOnce(&Fiber<'_>, A) + 'static,
    {
        Self::spawn(stack_words, move |fiber: &Fiber<'_>| entry(fiber, arg))
    }

    /// Like [`spawn`](Self::spawn), reporting stack allocation failure
    /// instead of panicking.
    ///
    /// # Panics
    ///
    /// Panics if `stack_words` is zero.
    pub fn try_spawn<F>(stack_words: usize, entry: F) -> Result<Self, CoreError>
    where
        F: FnOnce(&Fiber<'_>) + 'static,
    {
        assert!(stack_words > 0, "strand stack must hold at least one word");
        let bytes = stack_words
            .checked_mul(mem::size_of::<usize>())
            .ok_or(CoreError::StackTooLarge { words: stack_words })?;
        let stack = DefaultStack::new(bytes).map_err(|source| CoreError::StackAllocation {
            words: stack_words,
            source,
        })?;

        let coroutine = Coroutine::with_stack(stack, move |yielder: &Yielder<f64, ()>, _: f64| {
            let fiber = Fiber { yielder };
            entry(&fiber);
        });

        let mut strand = Self {
            coroutine,
            stack_words,
            last_dt: 0.0,
        };
        strand.transfer(0.0);
        tracing::debug!(
            stack_words,
            alive = strand.is_alive(),
            "strand spawned"
        );
        Ok(strand)
    }

    /// Transfer control into the strand with time step `dt`, returning when
    /// it yields or finishes. Does nothing if the strand has finished.
    ///
    /// # Panics
    ///
    /// In debug builds, panics if `dt` is below [`MIN_RESUME_DT`] (or NaN).
    pub fn resume(&mut self, dt: f64) {
        if !self.is_alive() {
            return;
        }
        debug_assert!(
            dt >= MIN_RESUME_DT,
            "strand resumed with dt {dt}, below the minimum step {MIN_RESUME_DT}"
        );
        self.last_dt = dt;
        self.transfer(dt);
    }

    fn transfer(&mut self, dt: f64) {
        match self.coroutine.resume(dt) {
            CoroutineResult::Yield(()) => {}
            CoroutineResult::Return(()) => tracing::trace!("strand finished"),
        }
    }

    /// `true` until the entry function returns.
    #[inline]
    pub fn is_alive(&self) -> bool {
        !self.coroutine.done()
    }

    /// The time step passed to the most recent resume (0.0 before any).
    #[inline]
    pub fn last_dt(&self) -> f64 {
        self.last_dt
    }

    /// Stack size in machine words.
    #[inline]
    pub fn stack_words(&self) -> usize {
        self.stack_words
    }

    /// Release the strand and its stack.
    pub fn destroy(self) {
        tracing::debug!(
            stack_words = self.stack_words,
            alive = self.is_alive(),
            "strand destroyed"
        );
    }
}

impl fmt::Debug for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Strand")
            .field("alive", &self.is_alive())
            .field("stack_words", &self.stack_words)
            .field("last_dt", &self.last_dt)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
