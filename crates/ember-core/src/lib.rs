//! Ember Core -- the entity runtime substrate.
//!
//! Three pieces, leaf first:
//!
//! - [`slot`]: a fixed-capacity pool with bitmap occupancy. Slots never move,
//!   freed slots are reset before reuse, and a pass over live slots may remove
//!   the slot it is standing on.
//! - [`strand`]: cooperative fibers with their own stacks. A strand runs as
//!   soon as it is spawned and is then driven by explicit resumes, each
//!   carrying a frame's time step.
//! - [`dispatch`]: hierarchical state dispatch where the current handler *is*
//!   the state, with exit/enter transitions and superstate delegation.
//!
//! Everything is single-threaded. Pools and strands are plain owned values;
//! whoever owns them drives them.
//!
//! # Quick Start
//!
//! ```
//! use ember_core::prelude::*;
//!
//! #[derive(Default)]
//! struct Blinker {
//!     handler: Option<Handler<Blinker>>,
//!     ticks: u32,
//! }
//!
//! impl Ear for Blinker {
//!     type Payload = ();
//!     fn handler(&self) -> Option<Handler<Self>> { self.handler }
//!     fn handler_mut(&mut self) -> &mut Option<Handler<Self>> { &mut self.handler }
//! }
//!
//! fn blinking(me: &mut Blinker, m: &Message<()>) -> Outcome<Blinker> {
//!     match m {
//!         Message::Tick { .. } if me.ticks == 2 => Outcome::Transition(None),
//!         Message::Tick { .. } => { me.ticks += 1; Outcome::Handled }
//!         _ => Outcome::Ignored,
//!     }
//! }
//!
//! let mut pool: SlotPool<Blinker> = SlotPool::new(32);
//! let id = pool.alloc_first_free().unwrap();
//! pool.get_mut(id).unwrap().handler = Some(blinking);
//!
//! for _ in 0..3 {
//!     let mut cursor = pool.iterate();
//!     while cursor.next().is_some() {
//!         let alive = cursor
//!             .current_mut()
//!             .map(|b| dispatch(b, &Message::Tick { elapsed: 1.0 / 60.0 }))
//!             .unwrap_or(false);
//!         if !alive {
//!             cursor.remove_current();
//!         }
//!     }
//! }
//! assert!(pool.is_empty());
//! ```

#![deny(unsafe_code)]

pub mod dispatch;
pub mod slot;
pub mod strand;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Recoverable failures of core operations.
///
/// Programming errors (bad pool sizing, count underflow, sub-epsilon steps)
/// are not represented here; they panic.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The operating system refused to map a strand stack.
    #[error("failed to allocate a strand stack of {words} words: {source}")]
    StackAllocation {
        words: usize,
        #[source]
        source: std::io::Error,
    },

    /// The requested stack size does not fit in the address space.
    #[error("strand stack of {words} words is too large")]
    StackTooLarge { words: usize },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::dispatch::{dispatch, same_handler, Ear, Handler, Message, Outcome};
    pub use crate::slot::{SlotCursor, SlotId, SlotPool, MIN_CAPACITY};
    pub use crate::strand::{Fiber, Strand, DEFAULT_STACK_WORDS, MIN_RESUME_DT};
    pub use crate::CoreError;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::prelude::*;

    const WORDS: usize = 16 * 1024;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Hit {
        Damage(u32),
    }

    #[derive(Default)]
    struct Drone {
        handler: Option<Handler<Drone>>,
        hp: u32,
        age: f64,
    }

    impl Ear for Drone {
        type Payload = Hit;

        fn handler(&self) -> Option<Handler<Self>> {
            self.handler
        }

        fn handler_mut(&mut self) -> &mut Option<Handler<Self>> {
            &mut self.handler
        }
    }

    fn drifting(me: &mut Drone, m: &Message<Hit>) -> Outcome<Drone> {
        match m {
            Message::Tick { elapsed } => {
                me.age += elapsed;
                Outcome::Handled
            }
            _ => Outcome::Super(mortal),
        }
    }

    fn mortal(me: &mut Drone, m: &Message<Hit>) -> Outcome<Drone> {
        match m {
            Message::Custom(Hit::Damage(n)) if *n >= me.hp => Outcome::Transition(None),
            Message::Custom(Hit::Damage(n)) => {
                me.hp -= n;
                Outcome::Transition(Some(drifting))
            }
            _ => Outcome::Ignored,
        }
    }

    /// Run one update pass: tick every drone, reclaim the terminated ones.
    fn update(pool: &mut SlotPool<Drone>, dt: f64) -> usize {
        let mut reaped = 0;
        let mut cursor = pool.iterate();
        while cursor.next().is_some() {
            let alive = cursor
                .current_mut()
                .is_some_and(|d| dispatch(d, &Message::Tick { elapsed: dt }));
            if !alive {
                cursor.remove_current();
                reaped += 1;
            }
        }
        reaped
    }

    #[test]
    fn scripted_fiber_populates_pool_over_frames() {
        let pool = Rc::new(RefCell::new(SlotPool::<Drone>::new(32)));
        let script_pool = pool.clone();

        let mut script = Strand::spawn(WORDS, move |fiber| {
            for _ in 0..3 {
                let mut waited = 0.0;
                while waited < 0.5 {
                    waited += fiber.yield_now();
                }
                let mut p = script_pool.borrow_mut();
                let id = p.alloc_first_free().expect("pool has room");
                let drone = p.get_mut(id).expect("just allocated");
                drone.handler = Some(drifting);
                drone.hp = 3;
            }
        });

        let dt = 0.25;
        let mut frames = 0;
        while script.is_alive() {
            script.resume(dt);
            update(&mut pool.borrow_mut(), dt);
            frames += 1;
        }
        script.destroy();

        assert_eq!(frames, 6);
        let pool = pool.borrow();
        assert_eq!(pool.len(), 3);
        let ages: Vec<f64> = pool.iter().map(|(_, d)| d.age).collect();
        assert_eq!(ages, vec![1.25, 0.75, 0.25]);
    }

    #[test]
    fn terminated_entities_are_reclaimed_by_the_update_pass() {
        let mut pool: SlotPool<Drone> = SlotPool::new(32);
        let ids: Vec<SlotId> = (0..4)
            .map(|_| {
                pool.insert(Drone {
                    handler: Some(drifting),
                    hp: 2,
                    age: 0.0,
                })
                .unwrap()
            })
            .collect();

        // Collision pass: one message to each side.
        for id in [ids[1], ids[2]] {
            let drone = pool.get_mut(id).unwrap();
            dispatch(drone, &Message::Custom(Hit::Damage(5)));
        }
        assert!(pool.get(ids[1]).unwrap().handler.is_none());

        assert_eq!(update(&mut pool, 1.0 / 60.0), 2);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.alloc_first_free(), Some(ids[1]));
    }

    #[test]
    fn superstate_damage_returns_to_leaf() {
        let mut drone = Drone {
            handler: Some(drifting),
            hp: 5,
            age: 0.0,
        };
        assert!(dispatch(&mut drone, &Message::Custom(Hit::Damage(2))));
        assert_eq!(drone.hp, 3);
        assert!(drone.is_in(drifting));
    }
}
