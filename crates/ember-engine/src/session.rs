//! The session: one run of a game from its first stage to its last.
//!
//! Each [`Session::frame`]:
//!
//! 1. Resumes the director fiber with the frame's time step. The director
//!    resumes the running stage, which may spawn actors or send them signals.
//! 2. Runs one [`ActorPool::update`] pass: every live actor is ticked, and
//!    actors left without a handler are reclaimed and removed.
//! 3. Advances the frame counter and elapsed time.
//!
//! Nothing else happens between frames, and the stage random streams are
//! seeded from the configuration, so two sessions built from the same config,
//! archetypes and stages, driven with the same time steps, evolve
//! identically.
//!
//! ```
//! use ember_engine::prelude::*;
//!
//! struct Empty;
//! impl Game for Empty {
//!     type Payload = ();
//!     type State = ();
//!     type Body = ();
//!     type Sprite = ();
//! }
//!
//! fn pause(fiber: &Fiber<'_>, _: StageContext<Empty>) {
//!     wait_for(fiber, 0.5);
//! }
//!
//! let mut session = Session::new(
//!     &EngineConfig::default(),
//!     Vec::new(),
//!     vec![StageSpec::new("pause", pause)],
//! )
//! .unwrap();
//! let frames = session.run_frames(100, 0.1);
//! assert_eq!(frames, 5);
//! assert!(session.is_finished());
//! ```

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

use ember_core::strand::Strand;

use crate::actor::{Actor, ActorPool, Archetype, Game};
use crate::config::EngineConfig;
use crate::stage::{direct, SharedActors, StageSpec};
use crate::EngineError;

type Reclaim<G> = Box<dyn FnMut(&mut Actor<G>)>;

// ---------------------------------------------------------------------------
// FrameReport
// ---------------------------------------------------------------------------

/// What happened during one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    /// Frame number, from 1.
    pub frame: u64,
    /// Stage running at the end of the frame, if any.
    pub stage: Option<&'static str>,
    /// Live actors ticked.
    pub ticked: usize,
    /// Actors reclaimed and removed.
    pub reaped: usize,
    /// Live actors after the frame.
    pub live: usize,
    /// Wall-clock time spent in stage scripts.
    pub script_time: Duration,
    /// Wall-clock time spent in the actor pass.
    pub update_time: Duration,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Drives the stages and actors of one game run.
pub struct Session<G: Game> {
    actors: SharedActors<G>,
    director: Strand,
    stage: Rc<Cell<Option<&'static str>>>,
    reclaim: Option<Reclaim<G>>,
    frames: u64,
    elapsed: f64,
}

impl<G: Game> Session<G> {
    /// Build a session and start its first stage.
    ///
    /// The first stage runs up to its first yield before this returns, so
    /// any actors it spawns up front are already live.
    pub fn new(
        config: &EngineConfig,
        archetypes: Vec<Archetype<G>>,
        stages: Vec<StageSpec<G>>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        if let Some(stage) = stages.iter().find(|s| s.stack_words == 0) {
            return Err(EngineError::InvalidStage {
                name: stage.name,
                reason: "stack must hold at least one word",
            });
        }

        let stage_count = stages.len();
        let actors = Rc::new(RefCell::new(ActorPool::new(config.actor_capacity, archetypes)));
        let stage = Rc::new(Cell::new(None));
        let director = {
            let actors = actors.clone();
            let stage = stage.clone();
            let seed = config.seed;
            Strand::try_spawn(config.director_stack_words, move |fiber| {
                direct(fiber, stages, actors, seed, stage)
            })?
        };

        tracing::info!(
            stages = stage_count,
            actor_capacity = actors.borrow().capacity(),
            seed = config.seed,
            "session started"
        );
        Ok(Self {
            actors,
            director,
            stage,
            reclaim: None,
            frames: 0,
            elapsed: 0.0,
        })
    }

    /// Call `reclaim` on every dead actor before its slot is freed, to
    /// release the body and sprite handles it holds.
    pub fn on_reclaim(&mut self, reclaim: impl FnMut(&mut Actor<G>) + 'static) -> &mut Self {
        self.reclaim = Some(Box::new(reclaim));
        self
    }

    /// Advance the session by one frame of `dt` seconds.
    ///
    /// Once the stages are finished, frames keep ticking the remaining
    /// actors.
    ///
    /// # Panics
    ///
    /// In debug builds, panics if `dt` is below
    /// [`MIN_RESUME_DT`](ember_core::strand::MIN_RESUME_DT) while a stage is
    /// still running.
    pub fn frame(&mut self, dt: f64) -> FrameReport {
        let script_start = Instant::now();
        self.director.resume(dt);
        let script_time = script_start.elapsed();

        let update_start = Instant::now();
        let mut actors = self.actors.borrow_mut();
        let reclaim = &mut self.reclaim;
        let update = actors.update(dt, |actor| {
            if let Some(reclaim) = reclaim.as_mut() {
                reclaim(actor);
            }
        });
        let live = actors.len();
        drop(actors);
        let update_time = update_start.elapsed();

        self.frames += 1;
        self.elapsed += dt;

        let report = FrameReport {
            frame: self.frames,
            stage: self.stage.get(),
            ticked: update.ticked,
            reaped: update.reaped,
            live,
            script_time,
            update_time,
        };
        tracing::trace!(
            frame = report.frame,
            ticked = report.ticked,
            reaped = report.reaped,
            live = report.live,
            "frame"
        );
        report
    }

    /// Run up to `count` frames of `dt` seconds, stopping early once the
    /// stages are finished. Returns the number of frames run.
    pub fn run_frames(&mut self, count: u64, dt: f64) -> u64 {
        let mut run = 0;
        while run < count && !self.is_finished() {
            self.frame(dt);
            run += 1;
        }
        run
    }

    // -- accessors ----------------------------------------------------------

    /// `true` once the last stage has returned.
    pub fn is_finished(&self) -> bool {
        !self.director.is_alive()
    }

    /// Name of the running stage.
    pub fn stage(&self) -> Option<&'static str> {
        self.stage.get()
    }

    /// Frames run so far.
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Sum of all frame time steps, in seconds.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Borrow the actor pool.
    ///
    /// # Panics
    ///
    /// Panics if the pool is mutably borrowed, which cannot happen between
    /// frames.
    pub fn actors(&self) -> Ref<'_, ActorPool<G>> {
        self.actors.borrow()
    }

    /// Mutably borrow the actor pool, for example to report collisions.
    pub fn actors_mut(&self) -> RefMut<'_, ActorPool<G>> {
        self.actors.borrow_mut()
    }
}

impl<G: Game> fmt::Debug for Session<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("frames", &self.frames)
            .field("elapsed", &self.elapsed)
            .field("stage", &self.stage.get())
            .field("finished", &self.is_finished())
            .finish_non_exhaustive()
    }
}
