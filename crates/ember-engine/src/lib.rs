//! Ember Engine -- scripted sessions of actors on top of [`ember_core`].
//!
//! This crate turns the core substrate into something a game can run:
//!
//! - [`actor`]: entities living in a slot pool, each a state machine, talking
//!   to each other through synchronous mail.
//! - [`stage`] and [`script`]: game flow written as straight-line code on
//!   fibers, with waits and eased motion over [`easing`] curves.
//! - [`session`]: the frame driver tying stages and actors together.
//! - [`config`], [`logging`] and [`clock`]: startup plumbing.
//!
//! # Quick Start
//!
//! ```
//! use ember_engine::prelude::*;
//!
//! struct Fireflies;
//! impl Game for Fireflies {
//!     type Payload = ();
//!     type State = f64;
//!     type Body = ();
//!     type Sprite = ();
//! }
//!
//! // A firefly glows for one second, then goes out.
//! fn glowing(me: &mut Actor<Fireflies>, m: &ActorMessage<Fireflies>) -> ActorOutcome<Fireflies> {
//!     match m {
//!         Message::Tick { elapsed } => {
//!             me.state += elapsed;
//!             if me.state >= 1.0 {
//!                 Outcome::Transition(None)
//!             } else {
//!                 Outcome::Handled
//!             }
//!         }
//!         _ => Outcome::Ignored,
//!     }
//! }
//!
//! fn swarm(fiber: &Fiber<'_>, stage: StageContext<Fireflies>) {
//!     for _ in 0..3 {
//!         stage.spawn(0, 0.0).unwrap();
//!         wait_for(fiber, 0.5);
//!     }
//! }
//!
//! let mut session = Session::new(
//!     &EngineConfig::default(),
//!     vec![Archetype::new("firefly", glowing as ActorHandler<Fireflies>)],
//!     vec![StageSpec::new("swarm", swarm)],
//! )
//! .unwrap();
//!
//! session.run_frames(1000, 0.25);
//! assert!(session.is_finished());
//! while !session.actors().is_empty() {
//!     session.frame(0.25);
//! }
//! ```

#![deny(unsafe_code)]

pub mod actor;
pub mod clock;
pub mod config;
pub mod easing;
pub mod logging;
pub mod script;
pub mod session;
pub mod stage;

use std::path::PathBuf;

use ember_core::CoreError;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the core crate for convenience.
pub use ember_core;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid JSON for [`config::EngineConfig`].
    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field holds a value the engine cannot use.
    #[error("invalid config field `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Errors produced when spawning an actor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpawnError {
    /// Every slot of the actor pool is live.
    #[error("actor pool full ({capacity} slots)")]
    NoRoom { capacity: usize },

    /// No archetype is registered at the requested index.
    #[error("unknown archetype {index} ({known} registered)")]
    UnknownArchetype { index: usize, known: usize },
}

/// Errors produced while building a session.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A stage cannot be run as given.
    #[error("stage `{name}` is invalid: {reason}")]
    InvalidStage {
        name: &'static str,
        reason: &'static str,
    },

    /// The director fiber could not be created.
    #[error(transparent)]
    Core(#[from] CoreError),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    // Re-export everything from the core prelude.
    pub use ember_core::prelude::*;

    pub use crate::actor::{
        Actor, ActorHandler, ActorId, ActorMessage, ActorOutcome, ActorPool, Archetype, Game,
        Signal, UpdateReport,
    };
    pub use crate::clock::FrameClock;
    pub use crate::config::EngineConfig;
    pub use crate::easing::{cubic, ease, elastic, linear, Easing};
    pub use crate::logging::init_logging;
    pub use crate::script::{ease_to, travel, wait_for, wait_until};
    pub use crate::session::{FrameReport, Session};
    pub use crate::stage::{SharedActors, StageContext, StageEntry, StageSpec};
    pub use crate::{ConfigError, EngineError, SpawnError};

    pub use rand::Rng;
}
