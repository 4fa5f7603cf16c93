//! Stages: scripted sequences that drive a session.
//!
//! A stage is a plain function run on its own strand. It spawns actors,
//! waits, eases values and checks on the pool, yielding once per frame
//! through the helpers in [`script`](crate::script). Stages run one after
//! another under a director fiber; when the last one returns, the session
//! is finished.
//!
//! Stage code reaches the actor pool through its [`StageContext`]. The pool
//! is shared with the session, so a stage must not hold a borrow of it across
//! a yield; [`StageContext::with_actors`] makes that hard to get wrong.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use ember_core::strand::{Fiber, Strand, DEFAULT_STACK_WORDS};
use rand_pcg::Pcg32;

use crate::actor::{ActorId, ActorPool, Game, Signal};
use crate::SpawnError;

/// The actor pool as shared between a session and its stages.
pub type SharedActors<G> = Rc<RefCell<ActorPool<G>>>;

/// Entry point of a stage.
pub type StageEntry<G> = fn(&Fiber<'_>, StageContext<G>);

// ---------------------------------------------------------------------------
// StageSpec
// ---------------------------------------------------------------------------

/// A named stage and the stack it runs on.
pub struct StageSpec<G: Game> {
    /// Name used in diagnostics and frame reports.
    pub name: &'static str,
    /// Stack size of the stage's strand, in machine words.
    pub stack_words: usize,
    /// The stage script.
    pub entry: StageEntry<G>,
}

impl<G: Game> StageSpec<G> {
    /// A stage running on a [`DEFAULT_STACK_WORDS`] stack.
    pub fn new(name: &'static str, entry: StageEntry<G>) -> Self {
        Self {
            name,
            stack_words: DEFAULT_STACK_WORDS,
            entry,
        }
    }

    /// Use a stack of `stack_words` machine words instead.
    pub fn with_stack_words(mut self, stack_words: usize) -> Self {
        self.stack_words = stack_words;
        self
    }
}

impl<G: Game> Clone for StageSpec<G> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            stack_words: self.stack_words,
            entry: self.entry,
        }
    }
}

impl<G: Game> fmt::Debug for StageSpec<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageSpec")
            .field("name", &self.name)
            .field("stack_words", &self.stack_words)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// StageContext
// ---------------------------------------------------------------------------

/// What a running stage can reach.
pub struct StageContext<G: Game> {
    index: usize,
    name: &'static str,
    actors: SharedActors<G>,
    rng: Pcg32,
}

impl<G: Game> StageContext<G> {
    /// Context for stage number `index`. Its random stream depends only on
    /// `seed` and `index`.
    pub fn new(index: usize, name: &'static str, actors: SharedActors<G>, seed: u64) -> Self {
        Self {
            index,
            name,
            actors,
            rng: Pcg32::new(seed, index as u64),
        }
    }

    /// Position of this stage in the session, from 0.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The stage's name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The stage's deterministic random number generator.
    pub fn rng(&mut self) -> &mut Pcg32 {
        &mut self.rng
    }

    /// Run `f` with the actor pool borrowed mutably.
    ///
    /// # Panics
    ///
    /// Panics if the pool is already borrowed, which happens only if `f`
    /// itself calls back into this context.
    pub fn with_actors<R>(&self, f: impl FnOnce(&mut ActorPool<G>) -> R) -> R {
        f(&mut self.actors.borrow_mut())
    }

    /// Spawn an actor. See [`ActorPool::spawn`].
    pub fn spawn(&self, archetype: usize, state: G::State) -> Result<ActorId, SpawnError> {
        self.with_actors(|actors| actors.spawn(archetype, state))
    }

    /// Send an actor a signal. See [`ActorPool::tell`].
    pub fn tell(&self, to: ActorId, signal: Signal<G::Payload>) -> usize {
        self.with_actors(|actors| actors.tell(to, signal))
    }

    /// Number of live actors.
    pub fn live_actors(&self) -> usize {
        self.actors.borrow().len()
    }

    /// `true` if the actor in slot `id` is still in the pool.
    pub fn is_live(&self, id: ActorId) -> bool {
        self.actors.borrow().get(id).is_some()
    }
}

impl<G: Game> fmt::Debug for StageContext<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageContext")
            .field("index", &self.index)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Director
// ---------------------------------------------------------------------------

/// Run `stages` in order, each on its own strand, resuming the current one
/// with every time step this fiber receives. `current` tracks the running
/// stage's name.
pub(crate) fn direct<G: Game>(
    fiber: &Fiber<'_>,
    stages: Vec<StageSpec<G>>,
    actors: SharedActors<G>,
    seed: u64,
    current: Rc<Cell<Option<&'static str>>>,
) {
    for (index, stage) in stages.into_iter().enumerate() {
        current.set(Some(stage.name));
        tracing::info!(stage = stage.name, index, "stage started");

        let context = StageContext::new(index, stage.name, actors.clone(), seed);
        let mut strand = Strand::spawn_with(stage.stack_words, context, stage.entry);
        let mut elapsed = 0.0;
        while strand.is_alive() {
            let dt = fiber.yield_now();
            elapsed += dt;
            strand.resume(dt);
        }
        strand.destroy();

        tracing::info!(stage = stage.name, index, elapsed, "stage finished");
    }
    current.set(None);
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use super::*;
    use crate::actor::{ActorHandler, ActorMessage, ActorOutcome, Archetype};
    use ember_core::dispatch::Outcome;

    struct Quiet;

    impl Game for Quiet {
        type Payload = ();
        type State = u32;
        type Body = ();
        type Sprite = ();
    }

    fn still(_: &mut crate::actor::Actor<Quiet>, _: &ActorMessage<Quiet>) -> ActorOutcome<Quiet> {
        Outcome::Ignored
    }

    fn shared() -> SharedActors<Quiet> {
        let archetypes = vec![Archetype::new("still", still as ActorHandler<Quiet>)];
        Rc::new(RefCell::new(ActorPool::new(32, archetypes)))
    }

    #[test]
    fn same_seed_and_index_give_same_stream() {
        let actors = shared();
        let mut a = StageContext::new(2, "a", actors.clone(), 99);
        let mut b = StageContext::new(2, "b", actors.clone(), 99);
        let mut c = StageContext::new(3, "c", actors, 99);
        let xs: Vec<u32> = (0..8).map(|_| a.rng().gen()).collect();
        let ys: Vec<u32> = (0..8).map(|_| b.rng().gen()).collect();
        let zs: Vec<u32> = (0..8).map(|_| c.rng().gen()).collect();
        assert_eq!(xs, ys);
        assert_ne!(xs, zs);
    }

    #[test]
    fn context_spawns_into_shared_pool() {
        let actors = shared();
        let context = StageContext::new(0, "s", actors.clone(), 0);
        let id = context.spawn(0, 5).unwrap();
        assert!(context.is_live(id));
        assert_eq!(context.live_actors(), 1);
        assert_eq!(actors.borrow().get(id).unwrap().state, 5);
    }

    fn two_frames(fiber: &Fiber<'_>, context: StageContext<Quiet>) {
        context.spawn(0, 0).unwrap();
        fiber.yield_now();
        fiber.yield_now();
    }

    #[test]
    fn director_runs_stages_in_order() {
        let actors = shared();
        let current = Rc::new(Cell::new(None));
        let stages = vec![
            StageSpec::new("first", two_frames as StageEntry<Quiet>).with_stack_words(16 * 1024),
            StageSpec::new("second", two_frames as StageEntry<Quiet>).with_stack_words(16 * 1024),
        ];
        let mut director = {
            let actors = actors.clone();
            let current = current.clone();
            Strand::spawn(16 * 1024, move |fiber| direct(fiber, stages, actors, 0, current))
        };

        assert_eq!(current.get(), Some("first"));
        assert_eq!(actors.borrow().len(), 1);
        director.resume(0.1);
        director.resume(0.1);
        assert_eq!(current.get(), Some("second"));
        assert_eq!(actors.borrow().len(), 2);
        director.resume(0.1);
        director.resume(0.1);
        assert!(!director.is_alive());
        assert_eq!(current.get(), None);
    }
}
