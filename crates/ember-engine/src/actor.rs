//! Actors: game entities that live in a slot pool and behave as state
//! machines.
//!
//! Every [`Actor`] is an [`Ear`]. Its behaviour is whatever handler is
//! current, chosen from its [`Archetype`] at spawn time and replaced through
//! transitions afterwards. The [`ActorPool`] owns all actors and is the only
//! way to deliver messages to them:
//!
//! - [`ActorPool::spawn`] places an actor in the lowest free slot and delivers
//!   [`Message::Enter`] to its initial handler.
//! - [`ActorPool::tell`] delivers a [`Signal`] right away. Handlers talk to
//!   other actors through [`Actor::tell`], which queues the message; queued
//!   messages are delivered in order before the outer call returns.
//! - [`ActorPool::update`] ticks every live actor once and reaps the ones left
//!   without a handler.
//!
//! Bodies and sprites belong to collaborators (physics, rendering). An actor
//! stores handles to them but never interprets them; the reclaim callback of
//! [`ActorPool::update`] is where they get released.

use std::collections::VecDeque;
use std::fmt;

use ember_core::dispatch::{dispatch, Ear, Handler, Message, Outcome};
use ember_core::slot::{Iter, SlotId, SlotPool};

use crate::SpawnError;

// ---------------------------------------------------------------------------
// Game
// ---------------------------------------------------------------------------

/// The types a particular game plugs into the engine.
pub trait Game: 'static {
    /// Payload of game-specific messages ([`Signal::Custom`]).
    type Payload: 'static;
    /// Per-actor game state.
    type State: Default + 'static;
    /// Handle to a physics body owned elsewhere.
    type Body: Copy + fmt::Debug + 'static;
    /// Handle to a sprite owned elsewhere.
    type Sprite: Copy + fmt::Debug + 'static;
}

/// Stable identifier of an actor: the slot it occupies.
pub type ActorId = SlotId;

/// A message as seen by an actor's handlers.
pub type ActorMessage<G> = Message<Signal<<G as Game>::Payload>>;

/// An actor state.
pub type ActorHandler<G> = Handler<Actor<G>>;

/// What an actor state did with a message.
pub type ActorOutcome<G> = Outcome<Actor<G>>;

type Letter<G> = (ActorId, Signal<<G as Game>::Payload>);

// ---------------------------------------------------------------------------
// Signal
// ---------------------------------------------------------------------------

/// Engine-level custom messages.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal<P> {
    /// This actor's body touched `other`'s.
    Collision {
        /// The actor on the other side of the contact.
        other: ActorId,
    },
    /// The actor left the playfield.
    Offside,
    /// Anything the game defines.
    Custom(P),
}

// ---------------------------------------------------------------------------
// Archetype
// ---------------------------------------------------------------------------

/// A kind of actor: the state it starts in and its physical description.
pub struct Archetype<G: Game> {
    /// Name used in diagnostics.
    pub name: &'static str,
    /// State every new actor of this kind starts in.
    pub initial: ActorHandler<G>,
    /// Radius of the collision circle handed to physics.
    pub collision_radius: f32,
    /// Mass handed to physics.
    pub mass: f32,
}

impl<G: Game> Archetype<G> {
    /// An archetype with a unit collision circle and unit mass.
    pub fn new(name: &'static str, initial: ActorHandler<G>) -> Self {
        Self {
            name,
            initial,
            collision_radius: 1.0,
            mass: 1.0,
        }
    }

    /// Set the collision radius.
    pub fn with_radius(mut self, collision_radius: f32) -> Self {
        self.collision_radius = collision_radius;
        self
    }

    /// Set the mass.
    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }
}

impl<G: Game> Clone for Archetype<G> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            initial: self.initial,
            collision_radius: self.collision_radius,
            mass: self.mass,
        }
    }
}

impl<G: Game> fmt::Debug for Archetype<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Archetype")
            .field("name", &self.name)
            .field("collision_radius", &self.collision_radius)
            .field("mass", &self.mass)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// A game entity.
pub struct Actor<G: Game> {
    handler: Option<ActorHandler<G>>,
    id: ActorId,
    archetype: usize,
    /// Physics body, if the game attached one.
    pub body: Option<G::Body>,
    /// Sprite, if the game attached one.
    pub sprite: Option<G::Sprite>,
    /// Game state.
    pub state: G::State,
    outbox: Vec<Letter<G>>,
}

impl<G: Game> Actor<G> {
    /// The slot this actor occupies.
    #[inline]
    pub fn id(&self) -> ActorId {
        self.id
    }

    /// Index of the archetype this actor was spawned from.
    #[inline]
    pub fn archetype(&self) -> usize {
        self.archetype
    }

    /// `true` until the actor transitions to no handler.
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.handler.is_some()
    }

    /// Queue `signal` for the actor in slot `to`.
    ///
    /// Delivery happens as soon as the current dispatch returns, before the
    /// pool operation that caused it completes. An actor may tell itself.
    pub fn tell(&mut self, to: ActorId, signal: Signal<G::Payload>) {
        self.outbox.push((to, signal));
    }
}

impl<G: Game> Default for Actor<G> {
    fn default() -> Self {
        Self {
            handler: None,
            id: SlotId::new(0),
            archetype: 0,
            body: None,
            sprite: None,
            state: G::State::default(),
            outbox: Vec::new(),
        }
    }
}

impl<G: Game> Ear for Actor<G> {
    type Payload = Signal<G::Payload>;

    fn handler(&self) -> Option<ActorHandler<G>> {
        self.handler
    }

    fn handler_mut(&mut self) -> &mut Option<ActorHandler<G>> {
        &mut self.handler
    }
}

impl<G: Game> fmt::Debug for Actor<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actor")
            .field("id", &self.id)
            .field("archetype", &self.archetype)
            .field("alive", &self.is_alive())
            .field("body", &self.body)
            .field("sprite", &self.sprite)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// ActorPool
// ---------------------------------------------------------------------------

/// Counts from one [`ActorPool::update`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateReport {
    /// Live slots visited by the pass.
    pub ticked: usize,
    /// Actors reclaimed and removed.
    pub reaped: usize,
}

/// All actors of a session, plus the archetypes they are spawned from.
pub struct ActorPool<G: Game> {
    slots: SlotPool<Actor<G>>,
    archetypes: Vec<Archetype<G>>,
    mail: VecDeque<Letter<G>>,
}

impl<G: Game> ActorPool<G> {
    /// Create a pool with room for at least `capacity` actors.
    pub fn new(capacity: usize, archetypes: Vec<Archetype<G>>) -> Self {
        tracing::debug!(
            capacity,
            archetypes = archetypes.len(),
            "actor pool created"
        );
        Self {
            slots: SlotPool::new(capacity),
            archetypes,
            mail: VecDeque::new(),
        }
    }

    /// Spawn an actor of archetype index `archetype` in the lowest free slot.
    ///
    /// The archetype's initial handler receives [`Message::Enter`] before this
    /// returns; its outcome is not acted on.
    pub fn spawn(&mut self, archetype: usize, state: G::State) -> Result<ActorId, SpawnError> {
        let initial = self
            .archetypes
            .get(archetype)
            .ok_or(SpawnError::UnknownArchetype {
                index: archetype,
                known: self.archetypes.len(),
            })?
            .initial;

        let id = self
            .slots
            .insert(Actor {
                handler: Some(initial),
                archetype,
                state,
                ..Actor::default()
            })
            .ok_or(SpawnError::NoRoom {
                capacity: self.slots.capacity(),
            })?;

        if let Some(actor) = self.slots.get_mut(id) {
            actor.id = id;
            initial(actor, &Message::Enter);
            self.mail.extend(actor.outbox.drain(..));
        }
        tracing::trace!(
            actor = %id,
            archetype = self.archetypes[archetype].name,
            "actor spawned"
        );
        deliver_queued(&mut self.slots, &mut self.mail);
        Ok(id)
    }

    /// Deliver `signal` to the actor in slot `to`, followed by everything the
    /// handlers involved queue along the way.
    ///
    /// Returns the number of messages that reached a live handler. Messages to
    /// free slots are dropped.
    pub fn tell(&mut self, to: ActorId, signal: Signal<G::Payload>) -> usize {
        self.mail.push_back((to, signal));
        deliver_queued(&mut self.slots, &mut self.mail)
    }

    /// Report a contact between `a` and `b`: `a` hears about `b` first, then
    /// `b` about `a`.
    pub fn notify_collision(&mut self, a: ActorId, b: ActorId) -> usize {
        self.tell(a, Signal::Collision { other: b }) + self.tell(b, Signal::Collision { other: a })
    }

    /// Tick every live actor with `dt`, then reap those left without a
    /// handler.
    ///
    /// `reclaim` sees each dead actor just before its slot is freed. Actors
    /// spawned during the pass (by handlers) are not guaranteed a tick this
    /// frame; actors killed by mail after their own tick are reaped on the
    /// next pass.
    pub fn update(&mut self, dt: f64, mut reclaim: impl FnMut(&mut Actor<G>)) -> UpdateReport {
        let tick = Message::Tick { elapsed: dt };
        let mut report = UpdateReport::default();
        let mut cursor = self.slots.iterate();

        while cursor.next().is_some() {
            let Some(actor) = cursor.current_mut() else {
                continue;
            };
            report.ticked += 1;
            dispatch(actor, &tick);
            self.mail.extend(actor.outbox.drain(..));

            if !self.mail.is_empty() {
                deliver_queued(cursor.pool_mut(), &mut self.mail);
            }

            let Some(actor) = cursor.current_mut() else {
                continue;
            };
            if actor.is_alive() {
                continue;
            }
            tracing::trace!(actor = %actor.id, "actor reaped");
            reclaim(actor);
            cursor.remove_current();
            report.reaped += 1;
        }

        report
    }

    /// Borrow the actor in slot `id`, if live.
    pub fn get(&self, id: ActorId) -> Option<&Actor<G>> {
        self.slots.get(id)
    }

    /// Mutably borrow the actor in slot `id`, if live.
    pub fn get_mut(&mut self, id: ActorId) -> Option<&mut Actor<G>> {
        self.slots.get_mut(id)
    }

    /// The archetype registered at `index`.
    pub fn archetype(&self, index: usize) -> Option<&Archetype<G>> {
        self.archetypes.get(index)
    }

    /// Number of live actors.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// `true` if no actor is live.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Maximum number of actors.
    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    /// Iterate live actors in slot order.
    pub fn iter(&self) -> Iter<'_, Actor<G>> {
        self.slots.iter()
    }
}

impl<G: Game> fmt::Debug for ActorPool<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorPool")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("archetypes", &self.archetypes)
            .finish_non_exhaustive()
    }
}

/// Deliver queued mail until none is left, including mail queued by the
/// deliveries themselves. Returns how many messages reached a live handler.
fn deliver_queued<G: Game>(slots: &mut SlotPool<Actor<G>>, mail: &mut VecDeque<Letter<G>>) -> usize {
    let mut delivered = 0;
    while let Some((to, signal)) = mail.pop_front() {
        let Some(actor) = slots.get_mut(to) else {
            tracing::trace!(to = %to, "mail to a free slot dropped");
            continue;
        };
        if !actor.is_alive() {
            continue;
        }
        dispatch(actor, &Message::Custom(signal));
        delivered += 1;
        mail.extend(actor.outbox.drain(..));
    }
    delivered
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
