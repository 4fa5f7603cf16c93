//! Hierarchical state dispatch.
//!
//! An [`Ear`] is anything that can receive messages. It carries exactly one
//! piece of dispatch state: its current [`Handler`]. There is no separate
//! state enumeration. The handler *is* the state, and changing state means
//! storing a different handler.
//!
//! A handler answers each message with an [`Outcome`]:
//!
//! - [`Outcome::Ignored`] / [`Outcome::Handled`]: dispatch stops.
//! - [`Outcome::Super`]: the handler defers to a less-derived handler. That
//!   handler becomes the ear's current handler and sees the same message.
//! - [`Outcome::Transition`]: the ear moves to a new handler (or to none,
//!   which terminates it). The handler that was current when dispatch began
//!   receives [`Message::Exit`]; then, if the ear still has a handler, that
//!   handler receives [`Message::Enter`].
//!
//! Superstates are not declared anywhere. Each handler picks its own fallback,
//! so every behaviour gets an ad hoc hierarchy.
//!
//! Messages are borrowed for the duration of one dispatch and cannot be kept.
//! Dispatch is synchronous and must not re-enter the same ear.

use std::fmt;

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A message delivered to an [`Ear`].
///
/// `P` is the payload type for everything that is not a lifecycle or tick
/// message (collisions, damage, and other game-specific events).
#[derive(Debug, Clone, PartialEq)]
pub enum Message<P> {
    /// Synthetic: the handler has just become current through a transition.
    Enter,
    /// Synthetic: the handler is being left through a transition.
    Exit,
    /// Once per frame, carrying the frame's elapsed time in seconds.
    Tick {
        /// Seconds since the previous tick.
        elapsed: f64,
    },
    /// Any other message.
    Custom(P),
}

// ---------------------------------------------------------------------------
// Handler / Outcome
// ---------------------------------------------------------------------------

/// A state: a function receiving the ear and a message.
pub type Handler<E> = fn(&mut E, &Message<<E as Ear>::Payload>) -> Outcome<E>;

/// What a handler did with a message.
pub enum Outcome<E: Ear> {
    /// The message means nothing in this state.
    Ignored,
    /// The message was consumed.
    Handled,
    /// Move to another state; `None` terminates the ear.
    Transition(Option<Handler<E>>),
    /// Defer to a less-derived state, which becomes current.
    Super(Handler<E>),
}

impl<E: Ear> Clone for Outcome<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E: Ear> Copy for Outcome<E> {}

impl<E: Ear> fmt::Debug for Outcome<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ignored => f.write_str("Ignored"),
            Self::Handled => f.write_str("Handled"),
            Self::Transition(Some(h)) => write!(f, "Transition({:p})", *h as *const ()),
            Self::Transition(None) => f.write_str("Transition(None)"),
            Self::Super(h) => write!(f, "Super({:p})", *h as *const ()),
        }
    }
}

/// Whether two handlers are the same state.
#[inline]
pub fn same_handler<E: Ear>(a: Handler<E>, b: Handler<E>) -> bool {
    a as usize == b as usize
}

// ---------------------------------------------------------------------------
// Ear
// ---------------------------------------------------------------------------

/// A dispatch target. Exposes nothing but its current handler.
pub trait Ear: Sized {
    /// Payload type of [`Message::Custom`].
    type Payload;

    /// The current handler, or `None` if the ear has terminated.
    fn handler(&self) -> Option<Handler<Self>>;

    /// Mutable access to the current handler.
    fn handler_mut(&mut self) -> &mut Option<Handler<Self>>;

    /// `true` if `handler` is the current state.
    fn is_in(&self, handler: Handler<Self>) -> bool {
        self.handler().is_some_and(|h| same_handler(h, handler))
    }
}

// ---------------------------------------------------------------------------
// dispatch
// ---------------------------------------------------------------------------

/// Deliver `message` to `ear`.
///
/// Returns `true` if the ear still has a handler afterwards, `false` if it has
/// terminated (or had already terminated, in which case nothing is delivered).
/// Whatever the synthetic `Exit` and `Enter` deliveries return is not acted on.
pub fn dispatch<E: Ear>(ear: &mut E, message: &Message<E::Payload>) -> bool {
    let Some(leaf) = ear.handler() else {
        return false;
    };

    let mut current = leaf;
    let target = loop {
        match current(ear, message) {
            Outcome::Super(parent) => {
                *ear.handler_mut() = Some(parent);
                current = parent;
            }
            Outcome::Ignored | Outcome::Handled => return ear.handler().is_some(),
            Outcome::Transition(target) => break target,
        }
    };

    *ear.handler_mut() = target;
    tracing::trace!(
        from = ?(leaf as *const ()),
        to = ?target.map(|h| h as *const ()),
        "state transition"
    );

    leaf(ear, &Message::Exit);
    if let Some(entered) = ear.handler() {
        entered(ear, &Message::Enter);
    }
    ear.handler().is_some()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
