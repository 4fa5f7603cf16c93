//! Actor pool integration tests: mail ordering, lifecycle delivery, and a
//! property test of spawn/kill/update against a simple model.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use ember_engine::prelude::*;
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Relay game: every actor shares one journal.
// ---------------------------------------------------------------------------

struct Relay;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Note {
    /// Forward `Note::Mark(tag)` to each listed slot.
    Fan(&'static [(u32, u32)]),
    Mark(u32),
    Die,
}

type Journal = Rc<RefCell<Vec<(u32, &'static str, u32)>>>;

impl Game for Relay {
    type Payload = Note;
    type State = Journal;
    type Body = ();
    type Sprite = ();
}

fn listening(me: &mut Actor<Relay>, m: &ActorMessage<Relay>) -> ActorOutcome<Relay> {
    let slot = me.id().index() as u32;
    match m {
        Message::Enter => {
            me.state.borrow_mut().push((slot, "enter", 0));
            Outcome::Handled
        }
        Message::Exit => {
            me.state.borrow_mut().push((slot, "exit", 0));
            Outcome::Handled
        }
        Message::Custom(Signal::Custom(Note::Fan(targets))) => {
            for &(to, tag) in targets.iter() {
                me.tell(SlotId::new(to), Signal::Custom(Note::Mark(tag)));
            }
            Outcome::Handled
        }
        Message::Custom(Signal::Custom(Note::Mark(tag))) => {
            me.state.borrow_mut().push((slot, "mark", *tag));
            // Slot 1 passes marks on to slot 2.
            if slot == 1 {
                me.tell(SlotId::new(2), Signal::Custom(Note::Mark(tag + 100)));
            }
            Outcome::Handled
        }
        Message::Custom(Signal::Custom(Note::Die)) => Outcome::Transition(None),
        _ => Outcome::Ignored,
    }
}

fn relay_archetypes() -> Vec<Archetype<Relay>> {
    vec![Archetype::new("relay", listening as ActorHandler<Relay>)]
}

fn relay_pool(journal: &Journal, count: usize) -> ActorPool<Relay> {
    let mut pool = ActorPool::new(32, relay_archetypes());
    for _ in 0..count {
        pool.spawn(0, journal.clone()).unwrap();
    }
    journal.borrow_mut().clear();
    pool
}

#[test]
fn spawn_delivers_enter_in_slot_order() {
    let journal = Journal::default();
    let mut pool = ActorPool::new(32, relay_archetypes());
    for _ in 0..3 {
        pool.spawn(0, journal.clone()).unwrap();
    }
    assert_eq!(
        *journal.borrow(),
        vec![(0, "enter", 0), (1, "enter", 0), (2, "enter", 0)]
    );
}

#[test]
fn queued_mail_is_delivered_first_in_first_out() {
    let journal = Journal::default();
    let mut pool = relay_pool(&journal, 3);

    static TARGETS: [(u32, u32); 2] = [(1, 1), (2, 2)];
    let delivered = pool.tell(SlotId::new(0), Signal::Custom(Note::Fan(&TARGETS)));

    // Slot 1's forward is queued behind the direct mark to slot 2.
    assert_eq!(delivered, 4);
    assert_eq!(
        *journal.borrow(),
        vec![(1, "mark", 1), (2, "mark", 2), (2, "mark", 101)]
    );
}

#[test]
fn termination_delivers_exit_and_drops_later_mail() {
    let journal = Journal::default();
    let mut pool = relay_pool(&journal, 2);

    assert_eq!(pool.tell(SlotId::new(1), Signal::Custom(Note::Die)), 1);
    assert_eq!(pool.tell(SlotId::new(1), Signal::Custom(Note::Mark(9))), 0);
    assert_eq!(*journal.borrow(), vec![(1, "exit", 0)]);

    let mut reclaimed = Vec::new();
    let report = pool.update(1.0 / 60.0, |actor| reclaimed.push(actor.id()));
    assert_eq!(report, UpdateReport { ticked: 2, reaped: 1 });
    assert_eq!(reclaimed, vec![SlotId::new(1)]);
    assert_eq!(pool.len(), 1);
}

#[test]
fn collision_notifies_both_sides_in_order() {
    fn bump(me: &mut Actor<Relay>, m: &ActorMessage<Relay>) -> ActorOutcome<Relay> {
        if let Message::Custom(Signal::Collision { other }) = m {
            let slot = me.id().index() as u32;
            me.state
                .borrow_mut()
                .push((slot, "bump", other.index() as u32));
        }
        Outcome::Handled
    }

    let journal = Journal::default();
    let archetypes = vec![Archetype::new("bumper", bump as ActorHandler<Relay>)];
    let mut pool = ActorPool::new(32, archetypes);
    let a = pool.spawn(0, journal.clone()).unwrap();
    let b = pool.spawn(0, journal.clone()).unwrap();

    assert_eq!(pool.notify_collision(b, a), 2);
    assert_eq!(*journal.borrow(), vec![(1, "bump", 0), (0, "bump", 1)]);
}

// ---------------------------------------------------------------------------
// Property: the pool agrees with a set of live ids.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Op {
    Spawn,
    Kill(u32),
    Update,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Spawn),
        2 => (0u32..40).prop_map(Op::Kill),
        1 => Just(Op::Update),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn pool_tracks_model(ops in prop::collection::vec(op_strategy(), 1..120)) {
        let journal = Journal::default();
        let mut pool = relay_pool(&journal, 0);
        let mut live: BTreeSet<u32> = BTreeSet::new();
        let mut dying: BTreeSet<u32> = BTreeSet::new();
        let mut reclaimed = 0usize;
        let mut reaped = 0usize;

        for op in ops {
            match op {
                Op::Spawn => {
                    let expected = (0u32..32).find(|i| !live.contains(i));
                    match pool.spawn(0, journal.clone()) {
                        Ok(id) => {
                            prop_assert_eq!(Some(id.index() as u32), expected);
                            live.insert(id.index() as u32);
                        }
                        Err(SpawnError::NoRoom { capacity }) => {
                            prop_assert_eq!(capacity, 32);
                            prop_assert_eq!(expected, None);
                        }
                        Err(other) => prop_assert!(false, "unexpected {other}"),
                    }
                }
                Op::Kill(slot) => {
                    if slot >= 32 {
                        continue;
                    }
                    let delivered = pool.tell(SlotId::new(slot), Signal::Custom(Note::Die));
                    let reachable = live.contains(&slot) && !dying.contains(&slot);
                    prop_assert_eq!(delivered, usize::from(reachable));
                    if reachable {
                        dying.insert(slot);
                    }
                }
                Op::Update => {
                    let report = pool.update(0.1, |_| reclaimed += 1);
                    prop_assert_eq!(report.ticked, live.len());
                    prop_assert_eq!(report.reaped, dying.len());
                    reaped += report.reaped;
                    for slot in std::mem::take(&mut dying) {
                        live.remove(&slot);
                    }
                }
            }
            prop_assert_eq!(pool.len(), live.len());
        }

        let ids: Vec<u32> = pool.iter().map(|(id, _)| id.index() as u32).collect();
        prop_assert_eq!(ids, live.into_iter().collect::<Vec<_>>());
        prop_assert_eq!(reclaimed, reaped);
    }
}
