//! Headless wave demo -- invaders slide in, a turret fires at them, and the
//! session ends once the field is clear.
//!
//! Run with:
//!   cargo run --example wave_demo -p ember-engine [-- CONFIG.json] [--realtime]
//!
//! Without `--realtime` the demo steps at a fixed 1/60 s as fast as it can.

use anyhow::Context;
use ember_engine::prelude::*;

// ---------------------------------------------------------------------------
// Game
// ---------------------------------------------------------------------------

struct Invaders;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Hit {
    Damage(u32),
}

#[derive(Debug, Default, Clone)]
struct Craft {
    x: f64,
    y: f64,
    vx: f64,
    vy: f64,
    hp: u32,
    timer: f64,
}

impl Game for Invaders {
    type Payload = Hit;
    type State = Craft;
    type Body = u32;
    type Sprite = char;
}

const INVADER: usize = 0;
const SHOT: usize = 1;
const FIELD_WIDTH: f64 = 120.0;
const TURRET_Y: f64 = 100.0;

fn hovering(me: &mut Actor<Invaders>, m: &ActorMessage<Invaders>) -> ActorOutcome<Invaders> {
    match m {
        Message::Enter => {
            me.body = Some(me.id().index() as u32);
            me.sprite = Some('W');
            Outcome::Handled
        }
        Message::Tick { elapsed } => {
            me.state.x += me.state.vx * elapsed;
            if !(0.0..=FIELD_WIDTH).contains(&me.state.x) {
                me.state.vx = -me.state.vx;
                me.state.x = me.state.x.clamp(0.0, FIELD_WIDTH);
            }
            Outcome::Handled
        }
        _ => Outcome::Super(stunned),
    }
}

/// Once hit, an invader stops moving for good.
fn stunned(me: &mut Actor<Invaders>, m: &ActorMessage<Invaders>) -> ActorOutcome<Invaders> {
    match m {
        Message::Custom(Signal::Custom(Hit::Damage(n))) => {
            me.state.hp = me.state.hp.saturating_sub(*n);
            me.sprite = Some('w');
            if me.state.hp == 0 {
                Outcome::Transition(Some(exploding))
            } else {
                Outcome::Handled
            }
        }
        _ => Outcome::Ignored,
    }
}

fn exploding(me: &mut Actor<Invaders>, m: &ActorMessage<Invaders>) -> ActorOutcome<Invaders> {
    match m {
        Message::Enter => {
            me.sprite = Some('*');
            me.state.timer = 0.0;
            Outcome::Handled
        }
        Message::Tick { elapsed } => {
            me.state.timer += elapsed;
            if me.state.timer >= 0.3 {
                Outcome::Transition(None)
            } else {
                Outcome::Handled
            }
        }
        _ => Outcome::Ignored,
    }
}

fn flying(me: &mut Actor<Invaders>, m: &ActorMessage<Invaders>) -> ActorOutcome<Invaders> {
    match m {
        Message::Enter => {
            me.body = Some(me.id().index() as u32);
            me.sprite = Some('|');
            Outcome::Handled
        }
        Message::Tick { elapsed } => {
            me.state.y += me.state.vy * elapsed;
            if me.state.y < 0.0 {
                me.tell(me.id(), Signal::Offside);
            }
            Outcome::Handled
        }
        Message::Custom(Signal::Collision { other }) => {
            me.tell(*other, Signal::Custom(Hit::Damage(1)));
            Outcome::Transition(None)
        }
        Message::Custom(Signal::Offside) => Outcome::Transition(None),
        _ => Outcome::Ignored,
    }
}

fn archetypes() -> Vec<Archetype<Invaders>> {
    vec![
        Archetype::new("invader", hovering as ActorHandler<Invaders>)
            .with_radius(4.0)
            .with_mass(10.0),
        Archetype::new("shot", flying as ActorHandler<Invaders>)
            .with_radius(1.0)
            .with_mass(0.1),
    ]
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

fn invaders_left(stage: &StageContext<Invaders>) -> usize {
    stage.with_actors(|actors| {
        actors
            .iter()
            .filter(|(_, a)| a.archetype() == INVADER && a.is_alive())
            .count()
    })
}

fn formation(fiber: &Fiber<'_>, stage: StageContext<Invaders>) {
    let mut ids = Vec::new();
    for column in 0..8 {
        let craft = Craft {
            x: 10.0 + column as f64 * 14.0,
            y: -10.0,
            vx: 12.0,
            hp: 2,
            ..Craft::default()
        };
        match stage.spawn(INVADER, craft) {
            Ok(id) => ids.push(id),
            Err(e) => tracing::warn!(error = %e, "invader not spawned"),
        }
    }

    ease_to(fiber, -10.0, 30.0, 1.5, elastic, |y| {
        stage.with_actors(|actors| {
            for &id in &ids {
                if let Some(invader) = actors.get_mut(id) {
                    invader.state.y = y;
                }
            }
        })
    });
    wait_for(fiber, 0.5);
}

fn assault(fiber: &Fiber<'_>, mut stage: StageContext<Invaders>) {
    let mut shots = 0;
    while invaders_left(&stage) > 0 && shots < 400 {
        let x = stage.rng().gen_range(0.0..FIELD_WIDTH);
        let shot = Craft {
            x,
            y: TURRET_Y,
            vy: -80.0,
            ..Craft::default()
        };
        if stage.spawn(SHOT, shot).is_ok() {
            shots += 1;
        }
        wait_for(fiber, 0.1);
    }
    tracing::info!(shots, "assault over");
}

fn outro(fiber: &Fiber<'_>, stage: StageContext<Invaders>) {
    wait_until(fiber, |_| stage.live_actors() == 0);
}

// ---------------------------------------------------------------------------
// Collisions
// ---------------------------------------------------------------------------

/// Shots against invaders, by circle overlap.
fn contacts(actors: &ActorPool<Invaders>) -> Vec<(ActorId, ActorId)> {
    let radius = |index: usize| {
        actors
            .archetype(index)
            .map_or(0.0, |a| f64::from(a.collision_radius))
    };
    let mut pairs = Vec::new();
    for (shot_id, shot) in actors.iter().filter(|(_, a)| a.archetype() == SHOT) {
        for (target_id, target) in actors.iter().filter(|(_, a)| a.archetype() == INVADER) {
            let dx = shot.state.x - target.state.x;
            let dy = shot.state.y - target.state.y;
            let reach = radius(SHOT) + radius(INVADER);
            if dx * dx + dy * dy <= reach * reach {
                pairs.push((shot_id, target_id));
                break;
            }
        }
    }
    pairs
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    let mut config_path = None;
    let mut realtime = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--realtime" => realtime = true,
            path => config_path = Some(path.to_owned()),
        }
    }

    let config = match &config_path {
        Some(path) => EngineConfig::load(path).with_context(|| format!("loading {path}"))?,
        None => EngineConfig::default(),
    };
    init_logging(&config.log_filter);

    let stages = vec![
        StageSpec::new("formation", formation as StageEntry<Invaders>),
        StageSpec::new("assault", assault as StageEntry<Invaders>),
        StageSpec::new("outro", outro as StageEntry<Invaders>).with_stack_words(16 * 1024),
    ];
    let mut session = Session::new(&config, archetypes(), stages).context("starting session")?;

    let released = std::rc::Rc::new(std::cell::Cell::new(0u32));
    let counter = released.clone();
    session.on_reclaim(move |actor| {
        if actor.body.take().is_some() {
            counter.set(counter.get() + 1);
        }
    });

    let mut clock = FrameClock::new().with_max_step(0.1);
    let mut hits = 0;
    while !session.is_finished() && session.frame_count() < 60 * 120 {
        let dt = if realtime {
            std::thread::sleep(std::time::Duration::from_millis(16));
            clock.tick()
        } else {
            1.0 / 60.0
        };
        let report = session.frame(dt);

        let pairs = contacts(&session.actors());
        for (shot, invader) in pairs {
            session.actors_mut().notify_collision(shot, invader);
            hits += 1;
        }

        if report.frame % 60 == 0 {
            tracing::info!(
                frame = report.frame,
                stage = report.stage.unwrap_or("-"),
                live = report.live,
                "status"
            );
        }
    }

    println!(
        "finished={} frames={} elapsed={:.2}s hits={} bodies released={}",
        session.is_finished(),
        session.frame_count(),
        session.elapsed(),
        hits,
        released.get()
    );
    Ok(())
}
