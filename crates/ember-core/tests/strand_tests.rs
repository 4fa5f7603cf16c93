//! Strand trees: fibers that spawn and drive their own child fibers.

use std::cell::RefCell;
use std::rc::Rc;

use ember_core::strand::{Fiber, Strand};

const WORDS: usize = 16 * 1024;

/// Yield once, then (if `depth > 0`) spawn a child one level shallower and
/// forward every resume to it until it finishes.
fn nested(fiber: &Fiber<'_>, depth: usize) {
    fiber.yield_now();
    if depth == 0 {
        return;
    }
    let mut child = Strand::spawn_with(WORDS, depth - 1, nested);
    while child.is_alive() {
        let dt = fiber.yield_now();
        child.resume(dt);
    }
    child.destroy();
}

fn resumes_to_exhaust(depth: usize) -> usize {
    let mut root = Strand::spawn_with(WORDS, depth, nested);
    let mut resumes = 0;
    while root.is_alive() {
        root.resume(1.0 / 60.0);
        resumes += 1;
        assert!(resumes <= depth + 1, "chain of depth {depth} still alive");
    }
    root.destroy();
    resumes
}

#[test]
fn nested_chain_needs_depth_plus_one_resumes() {
    for depth in 0..8 {
        assert_eq!(resumes_to_exhaust(depth), depth + 1);
    }
}

#[test]
fn child_sees_the_parents_dt() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let outer_log = log.clone();

    let mut parent = Strand::spawn(WORDS, move |fiber| {
        let inner_log = outer_log.clone();
        let mut child = Strand::spawn(WORDS, move |fiber| loop {
            let dt = fiber.yield_now();
            inner_log.borrow_mut().push(("child", dt));
        });
        for _ in 0..2 {
            let dt = fiber.yield_now();
            outer_log.borrow_mut().push(("parent", dt));
            child.resume(dt * 2.0);
        }
        child.destroy();
    });

    parent.resume(0.5);
    parent.resume(1.0);
    assert!(!parent.is_alive());
    assert_eq!(
        *log.borrow(),
        vec![
            ("parent", 0.5),
            ("child", 1.0),
            ("parent", 1.0),
            ("child", 2.0)
        ]
    );
}

#[test]
fn deep_recursion_inside_a_fiber_fits_its_stack() {
    fn depth_sum(n: u64) -> u64 {
        if n == 0 {
            0
        } else {
            n + depth_sum(n - 1)
        }
    }

    let out = Rc::new(RefCell::new(0));
    let o = out.clone();
    let strand = Strand::spawn(64 * 1024, move |_| {
        *o.borrow_mut() = depth_sum(1_000);
    });
    assert!(!strand.is_alive());
    assert_eq!(*out.borrow(), 500_500);
}

#[test]
fn waiting_accumulates_steps_across_resumes() {
    let fired = Rc::new(RefCell::new(Vec::new()));
    let f = fired.clone();
    let mut strand = Strand::spawn(WORDS, move |fiber| {
        let mut accum = 0.0;
        let mut frame = 0;
        loop {
            accum += fiber.yield_now();
            frame += 1;
            if accum >= 1.0 {
                f.borrow_mut().push(frame);
                accum -= 1.0;
            }
        }
    });
    for _ in 0..10 {
        strand.resume(0.25);
    }
    assert_eq!(*fired.borrow(), vec![4, 8]);
    assert!(strand.is_alive());
    strand.destroy();
}
