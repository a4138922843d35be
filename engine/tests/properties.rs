//! Property-based tests for the universal invariants spec.md §8 calls
//! for, driven with `proptest` the way
//! `examples/allisoneer-standalone_tools`'s `vim/tests/property_tests.rs`
//! drives its own command-stream fuzzing. Each property below picks one
//! invariant from §8 and a small, safe corner of the command alphabet
//! (word motions, counts ≤ 9, a single idempotent operator) rather than
//! fully unconstrained random streams, so a failure points at one
//! specific behavior instead of an unreproducible soup of keystrokes.

mod support;

use std::cell::RefCell;
use std::rc::Rc;

use proptest::prelude::*;

use support::mock_host::MockHost;
use support::undo_host::UndoHost;
use vim_engine::input::Inputs;
use vim_engine::{Engine, EngineGlobals, HostBridge};

fn type_str(engine: &mut Engine, host: &mut dyn HostBridge, s: &str) {
    for input in Inputs::parse(s).0 {
        engine.on_input(host, input);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// "For every yank followed by paste into an empty buffer: the pasted
    /// content equals the yanked range's text." Two buffers share one
    /// `EngineGlobals` (the unnamed register is engine-global, per
    /// spec.md §3's lifecycle table), exactly as two open buffers would.
    #[test]
    fn yank_then_paste_into_empty_buffer_round_trips(n in 1u32..=5) {
        let globals = EngineGlobals::shared();
        let mut source = Engine::new(Rc::clone(&globals));
        let mut source_host = MockHost::new("alpha beta gamma delta epsilon zeta eta theta");
        type_str(&mut source, &mut source_host, &format!("y{n}w"));
        let yanked = globals.borrow().registers.get(None).text;
        prop_assert!(!yanked.is_empty());

        let mut dest = Engine::new(Rc::clone(&globals));
        let mut dest_host = MockHost::new("");
        type_str(&mut dest, &mut dest_host, "p");
        prop_assert_eq!(dest_host.text(), yanked);
    }

    /// "For every motion m, `d m u` is a no-op on text." `m` ranges over
    /// counted `w` motions on a long word list, undone through a host
    /// with a real (snapshot-based) undo stack.
    #[test]
    fn delete_word_motion_then_undo_restores_text(n in 1u32..=6) {
        let globals = EngineGlobals::shared();
        let mut engine = Engine::new(globals);
        let original = "one two three four five six seven eight nine ten eleven twelve";
        let mut host = UndoHost::new(original);
        type_str(&mut engine, &mut host, &format!("{n}dw"));
        prop_assert_ne!(host.text(), original);
        type_str(&mut engine, &mut host, "u");
        prop_assert_eq!(host.text(), original);
    }

    /// "For every count n >= 1 and idempotent operator O (e.g. `~` on a
    /// single-char range): nO is equivalent to O applied n times in
    /// sequence." Requires the bare `~` command to advance the cursor
    /// past what it just swapped, the way real vim does, so each of the
    /// n individual presses lands on a fresh character instead of
    /// flipping the same one back and forth.
    #[test]
    fn counted_swapcase_matches_same_number_of_bare_presses(n in 1u32..=5) {
        let text = "aBcDeFgHiJ";

        let globals_a = EngineGlobals::shared();
        let mut engine_a = Engine::new(globals_a);
        let mut host_a = MockHost::new(text);
        type_str(&mut engine_a, &mut host_a, &format!("{n}~"));

        let globals_b = EngineGlobals::shared();
        let mut engine_b = Engine::new(globals_b);
        let mut host_b = MockHost::new(text);
        for _ in 0..n {
            type_str(&mut engine_b, &mut host_b, "~");
        }

        prop_assert_eq!(host_a.text(), host_b.text());
        prop_assert_eq!(host_a.cursor, host_b.cursor);
    }

    /// "For every change-producing command sequence C, `C .` produces
    /// the same delta as `C C`, modulo cursor column." `C` here is a
    /// single typed insertion of `s` followed by `<Esc>`.
    #[test]
    fn dot_repeats_an_insertion_like_typing_it_twice(s in "[a-zA-Z0-9]{1,5}") {
        let globals = EngineGlobals::shared();
        let mut engine = Engine::new(globals);
        let mut host = MockHost::new("base");
        type_str(&mut engine, &mut host, &format!("i{s}<Esc>"));
        type_str(&mut engine, &mut host, ".");

        let globals2 = EngineGlobals::shared();
        let mut engine2 = Engine::new(globals2);
        let mut host2 = MockHost::new("base");
        type_str(&mut engine2, &mut host2, &format!("i{s}<Esc>i{s}<Esc>"));

        prop_assert_eq!(host.text(), host2.text());
    }
}
