//! Integration tests driving `Engine` end-to-end through a `MockHost`,
//! exercising whole keystroke sequences rather than individual
//! internal functions (those are covered by the `#[cfg(test)]` modules
//! colocated in `src/`).

mod support;

use support::mock_host::MockHost;
use vim_engine::input::{Input, Inputs, KeyCode};
use vim_engine::{Engine, EngineGlobals};

fn type_str(engine: &mut Engine, host: &mut MockHost, s: &str) {
    for input in Inputs::parse(s).0 {
        engine.on_input(host, input);
    }
}

fn fresh() -> (Engine, MockHost) {
    (Engine::new(EngineGlobals::shared()), MockHost::new(""))
}

#[test]
fn dw_cw_and_dot_repeat_compose() {
    let (mut engine, _) = fresh();
    let mut host = MockHost::new("the quick brown fox");
    type_str(&mut engine, &mut host, "dw");
    assert_eq!(host.text(), "quick brown fox");
    type_str(&mut engine, &mut host, ".");
    assert_eq!(host.text(), "brown fox");
}

#[test]
fn visual_line_delete_removes_whole_lines() {
    let (mut engine, _) = fresh();
    let mut host = MockHost::new("one\ntwo\nthree\nfour");
    type_str(&mut engine, &mut host, "Vjd");
    assert_eq!(host.text(), "three\nfour");
}

#[test]
fn find_and_till_motions_with_operator() {
    let (mut engine, _) = fresh();
    let mut host = MockHost::new("remove(this, please)");
    type_str(&mut engine, &mut host, "dt)");
    assert_eq!(host.text(), ")");
}

#[test]
fn undo_reports_nothing_happened_on_a_host_with_no_history() {
    let (mut engine, _) = fresh();
    let mut host = MockHost::new("abc");
    type_str(&mut engine, &mut host, "xu");
    assert_eq!(host.text(), "bc");
}

#[test]
fn sentence_text_object_selects_one_sentence() {
    let (mut engine, _) = fresh();
    let mut host = MockHost::new("One sentence. Two sentence. Three.");
    type_str(&mut engine, &mut host, "wdis");
    assert_eq!(host.text(), " Two sentence. Three.");
}

#[test]
fn ex_global_line_delete_via_range() {
    let (mut engine, _) = fresh();
    let mut host = MockHost::new("a\nb\nc\nd\ne");
    engine.on_input(&mut host, Input::char(':'));
    type_str(&mut engine, &mut host, "2,4d");
    engine.on_input(&mut host, Input::key(KeyCode::Enter));
    assert_eq!(host.text(), "a\ne");
}

#[test]
fn registers_round_trip_through_named_register() {
    let (mut engine, _) = fresh();
    let mut host = MockHost::new("alpha beta");
    type_str(&mut engine, &mut host, "\"aywW\"ap");
    assert_eq!(host.text(), "alpha balpha eta");
}
