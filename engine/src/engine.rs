//! The central dispatcher: turns `Input`s into host mutations by driving
//! `ModeMachine`, `MappingResolver`, `motion`/`executor`, `ex`/`ex_exec`
//! and `search` against a `HostBridge`. Grounded in `fakevimhandler.cpp`'s
//! `FakeVimHandler::Private::handleKey` top-level dispatch (the
//! sub-mode-by-sub-mode `if` cascade it uses to decide what a keystroke
//! means), generalized from its single `g_data`-owned document to a
//! `Rc<RefCell<EngineGlobals>>` shared across buffers plus a per-buffer
//! `Engine`, so settings/registers/marks stay shared while mode state
//! stays local to each open buffer.

use std::cell::RefCell;
use std::rc::Rc;

use crate::dotcmd::DotCommand;
use crate::edit::{JumpList, Marks, Position, Range, RangeMode, Register};
use crate::error::EngineError;
use crate::ex::{
    apply_substitution_flags, bare_goto_target, is_bare_goto, parse_line, parse_substitution,
    ExCommand, ExError, ExRange, RangeAddress,
};
use crate::ex_exec::{registers_listing, substitute_range};
use crate::executor::{
    apply_operator, join_lines, motion_target, operator_range, paste_register, text_object_range,
};
use crate::globals::EngineGlobals;
use crate::host::HostBridge;
use crate::input::{Input, InputPipeline, KeyCode, PipelineOutcome};
use crate::keymap::{MapLookup, MapMode};
use crate::message::Message;
use crate::mode::{MarkPurpose, Mode, ModeMachine, Operator, SubMode, SubSubMode, VisualMode};
use crate::motion::{Motion, TextObject, TextObjectKind};
use crate::search::{search, word_under_cursor_pattern, SearchDirection};

/// What the host should do after feeding one `Input` (or a timeout) to
/// the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// The input was consumed; nothing further is required of the host.
    Handled,
    /// A mapping might still be pending — the host should start (or keep
    /// running) its `MAPPING_TIMEOUT` timer and call `on_timeout` if it
    /// expires before the next key arrives.
    NeedsMoreInput,
    /// No mapping claimed the buffered input; the host should process
    /// these raw inputs itself (fed back through `on_input` one at a
    /// time is also correct, but callers typically re-dispatch them).
    PassThrough(Vec<Input>),
    /// `:q`/`:qall`/`ZZ`/`ZQ` was executed; the host should close this
    /// view (and, for `:qall`, the application).
    Quit,
}

/// Distinguishes the two things a `:`/`/`/`?` command line can mean once
/// `<CR>` is pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmdlineKind {
    Ex,
    Search { forward: bool },
}

/// One buffer's worth of modal state. Cheap to create; the expensive,
/// shared state (registers, mappings, settings) lives in `EngineGlobals`
/// behind the `Rc<RefCell<_>>` every `Engine` attached to the same
/// document holds a clone of.
pub struct Engine {
    globals: Rc<RefCell<EngineGlobals>>,
    mode: ModeMachine,
    visual_anchor: Position,
    last_visual_mode: Option<VisualMode>,
    pipeline: InputPipeline,
    marks: Marks,
    jumps: JumpList,
    dot: DotCommand,
    search: crate::search::SearchState,
    pending_register: Option<char>,
    pending_text_object_kind: Option<TextObjectKind>,
    /// Set when `g` is seen while an operator (or visual mode) is
    /// pending, so the next key picks a `gg`/`ge`/`g_`-family motion
    /// without `SubMode` needing to represent "operator and goto at
    /// once".
    goto_pending: bool,
    /// Set when `Z` is seen at the top level, awaiting `Z` (write+quit)
    /// or `Q` (quit without writing).
    z_pending: bool,
    cmdline: String,
    cmdline_kind: Option<CmdlineKind>,
    /// True while replaying `.` or running `:normal`; suppresses nested
    /// dot-recording and re-entrant mapping expansion.
    replaying: bool,
    pending_quit: bool,
    /// True between a `host.begin_undo_group()` and its matching
    /// `end_undo_group()`, so a compound command (an operator, a paste,
    /// an Insert-mode session) lands as one host undo step no matter
    /// how many primitive `delete_range`/`insert` calls it makes.
    block_open: bool,
    /// The last `:s`/`:&`/`:&&` invocation, reused by a bare `:s` or a
    /// flags-only trailer on `:&`/`:&&`.
    last_substitution: Option<crate::ex::Substitution>,
}

impl Engine {
    pub fn new(globals: Rc<RefCell<EngineGlobals>>) -> Self {
        Self {
            globals,
            mode: ModeMachine::new(),
            visual_anchor: Position::default(),
            last_visual_mode: None,
            pipeline: InputPipeline::new(),
            marks: Marks::new(),
            jumps: JumpList::new(),
            dot: DotCommand::new(),
            search: crate::search::SearchState::new(),
            pending_register: None,
            pending_text_object_kind: None,
            goto_pending: false,
            z_pending: false,
            cmdline: String::new(),
            cmdline_kind: None,
            replaying: false,
            pending_quit: false,
            block_open: false,
            last_substitution: None,
        }
    }

    /// Opens an edit block if one isn't already open. Idempotent so
    /// nested callers (an operator that enters Insert mode, say) don't
    /// need to know whether an outer caller already opened one.
    fn open_block(&mut self, host: &mut dyn HostBridge) {
        if !self.block_open {
            host.begin_undo_group();
            self.block_open = true;
        }
    }

    /// Closes the open edit block, if any.
    fn close_block(&mut self, host: &mut dyn HostBridge) {
        if self.block_open {
            host.end_undo_group();
            self.block_open = false;
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode.mode()
    }

    pub fn cmdline_text(&self) -> Option<&str> {
        self.cmdline_kind.map(|_| self.cmdline.as_str())
    }

    /// Feeds one physical keystroke through the mapping pipeline and, for
    /// whatever comes out the other end, the mode machine.
    pub fn on_input(&mut self, host: &mut dyn HostBridge, input: Input) -> EventOutcome {
        // Cmdline mode never goes through the mapping pipeline: every
        // character typed at `:`/`/`/`?` is literal.
        if self.mode.mode() == Mode::Cmdline {
            self.cmdline_input(host, input);
            return EventOutcome::Handled;
        }
        let map_mode = MapMode::for_mode(self.mode.mode());
        let buffered = self.pipeline.push(input);
        let lookup = if self.replaying {
            MapLookup::NoMatch
        } else {
            self.globals.borrow().mappings.lookup(map_mode, buffered)
        };
        match lookup {
            MapLookup::Prefix => EventOutcome::NeedsMoreInput,
            MapLookup::Match(expansion) => {
                self.pipeline.clear();
                self.feed(host, &expansion)
            }
            MapLookup::NoMatch => {
                let raw = self.pipeline.take();
                self.feed(host, &raw)
            }
        }
    }

    /// Called by the host when its mapping-timeout timer fires with no
    /// further key arriving.
    pub fn on_timeout(&mut self, host: &mut dyn HostBridge) -> EventOutcome {
        match self.pipeline.on_timeout() {
            PipelineOutcome::Undecided => EventOutcome::Handled,
            PipelineOutcome::Ready(expansion) => self.feed(host, &expansion),
            PipelineOutcome::Passthrough(raw) => self.feed(host, &raw),
        }
    }

    fn feed(&mut self, host: &mut dyn HostBridge, inputs: &[Input]) -> EventOutcome {
        for &input in inputs {
            if self.dispatch_one(host, input) == EventOutcome::Quit {
                return EventOutcome::Quit;
            }
        }
        EventOutcome::Handled
    }

    fn dispatch_one(&mut self, host: &mut dyn HostBridge, input: Input) -> EventOutcome {
        if !self.replaying
            && self.mode.mode() == Mode::Normal
            && !self.dot.is_recording()
            && !was_top_level_passive(input)
        {
            self.dot.start();
        }
        if self.dot.is_recording() {
            self.dot.push(input);
        }

        match self.mode.mode() {
            Mode::Normal => self.normal_input(host, input),
            Mode::Insert => self.insert_input(host, input),
            Mode::Replace => self.replace_input(host, input),
            Mode::Visual(_) => self.visual_input(host, input),
            Mode::Cmdline => unreachable!("cmdline input handled in on_input"),
        }

        let now_top_level =
            self.mode.mode() == Mode::Normal && self.mode.in_top_level() && self.mode.count().is_empty();
        if self.mode.mode() == Mode::Normal && now_top_level && self.dot.is_recording() {
            if self.mode.last_change_producing() {
                self.dot.commit();
            } else {
                self.dot.cancel();
            }
            self.mode.set_last_change_producing(false);
        }

        if self.pending_quit {
            self.pending_quit = false;
            return EventOutcome::Quit;
        }
        EventOutcome::Handled
    }

    // ---- Normal mode -----------------------------------------------

    fn normal_input(&mut self, host: &mut dyn HostBridge, input: Input) {
        if self.mode.sub_sub_mode() != SubSubMode::None {
            self.continue_sub_sub_mode(host, input);
            return;
        }
        match self.mode.sub_mode() {
            SubMode::None => self.top_level_normal(host, input),
            SubMode::Operator(op) => self.continue_operator(host, op, input),
            SubMode::Register => self.finish_register(input),
            SubMode::Mark(purpose) => self.finish_mark(host, purpose, input),
            SubMode::Goto => self.finish_goto(host, input),
            SubMode::Scroll => self.finish_scroll(host, input),
            SubMode::ReplaceChar => self.finish_replace_char(host, input),
            SubMode::TextObject(op) => self.finish_text_object(host, op, input),
        }
    }

    fn continue_sub_sub_mode(&mut self, host: &mut dyn HostBridge, input: Input) {
        if let SubSubMode::FindChar { till, forward } = self.mode.sub_sub_mode() {
            if let Some(c) = input_char(input) {
                self.mode.remember_find(c, till, forward);
                let motion = Motion::FindChar { target: c, till, forward };
                self.mode.enter_sub_sub_mode(SubSubMode::None);
                self.resolve_motion(host, motion);
            } else {
                self.mode.recover();
            }
        }
    }

    fn top_level_normal(&mut self, host: &mut dyn HostBridge, input: Input) {
        if self.z_pending {
            self.z_pending = false;
            match input.code {
                KeyCode::Char('Z') => {
                    let _ = host.write_file(None);
                    self.pending_quit = true;
                }
                KeyCode::Char('Q') => self.pending_quit = true,
                _ => {}
            }
            return;
        }
        if let KeyCode::Char(c) = input.code {
            if c.is_ascii_digit() && !(c == '0' && self.mode.count().is_empty()) {
                self.mode.count_mut().push_digit(false, c.to_digit(10).unwrap());
                return;
            }
        }
        if input.mods.ctrl {
            if let KeyCode::Char(c) = input.code {
                match c {
                    'r' => {
                        host.redo();
                        return;
                    }
                    'o' => {
                        let cur = host.cursor();
                        if let Some(p) = self.jumps.back(cur) {
                            host.set_cursor(p);
                        }
                        return;
                    }
                    'i' => {
                        if let Some(p) = self.jumps.forward() {
                            host.set_cursor(p);
                        }
                        return;
                    }
                    'v' => {
                        self.toggle_visual(host, VisualMode::Block);
                        return;
                    }
                    _ => {}
                }
            }
        }
        let count = self.mode.count().resolve();
        match input.code {
            KeyCode::Char('"') => self.mode.enter_sub_mode(SubMode::Register),
            KeyCode::Char('m') => self.mode.enter_sub_mode(SubMode::Mark(MarkPurpose::Set)),
            KeyCode::Char('`') => self.mode.enter_sub_mode(SubMode::Mark(MarkPurpose::Jump)),
            KeyCode::Char('\'') => self.mode.enter_sub_mode(SubMode::Mark(MarkPurpose::JumpLine)),
            KeyCode::Char('g') => self.mode.enter_sub_mode(SubMode::Goto),
            KeyCode::Char('z') => self.mode.enter_sub_mode(SubMode::Scroll),
            KeyCode::Char('r') => self.mode.enter_sub_mode(SubMode::ReplaceChar),
            KeyCode::Char('f') => {
                self.mode.enter_sub_sub_mode(SubSubMode::FindChar { till: false, forward: true })
            }
            KeyCode::Char('F') => {
                self.mode.enter_sub_sub_mode(SubSubMode::FindChar { till: false, forward: false })
            }
            KeyCode::Char('t') => {
                self.mode.enter_sub_sub_mode(SubSubMode::FindChar { till: true, forward: true })
            }
            KeyCode::Char('T') => {
                self.mode.enter_sub_sub_mode(SubSubMode::FindChar { till: true, forward: false })
            }
            KeyCode::Char(c) if operator_for_key(c).is_some() => {
                let op = operator_for_key(c).unwrap();
                self.mode.enter_sub_mode(SubMode::Operator(op));
            }
            KeyCode::Char('v') => self.toggle_visual(host, VisualMode::Char),
            KeyCode::Char('V') => self.toggle_visual(host, VisualMode::Line),
            KeyCode::Char('x') => self.run_delete_chars(host, count, false),
            KeyCode::Char('X') => self.run_delete_chars(host, count, true),
            KeyCode::Char('D') => self.run_to_eol_operator(host, Operator::Delete),
            KeyCode::Char('C') => self.run_to_eol_operator(host, Operator::Change),
            KeyCode::Char('Y') => self.run_linewise_self(host, Operator::Yank, count),
            KeyCode::Char('s') => self.run_delete_chars_then_insert(host, count),
            KeyCode::Char('S') => self.run_linewise_self(host, Operator::Change, count),
            KeyCode::Char('~') => self.swap_case_under_cursor(host, count),
            KeyCode::Char('p') => self.do_paste(host, true),
            KeyCode::Char('P') => self.do_paste(host, false),
            KeyCode::Char('J') => {
                self.open_block(host);
                let pos = join_lines(host, host.cursor().line, count.max(2) as usize, true);
                host.set_cursor(pos);
                self.close_block(host);
                self.mode.set_last_change_producing(true);
            }
            KeyCode::Char('u') => {
                host.undo();
                self.mode.reset();
            }
            KeyCode::Char('.') => self.replay_dot(host),
            KeyCode::Char('/') => self.enter_cmdline(host, CmdlineKind::Search { forward: true }),
            KeyCode::Char('?') => self.enter_cmdline(host, CmdlineKind::Search { forward: false }),
            KeyCode::Char('n') => self.repeat_search(host, false),
            KeyCode::Char('N') => self.repeat_search(host, true),
            KeyCode::Char('*') => self.search_word_under_cursor(host, true),
            KeyCode::Char('#') => self.search_word_under_cursor(host, false),
            KeyCode::Char(':') => self.enter_cmdline(host, CmdlineKind::Ex),
            KeyCode::Char('i') => {
                self.open_block(host);
                self.mode.set_mode(Mode::Insert);
            }
            KeyCode::Char('I') => {
                self.open_block(host);
                let pos = motion_target(host, Motion::LineFirstNonBlank, host.cursor(), 1, false);
                host.set_cursor(pos);
                self.mode.set_mode(Mode::Insert);
            }
            KeyCode::Char('a') => {
                self.open_block(host);
                let cur = host.cursor();
                let len = host.line_len(cur.line);
                host.set_cursor(Position::new(cur.line, (cur.col + 1).min(len)));
                self.mode.set_mode(Mode::Insert);
            }
            KeyCode::Char('A') => {
                self.open_block(host);
                let cur = host.cursor();
                host.set_cursor(Position::new(cur.line, host.line_len(cur.line)));
                self.mode.set_mode(Mode::Insert);
            }
            KeyCode::Char('o') => {
                self.open_block(host);
                let cur = host.cursor();
                let pos = host.insert(Position::new(cur.line, host.line_len(cur.line)), "\n");
                host.set_cursor(pos);
                self.mode.set_mode(Mode::Insert);
            }
            KeyCode::Char('O') => {
                self.open_block(host);
                let cur = host.cursor();
                host.insert(Position::new(cur.line, 0), "\n");
                host.set_cursor(Position::new(cur.line, 0));
                self.mode.set_mode(Mode::Insert);
            }
            KeyCode::Char('R') => {
                self.open_block(host);
                self.mode.set_mode(Mode::Replace);
            }
            KeyCode::Char('Z') => self.z_pending = true,
            KeyCode::Esc => self.mode.reset(),
            _ => {
                if let Some(motion) = motion_for_key(input) {
                    self.resolve_motion(host, motion);
                }
            }
        }
    }

    fn run_delete_chars(&mut self, host: &mut dyn HostBridge, count: u32, backward: bool) {
        let Some(range) = self.delete_chars_range(host, count, backward) else {
            return;
        };
        self.run_operator(host, Operator::Delete, range);
    }

    fn delete_chars_range(&mut self, host: &mut dyn HostBridge, count: u32, backward: bool) -> Option<Range> {
        let cur = host.cursor();
        let target = if backward {
            motion_target(host, Motion::Left, cur, count, false)
        } else {
            motion_target(host, Motion::Right, cur, count.saturating_sub(1), false)
        };
        let range = if backward {
            Range::new(target, cur, RangeMode::Char)
        } else {
            Range::new(cur, Position::new(target.line, target.col + 1), RangeMode::Char)
        };
        if range.is_empty() {
            None
        } else {
            Some(range)
        }
    }

    /// `s` is `cl`: deleting under the cursor and dropping straight into
    /// Insert mode, so it goes through the `Change` operator (which
    /// `run_operator` already knows keeps the edit block open into the
    /// following insert session) rather than `Delete` followed by a
    /// separate mode switch.
    fn run_delete_chars_then_insert(&mut self, host: &mut dyn HostBridge, count: u32) {
        match self.delete_chars_range(host, count, false) {
            Some(range) => self.run_operator(host, Operator::Change, range),
            None => {
                self.open_block(host);
                self.mode.set_mode(Mode::Insert);
            }
        }
    }

    fn run_to_eol_operator(&mut self, host: &mut dyn HostBridge, op: Operator) {
        let cur = host.cursor();
        let end = Position::new(cur.line, host.line_len(cur.line));
        let range = Range::new(cur, end, RangeMode::Char);
        self.run_operator(host, op, range);
    }

    // ---- Operator-pending -------------------------------------------

    fn continue_operator(&mut self, host: &mut dyn HostBridge, op: Operator, input: Input) {
        if let KeyCode::Char(c) = input.code {
            if c.is_ascii_digit() && !(c == '0' && self.mode.count().is_empty()) {
                self.mode.count_mut().push_digit(true, c.to_digit(10).unwrap());
                return;
            }
        }
        if self.goto_pending {
            self.goto_pending = false;
            let motion = match input.code {
                KeyCode::Char('g') => Some(Motion::FileStart),
                KeyCode::Char('_') => Some(Motion::LineEnd),
                KeyCode::Char('e') => Some(Motion::WordBackward { big: false }),
                _ => None,
            };
            if let Some(motion) = motion {
                self.apply_pending_operator_motion(host, op, motion);
            } else {
                self.mode.recover();
            }
            return;
        }
        match input.code {
            KeyCode::Char('g') => {
                self.goto_pending = true;
                return;
            }
            KeyCode::Char('i') | KeyCode::Char('a') => {
                let kind = if input.code == KeyCode::Char('i') {
                    TextObjectKind::Inner
                } else {
                    TextObjectKind::Around
                };
                self.pending_text_object_kind = Some(kind);
                self.mode.enter_sub_mode(SubMode::TextObject(Some(op)));
                return;
            }
            KeyCode::Char('f') => {
                self.mode.enter_sub_sub_mode(SubSubMode::FindChar { till: false, forward: true });
                return;
            }
            KeyCode::Char('F') => {
                self.mode.enter_sub_sub_mode(SubSubMode::FindChar { till: false, forward: false });
                return;
            }
            KeyCode::Char('t') => {
                self.mode.enter_sub_sub_mode(SubSubMode::FindChar { till: true, forward: true });
                return;
            }
            KeyCode::Char('T') => {
                self.mode.enter_sub_sub_mode(SubSubMode::FindChar { till: true, forward: false });
                return;
            }
            KeyCode::Esc => {
                self.mode.recover();
                return;
            }
            _ => {}
        }
        // doubled operator key ("dd", "yy", "cc", ">>", ...) repeats the
        // operator linewise over `count` lines.
        if Some(op_char(op)) == input_char(input) {
            let count = self.mode.count().resolve();
            self.run_linewise_self(host, op, count);
            self.mode.clear_pending();
            return;
        }
        if let Some(motion) = motion_for_key(input) {
            self.apply_pending_operator_motion(host, op, motion);
        } else {
            self.mode.recover();
        }
    }

    fn apply_pending_operator_motion(&mut self, host: &mut dyn HostBridge, op: Operator, motion: Motion) {
        let Some(motion) = self.expand_repeat_find(motion) else {
            self.mode.recover();
            return;
        };
        let from = host.cursor();
        let count = self.mode.count().resolve();
        let to = motion_target(host, motion, from, count, false);
        let mut range = operator_range(motion, from, to);
        if op == Operator::Change && matches!(motion, Motion::WordForward { .. }) {
            range = adjust_cw(host, range, from);
        }
        self.mode.clear_pending();
        self.run_operator(host, op, range);
    }

    fn run_linewise_self(&mut self, host: &mut dyn HostBridge, op: Operator, count: u32) {
        let cur = host.cursor();
        let last_line = (cur.line + count.max(1) as usize - 1).min(host.line_count().saturating_sub(1));
        let range = Range::new(
            Position::new(cur.line, 0),
            Position::new(last_line, 0),
            RangeMode::Line,
        );
        self.run_operator(host, op, range);
    }

    fn run_operator(&mut self, host: &mut dyn HostBridge, op: Operator, range: Range) {
        if op == Operator::Filter {
            // `!motion` doesn't filter anything itself: it drops into
            // cmdline mode pre-filled with the range and a trailing `!`,
            // same as real vim, so the typed command becomes `:range!cmd`.
            self.mode.clear_pending();
            self.cmdline = format!("{},{}!", range.start.line + 1, range.end.line + 1);
            self.cmdline_kind = Some(CmdlineKind::Ex);
            self.mode.set_mode(Mode::Cmdline);
            return;
        }
        // `c` of a linewise range keeps the trailing newline instead of
        // swallowing the whole line, so the cursor lands on a blank line
        // ready for typed text rather than joining into the line below.
        let range = if op == Operator::Change && range.mode == RangeMode::Line {
            Range::new(range.start, range.end, RangeMode::LineExclusive)
        } else {
            range
        };
        self.open_block(host);
        let reg = self.take_register();
        let mut g = self.globals.borrow_mut();
        let settings = g.settings.clone();
        let pos = apply_operator(host, op, range, &mut g.registers, reg, &settings);
        drop(g);
        host.set_cursor(pos);
        self.mode.set_last_change_producing(op != Operator::Yank);
        if op == Operator::Change {
            self.mode.set_mode(Mode::Insert);
        } else {
            self.close_block(host);
        }
    }

    fn take_register(&mut self) -> Option<char> {
        self.pending_register.take()
    }

    // ---- Register / mark / goto / scroll / replace-char sub-modes ---

    fn finish_register(&mut self, input: Input) {
        if let Some(c) = input_char(input) {
            self.pending_register = Some(c);
        }
        self.mode.clear_pending();
    }

    fn finish_mark(&mut self, host: &mut dyn HostBridge, purpose: MarkPurpose, input: Input) {
        self.mode.clear_pending();
        let Some(c) = input_char(input) else {
            return;
        };
        match purpose {
            MarkPurpose::Set => self.marks.set(c, host.cursor()),
            MarkPurpose::Jump | MarkPurpose::JumpLine => {
                if let Some(mut target) = self.marks.get(c) {
                    if purpose == MarkPurpose::JumpLine {
                        target = motion_target(host, Motion::LineFirstNonBlank, target, 1, false);
                    }
                    self.jumps.push(host.cursor());
                    host.set_cursor(target);
                } else {
                    self.fail(host, EngineError::UnknownMark(c));
                }
            }
        }
    }

    fn finish_goto(&mut self, host: &mut dyn HostBridge, input: Input) {
        self.mode.clear_pending();
        let count = self.mode.count();
        match input.code {
            KeyCode::Char('g') => {
                let target = if count.is_empty() {
                    Motion::FileStart
                } else {
                    Motion::GotoLine
                };
                self.resolve_motion(host, target);
            }
            KeyCode::Char('_') => self.resolve_motion(host, Motion::LineEnd),
            KeyCode::Char('e') => self.resolve_motion(host, Motion::WordBackward { big: false }),
            KeyCode::Char('E') => self.resolve_motion(host, Motion::WordBackward { big: true }),
            KeyCode::Char('J') => {
                self.open_block(host);
                let pos = join_lines(host, host.cursor().line, 2, false);
                self.close_block(host);
                host.set_cursor(pos);
            }
            KeyCode::Char('u') => self.run_linewise_self(host, Operator::Lowercase, 1),
            KeyCode::Char('U') => self.run_linewise_self(host, Operator::Uppercase, 1),
            KeyCode::Char('~') => self.run_linewise_self(host, Operator::SwapCase, 1),
            KeyCode::Char('v') => self.restore_visual(host),
            KeyCode::Char('*') => self.search_word_under_cursor(host, true),
            KeyCode::Char('#') => self.search_word_under_cursor(host, false),
            _ => {}
        }
    }

    fn finish_scroll(&mut self, _host: &mut dyn HostBridge, _input: Input) {
        // `zz`/`zt`/`zb` reposition the viewport; `HostBridge` exposes no
        // scroll/viewport API, so this is a documented no-op until one
        // is added.
        self.mode.clear_pending();
    }

    fn finish_replace_char(&mut self, host: &mut dyn HostBridge, input: Input) {
        self.mode.clear_pending();
        let Some(c) = input_char(input) else {
            self.mode.recover();
            return;
        };
        let count = self.mode.count().resolve() as usize;
        let cur = host.cursor();
        let len = host.line_len(cur.line);
        if cur.col + count > len {
            return;
        }
        let range = Range::new(cur, Position::new(cur.line, cur.col + count), RangeMode::Char);
        let replacement = c.to_string().repeat(count);
        self.open_block(host);
        let pos = host.replace_range(range, &replacement);
        self.close_block(host);
        host.set_cursor(Position::new(pos.line, pos.col.saturating_sub(1)));
        self.mode.set_last_change_producing(true);
    }

    fn finish_text_object(&mut self, host: &mut dyn HostBridge, op: Option<Operator>, input: Input) {
        self.mode.clear_pending();
        let Some(kind) = self.pending_text_object_kind.take() else {
            return;
        };
        let Some(object) = text_object_for_key(input) else {
            return;
        };
        let cur = host.cursor();
        let Some(range) = text_object_range(host, cur, object, kind) else {
            return;
        };
        match op {
            Some(op) => self.run_operator(host, op, range),
            None => self.visual_apply_range(host, range, VisualMode::Char, None),
        }
    }

    // ---- Motion resolution -------------------------------------------

    fn resolve_motion(&mut self, host: &mut dyn HostBridge, motion: Motion) {
        let Some(motion) = self.expand_repeat_find(motion) else {
            self.mode.clear_pending();
            return;
        };
        if motion.is_jump() {
            self.jumps.push(host.cursor());
        }
        let cur = host.cursor();
        let count = self.mode.count().resolve();
        let pos = motion_target(host, motion, cur, count, false);
        host.set_cursor(pos);
        self.mode.clear_pending();
    }

    /// `;`/`,` carry no character of their own; they repeat whatever
    /// `f`/`F`/`t`/`T` last found, `,` reversing the direction. Resolves
    /// to `None` if no find has happened yet this buffer's lifetime.
    fn expand_repeat_find(&self, motion: Motion) -> Option<Motion> {
        match motion {
            Motion::RepeatFind { reversed } => {
                let (target, till, forward) = self.mode.last_find()?;
                let forward = if reversed { !forward } else { forward };
                Some(Motion::FindChar { target, till, forward })
            }
            other => Some(other),
        }
    }

    /// Bare `~`/`n~` swaps case and advances the cursor past what it swapped
    /// (unlike `g~`/visual `~`, which behave like ordinary operators and
    /// land on the range start) so that repeated single presses sweep
    /// forward one character at a time, matching `n~` applied as one call —
    /// the idempotent-operator invariant in spec.md §8 depends on this.
    fn swap_case_under_cursor(&mut self, host: &mut dyn HostBridge, count: u32) {
        let cur = host.cursor();
        let end = motion_target(host, Motion::Right, cur, count.max(1), true);
        let target_col = end.col.max(cur.col + 1);
        let range = Range::new(cur, Position::new(end.line, target_col), RangeMode::Char);
        self.run_operator(host, Operator::SwapCase, range);
        let len = host.line_len(cur.line);
        host.set_cursor(Position::new(cur.line, target_col.min(len.saturating_sub(1))));
    }

    fn do_paste(&mut self, host: &mut dyn HostBridge, after: bool) {
        let reg_name = self.take_register();
        let reg = if matches!(reg_name, Some('+') | Some('*')) {
            match host.get_clipboard() {
                Some((text, mode)) => Register { text, mode },
                None => return,
            }
        } else {
            self.globals.borrow().registers.get(reg_name)
        };
        if reg.text.is_empty() {
            return;
        }
        self.open_block(host);
        let pos = paste_register(host, host.cursor(), &reg, after);
        self.close_block(host);
        host.set_cursor(pos);
        self.mode.set_last_change_producing(true);
    }

    fn replay_dot(&mut self, host: &mut dyn HostBridge) {
        if !self.dot.has_recorded() {
            return;
        }
        let count = self.mode.count();
        let override_count = if count.is_empty() { None } else { Some(count.resolve()) };
        let inputs = self.dot.replay(override_count);
        self.mode.reset();
        self.replaying = true;
        for input in inputs {
            self.dispatch_one(host, input);
        }
        self.replaying = false;
    }

    // ---- Search --------------------------------------------------

    fn repeat_search(&mut self, host: &mut dyn HostBridge, reversed: bool) {
        let Some(direction) = self.search.repeat_direction(reversed) else {
            return;
        };
        let Some(needle) = self.search.last_needle.clone() else {
            return;
        };
        self.run_search(host, &needle, direction);
    }

    fn search_word_under_cursor(&mut self, host: &mut dyn HostBridge, forward: bool) {
        let cur = host.cursor();
        let chars: Vec<char> = host.line(cur.line).chars().collect();
        if chars.is_empty() {
            return;
        }
        let col = cur.col.min(chars.len() - 1);
        if !chars[col].is_alphanumeric() && chars[col] != '_' {
            return;
        }
        let mut start = col;
        while start > 0 && (chars[start - 1].is_alphanumeric() || chars[start - 1] == '_') {
            start -= 1;
        }
        let mut end = col;
        while end + 1 < chars.len() && (chars[end + 1].is_alphanumeric() || chars[end + 1] == '_') {
            end += 1;
        }
        let word: String = chars[start..=end].iter().collect();
        let pattern = word_under_cursor_pattern(&word);
        let direction = if forward { SearchDirection::Forward } else { SearchDirection::Backward };
        self.run_search(host, &pattern, direction);
    }

    fn run_search(&mut self, host: &mut dyn HostBridge, needle: &str, direction: SearchDirection) {
        let (ignorecase, smartcase, wrapscan) = {
            let g = self.globals.borrow();
            (
                g.settings.get_bool("ignorecase"),
                g.settings.get_bool("smartcase"),
                g.settings.get_bool("wrapscan"),
            )
        };
        match search(host, needle, host.cursor(), direction, ignorecase, smartcase, wrapscan) {
            Ok((pos, _wrapped)) => {
                self.jumps.push(host.cursor());
                host.set_cursor(pos);
                self.search.set_last(needle.to_string(), direction);
            }
            Err(_) => self.fail(host, EngineError::PatternNotFound(needle.to_string())),
        }
    }

    // ---- Cmdline ---------------------------------------------------

    fn enter_cmdline(&mut self, _host: &mut dyn HostBridge, kind: CmdlineKind) {
        self.cmdline.clear();
        self.cmdline_kind = Some(kind);
        self.mode.set_mode(Mode::Cmdline);
    }

    fn cmdline_input(&mut self, host: &mut dyn HostBridge, input: Input) {
        match input.code {
            KeyCode::Enter => {
                let kind = self.cmdline_kind.take().unwrap_or(CmdlineKind::Ex);
                let line = std::mem::take(&mut self.cmdline);
                self.mode.set_mode(Mode::Normal);
                match kind {
                    CmdlineKind::Ex => self.execute_ex_line(host, &line),
                    CmdlineKind::Search { forward } => {
                        if !line.is_empty() {
                            let direction = if forward {
                                SearchDirection::Forward
                            } else {
                                SearchDirection::Backward
                            };
                            self.run_search(host, &line, direction);
                        }
                    }
                }
            }
            KeyCode::Esc => {
                self.cmdline.clear();
                self.cmdline_kind = None;
                self.mode.set_mode(Mode::Normal);
            }
            KeyCode::Backspace => {
                if self.cmdline.pop().is_none() {
                    self.cmdline_kind = None;
                    self.mode.set_mode(Mode::Normal);
                }
            }
            KeyCode::Char(c) => self.cmdline.push(c),
            _ => {}
        }
    }

    /// Parses and runs one ex command line (without the leading `:`),
    /// recording it to `:history` first exactly as Vim does even if it
    /// turns out to be invalid.
    fn execute_ex_line(&mut self, host: &mut dyn HostBridge, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        self.globals.borrow_mut().record_history(line);
        let script = match vimscript::Script::parse(line) {
            Ok(script) => script,
            Err(e) => {
                self.fail(host, EngineError::Script(e));
                return;
            }
        };
        for script_line in &script.lines {
            let cmd = parse_line(script_line);
            self.execute_ex_command(host, &cmd);
        }
    }

    fn execute_ex_command(&mut self, host: &mut dyn HostBridge, cmd: &ExCommand) {
        if let Err(e) = self.dispatch_ex(host, cmd) {
            self.fail(host, e);
        }
    }

    fn resolve_range(&self, host: &dyn HostBridge, range: &ExRange) -> (usize, usize) {
        let current = host.cursor().line;
        let last = host.line_count().saturating_sub(1);
        let resolve_addr = |addr: &Option<RangeAddress>| -> Option<RangeAddress> {
            match addr {
                Some(RangeAddress::Mark(c)) => Some(
                    self.marks
                        .get(*c)
                        .map(|p| RangeAddress::Line(p.line + 1))
                        .unwrap_or(RangeAddress::Line(current + 1)),
                ),
                other => other.clone(),
            }
        };
        let resolved = ExRange {
            start: resolve_addr(&range.start),
            end: resolve_addr(&range.end),
        };
        resolved.resolve(current, last)
    }

    fn dispatch_ex(&mut self, host: &mut dyn HostBridge, cmd: &ExCommand) -> Result<(), EngineError> {
        if is_bare_goto(cmd) {
            let last = host.line_count().saturating_sub(1);
            let pos = bare_goto_target(cmd, host.cursor().line, last);
            host.set_cursor(pos);
            return Ok(());
        }
        let (first, last) = self.resolve_range(host, &cmd.range);
        if cmd.matches("s", "substitute") || cmd.cmd == "s" {
            let args = cmd.args.trim();
            let bare = args.chars().next().map(|c| c.is_alphanumeric()).unwrap_or(true);
            let mut sub = if bare {
                let mut sub = self
                    .last_substitution
                    .clone()
                    .ok_or(ExError::NoPreviousSubstitution)?;
                apply_substitution_flags(&mut sub, args);
                sub
            } else {
                let sub = parse_substitution(&cmd.args)?;
                let gdefault = self.globals.borrow().settings.get_bool("gdefault");
                let mut sub = sub;
                if gdefault {
                    sub.global = !sub.global;
                }
                sub
            };
            let (ignorecase, smartcase) = {
                let g = self.globals.borrow();
                (g.settings.get_bool("ignorecase"), g.settings.get_bool("smartcase"))
            };
            substitute_range(host, (first, last), &sub, ignorecase, smartcase)?;
            self.last_substitution = Some(sub);
            return Ok(());
        }
        if cmd.cmd.is_empty() && !cmd.bang && cmd.args.starts_with('&') {
            let keep_flags = cmd.args.starts_with("&&");
            let flags = cmd.args.trim_start_matches('&');
            let mut sub = self
                .last_substitution
                .clone()
                .ok_or(ExError::NoPreviousSubstitution)?;
            if !keep_flags {
                sub.global = false;
                sub.confirm = false;
                sub.ignore_case = None;
            }
            apply_substitution_flags(&mut sub, flags);
            let (ignorecase, smartcase) = {
                let g = self.globals.borrow();
                (g.settings.get_bool("ignorecase"), g.settings.get_bool("smartcase"))
            };
            substitute_range(host, (first, last), &sub, ignorecase, smartcase)?;
            self.last_substitution = Some(sub);
            return Ok(());
        }
        if cmd.matches("d", "delete") {
            let range = Range::new(Position::new(first, 0), Position::new(last, 0), RangeMode::Line);
            let reg = cmd.args.trim().chars().next();
            self.open_block(host);
            let mut g = self.globals.borrow_mut();
            let settings = g.settings.clone();
            let pos = apply_operator(host, Operator::Delete, range, &mut g.registers, reg, &settings);
            drop(g);
            self.close_block(host);
            host.set_cursor(pos);
            return Ok(());
        }
        if cmd.matches("y", "yank") {
            let range = Range::new(Position::new(first, 0), Position::new(last, 0), RangeMode::Line);
            let reg = cmd.args.trim().chars().next();
            let mut g = self.globals.borrow_mut();
            let settings = g.settings.clone();
            apply_operator(host, Operator::Yank, range, &mut g.registers, reg, &settings);
            return Ok(());
        }
        if cmd.matches("normal", "normal") || cmd.matches("norm", "normal") {
            let was = self.replaying;
            self.replaying = true;
            for input in crate::input::Inputs::parse(cmd.args.trim_start_matches(' ')).0 {
                self.dispatch_one(host, input);
            }
            self.replaying = was;
            return Ok(());
        }
        if cmd.matches("se", "set") {
            for token in cmd.args.split_whitespace() {
                let msg = self.globals.borrow_mut().settings.apply(token)?;
                if let Some(msg) = msg {
                    host.show_message(Message::info(msg));
                }
            }
            return Ok(());
        }
        if cmd.matches("reg", "registers") || cmd.matches("di", "display") {
            let names: Vec<char> = cmd.args.chars().filter(|c| !c.is_whitespace()).collect();
            let g = self.globals.borrow();
            host.show_message(Message::info(registers_listing(&g.registers, &names)));
            return Ok(());
        }
        if cmd.matches("his", "history") {
            let g = self.globals.borrow();
            host.show_message(Message::info(g.history.join("\n")));
            return Ok(());
        }
        if cmd.matches("ma", "map") || cmd.matches("nn", "nnoremap") || cmd.matches("no", "noremap")
            || cmd.matches("vn", "vnoremap") || cmd.matches("ino", "inoremap")
        {
            self.define_map(cmd);
            return Ok(());
        }
        if cmd.matches("unm", "unmap") {
            self.undefine_map(cmd);
            return Ok(());
        }
        if cmd.matches("w", "write") {
            let path = Some(cmd.args.trim()).filter(|s| !s.is_empty());
            host.write_file(path)?;
            return Ok(());
        }
        if cmd.matches("r", "read") {
            let at = Position::new(last, 0);
            host.read_file(cmd.args.trim(), at)?;
            return Ok(());
        }
        // `:!cmd` and `:range!cmd` tokenize with an empty command name and
        // `bang` set (the `!` is consumed as the bang marker, not part of
        // `cmd.cmd`, since it leads the line rather than trailing a name).
        if cmd.cmd.is_empty() && cmd.bang {
            let command = cmd.args.trim();
            if cmd.range.start.is_some() {
                let input: String = (first..=last).map(|l| host.line(l) + "\n").collect();
                let out = host.run_shell(command, Some(&input))?;
                let range = Range::new(Position::new(first, 0), Position::new(last, 0), RangeMode::Line);
                self.open_block(host);
                let pos = host.replace_range(range, &out);
                self.close_block(host);
                host.set_cursor(pos);
            } else {
                let out = host.run_shell(command, None)?;
                host.show_message(Message::info(normalize_shell_output(&out)));
            }
            return Ok(());
        }
        if cmd.matches("so", "source") {
            let path = cmd.args.trim();
            let contents = std::fs::read_to_string(path)?;
            // Handed to `vimscript::Script::parse` whole, not line by line:
            // a `function`...`endfunction` block spans multiple physical
            // lines, and the parser's skip-to-`endfunction` logic only
            // sees that span when it gets the whole script at once.
            self.execute_ex_line(host, &contents);
            return Ok(());
        }
        if cmd.matches("noh", "nohlsearch") {
            self.search.highlight = false;
            return Ok(());
        }
        if cmd.matches("red", "redo") {
            host.redo();
            return Ok(());
        }
        if cmd.matches("ec", "echo") {
            let evaluated = vimscript::eval(cmd.args.trim())?;
            host.show_message(Message::info(evaluated.display()));
            return Ok(());
        }
        if cmd.matches("q", "quit") || cmd.matches("qa", "qall") {
            self.pending_quit = true;
            return Ok(());
        }
        if cmd.matches("wq", "wq") || cmd.cmd == "x" || cmd.matches("xa", "xall") {
            host.write_file(None)?;
            self.pending_quit = true;
            return Ok(());
        }
        Err(EngineError::Ex(crate::ex::ExError::UnknownCommand(cmd.cmd.clone())))
    }

    fn define_map(&mut self, cmd: &ExCommand) {
        let mut parts = cmd.args.splitn(2, char::is_whitespace);
        let Some(lhs) = parts.next() else { return };
        let rhs = parts.next().unwrap_or("").trim_start();
        let recursive = cmd.matches("ma", "map") && cmd.cmd == "map";
        let mode = if cmd.matches("vn", "vnoremap") {
            MapMode::Visual
        } else if cmd.matches("ino", "inoremap") {
            MapMode::Insert
        } else {
            MapMode::Normal
        };
        let mut g = self.globals.borrow_mut();
        g.mappings.map(
            mode,
            crate::input::Inputs::parse(lhs).0,
            crate::input::Inputs::parse(rhs).0,
            recursive,
        );
    }

    fn undefine_map(&mut self, cmd: &ExCommand) {
        let lhs = crate::input::Inputs::parse(cmd.args.trim());
        self.globals.borrow_mut().mappings.unmap(MapMode::Normal, &lhs.0);
    }

    fn fail(&mut self, host: &mut dyn HostBridge, err: EngineError) {
        host.show_message(err.message());
        self.mode.recover();
        self.dot.cancel();
        self.close_block(host);
    }

    // ---- Visual mode -------------------------------------------------

    fn toggle_visual(&mut self, host: &mut dyn HostBridge, vmode: VisualMode) {
        if self.mode.mode() == Mode::Visual(vmode) {
            self.exit_visual(host);
            return;
        }
        if matches!(self.mode.mode(), Mode::Visual(_)) {
            self.mode.set_mode(Mode::Visual(vmode));
            return;
        }
        self.visual_anchor = host.cursor();
        self.mode.set_mode(Mode::Visual(vmode));
    }

    fn exit_visual(&mut self, host: &mut dyn HostBridge) {
        if let Mode::Visual(v) = self.mode.mode() {
            self.last_visual_mode = Some(v);
            self.marks.set('<', self.visual_anchor.min(host.cursor()));
            self.marks.set('>', self.visual_anchor.max(host.cursor()));
        }
        self.mode.set_mode(Mode::Normal);
    }

    fn restore_visual(&mut self, host: &mut dyn HostBridge) {
        let Some(vmode) = self.last_visual_mode else { return };
        if let (Some(a), Some(b)) = (self.marks.get('<'), self.marks.get('>')) {
            self.visual_anchor = a;
            host.set_cursor(b);
            self.mode.set_mode(Mode::Visual(vmode));
        }
    }

    fn visual_input(&mut self, host: &mut dyn HostBridge, input: Input) {
        let Mode::Visual(vmode) = self.mode.mode() else { return };
        if self.mode.sub_sub_mode() != SubSubMode::None {
            self.continue_sub_sub_mode(host, input);
            return;
        }
        if let SubMode::TextObject(_) = self.mode.sub_mode() {
            self.finish_text_object(host, None, input);
            return;
        }
        if let SubMode::Register = self.mode.sub_mode() {
            self.finish_register(input);
            return;
        }
        if let KeyCode::Char(c) = input.code {
            if c.is_ascii_digit() && !(c == '0' && self.mode.count().is_empty()) {
                self.mode.count_mut().push_digit(false, c.to_digit(10).unwrap());
                return;
            }
        }
        match input.code {
            KeyCode::Esc => self.exit_visual(host),
            KeyCode::Char('"') => self.mode.enter_sub_mode(SubMode::Register),
            KeyCode::Char('v') => self.toggle_visual(host, VisualMode::Char),
            KeyCode::Char('V') => self.toggle_visual(host, VisualMode::Line),
            KeyCode::Char('o') => {
                let cur = host.cursor();
                host.set_cursor(self.visual_anchor);
                self.visual_anchor = cur;
            }
            KeyCode::Char('i') | KeyCode::Char('a') => {
                let kind = if input.code == KeyCode::Char('i') {
                    TextObjectKind::Inner
                } else {
                    TextObjectKind::Around
                };
                self.pending_text_object_kind = Some(kind);
                self.mode.enter_sub_mode(SubMode::TextObject(None));
            }
            KeyCode::Char('d') | KeyCode::Char('x') => self.visual_apply(host, Operator::Delete),
            KeyCode::Char('y') => self.visual_apply(host, Operator::Yank),
            KeyCode::Char('c') | KeyCode::Char('s') => self.visual_apply(host, Operator::Change),
            KeyCode::Char('>') => self.visual_apply(host, Operator::Indent),
            KeyCode::Char('<') => self.visual_apply(host, Operator::Outdent),
            KeyCode::Char('u') => self.visual_apply(host, Operator::Lowercase),
            KeyCode::Char('U') => self.visual_apply(host, Operator::Uppercase),
            KeyCode::Char('~') => self.visual_apply(host, Operator::SwapCase),
            KeyCode::Char('J') => {
                let range = visual_range(self.visual_anchor, host.cursor(), vmode);
                let lines = range.end.line.saturating_sub(range.start.line).max(1);
                self.open_block(host);
                let pos = join_lines(host, range.start.line, lines + 1, true);
                self.close_block(host);
                host.set_cursor(pos);
                self.exit_visual(host);
            }
            KeyCode::Char('r') => self.mode.enter_sub_mode(SubMode::ReplaceChar),
            KeyCode::Char(':') => {
                self.exit_visual(host);
                self.cmdline = "'<,'>".to_string();
                self.cmdline_kind = Some(CmdlineKind::Ex);
                self.mode.set_mode(Mode::Cmdline);
            }
            _ => {
                if self.mode.sub_mode() == SubMode::ReplaceChar {
                    self.visual_replace_char(host, input);
                    return;
                }
                if let Some(motion) = motion_for_key(input).and_then(|m| self.expand_repeat_find(m)) {
                    let count = self.mode.count().resolve();
                    let cur = host.cursor();
                    let pos = motion_target(host, motion, cur, count, true);
                    host.set_cursor(pos);
                    self.mode.count_mut().reset();
                }
            }
        }
    }

    fn visual_apply(&mut self, host: &mut dyn HostBridge, op: Operator) {
        let Mode::Visual(vmode) = self.mode.mode() else { return };
        let range = visual_range(self.visual_anchor, host.cursor(), vmode);
        self.visual_apply_range(host, range, vmode, Some(op));
    }

    fn visual_apply_range(
        &mut self,
        host: &mut dyn HostBridge,
        range: Range,
        vmode: VisualMode,
        op: Option<Operator>,
    ) {
        let _ = vmode;
        self.exit_visual(host);
        if let Some(op) = op {
            self.run_operator(host, op, range);
        }
    }

    fn visual_replace_char(&mut self, host: &mut dyn HostBridge, input: Input) {
        self.mode.clear_pending();
        let Some(c) = input_char(input) else { return };
        let Mode::Visual(vmode) = self.mode.mode() else { return };
        let range = visual_range(self.visual_anchor, host.cursor(), vmode);
        let n = captured_char_count(host, range);
        let replacement = c.to_string().repeat(n);
        self.open_block(host);
        let pos = host.replace_range(range, &replacement);
        self.close_block(host);
        self.exit_visual(host);
        host.set_cursor(pos);
        self.mode.set_last_change_producing(true);
    }

    // ---- Insert / Replace mode ---------------------------------------

    fn insert_input(&mut self, host: &mut dyn HostBridge, input: Input) {
        match input.code {
            KeyCode::Esc => {
                let cur = host.cursor();
                host.set_cursor(Position::new(cur.line, cur.col.saturating_sub(1)));
                self.mode.set_mode(Mode::Normal);
                self.mode.set_last_change_producing(true);
                self.close_block(host);
            }
            KeyCode::Backspace => self.backspace(host),
            KeyCode::Enter => {
                let cur = host.cursor();
                let pos = host.insert(cur, "\n");
                host.set_cursor(pos);
            }
            KeyCode::Tab => {
                let cur = host.cursor();
                let pos = host.insert(cur, "\t");
                host.set_cursor(pos);
            }
            KeyCode::Left | KeyCode::Right | KeyCode::Up | KeyCode::Down => self.move_arrow(host, input.code),
            KeyCode::Char(c) => {
                let cur = host.cursor();
                let pos = host.insert(cur, &c.to_string());
                host.set_cursor(pos);
            }
            _ => {}
        }
    }

    fn replace_input(&mut self, host: &mut dyn HostBridge, input: Input) {
        match input.code {
            KeyCode::Esc => {
                let cur = host.cursor();
                host.set_cursor(Position::new(cur.line, cur.col.saturating_sub(1)));
                self.mode.set_mode(Mode::Normal);
                self.mode.set_last_change_producing(true);
                self.close_block(host);
            }
            KeyCode::Backspace => self.backspace(host),
            KeyCode::Char(c) => {
                let cur = host.cursor();
                let len = host.line_len(cur.line);
                let range = if cur.col < len {
                    Range::new(cur, Position::new(cur.line, cur.col + 1), RangeMode::Char)
                } else {
                    Range::new(cur, cur, RangeMode::Char)
                };
                let pos = host.replace_range(range, &c.to_string());
                host.set_cursor(pos);
            }
            KeyCode::Left | KeyCode::Right | KeyCode::Up | KeyCode::Down => self.move_arrow(host, input.code),
            _ => {}
        }
    }

    fn backspace(&mut self, host: &mut dyn HostBridge) {
        let cur = host.cursor();
        if cur.col == 0 {
            if cur.line == 0 {
                return;
            }
            let prev_len = host.line_len(cur.line - 1);
            host.delete_range(Range::new(
                Position::new(cur.line - 1, prev_len),
                Position::new(cur.line, 0),
                RangeMode::Char,
            ));
            host.set_cursor(Position::new(cur.line - 1, prev_len));
            return;
        }
        host.delete_range(Range::new(
            Position::new(cur.line, cur.col - 1),
            cur,
            RangeMode::Char,
        ));
        host.set_cursor(Position::new(cur.line, cur.col - 1));
    }

    fn move_arrow(&mut self, host: &mut dyn HostBridge, code: KeyCode) {
        let motion = match code {
            KeyCode::Left => Motion::Left,
            KeyCode::Right => Motion::Right,
            KeyCode::Up => Motion::Up,
            KeyCode::Down => Motion::Down,
            _ => return,
        };
        let cur = host.cursor();
        let pos = motion_target(host, motion, cur, 1, true);
        host.set_cursor(pos);
    }
}

fn was_top_level_passive(input: Input) -> bool {
    matches!(input.code, KeyCode::Char(c) if c.is_ascii_digit())
}

fn op_char(op: Operator) -> char {
    match op {
        Operator::Delete => 'd',
        Operator::Yank => 'y',
        Operator::Change => 'c',
        Operator::Indent => '>',
        Operator::Outdent => '<',
        Operator::FormatLines => 'q',
        Operator::SwapCase => 'g',
        Operator::Lowercase => 'u',
        Operator::Uppercase => 'U',
        Operator::Filter => '!',
    }
}

fn operator_for_key(c: char) -> Option<Operator> {
    match c {
        'd' => Some(Operator::Delete),
        'y' => Some(Operator::Yank),
        'c' => Some(Operator::Change),
        '>' => Some(Operator::Indent),
        '<' => Some(Operator::Outdent),
        '!' => Some(Operator::Filter),
        _ => None,
    }
}

fn input_char(input: Input) -> Option<char> {
    match input.code {
        KeyCode::Char(c) => Some(c),
        _ => None,
    }
}

fn motion_for_key(input: Input) -> Option<Motion> {
    if !input.mods.is_none() && !(input.mods.shift && !input.mods.ctrl && !input.mods.alt) {
        return None;
    }
    match input.code {
        KeyCode::Char('h') | KeyCode::Left => Some(Motion::Left),
        KeyCode::Char('l') | KeyCode::Right | KeyCode::Char(' ') => Some(Motion::Right),
        KeyCode::Char('k') | KeyCode::Up => Some(Motion::Up),
        KeyCode::Char('j') | KeyCode::Down => Some(Motion::Down),
        KeyCode::Char('0') => Some(Motion::LineStart),
        KeyCode::Char('^') => Some(Motion::LineFirstNonBlank),
        KeyCode::Char('$') | KeyCode::End => Some(Motion::LineEnd),
        KeyCode::Char('G') => Some(Motion::FileEnd),
        KeyCode::Char('w') => Some(Motion::WordForward { big: false }),
        KeyCode::Char('W') => Some(Motion::WordForward { big: true }),
        KeyCode::Char('e') => Some(Motion::WordForwardEnd { big: false }),
        KeyCode::Char('E') => Some(Motion::WordForwardEnd { big: true }),
        KeyCode::Char('b') => Some(Motion::WordBackward { big: false }),
        KeyCode::Char('B') => Some(Motion::WordBackward { big: true }),
        KeyCode::Char('{') => Some(Motion::ParagraphBackward),
        KeyCode::Char('}') => Some(Motion::ParagraphForward),
        KeyCode::Char('(') => Some(Motion::SentenceBackward),
        KeyCode::Char(')') => Some(Motion::SentenceForward),
        KeyCode::Char(';') => self_find_repeat(false),
        KeyCode::Char(',') => self_find_repeat(true),
        KeyCode::Char('%') => Some(Motion::MatchingBracket),
        _ => None,
    }
}

fn self_find_repeat(reversed: bool) -> Option<Motion> {
    Some(Motion::RepeatFind { reversed })
}

fn text_object_for_key(input: Input) -> Option<TextObject> {
    match input.code {
        KeyCode::Char('w') => Some(TextObject::Word { big: false }),
        KeyCode::Char('W') => Some(TextObject::Word { big: true }),
        KeyCode::Char('s') => Some(TextObject::Sentence),
        KeyCode::Char('p') => Some(TextObject::Paragraph),
        KeyCode::Char('"') | KeyCode::Char('\'') | KeyCode::Char('`') => input_char(input).map(TextObject::Quote),
        KeyCode::Char(c @ ('(' | ')' | 'b')) => Some(TextObject::Bracket(if c == 'b' { '(' } else { c })),
        KeyCode::Char(c @ ('{' | '}' | 'B')) => Some(TextObject::Bracket(if c == 'B' { '{' } else { c })),
        KeyCode::Char(c @ ('[' | ']')) => Some(TextObject::Bracket(c)),
        KeyCode::Char(c @ ('<' | '>')) => Some(TextObject::Bracket(c)),
        _ => None,
    }
}

fn adjust_cw(host: &dyn HostBridge, range: Range, from: Position) -> Range {
    // `cw` behaves like `ce` when the cursor starts on a non-blank: it
    // must not swallow the trailing whitespace `dw` would.
    let text: String = host.line(from.line).chars().skip(from.col).collect();
    if text.chars().next().map(|c| c.is_whitespace()).unwrap_or(true) {
        return range;
    }
    let trimmed = text.trim_end();
    let word_len = trimmed.chars().take_while(|c| !c.is_whitespace()).count();
    if word_len == 0 {
        return range;
    }
    Range::new(range.start, Position::new(from.line, from.col + word_len), RangeMode::Char)
}

fn visual_range(anchor: Position, cursor: Position, vmode: VisualMode) -> Range {
    match vmode {
        VisualMode::Char => {
            let (a, b) = if anchor <= cursor { (anchor, cursor) } else { (cursor, anchor) };
            Range::new(a, Position::new(b.line, b.col + 1), RangeMode::Char)
        }
        VisualMode::Line => {
            let (a, b) = if anchor.line <= cursor.line { (anchor, cursor) } else { (cursor, anchor) };
            Range::new(Position::new(a.line, 0), Position::new(b.line, 0), RangeMode::Line)
        }
        VisualMode::Block => {
            let (a, b) = if anchor <= cursor { (anchor, cursor) } else { (cursor, anchor) };
            Range::new(a, b, RangeMode::Block)
        }
    }
}

fn captured_char_count(host: &dyn HostBridge, range: Range) -> usize {
    if range.start.line == range.end.line {
        return range.end.col.saturating_sub(range.start.col);
    }
    let mut n = host.line_len(range.start.line).saturating_sub(range.start.col) + 1;
    for line in (range.start.line + 1)..range.end.line {
        n += host.line_len(line) + 1;
    }
    n += range.end.col;
    n
}

fn normalize_shell_output(out: &str) -> String {
    out.trim_end_matches('\n').to_string()
}
