//! `Mode`/`SubMode`/`SubSubMode`/`VisualMode` and the state machine that
//! threads them together, plus the pending-count accumulator. Grounded
//! in the shape of `core/src/keymap.rs`'s `State` enum (which
//! enumerates Normal/Insert/Visual/Operator/Cli) and `core/src/window.rs`'s
//! `WinMode`, generalized into a three-level mode/submode/sub-submode
//! split so that, e.g., "waiting for a find-char target while an
//! operator is pending" is representable without a combinatorial
//! blow-up of top-level variants.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualMode {
    Char,
    Line,
    Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Insert,
    Replace,
    Visual(VisualMode),
    Cmdline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Delete,
    Yank,
    Change,
    Indent,
    Outdent,
    FormatLines,
    SwapCase,
    Lowercase,
    Uppercase,
    Filter,
}

/// What the engine is waiting on before a top-level command is complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubMode {
    None,
    /// An operator (`d`, `y`, `c`, ...) awaiting its motion or text object.
    Operator(Operator),
    /// `"` awaiting a register name.
    Register,
    /// `` ` ``/`'`/`m` awaiting a mark name.
    Mark(MarkPurpose),
    /// `g` awaiting its second key (`gg`, `ge`, `gv`, ...).
    Goto,
    /// `z` awaiting its second key (`zz`, `zt`, `zb`).
    Scroll,
    /// `r` awaiting the single replacement character.
    ReplaceChar,
    /// A text object is pending (`i`/`a` seen after an operator or in
    /// visual mode), awaiting the object letter.
    TextObject(Option<Operator>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkPurpose {
    Set,
    Jump,
    JumpLine,
}

/// A second layer of waiting nested inside `SubMode::Operator` /
/// top-level Normal mode: `f`/`F`/`t`/`T` awaiting a target character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubSubMode {
    None,
    FindChar { till: bool, forward: bool },
}

/// `count1 count2`: an operator count and a motion count multiply;
/// either may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Count {
    operator: Option<u32>,
    motion: Option<u32>,
}

impl Count {
    pub fn push_digit(&mut self, in_motion_position: bool, digit: u32) {
        let slot = if in_motion_position {
            &mut self.motion
        } else {
            &mut self.operator
        };
        *slot = Some(slot.unwrap_or(0).saturating_mul(10).saturating_add(digit));
    }

    pub fn resolve(self) -> u32 {
        match (self.operator, self.motion) {
            (None, None) => 1,
            (Some(a), None) => a,
            (None, Some(b)) => b,
            (Some(a), Some(b)) => a.saturating_mul(b).max(1),
        }
    }

    pub fn is_empty(self) -> bool {
        self.operator.is_none() && self.motion.is_none()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Drives `Mode`/`SubMode`/`SubSubMode` transitions. Owns no buffer state
/// — only enough bookkeeping to know what key the engine is waiting for
/// next.
#[derive(Debug)]
pub struct ModeMachine {
    mode: Mode,
    sub_mode: SubMode,
    sub_sub_mode: SubSubMode,
    count: Count,
    last_find: Option<(char, bool, bool)>,
    last_change_producing: bool,
}

impl Default for ModeMachine {
    fn default() -> Self {
        Self {
            mode: Mode::Normal,
            sub_mode: SubMode::None,
            sub_sub_mode: SubSubMode::None,
            count: Count::default(),
            last_find: None,
            last_change_producing: false,
        }
    }
}

impl ModeMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn sub_mode(&self) -> SubMode {
        self.sub_mode
    }

    pub fn sub_sub_mode(&self) -> SubSubMode {
        self.sub_sub_mode
    }

    pub fn count(&self) -> Count {
        self.count
    }

    pub fn count_mut(&mut self) -> &mut Count {
        &mut self.count
    }

    pub fn in_top_level(&self) -> bool {
        self.sub_mode == SubMode::None && self.sub_sub_mode == SubSubMode::None
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
        self.sub_mode = SubMode::None;
        self.sub_sub_mode = SubSubMode::None;
        self.count.reset();
    }

    pub fn enter_sub_mode(&mut self, sub: SubMode) {
        self.sub_mode = sub;
    }

    pub fn enter_sub_sub_mode(&mut self, sub: SubSubMode) {
        self.sub_sub_mode = sub;
    }

    /// Clears only the innermost pending state, used once a find-char
    /// target or operator motion has been consumed, returning to Normal
    /// mode's top level without discarding the active `Mode`.
    pub fn clear_pending(&mut self) {
        self.sub_mode = SubMode::None;
        self.sub_sub_mode = SubSubMode::None;
        self.count.reset();
    }

    pub fn remember_find(&mut self, target: char, till: bool, forward: bool) {
        self.last_find = Some((target, till, forward));
    }

    pub fn last_find(&self) -> Option<(char, bool, bool)> {
        self.last_find
    }

    pub fn set_last_change_producing(&mut self, v: bool) {
        self.last_change_producing = v;
    }

    pub fn last_change_producing(&self) -> bool {
        self.last_change_producing
    }

    /// Called by the top-level dispatcher after any error bubbles out of
    /// a component, so a malformed command never leaves the engine stuck
    /// in a sub-mode.
    pub fn recover(&mut self) {
        self.clear_pending();
        if !matches!(self.mode, Mode::Insert | Mode::Replace) {
            self.mode = Mode::Normal;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_and_motion_counts_multiply() {
        let mut c = Count::default();
        c.push_digit(false, 2);
        c.push_digit(true, 3);
        assert_eq!(c.resolve(), 6);
    }

    #[test]
    fn absent_count_resolves_to_one() {
        assert_eq!(Count::default().resolve(), 1);
    }

    #[test]
    fn recover_never_leaves_a_pending_submode() {
        let mut m = ModeMachine::new();
        m.enter_sub_mode(SubMode::Operator(Operator::Delete));
        m.recover();
        assert!(m.in_top_level());
        assert_eq!(m.mode(), Mode::Normal);
    }

    #[test]
    fn recover_preserves_insert_mode() {
        let mut m = ModeMachine::new();
        m.set_mode(Mode::Insert);
        m.enter_sub_mode(SubMode::Goto);
        m.recover();
        assert_eq!(m.mode(), Mode::Insert);
        assert!(m.in_top_level());
    }
}
