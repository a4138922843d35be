//! The parts of the editing model that don't belong to the host: ranges,
//! registers, marks and the jump list. `RangeMode`'s three-variant
//! ordering (character, line, block) is kept stable since reordering
//! would break clipboard-format compatibility with real vim. Buffer/
//! cursor geometry is generalized to operate on `Position`s the host
//! resolves rather than a `Vec<Line>` the engine itself owns.

use std::collections::{HashMap, VecDeque};

/// A zero-based line/column location in the host's buffer. Columns count
/// `char`s, not grapheme clusters — grapheme-aware movement is explicitly
/// out of scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    pub line: usize,
    pub col: usize,
}

impl Position {
    pub const fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

/// Do not reorder the first three variants: numbered registers and the
/// `"` register store this discriminant verbatim so pasted text keeps the
/// shape it was yanked with, matching the original's clipboard-format
/// warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeMode {
    Char,
    Line,
    Block,
    /// A linewise span whose trailing newline is *not* part of the
    /// edit: `c`'s "change a linewise range" leaves one empty line
    /// rather than deleting the line break along with the text, per
    /// vim's own `cc`/`S`/`c}` behavior. Registers still treat it as
    /// linewise for paste purposes.
    LineExclusive,
    BlockAndTail,
}

/// A span over the host's text, normalized so `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub start: Position,
    pub end: Position,
    pub mode: RangeMode,
}

impl Range {
    pub fn new(a: Position, b: Position, mode: RangeMode) -> Self {
        let (start, end) = if a <= b { (a, b) } else { (b, a) };
        Self { start, end, mode }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A motion's effect on the character under the end position: whether the
/// character at `end` is included in an operator's span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inclusivity {
    Inclusive,
    Exclusive,
    Linewise,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Register {
    pub text: String,
    pub mode: RangeMode,
}

impl Default for RangeMode {
    fn default() -> Self {
        RangeMode::Char
    }
}

/// The full register file: the unnamed `"` register, the 26 named
/// registers `a`-`z` (uppercase appends instead of overwriting), the
/// read-only yank register `0`, the numbered delete history `1`-`9`, and
/// the small-delete register `-`.
#[derive(Debug, Default)]
pub struct Registers {
    unnamed: Register,
    named: HashMap<char, Register>,
    yank: Register,
    numbered: VecDeque<Register>,
    small_delete: Register,
}

impl Registers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a yank (`y`) or delete (`d`/`c`/`x`) into the unnamed
    /// register and, per the original's numbered-register rotation,
    /// into `"0` for yanks or `"1`-`"9` (FIFO) for multi-line deletes.
    /// A named register (lowercase overwrites, uppercase appends) takes
    /// the text instead of the unnamed register's usual slot when given.
    pub fn record(&mut self, name: Option<char>, reg: Register, is_delete: bool) {
        match name {
            Some(c) if c.is_ascii_uppercase() => {
                let lower = c.to_ascii_lowercase();
                let entry = self.named.entry(lower).or_default();
                entry.text.push_str(&reg.text);
                entry.mode = reg.mode;
                self.unnamed = self.named[&lower].clone();
                return;
            }
            Some(c) => {
                self.named.insert(c, reg.clone());
                self.unnamed = reg;
                return;
            }
            None => {}
        }
        self.unnamed = reg.clone();
        if is_delete {
            let multi_line = reg.mode == RangeMode::Line || reg.text.contains('\n');
            if multi_line {
                if self.numbered.len() == 9 {
                    self.numbered.pop_back();
                }
                self.numbered.push_front(reg);
            } else {
                self.small_delete = reg;
            }
        } else {
            self.yank = reg;
        }
    }

    /// Enumerates every non-empty register for `:registers`/`:display`,
    /// in the order Vim lists them: unnamed, numbered, named.
    pub fn listing(&self) -> Vec<(char, Register)> {
        let mut out = Vec::new();
        if !self.unnamed.text.is_empty() {
            out.push(('"', self.unnamed.clone()));
        }
        if !self.yank.text.is_empty() {
            out.push(('0', self.yank.clone()));
        }
        for (i, reg) in self.numbered.iter().enumerate() {
            if !reg.text.is_empty() {
                out.push((char::from_digit(i as u32 + 1, 10).unwrap(), reg.clone()));
            }
        }
        let mut named: Vec<_> = self.named.iter().filter(|(_, r)| !r.text.is_empty()).collect();
        named.sort_by_key(|(c, _)| **c);
        for (name, reg) in named {
            out.push((*name, reg.clone()));
        }
        out
    }

    pub fn get(&self, name: Option<char>) -> Register {
        match name {
            None | Some('"') => self.unnamed.clone(),
            Some('0') => self.yank.clone(),
            Some('-') => self.small_delete.clone(),
            Some(d) if d.is_ascii_digit() && d != '0' => {
                let idx = d.to_digit(10).unwrap() as usize - 1;
                self.numbered.get(idx).cloned().unwrap_or_default()
            }
            Some(c) => self
                .named
                .get(&c.to_ascii_lowercase())
                .cloned()
                .unwrap_or_default(),
        }
    }
}

/// `ma`/`` `a ``/`'a` marks, plus the automatically-maintained `<`/`>`
/// (last visual selection) and `` ` ``/`'` (position before the last jump).
#[derive(Debug, Default)]
pub struct Marks {
    table: HashMap<char, Position>,
}

impl Marks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: char, pos: Position) {
        self.table.insert(name, pos);
    }

    pub fn get(&self, name: char) -> Option<Position> {
        self.table.get(&name).copied()
    }
}

/// A bounded history of cursor positions visited via a "jump" motion
/// (`G`, search, `%`, marks, ...). `Ctrl-O`/`Ctrl-I` walk it.
#[derive(Debug, Default)]
pub struct JumpList {
    entries: Vec<Position>,
    cursor: usize,
}

const JUMP_LIST_CAP: usize = 100;

impl JumpList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, pos: Position) {
        self.entries.truncate(self.cursor);
        self.entries.retain(|p| *p != pos);
        self.entries.push(pos);
        if self.entries.len() > JUMP_LIST_CAP {
            self.entries.remove(0);
        }
        self.cursor = self.entries.len();
    }

    pub fn back(&mut self, from: Position) -> Option<Position> {
        if self.cursor == 0 {
            return None;
        }
        if self.cursor == self.entries.len() {
            self.entries.push(from);
        }
        self.cursor -= 1;
        self.entries.get(self.cursor).copied()
    }

    pub fn forward(&mut self) -> Option<Position> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        self.entries.get(self.cursor).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_normalizes_order() {
        let r = Range::new(Position::new(5, 0), Position::new(1, 0), RangeMode::Line);
        assert_eq!(r.start, Position::new(1, 0));
        assert_eq!(r.end, Position::new(5, 0));
    }

    #[test]
    fn uppercase_register_appends() {
        let mut regs = Registers::new();
        regs.record(
            Some('a'),
            Register {
                text: "one".into(),
                mode: RangeMode::Char,
            },
            false,
        );
        regs.record(
            Some('A'),
            Register {
                text: "two".into(),
                mode: RangeMode::Char,
            },
            false,
        );
        assert_eq!(regs.get(Some('a')).text, "onetwo");
    }

    #[test]
    fn yank_only_fills_register_zero() {
        let mut regs = Registers::new();
        regs.record(
            None,
            Register {
                text: "yanked".into(),
                mode: RangeMode::Char,
            },
            false,
        );
        assert_eq!(regs.get(Some('0')).text, "yanked");
        regs.record(
            None,
            Register {
                text: "line1\nline2\n".into(),
                mode: RangeMode::Line,
            },
            true,
        );
        assert_eq!(regs.get(Some('0')).text, "yanked");
        assert_eq!(regs.get(Some('1')).text, "line1\nline2\n");
    }

    #[test]
    fn jump_list_back_and_forward() {
        let mut jl = JumpList::new();
        jl.push(Position::new(0, 0));
        jl.push(Position::new(10, 0));
        let back = jl.back(Position::new(20, 0));
        assert_eq!(back, Some(Position::new(10, 0)));
        let back2 = jl.back(Position::new(20, 0));
        assert_eq!(back2, Some(Position::new(0, 0)));
        let fwd = jl.forward();
        assert_eq!(fwd, Some(Position::new(10, 0)));
    }
}
