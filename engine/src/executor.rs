//! Turns a resolved `Motion`/`TextObject`/`Operator` into host mutations.
//! This is the biggest single component, grounded in the *shape* of
//! `core/src/window.rs`'s `op` module (`delete()`/`yank()`/`replace()`
//! operation constructors) and `core/src/buffer.rs`'s character-level
//! primitives, generalized to drive a `HostBridge` instead of an owned
//! `Buffer`.

use crate::edit::{Inclusivity, Position, Range, RangeMode, Register, Registers};
use crate::host::HostBridge;
use crate::mode::Operator;
use crate::motion::{Motion, TextObject, TextObjectKind};
use crate::settings::Settings;

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn line_chars(host: &dyn HostBridge, line: usize) -> Vec<char> {
    host.line(line).chars().collect()
}

fn clamp_col(host: &dyn HostBridge, line: usize, col: usize, allow_past_end: bool) -> usize {
    let len = host.line_len(line);
    if len == 0 {
        0
    } else if allow_past_end {
        col.min(len)
    } else {
        col.min(len - 1)
    }
}

/// Computes where `motion`, applied `count` times from `pos`, lands.
/// Never panics regardless of how `pos` or `count` are out of range —
/// everything clamps to the buffer's actual extent.
pub fn motion_target(
    host: &dyn HostBridge,
    motion: Motion,
    pos: Position,
    count: u32,
    insert_mode: bool,
) -> Position {
    let last_line = host.line_count().saturating_sub(1);
    let count = count.max(1) as usize;
    match motion {
        Motion::Left => Position::new(pos.line, pos.col.saturating_sub(count)),
        Motion::Right => {
            let len = host.line_len(pos.line);
            let max = if insert_mode { len } else { len.saturating_sub(1) };
            Position::new(pos.line, (pos.col + count).min(max))
        }
        Motion::Up => {
            let line = pos.line.saturating_sub(count);
            Position::new(line, clamp_col(host, line, pos.col, insert_mode))
        }
        Motion::Down => {
            let line = (pos.line + count).min(last_line);
            Position::new(line, clamp_col(host, line, pos.col, insert_mode))
        }
        Motion::LineStart => Position::new(pos.line, 0),
        Motion::LineFirstNonBlank => {
            let chars = line_chars(host, pos.line);
            let col = chars.iter().position(|c| !c.is_whitespace()).unwrap_or(0);
            Position::new(pos.line, col)
        }
        Motion::LineEnd => {
            let len = host.line_len(pos.line);
            Position::new(pos.line, len.saturating_sub(1))
        }
        Motion::FileStart => Position::new(0, 0),
        Motion::FileEnd => {
            let line = last_line;
            Position::new(line, 0)
        }
        Motion::GotoLine => {
            let line = (count - 1).min(last_line);
            Position::new(line, 0)
        }
        Motion::WordForward { big } => word_forward(host, pos, count, big, false),
        Motion::WordForwardEnd { big } => word_forward(host, pos, count, big, true),
        Motion::WordBackward { big } => word_backward(host, pos, count, big),
        Motion::ParagraphForward => paragraph(host, pos, count, true),
        Motion::ParagraphBackward => paragraph(host, pos, count, false),
        Motion::SentenceForward => sentence(host, pos, count, true),
        Motion::SentenceBackward => sentence(host, pos, count, false),
        Motion::FindChar { target, till, forward } => find_char(host, pos, target, till, forward, count),
        // `;`/`,` are expanded into a concrete `FindChar` by the engine
        // (which alone remembers the last find) before this is reached.
        Motion::RepeatFind { .. } => pos,
        Motion::MatchingBracket => host.matching_bracket(pos).unwrap_or(pos),
        Motion::SearchNext { .. } => pos,
        Motion::Mark(_) | Motion::MarkLine(_) => pos,
    }
}

fn class(c: char, big: bool) -> u8 {
    if c.is_whitespace() {
        0
    } else if big {
        1
    } else if is_word_char(c) {
        1
    } else {
        2
    }
}

fn char_at(host: &dyn HostBridge, pos: Position) -> Option<char> {
    line_chars(host, pos.line).get(pos.col).copied()
}

/// One position forward in the buffer's char stream, wrapping to the
/// start of the next line at end-of-line; `None` at the very last
/// position of the buffer.
fn advance(host: &dyn HostBridge, pos: Position) -> Option<Position> {
    let len = host.line_len(pos.line);
    if pos.col + 1 < len {
        Some(Position::new(pos.line, pos.col + 1))
    } else if pos.line + 1 < host.line_count() {
        Some(Position::new(pos.line + 1, 0))
    } else {
        None
    }
}

/// One position back in the buffer's char stream; a zero-length previous
/// line is itself a valid stop (an empty line is its own "word" per Vim).
fn retreat(host: &dyn HostBridge, pos: Position) -> Option<Position> {
    if pos.col > 0 {
        Some(Position::new(pos.line, pos.col - 1))
    } else if pos.line > 0 {
        let prev_len = host.line_len(pos.line - 1);
        Some(Position::new(pos.line - 1, prev_len.saturating_sub(1)))
    } else {
        None
    }
}

fn word_forward(host: &dyn HostBridge, mut pos: Position, count: usize, big: bool, to_end: bool) -> Position {
    for _ in 0..count {
        pos = word_forward_once(host, pos, big, to_end);
    }
    pos
}

fn word_forward_once(host: &dyn HostBridge, pos: Position, big: bool, to_end: bool) -> Position {
    let mut p = pos;
    if to_end {
        p = match advance(host, p) {
            Some(n) => n,
            None => return p,
        };
        loop {
            match char_at(host, p) {
                Some(c) if class(c, big) != 0 => break,
                _ => match advance(host, p) {
                    Some(n) => p = n,
                    None => return p,
                },
            }
        }
        let start_class = class(char_at(host, p).expect("checked above"), big);
        loop {
            match advance(host, p) {
                Some(n) => match char_at(host, n) {
                    Some(c) if class(c, big) == start_class => p = n,
                    _ => break,
                },
                None => break,
            }
        }
        return p;
    }
    // skip the run of the character class currently under the cursor
    if let Some(c) = char_at(host, p) {
        let start_class = class(c, big);
        if start_class != 0 {
            loop {
                match advance(host, p) {
                    Some(n) => match char_at(host, n) {
                        Some(c2) if class(c2, big) == start_class => p = n,
                        _ => {
                            p = n;
                            break;
                        }
                    },
                    None => return p,
                }
            }
        } else {
            p = match advance(host, p) {
                Some(n) => n,
                None => return p,
            };
        }
    } else {
        p = match advance(host, p) {
            Some(n) => n,
            None => return p,
        };
    }
    // skip blanks up to the next non-blank stop (an empty line stops too)
    loop {
        match char_at(host, p) {
            Some(c) if class(c, big) != 0 => return p,
            Some(_) => {
                p = match advance(host, p) {
                    Some(n) => n,
                    None => return p,
                };
            }
            None => {
                if host.line_len(p.line) == 0 {
                    return p;
                }
                p = match advance(host, p) {
                    Some(n) => n,
                    None => return p,
                };
            }
        }
    }
}

fn word_backward(host: &dyn HostBridge, mut pos: Position, count: usize, big: bool) -> Position {
    for _ in 0..count {
        pos = word_backward_once(host, pos, big);
    }
    pos
}

fn word_backward_once(host: &dyn HostBridge, pos: Position, big: bool) -> Position {
    let mut p = match retreat(host, pos) {
        Some(n) => n,
        None => return Position::new(0, 0),
    };
    loop {
        match char_at(host, p) {
            Some(c) if class(c, big) == 0 => {
                p = match retreat(host, p) {
                    Some(n) => n,
                    None => return Position::new(0, 0),
                };
            }
            Some(_) => break,
            None => {
                if host.line_len(p.line) == 0 {
                    break;
                }
                p = match retreat(host, p) {
                    Some(n) => n,
                    None => return Position::new(0, 0),
                };
            }
        }
    }
    let Some(c) = char_at(host, p) else {
        return p;
    };
    let start_class = class(c, big);
    loop {
        match retreat(host, p) {
            Some(n) => match char_at(host, n) {
                Some(c2) if class(c2, big) == start_class => p = n,
                _ => break,
            },
            None => break,
        }
    }
    p
}

/// `f`/`F`/`t`/`T`, repeated `count` times; fails (leaving `pos`
/// untouched) if any of the `count` occurrences isn't found, matching
/// Vim's all-or-nothing repeat-count behavior for this motion.
fn find_char(host: &dyn HostBridge, pos: Position, target: char, till: bool, forward: bool, count: usize) -> Position {
    let mut p = pos;
    for _ in 0..count {
        match find_char_once(host, p, target, till, forward) {
            Some(n) => p = n,
            None => return pos,
        }
    }
    p
}

/// One `f`/`F`/`t`/`T` step. For `till`, starts the search one character
/// further out when the adjacent cell already holds `target`, so `;`
/// repeating a `t`/`T` advances to the *next* occurrence instead of
/// getting stuck one character away from the first.
fn find_char_once(host: &dyn HostBridge, pos: Position, target: char, till: bool, forward: bool) -> Option<Position> {
    let chars = line_chars(host, pos.line);
    if forward {
        let mut start = pos.col + 1;
        if till && chars.get(start) == Some(&target) {
            start += 1;
        }
        (start..chars.len())
            .find(|&i| chars[i] == target)
            .map(|i| Position::new(pos.line, if till { i - 1 } else { i }))
    } else {
        if pos.col == 0 {
            return None;
        }
        let mut start = pos.col - 1;
        if till && chars.get(start) == Some(&target) {
            start = start.checked_sub(1)?;
        }
        (0..=start)
            .rev()
            .find(|&i| chars[i] == target)
            .map(|i| Position::new(pos.line, if till { i + 1 } else { i }))
    }
}

/// `(`/`)`: a sentence ends at `.`/`!`/`?`, optionally followed by closing
/// quotes/brackets, then whitespace; the next sentence starts at the
/// first non-blank after that run. A blank line is a sentence (and
/// paragraph) boundary in its own right.
fn sentence(host: &dyn HostBridge, pos: Position, count: usize, forward: bool) -> Position {
    let mut p = pos;
    for _ in 0..count {
        p = sentence_once(host, p, forward).unwrap_or(p);
    }
    p
}

fn is_sentence_end(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

/// Char offsets within `line` where a new sentence begins.
fn sentence_starts(line: &str) -> Vec<usize> {
    let chars: Vec<char> = line.chars().collect();
    let mut starts = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if is_sentence_end(chars[i]) {
            let mut j = i + 1;
            while j < chars.len() && matches!(chars[j], ')' | ']' | '"' | '\'') {
                j += 1;
            }
            if j < chars.len() && chars[j].is_whitespace() {
                while j < chars.len() && chars[j].is_whitespace() {
                    j += 1;
                }
                if j < chars.len() {
                    starts.push(j);
                }
            }
            i = j;
        } else {
            i += 1;
        }
    }
    starts
}

fn sentence_once(host: &dyn HostBridge, pos: Position, forward: bool) -> Option<Position> {
    if forward {
        let mut line = pos.line;
        let mut after = pos.col;
        loop {
            let text = host.line(line);
            if let Some(next) = sentence_starts(&text).into_iter().find(|&s| s > after) {
                return Some(Position::new(line, next));
            }
            if line + 1 >= host.line_count() {
                return Some(Position::new(line, host.line_len(line).saturating_sub(1)));
            }
            line += 1;
            after = 0;
            if host.line_len(line) == 0 {
                return Some(Position::new(line, 0));
            }
        }
    } else {
        let mut line = pos.line;
        let mut before = pos.col;
        loop {
            let text = host.line(line);
            if let Some(prev) = sentence_starts(&text).into_iter().rev().find(|&s| s < before) {
                return Some(Position::new(line, prev));
            }
            if before > 0 {
                return Some(Position::new(line, 0));
            }
            if line == 0 {
                return Some(Position::new(0, 0));
            }
            line -= 1;
            if host.line_len(line) == 0 {
                return Some(Position::new(line, 0));
            }
            before = host.line_len(line);
        }
    }
}

fn paragraph(host: &dyn HostBridge, pos: Position, count: usize, forward: bool) -> Position {
    let last_line = host.line_count().saturating_sub(1);
    let mut line = pos.line;
    for _ in 0..count {
        loop {
            if forward {
                if line >= last_line {
                    break;
                }
                line += 1;
            } else {
                if line == 0 {
                    break;
                }
                line -= 1;
            }
            if host.line_len(line) == 0 {
                break;
            }
            if !forward && line == 0 {
                break;
            }
            if forward && line == last_line {
                break;
            }
        }
    }
    Position::new(line, 0)
}

/// The span an operator acts on for a completed motion: a linewise
/// motion (or one whose `Motion::inclusivity` says so) promotes the
/// operator to whole lines, and an inclusive character motion extends
/// the end by one column.
pub fn operator_range(motion: Motion, from: Position, to: Position) -> Range {
    let (start, end) = if from <= to { (from, to) } else { (to, from) };
    match motion.inclusivity() {
        Inclusivity::Linewise => Range::new(
            Position::new(start.line, 0),
            Position::new(end.line, 0),
            RangeMode::Line,
        ),
        Inclusivity::Inclusive => {
            Range::new(start, Position::new(end.line, end.col + 1), RangeMode::Char)
        }
        Inclusivity::Exclusive => Range::new(start, end, RangeMode::Char),
    }
}

pub fn text_object_range(
    host: &dyn HostBridge,
    pos: Position,
    object: TextObject,
    kind: TextObjectKind,
) -> Option<Range> {
    match object {
        TextObject::Word { big } => {
            let chars = line_chars(host, pos.line);
            if chars.is_empty() {
                return Some(Range::new(pos, pos, RangeMode::Char));
            }
            let col = pos.col.min(chars.len() - 1);
            let target_class = class(chars[col], big);
            let mut start = col;
            while start > 0 && class(chars[start - 1], big) == target_class {
                start -= 1;
            }
            let mut end = col;
            while end + 1 < chars.len() && class(chars[end + 1], big) == target_class {
                end += 1;
            }
            if kind == TextObjectKind::Around {
                while end + 1 < chars.len() && chars[end + 1].is_whitespace() {
                    end += 1;
                }
            }
            Some(Range::new(
                Position::new(pos.line, start),
                Position::new(pos.line, end + 1),
                RangeMode::Char,
            ))
        }
        TextObject::Quote(q) => {
            let chars = line_chars(host, pos.line);
            let quote_positions: Vec<usize> = chars
                .iter()
                .enumerate()
                .filter(|(_, c)| **c == q)
                .map(|(i, _)| i)
                .collect();
            let pair = quote_positions.chunks(2).find(|pair| {
                pair.len() == 2 && pos.col >= pair[0] && pos.col <= pair[1]
            })?;
            let (inner_start, inner_end) = (pair[0] + 1, pair[1]);
            let (start, end) = match kind {
                TextObjectKind::Inner => (inner_start, inner_end),
                TextObjectKind::Around => (pair[0], pair[1] + 1),
            };
            Some(Range::new(
                Position::new(pos.line, start),
                Position::new(pos.line, end),
                RangeMode::Char,
            ))
        }
        TextObject::Bracket(open) => {
            let close = match open {
                '(' | ')' => ')',
                '[' | ']' => ']',
                '{' | '}' => '}',
                '<' | '>' => '>',
                other => other,
            };
            let open = match open {
                ')' => '(',
                ']' => '[',
                '}' => '{',
                '>' => '<',
                other => other,
            };
            let start = host.matching_bracket(pos).filter(|_| {
                host.line(pos.line).chars().nth(pos.col) == Some(close)
            });
            let start = start.or(Some(pos))?;
            let end = host.matching_bracket(start)?;
            let (start, end) = if start <= end { (start, end) } else { (end, start) };
            let (a, b) = match kind {
                TextObjectKind::Inner => (
                    Position::new(start.line, start.col + 1),
                    end,
                ),
                TextObjectKind::Around => (start, Position::new(end.line, end.col + 1)),
            };
            let _ = open;
            Some(Range::new(a, b, RangeMode::Char))
        }
        TextObject::Sentence => {
            let (mut start, mut end) = sentence_bounds(host, pos);
            if kind == TextObjectKind::Around {
                let chars = line_chars(host, end.line);
                let mut trailing = end.col;
                while trailing < chars.len() && chars[trailing].is_whitespace() {
                    trailing += 1;
                }
                if trailing > end.col {
                    end = Position::new(end.line, trailing);
                } else {
                    let mut leading = start.col;
                    let lead_chars = line_chars(host, start.line);
                    while leading > 0 && lead_chars[leading - 1].is_whitespace() {
                        leading -= 1;
                    }
                    start = Position::new(start.line, leading);
                }
            }
            Some(Range::new(start, end, RangeMode::Char))
        }
        TextObject::Paragraph => {
            let (start, end) = paragraph_text_object_bounds(host, pos, kind);
            Some(Range::new(
                Position::new(start, 0),
                Position::new(end, 0),
                RangeMode::Line,
            ))
        }
    }
}

/// `is`/`as`: the start and (exclusive-end-as-position) end of the
/// sentence containing `pos`.
fn sentence_bounds(host: &dyn HostBridge, pos: Position) -> (Position, Position) {
    let mut line = pos.line;
    let mut col = pos.col;
    let start = loop {
        let text = host.line(line);
        if let Some(s) = sentence_starts(&text).into_iter().rev().find(|&s| s <= col) {
            break Position::new(line, s);
        }
        if line == 0 {
            break Position::new(0, 0);
        }
        if host.line_len(line) == 0 {
            break Position::new(line, 0);
        }
        line -= 1;
        col = host.line_len(line);
    };
    let mut line2 = pos.line;
    let mut after = pos.col;
    let end = loop {
        let text = host.line(line2);
        if let Some(n) = sentence_starts(&text).into_iter().find(|&s| s > after) {
            break Position::new(line2, n);
        }
        if line2 + 1 >= host.line_count() || host.line_len(line2) == 0 {
            break Position::new(line2, host.line_len(line2));
        }
        line2 += 1;
        after = 0;
    };
    (start, end)
}

/// `ip`/`ap`: the contiguous run of non-blank lines around `pos` (or, if
/// `pos` sits on a blank line, the contiguous run of blank lines); `ap`
/// additionally swallows the trailing blank-line run, falling back to
/// the leading one if there's nothing to trail.
fn paragraph_text_object_bounds(host: &dyn HostBridge, pos: Position, kind: TextObjectKind) -> (usize, usize) {
    let last = host.line_count().saturating_sub(1);
    let on_blank = host.line_len(pos.line) == 0;
    let mut start = pos.line;
    let mut end = pos.line;
    while start > 0 && (host.line_len(start - 1) == 0) == on_blank {
        start -= 1;
    }
    while end < last && (host.line_len(end + 1) == 0) == on_blank {
        end += 1;
    }
    if kind == TextObjectKind::Around && !on_blank {
        let mut trailing = end;
        while trailing < last && host.line_len(trailing + 1) == 0 {
            trailing += 1;
        }
        if trailing > end {
            end = trailing;
        } else {
            while start > 0 && host.line_len(start - 1) == 0 {
                start -= 1;
            }
        }
    }
    (start, end)
}

/// Applies `op` over `range`, yanking/deleting into `register` as the
/// operator requires, and returns the cursor's resulting position.
pub fn apply_operator(
    host: &mut dyn HostBridge,
    op: Operator,
    range: Range,
    registers: &mut Registers,
    register_name: Option<char>,
    _settings: &Settings,
) -> Position {
    match op {
        Operator::Yank => {
            let text = captured_text(host, range);
            if matches!(register_name, Some('+') | Some('*')) {
                host.set_clipboard(&text, range.mode);
            } else {
                registers.record(register_name, Register { text, mode: range.mode }, false);
            }
            range.start
        }
        Operator::Delete | Operator::Change => {
            let text = host.delete_range(range);
            // A linewise change's range is `LineExclusive` (keeps the
            // trailing newline in the buffer) but the deleted text is
            // still a whole-line yank for register/paste purposes.
            let register_mode = if range.mode == RangeMode::LineExclusive {
                RangeMode::Line
            } else {
                range.mode
            };
            if matches!(register_name, Some('+') | Some('*')) {
                host.set_clipboard(&text, register_mode);
            } else {
                registers.record(register_name, Register { text, mode: register_mode }, true);
            }
            let pos = clamp_after_delete(host, range.start);
            if op == Operator::Change {
                host.insert(pos, "");
            }
            pos
        }
        Operator::Indent => {
            host.indent_region(range.start.line, range.end.line.max(range.start.line), '>');
            Position::new(range.start.line, 0)
        }
        Operator::Outdent => {
            host.indent_region(range.start.line, range.end.line.max(range.start.line), '<');
            Position::new(range.start.line, 0)
        }
        Operator::FormatLines => {
            host.indent_region(range.start.line, range.end.line.max(range.start.line), '=');
            Position::new(range.start.line, 0)
        }
        Operator::SwapCase | Operator::Lowercase | Operator::Uppercase => {
            let text = captured_text(host, range);
            let transformed = match op {
                Operator::SwapCase => swap_case(&text),
                Operator::Lowercase => text.to_lowercase(),
                Operator::Uppercase => text.to_uppercase(),
                _ => unreachable!(),
            };
            host.replace_range(range, &transformed);
            range.start
        }
        Operator::Filter => {
            // `!motion` has no filter command of its own to run here; the
            // engine intercepts it before reaching `apply_operator` and
            // turns it into a `:range!cmd` cmdline prompt instead.
            unreachable!("Filter is handled by the engine before apply_operator")
        }
    }
}

fn captured_text(host: &dyn HostBridge, range: Range) -> String {
    match range.mode {
        RangeMode::Line | RangeMode::LineExclusive => (range.start.line..=range.end.line)
            .map(|l| host.line(l))
            .collect::<Vec<_>>()
            .join("\n")
            + "\n",
        _ => {
            if range.start.line == range.end.line {
                let chars = line_chars(host, range.start.line);
                chars[range.start.col.min(chars.len())..range.end.col.min(chars.len())]
                    .iter()
                    .collect()
            } else {
                let mut out = String::new();
                let first = line_chars(host, range.start.line);
                out.extend(&first[range.start.col.min(first.len())..]);
                out.push('\n');
                for l in range.start.line + 1..range.end.line {
                    out.push_str(&host.line(l));
                    out.push('\n');
                }
                let last = line_chars(host, range.end.line);
                out.extend(&last[..range.end.col.min(last.len())]);
                out
            }
        }
    }
}

fn clamp_after_delete(host: &dyn HostBridge, pos: Position) -> Position {
    let last_line = host.line_count().saturating_sub(1);
    let line = pos.line.min(last_line);
    Position::new(line, clamp_col(host, line, pos.col, false))
}

fn swap_case(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_uppercase() {
                c.to_lowercase().next().unwrap_or(c)
            } else if c.is_lowercase() {
                c.to_uppercase().next().unwrap_or(c)
            } else {
                c
            }
        })
        .collect()
}

/// `J`/`gJ`: joins `count.max(2)` lines starting at `line`, inserting a
/// single space at the join point unless the next line is empty or the
/// join is the `g`-prefixed "no extra space" variant.
pub fn join_lines(host: &mut dyn HostBridge, line: usize, count: usize, add_space: bool) -> Position {
    let joins = count.max(2) - 1;
    let last_line = host.line_count().saturating_sub(1);
    let mut join_col = host.line_len(line);
    for _ in 0..joins {
        if line >= host.line_count().saturating_sub(1) {
            break;
        }
        let next = host.line(line + 1);
        let trimmed = next.trim_start();
        let sep = if !add_space || trimmed.is_empty() || host.line_len(line) == 0 {
            String::new()
        } else {
            " ".to_string()
        };
        join_col = host.line_len(line);
        let end = Position::new(line + 1, next.chars().count() - trimmed.chars().count());
        host.replace_range(
            Range::new(Position::new(line, host.line_len(line)), end, RangeMode::Char),
            &sep,
        );
        join_col += sep.chars().count();
    }
    let _ = last_line;
    Position::new(line, join_col)
}

/// `p`/`P`: pastes `reg` honoring its `RangeMode`. `after` selects `p`
/// (true) vs `P` (false). Block paste pads short lines with spaces only
/// when pasting after the cursor, matching real vim's documented
/// asymmetry here.
pub fn paste_register(host: &mut dyn HostBridge, pos: Position, reg: &Register, after: bool) -> Position {
    match reg.mode {
        RangeMode::Line => {
            let target_line = if after { pos.line + 1 } else { pos.line };
            let insert_at = Position::new(target_line.min(host.line_count()), 0);
            host.insert(insert_at, &reg.text);
            Position::new(target_line, 0)
        }
        RangeMode::Block | RangeMode::BlockAndTail => {
            let col = if after { (host.line_len(pos.line)).min(pos.col + 1) } else { pos.col };
            let mut last = pos;
            for (i, row) in reg.text.split('\n').enumerate() {
                let line = pos.line + i;
                if line >= host.line_count() {
                    break;
                }
                let len = host.line_len(line);
                let at_col = if after && len < col {
                    let pad = " ".repeat(col - len);
                    host.insert(Position::new(line, len), &pad);
                    col
                } else {
                    col.min(host.line_len(line))
                };
                last = host.insert(Position::new(line, at_col), row);
            }
            Position::new(pos.line, col)
        }
        _ => {
            let col = if after && host.line_len(pos.line) > 0 {
                pos.col + 1
            } else {
                pos.col
            };
            host.insert(Position::new(pos.line, col), &reg.text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::Position;

    struct Lines(Vec<String>);
    impl HostBridge for Lines {
        fn line_count(&self) -> usize {
            self.0.len()
        }
        fn line(&self, line: usize) -> String {
            self.0.get(line).cloned().unwrap_or_default()
        }
        fn cursor(&self) -> Position {
            Position::default()
        }
        fn set_cursor(&mut self, _pos: Position) {}
        fn delete_range(&mut self, range: Range) -> String {
            let text = captured_text(self, range);
            match range.mode {
                RangeMode::Line => {
                    for _ in range.start.line..=range.end.line {
                        if (range.start.line) < self.0.len() {
                            self.0.remove(range.start.line);
                        }
                    }
                    if self.0.is_empty() {
                        self.0.push(String::new());
                    }
                }
                RangeMode::LineExclusive => {
                    self.0[range.start.line].clear();
                    for _ in range.start.line..range.end.line {
                        if range.start.line + 1 < self.0.len() {
                            self.0.remove(range.start.line + 1);
                        }
                    }
                }
                _ => {
                    let start = range.start;
                    let end = range.end;
                    if start.line == end.line {
                        let mut chars = line_chars(self, start.line);
                        chars.drain(start.col.min(chars.len())..end.col.min(chars.len()));
                        self.0[start.line] = chars.into_iter().collect();
                    } else {
                        let mut first = line_chars(self, start.line);
                        first.truncate(start.col.min(first.len()));
                        let last = line_chars(self, end.line);
                        first.extend(last[end.col.min(last.len())..].iter());
                        self.0.splice(start.line..=end.line, [first.into_iter().collect()]);
                    }
                }
            }
            text
        }
        fn insert(&mut self, pos: Position, text: &str) -> Position {
            let mut chars = line_chars(self, pos.line);
            let col = pos.col.min(chars.len());
            let insertion: Vec<char> = text.chars().collect();
            chars.splice(col..col, insertion.iter().cloned());
            self.0[pos.line] = chars.into_iter().collect();
            Position::new(pos.line, col + insertion.len())
        }
        fn begin_undo_group(&mut self) {}
        fn end_undo_group(&mut self) {}
        fn undo(&mut self) -> bool {
            false
        }
        fn redo(&mut self) -> bool {
            false
        }
        fn file_name(&self) -> Option<String> {
            None
        }
        fn write_file(&mut self, _path: Option<&str>) -> std::io::Result<()> {
            Ok(())
        }
        fn read_file(&mut self, _path: &str, _at: Position) -> std::io::Result<()> {
            Ok(())
        }
        fn run_shell(&mut self, _cmd: &str, _input: Option<&str>) -> std::io::Result<String> {
            Ok(String::new())
        }
        fn show_message(&mut self, _message: crate::message::Message) {}
    }

    #[test]
    fn word_forward_skips_punctuation_boundary() {
        let h = Lines(vec!["foo, bar".to_string()]);
        let pos = motion_target(&h, Motion::WordForward { big: false }, Position::new(0, 0), 1, false);
        assert_eq!(pos, Position::new(0, 3));
    }

    #[test]
    fn word_forward_big_treats_punctuation_as_word() {
        let h = Lines(vec!["foo, bar".to_string()]);
        let pos = motion_target(&h, Motion::WordForward { big: true }, Position::new(0, 0), 1, false);
        assert_eq!(pos, Position::new(0, 5));
    }

    #[test]
    fn line_end_never_past_last_char() {
        let h = Lines(vec!["abc".to_string()]);
        assert_eq!(
            motion_target(&h, Motion::LineEnd, Position::new(0, 0), 1, false),
            Position::new(0, 2)
        );
    }

    #[test]
    fn empty_buffer_motions_stay_at_origin() {
        let h = Lines(vec![String::new()]);
        for m in [Motion::Left, Motion::Right, Motion::WordForward { big: false }] {
            let pos = motion_target(&h, m, Position::new(0, 0), 1, false);
            assert_eq!(pos, Position::new(0, 0));
        }
    }

    #[test]
    fn dd_deletes_the_current_line() {
        let mut h = Lines(vec!["one".into(), "two".into(), "three".into()]);
        let mut regs = Registers::new();
        let range = operator_range(Motion::Down, Position::new(0, 0), Position::new(0, 0));
        apply_operator(&mut h, Operator::Delete, range, &mut regs, None, &Settings::new());
        assert_eq!(h.0, vec!["two".to_string(), "three".to_string()]);
        assert_eq!(regs.get(None).text, "one\n");
    }

    #[test]
    fn dw_deletes_one_word_exclusive() {
        let mut h = Lines(vec!["foo bar".to_string()]);
        let mut regs = Registers::new();
        let target = motion_target(&h, Motion::WordForward { big: false }, Position::new(0, 0), 1, false);
        let range = operator_range(Motion::WordForward { big: false }, Position::new(0, 0), target);
        apply_operator(&mut h, Operator::Delete, range, &mut regs, None, &Settings::new());
        assert_eq!(h.0[0], "bar");
    }

    #[test]
    fn join_inserts_single_space() {
        let mut h = Lines(vec!["foo".into(), "bar".into()]);
        join_lines(&mut h, 0, 2, true);
        assert_eq!(h.0[0], "foo bar");
    }

    #[test]
    fn swap_case_flips_letters() {
        assert_eq!(swap_case("AbC1"), "aBc1");
    }
}
