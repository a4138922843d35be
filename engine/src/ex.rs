//! The `:`-command interpreter: range parsing and the dispatch table for
//! `:substitute`, `:map`/`:noremap`/`:unmap`, `:set`, `:registers`,
//! `:history`, `:delete`, `:write`, `:read`, bare line-number jumps,
//! `:!cmd`, `:source`, `:normal`, `:nohlsearch`, `:redo`, `:echo`. The
//! `ExCommand` shape and `matches()` prefix-abbreviation rule are ported
//! from `fakevimhandler.h`/`.cpp`'s `struct ExCommand`; script bodies
//! (`:source`, multi-command lines) are tokenized by the `vimscript`
//! crate's `Script::parse`.

use thiserror::Error;

use crate::edit::Position;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExError {
    #[error("not an editor command: {0}")]
    UnknownCommand(String),
    #[error("invalid range")]
    InvalidRange,
    #[error("{0}")]
    Script(String),
    #[error("{0}")]
    Settings(String),
    #[error("pattern not found: {0}")]
    PatternNotFound(String),
    #[error("E486: substitute pattern not found")]
    SubstituteNotFound,
    #[error("E33: no previous substitute regular expression")]
    NoPreviousSubstitution,
}

impl From<vimscript::ScriptError> for ExError {
    fn from(e: vimscript::ScriptError) -> Self {
        ExError::Script(e.to_string())
    }
}

/// One endpoint of an ex range: a line number, `.` (current line), `$`
/// (last line), a mark, a search pattern, or an offset from the previous
/// endpoint (`+N`/`-N`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeAddress {
    Current,
    Last,
    Line(usize),
    Mark(char),
    Offset(i64),
    /// `N%`: the line `N` percent of the way through the buffer.
    Percent(usize),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExRange {
    pub start: Option<RangeAddress>,
    pub end: Option<RangeAddress>,
}

impl ExRange {
    /// Resolves the range against a known current/last line, returning a
    /// 0-based, inclusive `(first, last)` pair. Marks are resolved by the
    /// caller before this (the interpreter has no mark table of its own).
    pub fn resolve(&self, current: usize, last: usize) -> (usize, usize) {
        let resolve_one = |addr: &RangeAddress, default: usize| match addr {
            RangeAddress::Current => current,
            RangeAddress::Last => last,
            RangeAddress::Line(n) => n.saturating_sub(1),
            RangeAddress::Mark(_) => default,
            RangeAddress::Offset(delta) => {
                (current as i64 + delta).clamp(0, last as i64) as usize
            }
            RangeAddress::Percent(pct) => {
                (((last + 1) as u64 * *pct as u64 / 100) as usize).min(last)
            }
        };
        match (&self.start, &self.end) {
            (None, None) => (current, current),
            (Some(a), None) => {
                let line = resolve_one(a, current);
                (line, line)
            }
            (None, Some(b)) => {
                let line = resolve_one(b, current);
                (current.min(line), current.max(line))
            }
            (Some(a), Some(b)) => {
                let first = resolve_one(a, current);
                let second = resolve_one(b, current);
                (first.min(second), first.max(second))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExCommand {
    pub cmd: String,
    pub bang: bool,
    pub args: String,
    pub range: ExRange,
}

impl ExCommand {
    /// Prefix-abbreviation rule ported from `ExCommand::matches`: `cmd`
    /// matches if it's at least `min` characters long and a prefix of
    /// `full` (so `:s` through `:su` all resolve to `:substitute`, but
    /// `:sp` does not).
    pub fn matches(&self, min: &str, full: &str) -> bool {
        self.cmd.len() >= min.len() && full.starts_with(&self.cmd)
    }
}

fn parse_address(s: &str) -> Option<(RangeAddress, &str)> {
    let s = s.trim_start();
    if let Some(rest) = s.strip_prefix('.') {
        return Some((RangeAddress::Current, rest));
    }
    if let Some(rest) = s.strip_prefix('$') {
        return Some((RangeAddress::Last, rest));
    }
    if let Some(rest) = s.strip_prefix('\'') {
        let mut chars = rest.chars();
        let mark = chars.next()?;
        return Some((RangeAddress::Mark(mark), chars.as_str()));
    }
    let digits_end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    if digits_end > 0 {
        let n: usize = s[..digits_end].parse().ok()?;
        if let Some(rest) = s[digits_end..].strip_prefix('%') {
            return Some((RangeAddress::Percent(n), rest));
        }
        return Some((RangeAddress::Line(n), &s[digits_end..]));
    }
    if let Some(rest) = s.strip_prefix('+').or_else(|| s.strip_prefix('-')) {
        let sign = if s.starts_with('-') { -1 } else { 1 };
        let digits_end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        let n: i64 = if digits_end == 0 {
            1
        } else {
            rest[..digits_end].parse().ok()?
        };
        return Some((RangeAddress::Offset(sign * n), &rest[digits_end..]));
    }
    None
}

/// Splits a line already isolated by `vimscript::Script` into its range,
/// command, bang and argument parts into the richer `ExCommand` shape the
/// `CommandExecutor`/engine actually dispatch on.
pub fn parse_line(line: &vimscript::ScriptLine) -> ExCommand {
    let mut range = ExRange::default();
    if let Some(raw) = &line.range {
        let raw = raw.trim_end_matches(',');
        if raw == "%" {
            range.start = Some(RangeAddress::Line(1));
            range.end = Some(RangeAddress::Last);
        } else if let Some((first, rest)) = raw.split_once(',') {
            if let Some((a, _)) = parse_address(first) {
                range.start = Some(a);
            }
            if let Some((b, _)) = parse_address(rest) {
                range.end = Some(b);
            }
        } else if let Some((a, _)) = parse_address(raw) {
            range.start = Some(a);
        }
    }
    ExCommand {
        cmd: line.command.clone(),
        bang: line.bang,
        args: line.args.clone(),
        range,
    }
}

/// A `:s/needle/replacement/flags` invocation, parsed separately from
/// the generic `ExCommand` because its delimiter can be any punctuation
/// character, not just `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub pattern: String,
    pub replacement: String,
    pub global: bool,
    pub confirm: bool,
    pub ignore_case: Option<bool>,
}

pub fn parse_substitution(args: &str) -> Result<Substitution, ExError> {
    let mut chars = args.chars();
    let delim = chars.next().ok_or(ExError::InvalidRange)?;
    if delim.is_alphanumeric() {
        return Err(ExError::InvalidRange);
    }
    let rest = chars.as_str();
    let parts: Vec<&str> = rest.splitn(3, delim).collect();
    let pattern = parts.first().copied().unwrap_or_default().to_string();
    let replacement = parts.get(1).copied().unwrap_or_default().to_string();
    let flags = parts.get(2).copied().unwrap_or_default();
    Ok(Substitution {
        pattern,
        replacement,
        global: flags.contains('g'),
        confirm: flags.contains('c'),
        ignore_case: if flags.contains('i') {
            Some(true)
        } else if flags.contains('I') {
            Some(false)
        } else {
            None
        },
    })
}

/// Applies `g`/`c`/`i`/`I` flag characters from a `:&`/bare-`:s` trailer
/// onto a reused `Substitution`, leaving `pattern`/`replacement` untouched.
pub fn apply_substitution_flags(sub: &mut Substitution, flags: &str) {
    if flags.contains('g') {
        sub.global = true;
    }
    if flags.contains('c') {
        sub.confirm = true;
    }
    if flags.contains('i') {
        sub.ignore_case = Some(true);
    } else if flags.contains('I') {
        sub.ignore_case = Some(false);
    }
}

/// Interpolates `&`/`\0`-`\9` backreferences in a substitute replacement
/// string against a set of captured groups, using the `vimscript` literal
/// evaluator for any `\=expr` replacement form.
pub fn expand_replacement(replacement: &str, groups: &[Option<String>]) -> Result<String, ExError> {
    if let Some(expr) = replacement.strip_prefix("\\=") {
        return Ok(vimscript::eval(expr)
            .map_err(|e| ExError::Script(e.to_string()))?
            .display());
    }
    let mut out = String::new();
    let mut chars = replacement.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '&' => out.push_str(groups.first().and_then(|g| g.as_deref()).unwrap_or("")),
            '\\' => match chars.next() {
                Some(d) if d.is_ascii_digit() => {
                    let idx = d.to_digit(10).unwrap() as usize;
                    out.push_str(groups.get(idx).and_then(|g| g.as_deref()).unwrap_or(""));
                }
                Some('n') => out.push('\n'),
                Some('&') => out.push('&'),
                Some('\\') => out.push('\\'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            },
            other => out.push(other),
        }
    }
    Ok(out)
}

/// Used by `:2,3` (a bare range with no command) and `:5`, both of which
/// jump the cursor to the resolved line.
pub fn is_bare_goto(cmd: &ExCommand) -> bool {
    !cmd.bang
        && cmd.cmd.is_empty()
        && !cmd.args.starts_with('&')
        && (cmd.range.start.is_some() || cmd.range.end.is_some())
}

pub fn bare_goto_target(cmd: &ExCommand, current: usize, last: usize) -> Position {
    let (_, end) = cmd.range.resolve(current, last);
    Position::new(end, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(line: &str) -> ExCommand {
        let parsed = vimscript::Script::parse(line).unwrap();
        parse_line(&parsed.lines[0])
    }

    #[test]
    fn numeric_range_parses() {
        let c = cmd("2,3d");
        assert_eq!(c.cmd, "d");
        assert_eq!(
            c.range.resolve(0, 10),
            (1, 2)
        );
    }

    #[test]
    fn percent_is_whole_file() {
        let c = cmd("%s/a/b/");
        assert_eq!(c.range.resolve(4, 10), (0, 10));
    }

    #[test]
    fn command_matches_prefix_abbreviation() {
        let c = cmd("sub/a/b/");
        assert!(c.matches("s", "substitute"));
        assert!(!c.matches("sp", "split"));
    }

    #[test]
    fn substitution_parses_flags() {
        let s = parse_substitution("/foo/bar/gi").unwrap();
        assert_eq!(s.pattern, "foo");
        assert_eq!(s.replacement, "bar");
        assert!(s.global);
        assert_eq!(s.ignore_case, Some(true));
    }

    #[test]
    fn replacement_expands_backreferences() {
        let groups = vec![Some("whole".to_string()), Some("inner".to_string())];
        let out = expand_replacement("[\\1]", &groups).unwrap();
        assert_eq!(out, "[inner]");
    }

    #[test]
    fn percentage_address_resolves_proportionally() {
        let c = cmd("50%d");
        // 11 lines (0..=10), 50% of 11 rounds down to line index 5.
        assert_eq!(c.range.resolve(0, 10), (5, 5));
    }

    #[test]
    fn substitution_flags_layer_onto_reused_substitution() {
        let mut s = parse_substitution("/foo/bar/").unwrap();
        apply_substitution_flags(&mut s, "gi");
        assert!(s.global);
        assert_eq!(s.ignore_case, Some(true));
    }

    #[test]
    fn bare_range_is_a_goto() {
        let c = cmd("5");
        assert!(is_bare_goto(&c));
        assert_eq!(bare_goto_target(&c, 0, 10), Position::new(4, 0));
    }
}
