//! Vim-pattern-to-host-regex translation and incremental search state.
//! The translation table is ported directly from
//! `fakevimhandler.cpp`'s `vimPatternToQtPattern`
//! (`examples/original_source/src/plugins/fakevim/fakevimhandler.cpp`),
//! not reinvented: Vim's `\(`/`\)`/`\{`/`\}`/`\+`/`\|`/`\?` are the
//! *grouping* metacharacters (unescaped `(`/`)`/`{`/`}` are literal), the
//! reverse of a host regex engine's convention, plus the character-class
//! shorthands `\a \A \h \H \l \L \o \O \u \U \x \X` and the case
//! modifiers `\c`/`\C`.

use regex::RegexBuilder;
use thiserror::Error;

use crate::edit::Position;
use crate::host::HostBridge;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("pattern not found: {0}")]
    NotFound(String),
    #[error("unterminated character class in pattern")]
    UnterminatedClass,
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),
}

/// Translates a Vim search pattern into the syntax a conventional
/// (PCRE-like) host regex engine expects. `ignorecase`/`smartcase` are
/// the two `:set` options, kept separate since `smartcase` only narrows
/// `ignorecase` to case-sensitive for needles with an uppercase letter —
/// it has no effect at all when `ignorecase` is off.
pub fn vim_pattern_to_host(needle: &str, ignorecase: bool, smartcase: bool) -> (String, bool) {
    let mut out = String::with_capacity(needle.len() + 4);
    let mut ignore_case = None;
    let mut chars = needle.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('(') => out.push('('),
                Some(')') => out.push(')'),
                Some('{') => out.push('{'),
                Some('}') => out.push('}'),
                Some('+') => out.push('+'),
                Some('|') => out.push('|'),
                Some('?') => out.push('?'),
                Some('=') => out.push('?'),
                Some('<') => out.push_str("\\b"),
                Some('>') => out.push_str("\\b"),
                Some('a') => out.push_str("[A-Za-z]"),
                Some('A') => out.push_str("[^A-Za-z]"),
                Some('h') => out.push_str("[A-Za-z_]"),
                Some('H') => out.push_str("[^A-Za-z_]"),
                Some('l') => out.push_str("[a-z]"),
                Some('L') => out.push_str("[^a-z]"),
                Some('o') => out.push_str("[0-7]"),
                Some('O') => out.push_str("[^0-7]"),
                Some('u') => out.push_str("[A-Z]"),
                Some('U') => out.push_str("[^A-Z]"),
                Some('x') => out.push_str("[0-9A-Fa-f]"),
                Some('X') => out.push_str("[^0-9A-Fa-f]"),
                Some('c') => ignore_case = Some(true),
                Some('C') => ignore_case = Some(false),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else if matches!(c, '(' | ')' | '{' | '}' | '+' | '|' | '?') {
            out.push('\\');
            out.push(c);
        } else if c == '[' {
            // An empty bracket class `[]` is literal in Vim, not a regex
            // character class; anything else starting a class is passed
            // through untouched including its closing `]`.
            if chars.peek() == Some(&']') {
                chars.next();
                out.push_str("\\[\\]");
            } else {
                out.push('[');
            }
        } else {
            out.push(c);
        }
    }
    let case_insensitive = match ignore_case {
        Some(explicit) => explicit,
        None => {
            ignorecase && !(smartcase && needle.chars().any(|c| c.is_uppercase()))
        }
    };
    (out, case_insensitive)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchDirection {
    Forward,
    Backward,
}

/// The live state of an in-progress incremental search (`/`/`?` before
/// Enter), plus the last completed search used by `n`/`N`/`*`/`#`.
#[derive(Debug, Clone, Default)]
pub struct SearchState {
    pub last_needle: Option<String>,
    pub last_direction: Option<SearchDirection>,
    pub highlight: bool,
}

impl SearchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_last(&mut self, needle: impl Into<String>, direction: SearchDirection) {
        self.last_needle = Some(needle.into());
        self.last_direction = Some(direction);
    }

    /// The effective direction for `n` (same as last search) or `N`
    /// (opposite).
    pub fn repeat_direction(&self, reversed: bool) -> Option<SearchDirection> {
        self.last_direction.map(|d| {
            if reversed {
                match d {
                    SearchDirection::Forward => SearchDirection::Backward,
                    SearchDirection::Backward => SearchDirection::Forward,
                }
            } else {
                d
            }
        })
    }
}

/// Runs a translated pattern against the host buffer starting just past
/// (or, searching backward, just before) `from`, wrapping around the
/// buffer when `wrapscan` allows it. Returns the match start and whether
/// the search wrapped (for the "search hit BOTTOM/TOP" message).
pub fn search(
    host: &dyn HostBridge,
    needle: &str,
    from: Position,
    direction: SearchDirection,
    ignorecase: bool,
    smartcase: bool,
    wrapscan: bool,
) -> Result<(Position, bool), SearchError> {
    let (pattern, ignore_case) = vim_pattern_to_host(needle, ignorecase, smartcase);
    let re = RegexBuilder::new(&pattern)
        .case_insensitive(ignore_case)
        .build()
        .map_err(|e| SearchError::InvalidPattern(e.to_string()))?;
    let total = host.line_count();
    if total == 0 {
        return Err(SearchError::NotFound(needle.to_string()));
    }
    let line_order: Vec<usize> = match direction {
        SearchDirection::Forward => (from.line..total).chain(0..from.line).collect(),
        SearchDirection::Backward => (0..=from.line).rev().chain((from.line + 1..total).rev()).collect(),
    };
    let mut wrapped = false;
    let mut crossed_start = false;
    for line in line_order {
        if direction == SearchDirection::Forward && line < from.line && !crossed_start {
            wrapped = true;
            crossed_start = true;
        }
        if direction == SearchDirection::Backward && line > from.line && !crossed_start {
            wrapped = true;
            crossed_start = true;
        }
        let text = host.line(line);
        let candidates: Vec<(usize, usize)> = re
            .find_iter(&text)
            .map(|m| (char_index(&text, m.start()), char_index(&text, m.end())))
            .collect();
        let hit = match direction {
            SearchDirection::Forward => candidates
                .into_iter()
                .find(|(start, _)| line != from.line || *start > from.col),
            SearchDirection::Backward => candidates
                .into_iter()
                .filter(|(start, _)| line != from.line || *start < from.col)
                .last(),
        };
        if let Some((start, _)) = hit {
            if !wrapscan && wrapped {
                return Err(SearchError::NotFound(needle.to_string()));
            }
            return Ok((Position::new(line, start), wrapped));
        }
    }
    Err(SearchError::NotFound(needle.to_string()))
}

fn char_index(s: &str, byte_idx: usize) -> usize {
    s[..byte_idx].chars().count()
}

/// Builds the `\<word\>` pattern `*`/`#` search for the word under the
/// cursor.
pub fn word_under_cursor_pattern(word: &str) -> String {
    format!("\\<{}\\>", regex::escape(word))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unescaped_parens_are_literal() {
        let (pat, _) = vim_pattern_to_host("foo(bar)", false, false);
        assert_eq!(pat, "foo\\(bar\\)");
    }

    #[test]
    fn escaped_parens_become_groups() {
        let (pat, _) = vim_pattern_to_host("\\(foo\\)\\+", false, false);
        assert_eq!(pat, "(foo)+");
    }

    #[test]
    fn empty_bracket_class_is_literal() {
        let (pat, _) = vim_pattern_to_host("a[]b", false, false);
        assert_eq!(pat, "a\\[\\]b");
    }

    #[test]
    fn character_class_shorthands_translate() {
        let (pat, _) = vim_pattern_to_host("\\u\\l", false, false);
        assert_eq!(pat, "[A-Z][a-z]");
    }

    #[test]
    fn word_boundary_markers_translate_without_lookaround() {
        let (pat, _) = vim_pattern_to_host("\\<foo\\>", false, false);
        assert_eq!(pat, "\\bfoo\\b");
    }

    #[test]
    fn explicit_case_modifier_overrides_smartcase() {
        let (_, ci) = vim_pattern_to_host("\\cFoo", false, false);
        assert!(ci);
        let (_, ci) = vim_pattern_to_host("\\CFoo", true, true);
        assert!(!ci);
    }

    #[test]
    fn smartcase_is_case_insensitive_only_for_all_lowercase_needle() {
        let (_, ci) = vim_pattern_to_host("foo", true, true);
        assert!(ci);
        let (_, ci) = vim_pattern_to_host("Foo", true, true);
        assert!(!ci);
    }

    #[test]
    fn ignorecase_without_smartcase_is_case_insensitive_regardless_of_case() {
        let (_, ci) = vim_pattern_to_host("Foo", true, false);
        assert!(ci);
    }

    #[test]
    fn smartcase_has_no_effect_when_ignorecase_is_off() {
        let (_, ci) = vim_pattern_to_host("foo", false, true);
        assert!(!ci);
    }
}
