//! A small VimL-flavored script reader.
//!
//! This is not a general vimscript interpreter: it exists to support the
//! `engine` crate's `:source`, `:echo` and `:s` replacement text, so it
//! only understands line splitting, ranges/bang/command/args, comment
//! lines, and a flat (non-nested) `function`/`endfunction` skip. Anything
//! resembling a control-flow keyword that the underlying host doesn't
//! support yet is surfaced as an error, not silently executed.

pub mod expr;
pub mod value;

use thiserror::Error;

pub use expr::eval;
pub use value::Value;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScriptError {
    #[error("unexpected keyword {0:?} outside of a function body")]
    UnexpectedKeyword(&'static str),
    #[error("function body is missing a matching endfunction")]
    UnterminatedFunction,
}

/// One parsed line of an ex-script, before the host interprets `command`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptLine {
    pub range: Option<String>,
    pub command: String,
    pub bang: bool,
    pub args: String,
}

impl ScriptLine {
    fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('"') {
            return None;
        }
        let (range, line) = split_range(line);
        let (command, line) = split_command(line);
        let (bang, args) = split_bang(line);
        if command.is_empty() && !bang && range.is_none() {
            return None;
        }
        Some(Self {
            range: range.map(str::to_string),
            command: command.to_string(),
            bang,
            args: args.trim().to_string(),
        })
    }
}

/// Consumes the leading range-address syntax (`1,3`, `%`, `.`, `$`, `'a`,
/// `+2`, ...) a line may open with, up to the first character that can
/// only belong to a command name.
fn split_range(line: &str) -> (Option<&str>, &str) {
    let chars: Vec<char> = line.chars().collect();
    let mut idx = 0;
    while idx < chars.len() {
        match chars[idx] {
            '0'..='9' | ',' | '.' | '$' | '%' | '+' | '-' => idx += 1,
            '\'' => {
                idx += 1;
                if idx < chars.len() {
                    idx += 1;
                }
            }
            _ => break,
        }
    }
    if idx == 0 {
        (None, line)
    } else {
        let split_at: usize = chars[..idx].iter().map(|c| c.len_utf8()).sum();
        (Some(&line[..split_at]), &line[split_at..])
    }
}

fn split_command(line: &str) -> (&str, &str) {
    let end = line
        .char_indices()
        .find(|(_, c)| !c.is_alphabetic())
        .map(|(i, _)| i)
        .unwrap_or(line.len());
    (&line[..end], &line[end..])
}

fn split_bang(line: &str) -> (bool, &str) {
    match line.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, line),
    }
}

/// Splits a script body on unescaped newlines or `|`, matching the
/// teacher's line-separator rules (a backslash immediately before the
/// separator escapes it).
struct RawTokenizer<'a> {
    rest: &'a str,
}

impl<'a> Iterator for RawTokenizer<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        while !self.rest.is_empty() {
            let mut last = ' ';
            let (line, next) = self
                .rest
                .split_once(|c: char| {
                    let is_sep = last != '\\' && (c == '\n' || c == '|');
                    if !c.is_whitespace() {
                        last = c;
                    }
                    is_sep
                })
                .unwrap_or((self.rest, ""));
            self.rest = next.trim_start();
            if !line.trim().is_empty() {
                return Some(line);
            }
        }
        None
    }
}

/// A parsed `:source`-able script: comment and blank lines dropped,
/// `function ... endfunction` bodies skipped flatly (the engine has no
/// user-defined functions, so a function definition is simply never run;
/// per design, nesting is not inferred — the first `endfunction` closes
/// the block no matter what appears between).
#[derive(Debug, Default, Clone)]
pub struct Script {
    pub lines: Vec<ScriptLine>,
}

impl Script {
    pub fn parse(text: &str) -> Result<Self, ScriptError> {
        let mut lines = Vec::new();
        let mut tokens = RawTokenizer { rest: text }.filter_map(ScriptLine::parse);
        while let Some(line) = tokens.next() {
            if line.command == "function" {
                loop {
                    match tokens.next() {
                        Some(inner) if inner.command == "endfunction" => break,
                        Some(_) => continue,
                        None => return Err(ScriptError::UnterminatedFunction),
                    }
                }
                continue;
            }
            if line.command == "endfunction" {
                return Err(ScriptError::UnexpectedKeyword("endfunction"));
            }
            lines.push(line);
        }
        Ok(Self { lines })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_pipe_and_newline() {
        let s = Script::parse("set nu | set hls\nnohlsearch").unwrap();
        assert_eq!(s.lines.len(), 3);
        assert_eq!(s.lines[0].command, "set");
        assert_eq!(s.lines[0].args, "nu");
        assert_eq!(s.lines[2].command, "nohlsearch");
    }

    #[test]
    fn skips_comment_lines() {
        let s = Script::parse("\" a comment\nset nu").unwrap();
        assert_eq!(s.lines.len(), 1);
        assert_eq!(s.lines[0].command, "set");
    }

    #[test]
    fn flat_skips_function_bodies() {
        let s = Script::parse("function! Foo()\nfunction! Bar()\nendfunction\nset nu").unwrap();
        // the inner `function! Bar()` line is swallowed by the flat skip,
        // so only the trailing `set nu` survives — matching "do not infer
        // nesting".
        assert_eq!(s.lines.len(), 1);
        assert_eq!(s.lines[0].command, "set");
    }

    #[test]
    fn parses_range_bang_args() {
        let s = Script::parse("1,3d!").unwrap();
        assert_eq!(s.lines[0].range.as_deref(), Some("1,3"));
        assert_eq!(s.lines[0].command, "d");
        assert!(s.lines[0].bang);
    }

    #[test]
    fn unmatched_endfunction_errors() {
        assert_eq!(
            Script::parse("endfunction"),
            Err(ScriptError::UnexpectedKeyword("endfunction"))
        );
    }
}
