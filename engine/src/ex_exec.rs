//! The parts of ex-command execution that are pure text/host operations
//! and don't need the mode machine's recursive re-entry (`:normal`,
//! `:source` drive the engine itself and so live on `Engine` in
//! `engine.rs`). Grounded in `fakevimhandler.cpp`'s `handleExSubstitute`
//! flow, generalized to operate through `HostBridge` line-by-line.

use regex::RegexBuilder;

use crate::edit::{Position, Range, RangeMode, Register, Registers};
use crate::ex::{expand_replacement, ExError, Substitution};
use crate::host::HostBridge;
use crate::search::vim_pattern_to_host;

/// Runs `sub` over 0-based inclusive line range `(first, last)`, returning
/// the number of lines changed. `gdefault` flips the meaning of the `g`
/// flag exactly as Vim's `:set gdefault` does (handled by the caller
/// XOR-ing it into `sub.global` before calling this).
pub fn substitute_range(
    host: &mut dyn HostBridge,
    (first, last): (usize, usize),
    sub: &Substitution,
    ignorecase_setting: bool,
    smartcase: bool,
) -> Result<usize, ExError> {
    let (pattern, translated_ci) = vim_pattern_to_host(&sub.pattern, ignorecase_setting, smartcase);
    let ignore_case = sub.ignore_case.unwrap_or(translated_ci);
    let re = RegexBuilder::new(&pattern)
        .case_insensitive(ignore_case)
        .build()
        .map_err(|e| ExError::Script(e.to_string()))?;
    let mut changed = 0;
    for line in first..=last.min(host.line_count().saturating_sub(1)) {
        let text = host.line(line);
        if !re.is_match(&text) {
            continue;
        }
        let mut out = String::new();
        let mut last_end = 0;
        for (count, m) in re.captures_iter(&text).enumerate() {
            if count > 0 && !sub.global {
                break;
            }
            let whole = m.get(0).unwrap();
            out.push_str(&text[last_end..whole.start()]);
            let groups: Vec<Option<String>> = std::iter::once(Some(whole.as_str().to_string()))
                .chain((1..m.len()).map(|i| m.get(i).map(|g| g.as_str().to_string())))
                .collect();
            out.push_str(&expand_replacement(&sub.replacement, &groups)?);
            last_end = whole.end();
        }
        out.push_str(&text[last_end..]);
        if out != text {
            let line_len = text.chars().count();
            host.replace_range(
                Range::new(Position::new(line, 0), Position::new(line, line_len), RangeMode::Char),
                &out,
            );
            changed += 1;
        }
    }
    if changed == 0 {
        return Err(ExError::SubstituteNotFound);
    }
    Ok(changed)
}

/// Renders a register's contents for `:registers`/`:display`, with
/// unprintable characters (control codes, newlines) shown as `^X`.
pub fn format_register_line(name: char, reg: &Register) -> String {
    let mut rendered = String::new();
    for c in reg.text.chars().take(200) {
        if c == '\n' {
            rendered.push_str("^J");
        } else if (c as u32) < 0x20 {
            rendered.push('^');
            rendered.push((c as u8 + 0x40) as char);
        } else {
            rendered.push(c);
        }
    }
    format!("\"{name}   {rendered}")
}

pub fn registers_listing(registers: &Registers, names: &[char]) -> String {
    let all = registers.listing();
    let filtered: Vec<_> = if names.is_empty() {
        all
    } else {
        all.into_iter().filter(|(n, _)| names.contains(n)).collect()
    };
    filtered
        .iter()
        .map(|(n, r)| format_register_line(*n, r))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

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
            let text = self.0[range.start.line].clone();
            self.0[range.start.line] = String::new();
            let _ = range;
            text
        }
        fn insert(&mut self, pos: Position, text: &str) -> Position {
            self.0[pos.line] = text.to_string();
            Position::new(pos.line, text.chars().count())
        }
        fn replace_range(&mut self, range: Range, text: &str) -> Position {
            self.0[range.start.line] = text.to_string();
            Position::new(range.start.line, text.chars().count())
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
    fn substitute_replaces_first_match_per_line_without_g() {
        let mut h = Lines(vec!["foo foo".to_string()]);
        let sub = Substitution {
            pattern: "foo".into(),
            replacement: "bar".into(),
            global: false,
            confirm: false,
            ignore_case: None,
        };
        substitute_range(&mut h, (0, 0), &sub, false, false).unwrap();
        assert_eq!(h.0[0], "bar foo");
    }

    #[test]
    fn substitute_global_flag_replaces_every_match() {
        let mut h = Lines(vec!["foo foo".to_string()]);
        let sub = Substitution {
            pattern: "foo".into(),
            replacement: "bar".into(),
            global: true,
            confirm: false,
            ignore_case: None,
        };
        substitute_range(&mut h, (0, 0), &sub, false, false).unwrap();
        assert_eq!(h.0[0], "bar bar");
    }

    #[test]
    fn substitute_with_no_match_errors() {
        let mut h = Lines(vec!["foo".to_string()]);
        let sub = Substitution {
            pattern: "xyz".into(),
            replacement: "bar".into(),
            global: false,
            confirm: false,
            ignore_case: None,
        };
        assert!(substitute_range(&mut h, (0, 0), &sub, false, false).is_err());
    }

    #[test]
    fn registers_listing_renders_control_chars() {
        let mut regs = Registers::new();
        regs.record(Some('a'), Register { text: "line1\n".into(), mode: RangeMode::Line }, false);
        let out = registers_listing(&regs, &[]);
        assert!(out.contains("^J"));
    }
}
