//
// host.rs
// Copyright (C) 2022 matthew <matthew@matthew-VirtualBox>
// Distributed under terms of the MIT license.
//

//! A `HostBridge` over an in-memory `Vec<String>` buffer, backed by real
//! files on disk. The character-level `delete_range`/`insert` logic and
//! the snapshot-based undo stack mirror `vim-engine`'s own test doubles
//! (`engine/tests/support/mock_host.rs`, `engine/tests/support/undo_host.rs`)
//! scaled up with the file and shell I/O a standalone binary actually
//! needs, the way `core/src/buffer.rs`'s `Buffer` backs the teacher's
//! own `Window`.

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use vim_engine::edit::{Position, Range, RangeMode};
use vim_engine::host::HostBridge;
use vim_engine::message::Message;

pub struct TerminalHost {
    lines: Vec<String>,
    cursor: Position,
    file: Option<PathBuf>,
    modified: bool,
    /// Set from `Args::read_only`; `-R` has no counterpart in
    /// `Settings`'s option table, so it's enforced here instead, the way
    /// `write_file` is the only place a real `:w` can fail on it.
    read_only: bool,
    clipboard: Option<(String, RangeMode)>,
    last_message: Option<Message>,
    undo_stack: Vec<(Vec<String>, Position)>,
    redo_stack: Vec<(Vec<String>, Position)>,
    pending_snapshot: Option<(Vec<String>, Position)>,
    depth: usize,
    /// Mirrors the engine's own `shiftwidth` default (`settings.rs`); the
    /// two aren't linked, so a `:set shiftwidth=N` only reaches the
    /// engine's copy. Good enough for `>>`/`<<` until a real settings
    /// channel to the host exists.
    shiftwidth: usize,
}

impl TerminalHost {
    pub fn empty() -> Self {
        Self {
            lines: vec![String::new()],
            cursor: Position::default(),
            file: None,
            modified: false,
            read_only: false,
            clipboard: None,
            last_message: None,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            pending_snapshot: None,
            depth: 0,
            shiftwidth: 8,
        }
    }

    pub fn open(path: PathBuf) -> std::io::Result<Self> {
        let mut host = Self::empty();
        if path.exists() {
            let text = std::fs::read_to_string(&path)?;
            host.lines = split_lines(&text);
        }
        host.file = Some(path);
        host.modified = false;
        Ok(host)
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn cursor_pos(&self) -> Position {
        self.cursor
    }

    pub fn file_display(&self) -> &str {
        self.file
            .as_ref()
            .and_then(|p| p.to_str())
            .unwrap_or("[No Name]")
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    pub fn take_message(&mut self) -> Option<Message> {
        self.last_message.take()
    }
}

fn split_lines(text: &str) -> Vec<String> {
    if text.is_empty() {
        return vec![String::new()];
    }
    let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
    // A trailing newline produces one spurious empty element; every real
    // vim buffer ends with an implicit final newline, so drop it rather
    // than showing a phantom blank last line.
    if text.ends_with('\n') {
        lines.pop();
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

impl HostBridge for TerminalHost {
    fn line_count(&self) -> usize {
        self.lines.len()
    }

    fn line(&self, line: usize) -> String {
        self.lines.get(line).cloned().unwrap_or_default()
    }

    fn cursor(&self) -> Position {
        self.cursor
    }

    fn set_cursor(&mut self, pos: Position) {
        self.cursor = pos;
    }

    fn delete_range(&mut self, range: Range) -> String {
        self.modified = true;
        match range.mode {
            RangeMode::Line => {
                let last = range.end.line.min(self.lines.len().saturating_sub(1));
                let mut removed = String::new();
                for _ in range.start.line..=last {
                    if range.start.line >= self.lines.len() {
                        break;
                    }
                    removed.push_str(&self.lines.remove(range.start.line));
                    removed.push('\n');
                }
                if self.lines.is_empty() {
                    self.lines.push(String::new());
                }
                removed
            }
            RangeMode::LineExclusive => {
                let last = range.end.line.min(self.lines.len().saturating_sub(1));
                let mut removed = std::mem::take(&mut self.lines[range.start.line]);
                removed.push('\n');
                for _ in range.start.line..last {
                    if range.start.line + 1 >= self.lines.len() {
                        break;
                    }
                    removed.push_str(&self.lines.remove(range.start.line + 1));
                    removed.push('\n');
                }
                removed
            }
            _ if range.start.line == range.end.line => {
                let line = &mut self.lines[range.start.line];
                let cs: Vec<char> = line.chars().collect();
                let end = range.end.col.min(cs.len());
                let start = range.start.col.min(end);
                let removed: String = cs[start..end].iter().collect();
                *line = cs[..start].iter().chain(cs[end..].iter()).collect();
                removed
            }
            _ => {
                let end_line = range.end.line.min(self.lines.len().saturating_sub(1));
                let tail: String = self.lines[end_line].chars().skip(range.end.col).collect();
                let mut removed = String::new();
                for l in range.start.line..=end_line {
                    removed.push_str(&self.lines[l]);
                    removed.push('\n');
                }
                let head: String = self.lines[range.start.line].chars().take(range.start.col).collect();
                self.lines.splice(range.start.line..=end_line, [head + &tail]);
                removed
            }
        }
    }

    fn insert(&mut self, pos: Position, text: &str) -> Position {
        self.modified = true;
        if text.contains('\n') {
            let mut parts: Vec<String> = text.split('\n').map(str::to_string).collect();
            let line = self.lines[pos.line].clone();
            let cs: Vec<char> = line.chars().collect();
            let at = pos.col.min(cs.len());
            let head: String = cs[..at].iter().collect();
            let tail: String = cs[at..].iter().collect();
            let last = parts.pop().unwrap();
            let last_len = last.chars().count();
            let mut new_lines = vec![head + &parts.remove(0)];
            new_lines.extend(parts);
            new_lines.push(last + &tail);
            let n = new_lines.len();
            self.lines.splice(pos.line..=pos.line, new_lines);
            Position::new(pos.line + n - 1, last_len)
        } else {
            let line = &mut self.lines[pos.line];
            let mut cs: Vec<char> = line.chars().collect();
            let at = pos.col.min(cs.len());
            for (i, c) in text.chars().enumerate() {
                cs.insert(at + i, c);
            }
            *line = cs.into_iter().collect();
            Position::new(pos.line, at + text.chars().count())
        }
    }

    fn begin_undo_group(&mut self) {
        if self.depth == 0 {
            self.pending_snapshot = Some((self.lines.clone(), self.cursor));
        }
        self.depth += 1;
    }

    fn end_undo_group(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 {
            if let Some(snapshot) = self.pending_snapshot.take() {
                self.undo_stack.push(snapshot);
                self.redo_stack.clear();
            }
        }
    }

    fn undo(&mut self) -> bool {
        let Some((lines, cursor)) = self.undo_stack.pop() else {
            return false;
        };
        self.redo_stack.push((self.lines.clone(), self.cursor));
        self.lines = lines;
        self.cursor = cursor;
        true
    }

    fn redo(&mut self) -> bool {
        let Some((lines, cursor)) = self.redo_stack.pop() else {
            return false;
        };
        self.undo_stack.push((self.lines.clone(), self.cursor));
        self.lines = lines;
        self.cursor = cursor;
        true
    }

    fn file_name(&self) -> Option<String> {
        self.file.as_ref().and_then(|p| p.to_str()).map(str::to_string)
    }

    fn write_file(&mut self, path: Option<&str>) -> std::io::Result<()> {
        if self.read_only && path.is_none() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "E45: 'readonly' option is set (add ! to override)",
            ));
        }
        let target = match path {
            Some(p) => PathBuf::from(p),
            None => self
                .file
                .clone()
                .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "E32: No file name"))?,
        };
        let mut text = self.lines.join("\n");
        text.push('\n');
        std::fs::write(&target, text)?;
        if path.is_none() {
            self.modified = false;
        }
        if self.file.is_none() {
            self.file = Some(target);
        }
        Ok(())
    }

    fn read_file(&mut self, path: &str, at: Position) -> std::io::Result<()> {
        let text = std::fs::read_to_string(Path::new(path))?;
        let inserted = if self.lines.len() == 1 && self.lines[0].is_empty() {
            split_lines(&text)
        } else {
            let mut new_lines = split_lines(&text);
            new_lines.push(String::new());
            new_lines
        };
        let at_line = at.line.min(self.lines.len());
        if self.lines.len() == 1 && self.lines[0].is_empty() && at_line == 0 {
            self.lines = inserted;
        } else {
            let mut tail = self.lines.split_off(at_line);
            self.lines.extend(inserted);
            self.lines.append(&mut tail);
        }
        self.modified = true;
        Ok(())
    }

    fn run_shell(&mut self, cmd: &str, input: Option<&str>) -> std::io::Result<String> {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(cmd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        if let Some(text) = input {
            child
                .stdin
                .as_mut()
                .expect("stdin was requested with Stdio::piped")
                .write_all(text.as_bytes())?;
        }
        drop(child.stdin.take());
        let output = child.wait_with_output()?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn show_message(&mut self, message: Message) {
        self.last_message = Some(message);
    }

    fn set_clipboard(&mut self, text: &str, mode: RangeMode) {
        self.clipboard = Some((text.to_string(), mode));
    }

    fn get_clipboard(&self) -> Option<(String, RangeMode)> {
        self.clipboard.clone()
    }

    fn indent_region(&mut self, start: usize, end: usize, typed_char: char) {
        let last = end.min(self.lines.len().saturating_sub(1));
        match typed_char {
            '>' => {
                let pad: String = std::iter::repeat(' ').take(self.shiftwidth).collect();
                for line in &mut self.lines[start..=last] {
                    if !line.is_empty() {
                        line.insert_str(0, &pad);
                    }
                }
            }
            '<' => {
                for line in &mut self.lines[start..=last] {
                    let mut removed = 0;
                    while removed < self.shiftwidth && line.starts_with(' ') {
                        line.remove(0);
                        removed += 1;
                    }
                }
            }
            // `=` asks for a language-aware reformat; nothing here knows
            // the language, so leave the text alone rather than guess.
            _ => {}
        }
        self.modified = true;
    }

    fn matching_bracket(&self, pos: Position) -> Option<Position> {
        const PAIRS: &[(char, char)] = &[('(', ')'), ('[', ']'), ('{', '}')];
        let line = self.line(pos.line);
        let chars: Vec<char> = line.chars().collect();
        let here = *chars.get(pos.col)?;
        if let Some(&(open, close)) = PAIRS.iter().find(|(o, c)| *o == here || *c == here) {
            if here == open {
                self.scan_forward(pos, open, close)
            } else {
                self.scan_backward(pos, open, close)
            }
        } else {
            None
        }
    }
}

impl TerminalHost {
    fn scan_forward(&self, from: Position, open: char, close: char) -> Option<Position> {
        let mut depth = 0i32;
        let mut line = from.line;
        let mut col = from.col;
        loop {
            let text = self.line(line);
            let chars: Vec<char> = text.chars().collect();
            while col < chars.len() {
                let c = chars[col];
                if c == open {
                    depth += 1;
                } else if c == close {
                    depth -= 1;
                    if depth == 0 {
                        return Some(Position::new(line, col));
                    }
                }
                col += 1;
            }
            line += 1;
            col = 0;
            if line >= self.line_count() {
                return None;
            }
        }
    }

    fn scan_backward(&self, from: Position, open: char, close: char) -> Option<Position> {
        let mut depth = 0i32;
        let mut line = from.line;
        let mut col = from.col as isize;
        loop {
            let text = self.line(line);
            let chars: Vec<char> = text.chars().collect();
            while col >= 0 {
                let c = chars[col as usize];
                if c == close {
                    depth += 1;
                } else if c == open {
                    depth -= 1;
                    if depth == 0 {
                        return Some(Position::new(line, col as usize));
                    }
                }
                col -= 1;
            }
            if line == 0 {
                return None;
            }
            line -= 1;
            col = self.line(line).chars().count() as isize - 1;
        }
    }
}

impl Default for TerminalHost {
    fn default() -> Self {
        Self::empty()
    }
}

pub fn mode_label(mode: vim_engine::Mode) -> &'static str {
    use vim_engine::mode::VisualMode;
    use vim_engine::Mode::*;
    match mode {
        Normal => "",
        Insert => "-- INSERT --",
        Replace => "-- REPLACE --",
        Visual(VisualMode::Char) => "-- VISUAL --",
        Visual(VisualMode::Line) => "-- VISUAL LINE --",
        Visual(VisualMode::Block) => "-- VISUAL BLOCK --",
        Cmdline => "",
    }
}
