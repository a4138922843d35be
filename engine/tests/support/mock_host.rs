//! A minimal `HostBridge` over a `Vec<String>` buffer, grounded in
//! `examples/allisoneer-standalone_tools/vim/tests/support/mock_buffer.rs`'s
//! `MockBuffer`, adapted from grapheme-indexed `TextOps` to the
//! char-offset `HostBridge` this engine actually drives.

use vim_engine::edit::{Position, Range, RangeMode};
use vim_engine::host::HostBridge;
use vim_engine::message::Message;

pub struct MockHost {
    pub lines: Vec<String>,
    pub cursor: Position,
    pub messages: Vec<Message>,
    pub clipboard: Option<(String, vim_engine::edit::RangeMode)>,
}

impl MockHost {
    pub fn new(text: &str) -> Self {
        let lines = if text.is_empty() {
            vec![String::new()]
        } else {
            text.split('\n').map(str::to_string).collect()
        };
        Self {
            lines,
            cursor: Position::default(),
            messages: Vec::new(),
            clipboard: None,
        }
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

impl HostBridge for MockHost {
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

    fn show_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    fn set_clipboard(&mut self, text: &str, mode: vim_engine::edit::RangeMode) {
        self.clipboard = Some((text.to_string(), mode));
    }
    fn get_clipboard(&self) -> Option<(String, vim_engine::edit::RangeMode)> {
        self.clipboard.clone()
    }
}
