//! The synchronous callback surface a host editor implements. Every
//! access to text storage, undo, the clipboard, subprocesses, and
//! indentation goes through here — the engine holds no buffer of its
//! own. Grounded in `fakevimhandler.h`'s `Callback<...>` member list
//! (`indentRegion`, `moveToMatchingParenthesis`, `processOutput`,
//! `requestJumpToLocalMark`, ...) and in the trait-with-default-methods
//! shape of `examples/allisoneer-standalone_tools/vim/src/traits.rs`'s
//! `TextOps`.

use crate::edit::{Position, Range, RangeMode};
use crate::message::Message;

/// Implemented by the host editor. Most methods are required; a few
/// optional capabilities (clipboard, folding, completion) have no-op
/// defaults so a minimal host — like the test double in `engine/tests` —
/// only needs to implement buffer and cursor access.
pub trait HostBridge {
    fn line_count(&self) -> usize;
    fn line(&self, line: usize) -> String;
    fn line_len(&self, line: usize) -> usize {
        self.line(line).chars().count()
    }

    fn cursor(&self) -> Position;
    fn set_cursor(&mut self, pos: Position);

    /// Removes `range` from the buffer and returns the removed text,
    /// exactly as `Buffer::remove_char`/`join_line` do at the character
    /// level, generalized to an arbitrary span.
    fn delete_range(&mut self, range: Range) -> String;

    /// Inserts `text` at `pos`, returning the new cursor position (end of
    /// the inserted text).
    fn insert(&mut self, pos: Position, text: &str) -> Position;

    /// Replaces `range` with `text`; the default is delete-then-insert,
    /// which is correct but not necessarily what an undo-coalescing host
    /// wants, so hosts may override it.
    fn replace_range(&mut self, range: Range, text: &str) -> Position {
        self.delete_range(range);
        self.insert(range.start, text)
    }

    fn begin_undo_group(&mut self);
    fn end_undo_group(&mut self);
    /// Returns whether an undo actually happened.
    fn undo(&mut self) -> bool;
    fn redo(&mut self) -> bool;

    fn file_name(&self) -> Option<String>;
    fn write_file(&mut self, path: Option<&str>) -> std::io::Result<()>;
    fn read_file(&mut self, path: &str, at: Position) -> std::io::Result<()>;

    /// Runs `cmd` through the host's shell, optionally piping `input`,
    /// returning captured stdout — grounded in `processOutput`'s
    /// `(command, input, *output)` shape.
    fn run_shell(&mut self, cmd: &str, input: Option<&str>) -> std::io::Result<String>;

    fn show_message(&mut self, message: Message);

    fn set_clipboard(&mut self, _text: &str, _mode: RangeMode) {}
    fn get_clipboard(&self) -> Option<(String, RangeMode)> {
        None
    }

    /// `indentRegion`'s counterpart: re-indent `start..=end` (inclusive,
    /// line numbers) however the host's language-aware indenter sees fit.
    /// `typed_char` is `'>'`/`'<'` for a shift-by-one-`shiftwidth`
    /// request (`>>`/`<<`, `>`/`<` motions, visual `>`/`<`) or `'='` for
    /// a smart reformat (`==`, `=motion`) — the same three-way signal
    /// `fakevimhandler.cpp`'s `indentRegion` callback receives so a host
    /// can tell a widen from a narrow from a reflow.
    fn indent_region(&mut self, _start: usize, _end: usize, _typed_char: char) {}
    fn physical_indentation(&self, _line: usize) -> usize {
        0
    }

    /// `moveToMatchingParenthesis`'s counterpart.
    fn matching_bracket(&self, _pos: Position) -> Option<Position> {
        None
    }

    fn highlight_matches(&mut self, _needle: &str) {}
    fn mode_changed(&mut self, _insert_mode: bool) {}
}
