//! Recording and replay of the `.` dot command: `.` must not re-invoke
//! maps, and a count supplied to `.` *replaces* rather than multiplies
//! the recorded one.

use crate::input::{Input, KeyCode};

#[derive(Debug, Clone, Default)]
pub struct DotCommand {
    recording: Vec<Input>,
    recorded: Vec<Input>,
    active: bool,
}

impl DotCommand {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begins recording a new change-producing top-level command,
    /// discarding whatever was being recorded (a prior command must have
    /// completed or been cancelled already).
    pub fn start(&mut self) {
        self.recording.clear();
        self.active = true;
    }

    pub fn is_recording(&self) -> bool {
        self.active
    }

    pub fn push(&mut self, input: Input) {
        if self.active {
            self.recording.push(input);
        }
    }

    /// Finalizes the in-progress recording as the new replay target.
    pub fn commit(&mut self) {
        if self.active {
            self.recorded = std::mem::take(&mut self.recording);
        }
        self.active = false;
    }

    /// Abandons the in-progress recording (e.g. `<Esc>` from a pending
    /// operator) without touching the previously-recorded command.
    pub fn cancel(&mut self) {
        self.recording.clear();
        self.active = false;
    }

    pub fn has_recorded(&self) -> bool {
        !self.recorded.is_empty()
    }

    /// Builds the input sequence `.` should replay: the recorded body
    /// with its leading count digits swapped for `count_override` when
    /// one is given, left untouched otherwise. A leading `0` is never
    /// part of a count (it's the "start of line" motion), matching
    /// `Count`'s own digit-accumulation rule.
    pub fn replay(&self, count_override: Option<u32>) -> Vec<Input> {
        let mut prefix_len = 0;
        for (i, inp) in self.recorded.iter().enumerate() {
            match inp.code {
                KeyCode::Char(c) if c.is_ascii_digit() && !(i == 0 && c == '0') => {
                    prefix_len = i + 1;
                }
                _ => break,
            }
        }
        let tail = &self.recorded[prefix_len..];
        match count_override {
            Some(n) => n
                .to_string()
                .chars()
                .map(Input::char)
                .chain(tail.iter().copied())
                .collect(),
            None => self.recorded.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replay_without_override_returns_recorded_verbatim() {
        let mut d = DotCommand::new();
        d.start();
        for c in "3dw".chars() {
            d.push(Input::char(c));
        }
        d.commit();
        assert_eq!(d.replay(None).len(), 3);
    }

    #[test]
    fn replay_with_override_replaces_recorded_count() {
        let mut d = DotCommand::new();
        d.start();
        for c in "3dw".chars() {
            d.push(Input::char(c));
        }
        d.commit();
        let replayed = d.replay(Some(5));
        let chars: String = replayed
            .iter()
            .filter_map(|i| match i.code {
                KeyCode::Char(c) => Some(c),
                _ => None,
            })
            .collect();
        assert_eq!(chars, "5dw");
    }

    #[test]
    fn cancel_discards_pending_recording_only() {
        let mut d = DotCommand::new();
        d.start();
        d.push(Input::char('x'));
        d.commit();
        d.start();
        d.push(Input::char('y'));
        d.cancel();
        assert_eq!(d.replay(None).len(), 1);
    }
}
