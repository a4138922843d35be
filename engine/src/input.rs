//! Raw key buffering, the 1000 ms ambiguous-mapping timeout, and the
//! one-shot "pass this key straight to the host" flag. Grounded in the
//! teacher's `core/src/keymap.rs` `KeyMap::on_key`/`state` buffer (which
//! accumulates a `Vec<KeyEvent>` while a chord is ambiguous) and
//! `core/src/util.rs`'s `KeyDisplay` for the key-notation grammar used to
//! render a pending chord back to the host for its command-line/status
//! area.

use std::time::Duration;

pub const MAPPING_TIMEOUT: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Char(char),
    Backspace,
    Enter,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    PageUp,
    PageDown,
    Tab,
    BackTab,
    Delete,
    Insert,
    Esc,
    F(u8),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        ctrl: false,
        alt: false,
        shift: false,
    };

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

/// One raw key event, as the host observes it — the `Inputs`/`Mapping`
/// layer groups these into the sequences a mapping key-notation string
/// (`<C-w>h`) resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Input {
    pub code: KeyCode,
    pub mods: Modifiers,
    /// Some hosts deliver composed text alongside a raw key (IME input,
    /// bracketed paste); carried through so the ExInterpreter's text
    /// entry doesn't have to reconstruct it from `code`.
    pub text: Option<char>,
}

impl Input {
    pub fn key(code: KeyCode) -> Self {
        Self {
            code,
            mods: Modifiers::NONE,
            text: None,
        }
    }

    pub fn ctrl(c: char) -> Self {
        Self {
            code: KeyCode::Char(c),
            mods: Modifiers {
                ctrl: true,
                ..Modifiers::NONE
            },
            text: None,
        }
    }

    pub fn char(c: char) -> Self {
        Self {
            code: KeyCode::Char(c),
            mods: Modifiers::NONE,
            text: Some(c),
        }
    }

    /// Equality used for map-table lookups: ignores `Shift`, since shift
    /// is already folded into `text`/the produced character.
    pub fn matches_for_map(&self, other: &Input) -> bool {
        self.code == other.code && self.mods.ctrl == other.mods.ctrl && self.mods.alt == other.mods.alt
    }

    /// Renders Vim's `<Notation>` for non-printable/modified keys and the
    /// literal character otherwise — mirrors `core/src/util.rs`'s
    /// `KeyDisplay`.
    pub fn notation(&self) -> String {
        if self.mods.is_none() {
            match self.code {
                KeyCode::Char(c) => return c.to_string(),
                KeyCode::Backspace => return "<Bs>".to_string(),
                KeyCode::Enter => return "<Ret>".to_string(),
                KeyCode::Esc => return "<Esc>".to_string(),
                KeyCode::Left => return "<Left>".to_string(),
                KeyCode::Right => return "<Right>".to_string(),
                KeyCode::Up => return "<Up>".to_string(),
                KeyCode::Down => return "<Down>".to_string(),
                KeyCode::Home => return "<Home>".to_string(),
                KeyCode::End => return "<End>".to_string(),
                KeyCode::Tab => return "<Tab>".to_string(),
                KeyCode::Delete => return "<Del>".to_string(),
                _ => {}
            }
        }
        if self.mods.ctrl && !self.mods.alt {
            if let KeyCode::Char(c) = self.code {
                return format!("<C-{}>", c);
            }
        }
        if self.mods.alt {
            if let KeyCode::Char(c) = self.code {
                return format!("<M-{}>", c);
            }
        }
        match self.code {
            KeyCode::Char(c) => c.to_string(),
            other => format!("<{:?}>", other),
        }
    }
}

/// A resolved group of inputs handed to the `ModeMachine`/`CommandExecutor`
/// once the pipeline is no longer ambiguous about a chord.
#[derive(Debug, Clone, Default)]
pub struct Inputs(pub Vec<Input>);

impl Inputs {
    /// Parses a `:map`/`:normal`/dot-command key-notation string such as
    /// `"<C-w>h"` or `"ddiHello<Esc>"`. Bracketed notation is
    /// case-insensitive and mixed forms (`<c-a>`, `<C-A>`) are accepted;
    /// a `<` with no matching `>` is treated as a literal `<`.
    pub fn parse(s: &str) -> Self {
        let mut out = Vec::new();
        let mut rest = s;
        while let Some(c) = rest.chars().next() {
            if c == '<' {
                if let Some(close) = rest.find('>') {
                    let token = &rest[1..close];
                    if let Some(input) = parse_notation(token) {
                        out.push(input);
                        rest = &rest[close + 1..];
                        continue;
                    }
                }
            }
            out.push(Input::char(c));
            rest = &rest[c.len_utf8()..];
        }
        Inputs(out)
    }
}

fn parse_notation(token: &str) -> Option<Input> {
    let lower = token.to_ascii_lowercase();
    match lower.as_str() {
        "esc" | "escape" => return Some(Input::key(KeyCode::Esc)),
        "cr" | "return" | "enter" => return Some(Input::key(KeyCode::Enter)),
        "tab" => return Some(Input::key(KeyCode::Tab)),
        "s-tab" => return Some(Input::key(KeyCode::BackTab)),
        "bs" | "backspace" => return Some(Input::key(KeyCode::Backspace)),
        "space" => return Some(Input::char(' ')),
        "up" => return Some(Input::key(KeyCode::Up)),
        "down" => return Some(Input::key(KeyCode::Down)),
        "left" => return Some(Input::key(KeyCode::Left)),
        "right" => return Some(Input::key(KeyCode::Right)),
        "home" => return Some(Input::key(KeyCode::Home)),
        "end" => return Some(Input::key(KeyCode::End)),
        "pageup" => return Some(Input::key(KeyCode::PageUp)),
        "pagedown" => return Some(Input::key(KeyCode::PageDown)),
        "del" | "delete" => return Some(Input::key(KeyCode::Delete)),
        "insert" => return Some(Input::key(KeyCode::Insert)),
        _ => {}
    }
    if let Some(rest) = lower.strip_prefix("c-") {
        let c = rest.chars().next()?;
        return Some(Input::ctrl(c));
    }
    if lower.starts_with("s-") && token.len() > 2 {
        let c = token[2..].chars().next()?;
        return Some(Input::char(c.to_ascii_uppercase()));
    }
    if let Some(rest) = lower.strip_prefix('f') {
        if let Ok(n) = rest.parse::<u8>() {
            return Some(Input::key(KeyCode::F(n)));
        }
    }
    None
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Not enough information yet; the host should keep buffering and
    /// arm/renew the `MAPPING_TIMEOUT` timer.
    Undecided,
    /// A fully-resolved batch of inputs ready for the mode machine.
    Ready(Vec<Input>),
    /// The pipeline decided the buffered input(s) should go straight to
    /// the host unmodified (e.g. while `passing` is set).
    Passthrough(Vec<Input>),
}

/// Buffers raw input until a pending mapping is resolved (see
/// `crate::keymap::MappingResolver`) or the ambiguity timeout elapses.
/// The pipeline itself knows nothing about *what* a mapping means; it
/// only knows how long to wait. `Engine` drives it by calling
/// `MappingResolver::lookup` against the buffer after every `on_event`.
#[derive(Debug, Default)]
pub struct InputPipeline {
    buffer: Vec<Input>,
    passing: bool,
}

impl InputPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_pass(&mut self) {
        self.passing = true;
    }

    pub fn is_passing(&self) -> bool {
        self.passing
    }

    pub fn push(&mut self, input: Input) -> &[Input] {
        if self.passing {
            self.passing = false;
        }
        self.buffer.push(input);
        &self.buffer
    }

    pub fn buffered(&self) -> &[Input] {
        &self.buffer
    }

    pub fn take(&mut self) -> Vec<Input> {
        std::mem::take(&mut self.buffer)
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Called when the host's `MAPPING_TIMEOUT` timer fires with no
    /// further input arriving: whatever is buffered is flushed as-is.
    pub fn on_timeout(&mut self) -> PipelineOutcome {
        if self.buffer.is_empty() {
            PipelineOutcome::Undecided
        } else {
            PipelineOutcome::Ready(self.take())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notation_renders_control_keys() {
        assert_eq!(Input::ctrl('w').notation(), "<C-w>");
        assert_eq!(Input::key(KeyCode::Esc).notation(), "<Esc>");
        assert_eq!(Input::char('x').notation(), "x");
    }

    #[test]
    fn passing_flag_is_one_shot() {
        let mut p = InputPipeline::new();
        p.begin_pass();
        assert!(p.is_passing());
        p.push(Input::char('x'));
        assert!(!p.is_passing());
    }

    #[test]
    fn parses_mixed_case_control_notation() {
        let a = Inputs::parse("<c-a>");
        let b = Inputs::parse("<C-A>");
        assert_eq!(a.0, vec![Input::ctrl('a')]);
        assert_eq!(b.0, vec![Input::ctrl('a')]);
    }

    #[test]
    fn parses_plain_and_notated_keys_together() {
        let parsed = Inputs::parse("dd<Esc>.");
        assert_eq!(
            parsed.0,
            vec![
                Input::char('d'),
                Input::char('d'),
                Input::key(KeyCode::Esc),
                Input::char('.'),
            ]
        );
    }

    #[test]
    fn unmatched_angle_bracket_is_literal() {
        let parsed = Inputs::parse("a<b");
        assert_eq!(parsed.0, vec![Input::char('a'), Input::char('<'), Input::char('b')]);
    }

    #[test]
    fn timeout_flushes_buffer() {
        let mut p = InputPipeline::new();
        p.push(Input::char('g'));
        match p.on_timeout() {
            PipelineOutcome::Ready(inputs) => assert_eq!(inputs.len(), 1),
            other => panic!("expected Ready, got {other:?}"),
        }
    }
}
