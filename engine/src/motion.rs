//! Motions, the "move type" each carries, and text objects. Grounded in
//! `core/src/cursor.rs`'s `Motion` enum (extended here from its four
//! directions to the full vim motion/text-object set) and in
//! `fakevimhandler.cpp`'s inclusive/exclusive bookkeeping around each
//! motion, which an operator consults to decide whether the character
//! under the end position is part of its span.

use crate::edit::Inclusivity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Left,
    Right,
    Up,
    Down,
    LineStart,
    LineFirstNonBlank,
    LineEnd,
    FileStart,
    FileEnd,
    GotoLine,
    WordForward { big: bool },
    WordForwardEnd { big: bool },
    WordBackward { big: bool },
    ParagraphForward,
    ParagraphBackward,
    SentenceForward,
    SentenceBackward,
    FindChar { target: char, till: bool, forward: bool },
    RepeatFind { reversed: bool },
    MatchingBracket,
    SearchNext { forward: bool },
    Mark(char),
    MarkLine(char),
}

impl Motion {
    /// Whether the motion is exclusive, inclusive, or promotes the
    /// operator's span to full lines.
    pub fn inclusivity(self) -> Inclusivity {
        match self {
            Motion::Down | Motion::Up | Motion::GotoLine | Motion::FileStart | Motion::FileEnd
            | Motion::ParagraphForward
            | Motion::ParagraphBackward
            | Motion::MarkLine(_) => Inclusivity::Linewise,
            Motion::Right
            | Motion::WordForwardEnd { .. }
            | Motion::FindChar { till: false, .. }
            | Motion::MatchingBracket
            | Motion::LineEnd => Inclusivity::Inclusive,
            _ => Inclusivity::Exclusive,
        }
    }

    /// A handful of motions become linewise specifically when used as an
    /// operator's target even though they aren't always linewise
    /// (`Down`/`Up` always are; word motions never are) — callers use
    /// `inclusivity` directly, this exists only for documentation of the
    /// rule at the call site in `executor.rs`.
    pub fn is_jump(self) -> bool {
        matches!(
            self,
            Motion::GotoLine
                | Motion::FileStart
                | Motion::FileEnd
                | Motion::Mark(_)
                | Motion::MarkLine(_)
                | Motion::SearchNext { .. }
                | Motion::MatchingBracket
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextObjectKind {
    Inner,
    Around,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextObject {
    Word { big: bool },
    Sentence,
    Paragraph,
    Quote(char),
    Bracket(char),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_motions_are_linewise() {
        assert_eq!(Motion::Down.inclusivity(), Inclusivity::Linewise);
        assert_eq!(Motion::Up.inclusivity(), Inclusivity::Linewise);
    }

    #[test]
    fn word_motion_is_exclusive() {
        assert_eq!(
            Motion::WordForward { big: false }.inclusivity(),
            Inclusivity::Exclusive
        );
    }

    #[test]
    fn word_end_is_inclusive() {
        assert_eq!(
            Motion::WordForwardEnd { big: false }.inclusivity(),
            Inclusivity::Inclusive
        );
    }
}
