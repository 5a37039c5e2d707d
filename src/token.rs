use crate::{SourceLocation, Span, Spanned, SpannedExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TokenType {
    /// A line containing only spaces and tabs, including its line ending.
    BlankLine,
    /// A `\n`, `\r\n` or `\r` between lines of the same construct.
    LineEnding,
    /// Spaces and tabs that are not content (indentation, padding).
    Whitespace,
    /// An ATX heading (`# Title`).
    AtxHeading,
    /// The run of `#` opening or closing an ATX heading.
    AtxHeadingSequence,
    /// The inline content of an ATX heading.
    AtxHeadingText,
    Paragraph,
    /// Plain text.
    Data,
    /// A code span, including its backtick fences.
    CodeText,
    /// The backtick fence of a code span.
    CodeTextSequence,
    /// The content between the fences of a code span.
    CodeTextData,
    /// An inline raw HTML tag (`<b>`, `</b>`).
    HtmlText,
    /// A character reference (`&amp;`, `&#35;`).
    CharacterReference,
    /// An HTML-style comment, in flow or text content.
    Comment,
    /// The `<!--` or `-->` delimiter of a comment.
    CommentMarker,
    /// Everything between the delimiters of a comment.
    CommentBody,
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            TokenType::BlankLine => "blank line",
            TokenType::LineEnding => "line ending",
            TokenType::Whitespace => "whitespace",
            TokenType::AtxHeading => "heading",
            TokenType::AtxHeadingSequence => "heading sequence",
            TokenType::AtxHeadingText => "heading text",
            TokenType::Paragraph => "paragraph",
            TokenType::Data => "data",
            TokenType::CodeText => "code span",
            TokenType::CodeTextSequence => "code span fence",
            TokenType::CodeTextData => "code span data",
            TokenType::HtmlText => "inline html",
            TokenType::CharacterReference => "character reference",
            TokenType::Comment => "comment",
            TokenType::CommentMarker => "comment marker",
            TokenType::CommentBody => "comment body",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Enter,
    Exit,
}

/// One half of a token: where it was entered or exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Event {
    pub kind: EventKind,
    pub ty: TokenType,
    pub location: SourceLocation,
}

/// Arena of token events produced by a tokenization sweep.
///
/// Events nest: every `Enter` is matched by an `Exit` of the same type, and
/// tokens entered in between are children of the enclosing token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tokens {
    events: Vec<Event>,
}

impl Tokens {
    #[inline]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    #[inline]
    pub(crate) fn push(&mut self, kind: EventKind, ty: TokenType, location: SourceLocation) {
        self.events.push(Event { kind, ty, location });
    }

    #[inline]
    pub(crate) fn truncate(&mut self, len: usize) {
        self.events.truncate(len);
    }

    /// Flatten the arena into spans of complete tokens, in the order they
    /// were entered.
    pub fn spans(&self) -> Vec<Spanned<TokenType>> {
        spans(&self.events)
    }
}

/// Pair up `Enter`/`Exit` events into spanned tokens, ordered by entry.
pub fn spans(events: &[Event]) -> Vec<Spanned<TokenType>> {
    let mut open: Vec<(usize, SourceLocation)> = vec![];
    let mut out: Vec<Option<Spanned<TokenType>>> = vec![];

    for event in events {
        match event.kind {
            EventKind::Enter => {
                open.push((out.len(), event.location));
                out.push(None);
            }
            EventKind::Exit => {
                let Some((index, start)) = open.pop() else {
                    continue;
                };
                out[index] = Some(event.ty.in_span(start..event.location));
            }
        }
    }

    out.into_iter().flatten().collect()
}

/// Index of the `Exit` event matching the `Enter` event at `enter`.
pub(crate) fn matching_exit(events: &[Event], enter: usize) -> usize {
    let mut depth = 0usize;
    for (index, event) in events.iter().enumerate().skip(enter) {
        match event.kind {
            EventKind::Enter => depth += 1,
            EventKind::Exit => {
                depth -= 1;
                if depth == 0 {
                    return index;
                }
            }
        }
    }
    panic!("inconsistent token stream: unmatched enter event at {enter}")
}

/// The span of the token whose `Enter` event is at `enter`.
pub(crate) fn token_span(events: &[Event], enter: usize) -> Span {
    let exit = matching_exit(events, enter);
    events[enter].location.until(events[exit].location)
}
