use std::collections::HashMap;

use crate::{
    CharExt as _, Construct, ConstructFlags, Constructs, EventKind, Input, InputBuffer,
    SourceLocation, Span, StringExt as _, TokenType, Tokens,
};

/// Tokenizer state machine driving flow and text constructs over one source
/// buffer.
///
/// Constructs receive the tokenizer by reference and use the capability set
/// [`enter`](Self::enter), [`exit`](Self::exit), [`consume`](Self::consume)
/// and [`attempt`](Self::attempt). Events are appended to an arena which is
/// rolled back whenever an attempt fails, so a failed construct leaves no
/// trace.
pub struct Tokenizer<'s, 'c> {
    input: InputBuffer<'s>,
    tokens: Tokens,
    constructs: &'c Constructs,
    /// Whether text constructs may consume past the current container limit.
    overflow: bool,
    /// Offsets of every occurrence of a marker in the source, built on first
    /// lookup.
    markers: HashMap<&'static str, Vec<usize>>,
}

/// Tokenize a whole document.
pub fn tokenize(source: &str, constructs: &Constructs) -> Tokens {
    let mut tokenizer = Tokenizer::new(source, constructs);
    tokenizer.flow();
    tracing::trace!(events = tokenizer.tokens.len(), "tokenized document");
    tokenizer.tokens
}

impl<'s, 'c> Tokenizer<'s, 'c> {
    pub fn new(source: &'s str, constructs: &'c Constructs) -> Self {
        Self {
            input: InputBuffer::new(source),
            tokens: Tokens::default(),
            constructs,
            overflow: false,
            markers: HashMap::new(),
        }
    }

    #[inline]
    pub fn input(&self) -> &InputBuffer<'s> {
        &self.input
    }

    #[inline]
    pub fn input_mut(&mut self) -> &mut InputBuffer<'s> {
        &mut self.input
    }

    #[inline]
    pub fn current_location(&self) -> SourceLocation {
        self.input.current_location()
    }

    /// True when the text construct being attempted may continue past the
    /// end of its container, i.e. onto following lines of a paragraph.
    #[inline]
    pub fn can_overflow(&self) -> bool {
        self.overflow
    }

    #[inline]
    pub fn enter(&mut self, ty: TokenType) {
        let location = self.input.current_location();
        self.tokens.push(EventKind::Enter, ty, location);
    }

    #[inline]
    pub fn exit(&mut self, ty: TokenType) {
        let location = self.input.current_location();
        self.tokens.push(EventKind::Exit, ty, location);
    }

    #[inline]
    pub fn consume(&mut self) -> Input<char> {
        self.input.pop()
    }

    /// Enter a token at a location that has already been consumed.
    #[inline]
    pub fn enter_at(&mut self, ty: TokenType, location: SourceLocation) {
        self.tokens.push(EventKind::Enter, ty, location);
    }

    /// Exit a token at a location that has already been consumed.
    #[inline]
    pub fn exit_at(&mut self, ty: TokenType, location: SourceLocation) {
        self.tokens.push(EventKind::Exit, ty, location);
    }

    /// Record a token over a span that has already been consumed.
    pub fn token(&mut self, ty: TokenType, span: Span) {
        self.tokens.push(EventKind::Enter, ty, span.start);
        self.tokens.push(EventKind::Exit, ty, span.end);
    }

    /// Consume spaces and tabs as a [`TokenType::Whitespace`] token.
    pub fn whitespace(&mut self) -> usize {
        if !matches!(self.input.peek(), Input::Value(ch) if ch.is_space_or_tab()) {
            return 0;
        }
        self.enter(TokenType::Whitespace);
        let count = self.input.pop_while(|ch| ch.is_space_or_tab());
        self.exit(TokenType::Whitespace);
        count
    }

    /// Consume one line ending as a [`TokenType::LineEnding`] token.
    pub fn line_ending(&mut self) -> bool {
        let start = self.input.current_location();
        if self.input.pop_line_ending() {
            let end = self.input.current_location();
            self.token(TokenType::LineEnding, start.until(end));
            true
        } else {
            false
        }
    }

    /// Offset of the first occurrence of `marker` at or after `from`, anywhere
    /// in the source regardless of the limit.
    ///
    /// The source is searched once per marker. Constructs that look for a
    /// closing delimiter use this so that openers without one fail in
    /// logarithmic time instead of rescanning the rest of the document.
    pub fn find_marker(&mut self, marker: &'static str, from: usize) -> Option<usize> {
        let source = self.input.source();
        let offsets = self
            .markers
            .entry(marker)
            .or_insert_with(|| marker_offsets(source, marker));
        let index = offsets.partition_point(|&offset| offset < from);
        offsets.get(index).copied()
    }

    /// Run `construct` at the cursor. On failure the cursor, the limit and the
    /// event arena are restored to where they were.
    pub fn attempt(&mut self, construct: &dyn Construct) -> Option<Span> {
        let checkpoint = self.input.checkpoint();
        let limit = self.input.limit();
        let events = self.tokens.len();

        match construct.tokenize(self) {
            Some(span) => Some(span),
            None => {
                self.input.reset(checkpoint);
                self.input.set_limit(limit);
                self.tokens.truncate(events);
                None
            }
        }
    }

    /// Like [`attempt`](Self::attempt), but always restores state afterwards.
    pub fn check(&mut self, construct: &dyn Construct) -> bool {
        let checkpoint = self.input.checkpoint();
        let limit = self.input.limit();
        let events = self.tokens.len();

        let matched = construct.tokenize(self).is_some();

        self.input.reset(checkpoint);
        self.input.set_limit(limit);
        self.tokens.truncate(events);
        matched
    }

    fn flow(&mut self) {
        while !self.input.is_source_eof() {
            if self.blank_line() {
                continue;
            }

            let indent = line_indent_columns(self.input.rest_of_line());
            self.whitespace();

            if indent > 3 || self.flow_construct().is_none() {
                self.paragraph();
            }
            self.line_ending();
        }
    }

    fn blank_line(&mut self) -> bool {
        if !self.input.rest_of_line().is_all_spaces_and_tabs() {
            return false;
        }
        self.enter(TokenType::BlankLine);
        self.input.pop_while(|ch| ch.is_space_or_tab());
        self.input.pop_line_ending();
        self.exit(TokenType::BlankLine);
        true
    }

    fn flow_construct(&mut self) -> Option<Span> {
        let Input::Value(ch) = self.input.peek() else {
            return None;
        };
        let constructs = self.constructs;
        constructs
            .flow()
            .filter(|construct| construct.starts_with(ch))
            .find_map(|construct| self.attempt(construct))
    }

    fn paragraph(&mut self) {
        self.enter(TokenType::Paragraph);
        loop {
            let line_end = self.input.line_end();
            self.text(line_end, true);
            if !self.paragraph_continues() {
                break;
            }
            self.line_ending();
            self.whitespace();
        }
        self.exit(TokenType::Paragraph);
    }

    /// At the end of a paragraph line, decide whether the next line belongs
    /// to the same paragraph.
    fn paragraph_continues(&mut self) -> bool {
        let checkpoint = self.input.checkpoint();
        if !self.input.pop_line_ending() {
            return false;
        }

        let line = self.input.rest_of_line();
        let continues = if line.is_all_spaces_and_tabs() {
            false
        } else if line_indent_columns(line) > 3 {
            true
        } else {
            self.input.pop_while(|ch| ch.is_space_or_tab());
            !self.interrupts_paragraph()
        };

        self.input.reset(checkpoint);
        continues
    }

    fn interrupts_paragraph(&mut self) -> bool {
        let Input::Value(ch) = self.input.peek() else {
            return false;
        };
        let constructs = self.constructs;
        constructs
            .flow()
            .filter(|construct| {
                construct
                    .flags()
                    .contains(ConstructFlags::INTERRUPTS_PARAGRAPH)
                    && construct.starts_with(ch)
            })
            .any(|construct| self.check(construct))
    }

    /// Tokenize inline content from the cursor up to `limit`.
    ///
    /// With `overflow`, a text construct flagged
    /// [`ConstructFlags::SPANS_LINES`] may consume past `limit`; scanning then
    /// resumes on the line where that construct ended.
    pub fn text(&mut self, limit: usize, overflow: bool) {
        let outer_limit = self.input.limit();
        let outer_overflow = std::mem::replace(&mut self.overflow, overflow);
        let mut limit = limit;
        self.input.set_limit(limit);

        let mut data_start: Option<SourceLocation> = None;
        while let Input::Value(ch) = self.input.peek() {
            let here = self.input.current_location();
            let mark = self.tokens.len();
            if let Some(start) = data_start {
                self.token(TokenType::Data, start.until(here));
            }

            if self.text_construct(ch).is_some() {
                data_start = None;
                if self.input.current_location().offset > limit {
                    self.input.clear_limit();
                    limit = self.input.line_end();
                }
                self.input.set_limit(limit);
            } else {
                self.tokens.truncate(mark);
                data_start.get_or_insert(here);
                self.input.pop();
            }
        }

        if let Some(start) = data_start {
            let end = self.input.current_location();
            self.token(TokenType::Data, start.until(end));
        }

        self.overflow = outer_overflow;
        self.input.clear_limit();
        self.input.set_limit(outer_limit.max(limit));
    }

    fn text_construct(&mut self, ch: char) -> Option<Span> {
        let constructs = self.constructs;
        constructs
            .text()
            .filter(|construct| construct.starts_with(ch))
            .find_map(|construct| self.attempt(construct))
    }
}

/// Every offset at which `marker` occurs, overlapping occurrences included.
fn marker_offsets(source: &str, marker: &str) -> Vec<usize> {
    let mut offsets = vec![];
    if marker.is_empty() {
        return offsets;
    }
    let mut from = 0;
    while let Some(index) = source[from..].find(marker) {
        let offset = from + index;
        offsets.push(offset);
        from = offset + source[offset..].chars().next().map_or(1, char::len_utf8);
    }
    offsets
}

/// Indentation of a line in columns, with tabs advancing to the next
/// multiple of four.
fn line_indent_columns(line: &str) -> usize {
    let mut columns = 0;
    for ch in line.chars() {
        match ch {
            ' ' => columns += 1,
            '\t' => columns += 4 - columns % 4,
            _ => break,
        }
    }
    columns
}
