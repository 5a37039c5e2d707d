use crate::{CharExt as _, SourceLocation};

/// Cursor over an immutable source string.
///
/// The buffer never owns or mutates the source. Backtracking is done by
/// taking a [`SourceLocation`] with [`InputBuffer::checkpoint`] and handing it
/// back to [`InputBuffer::reset`].
#[derive(Debug, Clone)]
pub struct InputBuffer<'s> {
    source: &'s str,
    current_location: SourceLocation,
    /// Soft end of the current container. `peek()` reports EOF here, but
    /// constructs that span lines may move the limit with `set_limit()`.
    limit: usize,
    /// Offset of every `\n` and `\r` in the source, ascending.
    line_endings: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input<T> {
    Value(T),
    Eof,
}

impl<'s> InputBuffer<'s> {
    pub fn new(source: &'s str) -> Self {
        Self {
            source,
            current_location: SourceLocation::default(),
            limit: source.len(),
            line_endings: source
                .match_indices(['\n', '\r'])
                .map(|(offset, _)| offset)
                .collect(),
        }
    }

    #[inline]
    pub fn source(&self) -> &'s str {
        self.source
    }

    #[inline]
    fn rest(&self) -> &'s str {
        &self.source[self.current_location.offset..self.limit]
    }

    #[inline]
    pub fn peek(&self) -> Input<char> {
        self.peek_nth::<0>()
    }

    #[inline]
    pub fn peek_nth<const N: usize>(&self) -> Input<char> {
        match self.rest().chars().nth(N) {
            Some(ch) => Input::Value(ch),
            None => Input::Eof,
        }
    }

    #[inline]
    pub fn peek2(&self) -> [Input<char>; 2] {
        let mut chars = self.rest().chars();
        let first = chars.next().map_or(Input::Eof, Input::Value);
        let second = chars.next().map_or(Input::Eof, Input::Value);
        [first, second]
    }

    #[inline]
    pub fn starts_with(&self, needle: &str) -> bool {
        self.rest().starts_with(needle)
    }

    #[inline]
    pub fn pop(&mut self) -> Input<char> {
        let mut chars = self.rest().chars();
        match chars.next() {
            Some(ch) => {
                // Peek past the limit so that a `\r\n` split by the limit is
                // still counted as one line break.
                let next = self.source[self.current_location.offset + ch.len_utf8()..]
                    .chars()
                    .next();
                self.current_location.advance(ch, next);
                Input::Value(ch)
            }
            None => Input::Eof,
        }
    }

    /// Pop `n` chars, stopping early at the limit.
    #[inline]
    pub fn pop_n(&mut self, n: usize) {
        for _ in 0..n {
            if self.pop() == Input::Eof {
                break;
            }
        }
    }

    /// Pop chars while `pred` holds, returning how many were popped.
    pub fn pop_while(&mut self, mut pred: impl FnMut(char) -> bool) -> usize {
        let mut count = 0;
        while let Input::Value(ch) = self.peek() {
            if !pred(ch) {
                break;
            }
            self.pop();
            count += 1;
        }
        count
    }

    /// Pop one line ending (`\n`, `\r\n` or `\r`). Returns false if the cursor
    /// is not at a line ending.
    pub fn pop_line_ending(&mut self) -> bool {
        match self.peek2() {
            [Input::Value('\r'), Input::Value('\n')] => {
                self.pop_n(2);
                true
            }
            [Input::Value(ch), _] if ch.is_linebreak() => {
                self.pop();
                true
            }
            _ => false,
        }
    }

    /// Offset of the next line ending (or the limit), starting at the cursor.
    pub fn line_end(&self) -> usize {
        let offset = self.current_location.offset;
        let index = self.line_endings.partition_point(|&end| end < offset);
        self.line_endings
            .get(index)
            .map_or(self.limit, |&end| end.min(self.limit))
    }

    /// The rest of the current line, excluding the line ending.
    pub fn rest_of_line(&self) -> &'s str {
        &self.source[self.current_location.offset..self.line_end()]
    }

    #[inline]
    pub fn current_location(&self) -> SourceLocation {
        self.current_location
    }

    #[inline]
    pub fn checkpoint(&self) -> SourceLocation {
        self.current_location
    }

    #[inline]
    pub fn reset(&mut self, checkpoint: SourceLocation) {
        self.current_location = checkpoint;
    }

    #[inline]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Move the soft limit. The limit is clamped to the source length and is
    /// never placed before the cursor.
    #[inline]
    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit.clamp(self.current_location.offset, self.source.len());
    }

    /// Lift the soft limit, making the whole remaining source visible.
    #[inline]
    pub fn clear_limit(&mut self) {
        self.limit = self.source.len();
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.current_location.offset >= self.limit
    }

    /// True when the end of the whole source has been reached, regardless of
    /// the soft limit.
    #[inline]
    pub fn is_source_eof(&self) -> bool {
        self.current_location.offset >= self.source.len()
    }
}
