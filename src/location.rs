#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourceLocation {
    /// Offset in bytes from the beginning of the source.
    pub offset: usize,
    /// Line, counting from 0.
    pub line: usize,
    /// Column in chars, counting from 0.
    pub column: usize,
}

impl PartialOrd for SourceLocation {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SourceLocation {
    #[inline]
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.offset.cmp(&other.offset)
    }
}

impl SourceLocation {
    /// Step over `ch`. A `\r` immediately followed by `\n` counts as a single
    /// line break, which is handled by the caller passing the `\n` next.
    #[inline]
    pub fn advance(&mut self, ch: char, next: Option<char>) {
        self.offset += ch.len_utf8();
        match ch {
            '\n' => {
                self.line += 1;
                self.column = 0;
            }
            '\r' if next != Some('\n') => {
                self.line += 1;
                self.column = 0;
            }
            '\r' => {}
            _ => self.column += 1,
        }
    }

    #[inline]
    pub fn until(self, end: Self) -> Span {
        Span { start: self, end }
    }
}

impl std::fmt::Display for SourceLocation {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

#[derive(Debug, Clone, Copy, Hash)]
pub struct Spanned<T> {
    pub value: T,
    pub span: Span,
}

impl<T> std::ops::Deref for Spanned<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

impl<T> PartialEq for Spanned<T>
where
    T: PartialEq,
{
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Span {
    pub start: SourceLocation,
    pub end: SourceLocation,
}

impl From<std::ops::Range<SourceLocation>> for Span {
    fn from(range: std::ops::Range<SourceLocation>) -> Self {
        Self {
            start: range.start,
            end: range.end,
        }
    }
}

impl Span {
    #[inline]
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start.offset == self.end.offset
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.end.offset - self.start.offset
    }

    /// The source text covered by this span.
    #[inline]
    pub fn slice<'s>(&self, source: &'s str) -> &'s str {
        &source[self.start.offset..self.end.offset]
    }
}

pub(crate) trait SpannedExt {
    fn in_span<R: Into<Span>>(self, span: R) -> Spanned<Self>
    where
        Self: Sized,
    {
        Spanned {
            value: self,
            span: span.into(),
        }
    }
}

impl<T> SpannedExt for T {}
