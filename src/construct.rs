use std::sync::Arc;

use crate::{CharExt as _, Span, TokenType, Tokenizer};

bitflags::bitflags! {
    /// Where a construct may occur and how it interacts with its
    /// surroundings.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ConstructFlags: u8 {
        /// Occupies whole lines between other blocks.
        const FLOW = 1 << 0;
        /// Occurs inside the inline content of a block.
        const TEXT = 1 << 1;
        /// A line starting this construct ends an open paragraph.
        const INTERRUPTS_PARAGRAPH = 1 << 2;
        /// May continue onto following lines of its container.
        const SPANS_LINES = 1 << 3;
    }
}

/// A recognizer for one syntactic construct.
///
/// `tokenize` is called with the cursor at a position where `starts_with`
/// holds for the next char. It returns the span it consumed, or `None` if
/// the construct does not match; the tokenizer then rolls back everything the
/// construct did.
pub trait Construct: Send + Sync {
    fn name(&self) -> &'static str;
    fn flags(&self) -> ConstructFlags;
    fn starts_with(&self, ch: char) -> bool;
    fn tokenize(&self, tokenizer: &mut Tokenizer<'_, '_>) -> Option<Span>;
}

impl std::fmt::Debug for dyn Construct {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Construct")
            .field("name", &self.name())
            .field("flags", &self.flags())
            .finish()
    }
}

/// The flow and text constructs known to a tokenizer, in priority order.
#[derive(Debug, Default, Clone)]
pub struct Constructs {
    flow: Vec<Arc<dyn Construct>>,
    text: Vec<Arc<dyn Construct>>,
}

impl Constructs {
    /// The constructs every document understands.
    pub fn builtin() -> Self {
        let mut constructs = Self::default();
        constructs.flow.push(Arc::new(AtxHeading));
        constructs.text.push(Arc::new(CodeText));
        constructs.text.push(Arc::new(HtmlText));
        constructs.text.push(Arc::new(CharacterReference));
        constructs
    }

    /// Register a construct. It is tried before every construct registered
    /// earlier that starts with the same char.
    pub fn register(&mut self, construct: Arc<dyn Construct>) {
        let flags = construct.flags();
        if flags.contains(ConstructFlags::FLOW) {
            self.flow.insert(0, construct.clone());
        }
        if flags.contains(ConstructFlags::TEXT) {
            self.text.insert(0, construct);
        }
    }

    pub fn flow(&self) -> impl Iterator<Item = &dyn Construct> {
        self.flow.iter().map(|construct| &**construct)
    }

    pub fn text(&self) -> impl Iterator<Item = &dyn Construct> {
        self.text.iter().map(|construct| &**construct)
    }
}

/// `# Heading`, with an optional closing sequence.
pub struct AtxHeading;

impl Construct for AtxHeading {
    fn name(&self) -> &'static str {
        "atx-heading"
    }

    fn flags(&self) -> ConstructFlags {
        ConstructFlags::FLOW | ConstructFlags::INTERRUPTS_PARAGRAPH
    }

    fn starts_with(&self, ch: char) -> bool {
        ch == '#'
    }

    fn tokenize(&self, tokenizer: &mut Tokenizer<'_, '_>) -> Option<Span> {
        let line = tokenizer.input().rest_of_line();
        let depth = line.len() - line.trim_start_matches('#').len();
        if !(1..=6).contains(&depth) {
            return None;
        }
        let after = &line[depth..];
        if !after.is_empty() && !after.starts_with([' ', '\t']) {
            return None;
        }

        let start = tokenizer.current_location();
        let line_start = start.offset;
        tokenizer.enter(TokenType::AtxHeading);
        tokenizer.enter(TokenType::AtxHeadingSequence);
        tokenizer.input_mut().pop_n(depth);
        tokenizer.exit(TokenType::AtxHeadingSequence);
        tokenizer.whitespace();

        let content_start = tokenizer.current_location().offset - line_start;
        let content = line[content_start..].trim_end_matches([' ', '\t']);
        let without_closing = content.trim_end_matches('#');
        let content = if without_closing.is_empty() {
            without_closing
        } else if without_closing.ends_with([' ', '\t']) {
            without_closing.trim_end_matches([' ', '\t'])
        } else {
            content
        };

        if !content.is_empty() {
            let content_end = line_start + content_start + content.len();
            tokenizer.enter(TokenType::AtxHeadingText);
            tokenizer.text(content_end, false);
            tokenizer.exit(TokenType::AtxHeadingText);
        }

        tokenizer.whitespace();
        if tokenizer.input().starts_with("#") {
            tokenizer.enter(TokenType::AtxHeadingSequence);
            tokenizer.input_mut().pop_while(|ch| ch == '#');
            tokenizer.exit(TokenType::AtxHeadingSequence);
            tokenizer.whitespace();
        }

        tokenizer.exit(TokenType::AtxHeading);
        Some(start.until(tokenizer.current_location()))
    }
}

/// `` `code` ``, on a single line.
///
/// A backtick run without a matching closing run is literal text as a whole,
/// so a shorter run inside it is never mistaken for a fence.
pub struct CodeText;

impl Construct for CodeText {
    fn name(&self) -> &'static str {
        "code-text"
    }

    fn flags(&self) -> ConstructFlags {
        ConstructFlags::TEXT
    }

    fn starts_with(&self, ch: char) -> bool {
        ch == '`'
    }

    fn tokenize(&self, tokenizer: &mut Tokenizer<'_, '_>) -> Option<Span> {
        let start = tokenizer.current_location();
        let line = tokenizer.input().rest_of_line();
        let size = line.len() - line.trim_start_matches('`').len();
        let closing = find_backtick_run(&line[size..], size);

        let Some(closing) = closing else {
            tokenizer.enter(TokenType::Data);
            tokenizer.input_mut().pop_n(size);
            tokenizer.exit(TokenType::Data);
            return Some(start.until(tokenizer.current_location()));
        };

        tokenizer.enter(TokenType::CodeText);
        tokenizer.enter(TokenType::CodeTextSequence);
        tokenizer.input_mut().pop_n(size);
        tokenizer.exit(TokenType::CodeTextSequence);
        if closing > 0 {
            tokenizer.enter(TokenType::CodeTextData);
            let data_end = tokenizer.current_location().offset + closing;
            while tokenizer.current_location().offset < data_end {
                tokenizer.consume();
            }
            tokenizer.exit(TokenType::CodeTextData);
        }
        tokenizer.enter(TokenType::CodeTextSequence);
        tokenizer.input_mut().pop_n(size);
        tokenizer.exit(TokenType::CodeTextSequence);
        tokenizer.exit(TokenType::CodeText);
        Some(start.until(tokenizer.current_location()))
    }
}

/// Byte offset of the first run of exactly `size` backticks in `text`.
fn find_backtick_run(text: &str, size: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut index = 0;
    while index < bytes.len() {
        if bytes[index] != b'`' {
            index += 1;
            continue;
        }
        let run_start = index;
        while index < bytes.len() && bytes[index] == b'`' {
            index += 1;
        }
        if index - run_start == size {
            return Some(run_start);
        }
    }
    None
}

/// An inline HTML open or close tag, such as `<b>`, `<a href="x">` or `</b>`.
pub struct HtmlText;

impl Construct for HtmlText {
    fn name(&self) -> &'static str {
        "html-text"
    }

    fn flags(&self) -> ConstructFlags {
        ConstructFlags::TEXT
    }

    fn starts_with(&self, ch: char) -> bool {
        ch == '<'
    }

    fn tokenize(&self, tokenizer: &mut Tokenizer<'_, '_>) -> Option<Span> {
        let start = tokenizer.current_location();
        let line = tokenizer.input().rest_of_line();
        let len = html_tag_len(line)?;

        tokenizer.enter(TokenType::HtmlText);
        let end = start.offset + len;
        while tokenizer.current_location().offset < end {
            tokenizer.consume();
        }
        tokenizer.exit(TokenType::HtmlText);
        Some(start.until(tokenizer.current_location()))
    }
}

/// Length of the tag at the start of `line`, if it is one.
fn html_tag_len(line: &str) -> Option<usize> {
    let rest = line.strip_prefix('<')?;
    let (closing, rest) = match rest.strip_prefix('/') {
        Some(rest) => (true, rest),
        None => (false, rest),
    };
    if !rest.starts_with(|ch: char| ch.is_ascii_alphabetic()) {
        return None;
    }
    let name_len = rest.len() - rest.trim_start_matches(|ch: char| ch.is_tag_name_char()).len();
    let after_name = &rest[name_len..];

    let tail = if after_name.starts_with('>') {
        1
    } else if closing {
        let trimmed = after_name.trim_start_matches([' ', '\t']);
        if !trimmed.starts_with('>') {
            return None;
        }
        after_name.len() - trimmed.len() + 1
    } else if after_name.starts_with("/>") {
        2
    } else if after_name.starts_with([' ', '\t']) {
        let close = after_name.find(['>', '<'])?;
        if !after_name[close..].starts_with('>') {
            return None;
        }
        close + 1
    } else {
        return None;
    };

    Some(1 + usize::from(closing) + name_len + tail)
}

/// `&amp;`, `&#35;` or `&#x23;`.
pub struct CharacterReference;

impl Construct for CharacterReference {
    fn name(&self) -> &'static str {
        "character-reference"
    }

    fn flags(&self) -> ConstructFlags {
        ConstructFlags::TEXT
    }

    fn starts_with(&self, ch: char) -> bool {
        ch == '&'
    }

    fn tokenize(&self, tokenizer: &mut Tokenizer<'_, '_>) -> Option<Span> {
        let start = tokenizer.current_location();
        let (len, _) = decode_character_reference(tokenizer.input().rest_of_line())?;

        tokenizer.enter(TokenType::CharacterReference);
        let end = start.offset + len;
        while tokenizer.current_location().offset < end {
            tokenizer.consume();
        }
        tokenizer.exit(TokenType::CharacterReference);
        Some(start.until(tokenizer.current_location()))
    }
}

const NAMED_REFERENCES: &[(&str, char)] = &[
    ("amp", '&'),
    ("lt", '<'),
    ("gt", '>'),
    ("quot", '"'),
    ("apos", '\''),
    ("nbsp", '\u{a0}'),
];

const MAX_REFERENCE_BODY: usize = 8;

/// Decode the character reference at the start of `text`, returning its
/// length in bytes and the char it stands for.
pub fn decode_character_reference(text: &str) -> Option<(usize, char)> {
    let rest = text.strip_prefix('&')?;
    // No reference body is longer than `#x` and six hex digits.
    let end = rest
        .bytes()
        .take(MAX_REFERENCE_BODY + 1)
        .position(|byte| byte == b';')?;
    let body = &rest[..end];
    let len = end + 2;

    let ch = if let Some(numeric) = body.strip_prefix('#') {
        if let Some(hex) = numeric.strip_prefix(['x', 'X']) {
            if hex.is_empty() || hex.len() > 6 || !hex.chars().all(|ch| ch.is_ascii_hexdigit()) {
                return None;
            }
            u32::from_str_radix(hex, 16).ok().map(reference_char)
        } else {
            if numeric.is_empty()
                || numeric.len() > 7
                || !numeric.chars().all(|ch| ch.is_ascii_digit())
            {
                return None;
            }
            numeric.parse::<u32>().ok().map(reference_char)
        }
    } else {
        NAMED_REFERENCES
            .iter()
            .find(|(name, _)| *name == body)
            .map(|(_, ch)| *ch)
    };

    ch.map(|ch| (len, ch))
}

fn reference_char(code: u32) -> char {
    match code {
        0 => char::REPLACEMENT_CHARACTER,
        code => char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER),
    }
}

/// Whether the text at the start of `text` would be read back as a character
/// reference.
pub(crate) fn starts_character_reference(text: &str) -> bool {
    decode_character_reference(text).is_some()
}
