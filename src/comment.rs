use std::{borrow::Cow, sync::Arc};

use crate::{
    Comment, CommentOptions, Construct, ConstructFlags, EmitError, Extension, FromMarkdownHandler,
    HtmlNode, InputBuffer, MarkdownContext, Node, NodeKind, Registry, SourceLocation, Span,
    StringExt as _, TokenContext, TokenType, Tokenizer,
};

pub const OPENING_MARKER: &str = "<!--";
pub const CLOSING_MARKER: &str = "-->";

/// The parts of a recognized comment, as spans into the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommentToken {
    /// The `<!--`.
    pub opening: Span,
    /// Everything between the markers, absent when the comment is empty.
    pub body: Option<Span>,
    /// The `-->`, or just `>`/`->` for the abrupt forms `<!-->` and `<!--->`.
    pub closing: Span,
}

impl CommentToken {
    #[inline]
    pub fn span(&self) -> Span {
        self.opening.merge(&self.closing)
    }

    #[inline]
    pub fn body<'s>(&self, source: &'s str) -> &'s str {
        self.body.map_or("", |body| body.slice(source))
    }

    /// The normalized comment text, see [`comment_value`].
    #[inline]
    pub fn value(&self, source: &str) -> String {
        comment_value(self.body(source))
    }

    /// Recover the parts of a [`TokenType::Comment`] token from its events.
    pub fn from_context(context: &TokenContext<'_>) -> Option<Self> {
        if context.ty() != TokenType::Comment {
            return None;
        }

        let mut opening = None;
        let mut body = None;
        let mut closing = None;
        for (ty, span) in context.children() {
            match ty {
                TokenType::CommentMarker if opening.is_none() => opening = Some(span),
                TokenType::CommentMarker => closing = Some(span),
                TokenType::CommentBody => body = Some(span),
                _ => {}
            }
        }

        Some(Self {
            opening: opening?,
            body,
            closing: closing?,
        })
    }
}

/// Match a comment starting exactly at the cursor.
///
/// Only a complete `-->` ends the body; a bare `--` inside it is content. If
/// the input (up to its limit) ends before the closing marker, nothing is
/// consumed and `None` is returned.
pub fn scan_comment(input: &mut InputBuffer<'_>) -> Option<CommentToken> {
    let from = input.current_location().offset + OPENING_MARKER.len();
    let closer = input
        .source()
        .get(from..)
        .and_then(|rest| rest.find(CLOSING_MARKER))
        .map(|index| from + index);
    scan_comment_until(input, closer)
}

/// Like [`scan_comment`], with the offset of the first `-->` after the opener
/// already known. `None` means the source has no such marker.
pub fn scan_comment_until(
    input: &mut InputBuffer<'_>,
    closer: Option<usize>,
) -> Option<CommentToken> {
    let start = input.checkpoint();
    if !input.starts_with(OPENING_MARKER) {
        return None;
    }
    input.pop_n(OPENING_MARKER.len());
    let opening = start.until(input.current_location());

    for abrupt in [">", "->"] {
        if input.starts_with(abrupt) {
            let closing_start = input.current_location();
            input.pop_n(abrupt.len());
            return Some(CommentToken {
                opening,
                body: None,
                closing: closing_start.until(input.current_location()),
            });
        }
    }

    let body_start = input.current_location();
    let closer = closer
        .filter(|&closer| closer >= body_start.offset)
        .filter(|&closer| closer + CLOSING_MARKER.len() <= input.limit());
    let Some(closer) = closer else {
        input.reset(start);
        return None;
    };

    while input.current_location().offset < closer {
        input.pop();
    }
    let body_end = input.current_location();
    input.pop_n(CLOSING_MARKER.len());
    let body = body_start.until(body_end);
    Some(CommentToken {
        opening,
        body: (!body.is_empty()).then_some(body),
        closing: body_end.until(input.current_location()),
    })
}

/// Scan a comment at the tokenizer's cursor, looking up its closing marker
/// in the tokenizer's marker index instead of searching the source.
fn scan_at(tokenizer: &mut Tokenizer<'_, '_>) -> Option<CommentToken> {
    let from = tokenizer.current_location().offset + OPENING_MARKER.len();
    let closer = tokenizer.find_marker(CLOSING_MARKER, from);
    scan_comment_until(tokenizer.input_mut(), closer)
}

/// Normalize a comment body into the value stored on a [`Comment`] node.
///
/// A multi-line body loses exactly one leading and one trailing line ending.
/// Then one leading space of the first line and one trailing space of the
/// last line are removed. Interior lines are kept verbatim.
pub fn comment_value(body: &str) -> String {
    let body = if body.contains_line_ending() {
        body.strip_leading_line_ending().strip_trailing_line_ending()
    } else {
        body
    };
    let body = body.strip_prefix(' ').unwrap_or(body);
    let body = body.strip_suffix(' ').unwrap_or(body);
    body.to_owned()
}

/// Escape a comment value so that it cannot close the comment early.
///
/// Every `-->` becomes `--\>`. That alone is not enough for a value starting
/// with `>` or `->`: behind the opener it would form the abrupt closers
/// `<!-->` and `<!--->`. So that first `>` is escaped as well, and the
/// serialized comment has exactly one closing marker, at its end.
pub fn escape_comment_value(value: &str) -> Cow<'_, str> {
    let abrupt = value.starts_with('>') || value.starts_with("->");
    if !abrupt && !value.contains(CLOSING_MARKER) {
        return Cow::Borrowed(value);
    }

    let mut escaped = value.replace(CLOSING_MARKER, "--\\>");
    if let Some(rest) = escaped.strip_prefix('>') {
        escaped = format!("\\>{rest}");
    } else if let Some(rest) = escaped.strip_prefix("->") {
        escaped = format!("-\\>{rest}");
    }
    Cow::Owned(escaped)
}

/// Serialize a comment node.
///
/// Parsed comments carry their source text, which is reproduced as long as it
/// still describes the node's value. Otherwise (hand-built or edited nodes)
/// the comment is written as `<!--` + escaped value + `-->`.
pub fn serialize_comment(comment: &Comment) -> Cow<'_, str> {
    if let Some(raw) = comment.raw.as_deref() {
        if raw_matches_value(raw, &comment.value) {
            return Cow::Borrowed(raw);
        }
    }
    Cow::Owned(format!(
        "{OPENING_MARKER}{}{CLOSING_MARKER}",
        escape_comment_value(&comment.value)
    ))
}

fn raw_matches_value(raw: &str, value: &str) -> bool {
    let mut input = InputBuffer::new(raw);
    match scan_comment(&mut input) {
        Some(token) => token.span().end.offset == raw.len() && token.value(raw) == value,
        None => false,
    }
}

/// Emit the opening marker, body and closing marker events of `token`.
fn push_comment_events(tokenizer: &mut Tokenizer<'_, '_>, token: &CommentToken) {
    let span = token.span();
    tokenizer.enter_at(TokenType::Comment, span.start);
    tokenizer.token(TokenType::CommentMarker, token.opening);
    if let Some(body) = token.body {
        tokenizer.token(TokenType::CommentBody, body);
    }
    tokenizer.token(TokenType::CommentMarker, token.closing);
    tokenizer.exit_at(TokenType::Comment, span.end);
}

/// A comment occupying its own lines. It interrupts paragraphs, and once
/// opened it runs to its closing marker regardless of blank lines.
pub struct CommentFlow;

impl Construct for CommentFlow {
    fn name(&self) -> &'static str {
        "comment-flow"
    }

    fn flags(&self) -> ConstructFlags {
        ConstructFlags::FLOW | ConstructFlags::INTERRUPTS_PARAGRAPH | ConstructFlags::SPANS_LINES
    }

    fn starts_with(&self, ch: char) -> bool {
        ch == '<'
    }

    fn tokenize(&self, tokenizer: &mut Tokenizer<'_, '_>) -> Option<Span> {
        tokenizer.input_mut().clear_limit();
        let token = scan_at(tokenizer)?;

        // Anything but whitespace after the closing marker makes this a
        // paragraph with an inline comment instead.
        if !tokenizer.input().rest_of_line().is_all_spaces_and_tabs() {
            return None;
        }

        push_comment_events(tokenizer, &token);
        tokenizer.whitespace();
        Some(token.span())
    }
}

/// A comment inside running text. Inside paragraphs it may continue onto
/// following lines, up to its closing marker.
pub struct CommentText;

impl Construct for CommentText {
    fn name(&self) -> &'static str {
        "comment-text"
    }

    fn flags(&self) -> ConstructFlags {
        ConstructFlags::TEXT | ConstructFlags::SPANS_LINES
    }

    fn starts_with(&self, ch: char) -> bool {
        ch == '<'
    }

    fn tokenize(&self, tokenizer: &mut Tokenizer<'_, '_>) -> Option<Span> {
        let start = tokenizer.current_location();
        let token = match scan_at(tokenizer) {
            Some(token) => token,
            None if tokenizer.can_overflow() => {
                tokenizer.input_mut().clear_limit();
                scan_at(tokenizer).or_else(|| unclosed(start))?
            }
            None => return unclosed(start),
        };

        push_comment_events(tokenizer, &token);
        Some(token.span())
    }
}

fn unclosed<T>(start: SourceLocation) -> Option<T> {
    tracing::trace!(at = %start, "comment opener without closing marker, treating as text");
    None
}

/// Registers comment recognition and conversion with a pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommentExtension {
    options: CommentOptions,
}

impl CommentExtension {
    pub fn new(options: CommentOptions) -> Self {
        Self { options }
    }

    #[inline]
    pub fn options(&self) -> CommentOptions {
        self.options
    }
}

impl Extension for CommentExtension {
    fn register(&self, registry: &mut Registry) {
        let options = self.options;

        registry
            .construct(Arc::new(CommentFlow))
            .construct(Arc::new(CommentText))
            .from_markdown(TokenType::Comment, comment_from_markdown(options))
            .to_markdown(NodeKind::Comment, Box::new(comment_to_markdown))
            .to_html(
                NodeKind::Comment,
                Box::new(move |node, _| comment_to_html(node, options)),
            );
    }
}

fn comment_from_markdown(options: CommentOptions) -> FromMarkdownHandler {
    Box::new(move |context| {
        if !options.keeps_comments(context.target) {
            return None;
        }
        let token = CommentToken::from_context(context)?;
        let span = token.span();
        Some(Node::Comment(Comment {
            value: token.value(context.source),
            raw: Some(span.slice(context.source).to_owned()),
            position: Some(span),
        }))
    })
}

fn comment_to_markdown(node: &Node, context: &mut MarkdownContext<'_>) -> Result<(), EmitError> {
    let Node::Comment(comment) = node else {
        return Err(EmitError::UnhandledNode(node.kind()));
    };
    context.write_str(&serialize_comment(comment))
}

fn comment_to_html(node: &Node, options: CommentOptions) -> Vec<HtmlNode> {
    match node {
        Node::Comment(comment) if options.preserve_html => vec![HtmlNode::raw(format!(
            "{OPENING_MARKER}{}{CLOSING_MARKER}",
            escape_comment_html(&comment.value)
        ))],
        _ => vec![],
    }
}

/// [`escape_comment_value`], plus `--!>`, which HTML parsers also accept as
/// the end of a comment.
fn escape_comment_html(value: &str) -> Cow<'_, str> {
    let escaped = escape_comment_value(value);
    if escaped.contains("--!>") {
        Cow::Owned(escaped.replace("--!>", "--!\\>"))
    } else {
        escaped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{tokenize, Constructs, Spanned};

    fn scan(source: &str) -> Option<(String, usize)> {
        let mut input = InputBuffer::new(source);
        let token = scan_comment(&mut input)?;
        assert_eq!(input.current_location(), token.span().end);
        Some((token.body(source).to_owned(), token.span().end.offset))
    }

    fn comment_constructs() -> Constructs {
        let mut registry = Registry::default();
        CommentExtension::default().register(&mut registry);
        registry.constructs
    }

    fn assert_tokens_eq(source: &str, expected: &[(TokenType, &str)]) {
        let constructs = comment_constructs();
        let actual: Vec<(TokenType, &str)> = tokenize(source, &constructs)
            .spans()
            .into_iter()
            .map(|Spanned { value, span }| (value, span.slice(source)))
            .collect();
        assert_eq!(actual, expected, "source: {source:?}");
    }

    #[test]
    fn scan_single_line() {
        assert_eq!(scan("<!-- a -->rest"), Some((" a ".into(), 10)));
    }

    #[test]
    fn scan_multi_line() {
        assert_eq!(
            scan("<!--\nline\n-->"),
            Some(("\nline\n".into(), 13))
        );
    }

    #[test]
    fn double_dash_does_not_close() {
        assert_eq!(scan("<!-- a -- b -->"), Some((" a -- b ".into(), 15)));
    }

    #[test]
    fn abrupt_and_empty_comments() {
        assert_eq!(scan("<!-->"), Some((String::new(), 5)));
        assert_eq!(scan("<!--->"), Some((String::new(), 6)));
        assert_eq!(scan("<!---->"), Some((String::new(), 7)));
    }

    #[test]
    fn unclosed_consumes_nothing() {
        let mut input = InputBuffer::new("<!-- never closed");
        assert_eq!(scan_comment(&mut input), None);
        assert_eq!(input.current_location().offset, 0);
        assert_eq!(scan("<!- nope -->"), None);
    }

    #[test]
    fn scan_respects_limit() {
        let mut input = InputBuffer::new("<!-- a\nb -->");
        input.set_limit(6);
        assert_eq!(scan_comment(&mut input), None);
        input.clear_limit();
        assert!(scan_comment(&mut input).is_some());
    }

    #[test]
    fn value_trimming() {
        assert_eq!(comment_value(" inline "), "inline");
        assert_eq!(comment_value("inline"), "inline");
        assert_eq!(comment_value("  two  "), " two ");
        assert_eq!(
            comment_value("\nline one\nline two \n"),
            "line one\nline two"
        );
        assert_eq!(
            comment_value(" another \nmulti-line \ncomment "),
            "another \nmulti-line \ncomment"
        );
        assert_eq!(comment_value("\n\n  indented\n\n"), "\n  indented\n");
        assert_eq!(comment_value("\r\nwindows\r\n"), "windows");
    }

    #[test]
    fn escaping() {
        assert_eq!(escape_comment_value("plain -- text"), "plain -- text");
        assert_eq!(
            escape_comment_value("No arrows like this: --> are allowed"),
            "No arrows like this: --\\> are allowed"
        );
        assert_eq!(escape_comment_value(">x"), "\\>x");
        assert_eq!(escape_comment_value("->x"), "-\\>x");
    }

    #[test]
    fn serialized_comment_has_single_closer() {
        for value in ["-->", "a-->b-->", ">", "->", "a-", "a--", "--->", ""] {
            let comment = Comment {
                value: value.into(),
                ..Default::default()
            };
            let out = serialize_comment(&comment);
            let inner = &out[OPENING_MARKER.len()..];
            assert_eq!(
                inner.find(CLOSING_MARKER),
                Some(inner.len() - CLOSING_MARKER.len()),
                "value: {value:?}, out: {out:?}"
            );
            let mut input = InputBuffer::new(&out);
            let token = scan_comment(&mut input).unwrap();
            assert_eq!(token.span().end.offset, out.len(), "value: {value:?}");
        }
    }

    #[test]
    fn raw_is_used_only_while_it_matches() {
        let mut comment = Comment {
            value: "x".into(),
            raw: Some("<!--  x  -->".into()),
            position: None,
        };
        // "  x  " normalizes to " x ", not "x".
        assert_eq!(serialize_comment(&comment), "<!--x-->");

        comment.raw = Some("<!-- x -->".into());
        assert_eq!(serialize_comment(&comment), "<!-- x -->");

        comment.value = "edited".into();
        assert_eq!(serialize_comment(&comment), "<!--edited-->");

        comment.value = "x".into();
        comment.raw = Some("<!-- x --> trailing".into());
        assert_eq!(serialize_comment(&comment), "<!--x-->");
    }

    #[test]
    fn flow_comment() {
        assert_tokens_eq(
            "<!-- a -->  \npara",
            &[
                (TokenType::Comment, "<!-- a -->"),
                (TokenType::CommentMarker, "<!--"),
                (TokenType::CommentBody, " a "),
                (TokenType::CommentMarker, "-->"),
                (TokenType::Whitespace, "  "),
                (TokenType::LineEnding, "\n"),
                (TokenType::Paragraph, "para"),
                (TokenType::Data, "para"),
            ],
        );
    }

    #[test]
    fn flow_comment_spans_blank_lines() {
        assert_tokens_eq(
            "<!--\n\nx\n-->",
            &[
                (TokenType::Comment, "<!--\n\nx\n-->"),
                (TokenType::CommentMarker, "<!--"),
                (TokenType::CommentBody, "\n\nx\n"),
                (TokenType::CommentMarker, "-->"),
            ],
        );
    }

    #[test]
    fn flow_comment_interrupts_paragraph() {
        assert_tokens_eq(
            "text\n<!-- c -->",
            &[
                (TokenType::Paragraph, "text"),
                (TokenType::Data, "text"),
                (TokenType::LineEnding, "\n"),
                (TokenType::Comment, "<!-- c -->"),
                (TokenType::CommentMarker, "<!--"),
                (TokenType::CommentBody, " c "),
                (TokenType::CommentMarker, "-->"),
            ],
        );
    }

    #[test]
    fn trailing_text_makes_it_inline() {
        assert_tokens_eq(
            "<!-- a --> b",
            &[
                (TokenType::Paragraph, "<!-- a --> b"),
                (TokenType::Comment, "<!-- a -->"),
                (TokenType::CommentMarker, "<!--"),
                (TokenType::CommentBody, " a "),
                (TokenType::CommentMarker, "-->"),
                (TokenType::Data, " b"),
            ],
        );
    }

    #[test]
    fn inline_comment_in_heading() {
        assert_tokens_eq(
            "# This <!-- inline -->document",
            &[
                (TokenType::AtxHeading, "# This <!-- inline -->document"),
                (TokenType::AtxHeadingSequence, "#"),
                (TokenType::Whitespace, " "),
                (TokenType::AtxHeadingText, "This <!-- inline -->document"),
                (TokenType::Data, "This "),
                (TokenType::Comment, "<!-- inline -->"),
                (TokenType::CommentMarker, "<!--"),
                (TokenType::CommentBody, " inline "),
                (TokenType::CommentMarker, "-->"),
                (TokenType::Data, "document"),
            ],
        );
    }

    #[test]
    fn inline_comment_continues_onto_next_lines() {
        assert_tokens_eq(
            "a <!-- b\n\nc --> d\ne",
            &[
                (TokenType::Paragraph, "a <!-- b\n\nc --> d\ne"),
                (TokenType::Data, "a "),
                (TokenType::Comment, "<!-- b\n\nc -->"),
                (TokenType::CommentMarker, "<!--"),
                (TokenType::CommentBody, " b\n\nc "),
                (TokenType::CommentMarker, "-->"),
                (TokenType::Data, " d"),
                (TokenType::LineEnding, "\n"),
                (TokenType::Data, "e"),
            ],
        );
    }

    #[test]
    fn heading_comment_does_not_leave_the_line() {
        assert_tokens_eq(
            "# a <!-- b\nc -->",
            &[
                (TokenType::AtxHeading, "# a <!-- b"),
                (TokenType::AtxHeadingSequence, "#"),
                (TokenType::Whitespace, " "),
                (TokenType::AtxHeadingText, "a <!-- b"),
                (TokenType::Data, "a <!-- b"),
                (TokenType::LineEnding, "\n"),
                (TokenType::Paragraph, "c -->"),
                (TokenType::Data, "c -->"),
            ],
        );
    }

    #[test]
    fn unclosed_comment_is_text() {
        assert_tokens_eq(
            "a <!-- b",
            &[(TokenType::Paragraph, "a <!-- b"), (TokenType::Data, "a <!-- b")],
        );
    }

    #[test]
    fn many_unclosed_openers() {
        let constructs = comment_constructs();

        let source = "a <!-- ".repeat(5_000);
        let spans = tokenize(&source, &constructs).spans();
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].value, TokenType::Paragraph);
        assert_eq!(spans[1].value, TokenType::Data);
        assert_eq!(spans[1].span.slice(&source), source);

        let source = "<!--\n".repeat(5_000);
        let spans = tokenize(&source, &constructs).spans();
        assert_eq!(spans[0].value, TokenType::Paragraph);
        assert_eq!(spans.len(), 1 + 2 * 5_000);
        assert!(spans
            .iter()
            .filter(|token| token.value == TokenType::Data)
            .all(|token| token.span.slice(&source) == "<!--"));
    }

    #[test]
    fn distant_closer_ends_flow_comment() {
        let source = format!("{}-->", "<!--\n".repeat(5_000));
        let constructs = comment_constructs();
        let spans = tokenize(&source, &constructs).spans();
        assert_eq!(spans[0].value, TokenType::Comment);
        assert_eq!(spans[0].span.slice(&source), source);
        assert_eq!(spans.len(), 4);
    }

    #[test]
    fn html_escapes_bang_closer() {
        let options = CommentOptions::default().preserve_html(true);
        assert_eq!(
            comment_to_html(&Node::comment("a--!>b"), options),
            [HtmlNode::raw("<!--a--!\\>b-->")]
        );
        assert_eq!(
            comment_to_html(&Node::comment("x --> y"), options),
            [HtmlNode::raw("<!--x --\\> y-->")]
        );
        assert!(comment_to_html(&Node::comment("x"), CommentOptions::default()).is_empty());
    }

    #[test]
    fn code_span_hides_comment() {
        assert_tokens_eq(
            "`<!--` x -->",
            &[
                (TokenType::Paragraph, "`<!--` x -->"),
                (TokenType::CodeText, "`<!--`"),
                (TokenType::CodeTextSequence, "`"),
                (TokenType::CodeTextData, "<!--"),
                (TokenType::CodeTextSequence, "`"),
                (TokenType::Data, " x -->"),
            ],
        );
    }

    #[test]
    fn comment_inside_html_tags() {
        assert_tokens_eq(
            "<b><!-- c --></b>",
            &[
                (TokenType::Paragraph, "<b><!-- c --></b>"),
                (TokenType::HtmlText, "<b>"),
                (TokenType::Comment, "<!-- c -->"),
                (TokenType::CommentMarker, "<!--"),
                (TokenType::CommentBody, " c "),
                (TokenType::CommentMarker, "-->"),
                (TokenType::HtmlText, "</b>"),
            ],
        );
    }
}
