use std::collections::HashMap;

use crate::{
    decode_character_reference, matching_exit, token_span, Event, EventKind, Heading, Html,
    InlineCode, Node, Paragraph, Root, SourceLocation, Span, Target, Text, TokenType, Tokens,
};

/// Turns one token into a node, or into nothing (`None`) to elide it.
pub type FromMarkdownHandler = Box<dyn Fn(&TokenContext<'_>) -> Option<Node> + Send + Sync>;

/// A complete token handed to a [`FromMarkdownHandler`].
#[derive(Debug, Clone, Copy)]
pub struct TokenContext<'a> {
    pub source: &'a str,
    /// The token's events, from its `Enter` to its `Exit` inclusive.
    pub events: &'a [Event],
    pub target: Target,
}

impl<'a> TokenContext<'a> {
    #[inline]
    pub fn ty(&self) -> TokenType {
        self.events[0].ty
    }

    #[inline]
    pub fn span(&self) -> Span {
        token_span(self.events, 0)
    }

    /// The source text of the whole token.
    #[inline]
    pub fn slice(&self) -> &'a str {
        self.span().slice(self.source)
    }

    /// Spans of the direct children of this token.
    pub fn children(&self) -> Vec<(TokenType, Span)> {
        let mut children = vec![];
        let mut index = 1;
        while index + 1 < self.events.len() {
            let exit = matching_exit(self.events, index);
            children.push((
                self.events[index].ty,
                self.events[index].location.until(self.events[exit].location),
            ));
            index = exit + 1;
        }
        children
    }
}

/// Tree-building handlers registered by extensions, keyed by token type.
/// Token types without a handler use the built-in conversion.
#[derive(Default)]
pub struct FromMarkdownHandlers {
    handlers: HashMap<TokenType, FromMarkdownHandler>,
}

impl FromMarkdownHandlers {
    pub fn register(&mut self, ty: TokenType, handler: FromMarkdownHandler) {
        self.handlers.insert(ty, handler);
    }

    #[inline]
    pub fn get(&self, ty: TokenType) -> Option<&FromMarkdownHandler> {
        self.handlers.get(&ty)
    }
}

impl std::fmt::Debug for FromMarkdownHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}

/// Build the primary tree from a token stream.
pub fn build_tree(
    source: &str,
    tokens: &Tokens,
    handlers: &FromMarkdownHandlers,
    target: Target,
) -> Node {
    let mut builder = Builder {
        source,
        events: tokens.events(),
        handlers,
        target,
        elided: 0,
    };
    let children = builder.flow(0, builder.events.len());
    if builder.elided > 0 {
        tracing::debug!(elided = builder.elided, ?target, "elided tokens from tree");
    }

    let end = tokens
        .events()
        .last()
        .map(|event| event.location)
        .unwrap_or_default();
    Node::Root(Root {
        children,
        position: Some(SourceLocation::default().until(end)),
    })
}

struct Builder<'a> {
    source: &'a str,
    events: &'a [Event],
    handlers: &'a FromMarkdownHandlers,
    target: Target,
    elided: usize,
}

impl<'a> Builder<'a> {
    /// Nodes for the tokens entered between the event indices `start` and
    /// `end`, at a single nesting level of flow content.
    fn flow(&mut self, start: usize, end: usize) -> Vec<Node> {
        let mut nodes = vec![];
        let mut index = start;
        while index < end {
            debug_assert_eq!(self.events[index].kind, EventKind::Enter);
            let exit = matching_exit(self.events, index);
            if let Some(node) = self.token(index, exit) {
                nodes.push(node);
            }
            index = exit + 1;
        }
        nodes
    }

    /// Nodes for inline content between the event indices `start` and `end`.
    fn phrasing(&mut self, start: usize, end: usize) -> Vec<Node> {
        let mut nodes: Vec<Node> = vec![];
        let mut index = start;
        while index < end {
            let exit = matching_exit(self.events, index);
            match self.events[index].ty {
                TokenType::Whitespace => {}
                TokenType::LineEnding => {
                    if let Some(Node::Text(text)) = nodes.last_mut() {
                        let trimmed = text.value.trim_end_matches([' ', '\t']).len();
                        text.value.truncate(trimmed);
                    }
                    let span = self.span(index, exit);
                    push_phrasing(&mut nodes, text_node("\n".into(), span));
                }
                _ => {
                    if let Some(node) = self.token(index, exit) {
                        push_phrasing(&mut nodes, node);
                    }
                }
            }
            index = exit + 1;
        }
        trim_phrasing(&mut nodes);
        nodes
    }

    #[inline]
    fn span(&self, enter: usize, exit: usize) -> Span {
        self.events[enter].location.until(self.events[exit].location)
    }

    fn token(&mut self, enter: usize, exit: usize) -> Option<Node> {
        let ty = self.events[enter].ty;
        let span = self.span(enter, exit);

        if let Some(handler) = self.handlers.get(ty) {
            let context = TokenContext {
                source: self.source,
                events: &self.events[enter..=exit],
                target: self.target,
            };
            let node = handler(&context);
            if node.is_none() {
                self.elided += 1;
            }
            return node;
        }

        match ty {
            TokenType::AtxHeading => Some(self.heading(enter, exit)),
            TokenType::Paragraph => {
                let children = self.phrasing(enter + 1, exit);
                if children.is_empty() {
                    // Everything in it was elided.
                    return None;
                }
                Some(Node::Paragraph(Paragraph {
                    children,
                    position: Some(span),
                }))
            }
            TokenType::Data => Some(text_node(span.slice(self.source).to_owned(), span)),
            TokenType::CharacterReference => {
                let (_, ch) = decode_character_reference(span.slice(self.source))?;
                Some(text_node(ch.to_string(), span))
            }
            TokenType::CodeText => Some(self.code_text(enter, exit)),
            TokenType::HtmlText => Some(Node::Html(Html {
                value: span.slice(self.source).to_owned(),
                position: Some(span),
            })),
            TokenType::BlankLine
            | TokenType::LineEnding
            | TokenType::Whitespace
            | TokenType::AtxHeadingSequence
            | TokenType::AtxHeadingText
            | TokenType::CodeTextSequence
            | TokenType::CodeTextData
            | TokenType::Comment
            | TokenType::CommentMarker
            | TokenType::CommentBody => None,
        }
    }

    fn heading(&mut self, enter: usize, exit: usize) -> Node {
        let mut depth = 0;
        let mut children = vec![];
        let mut index = enter + 1;
        while index < exit {
            let child_exit = matching_exit(self.events, index);
            match self.events[index].ty {
                TokenType::AtxHeadingSequence if depth == 0 => {
                    depth = self.span(index, child_exit).len();
                }
                TokenType::AtxHeadingText => {
                    children = self.phrasing(index + 1, child_exit);
                }
                _ => {}
            }
            index = child_exit + 1;
        }

        Node::Heading(Heading {
            depth: u8::try_from(depth).unwrap_or(6),
            children,
            position: Some(self.span(enter, exit)),
        })
    }

    fn code_text(&mut self, enter: usize, exit: usize) -> Node {
        let data = self.events[enter..=exit]
            .iter()
            .position(|event| event.ty == TokenType::CodeTextData)
            .map(|offset| {
                let data_enter = enter + offset;
                let data_exit = matching_exit(self.events, data_enter);
                self.span(data_enter, data_exit).slice(self.source)
            })
            .unwrap_or_default();

        // One space of padding on both sides is stripped, unless the content
        // is nothing but spaces.
        let value = if data.len() >= 2
            && data.starts_with(' ')
            && data.ends_with(' ')
            && !data.chars().all(|ch| ch == ' ')
        {
            &data[1..data.len() - 1]
        } else {
            data
        };

        Node::InlineCode(InlineCode {
            value: value.to_owned(),
            position: Some(self.span(enter, exit)),
        })
    }
}

#[inline]
fn text_node(value: String, span: Span) -> Node {
    Node::Text(Text {
        value,
        position: Some(span),
    })
}

/// Append `node`, merging it into a preceding text node.
fn push_phrasing(nodes: &mut Vec<Node>, node: Node) {
    if let (Some(Node::Text(last)), Node::Text(next)) = (nodes.last_mut(), &node) {
        last.value.push_str(&next.value);
        last.position = match (last.position, next.position) {
            (Some(a), Some(b)) => Some(a.merge(&b)),
            (a, b) => a.or(b),
        };
        return;
    }
    nodes.push(node);
}

/// Remove whitespace at the boundaries of inline content. Elided tokens can
/// leave text that is only whitespace behind.
fn trim_phrasing(nodes: &mut Vec<Node>) {
    if let Some(Node::Text(first)) = nodes.first_mut() {
        let trimmed = first.value.trim_start_matches([' ', '\t', '\n', '\r']);
        if trimmed.len() != first.value.len() {
            first.value = trimmed.to_owned();
        }
    }
    if let Some(Node::Text(last)) = nodes.last_mut() {
        let trimmed = last.value.trim_end_matches([' ', '\t', '\n', '\r']).len();
        last.value.truncate(trimmed);
    }
    nodes.retain(|node| !matches!(node, Node::Text(text) if text.value.is_empty()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{tokenize, Constructs};

    fn build(source: &str) -> Node {
        let constructs = Constructs::builtin();
        let tokens = tokenize(source, &constructs);
        build_tree(
            source,
            &tokens,
            &FromMarkdownHandlers::default(),
            Target::Markdown,
        )
        .without_positions()
    }

    #[test]
    fn heading_and_paragraph() {
        assert_eq!(
            build("# Title\n\nSome *text*\nmore  \n"),
            Node::root(vec![
                Node::heading(1, vec![Node::text("Title")]),
                Node::paragraph(vec![Node::text("Some *text*\nmore")]),
            ])
        );
    }

    #[test]
    fn heading_depth_and_closing_sequence() {
        assert_eq!(
            build("### Three ###"),
            Node::root(vec![Node::heading(3, vec![Node::text("Three")])])
        );
        assert_eq!(build("#"), Node::root(vec![Node::heading(1, vec![])]));
        assert_eq!(
            build("####### seven"),
            Node::root(vec![Node::paragraph(vec![Node::text("####### seven")])])
        );
    }

    #[test]
    fn inline_nodes() {
        assert_eq!(
            build("a ` b ` <b>c</b> &amp;"),
            Node::root(vec![Node::paragraph(vec![
                Node::text("a "),
                Node::inline_code("b"),
                Node::text(" "),
                Node::html("<b>"),
                Node::text("c"),
                Node::html("</b>"),
                Node::text(" &"),
            ])])
        );
    }

    #[test]
    fn unmatched_backticks_are_text() {
        assert_eq!(
            build("a ``b` c"),
            Node::root(vec![Node::paragraph(vec![Node::text("a ``b` c")])])
        );
    }

    #[test]
    fn handler_can_elide_tokens() {
        let source = "a <b> c";
        let constructs = Constructs::builtin();
        let tokens = tokenize(source, &constructs);
        let mut handlers = FromMarkdownHandlers::default();
        handlers.register(TokenType::HtmlText, Box::new(|_| None));
        let tree = build_tree(source, &tokens, &handlers, Target::Markdown).without_positions();
        assert_eq!(
            tree,
            Node::root(vec![Node::paragraph(vec![Node::text("a  c")])])
        );
    }

    #[test]
    fn paragraph_of_elided_tokens_is_dropped() {
        let source = "<b>\n\ntext";
        let constructs = Constructs::builtin();
        let tokens = tokenize(source, &constructs);
        let mut handlers = FromMarkdownHandlers::default();
        handlers.register(TokenType::HtmlText, Box::new(|_| None));
        let tree = build_tree(source, &tokens, &handlers, Target::Markdown).without_positions();
        assert_eq!(
            tree,
            Node::root(vec![Node::paragraph(vec![Node::text("text")])])
        );
    }
}
