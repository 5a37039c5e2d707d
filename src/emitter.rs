use std::collections::HashMap;

use crate::{starts_character_reference, Heading, Node, NodeKind, StringExt as _};

#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    #[error(transparent)]
    Fmt(#[from] std::fmt::Error),
    #[error("no markdown handler for node kind `{0}`")]
    UnhandledNode(NodeKind),
}

/// Writes one node as markdown. Handlers recurse into children through the
/// [`MarkdownContext`].
pub type ToMarkdownHandler =
    Box<dyn Fn(&Node, &mut MarkdownContext<'_>) -> Result<(), EmitError> + Send + Sync>;

/// Markdown handlers keyed by node kind.
pub struct MarkdownHandlers {
    handlers: HashMap<NodeKind, ToMarkdownHandler>,
}

impl Default for MarkdownHandlers {
    fn default() -> Self {
        let mut handlers = Self {
            handlers: HashMap::new(),
        };
        handlers.register(NodeKind::Root, Box::new(root));
        handlers.register(NodeKind::Heading, Box::new(heading));
        handlers.register(NodeKind::Paragraph, Box::new(paragraph));
        handlers.register(NodeKind::Text, Box::new(text));
        handlers.register(NodeKind::InlineCode, Box::new(inline_code));
        handlers.register(NodeKind::Html, Box::new(html));
        handlers
    }
}

impl MarkdownHandlers {
    pub fn register(&mut self, kind: NodeKind, handler: ToMarkdownHandler) {
        self.handlers.insert(kind, handler);
    }

    #[inline]
    pub fn get(&self, kind: NodeKind) -> Option<&ToMarkdownHandler> {
        self.handlers.get(&kind)
    }
}

impl std::fmt::Debug for MarkdownHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}

/// Output state shared by all handlers during one emit.
pub struct MarkdownContext<'a> {
    handlers: &'a MarkdownHandlers,
    writer: &'a mut dyn std::fmt::Write,
    last_char: Option<char>,
}

impl<'a> MarkdownContext<'a> {
    pub fn write_str(&mut self, s: &str) -> Result<(), EmitError> {
        if let Some(ch) = s.chars().next_back() {
            self.last_char = Some(ch);
        }
        self.writer.write_str(s)?;
        Ok(())
    }

    /// Dispatch `node` to the handler registered for its kind.
    pub fn emit(&mut self, node: &Node) -> Result<(), EmitError> {
        let handlers = self.handlers;
        let Some(handler) = handlers.get(node.kind()) else {
            return Err(EmitError::UnhandledNode(node.kind()));
        };
        handler(node, self)
    }

    /// Emit `nodes` with `separator` between each pair.
    pub fn emit_all(&mut self, nodes: &[Node], separator: &str) -> Result<(), EmitError> {
        for (index, node) in nodes.iter().enumerate() {
            if index > 0 {
                self.write_str(separator)?;
            }
            self.emit(node)?;
        }
        Ok(())
    }
}

mod private {
    pub struct FmtWriter<W>(pub W);
    impl<W: std::io::Write> std::fmt::Write for FmtWriter<W> {
        #[inline]
        fn write_str(&mut self, s: &str) -> std::fmt::Result {
            self.0.write_all(s.as_bytes()).map_err(|_| std::fmt::Error)
        }
    }
}

/// Serializes a tree back to markdown text.
pub struct Emitter<'h, W> {
    writer: W,
    handlers: &'h MarkdownHandlers,
}

impl<'h, W: std::io::Write> Emitter<'h, private::FmtWriter<W>> {
    pub fn with_io_writer(writer: W, handlers: &'h MarkdownHandlers) -> Self {
        Self {
            writer: private::FmtWriter(writer),
            handlers,
        }
    }
}

impl<'h, W: std::fmt::Write> Emitter<'h, W> {
    pub fn new(writer: W, handlers: &'h MarkdownHandlers) -> Self {
        Self { writer, handlers }
    }

    /// Emit `node`. Non-empty output always ends with a single line ending.
    pub fn emit(mut self, node: &Node) -> Result<(), EmitError> {
        let mut context = MarkdownContext {
            handlers: self.handlers,
            writer: &mut self.writer,
            last_char: None,
        };
        context.emit(node)?;
        if context.last_char.is_some_and(|ch| ch != '\n') {
            context.write_str("\n")?;
        }
        Ok(())
    }
}

fn root(node: &Node, context: &mut MarkdownContext<'_>) -> Result<(), EmitError> {
    context.emit_all(node.children().unwrap_or_default(), "\n\n")
}

fn heading(node: &Node, context: &mut MarkdownContext<'_>) -> Result<(), EmitError> {
    let Node::Heading(Heading {
        depth, children, ..
    }) = node
    else {
        return Err(EmitError::UnhandledNode(node.kind()));
    };

    let depth = usize::from((*depth).clamp(1, 6));
    context.write_str(&"#".repeat(depth))?;
    if !children.is_empty() {
        context.write_str(" ")?;
        context.emit_all(children, "")?;
    }
    Ok(())
}

fn paragraph(node: &Node, context: &mut MarkdownContext<'_>) -> Result<(), EmitError> {
    context.emit_all(node.children().unwrap_or_default(), "")
}

fn text(node: &Node, context: &mut MarkdownContext<'_>) -> Result<(), EmitError> {
    let Node::Text(text) = node else {
        return Err(EmitError::UnhandledNode(node.kind()));
    };
    context.write_str(&escape_text(&text.value))
}

fn inline_code(node: &Node, context: &mut MarkdownContext<'_>) -> Result<(), EmitError> {
    let Node::InlineCode(code) = node else {
        return Err(EmitError::UnhandledNode(node.kind()));
    };

    let value = code.value.as_str();
    let fence = "`".repeat(value.longest_run_of('`') + 1);
    let pad = value.starts_with('`')
        || value.ends_with('`')
        || (value.starts_with(' ') && value.ends_with(' ') && !value.trim().is_empty());

    context.write_str(&fence)?;
    if pad {
        context.write_str(" ")?;
    }
    context.write_str(value)?;
    if pad {
        context.write_str(" ")?;
    }
    context.write_str(&fence)
}

fn html(node: &Node, context: &mut MarkdownContext<'_>) -> Result<(), EmitError> {
    let Node::Html(html) = node else {
        return Err(EmitError::UnhandledNode(node.kind()));
    };
    context.write_str(&html.value)
}

/// Escape text so that it reads back as the same text: a literal `<!--` is
/// never re-read as a comment opener, and a literal `&` is never re-read as
/// a character reference.
pub fn escape_text(value: &str) -> std::borrow::Cow<'_, str> {
    let needs_escape = |rest: &str| {
        rest.starts_with("<!--") || (rest.starts_with('&') && starts_character_reference(rest))
    };
    if !value.char_indices().any(|(index, _)| needs_escape(&value[index..])) {
        return std::borrow::Cow::Borrowed(value);
    }

    let mut out = String::with_capacity(value.len() + 8);
    for (index, ch) in value.char_indices() {
        let rest = &value[index..];
        match ch {
            '<' if rest.starts_with("<!--") => out.push_str("&lt;"),
            '&' if starts_character_reference(rest) => out.push_str("&amp;"),
            ch => out.push(ch),
        }
    }
    std::borrow::Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_markdown(node: &Node) -> String {
        let handlers = MarkdownHandlers::default();
        let mut out = String::new();
        Emitter::new(&mut out, &handlers).emit(node).unwrap();
        out
    }

    #[test]
    fn blocks_are_separated_by_blank_lines() {
        let tree = Node::root(vec![
            Node::heading(2, vec![Node::text("Title")]),
            Node::paragraph(vec![Node::text("one\ntwo")]),
            Node::paragraph(vec![Node::text("three")]),
        ]);
        assert_eq!(to_markdown(&tree), "## Title\n\none\ntwo\n\nthree\n");
    }

    #[test]
    fn empty_root_is_empty() {
        assert_eq!(to_markdown(&Node::root(vec![])), "");
    }

    #[test]
    fn inline_code_fences() {
        let tree = Node::paragraph(vec![
            Node::inline_code("a"),
            Node::text(" "),
            Node::inline_code("a`b"),
            Node::text(" "),
            Node::inline_code("`x"),
        ]);
        assert_eq!(to_markdown(&tree), "`a` ``a`b`` `` `x ``\n");
    }

    #[test]
    fn text_escapes() {
        assert_eq!(escape_text("plain < text"), "plain < text");
        assert_eq!(escape_text("a <!-- b"), "a &lt;!-- b");
        assert_eq!(escape_text("&amp; & co"), "&amp;amp; & co");
    }

    #[test]
    fn unhandled_node_is_an_error() {
        let handlers = MarkdownHandlers::default();
        let mut out = String::new();
        let err = Emitter::new(&mut out, &handlers)
            .emit(&Node::comment("x"))
            .unwrap_err();
        assert!(matches!(err, EmitError::UnhandledNode(NodeKind::Comment)));
    }

    #[test]
    fn io_writer() {
        let handlers = MarkdownHandlers::default();
        let mut out = Vec::new();
        Emitter::with_io_writer(&mut out, &handlers)
            .emit(&Node::paragraph(vec![Node::text("hi")]))
            .unwrap();
        assert_eq!(out, b"hi\n");
    }
}
