use std::collections::HashMap;

use crate::{CharExt as _, Heading, HtmlOptions, Node, NodeKind};

/// A node of the secondary (HTML) tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HtmlNode {
    Root(Vec<HtmlNode>),
    Element(Element),
    Text(String),
    /// Passed through to the output verbatim.
    Raw(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag_name: String,
    pub children: Vec<HtmlNode>,
}

impl HtmlNode {
    #[inline]
    pub fn element(tag_name: impl Into<String>, children: Vec<HtmlNode>) -> Self {
        HtmlNode::Element(Element {
            tag_name: tag_name.into(),
            children,
        })
    }

    #[inline]
    pub fn text(value: impl Into<String>) -> Self {
        HtmlNode::Text(value.into())
    }

    #[inline]
    pub fn raw(value: impl Into<String>) -> Self {
        HtmlNode::Raw(value.into())
    }
}

/// Projects one primary node into zero or more secondary nodes.
pub type ToHtmlHandler = Box<dyn Fn(&Node, &mut Projector<'_>) -> Vec<HtmlNode> + Send + Sync>;

/// Projection handlers keyed by node kind.
pub struct HtmlHandlers {
    handlers: HashMap<NodeKind, ToHtmlHandler>,
}

impl Default for HtmlHandlers {
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

impl HtmlHandlers {
    pub fn register(&mut self, kind: NodeKind, handler: ToHtmlHandler) {
        self.handlers.insert(kind, handler);
    }

    #[inline]
    pub fn get(&self, kind: NodeKind) -> Option<&ToHtmlHandler> {
        self.handlers.get(&kind)
    }
}

impl std::fmt::Debug for HtmlHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}

/// Tree-to-tree conversion from the primary tree to [`HtmlNode`]s.
pub struct Projector<'a> {
    handlers: &'a HtmlHandlers,
    options: HtmlOptions,
}

impl<'a> Projector<'a> {
    pub fn new(handlers: &'a HtmlHandlers, options: HtmlOptions) -> Self {
        Self { handlers, options }
    }

    #[inline]
    pub fn options(&self) -> HtmlOptions {
        self.options
    }

    /// Project a single node. Kinds without a handler project to nothing.
    pub fn project(&mut self, node: &Node) -> Vec<HtmlNode> {
        let handlers = self.handlers;
        match handlers.get(node.kind()) {
            Some(handler) => handler(node, self),
            None => {
                tracing::trace!(kind = %node.kind(), "no html handler, dropping node");
                vec![]
            }
        }
    }

    /// Project `nodes` and concatenate the results.
    pub fn all(&mut self, nodes: &[Node]) -> Vec<HtmlNode> {
        nodes.iter().flat_map(|node| self.project(node)).collect()
    }

    /// Project flow `nodes`, separating each pair of source nodes by a line
    /// ending. The separator is emitted even around nodes that project to
    /// nothing, so an elided node between two blocks still contributes its
    /// line ending.
    pub fn wrap(&mut self, nodes: &[Node]) -> Vec<HtmlNode> {
        let mut out = vec![];
        for (index, node) in nodes.iter().enumerate() {
            if index > 0 {
                out.push(HtmlNode::text("\n"));
            }
            out.extend(self.project(node));
        }
        out
    }
}

/// Project a primary tree into an HTML tree.
pub fn project(node: &Node, handlers: &HtmlHandlers, options: HtmlOptions) -> HtmlNode {
    let mut projector = Projector::new(handlers, options);
    let mut nodes = projector.project(node);
    match (nodes.len(), nodes.first()) {
        (1, Some(HtmlNode::Root(_))) => nodes.remove(0),
        _ => HtmlNode::Root(nodes),
    }
}

fn root(node: &Node, projector: &mut Projector<'_>) -> Vec<HtmlNode> {
    vec![HtmlNode::Root(
        projector.wrap(node.children().unwrap_or_default()),
    )]
}

fn heading(node: &Node, projector: &mut Projector<'_>) -> Vec<HtmlNode> {
    let Node::Heading(Heading {
        depth, children, ..
    }) = node
    else {
        return vec![];
    };
    let tag_name = format!("h{}", (*depth).clamp(1, 6));
    vec![HtmlNode::element(tag_name, projector.all(children))]
}

fn paragraph(node: &Node, projector: &mut Projector<'_>) -> Vec<HtmlNode> {
    vec![HtmlNode::element(
        "p",
        projector.all(node.children().unwrap_or_default()),
    )]
}

fn text(node: &Node, _: &mut Projector<'_>) -> Vec<HtmlNode> {
    match node {
        Node::Text(text) => vec![HtmlNode::text(text.value.as_str())],
        _ => vec![],
    }
}

fn inline_code(node: &Node, _: &mut Projector<'_>) -> Vec<HtmlNode> {
    match node {
        Node::InlineCode(code) => vec![HtmlNode::element(
            "code",
            vec![HtmlNode::text(code.value.as_str())],
        )],
        _ => vec![],
    }
}

fn html(node: &Node, projector: &mut Projector<'_>) -> Vec<HtmlNode> {
    match node {
        Node::Html(html) if projector.options().allow_dangerous_html => {
            vec![HtmlNode::raw(html.value.as_str())]
        }
        _ => vec![],
    }
}

/// Writes an [`HtmlNode`] tree as HTML text.
pub struct HtmlEmitter<W> {
    writer: W,
}

impl<W: std::fmt::Write> HtmlEmitter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn emit(mut self, node: &HtmlNode) -> Result<(), std::fmt::Error> {
        write_node(&mut self.writer, node)
    }
}

fn write_node(writer: &mut impl std::fmt::Write, node: &HtmlNode) -> Result<(), std::fmt::Error> {
    match node {
        HtmlNode::Root(children) => children
            .iter()
            .try_for_each(|child| write_node(writer, child)),
        HtmlNode::Element(element) => {
            write!(writer, "<{}>", element.tag_name)?;
            for child in &element.children {
                write_node(writer, child)?;
            }
            write!(writer, "</{}>", element.tag_name)
        }
        HtmlNode::Text(text) => write_escaped(writer, text),
        HtmlNode::Raw(raw) => writer.write_str(raw),
    }
}

fn write_escaped(writer: &mut impl std::fmt::Write, text: &str) -> Result<(), std::fmt::Error> {
    let mut rest = text;
    while let Some(index) = rest.find(|ch: char| ch.must_escape_html()) {
        writer.write_str(&rest[..index])?;
        let ch = rest[index..].chars().next().unwrap_or_default();
        writer.write_str(match ch {
            '&' => "&amp;",
            '<' => "&lt;",
            '>' => "&gt;",
            _ => "&quot;",
        })?;
        rest = &rest[index + ch.len_utf8()..];
    }
    writer.write_str(rest)
}

/// Render an HTML tree to a string.
pub fn to_html(node: &HtmlNode) -> Result<String, std::fmt::Error> {
    let mut out = String::new();
    HtmlEmitter::new(&mut out).emit(node)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(node: &Node, options: HtmlOptions) -> String {
        let handlers = HtmlHandlers::default();
        to_html(&project(node, &handlers, options)).unwrap()
    }

    #[test]
    fn blocks_are_joined_by_line_endings() {
        let tree = Node::root(vec![
            Node::heading(1, vec![Node::text("Title")]),
            Node::paragraph(vec![Node::text("a "), Node::inline_code("b")]),
        ]);
        assert_eq!(
            render(&tree, HtmlOptions::default()),
            "<h1>Title</h1>\n<p>a <code>b</code></p>"
        );
    }

    #[test]
    fn unhandled_nodes_still_get_separators() {
        let tree = Node::root(vec![
            Node::paragraph(vec![Node::text("a")]),
            Node::comment("x"),
            Node::paragraph(vec![Node::text("b")]),
        ]);
        assert_eq!(
            render(&tree, HtmlOptions::default()),
            "<p>a</p>\n\n<p>b</p>"
        );
    }

    #[test]
    fn text_is_escaped() {
        let tree = Node::paragraph(vec![Node::text("a < b & \"c\" > d")]);
        assert_eq!(
            render(&tree, HtmlOptions::default()),
            "<p>a &lt; b &amp; &quot;c&quot; &gt; d</p>"
        );
    }

    #[test]
    fn raw_html_needs_opt_in() {
        let tree = Node::paragraph(vec![
            Node::html("<b>"),
            Node::text("x"),
            Node::html("</b>"),
        ]);
        assert_eq!(render(&tree, HtmlOptions::default()), "<p>x</p>");
        assert_eq!(
            render(&tree, HtmlOptions::default().allow_dangerous_html(true)),
            "<p><b>x</b></p>"
        );
    }

    #[test]
    fn bare_node_is_wrapped_in_root() {
        let handlers = HtmlHandlers::default();
        let projected = project(&Node::text("x"), &handlers, HtmlOptions::default());
        assert_eq!(projected, HtmlNode::Root(vec![HtmlNode::text("x")]));
    }
}
