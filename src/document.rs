use crate::Span;

/// A node of the primary document tree.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "type", rename_all = "camelCase")
)]
pub enum Node {
    Root(Root),
    Heading(Heading),
    Paragraph(Paragraph),
    Text(Text),
    InlineCode(InlineCode),
    /// Raw inline HTML, such as `<b>`.
    Html(Html),
    /// An HTML-style comment.
    Comment(Comment),
}

/// The type tag of a [`Node`], used to dispatch to handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeKind {
    Root,
    Heading,
    Paragraph,
    Text,
    InlineCode,
    Html,
    Comment,
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            NodeKind::Root => "root",
            NodeKind::Heading => "heading",
            NodeKind::Paragraph => "paragraph",
            NodeKind::Text => "text",
            NodeKind::InlineCode => "inlineCode",
            NodeKind::Html => "html",
            NodeKind::Comment => "comment",
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Root {
    pub children: Vec<Node>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub position: Option<Span>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Heading {
    /// 1 through 6.
    pub depth: u8,
    pub children: Vec<Node>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub position: Option<Span>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Paragraph {
    pub children: Vec<Node>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub position: Option<Span>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Text {
    pub value: String,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub position: Option<Span>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InlineCode {
    pub value: String,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub position: Option<Span>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Html {
    pub value: String,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub position: Option<Span>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Comment {
    /// The comment text without delimiters, trimmed as described in
    /// [`comment_value`](crate::comment_value).
    pub value: String,
    /// The exact source text, delimiters included, when the node was parsed.
    /// Used to reproduce the original spacing when serializing.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub raw: Option<String>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub position: Option<Span>,
}

impl Node {
    #[inline]
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Root(_) => NodeKind::Root,
            Node::Heading(_) => NodeKind::Heading,
            Node::Paragraph(_) => NodeKind::Paragraph,
            Node::Text(_) => NodeKind::Text,
            Node::InlineCode(_) => NodeKind::InlineCode,
            Node::Html(_) => NodeKind::Html,
            Node::Comment(_) => NodeKind::Comment,
        }
    }

    pub fn children(&self) -> Option<&[Node]> {
        match self {
            Node::Root(Root { children, .. })
            | Node::Heading(Heading { children, .. })
            | Node::Paragraph(Paragraph { children, .. }) => Some(children),
            _ => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::Root(Root { children, .. })
            | Node::Heading(Heading { children, .. })
            | Node::Paragraph(Paragraph { children, .. }) => Some(children),
            _ => None,
        }
    }

    pub fn position(&self) -> Option<Span> {
        match self {
            Node::Root(node) => node.position,
            Node::Heading(node) => node.position,
            Node::Paragraph(node) => node.position,
            Node::Text(node) => node.position,
            Node::InlineCode(node) => node.position,
            Node::Html(node) => node.position,
            Node::Comment(node) => node.position,
        }
    }

    #[inline]
    pub fn root(children: Vec<Node>) -> Self {
        Node::Root(Root {
            children,
            position: None,
        })
    }

    #[inline]
    pub fn heading(depth: u8, children: Vec<Node>) -> Self {
        Node::Heading(Heading {
            depth,
            children,
            position: None,
        })
    }

    #[inline]
    pub fn paragraph(children: Vec<Node>) -> Self {
        Node::Paragraph(Paragraph {
            children,
            position: None,
        })
    }

    #[inline]
    pub fn text(value: impl Into<String>) -> Self {
        Node::Text(Text {
            value: value.into(),
            position: None,
        })
    }

    #[inline]
    pub fn inline_code(value: impl Into<String>) -> Self {
        Node::InlineCode(InlineCode {
            value: value.into(),
            position: None,
        })
    }

    #[inline]
    pub fn html(value: impl Into<String>) -> Self {
        Node::Html(Html {
            value: value.into(),
            position: None,
        })
    }

    /// A comment node without source text, as built by hand.
    #[inline]
    pub fn comment(value: impl Into<String>) -> Self {
        Node::Comment(Comment {
            value: value.into(),
            raw: None,
            position: None,
        })
    }

    /// Drop all `position` fields, recursively. Useful to compare parsed trees
    /// against hand-built ones.
    pub fn without_positions(mut self) -> Self {
        self.strip_positions();
        self
    }

    fn strip_positions(&mut self) {
        match self {
            Node::Root(node) => node.position = None,
            Node::Heading(node) => node.position = None,
            Node::Paragraph(node) => node.position = None,
            Node::Text(node) => node.position = None,
            Node::InlineCode(node) => node.position = None,
            Node::Html(node) => node.position = None,
            Node::Comment(node) => node.position = None,
        }
        if let Some(children) = self.children_mut() {
            children.iter_mut().for_each(Node::strip_positions);
        }
    }
}
