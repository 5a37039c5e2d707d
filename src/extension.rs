use std::sync::Arc;

use crate::{
    Construct, Constructs, FromMarkdownHandler, FromMarkdownHandlers, HtmlHandlers, MarkdownHandlers,
    NodeKind, ToHtmlHandler, ToMarkdownHandler, TokenType,
};

/// Everything a pipeline dispatches on: constructs for tokenizing, and
/// per-kind handlers for each tree conversion. Built once, then shared by
/// every document the pipeline processes.
#[derive(Debug)]
pub struct Registry {
    pub constructs: Constructs,
    pub from_markdown: FromMarkdownHandlers,
    pub to_markdown: MarkdownHandlers,
    pub to_html: HtmlHandlers,
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            constructs: Constructs::builtin(),
            from_markdown: FromMarkdownHandlers::default(),
            to_markdown: MarkdownHandlers::default(),
            to_html: HtmlHandlers::default(),
        }
    }
}

impl Registry {
    #[inline]
    pub fn construct(&mut self, construct: Arc<dyn Construct>) -> &mut Self {
        self.constructs.register(construct);
        self
    }

    #[inline]
    pub fn from_markdown(&mut self, ty: TokenType, handler: FromMarkdownHandler) -> &mut Self {
        self.from_markdown.register(ty, handler);
        self
    }

    #[inline]
    pub fn to_markdown(&mut self, kind: NodeKind, handler: ToMarkdownHandler) -> &mut Self {
        self.to_markdown.register(kind, handler);
        self
    }

    #[inline]
    pub fn to_html(&mut self, kind: NodeKind, handler: ToHtmlHandler) -> &mut Self {
        self.to_html.register(kind, handler);
        self
    }
}

/// A syntax extension: registers constructs and handlers with a pipeline.
pub trait Extension {
    fn register(&self, registry: &mut Registry);
}
