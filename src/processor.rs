use std::io::BufRead;

use crate::{
    build_tree, project, to_html, tokenize, CommentExtension, CommentOptions, Emitter, Error,
    Extension, HtmlNode, HtmlOptions, Node, Registry, Target, Tokens,
};

/// A markdown pipeline: tokenizer, tree builder, markdown emitter and HTML
/// projection, configured once with extensions and then reused.
///
/// ```
/// use mdcomment::{CommentOptions, Processor};
///
/// let processor = Processor::with_comments(CommentOptions::default());
/// let out = processor.process("# This <!-- inline -->document\n").unwrap();
/// assert_eq!(out, "# This document\n");
/// ```
#[derive(Debug, Default)]
pub struct Processor {
    registry: Registry,
    html_options: HtmlOptions,
}

impl Processor {
    /// A processor that knows only the built-in constructs.
    pub fn new() -> Self {
        Self::default()
    }

    /// A processor with the comment extension registered.
    pub fn with_comments(options: CommentOptions) -> Self {
        Self::new().with_extension(CommentExtension::new(options))
    }

    pub fn with_extension(mut self, extension: impl Extension) -> Self {
        extension.register(&mut self.registry);
        self
    }

    pub fn with_html_options(mut self, options: HtmlOptions) -> Self {
        self.html_options = options;
        self
    }

    #[inline]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    #[inline]
    pub fn html_options(&self) -> HtmlOptions {
        self.html_options
    }

    pub fn tokenize(&self, source: &str) -> Tokens {
        tokenize(source, &self.registry.constructs)
    }

    /// Parse `source` into a primary tree.
    pub fn parse(&self, source: &str) -> Node {
        self.parse_for(source, Target::Markdown)
    }

    /// Parse `source` into a primary tree that is meant for `target`.
    pub fn parse_for(&self, source: &str, target: Target) -> Node {
        let tokens = self.tokenize(source);
        build_tree(source, &tokens, &self.registry.from_markdown, target)
    }

    /// Parse everything `reader` yields. The input must be UTF-8.
    pub fn parse_reader<R: BufRead>(&self, mut reader: R) -> Result<Node, Error> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        let source = std::str::from_utf8(&bytes)?;
        Ok(self.parse(source))
    }

    /// Serialize a tree (or any single node) to markdown.
    pub fn stringify(&self, node: &Node) -> Result<String, Error> {
        let mut out = String::new();
        Emitter::new(&mut out, &self.registry.to_markdown).emit(node)?;
        Ok(out)
    }

    pub fn stringify_to<W: std::io::Write>(&self, node: &Node, writer: W) -> Result<(), Error> {
        Emitter::with_io_writer(writer, &self.registry.to_markdown).emit(node)?;
        Ok(())
    }

    /// Parse and serialize back to markdown.
    pub fn process(&self, source: &str) -> Result<String, Error> {
        let tree = self.parse(source);
        tracing::debug!(
            blocks = tree.children().map_or(0, <[Node]>::len),
            "parsed document"
        );
        self.stringify(&tree)
    }

    /// Project a primary tree into the HTML tree.
    pub fn project(&self, node: &Node) -> HtmlNode {
        project(node, &self.registry.to_html, self.html_options)
    }

    /// Parse `source` and render it as HTML.
    pub fn render_html(&self, source: &str) -> Result<String, Error> {
        let tree = self.parse_for(source, Target::Html);
        let html = self.project(&tree);
        Ok(to_html(&html)?)
    }
}
