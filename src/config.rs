/// Options of the comment extension.
///
/// Both flags are independent: `ast` decides whether comments survive in the
/// primary tree (and therefore in markdown output), `preserve_html` decides
/// whether they are carried into HTML output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, rename_all = "camelCase")
)]
pub struct CommentOptions {
    /// Keep comment nodes in the primary tree. Default: `false`, comments are
    /// recognized and then dropped as if they were whitespace.
    pub ast: bool,
    /// Emit comments into HTML output as `<!--value-->`. Default: `false`,
    /// comments leave no trace in HTML.
    pub preserve_html: bool,
}

impl CommentOptions {
    #[inline]
    pub fn ast(mut self, ast: bool) -> Self {
        self.ast = ast;
        self
    }

    #[inline]
    pub fn preserve_html(mut self, preserve_html: bool) -> Self {
        self.preserve_html = preserve_html;
        self
    }

    /// Whether comment nodes must be kept when building a tree for `target`.
    #[inline]
    pub fn keeps_comments(&self, target: Target) -> bool {
        match target {
            Target::Markdown => self.ast,
            Target::Html => self.ast || self.preserve_html,
        }
    }
}

/// Options of the HTML projection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, rename_all = "camelCase")
)]
pub struct HtmlOptions {
    /// Pass raw inline HTML from the document through to the output. When
    /// unset, raw HTML nodes are dropped.
    pub allow_dangerous_html: bool,
}

impl HtmlOptions {
    #[inline]
    pub fn allow_dangerous_html(mut self, allow: bool) -> Self {
        self.allow_dangerous_html = allow;
        self
    }
}

/// What a primary tree is being built for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Target {
    /// The tree is returned to the caller or serialized back to markdown.
    #[default]
    Markdown,
    /// The tree is only an intermediate step towards HTML.
    Html,
}
