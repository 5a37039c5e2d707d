pub trait CharExt {
    fn is_linebreak(self) -> bool;
    fn is_space_or_tab(self) -> bool;
    fn is_tag_name_char(self) -> bool;
    fn must_escape_html(self) -> bool;
}

impl CharExt for char {
    #[inline]
    fn is_linebreak(self) -> bool {
        self == '\n' || self == '\r'
    }

    #[inline]
    fn is_space_or_tab(self) -> bool {
        self == ' ' || self == '\t'
    }

    #[inline]
    fn is_tag_name_char(self) -> bool {
        self.is_ascii_alphanumeric() || self == '-'
    }

    #[inline]
    fn must_escape_html(self) -> bool {
        matches!(self, '&' | '<' | '>' | '"')
    }
}
