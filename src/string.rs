use crate::CharExt as _;

pub trait StringExt {
    fn is_all_spaces_and_tabs(&self) -> bool;
    /// Remove exactly one leading line ending (`\n`, `\r\n` or `\r`).
    fn strip_leading_line_ending(&self) -> &str;
    /// Remove exactly one trailing line ending (`\n`, `\r\n` or `\r`).
    fn strip_trailing_line_ending(&self) -> &str;
    fn contains_line_ending(&self) -> bool;
    /// Length in bytes of the longest run of `ch`.
    fn longest_run_of(&self, ch: char) -> usize;
}

impl StringExt for str {
    fn is_all_spaces_and_tabs(&self) -> bool {
        self.chars().all(|ch| ch.is_space_or_tab())
    }

    fn strip_leading_line_ending(&self) -> &str {
        if let Some(rest) = self.strip_prefix("\r\n") {
            rest
        } else if let Some(rest) = self.strip_prefix(['\n', '\r']) {
            rest
        } else {
            self
        }
    }

    fn strip_trailing_line_ending(&self) -> &str {
        if let Some(rest) = self.strip_suffix("\r\n") {
            rest
        } else if let Some(rest) = self.strip_suffix(['\n', '\r']) {
            rest
        } else {
            self
        }
    }

    fn contains_line_ending(&self) -> bool {
        self.chars().any(|ch| ch.is_linebreak())
    }

    fn longest_run_of(&self, ch: char) -> usize {
        let mut longest = 0;
        let mut current = 0;
        for c in self.chars() {
            if c == ch {
                current += 1;
                longest = longest.max(current);
            } else {
                current = 0;
            }
        }
        longest
    }
}
