/// What to do with markup the registry does not recognize.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Strictness {
    /// Fail the whole parse.
    #[default]
    Fail,
    /// Log a warning and skip the attribute (or the whole tag subtree).
    Warn,
}

/// Parser configuration.
///
/// Defaults are fail-fast: a partially configured widget tree is worse than
/// none, so only the two unknown-name cases can be relaxed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserConfig {
    pub unknown_attributes: Strictness,
    pub unknown_tags: Strictness,
    /// Maximum nesting of macro invocations (imports and user macros included).
    pub max_depth: usize,
    /// Maximum number of nodes macro expansion may produce for one document.
    pub max_expansions: usize,
    /// Separator for list values (`forEach`, `ids`, `exists`).
    pub list_separator: char,
    /// Leading character that marks a macro tag in the markup.
    pub macro_marker: char,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            unknown_attributes: Strictness::Fail,
            unknown_tags: Strictness::Fail,
            max_depth: 64,
            max_expansions: 10_000,
            list_separator: ';',
            macro_marker: marduk_markup::lexer::DEFAULT_MACRO_MARKER,
        }
    }
}

impl ParserConfig {
    /// Warn-and-skip for unknown attributes and tags.
    pub fn lenient() -> Self {
        Self { unknown_attributes: Strictness::Warn, unknown_tags: Strictness::Warn, ..Self::default() }
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn max_expansions(mut self, count: usize) -> Self {
        self.max_expansions = count;
        self
    }

    pub fn list_separator(mut self, separator: char) -> Self {
        self.list_separator = separator;
        self
    }

    pub fn macro_marker(mut self, marker: char) -> Self {
        self.macro_marker = marker;
        self
    }

    pub(crate) fn markup_options(&self) -> marduk_markup::MarkupOptions {
        marduk_markup::MarkupOptions { macro_marker: self.macro_marker }
    }
}
