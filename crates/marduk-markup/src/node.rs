// ── Attribute ─────────────────────────────────────────────────────────────

/// A single `name="value"` pair, kept exactly as written (no parsing).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into() }
    }

    /// Case-insensitive name comparison, matching how the registry keys names.
    #[inline]
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

// ── RawTagNode ────────────────────────────────────────────────────────────

/// One element of the markup tree, before any macro expansion or widget
/// construction.
///
/// ```lml
/// <table pad="4">
///     <label text="Name"/>
///     <:forEach item="a;b;c"><label text="{item}"/></:forEach>
/// </table>
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawTagNode {
    /// Tag name without the macro marker: `"table"`, `"forEach"`.
    pub name: String,
    /// Whether the tag was written with the macro marker (`<:name>`).
    pub is_macro: bool,
    /// Attributes in declaration order.
    pub attributes: Vec<Attribute>,
    /// Nested elements in document order.
    pub children: Vec<RawTagNode>,
    /// Text between the child elements. Each line is trimmed; blank lines are dropped.
    pub text: String,
    /// 1-based line of the opening `<`.
    pub line: usize,
    /// 1-based column of the opening `<`.
    pub col: usize,
}

impl RawTagNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    /// A node that is expanded as a macro regardless of registered tag names.
    pub fn macro_tag(name: impl Into<String>) -> Self {
        Self { name: name.into(), is_macro: true, ..Self::default() }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(Attribute::new(name, value));
        self
    }

    pub fn with_child(mut self, child: RawTagNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Look up an attribute value by name (case-insensitive). First match wins.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.iter().find(|a| a.is(name)).map(|a| a.value.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.is(name))
    }

    /// Whether this node has any non-blank text.
    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }

    /// Total number of nodes in this subtree, including `self`.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(RawTagNode::subtree_len).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attr_lookup_ignores_case() {
        let node = RawTagNode::new("label").with_attr("fillParent", "true");
        assert_eq!(node.attr("fillparent"), Some("true"));
        assert!(node.has_attr("FILLPARENT"));
        assert_eq!(node.attr("text"), None);
    }

    #[test]
    fn subtree_len_counts_all_descendants() {
        let node = RawTagNode::new("table")
            .with_child(RawTagNode::new("label"))
            .with_child(RawTagNode::new("group").with_child(RawTagNode::new("image")));
        assert_eq!(node.subtree_len(), 4);
    }
}
