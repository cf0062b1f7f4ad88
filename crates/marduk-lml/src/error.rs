use std::fmt;

use marduk_markup::ParseError;

use crate::value::ValueError;

// ── TagPath ───────────────────────────────────────────────────────────────

/// Chain of tag names (and ids, when known) from the document root down to
/// the tag that failed. Displays as `root/table/label#title`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagPath(Vec<String>);

impl TagPath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Path of a child tag. `id` is appended as `name#id` when present.
    pub fn child(&self, name: &str, id: Option<&str>) -> Self {
        let mut segments = self.0.clone();
        segments.push(match id {
            Some(id) => format!("{name}#{id}"),
            None => name.to_string(),
        });
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Name of the innermost tag, if any.
    pub fn leaf(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }
}

impl fmt::Display for TagPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("root")?;
        for segment in &self.0 {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

// ── LmlErrorKind ──────────────────────────────────────────────────────────

/// What went wrong, independent of where.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LmlErrorKind {
    #[error(transparent)]
    Syntax(#[from] ParseError),
    #[error("unknown tag <{0}>")]
    UnknownTag(String),
    #[error("unknown macro <:{0}>")]
    UnknownMacro(String),
    #[error("unknown attribute `{0}`")]
    UnknownAttribute(String),
    /// The attribute is registered, but not for anything in the target's ancestry.
    #[error("attribute `{attribute}` is not supported by {target}")]
    UnsupportedAttribute { attribute: String, target: String },
    #[error(transparent)]
    ParseValue(#[from] ValueError),
    #[error("cannot construct target: {0}")]
    Construction(String),
    #[error("cannot interpolate `{expression}`: {reason}")]
    Interpolation { expression: String, reason: String },
    #[error("macro expansion nested deeper than {0} levels")]
    RecursionLimitExceeded(usize),
    #[error("macro expansion produced more than {0} nodes")]
    ExpansionLimitExceeded(usize),
    #[error("import cycle: {}", .0.join(" -> "))]
    ImportCycle(Vec<String>),
    #[error("template `{0}` not found")]
    TemplateNotFound(String),
    #[error("unknown action `{0}`")]
    UnknownAction(String),
    /// Raised on purpose by the `exception` macro.
    #[error("{0}")]
    Thrown(String),
}

impl LmlErrorKind {
    pub fn construction(msg: impl Into<String>) -> Self {
        Self::Construction(msg.into())
    }

    pub fn interpolation(expression: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Interpolation { expression: expression.into(), reason: reason.into() }
    }

    /// Attach the tag path, producing a reportable error.
    pub fn at(self, path: &TagPath) -> LmlError {
        LmlError::new(self, path.clone())
    }
}

// ── LmlError ──────────────────────────────────────────────────────────────

/// A failed parse: the error kind plus the tag path (and attribute, when
/// one was being applied) where it happened.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{path}{}: {kind}", .attribute.as_ref().map(|a| format!(" [{a}]")).unwrap_or_default())]
pub struct LmlError {
    pub kind: LmlErrorKind,
    pub path: TagPath,
    pub attribute: Option<String>,
}

impl LmlError {
    pub fn new(kind: LmlErrorKind, path: TagPath) -> Self {
        Self { kind, path, attribute: None }
    }

    pub fn with_attribute(mut self, name: impl Into<String>) -> Self {
        self.attribute = Some(name.into());
        self
    }

    pub fn kind(&self) -> &LmlErrorKind {
        &self.kind
    }

    pub fn path(&self) -> &TagPath {
        &self.path
    }
}

impl From<ParseError> for LmlError {
    fn from(e: ParseError) -> Self {
        Self::new(LmlErrorKind::Syntax(e), TagPath::root())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_display() {
        let path = TagPath::root().child("window", None).child("label", Some("title"));
        assert_eq!(path.to_string(), "root/window/label#title");
        assert_eq!(TagPath::root().to_string(), "root");
        assert_eq!(path.leaf(), Some("label#title"));
    }

    #[test]
    fn error_display_names_path_and_attribute() {
        let path = TagPath::root().child("label", None);
        let err = LmlErrorKind::UnknownAttribute("bogus".into()).at(&path).with_attribute("bogus");
        assert_eq!(err.to_string(), "root/label [bogus]: unknown attribute `bogus`");
    }

    #[test]
    fn import_cycle_display() {
        let kind = LmlErrorKind::ImportCycle(vec!["a.lml".into(), "b.lml".into(), "a.lml".into()]);
        assert_eq!(kind.to_string(), "import cycle: a.lml -> b.lml -> a.lml");
    }
}
