//! Parser driver: markup → raw tags → macro expansion → targets.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use marduk_markup::Attribute;

use crate::action::Actions;
use crate::config::ParserConfig;
use crate::error::{LmlError, LmlErrorKind, TagPath};
use crate::expand::{Expander, Scope};
use crate::syntax::LmlSyntax;
use crate::tag::TreeBuilder;
use crate::widget::Widget;

// ── Providers ─────────────────────────────────────────────────────────────

/// Key-value source for arguments and translations.
pub trait Lookup: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

impl Lookup for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// Source of template text for `<:import>`.
pub trait TemplateLoader: Send + Sync {
    fn load(&self, path: &str) -> Option<String>;
}

impl TemplateLoader for HashMap<String, String> {
    fn load(&self, path: &str) -> Option<String> {
        self.get(path).cloned()
    }
}

// ── Document ──────────────────────────────────────────────────────────────

/// Result of one parse: the root widgets and every id registered on close.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub roots: Vec<Widget>,
    /// Ids in the order their tags closed.
    pub ids: Vec<String>,
}

impl Document {
    /// Depth-first search across all roots.
    pub fn named(&self, id: &str) -> Option<&Widget> {
        self.roots.iter().find_map(|root| root.find(id))
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Total widget count across all roots.
    pub fn len(&self) -> usize {
        self.roots.iter().map(Widget::count).sum()
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for root in &self.roots {
            write!(f, "{root}")?;
        }
        Ok(())
    }
}

// ── LmlParser ─────────────────────────────────────────────────────────────

/// Parses markup against a shared [`LmlSyntax`].
///
/// Configuration is builder-style and done up front; [`parse`](Self::parse)
/// only takes `&self`, so one parser can serve concurrent parses.
///
/// ```rust
/// use marduk_lml::LmlParser;
///
/// let parser = LmlParser::default().argument("name", "World");
/// let doc = parser.parse(r#"<label text="Hi {name}"/>"#).unwrap();
/// assert_eq!(doc.roots[0].text.as_deref(), Some("Hi World"));
/// ```
pub struct LmlParser {
    syntax: Arc<LmlSyntax>,
    config: ParserConfig,
    arguments: HashMap<String, String>,
    argument_source: Option<Box<dyn Lookup>>,
    translations: HashMap<String, String>,
    translation_source: Option<Box<dyn Lookup>>,
    actions: Actions,
    templates: HashMap<String, String>,
    loader: Option<Box<dyn TemplateLoader>>,
    styles: Vec<(String, Attribute)>,
}

impl Default for LmlParser {
    fn default() -> Self {
        Self::new(Arc::new(LmlSyntax::default()))
    }
}

impl LmlParser {
    pub fn new(syntax: Arc<LmlSyntax>) -> Self {
        Self {
            syntax,
            config: ParserConfig::default(),
            arguments: HashMap::new(),
            argument_source: None,
            translations: HashMap::new(),
            translation_source: None,
            actions: Actions::new(),
            templates: HashMap::new(),
            loader: None,
            styles: Vec::new(),
        }
    }

    pub fn config(mut self, config: ParserConfig) -> Self {
        self.config = config;
        self
    }

    /// A value for `{key}` placeholders. Loop and assign bindings shadow it.
    pub fn argument(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    /// Fallback source for arguments not set with [`argument`](Self::argument).
    pub fn arguments(mut self, source: Box<dyn Lookup>) -> Self {
        self.argument_source = Some(source);
        self
    }

    /// A value for `{@key}` placeholders.
    pub fn translation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.translations.insert(key.into(), value.into());
        self
    }

    pub fn translations(mut self, source: Box<dyn Lookup>) -> Self {
        self.translation_source = Some(source);
        self
    }

    pub fn action<F>(mut self, name: impl Into<String>, action: F) -> Self
    where
        F: Fn(Option<&mut Widget>) -> Option<String> + Send + Sync + 'static,
    {
        self.actions.insert(name, action);
        self
    }

    /// An in-memory template for `<:import path="…">`.
    pub fn template(mut self, path: impl Into<String>, source: impl Into<String>) -> Self {
        self.templates.insert(path.into(), source.into());
        self
    }

    /// Fallback loader for templates not registered with [`template`](Self::template).
    pub fn templates(mut self, loader: Box<dyn TemplateLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// A document-wide attribute default for `tag`, like `<:style>`.
    pub fn style(mut self, tag: impl Into<String>, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.styles.push((tag.into(), Attribute::new(name, value)));
        self
    }

    // ── accessors used during a parse ─────────────────────────────────────

    pub fn syntax(&self) -> &LmlSyntax {
        &self.syntax
    }

    pub(crate) fn parser_config(&self) -> &ParserConfig {
        &self.config
    }

    pub(crate) fn actions(&self) -> &Actions {
        &self.actions
    }

    pub(crate) fn styles(&self) -> &[(String, Attribute)] {
        &self.styles
    }

    pub(crate) fn lookup_argument(&self, key: &str) -> Option<String> {
        self.arguments.get(key).cloned().or_else(|| self.argument_source.as_ref()?.get(key))
    }

    pub(crate) fn translate(&self, key: &str) -> Option<String> {
        self.translations.get(key).cloned().or_else(|| self.translation_source.as_ref()?.get(key))
    }

    pub(crate) fn load_template(&self, path: &str) -> Option<String> {
        self.templates.get(path).cloned().or_else(|| self.loader.as_ref()?.load(path))
    }

    // ── parsing ───────────────────────────────────────────────────────────

    pub fn parse(&self, src: &str) -> Result<Document, LmlError> {
        self.run(src, Expander::new(self))
    }

    /// Parses a template from the registered templates or the loader.
    pub fn parse_template(&self, path: &str) -> Result<Document, LmlError> {
        let src = self
            .load_template(path)
            .ok_or_else(|| LmlErrorKind::TemplateNotFound(path.to_string()).at(&TagPath::root()))?;
        self.run(&src, Expander::new(self).within_template(path))
    }

    fn run(&self, src: &str, mut expander: Expander<'_>) -> Result<Document, LmlError> {
        let nodes = marduk_markup::parse_with(src, self.config.markup_options())?;
        let mut scope = Scope::new();
        let expanded = expander.expand_nodes(&nodes, &mut scope)?;
        log::debug!("expanded {} root tags into {}", nodes.len(), expanded.len());
        TreeBuilder::new(self).build(&expanded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn parser_is_shareable() {
        assert_send_sync::<LmlParser>();
    }

    #[test]
    fn multiple_roots_and_named_lookup() {
        let doc = LmlParser::default()
            .parse(r#"<label id="a" text="A"/><table><image id="b"/></table>"#)
            .unwrap();
        assert_eq!(doc.roots.len(), 2);
        assert_eq!(doc.ids, ["a", "b"]);
        assert!(doc.named("b").is_some());
        assert_eq!(doc.len(), 3);
    }

    #[test]
    fn fallback_sources() {
        let mut args = HashMap::new();
        args.insert("who".to_string(), "source".to_string());
        let parser = LmlParser::default().arguments(Box::new(args)).argument("direct", "set");
        assert_eq!(parser.lookup_argument("who").as_deref(), Some("source"));
        assert_eq!(parser.lookup_argument("direct").as_deref(), Some("set"));
        assert_eq!(parser.lookup_argument("none"), None);
    }

    #[test]
    fn parse_template_detects_self_import() {
        let parser = LmlParser::default().template("self.lml", r#"<:import path="self.lml"/>"#);
        let err = parser.parse_template("self.lml").unwrap_err();
        assert!(matches!(err.kind, LmlErrorKind::ImportCycle(_)));
    }

    #[test]
    fn syntax_errors_carry_root_path() {
        let err = LmlParser::default().parse("<label>").unwrap_err();
        assert!(matches!(err.kind, LmlErrorKind::Syntax(_)));
        assert!(err.path.is_root());
    }
}
