//! Macro expansion: rewrites the raw tag tree before any target exists.
//!
//! Expansion is depth-first. Regular tags get their attributes and text
//! interpolated and their children expanded in a child [`Scope`]; macro tags
//! are handed to their [`MacroProvider`], whose output is spliced into the
//! parent's child list in place of the macro.

mod interpolate;
mod scope;

use std::collections::HashMap;
use std::sync::Arc;

use marduk_markup::{Attribute, RawTagNode};

use crate::config::ParserConfig;
use crate::error::{LmlError, LmlErrorKind, TagPath};
use crate::expr::{self, ExprValue};
use crate::parser::LmlParser;
use crate::syntax::{MacroCall, MacroProvider};

use interpolate::{Segment, has_placeholders, segments};
pub use scope::Scope;

/// Per-parse expansion state, passed explicitly to every macro provider.
pub struct Expander<'p> {
    parser: &'p LmlParser,
    /// Macros defined by `<:macro>` during this parse.
    macros: HashMap<String, Arc<dyn MacroProvider>>,
    /// Tag-level attribute defaults, keyed by lower-case tag name.
    styles: HashMap<String, Vec<Attribute>>,
    depth: usize,
    produced: usize,
    imports: Vec<String>,
    path: TagPath,
}

impl<'p> Expander<'p> {
    pub(crate) fn new(parser: &'p LmlParser) -> Self {
        let mut expander = Self {
            parser,
            macros: HashMap::new(),
            styles: HashMap::new(),
            depth: 0,
            produced: 0,
            imports: Vec::new(),
            path: TagPath::root(),
        };
        for (tag, attribute) in parser.styles() {
            expander.add_style(tag, attribute.clone());
        }
        expander
    }

    /// Marks `path` as the template being expanded, for cycle detection.
    pub(crate) fn within_template(mut self, path: &str) -> Self {
        self.imports.push(path.to_string());
        self
    }

    pub fn config(&self) -> &ParserConfig {
        self.parser.parser_config()
    }

    pub fn path(&self) -> &TagPath {
        &self.path
    }

    pub fn error(&self, kind: LmlErrorKind) -> LmlError {
        kind.at(&self.path)
    }

    /// Splits a list value with the configured separator.
    pub fn list(&self, raw: &str) -> Vec<String> {
        crate::value::split_list(raw, self.config().list_separator)
    }

    // ── expansion ─────────────────────────────────────────────────────────

    pub fn expand_nodes(&mut self, nodes: &[RawTagNode], scope: &mut Scope<'_>) -> Result<Vec<RawTagNode>, LmlError> {
        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes {
            self.charge()?;
            if self.is_macro_call(node) {
                out.extend(self.expand_macro(node, scope)?);
            } else {
                out.push(self.expand_tag(node, scope)?);
            }
        }
        Ok(out)
    }

    /// Charges one unit of work against `max_expansions`. Every visited node
    /// costs one; repeating macros also pay per iteration, so an empty body
    /// cannot loop unbounded.
    pub fn charge(&mut self) -> Result<(), LmlError> {
        self.produced += 1;
        let max = self.config().max_expansions;
        if self.produced > max {
            return Err(self.error(LmlErrorKind::ExpansionLimitExceeded(max)));
        }
        Ok(())
    }

    fn find_macro(&self, name: &str) -> Option<Arc<dyn MacroProvider>> {
        self.macros
            .get(&name.to_ascii_lowercase())
            .or_else(|| self.parser.syntax().macro_provider(name))
            .cloned()
    }

    /// Marked tags always; unmarked tags only when no tag provider claims
    /// the name and a macro does.
    fn is_macro_call(&self, node: &RawTagNode) -> bool {
        node.is_macro || (self.parser.syntax().tag(&node.name).is_none() && self.find_macro(&node.name).is_some())
    }

    fn within<T>(&mut self, path: TagPath, f: impl FnOnce(&mut Self) -> Result<T, LmlError>) -> Result<T, LmlError> {
        let outer = std::mem::replace(&mut self.path, path);
        let result = f(self);
        self.path = outer;
        result
    }

    fn expand_tag(&mut self, node: &RawTagNode, scope: &mut Scope<'_>) -> Result<RawTagNode, LmlError> {
        let path = self.path.child(&node.name, node.attr("id"));
        self.within(path, |cx| {
            let mut out = RawTagNode { line: node.line, col: node.col, ..RawTagNode::new(node.name.as_str()) };
            for attribute in &node.attributes {
                let value = cx.interpolate(&attribute.value, scope).map_err(|e| e.with_attribute(&attribute.name))?;
                out.attributes.push(Attribute::new(attribute.name.as_str(), value));
            }
            cx.apply_styles(&mut out);
            if node.has_text() {
                out.text = cx.interpolate(&node.text, scope)?;
            }
            let mut inner = scope.child();
            out.children = cx.expand_nodes(&node.children, &mut inner)?;
            Ok(out)
        })
    }

    fn expand_macro(&mut self, node: &RawTagNode, scope: &mut Scope<'_>) -> Result<Vec<RawTagNode>, LmlError> {
        let marker = self.config().macro_marker;
        let path = self.path.child(&format!("{marker}{}", node.name), None);
        self.within(path, |cx| {
            let provider = cx
                .find_macro(&node.name)
                .ok_or_else(|| cx.error(LmlErrorKind::UnknownMacro(node.name.clone())))?;

            let max = cx.config().max_depth;
            if cx.depth >= max {
                return Err(cx.error(LmlErrorKind::RecursionLimitExceeded(max)));
            }

            let attributes = if provider.interpolates_attributes() {
                node.attributes
                    .iter()
                    .map(|a| {
                        let value = cx.interpolate(&a.value, scope).map_err(|e| e.with_attribute(&a.name))?;
                        Ok(Attribute::new(a.name.as_str(), value))
                    })
                    .collect::<Result<Vec<_>, LmlError>>()?
            } else {
                node.attributes.clone()
            };
            let call = MacroCall {
                name: node.name.clone(),
                attributes,
                children: node.children.clone(),
                text: node.text.clone(),
                path: cx.path.clone(),
            };

            log::debug!("expanding macro at {}", cx.path);
            cx.depth += 1;
            let result = provider.expand(&call, cx, scope);
            cx.depth -= 1;
            result
        })
    }

    fn apply_styles(&self, node: &mut RawTagNode) {
        let Some(defaults) = self.styles.get(&node.name.to_ascii_lowercase()) else {
            return;
        };
        for attribute in defaults {
            if !node.has_attr(&attribute.name) {
                node.attributes.push(attribute.clone());
            }
        }
    }

    // ── environment ───────────────────────────────────────────────────────

    /// A scope binding, falling back to the parser's arguments.
    pub fn lookup(&self, name: &str, scope: &Scope<'_>) -> Option<String> {
        scope.get(name).map(str::to_string).or_else(|| self.parser.lookup_argument(name))
    }

    pub fn interpolate(&self, raw: &str, scope: &Scope<'_>) -> Result<String, LmlError> {
        if !has_placeholders(raw) {
            return Ok(raw.to_string());
        }
        let mut out = String::with_capacity(raw.len());
        for segment in segments(raw).map_err(|kind| self.error(kind))? {
            match segment {
                Segment::Literal(text) => out.push_str(&text),
                Segment::Var(name) => {
                    let value = self.lookup(name, scope).ok_or_else(|| {
                        self.error(LmlErrorKind::interpolation(format!("{{{name}}}"), "unknown variable"))
                    })?;
                    out.push_str(&value);
                }
                Segment::Translation(key) => {
                    let value = self.parser.translate(key).ok_or_else(|| {
                        self.error(LmlErrorKind::interpolation(format!("{{@{key}}}"), "missing translation"))
                    })?;
                    out.push_str(&value);
                }
                Segment::Action(name) => {
                    let value = self.parser.actions().invoke(name, None).map_err(|kind| {
                        self.error(LmlErrorKind::interpolation(format!("{{${name}}}"), kind.to_string()))
                    })?;
                    out.push_str(&value.unwrap_or_default());
                }
                Segment::Expr(src) => out.push_str(&self.evaluate(src, scope)?.to_string()),
            }
        }
        Ok(out)
    }

    /// Evaluates an expression. `{…}` placeholders inside it are resolved
    /// like interpolation but enter the expression as single values.
    pub fn evaluate(&self, src: &str, scope: &Scope<'_>) -> Result<ExprValue, LmlError> {
        let resolve = |name: &str| {
            if name.starts_with('{') {
                self.interpolate(name, scope).ok()
            } else {
                self.lookup(name, scope)
            }
        };
        expr::evaluate(src, &resolve).map_err(|e| self.error(LmlErrorKind::interpolation(src, e.to_string())))
    }

    pub fn translate(&self, key: &str) -> Option<String> {
        self.parser.translate(key)
    }

    /// Runs a named action at macro time (no widget).
    pub fn invoke_action(&self, raw: &str) -> Result<Option<String>, LmlError> {
        self.parser.actions().invoke(raw, None).map_err(|kind| self.error(kind))
    }

    // ── definitions ───────────────────────────────────────────────────────

    /// Registers a parse-local macro. It shadows registry macros of the same
    /// name for the rest of this parse.
    pub fn define_macro(&mut self, alias: &str, provider: Arc<dyn MacroProvider>) {
        log::debug!("defining macro `{alias}`");
        self.macros.insert(alias.to_ascii_lowercase(), provider);
    }

    /// Default `attribute` for every later `tag`. Replaces an earlier default
    /// of the same name.
    pub fn add_style(&mut self, tag: &str, attribute: Attribute) {
        let defaults = self.styles.entry(tag.to_ascii_lowercase()).or_default();
        match defaults.iter_mut().find(|a| a.is(&attribute.name)) {
            Some(existing) => *existing = attribute,
            None => defaults.push(attribute),
        }
    }

    // ── templates ─────────────────────────────────────────────────────────

    /// Loads `path`, substitutes `marker` tags with `content` and expands
    /// the result in a child of `scope`.
    pub fn import(
        &mut self,
        path: &str,
        marker: &str,
        content: &[RawTagNode],
        scope: &mut Scope<'_>,
    ) -> Result<Vec<RawTagNode>, LmlError> {
        if self.imports.iter().any(|p| p == path) {
            let mut chain = self.imports.clone();
            chain.push(path.to_string());
            return Err(self.error(LmlErrorKind::ImportCycle(chain)));
        }
        let source = self
            .parser
            .load_template(path)
            .ok_or_else(|| self.error(LmlErrorKind::TemplateNotFound(path.to_string())))?;
        let nodes = marduk_markup::parse_with(&source, self.config().markup_options())
            .map_err(|e| self.error(LmlErrorKind::Syntax(e)))?;
        let nodes = replace_markers(&nodes, marker, content);

        log::debug!("importing `{path}`");
        self.imports.push(path.to_string());
        let mut inner = scope.child();
        let result = self.expand_nodes(&nodes, &mut inner);
        self.imports.pop();
        result
    }
}

/// Replaces every marked `<:marker/>` tag in `nodes` with `content`.
pub fn replace_markers(nodes: &[RawTagNode], marker: &str, content: &[RawTagNode]) -> Vec<RawTagNode> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        if node.is_macro && node.name.eq_ignore_ascii_case(marker) {
            out.extend(content.iter().cloned());
        } else {
            let mut node = node.clone();
            node.children = replace_markers(&node.children, marker, content);
            out.push(node);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn markers_are_replaced_at_any_depth() {
        let body = vec![RawTagNode::new("table").with_child(RawTagNode::macro_tag("content"))];
        let content = vec![RawTagNode::new("label"), RawTagNode::new("image")];
        let out = replace_markers(&body, "content", &content);
        assert_eq!(out[0].children, content);
    }

    #[test]
    fn unmarked_name_is_not_a_marker() {
        let body = vec![RawTagNode::new("content")];
        let out = replace_markers(&body, "content", &[]);
        assert_eq!(out, body);
    }

    #[test]
    fn interpolation_uses_scope_then_arguments() {
        let parser = LmlParser::default().argument("name", "World").argument("shadowed", "arg");
        let cx = Expander::new(&parser);
        let mut scope = Scope::new();
        scope.bind("shadowed", "scope");
        assert_eq!(cx.interpolate("Hi {name}, {shadowed}", &scope).unwrap(), "Hi World, scope");
        assert_eq!(cx.interpolate("{= 2 * 3}", &scope).unwrap(), "6");
        assert_eq!(cx.evaluate("{name} == 'World'", &scope).unwrap(), ExprValue::Bool(true));
        assert!(matches!(
            cx.interpolate("{missing}", &scope).unwrap_err().kind,
            LmlErrorKind::Interpolation { .. }
        ));
    }

    #[test]
    fn translations_and_actions() {
        let parser = LmlParser::default()
            .translation("title", "Welcome")
            .action("user", |_| Some("ada".into()));
        let cx = Expander::new(&parser);
        let scope = Scope::new();
        assert_eq!(cx.interpolate("{@title}, {$user}", &scope).unwrap(), "Welcome, ada");
        assert!(cx.interpolate("{@nope}", &scope).is_err());
        assert!(cx.interpolate("{$nope}", &scope).is_err());
    }

    #[test]
    fn later_style_replaces_earlier() {
        let parser = LmlParser::default();
        let mut cx = Expander::new(&parser);
        cx.add_style("Label", Attribute::new("wrap", "true"));
        cx.add_style("label", Attribute::new("WRAP", "false"));
        let mut node = RawTagNode::new("label");
        cx.apply_styles(&mut node);
        assert_eq!(node.attr("wrap"), Some("false"));

        let mut explicit = RawTagNode::new("label").with_attr("wrap", "true");
        cx.apply_styles(&mut explicit);
        assert_eq!(explicit.attributes.len(), 1);
    }
}
