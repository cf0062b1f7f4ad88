//! The syntax registry: what tag, macro and attribute names mean.
//!
//! Registration happens on a [`SyntaxBuilder`]; [`SyntaxBuilder::build`]
//! freezes it into an [`LmlSyntax`] that parsers share through an `Arc`.
//! To extend an existing syntax, call [`LmlSyntax::to_builder`], register on
//! top and build again; the original is left untouched.
//!
//! Every namespace is keyed by lower-case alias and registration replaces a
//! colliding alias. Attribute processors are additionally keyed by the
//! [`TargetKey`] they were registered for, so `disabled` can mean one thing
//! for Disableable targets and another for scroll panes.

mod attributes;
mod macros;
mod tags;

use std::collections::HashMap;
use std::sync::Arc;

use marduk_markup::RawTagNode;

use crate::action::Actions;
use crate::builder::{ActorBuilder, BuilderFeature};
use crate::error::{LmlError, LmlErrorKind, TagPath};
use crate::expand::{Expander, Scope};
use crate::widget::{CellProps, Listener, Target, TargetKey, WidgetKind, Widget};

pub use tags::{ActorProvider, ListenerProvider};

// ── Tag providers ─────────────────────────────────────────────────────────

/// Creates the target for a tag and decides how it takes text and children.
pub trait TagProvider: Send + Sync {
    /// Building-attribute groups this tag accepts, in lookup order.
    fn builder_features(&self) -> &[BuilderFeature] {
        &[BuilderFeature::Base]
    }

    fn create(&self, builder: &ActorBuilder) -> Result<Target, LmlErrorKind>;

    /// Applies the tag's inner text. `explicit_text` is set when a text
    /// building attribute was given; it wins over inner text.
    fn apply_text(&self, target: &mut Target, text: &str, explicit_text: bool) -> Result<(), LmlErrorKind> {
        tags::apply_default_text(target, text, explicit_text)
    }

    /// Integrates a constructed child widget. `cell` is only meaningful for
    /// table content.
    fn attach(&self, parent: &mut Target, child: Widget, cell: CellProps) -> Result<(), LmlErrorKind> {
        tags::attach_by_content(parent, child, cell)
    }
}

// ── Attribute processors ──────────────────────────────────────────────────

/// What an attribute processor can see and touch while it runs.
pub struct AttributeContext<'a> {
    target: &'a mut Target,
    name: &'a str,
    actions: &'a Actions,
    on_close: &'a mut Vec<String>,
    separator: char,
}

impl<'a> AttributeContext<'a> {
    pub(crate) fn new(
        target: &'a mut Target,
        name: &'a str,
        actions: &'a Actions,
        on_close: &'a mut Vec<String>,
        separator: char,
    ) -> Self {
        Self { target, name, actions, on_close, separator }
    }

    /// The attribute name as written in the markup.
    pub fn name(&self) -> &str {
        self.name
    }

    pub fn target(&self) -> &Target {
        self.target
    }

    pub fn widget(&mut self) -> Result<&mut Widget, LmlErrorKind> {
        match self.target {
            Target::Widget(widget) => Ok(widget),
            Target::Listener(_) => Err(LmlErrorKind::construction(format!("`{}` needs a widget target", self.name))),
        }
    }

    pub fn listener(&mut self) -> Result<&mut Listener, LmlErrorKind> {
        match self.target {
            Target::Listener(listener) => Ok(listener),
            Target::Widget(w) => {
                Err(LmlErrorKind::construction(format!("`{}` needs a listener target, got {}", self.name, w.kind())))
            }
        }
    }

    /// Validates an action reference and returns its bare name.
    pub fn action_name(&self, raw: &str) -> Result<String, LmlErrorKind> {
        self.actions.resolve(raw).map(str::to_string)
    }

    /// Runs an action now, with the current widget.
    pub fn invoke(&mut self, raw: &str) -> Result<Option<String>, LmlErrorKind> {
        self.actions.invoke(raw, self.target.as_widget_mut())
    }

    /// Schedules an action to run when the tag closes.
    pub fn on_close(&mut self, raw: &str) -> Result<(), LmlErrorKind> {
        let name = self.action_name(raw)?;
        self.on_close.push(name);
        Ok(())
    }

    pub fn list(&self, raw: &str) -> Vec<String> {
        crate::value::split_list(raw, self.separator)
    }
}

/// Applies one post-construction attribute to a target.
pub trait AttributeProcessor: Send + Sync {
    /// The ancestry position this processor is registered for.
    fn target(&self) -> TargetKey;

    fn process(&self, cx: &mut AttributeContext<'_>, raw: &str) -> Result<(), LmlErrorKind>;
}

struct FnAttribute<F> {
    target: TargetKey,
    f: F,
}

impl<F> AttributeProcessor for FnAttribute<F>
where
    F: Fn(&mut AttributeContext<'_>, &str) -> Result<(), LmlErrorKind> + Send + Sync,
{
    fn target(&self) -> TargetKey {
        self.target
    }

    fn process(&self, cx: &mut AttributeContext<'_>, raw: &str) -> Result<(), LmlErrorKind> {
        (self.f)(cx, raw)
    }
}

/// Wraps a closure as an [`AttributeProcessor`] for `target`.
pub fn attribute<F>(target: TargetKey, f: F) -> Arc<dyn AttributeProcessor>
where
    F: Fn(&mut AttributeContext<'_>, &str) -> Result<(), LmlErrorKind> + Send + Sync + 'static,
{
    Arc::new(FnAttribute { target, f })
}

/// Runs before the target exists, writing into the [`ActorBuilder`].
pub trait BuildingAttributeProcessor: Send + Sync {
    fn feature(&self) -> BuilderFeature;

    fn process(&self, builder: &mut ActorBuilder, raw: &str) -> Result<(), LmlErrorKind>;
}

struct FnBuildingAttribute<F> {
    feature: BuilderFeature,
    f: F,
}

impl<F> BuildingAttributeProcessor for FnBuildingAttribute<F>
where
    F: Fn(&mut ActorBuilder, &str) -> Result<(), LmlErrorKind> + Send + Sync,
{
    fn feature(&self) -> BuilderFeature {
        self.feature
    }

    fn process(&self, builder: &mut ActorBuilder, raw: &str) -> Result<(), LmlErrorKind> {
        (self.f)(builder, raw)
    }
}

pub fn building_attribute<F>(feature: BuilderFeature, f: F) -> Arc<dyn BuildingAttributeProcessor>
where
    F: Fn(&mut ActorBuilder, &str) -> Result<(), LmlErrorKind> + Send + Sync + 'static,
{
    Arc::new(FnBuildingAttribute { feature, f })
}

/// Configures the table cell a child widget lands in.
pub trait CellAttributeProcessor: Send + Sync {
    fn process(&self, cell: &mut CellProps, raw: &str) -> Result<(), LmlErrorKind>;
}

impl<F> CellAttributeProcessor for F
where
    F: Fn(&mut CellProps, &str) -> Result<(), LmlErrorKind> + Send + Sync,
{
    fn process(&self, cell: &mut CellProps, raw: &str) -> Result<(), LmlErrorKind> {
        self(cell, raw)
    }
}

pub fn cell_attribute<F>(f: F) -> Arc<dyn CellAttributeProcessor>
where
    F: Fn(&mut CellProps, &str) -> Result<(), LmlErrorKind> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Applies a cell operation to a table's default cell instead of one cell.
struct CellDefaultsAttribute {
    cell: Arc<dyn CellAttributeProcessor>,
}

impl AttributeProcessor for CellDefaultsAttribute {
    fn target(&self) -> TargetKey {
        TargetKey::Kind(WidgetKind::Table)
    }

    fn process(&self, cx: &mut AttributeContext<'_>, raw: &str) -> Result<(), LmlErrorKind> {
        let table = cx
            .widget()?
            .table_mut()
            .ok_or_else(|| LmlErrorKind::construction("cell defaults need table content"))?;
        self.cell.process(&mut table.defaults, raw)
    }
}

/// One cell attribute declaration: the alias used on a table child and,
/// optionally, the alias that sets the same thing on the table's defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellAliases {
    pub cell: String,
    pub default: Option<String>,
}

impl CellAliases {
    pub fn new(cell: impl Into<String>, default: impl Into<String>) -> Self {
        Self { cell: cell.into(), default: Some(default.into()) }
    }

    /// `pad` → (`pad`, `defaultPad`).
    pub fn derived(cell: &str) -> Self {
        let mut chars = cell.chars();
        let default = match chars.next() {
            Some(first) => format!("default{}{}", first.to_ascii_uppercase(), chars.as_str()),
            None => "default".to_string(),
        };
        Self::new(cell, default)
    }

    /// No table-default twin.
    pub fn cell_only(cell: impl Into<String>) -> Self {
        Self { cell: cell.into(), default: None }
    }
}

// ── Macro providers ───────────────────────────────────────────────────────

/// A macro tag occurrence, handed to its [`MacroProvider`].
#[derive(Debug, Clone)]
pub struct MacroCall {
    pub name: String,
    /// Interpolated, unless the provider opted out.
    pub attributes: Vec<marduk_markup::Attribute>,
    /// Unexpanded children.
    pub children: Vec<RawTagNode>,
    /// Raw inner text.
    pub text: String,
    pub path: TagPath,
}

impl MacroCall {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.iter().find(|a| a.is(name)).map(|a| a.value.as_str())
    }

    pub fn required(&self, name: &str) -> Result<&str, LmlError> {
        self.attr(name).ok_or_else(|| {
            self.error(LmlErrorKind::construction(format!("<:{}> needs a `{name}` attribute", self.name)))
        })
    }

    pub fn error(&self, kind: LmlErrorKind) -> LmlError {
        kind.at(&self.path)
    }
}

/// Rewrites one macro tag into zero or more replacement nodes.
pub trait MacroProvider: Send + Sync {
    /// Whether attribute values are interpolated before [`expand`](Self::expand).
    fn interpolates_attributes(&self) -> bool {
        true
    }

    fn expand(&self, call: &MacroCall, cx: &mut Expander<'_>, scope: &mut Scope<'_>) -> Result<Vec<RawTagNode>, LmlError>;
}

// ── Registry ──────────────────────────────────────────────────────────────

/// Result of looking up a post-construction attribute for a target.
pub enum Resolution<'s> {
    Found(&'s dyn AttributeProcessor),
    /// The name is registered, but not for anything the target is.
    Unsupported,
    Unknown,
}

#[derive(Clone, Default)]
struct Tables {
    tags: HashMap<String, Arc<dyn TagProvider>>,
    macros: HashMap<String, Arc<dyn MacroProvider>>,
    building: HashMap<String, Vec<Arc<dyn BuildingAttributeProcessor>>>,
    attributes: HashMap<String, Vec<Arc<dyn AttributeProcessor>>>,
    cells: HashMap<String, Arc<dyn CellAttributeProcessor>>,
}

/// Mutable registration phase of an [`LmlSyntax`].
#[derive(Clone, Default)]
pub struct SyntaxBuilder {
    tables: Tables,
}

fn key(alias: &str) -> String {
    alias.to_ascii_lowercase()
}

impl SyntaxBuilder {
    /// An empty syntax: no tags, macros or attributes.
    pub fn new() -> Self {
        Self::default()
    }

    /// The default widget, attribute and macro set.
    pub fn with_defaults() -> Self {
        let mut builder = Self::new();
        tags::register(&mut builder);
        attributes::register(&mut builder);
        macros::register(&mut builder);
        builder
    }

    pub fn register_tag(&mut self, aliases: &[&str], provider: Arc<dyn TagProvider>) -> &mut Self {
        for alias in aliases {
            self.tables.tags.insert(key(alias), Arc::clone(&provider));
        }
        self
    }

    pub fn register_macro(&mut self, aliases: &[&str], provider: Arc<dyn MacroProvider>) -> &mut Self {
        for alias in aliases {
            self.tables.macros.insert(key(alias), Arc::clone(&provider));
        }
        self
    }

    /// Registers `processor` under each alias for its target. A processor
    /// already registered for the same alias and target is replaced.
    pub fn register_attribute(&mut self, aliases: &[&str], processor: Arc<dyn AttributeProcessor>) -> &mut Self {
        for alias in aliases {
            let slot = self.tables.attributes.entry(key(alias)).or_default();
            match slot.iter_mut().find(|p| p.target() == processor.target()) {
                Some(existing) => *existing = Arc::clone(&processor),
                None => slot.push(Arc::clone(&processor)),
            }
        }
        self
    }

    pub fn register_building_attribute(
        &mut self,
        aliases: &[&str],
        processor: Arc<dyn BuildingAttributeProcessor>,
    ) -> &mut Self {
        for alias in aliases {
            let slot = self.tables.building.entry(key(alias)).or_default();
            match slot.iter_mut().find(|p| p.feature() == processor.feature()) {
                Some(existing) => *existing = Arc::clone(&processor),
                None => slot.push(Arc::clone(&processor)),
            }
        }
        self
    }

    /// Registers a cell operation under every declared cell alias, and a
    /// table-defaults twin under every declared default alias.
    pub fn register_cell_attribute(
        &mut self,
        processor: Arc<dyn CellAttributeProcessor>,
        aliases: &[CellAliases],
    ) -> &mut Self {
        let defaults: Arc<dyn AttributeProcessor> = Arc::new(CellDefaultsAttribute { cell: Arc::clone(&processor) });
        for alias in aliases {
            self.tables.cells.insert(key(&alias.cell), Arc::clone(&processor));
            if let Some(default) = &alias.default {
                self.register_attribute(&[default.as_str()], Arc::clone(&defaults));
            }
        }
        self
    }

    pub fn build(self) -> LmlSyntax {
        LmlSyntax { tables: self.tables }
    }
}

/// Immutable, shareable syntax registry.
pub struct LmlSyntax {
    tables: Tables,
}

impl Default for LmlSyntax {
    fn default() -> Self {
        SyntaxBuilder::with_defaults().build()
    }
}

impl LmlSyntax {
    pub fn empty() -> Self {
        SyntaxBuilder::new().build()
    }

    /// A builder seeded with everything registered here.
    pub fn to_builder(&self) -> SyntaxBuilder {
        SyntaxBuilder { tables: self.tables.clone() }
    }

    pub fn tag(&self, name: &str) -> Option<&Arc<dyn TagProvider>> {
        self.tables.tags.get(&key(name))
    }

    pub fn macro_provider(&self, name: &str) -> Option<&Arc<dyn MacroProvider>> {
        self.tables.macros.get(&key(name))
    }

    /// First processor registered for `name` under one of `features`, tried
    /// in order.
    pub fn building_attribute(&self, name: &str, features: &[BuilderFeature]) -> Option<&dyn BuildingAttributeProcessor> {
        let slot = self.tables.building.get(&key(name))?;
        features
            .iter()
            .find_map(|feature| slot.iter().find(|p| p.feature() == *feature))
            .map(|p| p.as_ref())
    }

    pub fn cell_attribute(&self, name: &str) -> Option<&dyn CellAttributeProcessor> {
        self.tables.cells.get(&key(name)).map(|p| p.as_ref())
    }

    /// Walks `ancestry` (most specific first) for a processor of `name`.
    pub fn resolve_attribute(&self, ancestry: &[TargetKey], name: &str) -> Resolution<'_> {
        let name = key(name);
        if let Some(slot) = self.tables.attributes.get(&name) {
            return ancestry
                .iter()
                .find_map(|k| slot.iter().find(|p| p.target() == *k))
                .map_or(Resolution::Unsupported, |p| Resolution::Found(p.as_ref()));
        }
        if self.tables.building.contains_key(&name) || self.tables.cells.contains_key(&name) {
            Resolution::Unsupported
        } else {
            Resolution::Unknown
        }
    }

    /// Registered tag aliases, sorted. Used by diagnostics and the CLI.
    pub fn tag_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.tags.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn macro_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.macros.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::Capability;

    fn set_text(value: &'static str) -> impl Fn(&mut AttributeContext<'_>, &str) -> Result<(), LmlErrorKind> {
        move |cx, _| {
            cx.widget()?.text = Some(value.to_string());
            Ok(())
        }
    }

    fn run(syntax: &LmlSyntax, kind: WidgetKind, name: &str) -> Option<String> {
        let mut target = Target::Widget(Widget::new(kind));
        let actions = Actions::new();
        let mut on_close = Vec::new();
        let Resolution::Found(processor) = syntax.resolve_attribute(target.ancestry(), name) else {
            return None;
        };
        let mut cx = AttributeContext::new(&mut target, name, &actions, &mut on_close, ';');
        processor.process(&mut cx, "").unwrap();
        match target {
            Target::Widget(w) => w.text,
            Target::Listener(_) => None,
        }
    }

    #[test]
    fn concrete_kind_beats_capability() {
        let mut builder = SyntaxBuilder::new();
        builder.register_attribute(&["mark"], attribute(TargetKey::Capability(Capability::TextBearing), set_text("cap")));
        builder.register_attribute(&["mark"], attribute(TargetKey::Kind(WidgetKind::Label), set_text("label")));
        let syntax = builder.build();

        assert_eq!(run(&syntax, WidgetKind::Label, "mark").as_deref(), Some("label"));
        assert_eq!(run(&syntax, WidgetKind::TextField, "MARK").as_deref(), Some("cap"));
        assert!(matches!(syntax.resolve_attribute(WidgetKind::Image.ancestry(), "mark"), Resolution::Unsupported));
        assert!(matches!(syntax.resolve_attribute(WidgetKind::Image.ancestry(), "other"), Resolution::Unknown));
    }

    #[test]
    fn collision_replaces_same_slot() {
        let key = TargetKey::Kind(WidgetKind::Label);
        let mut builder = SyntaxBuilder::new();
        builder.register_attribute(&["mark"], attribute(key, set_text("old")));
        builder.register_attribute(&["Mark"], attribute(key, set_text("new")));
        let syntax = builder.build();
        assert_eq!(run(&syntax, WidgetKind::Label, "mark").as_deref(), Some("new"));
    }

    #[test]
    fn to_builder_leaves_original_untouched() {
        let key = TargetKey::Kind(WidgetKind::Label);
        let mut builder = SyntaxBuilder::new();
        builder.register_attribute(&["mark"], attribute(key, set_text("base")));
        let base = builder.build();

        let mut layered = base.to_builder();
        layered.register_attribute(&["mark"], attribute(key, set_text("layer")));
        let layered = layered.build();

        assert_eq!(run(&base, WidgetKind::Label, "mark").as_deref(), Some("base"));
        assert_eq!(run(&layered, WidgetKind::Label, "mark").as_deref(), Some("layer"));
    }

    #[test]
    fn building_attribute_follows_feature_order() {
        let syntax = LmlSyntax::default();
        let text_value = syntax.building_attribute("value", &[BuilderFeature::Base, BuilderFeature::Text]).unwrap();
        assert_eq!(text_value.feature(), BuilderFeature::Text);
        let range_value = syntax.building_attribute("value", &[BuilderFeature::Base, BuilderFeature::Range]).unwrap();
        assert_eq!(range_value.feature(), BuilderFeature::Range);
        assert!(syntax.building_attribute("min", &[BuilderFeature::Base]).is_none());
    }

    #[test]
    fn building_name_on_post_construction_is_unsupported() {
        let syntax = LmlSyntax::default();
        assert!(matches!(syntax.resolve_attribute(WidgetKind::Group.ancestry(), "text"), Resolution::Unsupported));
    }

    #[test]
    fn derived_cell_aliases() {
        assert_eq!(CellAliases::derived("pad"), CellAliases::new("pad", "defaultPad"));
        assert_eq!(CellAliases::derived("expandX").default.as_deref(), Some("defaultExpandX"));
        assert_eq!(CellAliases::cell_only("row").default, None);
    }
}
