//! Per-tag construction protocol and the depth-first tree builder.
//!
//! Every tag walks the same states:
//!
//! ```text
//! Opened → BuildingAttributesConsumed → Instantiated → ChildrenAttached → Closed
//! ```
//!
//! Listener tags follow the same path but produce a [`Listener`] that is
//! attached to the parent widget (or, at the document root, to the widget
//! right before it).

use marduk_markup::{Attribute, RawTagNode};

use crate::action::Actions;
use crate::builder::ActorBuilder;
use crate::config::{ParserConfig, Strictness};
use crate::dispatch::{self, SplitAttributes};
use crate::error::{LmlError, LmlErrorKind, TagPath};
use crate::parser::{Document, LmlParser};
use crate::syntax::{AttributeContext, LmlSyntax, TagProvider};
use crate::widget::{CellProps, Listener, Target, Widget};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum TagState {
    Opened,
    BuildingAttributesConsumed,
    Instantiated,
    ChildrenAttached,
    Closed,
}

/// A finished tag, ready to be attached to its parent.
#[derive(Debug)]
pub struct ClosedTag {
    pub target: Target,
    /// Cell the target occupies when the parent is a table.
    pub cell: CellProps,
}

/// Processing context of one tag while its subtree is built.
pub struct LmlTag<'p> {
    path: TagPath,
    provider: &'p dyn TagProvider,
    state: TagState,
    builder: ActorBuilder,
    target: Option<Target>,
    cell: CellProps,
    on_close: Vec<String>,
}

impl<'p> LmlTag<'p> {
    pub fn open(provider: &'p dyn TagProvider, path: TagPath) -> Self {
        log::debug!("open {path}");
        Self {
            path,
            provider,
            state: TagState::Opened,
            builder: ActorBuilder::new(),
            target: None,
            cell: CellProps::default(),
            on_close: Vec::new(),
        }
    }

    pub fn state(&self) -> TagState {
        self.state
    }

    pub fn path(&self) -> &TagPath {
        &self.path
    }

    fn advance(&mut self, from: TagState, to: TagState) {
        debug_assert_eq!(self.state, from, "{}: bad tag transition to {to:?}", self.path);
        self.state = to;
    }

    fn fail(&self, kind: LmlErrorKind, attribute: &Attribute) -> LmlError {
        kind.at(&self.path).with_attribute(attribute.name.as_str())
    }

    fn target_mut(&mut self) -> Result<&mut Target, LmlError> {
        let path = &self.path;
        self.target
            .as_mut()
            .ok_or_else(|| LmlErrorKind::construction("tag used before instantiation").at(path))
    }

    pub fn consume_building(&mut self, split: &SplitAttributes<'_, '_>) -> Result<(), LmlError> {
        for (processor, attribute) in &split.building {
            log::trace!("{}: building {}={:?}", self.path, attribute.name, attribute.value);
            processor
                .process(&mut self.builder, &attribute.value)
                .map_err(|kind| self.fail(kind, attribute))?;
        }
        self.advance(TagState::Opened, TagState::BuildingAttributesConsumed);
        Ok(())
    }

    pub fn instantiate(&mut self) -> Result<(), LmlError> {
        let target = self.provider.create(&self.builder).map_err(|kind| kind.at(&self.path))?;
        self.target = Some(target);
        self.advance(TagState::BuildingAttributesConsumed, TagState::Instantiated);
        Ok(())
    }

    /// Post-construction attributes, in source order.
    pub fn apply_attributes(
        &mut self,
        syntax: &LmlSyntax,
        attributes: &[&Attribute],
        actions: &Actions,
        config: &ParserConfig,
    ) -> Result<(), LmlError> {
        for attribute in attributes {
            let path = &self.path;
            let target = self
                .target
                .as_mut()
                .ok_or_else(|| LmlErrorKind::construction("tag used before instantiation").at(path))?;
            let mut cx =
                AttributeContext::new(target, &attribute.name, actions, &mut self.on_close, config.list_separator);
            match dispatch::apply(syntax, &mut cx, &attribute.name, &attribute.value) {
                Ok(()) => {}
                Err(LmlErrorKind::UnknownAttribute(name)) if config.unknown_attributes == Strictness::Warn => {
                    log::warn!("{path}: unknown attribute `{name}` skipped");
                }
                Err(kind) => return Err(kind.at(path).with_attribute(attribute.name.as_str())),
            }
        }
        Ok(())
    }

    /// Seeds the cell from the parent table's defaults and applies cell
    /// attributes on top.
    pub fn configure_cell(&mut self, defaults: &CellProps, split: &SplitAttributes<'_, '_>) -> Result<(), LmlError> {
        let mut cell = defaults.clone();
        for (processor, attribute) in &split.cell {
            processor.process(&mut cell, &attribute.value).map_err(|kind| self.fail(kind, attribute))?;
        }
        self.cell = cell;
        Ok(())
    }

    pub fn apply_text(&mut self, text: &str) -> Result<(), LmlError> {
        let explicit = self.builder.text.is_some();
        let provider = self.provider;
        let target = self.target_mut()?;
        provider.apply_text(target, text, explicit).map_err(|kind| kind.at(&self.path))
    }

    /// Defaults for cells of this tag's children, when it holds a table.
    pub fn child_cells(&self) -> Option<CellProps> {
        self.target.as_ref().and_then(Target::as_widget).and_then(Widget::table).map(|t| t.defaults.clone())
    }

    pub fn attach(&mut self, child: ClosedTag) -> Result<(), LmlError> {
        let provider = self.provider;
        let target = self.target_mut()?;
        let result = match child.target {
            Target::Widget(widget) => provider.attach(target, widget, child.cell),
            Target::Listener(listener) => attach_listener(target, listener),
        };
        result.map_err(|kind| kind.at(&self.path))
    }

    pub fn children_attached(&mut self) {
        self.advance(TagState::Instantiated, TagState::ChildrenAttached);
    }

    /// The widget id, once attributes are applied.
    pub fn id(&self) -> Option<&str> {
        self.target.as_ref().and_then(Target::as_widget).and_then(|w| w.id.as_deref())
    }

    /// Registers the id, validates listeners and runs `onClose` actions.
    ///
    /// Listener ids must name a closed widget or one of the still `open`
    /// ancestors.
    pub fn close(mut self, ids: &mut Vec<String>, open: &[String], actions: &Actions) -> Result<ClosedTag, LmlError> {
        self.advance(TagState::ChildrenAttached, TagState::Closed);
        let path = self.path;
        let mut target =
            self.target.take().ok_or_else(|| LmlErrorKind::construction("tag closed before instantiation").at(&path))?;

        match &mut target {
            Target::Widget(widget) => {
                if let Some(id) = &widget.id {
                    if ids.contains(id) {
                        return Err(LmlErrorKind::construction(format!("duplicate id `{id}`")).at(&path));
                    }
                    ids.push(id.clone());
                }
                for action in &self.on_close {
                    actions.invoke(action, Some(&mut *widget)).map_err(|kind| kind.at(&path))?;
                }
            }
            Target::Listener(listener) => {
                let Some(action) = &listener.action else {
                    return Err(LmlErrorKind::construction("listener has no action").at(&path));
                };
                // Inner text is taken verbatim, so it is only checked here.
                let name = actions.resolve(action).map_err(|kind| kind.at(&path))?.to_string();
                listener.action = Some(name);
                if let Some(id) = listener.ids.iter().find(|id| !ids.contains(id) && !open.contains(id)) {
                    return Err(LmlErrorKind::construction(format!("listener refers to unknown id `{id}`")).at(&path));
                }
            }
        }
        log::debug!("close {path}");
        Ok(ClosedTag { target, cell: self.cell })
    }
}

fn attach_listener(parent: &mut Target, listener: Listener) -> Result<(), LmlErrorKind> {
    match parent {
        Target::Widget(widget) => {
            widget.listeners.push(listener);
            Ok(())
        }
        Target::Listener(_) => Err(LmlErrorKind::construction("listeners cannot be nested")),
    }
}

// ── TreeBuilder ───────────────────────────────────────────────────────────

/// Builds targets from an expanded tag tree, depth-first.
pub(crate) struct TreeBuilder<'p> {
    parser: &'p LmlParser,
    ids: Vec<String>,
    open: Vec<String>,
}

impl<'p> TreeBuilder<'p> {
    pub fn new(parser: &'p LmlParser) -> Self {
        Self { parser, ids: Vec::new(), open: Vec::new() }
    }

    pub fn build(mut self, nodes: &[RawTagNode]) -> Result<Document, LmlError> {
        let root = TagPath::root();
        let mut roots: Vec<Widget> = Vec::new();
        for node in nodes {
            let Some(closed) = self.process(node, &root, None)? else {
                continue;
            };
            match closed.target {
                Target::Widget(widget) => roots.push(widget),
                Target::Listener(listener) => match roots.last_mut() {
                    Some(previous) => previous.listeners.push(listener),
                    None => {
                        let path = root.child(&node.name, None);
                        return Err(LmlErrorKind::construction("root listener has no preceding widget").at(&path));
                    }
                },
            }
        }
        Ok(Document { roots, ids: self.ids })
    }

    fn process(
        &mut self,
        node: &RawTagNode,
        parent: &TagPath,
        cells: Option<&CellProps>,
    ) -> Result<Option<ClosedTag>, LmlError> {
        let parser: &'p LmlParser = self.parser;
        let syntax = parser.syntax();
        let config = parser.parser_config();
        let path = parent.child(&node.name, node.attr("id"));

        if node.is_macro {
            return Err(LmlErrorKind::UnknownMacro(node.name.clone()).at(&path));
        }
        let Some(provider) = syntax.tag(&node.name) else {
            return match config.unknown_tags {
                Strictness::Fail => Err(LmlErrorKind::UnknownTag(node.name.clone()).at(&path)),
                Strictness::Warn => {
                    log::warn!("{path}: unknown tag <{}> skipped with its children", node.name);
                    Ok(None)
                }
            };
        };

        let mut tag = LmlTag::open(provider.as_ref(), path);
        let split = dispatch::split(syntax, provider.builder_features(), cells.is_some(), &node.attributes);
        tag.consume_building(&split)?;
        tag.instantiate()?;
        tag.apply_attributes(syntax, &split.post, parser.actions(), config)?;
        if let Some(defaults) = cells {
            tag.configure_cell(defaults, &split)?;
        }
        if node.has_text() {
            tag.apply_text(&node.text)?;
        }

        let child_cells = tag.child_cells();
        let id = tag.id().map(str::to_string);
        let opened = id.is_some();
        self.open.extend(id);
        for child in &node.children {
            if let Some(closed) = self.process(child, tag.path(), child_cells.as_ref())? {
                tag.attach(closed)?;
            }
        }
        if opened {
            self.open.pop();
        }
        tag.children_attached();
        tag.close(&mut self.ids, &self.open, parser.actions()).map(Some)
    }
}
