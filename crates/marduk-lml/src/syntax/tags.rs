use std::sync::Arc;

use crate::builder::{ActorBuilder, BuilderFeature};
use crate::error::LmlErrorKind;
use crate::widget::{Capability, CellProps, Content, Listener, ListenerEvent, Target, Widget, WidgetKind};

use super::{SyntaxBuilder, TagProvider};

const BASE: &[BuilderFeature] = &[BuilderFeature::Base];
const TEXT: &[BuilderFeature] = &[BuilderFeature::Base, BuilderFeature::Text];
const RANGE: &[BuilderFeature] = &[BuilderFeature::Base, BuilderFeature::Range, BuilderFeature::Aligned];

/// Builds a [`Widget`] of a fixed kind.
#[derive(Debug, Clone, Copy)]
pub struct ActorProvider {
    kind: WidgetKind,
    features: &'static [BuilderFeature],
}

impl ActorProvider {
    pub fn new(kind: WidgetKind) -> Self {
        let features = if kind.has(Capability::RangeValued) {
            RANGE
        } else if kind.has(Capability::TextBearing) {
            TEXT
        } else {
            BASE
        };
        Self { kind, features }
    }

    pub fn kind(&self) -> WidgetKind {
        self.kind
    }
}

impl TagProvider for ActorProvider {
    fn builder_features(&self) -> &[BuilderFeature] {
        self.features
    }

    fn create(&self, builder: &ActorBuilder) -> Result<Target, LmlErrorKind> {
        let mut widget = Widget::new(self.kind);
        widget.style = builder.style.clone();
        if self.kind.has(Capability::TextBearing) {
            widget.text = builder.text.clone();
        }
        if self.kind.has(Capability::RangeValued) {
            widget.range = Some(builder.range()?);
            widget.vertical = builder.vertical.unwrap_or(false);
        }
        Ok(Target::Widget(widget))
    }
}

/// Builds a [`Listener`] for one event.
#[derive(Debug, Clone, Copy)]
pub struct ListenerProvider {
    event: ListenerEvent,
}

impl ListenerProvider {
    pub fn new(event: ListenerEvent) -> Self {
        Self { event }
    }
}

impl TagProvider for ListenerProvider {
    fn create(&self, _builder: &ActorBuilder) -> Result<Target, LmlErrorKind> {
        Ok(Target::Listener(Listener::new(self.event)))
    }

    fn attach(&self, _parent: &mut Target, child: Widget, _cell: CellProps) -> Result<(), LmlErrorKind> {
        Err(LmlErrorKind::construction(format!("listeners cannot hold widgets (got {})", child.kind())))
    }
}

pub(super) fn register(builder: &mut SyntaxBuilder) {
    for kind in WidgetKind::ALL {
        builder.register_tag(&[kind.name()], Arc::new(ActorProvider::new(kind)));
    }
    builder.register_tag(&["onClick", "clickListener"], Arc::new(ListenerProvider::new(ListenerEvent::Click)));
    builder.register_tag(&["onChange", "changeListener"], Arc::new(ListenerProvider::new(ListenerEvent::Change)));
}

/// Inner-text policy shared by the default providers.
pub(super) fn apply_default_text(target: &mut Target, text: &str, explicit_text: bool) -> Result<(), LmlErrorKind> {
    let widget = match target {
        Target::Listener(listener) => {
            if listener.action.is_none() {
                listener.action = Some(text.trim().to_string());
            }
            return Ok(());
        }
        Target::Widget(widget) => widget,
    };

    if widget.has(Capability::TextBearing) {
        if explicit_text {
            log::warn!("{}: inner text ignored, a text attribute was given", widget.kind());
        } else {
            widget.text = Some(text.to_string());
        }
        return Ok(());
    }

    let kind = widget.kind();
    match &mut widget.content {
        Content::Table(table) => {
            for line in text.lines() {
                let cell = CellProps { end_row: true, ..table.defaults.clone() };
                table.add(Widget::label(line), cell);
            }
        }
        Content::Children(children) => children.extend(text.lines().map(Widget::label)),
        Content::Single(slot @ None) => *slot = Some(Box::new(Widget::label(text))),
        Content::Single(Some(_)) => {
            return Err(LmlErrorKind::construction(format!("{kind} already holds a widget")));
        }
        Content::Leaf => return Err(LmlErrorKind::construction(format!("{kind} cannot hold text"))),
    }
    Ok(())
}

/// Child policy shared by the default providers: follows the parent's content.
pub(super) fn attach_by_content(parent: &mut Target, child: Widget, cell: CellProps) -> Result<(), LmlErrorKind> {
    let parent = match parent {
        Target::Widget(widget) => widget,
        Target::Listener(_) => {
            return Err(LmlErrorKind::construction(format!("listeners cannot hold widgets (got {})", child.kind())));
        }
    };
    let kind = parent.kind();
    match &mut parent.content {
        Content::Table(table) => table.add(child, cell),
        Content::Children(children) => children.push(child),
        Content::Single(slot @ None) => *slot = Some(Box::new(child)),
        Content::Single(Some(_)) => {
            return Err(LmlErrorKind::construction(format!("{kind} holds a single widget")));
        }
        Content::Leaf => {
            return Err(LmlErrorKind::construction(format!("{kind} cannot hold widgets (got {})", child.kind())));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget(target: Target) -> Widget {
        match target {
            Target::Widget(w) => w,
            Target::Listener(_) => panic!("expected a widget"),
        }
    }

    #[test]
    fn features_follow_capabilities() {
        assert_eq!(ActorProvider::new(WidgetKind::Slider).builder_features(), RANGE);
        assert_eq!(ActorProvider::new(WidgetKind::CheckBox).builder_features(), TEXT);
        assert_eq!(ActorProvider::new(WidgetKind::Table).builder_features(), BASE);
    }

    #[test]
    fn create_copies_builder_values() {
        let mut builder = ActorBuilder::new();
        builder.style = "big".into();
        builder.text = Some("Go".into());
        let button = widget(ActorProvider::new(WidgetKind::TextButton).create(&builder).unwrap());
        assert_eq!(button.style, "big");
        assert_eq!(button.text.as_deref(), Some("Go"));

        builder.range.max = Some(10.0);
        builder.vertical = Some(true);
        let slider = widget(ActorProvider::new(WidgetKind::Slider).create(&builder).unwrap());
        assert_eq!(slider.range.as_ref().map(|r| r.max), Some(10.0));
        assert!(slider.vertical);
    }

    #[test]
    fn text_lines_become_table_rows() {
        let mut target = Target::Widget(Widget::new(WidgetKind::Table));
        apply_default_text(&mut target, "one\ntwo", false).unwrap();
        let table = widget(target).table().cloned().unwrap();
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn explicit_text_wins() {
        let mut label = Widget::new(WidgetKind::Label);
        label.text = Some("attr".into());
        let mut target = Target::Widget(label);
        apply_default_text(&mut target, "inner", true).unwrap();
        assert_eq!(widget(target).text.as_deref(), Some("attr"));
    }

    #[test]
    fn leaf_rejects_text_and_children() {
        let mut target = Target::Widget(Widget::new(WidgetKind::Image));
        assert!(apply_default_text(&mut target, "x", false).is_err());
        assert!(attach_by_content(&mut target, Widget::label("x"), CellProps::default()).is_err());
    }

    #[test]
    fn single_content_holds_one() {
        let mut target = Target::Widget(Widget::new(WidgetKind::Container));
        attach_by_content(&mut target, Widget::label("a"), CellProps::default()).unwrap();
        assert!(attach_by_content(&mut target, Widget::label("b"), CellProps::default()).is_err());
    }

    #[test]
    fn listener_text_is_action() {
        let mut target = Target::Listener(Listener::new(ListenerEvent::Click));
        apply_default_text(&mut target, " close ", false).unwrap();
        assert_eq!(target, Target::Listener(Listener::new(ListenerEvent::Click).with_action("close")));
    }
}
