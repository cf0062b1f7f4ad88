//! Attribute dispatch: sorting a tag's attributes into phases and applying
//! post-construction attributes through the target's ancestry.

use marduk_markup::Attribute;

use crate::builder::BuilderFeature;
use crate::error::LmlErrorKind;
use crate::syntax::{AttributeContext, BuildingAttributeProcessor, CellAttributeProcessor, LmlSyntax, Resolution};

/// A tag's attributes grouped by the phase that consumes them. Each group
/// keeps source order.
pub struct SplitAttributes<'s, 'a> {
    pub building: Vec<(&'s dyn BuildingAttributeProcessor, &'a Attribute)>,
    pub cell: Vec<(&'s dyn CellAttributeProcessor, &'a Attribute)>,
    pub post: Vec<&'a Attribute>,
}

/// Building attributes are the ones registered for one of `features`; cell
/// attributes only exist when the parent lays children out in a table.
pub fn split<'s, 'a>(
    syntax: &'s LmlSyntax,
    features: &[BuilderFeature],
    in_table: bool,
    attributes: &'a [Attribute],
) -> SplitAttributes<'s, 'a> {
    let mut split = SplitAttributes { building: Vec::new(), cell: Vec::new(), post: Vec::new() };
    for attribute in attributes {
        if let Some(p) = syntax.building_attribute(&attribute.name, features) {
            split.building.push((p, attribute));
        } else if let Some(p) = in_table.then(|| syntax.cell_attribute(&attribute.name)).flatten() {
            split.cell.push((p, attribute));
        } else {
            split.post.push(attribute);
        }
    }
    split
}

/// Applies one post-construction attribute to the context's target.
///
/// Walks the target's ancestry most-specific first. A name registered only
/// for unrelated targets (or only as a building or cell attribute) is
/// [`LmlErrorKind::UnsupportedAttribute`]; a name nobody registered is
/// [`LmlErrorKind::UnknownAttribute`].
pub fn apply(syntax: &LmlSyntax, cx: &mut AttributeContext<'_>, name: &str, raw: &str) -> Result<(), LmlErrorKind> {
    match syntax.resolve_attribute(cx.target().ancestry(), name) {
        Resolution::Found(processor) => {
            log::trace!("{name}={raw:?} on {}", cx.target().describe());
            processor.process(cx, raw)
        }
        Resolution::Unsupported => Err(LmlErrorKind::UnsupportedAttribute {
            attribute: name.to_string(),
            target: cx.target().describe(),
        }),
        Resolution::Unknown => Err(LmlErrorKind::UnknownAttribute(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Actions;
    use crate::widget::{Target, Widget, WidgetKind};

    fn attrs(pairs: &[(&str, &str)]) -> Vec<Attribute> {
        pairs.iter().map(|(n, v)| Attribute::new(*n, *v)).collect()
    }

    #[test]
    fn split_by_phase() {
        let syntax = LmlSyntax::default();
        let attributes = attrs(&[("text", "Hi"), ("pad", "2"), ("id", "x"), ("style", "big")]);

        let outside = split(&syntax, &[BuilderFeature::Base, BuilderFeature::Text], false, &attributes);
        assert_eq!(outside.building.len(), 2);
        assert!(outside.cell.is_empty());
        assert_eq!(outside.post.iter().map(|a| a.name.as_str()).collect::<Vec<_>>(), ["pad", "id"]);

        let inside = split(&syntax, &[BuilderFeature::Base, BuilderFeature::Text], true, &attributes);
        assert_eq!(inside.cell.len(), 1);
        assert_eq!(inside.post.len(), 1);
    }

    #[test]
    fn apply_reports_unknown_and_unsupported() {
        let syntax = LmlSyntax::default();
        let actions = Actions::new();
        let mut on_close = Vec::new();
        let mut target = Target::Widget(Widget::new(WidgetKind::Image));
        let mut cx = AttributeContext::new(&mut target, "x", &actions, &mut on_close, ';');

        assert_eq!(apply(&syntax, &mut cx, "bogus", "1"), Err(LmlErrorKind::UnknownAttribute("bogus".into())));
        assert_eq!(
            apply(&syntax, &mut cx, "wrap", "true"),
            Err(LmlErrorKind::UnsupportedAttribute { attribute: "wrap".into(), target: "image".into() })
        );
        assert_eq!(apply(&syntax, &mut cx, "visible", "false"), Ok(()));
        assert!(!cx.target().as_widget().map(|w| w.visible).unwrap_or(true));
    }
}
