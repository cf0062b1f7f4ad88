use crate::builder::BuilderFeature;
use crate::value::{Edges, parse_align, parse_bool, parse_color, parse_f32, parse_name, parse_usize, ValueError};
use crate::widget::{Capability, CellProps, Listener, ListenerEvent, TargetKey, WidgetKind};

use super::{CellAliases, SyntaxBuilder, attribute, building_attribute, cell_attribute};

const ACTOR: TargetKey = TargetKey::Kind(WidgetKind::Actor);

pub(super) fn register(b: &mut SyntaxBuilder) {
    register_building(b);
    register_actor(b);
    register_capabilities(b);
    register_kinds(b);
    register_listener(b);
    register_cells(b);
}

fn register_building(b: &mut SyntaxBuilder) {
    b.register_building_attribute(
        &["style", "class"],
        building_attribute(BuilderFeature::Base, |builder, raw| {
            builder.style = parse_name(raw)?;
            Ok(())
        }),
    );
    b.register_building_attribute(
        &["text", "value"],
        building_attribute(BuilderFeature::Text, |builder, raw| {
            builder.text = Some(raw.to_string());
            Ok(())
        }),
    );
    b.register_building_attribute(
        &["vertical"],
        building_attribute(BuilderFeature::Aligned, |builder, raw| {
            builder.vertical = Some(parse_bool(raw)?);
            Ok(())
        }),
    );
    b.register_building_attribute(
        &["horizontal"],
        building_attribute(BuilderFeature::Aligned, |builder, raw| {
            builder.vertical = Some(!parse_bool(raw)?);
            Ok(())
        }),
    );
    b.register_building_attribute(
        &["min"],
        building_attribute(BuilderFeature::Range, |builder, raw| {
            builder.range.min = Some(parse_f32(raw)?);
            Ok(())
        }),
    );
    b.register_building_attribute(
        &["max"],
        building_attribute(BuilderFeature::Range, |builder, raw| {
            builder.range.max = Some(parse_f32(raw)?);
            Ok(())
        }),
    );
    b.register_building_attribute(
        &["step", "stepSize"],
        building_attribute(BuilderFeature::Range, |builder, raw| {
            builder.range.step = Some(parse_f32(raw)?);
            Ok(())
        }),
    );
    b.register_building_attribute(
        &["value"],
        building_attribute(BuilderFeature::Range, |builder, raw| {
            builder.range.value = Some(parse_f32(raw)?);
            Ok(())
        }),
    );
}

fn register_actor(b: &mut SyntaxBuilder) {
    b.register_attribute(
        &["id"],
        attribute(ACTOR, |cx, raw| {
            cx.widget()?.id = Some(parse_name(raw)?);
            Ok(())
        }),
    );
    b.register_attribute(
        &["visible"],
        attribute(ACTOR, |cx, raw| {
            cx.widget()?.visible = parse_bool(raw)?;
            Ok(())
        }),
    );
    b.register_attribute(
        &["color"],
        attribute(ACTOR, |cx, raw| {
            cx.widget()?.color = Some(parse_color(raw)?);
            Ok(())
        }),
    );

    let events = [
        (&["onClick", "click"][..], ListenerEvent::Click),
        (&["onChange", "change"][..], ListenerEvent::Change),
        (&["action", "onShow"][..], ListenerEvent::Show),
    ];
    for (aliases, event) in events {
        b.register_attribute(
            aliases,
            attribute(ACTOR, move |cx, raw| {
                let action = cx.action_name(raw)?;
                cx.widget()?.listeners.push(Listener::new(event).with_action(action));
                Ok(())
            }),
        );
    }

    b.register_attribute(
        &["onCreate", "create", "init"],
        attribute(ACTOR, |cx, raw| {
            cx.invoke(raw)?;
            Ok(())
        }),
    );
    b.register_attribute(&["onClose", "close"], attribute(ACTOR, |cx, raw| cx.on_close(raw)));
}

fn register_capabilities(b: &mut SyntaxBuilder) {
    use Capability::*;

    b.register_attribute(
        &["fillParent"],
        attribute(TargetKey::Capability(Layout), |cx, raw| {
            cx.widget()?.fill_parent = parse_bool(raw)?;
            Ok(())
        }),
    );
    b.register_attribute(
        &["disabled", "disable"],
        attribute(TargetKey::Capability(Disableable), |cx, raw| {
            cx.widget()?.disabled = parse_bool(raw)?;
            Ok(())
        }),
    );
    b.register_attribute(
        &["checked"],
        attribute(TargetKey::Capability(Toggleable), |cx, raw| {
            cx.widget()?.checked = parse_bool(raw)?;
            Ok(())
        }),
    );
    b.register_attribute(
        &["align"],
        attribute(TargetKey::Capability(Alignable), |cx, raw| {
            cx.widget()?.align = Some(parse_align(raw)?);
            Ok(())
        }),
    );
    b.register_attribute(
        &["title"],
        attribute(TargetKey::Capability(Titled), |cx, raw| {
            cx.widget()?.title = Some(raw.to_string());
            Ok(())
        }),
    );

    let padded = TargetKey::Capability(Padded);
    b.register_attribute(
        &["pad", "padding"],
        attribute(padded, |cx, raw| {
            cx.widget()?.padding = Edges::all(parse_f32(raw)?);
            Ok(())
        }),
    );
    let sides: [(&str, fn(&mut Edges) -> &mut f32); 4] = [
        ("padTop", |e| &mut e.top),
        ("padLeft", |e| &mut e.left),
        ("padBottom", |e| &mut e.bottom),
        ("padRight", |e| &mut e.right),
    ];
    for (alias, side) in sides {
        b.register_attribute(
            &[alias],
            attribute(padded, move |cx, raw| {
                let v = parse_f32(raw)?;
                *side(&mut cx.widget()?.padding) = v;
                Ok(())
            }),
        );
    }
}

fn register_kinds(b: &mut SyntaxBuilder) {
    b.register_attribute(
        &["wrap"],
        attribute(TargetKey::Kind(WidgetKind::Label), |cx, raw| {
            cx.widget()?.wrap = parse_bool(raw)?;
            Ok(())
        }),
    );

    let window = TargetKey::Kind(WidgetKind::Window);
    b.register_attribute(
        &["modal"],
        attribute(window, |cx, raw| {
            cx.widget()?.modal = parse_bool(raw)?;
            Ok(())
        }),
    );
    b.register_attribute(
        &["movable"],
        attribute(window, |cx, raw| {
            cx.widget()?.movable = parse_bool(raw)?;
            Ok(())
        }),
    );

    for kind in [WidgetKind::HorizontalGroup, WidgetKind::VerticalGroup] {
        b.register_attribute(
            &["spacing", "space"],
            attribute(TargetKey::Kind(kind), |cx, raw| {
                cx.widget()?.spacing = parse_f32(raw)?;
                Ok(())
            }),
        );
    }

    b.register_attribute(
        &["disabled", "disable"],
        attribute(TargetKey::Kind(WidgetKind::ScrollPane), |cx, raw| {
            cx.widget()?.scrolling_disabled = parse_bool(raw)?;
            Ok(())
        }),
    );
}

fn register_listener(b: &mut SyntaxBuilder) {
    b.register_attribute(
        &["action"],
        attribute(TargetKey::Listener, |cx, raw| {
            let action = cx.action_name(raw)?;
            cx.listener()?.action = Some(action);
            Ok(())
        }),
    );
    b.register_attribute(
        &["ids"],
        attribute(TargetKey::Listener, |cx, raw| {
            let ids = cx.list(raw);
            cx.listener()?.ids = ids;
            Ok(())
        }),
    );
    b.register_attribute(
        &["keep"],
        attribute(TargetKey::Listener, |cx, raw| {
            cx.listener()?.keep = parse_bool(raw)?;
            Ok(())
        }),
    );
}

fn register_cells(b: &mut SyntaxBuilder) {
    let derived = |names: &[&str]| names.iter().map(|n| CellAliases::derived(n)).collect::<Vec<_>>();

    b.register_cell_attribute(
        cell_attribute(|cell: &mut CellProps, raw: &str| {
            cell.pad = Edges::all(parse_f32(raw)?);
            Ok(())
        }),
        &derived(&["pad"]),
    );
    let sides: [(&str, fn(&mut Edges) -> &mut f32); 4] = [
        ("padTop", |e| &mut e.top),
        ("padLeft", |e| &mut e.left),
        ("padBottom", |e| &mut e.bottom),
        ("padRight", |e| &mut e.right),
    ];
    for (alias, side) in sides {
        b.register_cell_attribute(
            cell_attribute(move |cell: &mut CellProps, raw: &str| {
                *side(&mut cell.pad) = parse_f32(raw)?;
                Ok(())
            }),
            &derived(&[alias]),
        );
    }

    b.register_cell_attribute(
        cell_attribute(|cell: &mut CellProps, raw: &str| {
            let span = parse_usize(raw)?;
            if span == 0 {
                return Err(ValueError::Integer(raw.to_string()).into());
            }
            cell.colspan = span;
            Ok(())
        }),
        &derived(&["colspan"]),
    );

    let flags: [(&str, fn(&mut CellProps, bool)); 7] = [
        ("expand", |c, v| {
            c.expand_x = v;
            c.expand_y = v;
        }),
        ("expandX", |c, v| c.expand_x = v),
        ("expandY", |c, v| c.expand_y = v),
        ("fill", |c, v| {
            c.fill_x = v;
            c.fill_y = v;
        }),
        ("fillX", |c, v| c.fill_x = v),
        ("fillY", |c, v| c.fill_y = v),
        ("grow", |c, v| {
            c.expand_x = v;
            c.expand_y = v;
            c.fill_x = v;
            c.fill_y = v;
        }),
    ];
    for (alias, set) in flags {
        b.register_cell_attribute(
            cell_attribute(move |cell: &mut CellProps, raw: &str| {
                set(cell, parse_bool(raw)?);
                Ok(())
            }),
            &derived(&[alias]),
        );
    }

    b.register_cell_attribute(
        cell_attribute(|cell: &mut CellProps, raw: &str| {
            cell.align = Some(parse_align(raw)?);
            Ok(())
        }),
        &derived(&["align"]),
    );
    b.register_cell_attribute(
        cell_attribute(|cell: &mut CellProps, raw: &str| {
            cell.width = Some(parse_f32(raw)?);
            Ok(())
        }),
        &derived(&["width"]),
    );
    b.register_cell_attribute(
        cell_attribute(|cell: &mut CellProps, raw: &str| {
            cell.height = Some(parse_f32(raw)?);
            Ok(())
        }),
        &derived(&["height"]),
    );
    b.register_cell_attribute(
        cell_attribute(|cell: &mut CellProps, raw: &str| {
            cell.end_row = parse_bool(raw)?;
            Ok(())
        }),
        &[CellAliases::cell_only("row")],
    );
}
