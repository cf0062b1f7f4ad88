use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use marduk_lml::{
    Capability, Content, Edges, LmlErrorKind, LmlParser, LmlSyntax, ListenerEvent, ParserConfig, TargetKey, Widget,
    WidgetKind, attribute,
};
use pretty_assertions::assert_eq;

fn parse(src: &str) -> marduk_lml::Document {
    LmlParser::default().parse(src).unwrap()
}

fn texts(widget: &Widget) -> Vec<String> {
    widget.children().iter().filter_map(|w| w.text.clone()).collect()
}

// ── dispatch ──────────────────────────────────────────────────────────────

#[test]
fn concrete_kind_beats_capability() {
    let mut builder = LmlSyntax::default().to_builder();
    builder.register_attribute(
        &["mark"],
        attribute(TargetKey::Capability(Capability::TextBearing), |cx, raw| {
            cx.widget()?.text = Some(format!("capability {raw}"));
            Ok(())
        }),
    );
    builder.register_attribute(
        &["mark"],
        attribute(TargetKey::Kind(WidgetKind::Label), |cx, raw| {
            cx.widget()?.text = Some(format!("label {raw}"));
            Ok(())
        }),
    );
    let parser = LmlParser::new(Arc::new(builder.build()));

    let doc = parser.parse(r#"<label mark="1"/><textField mark="2"/>"#).unwrap();
    assert_eq!(doc.roots[0].text.as_deref(), Some("label 1"));
    assert_eq!(doc.roots[1].text.as_deref(), Some("capability 2"));
}

#[test]
fn alias_collision_replaces_old_processor() {
    let old_calls = Arc::new(AtomicUsize::new(0));
    let new_calls = Arc::new(AtomicUsize::new(0));

    let mut builder = LmlSyntax::default().to_builder();
    let counter = Arc::clone(&old_calls);
    builder.register_attribute(
        &["tag", "marker"],
        attribute(TargetKey::Kind(WidgetKind::Actor), move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }),
    );
    let counter = Arc::clone(&new_calls);
    builder.register_attribute(
        &["marker"],
        attribute(TargetKey::Kind(WidgetKind::Actor), move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }),
    );
    let parser = LmlParser::new(Arc::new(builder.build()));

    parser.parse(r#"<image marker="x"/><group marker="y"/>"#).unwrap();
    assert_eq!(old_calls.load(Ordering::SeqCst), 0);
    assert_eq!(new_calls.load(Ordering::SeqCst), 2);

    // The other alias of the replaced registration still works.
    parser.parse(r#"<image tag="x"/>"#).unwrap();
    assert_eq!(old_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn building_attributes_reach_the_target() {
    let doc = parse(r#"<slider style="fancy" min="1" max="5" stepSize="0.5" value="2" vertical="true"/>"#);
    let slider = &doc.roots[0];
    assert_eq!(slider.style, "fancy");
    let range = slider.range.as_ref().unwrap();
    assert_eq!((range.min, range.max, range.step, range.value), (1.0, 5.0, 0.5, 2.0));
    assert!(slider.vertical);

    let doc = parse(r#"<textField value="typed" disabled="true"/>"#);
    assert_eq!(doc.roots[0].text.as_deref(), Some("typed"));
    assert!(doc.roots[0].disabled);

    let doc = parse("<TextButton>Go</textButton>");
    assert_eq!(doc.roots[0].text.as_deref(), Some("Go"));
}

#[test]
fn invalid_range_is_a_construction_error() {
    let err = LmlParser::default().parse(r#"<slider min="5" max="1"/>"#).unwrap_err();
    assert!(matches!(err.kind, LmlErrorKind::Construction(_)));
    assert_eq!(err.path.to_string(), "root/slider");
}

#[test]
fn unknown_attribute_names_root_path() {
    let err = LmlParser::default().parse(r#"<label bogus="1"/>"#).unwrap_err();
    assert_eq!(err.kind, LmlErrorKind::UnknownAttribute("bogus".into()));
    assert!(err.to_string().starts_with("root/label"));
    assert_eq!(err.attribute.as_deref(), Some("bogus"));
}

#[test]
fn unsupported_attribute_names_target() {
    let err = LmlParser::default().parse(r#"<group><image text="x"/></group>"#).unwrap_err();
    assert_eq!(
        err.kind,
        LmlErrorKind::UnsupportedAttribute { attribute: "text".into(), target: "image".into() }
    );
    assert_eq!(err.path.to_string(), "root/group/image");
}

#[test]
fn lenient_mode_skips_unknown_names() {
    let parser = LmlParser::default().config(ParserConfig::lenient());
    let doc = parser
        .parse(r#"<group><bogus><label/></bogus><label text="kept" bogus="1"/></group>"#)
        .unwrap();
    assert_eq!(texts(&doc.roots[0]), ["kept"]);

    let err = LmlParser::default().parse("<group><bogus/></group>").unwrap_err();
    assert_eq!(err.kind, LmlErrorKind::UnknownTag("bogus".into()));
    assert_eq!(err.path.to_string(), "root/group/bogus");
}

// ── cells ─────────────────────────────────────────────────────────────────

#[test]
fn pad_and_default_pad() {
    let doc = parse(
        r#"<table defaultPad="3" defaultExpandX="true">
               <label text="a"/>
               <label text="b" pad="1" row="true"/>
               <label text="c" colspan="2"/>
           </table>"#,
    );
    let table = doc.roots[0].table().unwrap();
    assert_eq!(table.defaults.pad, Edges::all(3.0));
    assert!(doc.roots[0].padding.is_zero());

    let cells: Vec<_> = table.cells().collect();
    assert_eq!(cells[0].props.pad, Edges::all(3.0));
    assert_eq!(cells[1].props.pad, Edges::all(1.0));
    assert!(cells.iter().all(|c| c.props.expand_x));
    assert_eq!(cells[2].props.colspan, 2);
    assert_eq!(table.row_count(), 2);
}

#[test]
fn pad_outside_a_table_pads_the_widget() {
    let doc = parse(r#"<container pad="6"><label/></container>"#);
    assert_eq!(doc.roots[0].padding, Edges::all(6.0));
}

// ── macros ────────────────────────────────────────────────────────────────

#[test]
fn interpolates_arguments() {
    let doc = LmlParser::default().argument("name", "World").parse(r#"<label text="Hi {name}"/>"#).unwrap();
    assert_eq!(doc.roots[0].text.as_deref(), Some("Hi World"));
}

#[test]
fn loop_copies_children_with_binding() {
    let doc = parse(r#"<group><:forEach item="a;b;c"><label text="{item}-{item:index}"/></:forEach></group>"#);
    assert_eq!(texts(&doc.roots[0]), ["a-0", "b-1", "c-2"]);

    let doc = parse(r##"<verticalGroup><:loop times="2" var="i"><label text="#{i}"/></:loop></verticalGroup>"##);
    assert_eq!(texts(&doc.roots[0]), ["#0", "#1"]);
}

#[test]
fn loop_binding_does_not_leak() {
    let err = LmlParser::default()
        .parse(r#"<group><:forEach item="a;b"><label/></:forEach><label text="{item}"/></group>"#)
        .unwrap_err();
    assert!(matches!(err.kind, LmlErrorKind::Interpolation { .. }));
    assert_eq!(err.path.to_string(), "root/group/label");
}

#[test]
fn lockstep_lists_must_match() {
    let err = LmlParser::default().parse(r#"<:forEach a="1;2" b="x"><label/></:forEach>"#).unwrap_err();
    assert!(matches!(err.kind, LmlErrorKind::Construction(_)));
}

#[test]
fn false_conditional_yields_nothing() {
    let doc = parse(r#"<if test="false"><label text="X"/></if>"#);
    assert!(doc.is_empty());
}

#[test]
fn true_conditional_expands_nested_macros() {
    let doc = parse(r#"<group><:if test="1 < 2"><:loop times="2"><label text="y"/></:loop></:if></group>"#);
    assert_eq!(texts(&doc.roots[0]), ["y", "y"]);
}

#[test]
fn else_branch() {
    let src = r#"<group><:if test="{mode} == 'dark'"><label text="dark"/><:else/><label text="light"/></:if></group>"#;
    let dark = LmlParser::default().argument("mode", "dark").parse(src).unwrap();
    let light = LmlParser::default().argument("mode", "day").parse(src).unwrap();
    assert_eq!(texts(&dark.roots[0]), ["dark"]);
    assert_eq!(texts(&light.roots[0]), ["light"]);
}

#[test]
fn placeholder_values_are_not_re_lexed() {
    let src = r#"<group><:if test="{user}"><:calculate who="{user}"/><label text="{who}"/></:if></group>"#;
    for user in ["Ada Lovelace", "O'Brien"] {
        let doc = LmlParser::default().argument("user", user).parse(src).unwrap();
        assert_eq!(texts(&doc.roots[0]), [user]);
    }

    let src = r#"<group><:if test="{user} == 'Ada Lovelace'"><label text="yes"/></:if></group>"#;
    let doc = LmlParser::default().argument("user", "Ada Lovelace").parse(src).unwrap();
    assert_eq!(texts(&doc.roots[0]), ["yes"]);
}

#[test]
fn assignments_bind_for_later_siblings() {
    let doc = parse(
        r#"<group>
               <:assign greeting="Hello"/>
               <:calculate answer="6 * 7"/>
               <label text="{greeting} {answer}"/>
           </group>"#,
    );
    assert_eq!(texts(&doc.roots[0]), ["Hello 42"]);
}

#[test]
fn eval_binds_action_results() {
    let doc = LmlParser::default()
        .action("user", |_| Some("ada".into()))
        .parse(r#"<:eval who="$user"/><label text="{who} / {$user}"/>"#)
        .unwrap();
    assert_eq!(doc.roots[0].text.as_deref(), Some("ada / ada"));
}

#[test]
fn exists_checks_bindings() {
    let src = r#"<group><:exists var="user"><label text="{user}"/></:exists></group>"#;
    assert!(parse(src).roots[0].children().is_empty());
    let doc = LmlParser::default().argument("user", "ada").parse(src).unwrap();
    assert_eq!(texts(&doc.roots[0]), ["ada"]);
}

#[test]
fn any_needs_one_binding() {
    let src = r#"<group><:any var="user;guest"><label text="hi"/></:any></group>"#;
    assert!(parse(src).roots[0].children().is_empty());
    let doc = LmlParser::default().argument("guest", "g").parse(src).unwrap();
    assert_eq!(texts(&doc.roots[0]), ["hi"]);
}

#[test]
fn argument_and_nls_bind_by_key() {
    let parser = LmlParser::default().argument("windowTitle", "Main").translation("greet", "Bonjour");
    let doc = parser
        .parse(
            r#"<group>
                   <:argument title="windowTitle" missing="absent"/>
                   <:nls hello="greet"/>
                   <label text="{title} {hello}"/>
                   <:anyNotNull var="missing"><label text="unreachable"/></:anyNotNull>
               </group>"#,
        )
        .unwrap();
    assert_eq!(texts(&doc.roots[0]), ["Main Bonjour"]);
}

#[test]
fn nested_loops_cover_every_combination() {
    let doc = parse(
        r#"<group><:forEachNested a="1;2" b="x;y"><label text="{a}{b}{b:index}"/></:forEachNested></group>"#,
    );
    assert_eq!(texts(&doc.roots[0]), ["1x0", "1y1", "2x0", "2y1"]);

    let doc = parse(r#"<group><:nested a="1;2" b=""><label/></:nested></group>"#);
    assert!(doc.roots[0].children().is_empty());
}

#[test]
fn import_splices_template_and_content() {
    let parser = LmlParser::default()
        .template("row.lml", r#"<table id="row"><label text="{title}"/><:content/></table>"#);
    let doc = parser.parse(r#"<:assign title="T"/><:import path="row.lml"><image id="icon"/></:import>"#).unwrap();
    let row = doc.named("row").unwrap();
    assert_eq!(row.children().len(), 2);
    assert_eq!(row.children()[0].text.as_deref(), Some("T"));
    assert!(doc.named("icon").is_some());
}

#[test]
fn import_cycle_is_fatal() {
    let parser = LmlParser::default()
        .template("a.lml", r#"<:import path="b.lml"/>"#)
        .template("b.lml", r#"<:import path="a.lml"/>"#);
    let err = parser.parse(r#"<:import path="a.lml"/>"#).unwrap_err();
    assert_eq!(err.kind, LmlErrorKind::ImportCycle(vec!["a.lml".into(), "b.lml".into(), "a.lml".into()]));
}

#[test]
fn missing_template() {
    let err = LmlParser::default().parse(r#"<:import path="nope.lml"/>"#).unwrap_err();
    assert_eq!(err.kind, LmlErrorKind::TemplateNotFound("nope.lml".into()));
}

#[test]
fn user_macros_with_defaults_and_content() {
    let doc = parse(
        r#"<:macro alias="field" label="Name"><label text="{label}"/><:content/></:macro>
           <group>
               <:field label="Age"><textField id="age"/></:field>
               <field/>
           </group>"#,
    );
    let group = &doc.roots[0];
    let kinds: Vec<_> = group.children().iter().map(|w| w.kind()).collect();
    assert_eq!(kinds, [WidgetKind::Label, WidgetKind::TextField, WidgetKind::Label]);
    assert_eq!(texts(group), ["Age", "Name"]);
}

#[test]
fn runaway_recursion_is_stopped() {
    let parser = LmlParser::default().config(ParserConfig::default().max_depth(16));
    let err = parser.parse(r#"<:macro alias="again"><:again/></:macro><:again/>"#).unwrap_err();
    assert_eq!(err.kind, LmlErrorKind::RecursionLimitExceeded(16));
}

#[test]
fn expansion_size_is_capped() {
    let parser = LmlParser::default().config(ParserConfig::default().max_expansions(50));
    let err = parser.parse(r#"<group><:loop times="100"><label/></:loop></group>"#).unwrap_err();
    assert_eq!(err.kind, LmlErrorKind::ExpansionLimitExceeded(50));
}

#[test]
fn empty_loop_bodies_still_count() {
    let parser = LmlParser::default().config(ParserConfig::default().max_expansions(50));
    let err = parser.parse(r#"<group><:loop times="300000000"></:loop></group>"#).unwrap_err();
    assert_eq!(err.kind, LmlErrorKind::ExpansionLimitExceeded(50));

    let err = parser
        .parse(r#"<group><:forEachNested a="1;2;3;4;5;6;7;8" b="1;2;3;4;5;6;7;8"/></group>"#)
        .unwrap_err();
    assert_eq!(err.kind, LmlErrorKind::ExpansionLimitExceeded(50));
}

#[test]
fn style_sets_defaults_explicit_wins() {
    let doc = parse(
        r#"<:style tag="label" name="wrap" value="true"/>
           <label text="a"/>
           <label text="b" wrap="false"/>"#,
    );
    assert!(doc.roots[0].wrap);
    assert!(!doc.roots[1].wrap);

    let doc = LmlParser::default().style("label", "color", "red").parse(r#"<label/>"#).unwrap();
    assert!(doc.roots[0].color.is_some());
}

#[test]
fn comments_and_exceptions() {
    assert!(parse(r#"<:comment note="{not interpolated}"><label/></:comment>"#).is_empty());

    let err = LmlParser::default().parse(r#"<group><:throw message="stop here"/></group>"#).unwrap_err();
    assert_eq!(err.kind, LmlErrorKind::Thrown("stop here".into()));
    assert_eq!(err.path.to_string(), "root/group/:throw");
}

// ── tag protocol ──────────────────────────────────────────────────────────

#[test]
fn inner_text_policies() {
    let doc = parse(
        "<textButton>Press</textButton>\n<table>one\ntwo</table>\n<verticalGroup>a\nb</verticalGroup>\n<container>solo</container>",
    );
    assert_eq!(doc.roots[0].text.as_deref(), Some("Press"));
    assert_eq!(doc.roots[1].table().unwrap().row_count(), 2);
    assert_eq!(texts(&doc.roots[2]), ["a", "b"]);
    assert!(matches!(&doc.roots[3].content, Content::Single(Some(_))));

    let err = LmlParser::default().parse("<image>text</image>").unwrap_err();
    assert!(matches!(err.kind, LmlErrorKind::Construction(_)));
}

#[test]
fn text_attribute_beats_inner_text() {
    let doc = parse(r#"<label text="attr">inner</label>"#);
    assert_eq!(doc.roots[0].text.as_deref(), Some("attr"));
}

#[test]
fn listeners_attach_to_parent_or_previous_root() {
    let parser = LmlParser::default().action("submit", |_| None).action("close", |_| None);
    let doc = parser
        .parse(
            r#"<textButton id="ok" text="OK"><onClick>submit</onClick></textButton>
               <onChange action="$close" ids="ok" keep="false"/>"#,
        )
        .unwrap();
    let button = doc.named("ok").unwrap();
    let click: Vec<_> = button.listeners_for(ListenerEvent::Click).collect();
    assert_eq!(click[0].action.as_deref(), Some("submit"));
    let change: Vec<_> = button.listeners_for(ListenerEvent::Change).collect();
    assert_eq!(change[0].ids, ["ok"]);
    assert!(!change[0].keep);
}

#[test]
fn listener_errors() {
    let parser = LmlParser::default().action("submit", |_| None);
    let orphan = parser.parse(r#"<onClick action="submit"/>"#).unwrap_err();
    assert!(matches!(orphan.kind, LmlErrorKind::Construction(_)));

    let unknown_id = parser.parse(r#"<group><onClick action="submit" ids="later"/></group>"#).unwrap_err();
    assert!(matches!(unknown_id.kind, LmlErrorKind::Construction(_)));

    let unknown_action = parser.parse(r#"<group><onClick>missing</onClick></group>"#).unwrap_err();
    assert_eq!(unknown_action.kind, LmlErrorKind::UnknownAction("missing".into()));
}

#[test]
fn listener_may_name_enclosing_widget() {
    let parser = LmlParser::default().action("submit", |_| None);
    let doc = parser
        .parse(r#"<window id="form"><textButton id="ok"><onClick action="submit" ids="ok;form"/></textButton></window>"#)
        .unwrap();
    let click: Vec<_> = doc.named("ok").unwrap().listeners_for(ListenerEvent::Click).collect();
    assert_eq!(click[0].ids, ["ok", "form"]);

    // A sibling that has not closed yet is still unknown.
    let err = parser
        .parse(r#"<group><label><onClick action="submit" ids="later"/></label><label id="later"/></group>"#)
        .unwrap_err();
    assert!(matches!(err.kind, LmlErrorKind::Construction(_)));
}

#[test]
fn actions_run_on_create_and_close() {
    let parser = LmlParser::default()
        .action("hide", |w: Option<&mut Widget>| {
            if let Some(w) = w {
                w.visible = false;
            }
            None
        })
        .action("titled", |w: Option<&mut Widget>| {
            if let Some(w) = w {
                w.title = Some(format!("{} children", w.children().len()));
            }
            None
        });
    let doc = parser
        .parse(r#"<window onCreate="$hide" onClose="titled"><label/><label/></window>"#)
        .unwrap();
    assert!(!doc.roots[0].visible);
    assert_eq!(doc.roots[0].title.as_deref(), Some("2 children"));
}

#[test]
fn duplicate_ids_fail() {
    let err = LmlParser::default().parse(r#"<group><label id="x"/><image id="x"/></group>"#).unwrap_err();
    assert!(matches!(err.kind, LmlErrorKind::Construction(_)));
    assert_eq!(err.path.to_string(), "root/group/image#x");
}

#[test]
fn names_are_case_insensitive() {
    let doc = parse(r#"<TextButton TEXT="Go" Disabled="true"/>"#);
    assert_eq!(doc.roots[0].kind(), WidgetKind::TextButton);
    assert!(doc.roots[0].disabled);
}

#[test]
fn one_parser_serves_many_threads() {
    let parser = Arc::new(LmlParser::default().argument("n", "7"));
    std::thread::scope(|s| {
        for _ in 0..4 {
            let parser = Arc::clone(&parser);
            s.spawn(move || {
                let doc = parser.parse(r#"<label text="{n}"/>"#).unwrap();
                assert_eq!(doc.roots[0].text.as_deref(), Some("7"));
            });
        }
    });
}
