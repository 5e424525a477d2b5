use std::cell::Cell;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use trellis_engine::dom::parse_fragment;
use trellis_engine::{Engine, Error, TemplateRef, Value};

const PAGE: &str = concat!(
    r#"<section><h2 data-text="title"></h2>"#,
    r#"<ul><li data-each="items as it" data-text="it"></li></ul>"#,
    r#"<p data-if="note" data-text="note"></p>"#,
    "</section>"
);

fn page_data(title: &str) -> Value {
    Value::object([
        ("title", Value::from(title)),
        ("items", Value::list([Value::from("a"), Value::from("b")])),
        ("note", Value::from("n")),
    ])
}

#[test]
fn hydration_adopts_server_markup_without_rewriting() {
    let engine = Engine::new();
    let server = engine
        .render(TemplateRef::source(PAGE), page_data("T"))
        .unwrap()
        .to_html();
    let root = parse_fragment(&server).remove(0);

    // Hydrate with data that disagrees with the markup: nothing is
    // rewritten until the first update.
    let heading = root.first_child().unwrap();
    let instance = engine
        .hydrate(TemplateRef::source(PAGE), &root, page_data("X"))
        .unwrap();
    assert!(instance.root().ptr_eq(&root));
    assert_eq!(root.to_html(), server);

    instance.update(page_data("T")).unwrap();
    assert_eq!(root.to_html(), server);
    // Adopted nodes keep their identity across hydrate and update.
    assert!(root.first_child().unwrap().ptr_eq(&heading));
}

#[test]
fn hydrated_instances_are_interactive() {
    let engine = Engine::new();
    let source = r#"<button data-on-click="bump" data-text="label"></button>"#;
    let server = engine
        .render(
            TemplateRef::source(source),
            Value::object([("label", Value::from("go")), ("bump", Value::callback(|| {}))]),
        )
        .unwrap()
        .to_html();
    assert_eq!(server, "<button>go</button>");

    let root = parse_fragment(&server).remove(0);
    let hits = Rc::new(Cell::new(0));
    let data = {
        let hits = hits.clone();
        Value::object([
            ("label", Value::from("go")),
            ("bump", Value::callback(move || hits.set(hits.get() + 1))),
        ])
    };
    let instance = engine
        .hydrate(TemplateRef::source(source), &root, data)
        .unwrap();
    instance.root().dispatch("click");
    assert_eq!(hits.get(), 1);
}

#[test]
fn adopted_anchors_drive_later_structural_updates() {
    let engine = Engine::new();
    let source = r#"<ul><li data-each="items as it" data-text="it"></li></ul>"#;
    let items = |labels: &[&str]| {
        Value::object([(
            "items",
            Value::list(labels.iter().map(|label| Value::from(*label))),
        )])
    };
    let server = engine
        .render(TemplateRef::source(source), items(&["a", "b"]))
        .unwrap()
        .to_html();
    let root = parse_fragment(&server).remove(0);
    let instance = engine
        .hydrate(TemplateRef::source(source), &root, items(&["a", "b"]))
        .unwrap();
    let adopted_first = root.first_child().unwrap();

    instance.update(items(&["a", "b", "c"])).unwrap();
    assert_eq!(
        root.to_html(),
        "<ul><li>a</li><li>b</li><li>c</li><!--each--></ul>"
    );
    assert!(root.first_child().unwrap().ptr_eq(&adopted_first));

    instance.update(items(&[])).unwrap();
    assert_eq!(root.to_html(), "<ul><!--each--></ul>");
}

#[test]
fn branch_switches_reuse_the_adopted_anchor() {
    let engine = Engine::new();
    let source = r#"<div><p data-if="on">yes</p><p data-else>no</p></div>"#;
    let on = |flag: bool| Value::object([("on", Value::Bool(flag))]);

    let server = engine
        .render(TemplateRef::source(source), on(true))
        .unwrap()
        .to_html();
    assert_eq!(server, "<div><p>yes</p><!--if--></div>");

    let root = parse_fragment(&server).remove(0);
    let instance = engine
        .hydrate(TemplateRef::source(source), &root, on(true))
        .unwrap();

    instance.update(on(false)).unwrap();
    assert_eq!(root.to_html(), "<div><p>no</p><!--if--></div>");
}

#[test]
fn hydration_heals_missing_markup() {
    let engine = Engine::new();
    let source = r#"<div><span data-text="a"></span><p data-if="on">yes</p></div>"#;
    // Markup missing both the branch and its anchor.
    let root = parse_fragment("<div><span>A</span></div>").remove(0);
    let data = Value::object([("a", Value::from("A")), ("on", Value::Bool(true))]);
    let instance = engine
        .hydrate(TemplateRef::source(source), &root, data)
        .unwrap();
    assert!(instance.root().ptr_eq(&root));
    assert_eq!(root.to_html(), "<div><span>A</span><p>yes</p><!--if--></div>");
}

#[test]
fn includes_hydrate_their_adopted_children() {
    let engine = Engine::new();
    engine.register("chip", r#"<b data-text="."></b>"#);
    let source = r#"<div data-include="chip" data-with="label"></div>"#;
    let data = Value::object([("label", Value::from("hi"))]);
    let server = engine
        .render(TemplateRef::source(source), data.clone())
        .unwrap()
        .to_html();
    assert_eq!(server, "<div><b>hi</b></div>");

    let root = parse_fragment(&server).remove(0);
    let instance = engine
        .hydrate(TemplateRef::source(source), &root, data)
        .unwrap();
    let adopted = root.first_child().unwrap();

    instance
        .update(Value::object([("label", Value::from("yo"))]))
        .unwrap();
    assert!(root.first_child().unwrap().ptr_eq(&adopted));
    assert_eq!(root.to_html(), "<div><b>yo</b></div>");
}

#[test]
fn include_function_errors_surface_during_hydration() {
    let engine = Engine::new();
    let root = parse_fragment("<div></div>").remove(0);
    let data = Value::object([(
        "slot",
        Value::include(|_| Err("backend down".to_string())),
    )]);
    let err = engine
        .hydrate(
            TemplateRef::source(r#"<div data-include="slot"></div>"#),
            &root,
            data,
        )
        .err()
        .expect("hydrate should fail");
    assert!(matches!(err, Error::IncludeFailed(_)));
}
