use trellis_engine::{Engine, TemplateRef, Value, unsafe_html};

fn render(source: &str, data: Value) -> String {
    Engine::new()
        .render(TemplateRef::source(source), data)
        .expect("render")
        .to_html()
}

#[test]
fn html_write_escapes_plain_strings() {
    let html = render(
        r#"<div data-html="body"></div>"#,
        Value::object([("body", Value::from("<em>hi</em>"))]),
    );
    assert_eq!(html, "<div>&lt;em&gt;hi&lt;/em&gt;</div>");
}

#[test]
fn html_write_inserts_trusted_markup() {
    let html = render(
        r#"<div data-html="body"></div>"#,
        Value::object([("body", unsafe_html("<em>hi</em> there"))]),
    );
    assert_eq!(html, "<div><em>hi</em> there</div>");
}

#[test]
fn text_write_never_trusts_markup() {
    let html = render(
        r#"<p data-text="body"></p>"#,
        Value::object([("body", unsafe_html("<i>x</i>"))]),
    );
    assert_eq!(html, "<p>&lt;i&gt;x&lt;/i&gt;</p>");
}

#[test]
fn safe_html_stays_escaped_even_for_trusted_markup() {
    let html = render(
        r#"<div data-safe-html="body"></div>"#,
        Value::object([("body", unsafe_html("<em>hi</em>"))]),
    );
    assert_eq!(html, "<div>&lt;em&gt;hi&lt;/em&gt;</div>");
}

#[test]
fn the_unsafe_wrapper_trusts_markup_from_the_template_side() {
    let root = Engine::new()
        .render(
            TemplateRef::source(r#"<div data-html="unsafe(body)"></div>"#),
            Value::object([("body", Value::from("<b>bold</b>"))]),
        )
        .unwrap();
    assert_eq!(root.to_html(), "<div><b>bold</b></div>");
    assert_eq!(root.first_child().unwrap().tag().as_deref(), Some("b"));
}

#[test]
fn safe_html_ignores_the_unsafe_wrapper() {
    let html = render(
        r#"<div data-safe-html="unsafe(body)"></div>"#,
        Value::object([("body", Value::from("<b>bold</b>"))]),
    );
    assert_eq!(html, "<div>&lt;b&gt;bold&lt;/b&gt;</div>");
}

#[test]
fn updates_can_change_trust() {
    let engine = Engine::new();
    let instance = engine
        .template(TemplateRef::source(r#"<div data-html="body"></div>"#))
        .unwrap()
        .mount(Value::object([("body", unsafe_html("<b>b</b>"))]))
        .unwrap();
    let root = instance.root();
    assert_eq!(root.inner_html(), "<b>b</b>");

    instance
        .update(Value::object([("body", Value::from("<b>b</b>"))]))
        .unwrap();
    assert_eq!(root.inner_html(), "&lt;b&gt;b&lt;/b&gt;");
}

#[test]
fn trusted_markup_becomes_real_nodes() {
    let engine = Engine::new();
    let root = engine
        .render(
            TemplateRef::source(r#"<div data-html="body"></div>"#),
            Value::object([("body", unsafe_html("<em>one</em><em>two</em>"))]),
        )
        .unwrap();
    let children = root.children();
    assert_eq!(children.len(), 2);
    assert_eq!(children[0].tag().as_deref(), Some("em"));
    assert_eq!(children[1].text(), "two");
}
