use std::cell::{Cell, RefCell};
use std::rc::Rc;

use trellis_engine::{Engine, Instance, TemplateRef, Value};

#[test]
fn click_handlers_fire_through_dispatch() {
    let clicks = Rc::new(Cell::new(0));
    let data = {
        let clicks = clicks.clone();
        Value::object([(
            "bump",
            Value::callback(move || clicks.set(clicks.get() + 1)),
        )])
    };
    let instance = Engine::new()
        .template(TemplateRef::source(
            r#"<button data-on-click="bump">go</button>"#,
        ))
        .unwrap()
        .mount(data)
        .unwrap();

    let invoked = instance.root().dispatch("click");
    assert_eq!(invoked, 1);
    assert_eq!(clicks.get(), 1);
}

#[test]
fn the_event_shape_passes_the_event_through() {
    let seen = Rc::new(RefCell::new(None));
    let data = {
        let seen = seen.clone();
        Value::object([(
            "probe",
            Value::handler(move |event| {
                *seen.borrow_mut() = event.map(|e| e.event_type().to_string());
            }),
        )])
    };
    let instance = Engine::new()
        .template(TemplateRef::source(
            r#"<button data-on-click="probe($event)">go</button>"#,
        ))
        .unwrap()
        .mount(data)
        .unwrap();

    instance.root().dispatch("click");
    assert_eq!(seen.borrow().as_deref(), Some("click"));
}

#[test]
fn bare_shape_handlers_get_no_event() {
    let got_event = Rc::new(Cell::new(true));
    let data = {
        let got_event = got_event.clone();
        Value::object([(
            "probe",
            Value::handler(move |event| got_event.set(event.is_some())),
        )])
    };
    let instance = Engine::new()
        .template(TemplateRef::source(
            r#"<button data-on-click="probe">go</button>"#,
        ))
        .unwrap()
        .mount(data)
        .unwrap();

    instance.root().dispatch("click");
    assert!(!got_event.get());
}

#[test]
fn updates_swap_the_handler_without_reattaching() {
    let first = Rc::new(Cell::new(0));
    let second = Rc::new(Cell::new(0));
    let engine = Engine::new();
    let template = engine
        .template(TemplateRef::source(r#"<button data-on-click="go">x</button>"#))
        .unwrap();
    let data = {
        let first = first.clone();
        Value::object([("go", Value::callback(move || first.set(first.get() + 1)))])
    };
    let instance = template.mount(data).unwrap();
    let root = instance.root();
    root.dispatch("click");
    assert_eq!((first.get(), second.get()), (1, 0));

    let data = {
        let second = second.clone();
        Value::object([("go", Value::callback(move || second.set(second.get() + 1)))])
    };
    instance.update(data).unwrap();
    assert_eq!(root.listener_count(), 1);
    root.dispatch("click");
    assert_eq!((first.get(), second.get()), (1, 1));
}

#[test]
fn row_handlers_resolve_in_their_row_scope() {
    let hits: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));
    let tagged = |label: &'static str| {
        let hits = hits.clone();
        Value::object([(
            "go",
            Value::callback(move || hits.borrow_mut().push(label)),
        )])
    };
    let data = Value::object([("items", Value::list([tagged("first"), tagged("second")]))]);
    let instance = Engine::new()
        .template(TemplateRef::source(
            r#"<ul><li data-each="items as it" data-on-click="it.go">row</li></ul>"#,
        ))
        .unwrap()
        .mount(data)
        .unwrap();

    let rows = instance.root().children();
    rows[1].dispatch("click");
    rows[0].dispatch("click");
    assert_eq!(*hits.borrow(), vec!["second", "first"]);
}

#[test]
fn events_bubble_to_ancestor_handlers() {
    let outer = Rc::new(Cell::new(0));
    let inner = Rc::new(Cell::new(0));
    let data = {
        let outer = outer.clone();
        let inner = inner.clone();
        Value::object([
            ("outer", Value::callback(move || outer.set(outer.get() + 1))),
            ("inner", Value::callback(move || inner.set(inner.get() + 1))),
        ])
    };
    let instance = Engine::new()
        .template(TemplateRef::source(
            r#"<div data-on-click="outer"><button data-on-click="inner">x</button></div>"#,
        ))
        .unwrap()
        .mount(data)
        .unwrap();

    let button = instance.root().first_child().unwrap();
    let invoked = button.dispatch("click");
    assert_eq!(invoked, 2);
    assert_eq!((inner.get(), outer.get()), (1, 1));
}

#[test]
fn stop_propagation_halts_bubbling() {
    let outer = Rc::new(Cell::new(0));
    let data = {
        let outer = outer.clone();
        Value::object([
            ("outer", Value::callback(move || outer.set(outer.get() + 1))),
            (
                "inner",
                Value::handler(|event| {
                    if let Some(event) = event {
                        event.stop_propagation();
                    }
                }),
            ),
        ])
    };
    let instance = Engine::new()
        .template(TemplateRef::source(concat!(
            r#"<div data-on-click="outer">"#,
            r#"<button data-on-click="inner($event)">x</button>"#,
            "</div>"
        )))
        .unwrap()
        .mount(data)
        .unwrap();

    let button = instance.root().first_child().unwrap();
    let invoked = button.dispatch("click");
    assert_eq!(invoked, 1);
    assert_eq!(outer.get(), 0);
}

#[test]
fn non_handler_paths_are_ignored_at_dispatch() {
    let instance = Engine::new()
        .template(TemplateRef::source(r#"<button data-on-click="go">x</button>"#))
        .unwrap()
        .mount(Value::object([("go", Value::from("not a handler"))]))
        .unwrap();
    // The listener runs; resolving a non-handler is a logged no-op.
    assert_eq!(instance.root().dispatch("click"), 1);
}

#[test]
fn destroy_detaches_listeners() {
    let hits = Rc::new(Cell::new(0));
    let data = {
        let hits = hits.clone();
        Value::object([("go", Value::callback(move || hits.set(hits.get() + 1)))])
    };
    let instance = Engine::new()
        .template(TemplateRef::source(r#"<button data-on-click="go">x</button>"#))
        .unwrap()
        .mount(data)
        .unwrap();
    let root = instance.root();
    assert_eq!(root.listener_count(), 1);

    instance.destroy().unwrap();
    assert_eq!(root.listener_count(), 0);
    assert_eq!(root.dispatch("click"), 0);
    assert_eq!(hits.get(), 0);
}

#[test]
fn handlers_can_drive_their_own_instance() {
    // The usual feedback loop: a click handler updates the instance it
    // belongs to. Dispatch runs outside update, so this is allowed.
    let slot: Rc<RefCell<Option<Instance>>> = Rc::new(RefCell::new(None));
    let data = {
        let slot = slot.clone();
        Value::object([
            ("count", Value::Int(0)),
            (
                "bump",
                Value::callback(move || {
                    if let Some(instance) = slot.borrow().as_ref() {
                        instance
                            .update(Value::object([("count", Value::Int(1))]))
                            .unwrap();
                    }
                }),
            ),
        ])
    };
    let instance = Engine::new()
        .template(TemplateRef::source(
            r#"<button data-on-click="bump" data-text="count"></button>"#,
        ))
        .unwrap()
        .mount(data)
        .unwrap();
    *slot.borrow_mut() = Some(instance.clone());
    let root = instance.root();
    assert_eq!(root.text(), "0");

    root.dispatch("click");
    assert_eq!(root.text(), "1");
}
