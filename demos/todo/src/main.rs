use std::cell::Cell;
use std::rc::Rc;

use trellis_engine::{Engine, Value};

const APP: &str = concat!(
    r#"<section><h1 data-text="title"></h1>"#,
    r#"<ul><li data-each="todos as todo" data-class-done="todo.done" data-text="todo.label"></li></ul>"#,
    r#"<button data-on-click="toggle">toggle</button>"#,
    "</section>"
);

fn view(first_done: bool, toggle: Value) -> Value {
    let todo = |label: &str, done: bool| {
        Value::object([("label", Value::from(label)), ("done", Value::from(done))])
    };
    Value::object([
        ("title", Value::from("today")),
        (
            "todos",
            Value::list([todo("water plants", first_done), todo("write code", false)]),
        ),
        ("toggle", toggle),
    ])
}

fn main() {
    let engine = Engine::new();
    engine.register("app", APP);

    let toggles = Rc::new(Cell::new(0u32));
    let toggle = {
        let toggles = toggles.clone();
        Value::callback(move || toggles.set(toggles.get() + 1))
    };

    let instance = engine
        .template("app")
        .expect("app template")
        .mount(view(false, toggle.clone()))
        .expect("mount");
    println!("{}", instance.root().to_html());

    // Simulate a click on the button, then fold the result back in.
    let button = instance.root().children().last().cloned().expect("button");
    button.dispatch("click");
    instance
        .update(view(toggles.get() % 2 == 1, toggle))
        .expect("update");
    println!("{}", instance.root().to_html());
}
