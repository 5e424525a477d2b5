use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use trellis_dom::{Event, Node};

/// A host-supplied template include: receives the `data-with` value and
/// returns a fragment root to splice in, or `None` to render nothing.
pub type IncludeFn = Rc<dyn Fn(&Value) -> Result<Option<Node>, String>>;

/// An event handler stored in template data.
///
/// Receives the dispatched event when the template requested it with a
/// `handler($event)` call shape, and `None` for the bare form.
#[derive(Clone)]
pub struct Handler(Rc<dyn Fn(Option<&Event>)>);

impl Handler {
    pub fn new(f: impl Fn(Option<&Event>) + 'static) -> Handler {
        Handler(Rc::new(f))
    }

    pub fn call(&self, event: Option<&Event>) {
        (self.0)(event)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Handler(..)")
    }
}

/// Dynamic data fed to templates.
///
/// Everything a directive path can resolve to. Plain data variants
/// (`Null` through `Map`) behave like their JSON counterparts; the
/// remaining variants carry behavior: pre-sanitized markup, template
/// fragments, event handlers, and include functions.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(HashMap<String, Value>),
    /// Markup trusted by the caller; `data-html` inserts it unescaped.
    Html(String),
    /// A parsed fragment usable as a `data-include` target.
    Fragment(Node),
    Handler(Handler),
    Include(IncludeFn),
}

/// Marks `markup` as trusted so `data-html` will insert it verbatim.
pub fn unsafe_html(markup: impl Into<String>) -> Value {
    Value::Html(markup.into())
}

impl Value {
    pub fn object<K: Into<String>>(pairs: impl IntoIterator<Item = (K, Value)>) -> Value {
        Value::Map(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn list(items: impl IntoIterator<Item = Value>) -> Value {
        Value::List(items.into_iter().collect())
    }

    /// A handler that ignores the event argument.
    pub fn callback(f: impl Fn() + 'static) -> Value {
        Value::Handler(Handler::new(move |_| f()))
    }

    pub fn handler(f: impl Fn(Option<&Event>) + 'static) -> Value {
        Value::Handler(Handler::new(f))
    }

    pub fn fragment(node: Node) -> Value {
        Value::Fragment(node)
    }

    pub fn include(f: impl Fn(&Value) -> Result<Option<Node>, String> + 'static) -> Value {
        Value::Include(Rc::new(f))
    }

    /// Truthiness for conditional directives: null, `false`, numeric zero
    /// and the empty string are falsy, everything else (including the
    /// empty list) is truthy.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(flag) => *flag,
            Value::Int(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Text coercion used by text and attribute writes.
    pub fn as_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(flag) => flag.to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(n) => format_float(*n),
            Value::Str(s) => s.clone(),
            Value::Html(markup) => markup.clone(),
            Value::List(items) => {
                let parts: Vec<String> = items.iter().map(Value::as_text).collect();
                parts.join(",")
            }
            Value::Map(_) => "[object]".to_string(),
            Value::Fragment(_) | Value::Handler(_) | Value::Include(_) => String::new(),
        }
    }

    /// One step of path traversal: a map key, or a numeric list index.
    pub fn get(&self, segment: &str) -> Option<&Value> {
        match self {
            Value::Map(map) => map.get(segment),
            Value::List(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    }
}

fn format_float(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Html(a), Value::Html(b)) => a == b,
            (Value::Fragment(a), Value::Fragment(b)) => a.ptr_eq(b),
            (Value::Handler(a), Value::Handler(b)) => Rc::ptr_eq(&a.0, &b.0),
            (Value::Include(a), Value::Include(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            Value::Int(v) => f.debug_tuple("Int").field(v).finish(),
            Value::Float(v) => f.debug_tuple("Float").field(v).finish(),
            Value::Str(v) => f.debug_tuple("Str").field(v).finish(),
            Value::List(v) => f.debug_tuple("List").field(v).finish(),
            Value::Map(v) => f.debug_tuple("Map").field(v).finish(),
            Value::Html(v) => f.debug_tuple("Html").field(v).finish(),
            Value::Fragment(v) => f.debug_tuple("Fragment").field(v).finish(),
            Value::Handler(_) => f.write_str("Handler(..)"),
            Value::Include(_) => f.write_str("Include(..)"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Value {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Value {
        Value::Int(v.into())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Value {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Value {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Value {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Value {
        Value::Str(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Value {
        Value::List(v)
    }
}
