use std::rc::Rc;

use crate::value::Value;

/// A chain of data frames, innermost first.
///
/// Each loop iteration pushes a child frame holding the item and index
/// aliases; everything else stays visible through the parent chain.
/// Cloning a scope shares the chain.
#[derive(Clone)]
pub struct Scope {
    inner: Rc<ScopeInner>,
}

struct ScopeInner {
    frame: Value,
    parent: Option<Scope>,
}

impl Scope {
    /// The outermost scope, wrapping the data passed to mount or update.
    pub fn root(frame: Value) -> Scope {
        Scope {
            inner: Rc::new(ScopeInner {
                frame,
                parent: None,
            }),
        }
    }

    /// A child scope whose `frame` shadows names in this scope.
    pub fn child(&self, frame: Value) -> Scope {
        Scope {
            inner: Rc::new(ScopeInner {
                frame,
                parent: Some(self.clone()),
            }),
        }
    }

    /// Resolves a dotted path against the chain.
    ///
    /// The frame owning the first segment wins; the remaining segments
    /// are then walked inside that frame only, so a partial match never
    /// falls back to an outer frame. `"."` yields the innermost frame
    /// itself. Anything missing resolves to [`Value::Null`].
    pub fn resolve(&self, path: &str) -> Value {
        let path = path.trim();
        if path.is_empty() {
            return Value::Null;
        }
        if path == "." {
            return self.inner.frame.clone();
        }
        let mut segments = path.split('.');
        let Some(first) = segments.next() else {
            return Value::Null;
        };
        let mut scope = Some(self);
        while let Some(current) = scope {
            if let Some(found) = current.inner.frame.get(first) {
                let mut value = found;
                for segment in segments.clone() {
                    match value.get(segment) {
                        Some(next) => value = next,
                        None => return Value::Null,
                    }
                }
                return value.clone();
            }
            scope = current.inner.parent.as_ref();
        }
        Value::Null
    }
}
