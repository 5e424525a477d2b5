use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use trellis_dom::{Node, parse_fragment};

use crate::compile::{CompiledTemplate, compile_fragment};
use crate::error::{Error, Result};
use crate::instance::Instance;
use crate::value::Value;

/// The engine owns every compiled template.
///
/// Named registrations compile lazily on first use; inline sources are
/// memoized by content and fragment nodes by identity, so repeated
/// renders of the same template share one compiled tree. Handles are
/// cheap clones over shared state; there is no ambient global, create
/// as many engines as you need.
#[derive(Clone, Default)]
pub struct Engine {
    inner: Rc<RefCell<EngineInner>>,
}

#[derive(Default)]
struct EngineInner {
    named: HashMap<String, NamedEntry>,
    by_source: HashMap<String, Rc<CompiledTemplate>>,
    // Keeps the fragment node alive so its address cannot be reused
    // while the cache entry exists.
    by_node: HashMap<usize, (Node, Rc<CompiledTemplate>)>,
}

struct NamedEntry {
    source: NamedSource,
    compiled: Option<Rc<CompiledTemplate>>,
}

enum NamedSource {
    Markup(String),
    Fragment(Node),
}

/// How callers refer to a template.
pub enum TemplateRef {
    /// A name previously registered on the engine.
    Name(String),
    /// Inline markup, compiled on the spot and memoized by content.
    Source(String),
    /// An already-parsed fragment root, memoized by node identity.
    Fragment(Node),
}

impl TemplateRef {
    pub fn source(markup: impl Into<String>) -> TemplateRef {
        TemplateRef::Source(markup.into())
    }
}

impl From<&str> for TemplateRef {
    fn from(name: &str) -> TemplateRef {
        TemplateRef::Name(name.to_string())
    }
}

impl From<String> for TemplateRef {
    fn from(name: String) -> TemplateRef {
        TemplateRef::Name(name)
    }
}

impl From<Node> for TemplateRef {
    fn from(node: Node) -> TemplateRef {
        TemplateRef::Fragment(node)
    }
}

impl Engine {
    pub fn new() -> Engine {
        Engine::default()
    }

    /// Registers (or replaces) a named template from markup. The source
    /// is not compiled until something uses it, so registration itself
    /// never fails.
    pub fn register(&self, name: impl Into<String>, markup: impl Into<String>) {
        let name = name.into();
        log::debug!("registering template `{name}`");
        self.inner.borrow_mut().named.insert(
            name,
            NamedEntry {
                source: NamedSource::Markup(markup.into()),
                compiled: None,
            },
        );
    }

    /// Registers (or replaces) a named template from a parsed fragment
    /// root.
    pub fn register_fragment(&self, name: impl Into<String>, root: Node) {
        let name = name.into();
        log::debug!("registering fragment template `{name}`");
        self.inner.borrow_mut().named.insert(
            name,
            NamedEntry {
                source: NamedSource::Fragment(root),
                compiled: None,
            },
        );
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.inner.borrow().named.contains_key(name)
    }

    /// Drops every registration and every cache entry. Instances that
    /// are already mounted keep their compiled trees and stay valid.
    pub fn reset(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.named.clear();
        inner.by_source.clear();
        inner.by_node.clear();
        log::debug!("engine reset");
    }

    /// Resolves a template reference to a compiled handle.
    pub fn template(&self, template: impl Into<TemplateRef>) -> Result<Template> {
        let tree = match template.into() {
            TemplateRef::Name(name) => self
                .compiled_by_name(&name)?
                .ok_or(Error::UnknownTemplate(name))?,
            TemplateRef::Source(markup) => self.compile_source(&markup)?,
            TemplateRef::Fragment(node) => self.compile_node(&node)?,
        };
        Ok(Template {
            engine: self.clone(),
            tree,
        })
    }

    /// Compile-and-mount in one call, returning only the root node.
    pub fn render(&self, template: impl Into<TemplateRef>, data: Value) -> Result<Node> {
        self.template(template)?.render(data)
    }

    /// Compile-and-hydrate in one call. See [`Template::hydrate`].
    pub fn hydrate(
        &self,
        template: impl Into<TemplateRef>,
        root: &Node,
        data: Value,
    ) -> Result<Instance> {
        self.template(template)?.hydrate(root, data)
    }

    /// Looks up a registered name, compiling it on first use.
    /// `Ok(None)` means the name is not registered.
    pub(crate) fn compiled_by_name(&self, name: &str) -> Result<Option<Rc<CompiledTemplate>>> {
        let source = {
            let inner = self.inner.borrow();
            match inner.named.get(name) {
                None => {
                    log::debug!("template `{name}` is not registered");
                    return Ok(None);
                }
                Some(entry) => {
                    if let Some(tree) = &entry.compiled {
                        return Ok(Some(tree.clone()));
                    }
                    match &entry.source {
                        NamedSource::Markup(markup) => NamedSource::Markup(markup.clone()),
                        NamedSource::Fragment(node) => NamedSource::Fragment(node.clone()),
                    }
                }
            }
        };
        let tree = match &source {
            NamedSource::Markup(markup) => Rc::new(compile_fragment(&parse_fragment(markup))?),
            NamedSource::Fragment(node) => self.compile_node(node)?,
        };
        if let Some(entry) = self.inner.borrow_mut().named.get_mut(name) {
            entry.compiled = Some(tree.clone());
        }
        Ok(Some(tree))
    }

    /// Compiles inline markup, memoized by the exact source string.
    pub(crate) fn compile_source(&self, markup: &str) -> Result<Rc<CompiledTemplate>> {
        if let Some(tree) = self.inner.borrow().by_source.get(markup) {
            return Ok(tree.clone());
        }
        let tree = Rc::new(compile_fragment(&parse_fragment(markup))?);
        self.inner
            .borrow_mut()
            .by_source
            .insert(markup.to_string(), tree.clone());
        Ok(tree)
    }

    /// Compiles a fragment root, memoized by node identity.
    pub(crate) fn compile_node(&self, root: &Node) -> Result<Rc<CompiledTemplate>> {
        let key = root.ptr_id();
        if let Some((_, tree)) = self.inner.borrow().by_node.get(&key) {
            return Ok(tree.clone());
        }
        let tree = Rc::new(compile_fragment(std::slice::from_ref(root))?);
        self.inner
            .borrow_mut()
            .by_node
            .insert(key, (root.clone(), tree.clone()));
        Ok(tree)
    }
}

/// A compiled template bound to the engine that compiled it.
#[derive(Clone)]
pub struct Template {
    engine: Engine,
    tree: Rc<CompiledTemplate>,
}

impl Template {
    /// Builds fresh nodes for `data` and returns the live instance.
    pub fn mount(&self, data: Value) -> Result<Instance> {
        Instance::mount(self.engine.clone(), self.tree.clone(), data)
    }

    /// Mounts and hands back only the root node, for render-and-forget
    /// use like server-side output.
    pub fn render(&self, data: Value) -> Result<Node> {
        Ok(self.mount(data)?.root())
    }

    /// Adopts `root`, typically re-parsed server output, as this
    /// template's rendering for `data`: existing nodes are reused and
    /// re-associated, listeners attached, content left untouched.
    pub fn hydrate(&self, root: &Node, data: Value) -> Result<Instance> {
        Instance::hydrate(self.engine.clone(), self.tree.clone(), root, data)
    }
}
