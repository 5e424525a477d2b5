use std::cell::{Cell, RefCell};
use std::rc::Rc;

use trellis_dom::Node;

use crate::compile::CompiledTemplate;
use crate::error::{Error, Result};
use crate::hydrate::hydrate_element;
use crate::registry::Engine;
use crate::render::{ElementState, RenderCtx, destroy_element, mount_element, update_element};
use crate::scope::Scope;
use crate::value::Value;

/// A template mounted onto live nodes.
///
/// Handles are cheap clones sharing one underlying state, so an event
/// handler can capture the instance it belongs to. Dropping all handles
/// does not detach the rendered nodes; call [`Instance::destroy`].
#[derive(Clone)]
pub struct Instance {
    inner: Rc<InstanceInner>,
}

struct InstanceInner {
    engine: Engine,
    tree: Rc<CompiledTemplate>,
    root: Node,
    state: RefCell<ElementState>,
    busy: Cell<bool>,
    destroyed: Cell<bool>,
}

impl Instance {
    pub(crate) fn mount(engine: Engine, tree: Rc<CompiledTemplate>, data: Value) -> Result<Instance> {
        let ctx = RenderCtx::new(engine.clone());
        let state = mount_element(&tree.root, &Scope::root(data), &ctx)?;
        Ok(Instance::wrap(engine, tree, state))
    }

    pub(crate) fn hydrate(
        engine: Engine,
        tree: Rc<CompiledTemplate>,
        root: &Node,
        data: Value,
    ) -> Result<Instance> {
        let ctx = RenderCtx::new(engine.clone());
        let state = hydrate_element(&tree.root, root, &Scope::root(data), &ctx)?;
        Ok(Instance::wrap(engine, tree, state))
    }

    fn wrap(engine: Engine, tree: Rc<CompiledTemplate>, state: ElementState) -> Instance {
        Instance {
            inner: Rc::new(InstanceInner {
                engine,
                tree,
                root: state.node.clone(),
                state: RefCell::new(state),
                busy: Cell::new(false),
                destroyed: Cell::new(false),
            }),
        }
    }

    /// The root element this instance rendered (or adopted).
    pub fn root(&self) -> Node {
        self.inner.root.clone()
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.get()
    }

    /// Re-renders in place against `data`.
    ///
    /// Rejected while another update or destroy is running on this
    /// instance, which turns re-entrant calls from event handlers into
    /// an error instead of a corrupted tree.
    pub fn update(&self, data: Value) -> Result<()> {
        if self.inner.destroyed.get() {
            return Err(Error::InstanceDestroyed);
        }
        if self.inner.busy.replace(true) {
            return Err(Error::UpdateInProgress);
        }
        let ctx = RenderCtx::new(self.inner.engine.clone());
        let result = update_element(
            &mut self.inner.state.borrow_mut(),
            &self.inner.tree.root,
            &Scope::root(data),
            &ctx,
        );
        self.inner.busy.set(false);
        result
    }

    /// Removes every listener the instance attached and detaches the
    /// rendered subtree from its parent. Destroying twice is a no-op;
    /// updating afterwards is an error.
    pub fn destroy(&self) -> Result<()> {
        if self.inner.destroyed.get() {
            return Ok(());
        }
        if self.inner.busy.replace(true) {
            return Err(Error::UpdateInProgress);
        }
        destroy_element(&self.inner.state.borrow());
        self.inner.destroyed.set(true);
        self.inner.busy.set(false);
        Ok(())
    }
}
