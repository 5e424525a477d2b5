//! Mounting, in-place update and teardown of binding trees.
//!
//! Structural directives keep a comment anchor in the parent so changed
//! branches and grown loops always land back in the right position.
//! Loop rows are reconciled by position: row N keeps its nodes and is
//! re-rendered with item N's scope.

use std::cell::RefCell;
use std::rc::Rc;

use trellis_dom::{ListenerId, Node};

use crate::compile::{
    CallShape, ChildBinding, CompiledTemplate, ConditionalBinding, EachBinding, ElementBinding,
    EventBinding, IncludeBinding, WriteDirective,
};
use crate::error::{Error, Result};
use crate::registry::Engine;
use crate::scope::Scope;
use crate::value::Value;

pub(crate) const MAX_INCLUDE_DEPTH: usize = 32;

/// Carried through mount/update so includes can reach the engine's
/// caches and are cut off before runaway recursion.
pub(crate) struct RenderCtx {
    pub(crate) engine: Engine,
    depth: usize,
}

impl RenderCtx {
    pub(crate) fn new(engine: Engine) -> RenderCtx {
        RenderCtx { engine, depth: 0 }
    }

    pub(crate) fn deeper(&self) -> Result<RenderCtx> {
        if self.depth + 1 > MAX_INCLUDE_DEPTH {
            return Err(Error::IncludeDepth(MAX_INCLUDE_DEPTH));
        }
        Ok(RenderCtx {
            engine: self.engine.clone(),
            depth: self.depth + 1,
        })
    }
}

/// Live counterpart of an [`ElementBinding`].
pub(crate) struct ElementState {
    pub(crate) node: Node,
    /// Listeners resolve their handler through this slot at dispatch
    /// time, so updates only need to swap the scope in.
    pub(crate) scope_slot: Rc<RefCell<Scope>>,
    pub(crate) listeners: Vec<ListenerId>,
    pub(crate) children: Vec<ChildState>,
    pub(crate) include: Option<IncludeState>,
}

pub(crate) enum ChildState {
    Element(ElementState),
    Conditional(ConditionalState),
    Each(EachState),
}

pub(crate) struct ConditionalState {
    pub(crate) anchor: Node,
    pub(crate) active: Option<(BranchSel, ElementState)>,
}

/// Which member of a conditional chain is mounted.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum BranchSel {
    Branch(usize),
    Else,
}

pub(crate) struct EachState {
    pub(crate) anchor: Node,
    pub(crate) items: Vec<ElementState>,
}

pub(crate) struct IncludeState {
    pub(crate) tree: Rc<CompiledTemplate>,
    pub(crate) root: Box<ElementState>,
}

// ---- mount ----------------------------------------------------------------

pub(crate) fn mount_element(
    binding: &ElementBinding,
    scope: &Scope,
    ctx: &RenderCtx,
) -> Result<ElementState> {
    let node = Node::element(&binding.tag);
    for (name, value) in &binding.static_attrs {
        node.set_attr(name, value);
    }

    let mut children = Vec::new();
    for child in &binding.children {
        match child {
            ChildBinding::Text(content) => node.append_child(&Node::new_text(content)),
            ChildBinding::Comment(content) => node.append_child(&Node::comment(content)),
            ChildBinding::Element(element) => {
                let state = mount_element(element, scope, ctx)?;
                node.append_child(&state.node);
                children.push(ChildState::Element(state));
            }
            ChildBinding::Conditional(conditional) => {
                let state = mount_conditional(conditional, &node, scope, ctx)?;
                children.push(ChildState::Conditional(state));
            }
            ChildBinding::Each(each) => {
                let state = mount_each(each, &node, scope, ctx)?;
                children.push(ChildState::Each(state));
            }
        }
    }

    let include = match &binding.include {
        Some(ib) => mount_include(ib, &node, scope, ctx)?,
        None => None,
    };

    apply_writes(&node, &binding.writes, scope);

    let scope_slot = Rc::new(RefCell::new(scope.clone()));
    let mut listeners = Vec::new();
    for event in &binding.events {
        listeners.push(attach_listener(&node, event, &scope_slot));
    }

    Ok(ElementState {
        node,
        scope_slot,
        listeners,
        children,
        include,
    })
}

fn mount_conditional(
    binding: &ConditionalBinding,
    parent: &Node,
    scope: &Scope,
    ctx: &RenderCtx,
) -> Result<ConditionalState> {
    let active = match pick_branch(binding, scope) {
        Some(sel) => match branch_body(binding, sel) {
            Some(body) => {
                let state = mount_element(body, scope, ctx)?;
                parent.append_child(&state.node);
                Some((sel, state))
            }
            None => None,
        },
        None => None,
    };
    let anchor = Node::comment("if");
    parent.append_child(&anchor);
    Ok(ConditionalState { anchor, active })
}

fn mount_each(
    binding: &EachBinding,
    parent: &Node,
    scope: &Scope,
    ctx: &RenderCtx,
) -> Result<EachState> {
    let mut items = Vec::new();
    for (index, value) in list_items(scope, &binding.list_path).iter().enumerate() {
        let item_scope = each_scope(binding, scope, value, index);
        let state = mount_element(&binding.body, &item_scope, ctx)?;
        parent.append_child(&state.node);
        items.push(state);
    }
    let anchor = Node::comment("each");
    parent.append_child(&anchor);
    Ok(EachState { anchor, items })
}

fn mount_include(
    binding: &IncludeBinding,
    host: &Node,
    scope: &Scope,
    ctx: &RenderCtx,
) -> Result<Option<IncludeState>> {
    let with_value = include_with(binding, scope);
    let Some(tree) = resolve_include(ctx, scope, &binding.target, &with_value)? else {
        return Ok(None);
    };
    let deeper = ctx.deeper()?;
    let root = mount_element(&tree.root, &Scope::root(with_value), &deeper)?;
    host.append_child(&root.node);
    Ok(Some(IncludeState {
        tree,
        root: Box::new(root),
    }))
}

pub(crate) fn include_with(binding: &IncludeBinding, scope: &Scope) -> Value {
    match &binding.with_path {
        Some(path) => scope.resolve(path),
        None => Value::Null,
    }
}

/// Turns an include target into a compiled tree: fragment values and
/// include functions compile their node, string values and unresolved
/// targets fall back to the registry by name.
pub(crate) fn resolve_include(
    ctx: &RenderCtx,
    scope: &Scope,
    target: &str,
    with_value: &Value,
) -> Result<Option<Rc<CompiledTemplate>>> {
    match scope.resolve(target) {
        Value::Fragment(node) => ctx.engine.compile_node(&node).map(Some),
        Value::Include(resolver) => match resolver(with_value) {
            Ok(Some(node)) => ctx.engine.compile_node(&node).map(Some),
            Ok(None) => Ok(None),
            Err(message) => Err(Error::IncludeFailed(message)),
        },
        Value::Str(name) => ctx.engine.compiled_by_name(&name),
        Value::Null => ctx.engine.compiled_by_name(target),
        other => {
            log::debug!("include target `{target}` is not usable ({other:?})");
            Ok(None)
        }
    }
}

// ---- shared helpers -------------------------------------------------------

pub(crate) fn pick_branch(binding: &ConditionalBinding, scope: &Scope) -> Option<BranchSel> {
    for (index, (path, _)) in binding.branches.iter().enumerate() {
        if scope.resolve(path).truthy() {
            return Some(BranchSel::Branch(index));
        }
    }
    binding.else_branch.as_ref().map(|_| BranchSel::Else)
}

pub(crate) fn branch_body(binding: &ConditionalBinding, sel: BranchSel) -> Option<&ElementBinding> {
    match sel {
        BranchSel::Branch(index) => binding.branches.get(index).map(|(_, body)| body),
        BranchSel::Else => binding.else_branch.as_ref(),
    }
}

pub(crate) fn list_items(scope: &Scope, path: &str) -> Vec<Value> {
    match scope.resolve(path) {
        Value::List(items) => items,
        Value::Null => Vec::new(),
        other => {
            log::debug!("data-each path `{path}` is not a list ({other:?})");
            Vec::new()
        }
    }
}

pub(crate) fn each_scope(
    binding: &EachBinding,
    scope: &Scope,
    value: &Value,
    index: usize,
) -> Scope {
    scope.child(Value::object([
        (binding.item_alias.as_str(), value.clone()),
        (binding.index_alias.as_str(), Value::Int(index as i64)),
    ]))
}

pub(crate) fn apply_writes(node: &Node, writes: &[WriteDirective], scope: &Scope) {
    for write in writes {
        match write {
            WriteDirective::Text(path) => node.set_text(&scope.resolve(path).as_text()),
            WriteDirective::Html { path, trusted } => {
                let value = scope.resolve(path);
                if *trusted {
                    // The template vouched for the markup via unsafe(..).
                    node.set_inner_html(&value.as_text());
                } else {
                    match value {
                        // Only explicitly trusted markup goes in unescaped.
                        Value::Html(markup) => node.set_inner_html(&markup),
                        other => node.set_text(&other.as_text()),
                    }
                }
            }
            WriteDirective::SafeHtml(path) => {
                let text = match scope.resolve(path) {
                    Value::Html(markup) => markup,
                    other => other.as_text(),
                };
                node.set_text(&text);
            }
            WriteDirective::Attr { name, path } => match scope.resolve(path) {
                Value::Null | Value::Bool(false) => node.remove_attr(name),
                value => node.set_attr(name, &value.as_text()),
            },
            WriteDirective::Class { name, path } => {
                if scope.resolve(path).truthy() {
                    node.add_class(name);
                } else {
                    node.remove_class(name);
                }
            }
            WriteDirective::Style { prop, path } => match scope.resolve(path) {
                Value::Null | Value::Bool(false) => node.remove_style(prop),
                Value::Str(empty) if empty.is_empty() => node.remove_style(prop),
                value => node.set_style(prop, &value.as_text()),
            },
            WriteDirective::Show(path) => {
                if scope.resolve(path).truthy() {
                    node.remove_style("display");
                } else {
                    node.set_style("display", "none");
                }
            }
            WriteDirective::Hide(path) => {
                if scope.resolve(path).truthy() {
                    node.set_style("display", "none");
                } else {
                    node.remove_style("display");
                }
            }
        }
    }
}

pub(crate) fn attach_listener(
    node: &Node,
    binding: &EventBinding,
    slot: &Rc<RefCell<Scope>>,
) -> ListenerId {
    let path = binding.path.clone();
    let shape = binding.shape;
    let slot = slot.clone();
    node.add_listener(&binding.event, move |event| {
        let scope = slot.borrow().clone();
        match scope.resolve(&path) {
            Value::Handler(handler) => match shape {
                CallShape::Bare => handler.call(None),
                CallShape::WithEvent => handler.call(Some(event)),
            },
            Value::Null => log::debug!("handler path `{path}` resolved to null"),
            other => log::debug!("handler path `{path}` is not a handler ({other:?})"),
        }
    })
}

fn insert_before_anchor(anchor: &Node, node: &Node) {
    match anchor.parent() {
        Some(parent) => parent.insert_before(node, Some(anchor)),
        None => log::warn!("structural anchor is detached, dropping subtree"),
    }
}

// ---- update ---------------------------------------------------------------

pub(crate) fn update_element(
    state: &mut ElementState,
    binding: &ElementBinding,
    scope: &Scope,
    ctx: &RenderCtx,
) -> Result<()> {
    *state.scope_slot.borrow_mut() = scope.clone();

    let mut states = state.children.iter_mut();
    for child in &binding.children {
        let slot = match child {
            ChildBinding::Text(_) | ChildBinding::Comment(_) => continue,
            _ => states.next(),
        };
        match (child, slot) {
            (ChildBinding::Element(element), Some(ChildState::Element(st))) => {
                update_element(st, element, scope, ctx)?;
            }
            (ChildBinding::Conditional(conditional), Some(ChildState::Conditional(st))) => {
                update_conditional(st, conditional, scope, ctx)?;
            }
            (ChildBinding::Each(each), Some(ChildState::Each(st))) => {
                update_each(st, each, scope, ctx)?;
            }
            _ => log::warn!("instance state lost sync with its template"),
        }
    }

    update_include(state, binding, scope, ctx)?;
    apply_writes(&state.node, &binding.writes, scope);
    Ok(())
}

fn update_conditional(
    state: &mut ConditionalState,
    binding: &ConditionalBinding,
    scope: &Scope,
    ctx: &RenderCtx,
) -> Result<()> {
    let sel = pick_branch(binding, scope);
    if let (Some((current, body_state)), Some(next)) = (state.active.as_mut(), sel) {
        if *current == next {
            if let Some(body) = branch_body(binding, next) {
                return update_element(body_state, body, scope, ctx);
            }
        }
    }

    // Winner changed: tear the old branch down, mount the new one at
    // the anchor so ordering among siblings is preserved.
    if let Some((_, old)) = state.active.take() {
        destroy_element(&old);
    }
    if let Some(next) = sel {
        if let Some(body) = branch_body(binding, next) {
            let mounted = mount_element(body, scope, ctx)?;
            insert_before_anchor(&state.anchor, &mounted.node);
            state.active = Some((next, mounted));
        }
    }
    Ok(())
}

fn update_each(
    state: &mut EachState,
    binding: &EachBinding,
    scope: &Scope,
    ctx: &RenderCtx,
) -> Result<()> {
    let values = list_items(scope, &binding.list_path);

    let reused = state.items.len().min(values.len());
    for index in 0..reused {
        let item_scope = each_scope(binding, scope, &values[index], index);
        update_element(&mut state.items[index], &binding.body, &item_scope, ctx)?;
    }
    for index in state.items.len()..values.len() {
        let item_scope = each_scope(binding, scope, &values[index], index);
        let mounted = mount_element(&binding.body, &item_scope, ctx)?;
        insert_before_anchor(&state.anchor, &mounted.node);
        state.items.push(mounted);
    }
    while state.items.len() > values.len() {
        if let Some(extra) = state.items.pop() {
            destroy_element(&extra);
        }
    }
    Ok(())
}

fn update_include(
    state: &mut ElementState,
    binding: &ElementBinding,
    scope: &Scope,
    ctx: &RenderCtx,
) -> Result<()> {
    let Some(ib) = &binding.include else {
        return Ok(());
    };
    let with_value = include_with(ib, scope);
    let resolved = resolve_include(ctx, scope, &ib.target, &with_value)?;

    let same_tree = match (&state.include, &resolved) {
        (Some(current), Some(next)) => Rc::ptr_eq(&current.tree, next),
        (None, None) => true,
        _ => false,
    };
    if same_tree {
        if let (Some(current), Some(next)) = (state.include.as_mut(), &resolved) {
            let deeper = ctx.deeper()?;
            update_element(&mut current.root, &next.root, &Scope::root(with_value), &deeper)?;
        }
        return Ok(());
    }

    // Target switched to a different template: replace wholesale.
    if let Some(old) = state.include.take() {
        destroy_element(&old.root);
    }
    if let Some(tree) = resolved {
        let deeper = ctx.deeper()?;
        let root = mount_element(&tree.root, &Scope::root(with_value), &deeper)?;
        state.node.append_child(&root.node);
        state.include = Some(IncludeState {
            tree,
            root: Box::new(root),
        });
    }
    Ok(())
}

// ---- teardown -------------------------------------------------------------

/// Removes listeners over the whole subtree, then detaches the root.
pub(crate) fn destroy_element(state: &ElementState) {
    for id in &state.listeners {
        state.node.remove_listener(*id);
    }
    for child in &state.children {
        match child {
            ChildState::Element(inner) => destroy_element(inner),
            ChildState::Conditional(conditional) => {
                if let Some((_, active)) = &conditional.active {
                    destroy_element(active);
                }
            }
            ChildState::Each(each) => {
                for item in &each.items {
                    destroy_element(item);
                }
            }
        }
    }
    if let Some(include) = &state.include {
        destroy_element(&include.root);
    }
    state.node.detach();
}
