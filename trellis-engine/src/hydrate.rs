//! Adopting already-rendered markup instead of rebuilding it.
//!
//! Hydration walks the compiled bindings and the existing nodes in
//! lockstep: structural state (branch winners, loop rows, anchors) is
//! recomputed from the data, listeners are attached, but no write
//! directive is re-applied. The walk is lenient about mismatched
//! markup; it warns and self-heals by mounting what is missing, on the
//! grounds that mismatched data makes the result incorrect anyway.

use std::cell::RefCell;
use std::rc::Rc;

use trellis_dom::Node;

use crate::compile::{ChildBinding, ConditionalBinding, EachBinding, ElementBinding};
use crate::error::Result;
use crate::render::{
    ChildState, ConditionalState, EachState, ElementState, IncludeState, RenderCtx,
    attach_listener, branch_body, each_scope, include_with, list_items, mount_element,
    pick_branch, resolve_include,
};
use crate::scope::Scope;

pub(crate) fn hydrate_element(
    binding: &ElementBinding,
    node: &Node,
    scope: &Scope,
    ctx: &RenderCtx,
) -> Result<ElementState> {
    if node.tag().as_deref() != Some(binding.tag.as_str()) {
        log::warn!(
            "hydration expected <{}> but found {:?}",
            binding.tag,
            node.tag()
        );
    }

    let existing = node.children();
    let mut cursor = 0usize;
    let mut children = Vec::new();
    for child in &binding.children {
        match child {
            ChildBinding::Text(_) => {
                if matches!(existing.get(cursor), Some(n) if n.is_text()) {
                    cursor += 1;
                }
            }
            ChildBinding::Comment(_) => {
                if matches!(existing.get(cursor), Some(n) if n.is_comment()) {
                    cursor += 1;
                }
            }
            ChildBinding::Element(element) => {
                let state = match take_element(&existing, &mut cursor) {
                    Some(found) => hydrate_element(element, &found, scope, ctx)?,
                    None => {
                        log::warn!("hydration missing <{}>, mounting it fresh", element.tag);
                        let mounted = mount_element(element, scope, ctx)?;
                        node.append_child(&mounted.node);
                        mounted
                    }
                };
                children.push(ChildState::Element(state));
            }
            ChildBinding::Conditional(conditional) => {
                let state =
                    hydrate_conditional(conditional, node, &existing, &mut cursor, scope, ctx)?;
                children.push(ChildState::Conditional(state));
            }
            ChildBinding::Each(each) => {
                let state = hydrate_each(each, node, &existing, &mut cursor, scope, ctx)?;
                children.push(ChildState::Each(state));
            }
        }
    }

    let include = hydrate_include(binding, node, &existing, &mut cursor, scope, ctx)?;

    let scope_slot = Rc::new(RefCell::new(scope.clone()));
    let mut listeners = Vec::new();
    for event in &binding.events {
        listeners.push(attach_listener(node, event, &scope_slot));
    }

    Ok(ElementState {
        node: node.clone(),
        scope_slot,
        listeners,
        children,
        include,
    })
}

/// Advances past whitespace text to the next element. Stops without
/// consuming anything else, so a later structural position can still
/// claim its comment anchor.
fn take_element(existing: &[Node], cursor: &mut usize) -> Option<Node> {
    while let Some(node) = existing.get(*cursor) {
        if node.is_element() {
            *cursor += 1;
            return Some(node.clone());
        }
        if node.is_text() && node.text().trim().is_empty() {
            *cursor += 1;
            continue;
        }
        return None;
    }
    None
}

fn take_anchor(existing: &[Node], cursor: &mut usize) -> Option<Node> {
    while let Some(node) = existing.get(*cursor) {
        if node.is_comment() {
            *cursor += 1;
            return Some(node.clone());
        }
        if node.is_text() && node.text().trim().is_empty() {
            *cursor += 1;
            continue;
        }
        return None;
    }
    None
}

fn anchor_or_synthesize(
    existing: &[Node],
    cursor: &mut usize,
    parent: &Node,
    label: &str,
) -> Node {
    match take_anchor(existing, cursor) {
        Some(anchor) => anchor,
        None => {
            log::warn!("hydration missing {label} anchor, synthesizing one");
            let anchor = Node::comment(label);
            parent.append_child(&anchor);
            anchor
        }
    }
}

fn hydrate_conditional(
    binding: &ConditionalBinding,
    parent: &Node,
    existing: &[Node],
    cursor: &mut usize,
    scope: &Scope,
    ctx: &RenderCtx,
) -> Result<ConditionalState> {
    let active = match pick_branch(binding, scope) {
        Some(sel) => match branch_body(binding, sel) {
            Some(body) => {
                let state = match take_element(existing, cursor) {
                    Some(found) => hydrate_element(body, &found, scope, ctx)?,
                    None => {
                        log::warn!("hydration missing conditional branch <{}>", body.tag);
                        let mounted = mount_element(body, scope, ctx)?;
                        parent.append_child(&mounted.node);
                        mounted
                    }
                };
                Some((sel, state))
            }
            None => None,
        },
        None => None,
    };
    let anchor = anchor_or_synthesize(existing, cursor, parent, "if");
    Ok(ConditionalState { anchor, active })
}

fn hydrate_each(
    binding: &EachBinding,
    parent: &Node,
    existing: &[Node],
    cursor: &mut usize,
    scope: &Scope,
    ctx: &RenderCtx,
) -> Result<EachState> {
    let values = list_items(scope, &binding.list_path);
    let mut items = Vec::new();
    for (index, value) in values.iter().enumerate() {
        let item_scope = each_scope(binding, scope, value, index);
        let state = match take_element(existing, cursor) {
            Some(found) => hydrate_element(&binding.body, &found, &item_scope, ctx)?,
            None => {
                log::warn!("hydration missing loop row {index}, mounting it fresh");
                let mounted = mount_element(&binding.body, &item_scope, ctx)?;
                parent.append_child(&mounted.node);
                mounted
            }
        };
        items.push(state);
    }
    let anchor = anchor_or_synthesize(existing, cursor, parent, "each");
    Ok(EachState { anchor, items })
}

fn hydrate_include(
    binding: &ElementBinding,
    host: &Node,
    existing: &[Node],
    cursor: &mut usize,
    scope: &Scope,
    ctx: &RenderCtx,
) -> Result<Option<IncludeState>> {
    let Some(ib) = &binding.include else {
        return Ok(None);
    };
    let with_value = include_with(ib, scope);
    // Include functions do run during hydration; their output decides
    // the expected shape, and their errors are real errors.
    let Some(tree) = resolve_include(ctx, scope, &ib.target, &with_value)? else {
        return Ok(None);
    };
    let deeper = ctx.deeper()?;
    let inner_scope = Scope::root(with_value);
    let root = match take_element(existing, cursor) {
        Some(found) => hydrate_element(&tree.root, &found, &inner_scope, &deeper)?,
        None => {
            log::warn!("hydration missing included <{}>, mounting it fresh", tree.root.tag);
            let mounted = mount_element(&tree.root, &inner_scope, &deeper)?;
            host.append_child(&mounted.node);
            mounted
        }
    };
    Ok(Some(IncludeState {
        tree,
        root: Box::new(root),
    }))
}
