use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::event::{Event, Listener, ListenerId};
use crate::parse::parse_fragment;
use crate::serialize::write_node;

/// The kind of a tree node.
#[derive(Clone)]
pub(crate) enum NodeKind {
    Element {
        tag: String,
        /// Attributes in insertion order, so serialization is deterministic.
        attrs: Vec<(String, String)>,
    },
    Text(String),
    Comment(String),
}

pub(crate) struct NodeData {
    pub(crate) kind: NodeKind,
    parent: Option<Weak<RefCell<NodeData>>>,
    pub(crate) children: Vec<Node>,
    pub(crate) listeners: Vec<Listener>,
    next_listener: u64,
}

/// A shared handle to a node in the document tree.
///
/// Handles are cheap to clone; all clones refer to the same node.
/// Mutation goes through interior mutability, so the tree is
/// single-threaded by construction.
#[derive(Clone)]
pub struct Node {
    inner: Rc<RefCell<NodeData>>,
}

impl Node {
    fn new(kind: NodeKind) -> Node {
        Node {
            inner: Rc::new(RefCell::new(NodeData {
                kind,
                parent: None,
                children: Vec::new(),
                listeners: Vec::new(),
                next_listener: 0,
            })),
        }
    }

    /// Creates a detached element node.
    pub fn element(tag: &str) -> Node {
        Node::new(NodeKind::Element {
            tag: tag.to_string(),
            attrs: Vec::new(),
        })
    }

    /// Creates a detached text node.
    pub fn new_text(content: &str) -> Node {
        Node::new(NodeKind::Text(content.to_string()))
    }

    /// Creates a detached comment node.
    pub fn comment(content: &str) -> Node {
        Node::new(NodeKind::Comment(content.to_string()))
    }

    pub fn is_element(&self) -> bool {
        matches!(self.inner.borrow().kind, NodeKind::Element { .. })
    }

    pub fn is_text(&self) -> bool {
        matches!(self.inner.borrow().kind, NodeKind::Text(_))
    }

    pub fn is_comment(&self) -> bool {
        matches!(self.inner.borrow().kind, NodeKind::Comment(_))
    }

    /// Tag name for elements, `None` for text and comment nodes.
    pub fn tag(&self) -> Option<String> {
        match &self.inner.borrow().kind {
            NodeKind::Element { tag, .. } => Some(tag.clone()),
            _ => None,
        }
    }

    /// True when both handles point at the same node.
    pub fn ptr_eq(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn data(&self) -> std::cell::Ref<'_, NodeData> {
        self.inner.borrow()
    }

    /// A stable identity for this node, valid while the node is alive.
    pub fn ptr_id(&self) -> usize {
        Rc::as_ptr(&self.inner) as usize
    }

    // ---- tree structure ----------------------------------------------------

    pub fn parent(&self) -> Option<Node> {
        let weak = self.inner.borrow().parent.clone()?;
        weak.upgrade().map(|inner| Node { inner })
    }

    /// Snapshot of the current children.
    pub fn children(&self) -> Vec<Node> {
        self.inner.borrow().children.clone()
    }

    pub fn first_child(&self) -> Option<Node> {
        self.inner.borrow().children.first().cloned()
    }

    fn is_ancestor_of(&self, other: &Node) -> bool {
        let mut cursor = other.parent();
        while let Some(node) = cursor {
            if node.ptr_eq(self) {
                return true;
            }
            cursor = node.parent();
        }
        false
    }

    /// Appends `child` as the last child, detaching it from any previous
    /// parent first. Ignored on non-element nodes.
    pub fn append_child(&self, child: &Node) {
        self.insert_before(child, None);
    }

    /// Inserts `child` immediately before `reference`. With no reference,
    /// or when the reference is not a child of this node, appends instead.
    pub fn insert_before(&self, child: &Node, reference: Option<&Node>) {
        if !self.is_element() {
            log::debug!("insert into non-element node ignored");
            return;
        }
        if child.ptr_eq(self) || child.is_ancestor_of(self) {
            log::warn!("refusing to insert a node into its own subtree");
            return;
        }
        child.detach();
        let index = match reference {
            Some(anchor) => {
                let found = self.child_index(anchor);
                if found.is_none() {
                    log::debug!("insert_before reference is not a child, appending");
                }
                found
            }
            None => None,
        };
        {
            let mut data = self.inner.borrow_mut();
            match index {
                Some(at) => data.children.insert(at, child.clone()),
                None => data.children.push(child.clone()),
            }
        }
        child.inner.borrow_mut().parent = Some(Rc::downgrade(&self.inner));
    }

    fn child_index(&self, target: &Node) -> Option<usize> {
        self.inner
            .borrow()
            .children
            .iter()
            .position(|c| c.ptr_eq(target))
    }

    /// Removes this node from its parent. A no-op on detached nodes.
    pub fn detach(&self) {
        if let Some(parent) = self.parent() {
            parent
                .inner
                .borrow_mut()
                .children
                .retain(|c| !c.ptr_eq(self));
        }
        self.inner.borrow_mut().parent = None;
    }

    /// Detaches every child.
    pub fn clear_children(&self) {
        let children = std::mem::take(&mut self.inner.borrow_mut().children);
        for child in children {
            child.inner.borrow_mut().parent = None;
        }
    }

    /// Structural copy of this subtree. Listeners are not cloned and the
    /// copy starts out detached.
    pub fn deep_clone(&self) -> Node {
        let (copy, children) = {
            let data = self.inner.borrow();
            let copy = match &data.kind {
                NodeKind::Element { tag, attrs } => {
                    let node = Node::element(tag);
                    for (name, value) in attrs {
                        node.set_attr(name, value);
                    }
                    node
                }
                NodeKind::Text(content) => Node::new_text(content),
                NodeKind::Comment(content) => Node::comment(content),
            };
            (copy, data.children.clone())
        };
        for child in children {
            copy.append_child(&child.deep_clone());
        }
        copy
    }

    // ---- text --------------------------------------------------------------

    /// Text content: the own content for text and comment nodes, the
    /// concatenated non-comment descendant text for elements.
    pub fn text(&self) -> String {
        let (own, children) = {
            let data = self.inner.borrow();
            match &data.kind {
                NodeKind::Text(content) | NodeKind::Comment(content) => {
                    (Some(content.clone()), Vec::new())
                }
                NodeKind::Element { .. } => (None, data.children.clone()),
            }
        };
        match own {
            Some(content) => content,
            None => children
                .iter()
                .filter(|c| !c.is_comment())
                .map(|c| c.text())
                .collect(),
        }
    }

    /// Replaces an element's children with a single text node, or rewrites
    /// the content of a text or comment node.
    pub fn set_text(&self, content: &str) {
        if self.is_element() {
            self.clear_children();
            if !content.is_empty() {
                self.append_child(&Node::new_text(content));
            }
            return;
        }
        match &mut self.inner.borrow_mut().kind {
            NodeKind::Text(slot) | NodeKind::Comment(slot) => *slot = content.to_string(),
            NodeKind::Element { .. } => {}
        }
    }

    // ---- attributes --------------------------------------------------------

    pub fn attr(&self, name: &str) -> Option<String> {
        match &self.inner.borrow().kind {
            NodeKind::Element { attrs, .. } => attrs
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.clone()),
            _ => None,
        }
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    /// Sets or replaces an attribute. Ignored on non-element nodes.
    pub fn set_attr(&self, name: &str, value: &str) {
        if let NodeKind::Element { attrs, .. } = &mut self.inner.borrow_mut().kind {
            if let Some(slot) = attrs.iter_mut().find(|(key, _)| key == name) {
                slot.1 = value.to_string();
            } else {
                attrs.push((name.to_string(), value.to_string()));
            }
        }
    }

    pub fn remove_attr(&self, name: &str) {
        if let NodeKind::Element { attrs, .. } = &mut self.inner.borrow_mut().kind {
            attrs.retain(|(key, _)| key != name);
        }
    }

    /// Attributes in document order.
    pub fn attrs(&self) -> Vec<(String, String)> {
        match &self.inner.borrow().kind {
            NodeKind::Element { attrs, .. } => attrs.clone(),
            _ => Vec::new(),
        }
    }

    // ---- class list --------------------------------------------------------

    pub fn classes(&self) -> Vec<String> {
        self.attr("class")
            .map(|value| value.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, name: &str) -> bool {
        self.classes().iter().any(|c| c == name)
    }

    pub fn add_class(&self, name: &str) {
        let mut classes = self.classes();
        if !classes.iter().any(|c| c == name) {
            classes.push(name.to_string());
            self.set_attr("class", &classes.join(" "));
        }
    }

    pub fn remove_class(&self, name: &str) {
        let classes = self.classes();
        let kept: Vec<String> = classes.into_iter().filter(|c| c != name).collect();
        if kept.is_empty() {
            self.remove_attr("class");
        } else {
            self.set_attr("class", &kept.join(" "));
        }
    }

    // ---- inline style ------------------------------------------------------

    fn style_entries(&self) -> Vec<(String, String)> {
        let Some(style) = self.attr("style") else {
            return Vec::new();
        };
        style
            .split(';')
            .filter_map(|decl| {
                let (prop, value) = decl.split_once(':')?;
                let prop = prop.trim();
                if prop.is_empty() {
                    return None;
                }
                Some((prop.to_string(), value.trim().to_string()))
            })
            .collect()
    }

    fn write_style(&self, entries: &[(String, String)]) {
        if entries.is_empty() {
            self.remove_attr("style");
            return;
        }
        let rendered: Vec<String> = entries
            .iter()
            .map(|(prop, value)| format!("{prop}: {value}"))
            .collect();
        self.set_attr("style", &rendered.join("; "));
    }

    pub fn style(&self, prop: &str) -> Option<String> {
        self.style_entries()
            .into_iter()
            .find(|(key, _)| key == prop)
            .map(|(_, value)| value)
    }

    pub fn set_style(&self, prop: &str, value: &str) {
        let mut entries = self.style_entries();
        if let Some(slot) = entries.iter_mut().find(|(key, _)| key == prop) {
            slot.1 = value.to_string();
        } else {
            entries.push((prop.to_string(), value.to_string()));
        }
        self.write_style(&entries);
    }

    pub fn remove_style(&self, prop: &str) {
        let entries: Vec<(String, String)> = self
            .style_entries()
            .into_iter()
            .filter(|(key, _)| key != prop)
            .collect();
        self.write_style(&entries);
    }

    // ---- markup ------------------------------------------------------------

    /// Serializes this subtree to markup.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        write_node(self, &mut out);
        out
    }

    /// Serializes only the children.
    pub fn inner_html(&self) -> String {
        let mut out = String::new();
        for child in self.children() {
            write_node(&child, &mut out);
        }
        out
    }

    /// Parses `markup` and replaces this element's children with the
    /// result. Ignored on non-element nodes.
    pub fn set_inner_html(&self, markup: &str) {
        if !self.is_element() {
            return;
        }
        self.clear_children();
        for node in parse_fragment(markup) {
            self.append_child(&node);
        }
    }

    // ---- events ------------------------------------------------------------

    /// Registers a listener for `event` on this node and returns a handle
    /// that can later be passed to [`Node::remove_listener`].
    pub fn add_listener(&self, event: &str, callback: impl Fn(&Event) + 'static) -> ListenerId {
        let mut data = self.inner.borrow_mut();
        data.next_listener += 1;
        let id = ListenerId(data.next_listener);
        data.listeners.push(Listener {
            id,
            event: event.to_string(),
            callback: Rc::new(callback),
        });
        id
    }

    pub fn remove_listener(&self, id: ListenerId) {
        self.inner.borrow_mut().listeners.retain(|l| l.id != id);
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    /// Dispatches an event of type `event_type` at this node. Listeners run
    /// on the target first, then on each ancestor up to the root, stopping
    /// early when a listener calls [`Event::stop_propagation`]. Returns how
    /// many listeners ran.
    pub fn dispatch(&self, event_type: &str) -> usize {
        let event = Event::for_target(event_type, self.clone());
        let mut invoked = 0;
        let mut cursor = Some(self.clone());
        while let Some(node) = cursor {
            // Snapshot before invoking so listeners may mutate the tree or
            // the listener list without tripping a borrow.
            let callbacks: Vec<Rc<dyn Fn(&Event)>> = node
                .inner
                .borrow()
                .listeners
                .iter()
                .filter(|l| l.event == event_type)
                .map(|l| l.callback.clone())
                .collect();
            for callback in callbacks {
                callback(&event);
                invoked += 1;
            }
            if event.propagation_stopped() {
                break;
            }
            cursor = node.parent();
        }
        invoked
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner.borrow().kind {
            NodeKind::Element { tag, .. } => write!(f, "<{tag}>"),
            NodeKind::Text(content) => write!(f, "#text {content:?}"),
            NodeKind::Comment(content) => write!(f, "<!--{content}-->"),
        }
    }
}
