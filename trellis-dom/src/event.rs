use std::cell::Cell;
use std::rc::Rc;

use crate::node::Node;

/// Handle returned by [`Node::add_listener`](crate::Node::add_listener).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ListenerId(pub(crate) u64);

pub(crate) struct Listener {
    pub(crate) id: ListenerId,
    pub(crate) event: String,
    pub(crate) callback: Rc<dyn Fn(&Event)>,
}

/// An event flowing through the tree during [`Node::dispatch`](crate::Node::dispatch).
pub struct Event {
    event_type: String,
    target: Option<Node>,
    stopped: Cell<bool>,
}

impl Event {
    pub(crate) fn for_target(event_type: &str, target: Node) -> Event {
        Event {
            event_type: event_type.to_string(),
            target: Some(target),
            stopped: Cell::new(false),
        }
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// The node the event was dispatched at.
    pub fn target(&self) -> Option<Node> {
        self.target.clone()
    }

    /// Prevents the event from bubbling past the current node.
    pub fn stop_propagation(&self) {
        self.stopped.set(true);
    }

    pub fn propagation_stopped(&self) -> bool {
        self.stopped.get()
    }
}
