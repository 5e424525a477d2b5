//! A small retained document tree for server-side and test use.
//!
//! Nodes are reference-counted handles ([`Node`]); cloning a handle never
//! copies the node. The tree supports elements with ordered attributes,
//! text, and comment nodes, plus synthetic event dispatch with bubbling.
//! [`parse_fragment`] and [`Node::to_html`] convert between markup and
//! trees; parsing is lenient and never fails.

mod event;
mod node;
mod parse;
mod serialize;

pub use event::{Event, ListenerId};
pub use node::Node;
pub use parse::parse_fragment;
pub use serialize::{escape_html, unescape_html};
