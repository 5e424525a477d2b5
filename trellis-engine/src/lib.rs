//! A declarative directive engine over markup fragments.
//!
//! Templates are plain markup whose behavior lives in `data-*`
//! attributes: `data-if`/`data-elseif`/`data-else` chains, `data-each`
//! loops, `data-text`/`data-html` content writes, `data-attr-*`,
//! `data-class-*` and `data-style-*` writes, `data-show`/`data-hide`,
//! `data-on-*` event bindings and `data-include`/`data-with`
//! composition. An [`Engine`] compiles fragments once into immutable
//! binding trees; mounting binds a tree to data and yields an
//! [`Instance`] that can be updated in place or destroyed. Text output
//! is escaped by default; only values wrapped by [`unsafe_html`] are
//! inserted as markup.

mod compile;
mod error;
mod hydrate;
mod instance;
mod registry;
mod render;
mod scope;
mod value;

pub use error::{Error, Result};
pub use instance::Instance;
pub use registry::{Engine, Template, TemplateRef};
pub use scope::Scope;
pub use value::{Handler, IncludeFn, Value, unsafe_html};

pub use trellis_dom as dom;
pub use trellis_dom::escape_html;
