//! Turns a parsed fragment into an immutable binding tree.
//!
//! Directive attributes are recognized and stripped here; everything the
//! renderer and hydrator later do is driven by the bindings this module
//! produces. Compiling never looks at data, so one compiled template can
//! back any number of instances.

use trellis_dom::Node;

use crate::error::{Error, Result};

/// A compiled fragment, rooted at a single element binding.
pub struct CompiledTemplate {
    pub(crate) root: ElementBinding,
}

pub(crate) struct ElementBinding {
    pub(crate) tag: String,
    pub(crate) static_attrs: Vec<(String, String)>,
    pub(crate) writes: Vec<WriteDirective>,
    pub(crate) events: Vec<EventBinding>,
    pub(crate) include: Option<IncludeBinding>,
    pub(crate) children: Vec<ChildBinding>,
}

/// A directive that writes into the element on every render pass.
pub(crate) enum WriteDirective {
    Text(String),
    Html { path: String, trusted: bool },
    SafeHtml(String),
    Attr { name: String, path: String },
    Class { name: String, path: String },
    Style { prop: String, path: String },
    Show(String),
    Hide(String),
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum CallShape {
    /// `handler`: invoked without the event.
    Bare,
    /// `handler($event)`: the dispatched event is passed through.
    WithEvent,
}

pub(crate) struct EventBinding {
    pub(crate) event: String,
    pub(crate) path: String,
    pub(crate) shape: CallShape,
}

pub(crate) struct IncludeBinding {
    pub(crate) target: String,
    pub(crate) with_path: Option<String>,
}

pub(crate) enum ChildBinding {
    Text(String),
    Comment(String),
    Element(ElementBinding),
    Conditional(ConditionalBinding),
    Each(EachBinding),
}

/// One `data-if`/`data-elseif`/`data-else` run over adjacent siblings.
pub(crate) struct ConditionalBinding {
    pub(crate) branches: Vec<(String, ElementBinding)>,
    pub(crate) else_branch: Option<ElementBinding>,
}

pub(crate) struct EachBinding {
    pub(crate) list_path: String,
    pub(crate) item_alias: String,
    pub(crate) index_alias: String,
    pub(crate) body: ElementBinding,
}

#[derive(Clone)]
enum ChainRole {
    If(String),
    ElseIf(String),
    Else,
}

fn chain_name(role: &ChainRole) -> &'static str {
    match role {
        ChainRole::If(_) => "data-if",
        ChainRole::ElseIf(_) => "data-elseif",
        ChainRole::Else => "data-else",
    }
}

struct EachHeader {
    list_path: String,
    item_alias: String,
    index_alias: String,
}

/// Raw scan of one element's attributes, before children are compiled.
struct ScannedElement {
    tag: String,
    statics: Vec<(String, String)>,
    writes: Vec<WriteDirective>,
    events: Vec<EventBinding>,
    include_target: Option<String>,
    with_path: Option<String>,
    chain: Option<ChainRole>,
    each: Option<EachHeader>,
    has_content_write: bool,
}

/// Compiles the output of [`trellis_dom::parse_fragment`].
///
/// The fragment must contain exactly one element once whitespace-only
/// text is discarded, and that root element may not carry a structural
/// directive; there would be no stable node to hand back from mount.
pub(crate) fn compile_fragment(roots: &[Node]) -> Result<CompiledTemplate> {
    let significant: Vec<&Node> = roots
        .iter()
        .filter(|n| n.is_element() || (n.is_text() && !n.text().trim().is_empty()))
        .collect();
    let elements = significant.iter().filter(|n| n.is_element()).count();
    if elements != 1 || significant.len() != 1 {
        return Err(Error::RootCount(elements));
    }
    let root = significant[0];

    let scanned = scan_element(root)?;
    if let Some(role) = &scanned.chain {
        return Err(Error::StructuralRoot(chain_name(role)));
    }
    if scanned.each.is_some() {
        return Err(Error::StructuralRoot("data-each"));
    }
    Ok(CompiledTemplate {
        root: build_element(root, scanned)?,
    })
}

fn mark_structural(slot: &mut Option<&'static str>, name: &'static str) -> Result<()> {
    if let Some(first) = slot {
        return Err(Error::ConflictingDirectives {
            first: *first,
            second: name,
        });
    }
    *slot = Some(name);
    Ok(())
}

fn require_value(name: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::EmptyDirective(name.to_string()));
    }
    Ok(trimmed.to_string())
}

fn scan_element(node: &Node) -> Result<ScannedElement> {
    let mut out = ScannedElement {
        tag: node.tag().unwrap_or_default(),
        statics: Vec::new(),
        writes: Vec::new(),
        events: Vec::new(),
        include_target: None,
        with_path: None,
        chain: None,
        each: None,
        has_content_write: false,
    };
    let mut structural: Option<&'static str> = None;

    for (name, value) in node.attrs() {
        match name.as_str() {
            "data-if" => {
                mark_structural(&mut structural, "data-if")?;
                out.chain = Some(ChainRole::If(require_value(&name, &value)?));
            }
            "data-elseif" => {
                mark_structural(&mut structural, "data-elseif")?;
                out.chain = Some(ChainRole::ElseIf(require_value(&name, &value)?));
            }
            "data-else" => {
                mark_structural(&mut structural, "data-else")?;
                out.chain = Some(ChainRole::Else);
            }
            "data-each" => {
                mark_structural(&mut structural, "data-each")?;
                out.each = Some(parse_each(&require_value(&name, &value)?));
            }
            "data-text" => {
                out.writes
                    .push(WriteDirective::Text(require_value(&name, &value)?));
                out.has_content_write = true;
            }
            "data-html" => {
                let (path, trusted) = unwrap_trusted(&require_value(&name, &value)?);
                out.writes.push(WriteDirective::Html { path, trusted });
                out.has_content_write = true;
            }
            "data-safe-html" => {
                // The wrapper is understood here too, but escaping stays on.
                let (path, _) = unwrap_trusted(&require_value(&name, &value)?);
                out.writes.push(WriteDirective::SafeHtml(path));
                out.has_content_write = true;
            }
            "data-show" => {
                out.writes
                    .push(WriteDirective::Show(require_value(&name, &value)?));
            }
            "data-hide" => {
                out.writes
                    .push(WriteDirective::Hide(require_value(&name, &value)?));
            }
            "data-include" => {
                out.include_target = Some(require_value(&name, &value)?);
            }
            "data-with" => {
                out.with_path = Some(require_value(&name, &value)?);
            }
            _ => scan_prefixed(&mut out, &name, &value)?,
        }
    }
    Ok(out)
}

fn scan_prefixed(out: &mut ScannedElement, name: &str, value: &str) -> Result<()> {
    if let Some(attr) = name.strip_prefix("data-attr-") {
        if attr.is_empty() {
            return Err(Error::BadDirective(name.to_string()));
        }
        out.writes.push(WriteDirective::Attr {
            name: attr.to_string(),
            path: require_value(name, value)?,
        });
    } else if let Some(class) = name.strip_prefix("data-class-") {
        if class.is_empty() {
            return Err(Error::BadDirective(name.to_string()));
        }
        out.writes.push(WriteDirective::Class {
            name: class.to_string(),
            path: require_value(name, value)?,
        });
    } else if let Some(prop) = name.strip_prefix("data-style-") {
        if prop.is_empty() {
            return Err(Error::BadDirective(name.to_string()));
        }
        out.writes.push(WriteDirective::Style {
            prop: prop.to_string(),
            path: require_value(name, value)?,
        });
    } else if let Some(event) = name.strip_prefix("data-on-") {
        if event.is_empty() {
            return Err(Error::BadDirective(name.to_string()));
        }
        let (path, shape) = parse_call(&require_value(name, value)?)?;
        out.events.push(EventBinding {
            event: event.to_string(),
            path,
            shape,
        });
    } else {
        // Unrecognized attributes, including other data-*, pass through.
        out.statics.push((name.to_string(), value.to_string()));
    }
    Ok(())
}

/// `list`, `list as item` or `list as item, index`. Malformed alias
/// clauses fall back to treating the whole value as the list path.
fn parse_each(expr: &str) -> EachHeader {
    if let Some((list, aliases)) = expr.split_once(" as ") {
        let list = list.trim();
        let parts: Vec<&str> = aliases.split(',').map(str::trim).collect();
        let named = match parts.as_slice() {
            [item] if is_ident(item) => Some((item.to_string(), "$index".to_string())),
            [item, index] if is_ident(item) && is_ident(index) => {
                Some((item.to_string(), index.to_string()))
            }
            _ => None,
        };
        if let Some((item_alias, index_alias)) = named {
            if !list.is_empty() {
                return EachHeader {
                    list_path: list.to_string(),
                    item_alias,
                    index_alias,
                };
            }
        }
    }
    EachHeader {
        list_path: expr.to_string(),
        item_alias: "item".to_string(),
        index_alias: "$index".to_string(),
    }
}

/// `unsafe(path)` marks a `data-html` value as trusted in the template
/// itself; the same effect can come from the data side by tagging the
/// value with [`unsafe_html`](crate::unsafe_html). Anything that is not
/// the wrapper around a plain path is kept verbatim as a lookup path.
fn unwrap_trusted(expr: &str) -> (String, bool) {
    if let Some(inner) = expr
        .strip_prefix("unsafe(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let inner = inner.trim();
        if is_path(inner) {
            return (inner.to_string(), true);
        }
    }
    (expr.to_string(), false)
}

/// `path` or `path($event)`, the only two handler shapes. Anything else
/// is rejected at compile time rather than silently doing nothing at
/// dispatch.
fn parse_call(expr: &str) -> Result<(String, CallShape)> {
    let expr = expr.trim();
    if let Some(head) = expr.strip_suffix("($event)") {
        if is_path(head) {
            return Ok((head.to_string(), CallShape::WithEvent));
        }
    } else if is_path(expr) {
        return Ok((expr.to_string(), CallShape::Bare));
    }
    Err(Error::HandlerExpr(expr.to_string()))
}

fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

fn is_path(s: &str) -> bool {
    !s.is_empty() && s.split('.').all(is_ident)
}

fn build_element(node: &Node, scanned: ScannedElement) -> Result<ElementBinding> {
    let include = match scanned.include_target {
        Some(target) => Some(IncludeBinding {
            target,
            with_path: scanned.with_path,
        }),
        None => {
            if scanned.with_path.is_some() {
                log::debug!("data-with without data-include has no effect");
            }
            None
        }
    };
    let mut writes = scanned.writes;
    if include.is_some() {
        // The included fragment owns the content; content writes would
        // fight it on every update.
        writes.retain(|w| {
            !matches!(
                w,
                WriteDirective::Text(_) | WriteDirective::Html { .. } | WriteDirective::SafeHtml(_)
            )
        });
    }
    let owns_content = include.is_some() || scanned.has_content_write;
    let children = if owns_content {
        if !node.children().is_empty() {
            log::debug!("<{}> children are replaced by its content directive", scanned.tag);
        }
        Vec::new()
    } else {
        compile_children(node)?
    };
    Ok(ElementBinding {
        tag: scanned.tag,
        static_attrs: scanned.statics,
        writes,
        events: scanned.events,
        include,
        children,
    })
}

fn flush_chain(chain: &mut Option<ConditionalBinding>, out: &mut Vec<ChildBinding>) {
    if let Some(done) = chain.take() {
        out.push(ChildBinding::Conditional(done));
    }
}

fn compile_children(node: &Node) -> Result<Vec<ChildBinding>> {
    let mut out: Vec<ChildBinding> = Vec::new();
    let mut chain: Option<ConditionalBinding> = None;

    for child in node.children() {
        if child.is_text() {
            let content = child.text();
            if chain.is_some() && content.trim().is_empty() {
                // Whitespace between branch members keeps the chain alive
                // and is dropped from the output.
                continue;
            }
            flush_chain(&mut chain, &mut out);
            out.push(ChildBinding::Text(content));
            continue;
        }
        if child.is_comment() {
            flush_chain(&mut chain, &mut out);
            out.push(ChildBinding::Comment(child.text()));
            continue;
        }

        let mut scanned = scan_element(&child)?;
        let role = scanned.chain.take();
        let each = scanned.each.take();
        match (role, each) {
            (Some(role), Some(_)) => {
                return Err(Error::ConflictingDirectives {
                    first: "data-each",
                    second: chain_name(&role),
                });
            }
            (Some(ChainRole::If(path)), None) => {
                flush_chain(&mut chain, &mut out);
                chain = Some(ConditionalBinding {
                    branches: vec![(path, build_element(&child, scanned)?)],
                    else_branch: None,
                });
            }
            (Some(ChainRole::ElseIf(path)), None) => match chain.as_mut() {
                Some(open) if open.else_branch.is_none() => {
                    open.branches.push((path, build_element(&child, scanned)?));
                }
                _ => return Err(Error::DanglingBranch("data-elseif")),
            },
            (Some(ChainRole::Else), None) => {
                let open = matches!(chain.as_ref(), Some(c) if c.else_branch.is_none());
                if !open {
                    return Err(Error::DanglingBranch("data-else"));
                }
                let body = build_element(&child, scanned)?;
                if let Some(current) = chain.as_mut() {
                    current.else_branch = Some(body);
                }
                // An else terminates its chain.
                flush_chain(&mut chain, &mut out);
            }
            (None, Some(header)) => {
                flush_chain(&mut chain, &mut out);
                out.push(ChildBinding::Each(EachBinding {
                    list_path: header.list_path,
                    item_alias: header.item_alias,
                    index_alias: header.index_alias,
                    body: build_element(&child, scanned)?,
                }));
            }
            (None, None) => {
                flush_chain(&mut chain, &mut out);
                out.push(ChildBinding::Element(build_element(&child, scanned)?));
            }
        }
    }
    flush_chain(&mut chain, &mut out);
    Ok(out)
}
