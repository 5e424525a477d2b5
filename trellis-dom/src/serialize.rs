use crate::node::{Node, NodeKind};

/// Elements serialized without a closing tag.
pub(crate) const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

pub(crate) fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// Replaces markup-significant characters with entity references.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Resolves the named and numeric entity references produced by
/// [`escape_html`], leaving unrecognized sequences untouched.
pub fn unescape_html(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'&' {
            // Advance one whole character, not one byte.
            let rest = &input[i..];
            if let Some(ch) = rest.chars().next() {
                out.push(ch);
                i += ch.len_utf8();
            } else {
                break;
            }
            continue;
        }
        let close = input[i + 1..].find(';').map(|at| i + 1 + at);
        let Some(close) = close else {
            out.push('&');
            i += 1;
            continue;
        };
        let entity = &input[i + 1..close];
        let resolved = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix('#')
                .and_then(|digits| {
                    if let Some(hex) = digits.strip_prefix('x').or_else(|| digits.strip_prefix('X'))
                    {
                        u32::from_str_radix(hex, 16).ok()
                    } else {
                        digits.parse::<u32>().ok()
                    }
                })
                .and_then(char::from_u32),
        };
        match resolved {
            Some(ch) => {
                out.push(ch);
                i = close + 1;
            }
            None => {
                out.push('&');
                i += 1;
            }
        }
    }
    out
}

pub(crate) fn write_node(node: &Node, out: &mut String) {
    // Release the node borrow before recursing into children.
    let open = {
        let data = node.data();
        match &data.kind {
            NodeKind::Text(content) => {
                out.push_str(&escape_html(content));
                None
            }
            NodeKind::Comment(content) => {
                out.push_str("<!--");
                out.push_str(content);
                out.push_str("-->");
                None
            }
            NodeKind::Element { tag, attrs } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    out.push(' ');
                    out.push_str(name);
                    if !value.is_empty() {
                        out.push_str("=\"");
                        out.push_str(&escape_html(value));
                        out.push('"');
                    }
                }
                out.push('>');
                if is_void(tag) {
                    None
                } else {
                    Some((tag.clone(), data.children.clone()))
                }
            }
        }
    };
    if let Some((tag, children)) = open {
        for child in &children {
            write_node(child, out);
        }
        out.push_str("</");
        out.push_str(&tag);
        out.push('>');
    }
}
