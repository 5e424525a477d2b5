use crate::node::Node;
use crate::serialize::{is_void, unescape_html};

/// Parses a markup fragment into a list of detached nodes.
///
/// The parser is deliberately forgiving: unmatched closing tags are
/// dropped, unterminated elements are closed at end of input, and stray
/// `<` characters fall back to text. It never fails; malformed input
/// produces the best tree it can.
pub fn parse_fragment(input: &str) -> Vec<Node> {
    let mut parser = Parser {
        input,
        bytes: input.as_bytes(),
        pos: 0,
    };
    parser.run()
}

struct Parser<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

fn attach(stack: &[Node], roots: &mut Vec<Node>, node: &Node) {
    match stack.last() {
        Some(parent) => parent.append_child(node),
        None => roots.push(node.clone()),
    }
}

impl Parser<'_> {
    fn run(&mut self) -> Vec<Node> {
        let mut roots = Vec::new();
        let mut stack: Vec<Node> = Vec::new();
        while self.pos < self.bytes.len() {
            if self.bytes[self.pos] == b'<' {
                if self.rest().starts_with("<!--") {
                    self.parse_comment(&stack, &mut roots);
                } else if self.rest().starts_with("</") {
                    self.parse_close(&mut stack);
                } else if self.rest().starts_with("<!") {
                    self.skip_declaration();
                } else {
                    self.parse_open(&mut stack, &mut roots);
                }
            } else {
                self.parse_text(&stack, &mut roots);
            }
        }
        // Anything left open is implicitly closed; children are already
        // attached, so the stack can simply be dropped.
        roots
    }

    fn rest(&self) -> &str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while let Some(b) = self.peek() {
            if b.is_ascii_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn read_ident(&mut self) -> String {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        self.input[start..self.pos].to_string()
    }

    fn read_attr_name(&mut self) -> String {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':' | b'@' | b'.' | b'$') {
                self.pos += 1;
            } else {
                break;
            }
        }
        self.input[start..self.pos].to_string()
    }

    fn read_attr_value(&mut self) -> String {
        let quote = match self.peek() {
            Some(q @ (b'"' | b'\'')) => q,
            _ => {
                // Unquoted value, read up to whitespace or tag end.
                let start = self.pos;
                while let Some(b) = self.peek() {
                    if b.is_ascii_whitespace() || b == b'>' || b == b'/' {
                        break;
                    }
                    self.pos += 1;
                }
                return self.input[start..self.pos].to_string();
            }
        };
        self.pos += 1;
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b == quote {
                break;
            }
            self.pos += 1;
        }
        let value = self.input[start..self.pos].to_string();
        if self.peek() == Some(quote) {
            self.pos += 1;
        }
        value
    }

    fn parse_text(&mut self, stack: &[Node], roots: &mut Vec<Node>) {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b == b'<' {
                break;
            }
            self.pos += 1;
        }
        let raw = &self.input[start..self.pos];
        attach(stack, roots, &Node::new_text(&unescape_html(raw)));
    }

    fn parse_comment(&mut self, stack: &[Node], roots: &mut Vec<Node>) {
        self.pos += 4;
        let rest = self.rest();
        let (content, consumed) = match rest.find("-->") {
            Some(at) => (&rest[..at], at + 3),
            None => {
                log::debug!("unterminated comment runs to end of input");
                (rest, rest.len())
            }
        };
        let node = Node::comment(content);
        self.pos += consumed;
        attach(stack, roots, &node);
    }

    fn skip_declaration(&mut self) {
        while let Some(b) = self.peek() {
            self.pos += 1;
            if b == b'>' {
                break;
            }
        }
    }

    fn parse_close(&mut self, stack: &mut Vec<Node>) {
        self.pos += 2;
        let tag = self.read_ident();
        while let Some(b) = self.peek() {
            self.pos += 1;
            if b == b'>' {
                break;
            }
        }
        if tag.is_empty() {
            return;
        }
        // Close the nearest matching open element, implicitly closing
        // anything opened after it. Unmatched closers are dropped.
        match stack
            .iter()
            .rposition(|open| open.tag().as_deref() == Some(tag.as_str()))
        {
            Some(found) => stack.truncate(found),
            None => log::debug!("ignoring unmatched closing tag </{tag}>"),
        }
    }

    fn parse_open(&mut self, stack: &mut Vec<Node>, roots: &mut Vec<Node>) {
        self.pos += 1;
        let tag = self.read_ident();
        if tag.is_empty() {
            // A bare '<' in text position.
            attach(stack, roots, &Node::new_text("<"));
            return;
        }
        let node = Node::element(&tag);
        let mut self_closing = false;
        loop {
            self.skip_ws();
            match self.peek() {
                None => break,
                Some(b'>') => {
                    self.pos += 1;
                    break;
                }
                Some(b'/') => {
                    self.pos += 1;
                    self_closing = true;
                }
                Some(_) => {
                    let name = self.read_attr_name();
                    if name.is_empty() {
                        // Skip the whole character so the cursor stays on a
                        // UTF-8 boundary.
                        self.pos += self.rest().chars().next().map_or(1, char::len_utf8);
                        continue;
                    }
                    self.skip_ws();
                    let value = if self.peek() == Some(b'=') {
                        self.pos += 1;
                        self.skip_ws();
                        self.read_attr_value()
                    } else {
                        String::new()
                    };
                    node.set_attr(&name, &unescape_html(&value));
                }
            }
        }
        attach(stack, roots, &node);
        if !self_closing && !is_void(&tag) {
            stack.push(node);
        }
    }
}
