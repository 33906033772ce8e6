//! Lenient HTML fragment parsing.
//!
//! The parser never fails: malformed markup is recovered into some tree the
//! way a browser would roughly recover it (implied end tags, unmatched end
//! tags dropped, everything still open at the end closed).

use std::fmt::Write as _;

/// A parsed HTML fragment: the top-level nodes in source order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Fragment {
    pub nodes: Vec<Node>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Element {
    /// Lowercased tag name.
    pub name: String,
    /// Attributes in source order with lowercased names.
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    fn new(name: String, attrs: Vec<(String, String)>) -> Self {
        Self {
            name,
            attrs,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

/// Start tags that close an open `<p>`.
const CLOSES_PARAGRAPH: &[&str] = &[
    "address",
    "article",
    "aside",
    "blockquote",
    "div",
    "dl",
    "fieldset",
    "footer",
    "form",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "hr",
    "main",
    "nav",
    "ol",
    "p",
    "pre",
    "section",
    "table",
    "ul",
];

/// Block-level elements, used by [`plain_text`] to place line breaks.
const BLOCK_ELEMENTS: &[&str] = &[
    "address",
    "article",
    "aside",
    "blockquote",
    "dd",
    "div",
    "dl",
    "dt",
    "fieldset",
    "figure",
    "footer",
    "form",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "li",
    "main",
    "nav",
    "ol",
    "p",
    "pre",
    "section",
    "table",
    "tr",
    "ul",
];

#[must_use]
pub fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

#[must_use]
pub fn is_block(name: &str) -> bool {
    BLOCK_ELEMENTS.contains(&name)
}

#[derive(Debug, PartialEq, Eq)]
enum Token {
    Text(String),
    Comment(String),
    Start {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    End(String),
}

struct Tokenizer<'a> {
    src: &'a str,
    pos: usize,
    /// Set after a raw-text start tag; the next token is its verbatim body.
    raw_text_end: Option<String>,
}

impl<'a> Tokenizer<'a> {
    const fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            raw_text_end: None,
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn raw_text(&mut self, name: &str) -> Option<Token> {
        let rest = self.rest();
        let closing = format!("</{name}");
        let end = find_ascii_case_insensitive(rest, &closing).unwrap_or(rest.len());
        self.pos += end;
        (end > 0).then(|| Token::Text(rest[..end].to_owned()))
    }

    fn text(&mut self) -> Token {
        let rest = self.rest();
        // A '<' that doesn't open a tag is literal text; keep scanning past it.
        let mut search = usize::from(rest.starts_with('<'));
        let end = loop {
            match memchr::memchr(b'<', &rest.as_bytes()[search..]) {
                Some(idx) => {
                    let at = search + idx;
                    if opens_markup(&rest[at..]) {
                        break at;
                    }
                    search = at + 1;
                }
                None => break rest.len(),
            }
        };
        self.pos += end;
        Token::Text(decode_entities(&rest[..end]))
    }

    fn comment(&mut self) -> Token {
        let body = &self.rest()[4..];
        let (text, consumed) = body
            .find("-->")
            .map_or((body, body.len()), |end| (&body[..end], end + 3));
        self.pos += 4 + consumed;
        Token::Comment(text.to_owned())
    }

    fn bogus_comment(&mut self) -> Token {
        let rest = self.rest();
        let end = memchr::memchr(b'>', rest.as_bytes()).map_or(rest.len(), |idx| idx + 1);
        self.pos += end;
        let inner = rest[2..end].trim_end_matches('>');
        Token::Comment(inner.to_owned())
    }

    fn end_tag(&mut self) -> Token {
        let rest = self.rest();
        let end = memchr::memchr(b'>', rest.as_bytes()).map_or(rest.len(), |idx| idx + 1);
        self.pos += end;
        let inner = &rest[2..end];
        let name: String = inner
            .chars()
            .take_while(|c| !c.is_whitespace() && *c != '>' && *c != '/')
            .collect();
        Token::End(name.to_ascii_lowercase())
    }

    fn start_tag(&mut self) -> Token {
        let bytes = self.src.as_bytes();
        let mut i = self.pos + 1;
        let name_start = i;
        while i < bytes.len() && !is_tag_name_terminator(bytes[i]) {
            i += 1;
        }
        let name = self.src[name_start..i].to_ascii_lowercase();

        let mut attrs = Vec::new();
        let mut self_closing = false;
        loop {
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            match bytes.get(i) {
                None => break,
                Some(b'>') => {
                    i += 1;
                    break;
                }
                Some(b'/') => {
                    i += 1;
                    if bytes.get(i) == Some(&b'>') {
                        self_closing = true;
                        i += 1;
                        break;
                    }
                    continue;
                }
                Some(_) => {}
            }

            let key_start = i;
            while i < bytes.len()
                && !bytes[i].is_ascii_whitespace()
                && !matches!(bytes[i], b'=' | b'>' | b'/')
            {
                i += 1;
            }
            let key = self.src[key_start..i].to_ascii_lowercase();
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }

            let mut value = String::new();
            if bytes.get(i) == Some(&b'=') {
                i += 1;
                while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
                match bytes.get(i) {
                    Some(&quote @ (b'"' | b'\'')) => {
                        let value_start = i + 1;
                        let len = memchr::memchr(quote, &bytes[value_start..])
                            .unwrap_or(bytes.len() - value_start);
                        value = decode_entities(&self.src[value_start..value_start + len]);
                        i = (value_start + len + 1).min(bytes.len());
                    }
                    _ => {
                        let value_start = i;
                        while i < bytes.len()
                            && !bytes[i].is_ascii_whitespace()
                            && bytes[i] != b'>'
                        {
                            i += 1;
                        }
                        value = decode_entities(&self.src[value_start..i]);
                    }
                }
            }

            if !key.is_empty() && !attrs.iter().any(|(k, _)| *k == key) {
                attrs.push((key, value));
            }
        }

        self.pos = i;
        if !self_closing && RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
            self.raw_text_end = Some(name.clone());
        }
        Token::Start {
            name,
            attrs,
            self_closing,
        }
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if let Some(name) = self.raw_text_end.take()
            && let Some(token) = self.raw_text(&name)
        {
            return Some(token);
        }

        let rest = self.rest();
        if rest.is_empty() {
            return None;
        }

        let token = if rest.starts_with("<!--") {
            self.comment()
        } else if rest.starts_with("</") && opens_markup(rest) {
            self.end_tag()
        } else if rest.starts_with("<!") || rest.starts_with("<?") {
            self.bogus_comment()
        } else if opens_markup(rest) {
            self.start_tag()
        } else {
            self.text()
        };
        Some(token)
    }
}

/// Whether `s` starts with a `<` that opens a tag, comment or declaration.
fn opens_markup(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.first() != Some(&b'<') {
        return false;
    }
    match bytes.get(1) {
        Some(b) if b.is_ascii_alphabetic() => true,
        Some(b'!' | b'?') => true,
        Some(b'/') => bytes.get(2).is_some_and(u8::is_ascii_alphabetic),
        _ => false,
    }
}

const fn is_tag_name_terminator(b: u8) -> bool {
    b.is_ascii_whitespace() || b == b'>' || b == b'/'
}

fn find_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let hay = haystack.as_bytes();
    let needle = needle.as_bytes();
    if needle.is_empty() || hay.len() < needle.len() {
        return None;
    }
    (0..=hay.len() - needle.len())
        .find(|&start| hay[start..start + needle.len()].eq_ignore_ascii_case(needle))
}

/// Decode the character references the editor cares about.
///
/// Unknown or malformed references are kept as literal text.
#[must_use]
pub fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_owned();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let decoded = after.find(';').filter(|end| *end <= 10).and_then(|end| {
            let name = &after[..end];
            decode_reference(name).map(|ch| (ch, end + 1))
        });
        match decoded {
            Some((ch, consumed)) => {
                out.push(ch);
                rest = &after[consumed..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_reference(name: &str) -> Option<char> {
    if let Some(num) = name.strip_prefix('#') {
        let code = if let Some(hex) = num.strip_prefix(['x', 'X']) {
            u32::from_str_radix(hex, 16).ok()?
        } else {
            num.parse::<u32>().ok()?
        };
        return char::from_u32(code);
    }
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => None,
    }
}

/// Escape text content for serialization.
#[must_use]
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escape a double-quoted attribute value.
#[must_use]
pub fn escape_attr(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}

struct TreeBuilder {
    root: Vec<Node>,
    open: Vec<Element>,
}

impl TreeBuilder {
    const fn new() -> Self {
        Self {
            root: Vec::new(),
            open: Vec::new(),
        }
    }

    fn append(&mut self, node: Node) {
        let children = match self.open.last_mut() {
            Some(parent) => &mut parent.children,
            None => &mut self.root,
        };
        if let Node::Text(text) = &node
            && let Some(Node::Text(prev)) = children.last_mut()
        {
            prev.push_str(text);
            return;
        }
        children.push(node);
    }

    fn pop(&mut self) {
        if let Some(element) = self.open.pop() {
            self.append(Node::Element(element));
        }
    }

    fn is_open(&self, name: &str) -> bool {
        self.open.iter().any(|el| el.name == name)
    }

    fn close_until(&mut self, name: &str) {
        while let Some(top) = self.open.last() {
            let done = top.name == name;
            self.pop();
            if done {
                break;
            }
        }
    }

    /// Close an open `li` that belongs to the innermost list.
    fn close_list_item(&mut self) {
        for el in self.open.iter().rev() {
            match el.name.as_str() {
                "li" => {
                    self.close_until("li");
                    return;
                }
                "ul" | "ol" => return,
                _ => {}
            }
        }
    }

    fn start(&mut self, name: String, attrs: Vec<(String, String)>, self_closing: bool) {
        if CLOSES_PARAGRAPH.contains(&name.as_str())
            && self.open.last().is_some_and(|el| el.name == "p")
        {
            self.pop();
        }
        if name == "li" {
            self.close_list_item();
        }

        let element = Element::new(name, attrs);
        if self_closing || is_void(&element.name) {
            self.append(Node::Element(element));
        } else {
            self.open.push(element);
        }
    }

    fn end(&mut self, name: &str) {
        if self.is_open(name) {
            self.close_until(name);
            return;
        }
        match name {
            "p" => self.append(Node::Element(Element::new("p".to_owned(), Vec::new()))),
            "br" => self.append(Node::Element(Element::new("br".to_owned(), Vec::new()))),
            _ => {}
        }
    }

    fn finish(mut self) -> Fragment {
        while !self.open.is_empty() {
            self.pop();
        }
        Fragment { nodes: self.root }
    }
}

/// Parse an HTML fragment.
#[must_use]
pub fn parse(source: &str) -> Fragment {
    let mut builder = TreeBuilder::new();
    for token in Tokenizer::new(source) {
        match token {
            Token::Text(text) => {
                if !text.is_empty() {
                    builder.append(Node::Text(text));
                }
            }
            Token::Comment(text) => builder.append(Node::Comment(text)),
            Token::Start {
                name,
                attrs,
                self_closing,
            } => builder.start(name, attrs, self_closing),
            Token::End(name) => builder.end(&name),
        }
    }
    builder.finish()
}

/// Render a fragment to a simple plain-text representation.
///
/// Used for CLI output and to compare what the preview shows.
#[must_use]
pub fn plain_text(fragment: &Fragment) -> String {
    fn push_newline(out: &mut String) {
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
    }

    fn walk(nodes: &[Node], out: &mut String, pre: bool) {
        for node in nodes {
            match node {
                Node::Text(text) => {
                    if pre {
                        out.push_str(text);
                    } else {
                        push_collapsed(out, text);
                    }
                }
                Node::Comment(_) => {}
                Node::Element(el) => match el.name.as_str() {
                    "script" | "style" | "head" | "title" => {}
                    "br" => out.push('\n'),
                    "hr" => {
                        push_newline(out);
                        out.push_str("---\n");
                    }
                    "td" | "th" => {
                        walk(&el.children, out, pre);
                        out.push('\t');
                    }
                    name if is_block(name) => {
                        push_newline(out);
                        walk(&el.children, out, pre || name == "pre");
                        push_newline(out);
                    }
                    _ => walk(&el.children, out, pre),
                },
            }
        }
    }

    let mut out = String::new();
    walk(&fragment.nodes, &mut out, false);
    out
}

fn push_collapsed(out: &mut String, text: &str) {
    for ch in text.chars() {
        if ch.is_ascii_whitespace() {
            if !out.is_empty() && !out.ends_with([' ', '\n']) {
                out.push(' ');
            }
        } else {
            out.push(ch);
        }
    }
}

/// Whether two HTML strings describe the same content.
///
/// Whitespace runs in text are collapsed, whitespace-only text nodes and
/// comments are ignored, and attributes compare as sets.
#[must_use]
pub fn equivalent(a: &str, b: &str) -> bool {
    canonical(&parse(a)) == canonical(&parse(b))
}

/// Canonical serialization backing [`equivalent`].
#[must_use]
pub fn canonical(fragment: &Fragment) -> String {
    fn walk(nodes: &[Node], out: &mut String, pre: bool) {
        let mut text = String::new();
        for node in nodes {
            match node {
                Node::Text(t) => text.push_str(t),
                Node::Comment(_) => {}
                Node::Element(el) => {
                    flush_text(&mut text, out, pre);
                    let mut attrs: Vec<_> = el.attrs.iter().collect();
                    attrs.sort();
                    let _ = write!(out, "<{}", el.name);
                    for (key, value) in attrs {
                        let _ = write!(out, " {key}=\"{}\"", escape_attr(value));
                    }
                    out.push('>');
                    if !is_void(&el.name) {
                        walk(&el.children, out, pre || el.name == "pre");
                        let _ = write!(out, "</{}>", el.name);
                    }
                }
            }
        }
        flush_text(&mut text, out, pre);
    }

    fn flush_text(text: &mut String, out: &mut String, pre: bool) {
        if pre {
            out.push_str(&escape_text(text));
        } else {
            let collapsed = text.split_ascii_whitespace().collect::<Vec<_>>().join(" ");
            out.push_str(&escape_text(&collapsed));
        }
        text.clear();
    }

    let mut out = String::new();
    walk(&fragment.nodes, &mut out, false);
    out
}
