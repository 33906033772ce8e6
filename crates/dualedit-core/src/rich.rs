//! Rich-document model behind the visual surface.
//!
//! HTML goes in through [`RichDoc::from_html`] and comes back out through
//! [`RichDoc::to_html`]. The mapping is lossy by nature: anything the model
//! has no node for is unwrapped or dropped, and the serializer always writes
//! the same canonical markup (`<strong>` for `<b>`, `<li><p>` for `<li>`).

use std::fmt::Write as _;

use crate::html::{self, Element, Node};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mark {
    Bold,
    Italic,
    Strike,
    Code,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Marks {
    pub bold: bool,
    pub italic: bool,
    pub strike: bool,
    pub code: bool,
}

impl Marks {
    #[must_use]
    pub const fn has(self, mark: Mark) -> bool {
        match mark {
            Mark::Bold => self.bold,
            Mark::Italic => self.italic,
            Mark::Strike => self.strike,
            Mark::Code => self.code,
        }
    }

    #[must_use]
    pub const fn with(mut self, mark: Mark, on: bool) -> Self {
        match mark {
            Mark::Bold => self.bold = on,
            Mark::Italic => self.italic = on,
            Mark::Strike => self.strike = on,
            Mark::Code => self.code = on,
        }
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Span {
    /// `\n` marks a hard line break.
    pub text: String,
    pub marks: Marks,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockKind {
    Paragraph,
    Heading(u8),
    BulletItem { depth: usize },
    OrderedItem { depth: usize },
    Quote,
    CodeBlock { language: Option<String> },
    Rule,
}

impl BlockKind {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Paragraph => "Paragraph",
            Self::Heading(1) => "Heading 1",
            Self::Heading(2) => "Heading 2",
            Self::Heading(3) => "Heading 3",
            Self::Heading(_) => "Heading",
            Self::BulletItem { .. } => "Bullet list",
            Self::OrderedItem { .. } => "Numbered list",
            Self::Quote => "Quote",
            Self::CodeBlock { .. } => "Code block",
            Self::Rule => "Rule",
        }
    }

    /// Whether the block carries editable text.
    #[must_use]
    pub const fn has_text(&self) -> bool {
        !matches!(self, Self::Rule)
    }

    /// Whether inline marks apply inside the block.
    #[must_use]
    pub const fn allows_marks(&self) -> bool {
        !matches!(self, Self::Rule | Self::CodeBlock { .. })
    }

    #[must_use]
    pub const fn list_depth(&self) -> Option<usize> {
        match self {
            Self::BulletItem { depth } | Self::OrderedItem { depth } => Some(*depth),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    pub spans: Vec<Span>,
}

impl Block {
    #[must_use]
    pub fn new(kind: BlockKind, text: &str) -> Self {
        let mut block = Self {
            kind,
            spans: Vec::new(),
        };
        push_span(&mut block.spans, text, Marks::default());
        block
    }

    #[must_use]
    pub fn paragraph(text: &str) -> Self {
        Self::new(BlockKind::Paragraph, text)
    }

    #[must_use]
    pub fn text(&self) -> String {
        self.spans.iter().map(|span| span.text.as_str()).collect()
    }

    fn chars(&self) -> Vec<(char, Marks)> {
        self.spans
            .iter()
            .flat_map(|span| span.text.chars().map(move |ch| (ch, span.marks)))
            .collect()
    }

    fn rebuild(&mut self, chars: impl IntoIterator<Item = (char, Marks)>) {
        let mut spans: Vec<Span> = Vec::new();
        for (ch, marks) in chars {
            match spans.last_mut() {
                Some(last) if last.marks == marks => last.text.push(ch),
                _ => spans.push(Span {
                    text: ch.to_string(),
                    marks,
                }),
            }
        }
        self.spans = spans;
    }

    /// Marks in effect at a char offset: those of the char before it, or of
    /// the first char when the offset is at the start.
    #[must_use]
    pub fn marks_at(&self, offset: usize) -> Marks {
        let chars = self.chars();
        offset
            .checked_sub(1)
            .and_then(|idx| chars.get(idx))
            .or_else(|| chars.first())
            .map(|(_, marks)| *marks)
            .unwrap_or_default()
    }

    /// Replace the block text, keeping the marks of everything outside the
    /// changed range. Inserted text inherits the marks at the insertion point.
    ///
    /// Returns `false` when the text is unchanged.
    pub fn replace_text(&mut self, new_text: &str) -> bool {
        let chars = self.chars();
        let new_chars: Vec<char> = new_text.chars().collect();
        if chars.len() == new_chars.len()
            && chars.iter().map(|(ch, _)| *ch).eq(new_chars.iter().copied())
        {
            return false;
        }

        let prefix = chars
            .iter()
            .zip(&new_chars)
            .take_while(|((old, _), new)| old == *new)
            .count();
        let suffix = chars
            .iter()
            .rev()
            .zip(new_chars.iter().rev())
            .take_while(|((old, _), new)| old == *new)
            .count()
            .min(chars.len() - prefix)
            .min(new_chars.len() - prefix);

        let marks = if self.kind.allows_marks() {
            self.marks_at(prefix)
        } else {
            Marks::default()
        };
        let inserted = new_chars[prefix..new_chars.len() - suffix]
            .iter()
            .map(|ch| (*ch, marks));
        let rebuilt: Vec<_> = chars[..prefix]
            .iter()
            .copied()
            .chain(inserted)
            .chain(chars[chars.len() - suffix..].iter().copied())
            .collect();
        self.rebuild(rebuilt);
        true
    }

    /// Toggle `mark` over a char range: removed when every char in the range
    /// already has it, applied otherwise.
    ///
    /// Returns `false` when nothing changed.
    pub fn toggle_mark(&mut self, range: std::ops::Range<usize>, mark: Mark) -> bool {
        if !self.kind.allows_marks() {
            return false;
        }
        let mut chars = self.chars();
        let end = range.end.min(chars.len());
        let start = range.start.min(end);
        if start == end {
            return false;
        }

        let on = !chars[start..end].iter().all(|(_, marks)| marks.has(mark));
        for (_, marks) in &mut chars[start..end] {
            *marks = marks.with(mark, on);
        }
        self.rebuild(chars);
        true
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RichDoc {
    pub blocks: Vec<Block>,
}

impl Default for RichDoc {
    fn default() -> Self {
        Self {
            blocks: vec![Block::paragraph("")],
        }
    }
}

impl RichDoc {
    #[must_use]
    pub fn from_html(source: &str) -> Self {
        let fragment = html::parse(source);
        let mut blocks = Vec::new();
        collect_blocks(&fragment.nodes, Context::default(), &mut blocks);
        if blocks.is_empty() {
            return Self::default();
        }
        Self { blocks }
    }

    #[must_use]
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        let mut idx = 0;
        while idx < self.blocks.len() {
            let block = &self.blocks[idx];
            match &block.kind {
                BlockKind::Paragraph => {
                    write_inline_block(&mut out, "p", &block.spans);
                    idx += 1;
                }
                BlockKind::Heading(level) => {
                    let tag = format!("h{}", (*level).clamp(1, 6));
                    write_inline_block(&mut out, &tag, &block.spans);
                    idx += 1;
                }
                BlockKind::Quote => {
                    out.push_str("<blockquote>");
                    while let Some(quoted) = self
                        .blocks
                        .get(idx)
                        .filter(|b| b.kind == BlockKind::Quote)
                    {
                        write_inline_block(&mut out, "p", &quoted.spans);
                        idx += 1;
                    }
                    out.push_str("</blockquote>");
                }
                BlockKind::CodeBlock { language } => {
                    out.push_str("<pre><code");
                    if let Some(lang) = language {
                        let _ = write!(out, " class=\"language-{}\"", html::escape_attr(lang));
                    }
                    out.push('>');
                    out.push_str(&html::escape_text(&block.text()));
                    out.push_str("</code></pre>");
                    idx += 1;
                }
                BlockKind::Rule => {
                    out.push_str("<hr>");
                    idx += 1;
                }
                BlockKind::BulletItem { .. } | BlockKind::OrderedItem { .. } => {
                    let start = idx;
                    while self
                        .blocks
                        .get(idx)
                        .is_some_and(|b| b.kind.list_depth().is_some())
                    {
                        idx += 1;
                    }
                    write_list_run(&mut out, &self.blocks[start..idx]);
                }
            }
        }
        out
    }

    /// Change a block's kind. Code blocks drop inline marks; rules drop text.
    pub fn set_kind(&mut self, index: usize, kind: BlockKind) -> bool {
        let Some(block) = self.blocks.get_mut(index) else {
            return false;
        };
        if block.kind == kind {
            return false;
        }
        if !kind.has_text() {
            block.spans.clear();
        } else if !kind.allows_marks() {
            let text = block.text();
            block.spans.clear();
            push_span(&mut block.spans, &text, Marks::default());
        }
        block.kind = kind;
        true
    }

    /// Insert an empty block after `index` and return its index. List items
    /// continue the list; everything else is followed by a paragraph.
    pub fn insert_block_after(&mut self, index: usize) -> usize {
        let kind = match self.blocks.get(index).map(|b| &b.kind) {
            Some(kind @ (BlockKind::BulletItem { .. } | BlockKind::OrderedItem { .. })) => {
                kind.clone()
            }
            _ => BlockKind::Paragraph,
        };
        let at = (index + 1).min(self.blocks.len());
        self.blocks.insert(
            at,
            Block {
                kind,
                spans: Vec::new(),
            },
        );
        at
    }

    /// Remove a block. The document always keeps at least one block.
    pub fn remove_block(&mut self, index: usize) -> bool {
        if index >= self.blocks.len() {
            return false;
        }
        self.blocks.remove(index);
        if self.blocks.is_empty() {
            self.blocks.push(Block::paragraph(""));
        }
        true
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct Context {
    quote: bool,
    list: Option<(bool, usize)>,
}

impl Context {
    const fn text_kind(self) -> BlockKind {
        match self.list {
            Some((true, depth)) => BlockKind::OrderedItem { depth },
            Some((false, depth)) => BlockKind::BulletItem { depth },
            None if self.quote => BlockKind::Quote,
            None => BlockKind::Paragraph,
        }
    }

    fn nested_list(self, ordered: bool) -> Self {
        let depth = self.list.map_or(0, |(_, depth)| depth + 1);
        Self {
            quote: self.quote,
            list: Some((ordered, depth)),
        }
    }
}

const SKIPPED: &[&str] = &["script", "style", "head", "title", "template"];

const TRANSPARENT_BLOCKS: &[&str] = &[
    "address", "article", "aside", "body", "dd", "div", "dl", "dt", "fieldset", "figure",
    "figcaption", "footer", "form", "header", "html", "main", "nav", "section", "table", "tbody",
    "td", "tfoot", "th", "thead", "tr",
];

fn collect_blocks(nodes: &[Node], ctx: Context, out: &mut Vec<Block>) {
    let mut pending: Vec<Span> = Vec::new();
    for node in nodes {
        let el = match node {
            Node::Text(text) => {
                push_collapsed(&mut pending, text, Marks::default());
                continue;
            }
            Node::Comment(_) => continue,
            Node::Element(el) => el,
        };

        let name = el.name.as_str();
        if SKIPPED.contains(&name) {
            continue;
        }
        let is_block = matches!(
            name,
            "p" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "ul" | "ol" | "li" | "blockquote"
                | "pre" | "hr"
        ) || TRANSPARENT_BLOCKS.contains(&name);
        if !is_block {
            collect_inline(std::slice::from_ref(node), Marks::default(), &mut pending);
            continue;
        }

        flush_pending(&mut pending, ctx, out);
        match name {
            "p" => out.push(inline_block(ctx.text_kind(), &el.children)),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = name.as_bytes()[1] - b'0';
                out.push(inline_block(BlockKind::Heading(level), &el.children));
            }
            "ul" | "ol" => {
                let nested = ctx.nested_list(name == "ol");
                for child in &el.children {
                    match child {
                        Node::Element(li) if li.name == "li" => {
                            collect_blocks(&li.children, nested, out);
                        }
                        other => collect_blocks(std::slice::from_ref(other), nested, out),
                    }
                }
            }
            "li" => {
                let item_ctx = if ctx.list.is_some() {
                    ctx
                } else {
                    ctx.nested_list(false)
                };
                collect_blocks(&el.children, item_ctx, out);
            }
            "blockquote" => collect_blocks(
                &el.children,
                Context {
                    quote: true,
                    list: None,
                },
                out,
            ),
            "pre" => out.push(code_block(el)),
            "hr" => out.push(Block {
                kind: BlockKind::Rule,
                spans: Vec::new(),
            }),
            _ => collect_blocks(&el.children, ctx, out),
        }
    }
    flush_pending(&mut pending, ctx, out);
}

fn flush_pending(pending: &mut Vec<Span>, ctx: Context, out: &mut Vec<Block>) {
    trim_trailing_space(pending);
    if pending.iter().any(|span| !span.text.trim().is_empty()) {
        out.push(Block {
            kind: ctx.text_kind(),
            spans: std::mem::take(pending),
        });
    }
    pending.clear();
}

fn inline_block(kind: BlockKind, children: &[Node]) -> Block {
    let mut spans = Vec::new();
    collect_inline(children, Marks::default(), &mut spans);
    trim_trailing_space(&mut spans);
    Block { kind, spans }
}

fn code_block(pre: &Element) -> Block {
    fn raw_text(nodes: &[Node], out: &mut String) {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Element(el) if el.name == "br" => out.push('\n'),
                Node::Element(el) => raw_text(&el.children, out),
                Node::Comment(_) => {}
            }
        }
    }

    let language = pre.children.iter().find_map(|node| match node {
        Node::Element(el) if el.name == "code" => el.attr("class").and_then(|class| {
            class
                .split_ascii_whitespace()
                .find_map(|c| c.strip_prefix("language-"))
                .filter(|lang| !lang.is_empty())
                .map(str::to_owned)
        }),
        _ => None,
    });

    let mut text = String::new();
    raw_text(&pre.children, &mut text);
    if text.starts_with('\n') {
        text.remove(0);
    }
    Block::new(BlockKind::CodeBlock { language }, &text)
}

fn collect_inline(nodes: &[Node], marks: Marks, spans: &mut Vec<Span>) {
    for node in nodes {
        match node {
            Node::Text(text) => push_collapsed(spans, text, marks),
            Node::Comment(_) => {}
            Node::Element(el) => {
                let name = el.name.as_str();
                if SKIPPED.contains(&name) {
                    continue;
                }
                let marks = match name {
                    "strong" | "b" => marks.with(Mark::Bold, true),
                    "em" | "i" => marks.with(Mark::Italic, true),
                    "s" | "del" | "strike" => marks.with(Mark::Strike, true),
                    "code" => marks.with(Mark::Code, true),
                    "br" => {
                        trim_trailing_space(spans);
                        push_span(spans, "\n", marks);
                        continue;
                    }
                    _ => marks,
                };
                collect_inline(&el.children, marks, spans);
            }
        }
    }
}

fn last_char(spans: &[Span]) -> Option<char> {
    spans.last().and_then(|span| span.text.chars().last())
}

fn push_collapsed(spans: &mut Vec<Span>, text: &str, marks: Marks) {
    let mut collapsed = String::with_capacity(text.len());
    let mut prev = last_char(spans);
    for ch in text.chars() {
        if ch.is_ascii_whitespace() {
            if matches!(prev, None | Some(' ' | '\n')) {
                continue;
            }
            collapsed.push(' ');
            prev = Some(' ');
        } else {
            collapsed.push(ch);
            prev = Some(ch);
        }
    }
    push_span(spans, &collapsed, marks);
}

fn push_span(spans: &mut Vec<Span>, text: &str, marks: Marks) {
    if text.is_empty() {
        return;
    }

    match spans.last_mut() {
        Some(last) if last.marks == marks => last.text.push_str(text),
        _ => spans.push(Span {
            text: text.to_owned(),
            marks,
        }),
    }
}

fn trim_trailing_space(spans: &mut Vec<Span>) {
    while let Some(last) = spans.last_mut() {
        let trimmed = last.text.trim_end_matches(' ').len();
        last.text.truncate(trimmed);
        if !last.text.is_empty() {
            break;
        }
        spans.pop();
    }
}

fn write_inline_block(out: &mut String, tag: &str, spans: &[Span]) {
    let _ = write!(out, "<{tag}>");
    write_spans(out, spans);
    let _ = write!(out, "</{tag}>");
}

fn write_spans(out: &mut String, spans: &[Span]) {
    const ORDER: [(Mark, &str); 4] = [
        (Mark::Bold, "strong"),
        (Mark::Italic, "em"),
        (Mark::Strike, "s"),
        (Mark::Code, "code"),
    ];

    let texts = keep_typed_spaces(spans);
    for (span, text) in spans.iter().zip(&texts) {
        let tags: Vec<&str> = ORDER
            .iter()
            .filter(|(mark, _)| span.marks.has(*mark))
            .map(|(_, tag)| *tag)
            .collect();
        for tag in &tags {
            let _ = write!(out, "<{tag}>");
        }
        let mut lines = text.split('\n');
        if let Some(first) = lines.next() {
            out.push_str(&html::escape_text(first));
        }
        for line in lines {
            out.push_str("<br>");
            out.push_str(&html::escape_text(line));
        }
        for tag in tags.iter().rev() {
            let _ = write!(out, "</{tag}>");
        }
    }
}

/// Spaces the parser would collapse or trim (leading, trailing, repeated,
/// or next to a line break) are written as no-break spaces.
fn keep_typed_spaces(spans: &[Span]) -> Vec<String> {
    let chars: Vec<char> = spans.iter().flat_map(|span| span.text.chars()).collect();
    let mut idx: usize = 0;
    spans
        .iter()
        .map(|span| {
            span.text
                .chars()
                .map(|ch| {
                    let prev = idx.checked_sub(1).and_then(|i| chars.get(i)).copied();
                    let next = chars.get(idx + 1).copied();
                    idx += 1;
                    if ch == '\n' || !ch.is_ascii_whitespace() {
                        return ch;
                    }
                    let collapsed = matches!(prev, None | Some('\n'))
                        || prev.is_some_and(|c| c.is_ascii_whitespace())
                        || matches!(next, None | Some('\n'));
                    if collapsed { '\u{a0}' } else { ' ' }
                })
                .collect()
        })
        .collect()
}

struct ListItem<'a> {
    ordered: bool,
    depth: usize,
    spans: &'a [Span],
}

fn write_list_run(out: &mut String, blocks: &[Block]) {
    // Depth may grow by at most one level per item.
    let mut items = Vec::with_capacity(blocks.len());
    let mut max_depth = 0usize;
    for block in blocks {
        let (ordered, depth) = match block.kind {
            BlockKind::OrderedItem { depth } => (true, depth),
            BlockKind::BulletItem { depth } => (false, depth),
            _ => continue,
        };
        let depth = depth.min(max_depth);
        max_depth = depth + 1;
        items.push(ListItem {
            ordered,
            depth,
            spans: &block.spans,
        });
    }

    let mut idx = 0;
    while idx < items.len() {
        write_list(out, &items, &mut idx, 0);
    }
}

fn write_list(out: &mut String, items: &[ListItem<'_>], idx: &mut usize, depth: usize) {
    let ordered = items[*idx].ordered;
    let tag = if ordered { "ol" } else { "ul" };
    let _ = write!(out, "<{tag}>");
    while let Some(item) = items
        .get(*idx)
        .filter(|item| item.depth == depth && item.ordered == ordered)
    {
        out.push_str("<li>");
        write_inline_block(out, "p", item.spans);
        *idx += 1;
        while items.get(*idx).is_some_and(|next| next.depth > depth) {
            write_list(out, items, idx, depth + 1);
        }
        out.push_str("</li>");
    }
    let _ = write!(out, "</{tag}>");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(doc: &RichDoc) -> Vec<BlockKind> {
        doc.blocks.iter().map(|b| b.kind.clone()).collect()
    }

    #[test]
    fn parses_common_blocks() {
        let doc = RichDoc::from_html(
            "<h2>Title</h2><p>Hello <b>big</b> <i>world</i></p><blockquote><p>q</p></blockquote>\
             <ul><li>a<ul><li>b</li></ul></li></ul><ol><li><p>c</p></li></ol>\
             <pre><code class=\"language-rs\">let x = 1;\n</code></pre><hr>",
        );
        assert_eq!(
            kinds(&doc),
            vec![
                BlockKind::Heading(2),
                BlockKind::Paragraph,
                BlockKind::Quote,
                BlockKind::BulletItem { depth: 0 },
                BlockKind::BulletItem { depth: 1 },
                BlockKind::OrderedItem { depth: 0 },
                BlockKind::CodeBlock {
                    language: Some("rs".to_owned())
                },
                BlockKind::Rule,
            ]
        );
        assert_eq!(doc.blocks[1].text(), "Hello big world");
        assert!(doc.blocks[1].spans.iter().any(|s| s.marks.bold && s.text == "big"));
        assert_eq!(doc.blocks[6].text(), "let x = 1;\n");
    }

    #[test]
    fn empty_document_is_single_empty_paragraph() {
        for source in ["", "   \n ", "<!-- only a comment -->"] {
            let doc = RichDoc::from_html(source);
            assert_eq!(doc, RichDoc::default());
            assert_eq!(doc.to_html(), "<p></p>");
        }
    }

    #[test]
    fn stray_inline_content_is_wrapped_in_paragraphs() {
        let doc = RichDoc::from_html("loose <b>text</b><div>inside div</div>tail");
        assert_eq!(
            doc.to_html(),
            "<p>loose <strong>text</strong></p><p>inside div</p><p>tail</p>"
        );
    }

    #[test]
    fn whitespace_collapses_outside_code() {
        let doc = RichDoc::from_html("<p>\n  a   b\n</p><pre>  keep   this</pre>");
        assert_eq!(doc.blocks[0].text(), "a b");
        assert_eq!(doc.blocks[1].text(), "  keep   this");
    }

    #[test]
    fn hard_breaks_round_trip() {
        let doc = RichDoc::from_html("<p>one <br>\ntwo</p>");
        assert_eq!(doc.blocks[0].text(), "one\ntwo");
        assert_eq!(doc.to_html(), "<p>one<br>two</p>");
    }

    #[test]
    fn serializer_normalizes_legacy_markup() {
        let doc = RichDoc::from_html(
            "<p><B>x</B><del>y</del></p><ul><li>a</li></ul><unknown>z</unknown>",
        );
        assert_eq!(
            doc.to_html(),
            "<p><strong>x</strong><s>y</s></p><ul><li><p>a</p></li></ul><p>z</p>"
        );
    }

    #[test]
    fn serialized_html_is_a_fixed_point() {
        let sources = [
            crate::DEFAULT_DOCUMENT,
            "<p>a <strong>b <em>c</em></strong> &amp; &lt;d&gt;</p>",
            "<ul><li>a<ol><li>b</li><li>c<ul><li>d</li></ul></li></ol></li><li>e</li></ul>",
            "<blockquote><p>one</p><p>two</p></blockquote><hr><pre><code>x &lt; y</code></pre>",
            "<h1>t</h1>text<br>more<script>skip()</script>",
        ];
        for source in sources {
            let once = RichDoc::from_html(source).to_html();
            let twice = RichDoc::from_html(&once).to_html();
            assert_eq!(once, twice, "not stable for {source}");
        }
    }

    #[test]
    fn typed_spacing_survives_a_reparse() {
        let mut block = Block::paragraph("x");
        assert!(block.replace_text(" a  b\t"));
        let doc = RichDoc {
            blocks: vec![block, Block::paragraph("one \n two")],
        };
        let once = doc.to_html();
        assert_eq!(
            once,
            "<p>&nbsp;a &nbsp;b&nbsp;</p><p>one&nbsp;<br>&nbsp;two</p>"
        );
        let twice = RichDoc::from_html(&once).to_html();
        assert_eq!(once, twice);
        assert_eq!(
            RichDoc::from_html(&once).blocks[0].text(),
            "\u{a0}a \u{a0}b\u{a0}"
        );
    }

    #[test]
    fn nested_lists_serialize_nested() {
        let doc = RichDoc {
            blocks: vec![
                Block::new(BlockKind::BulletItem { depth: 0 }, "a"),
                Block::new(BlockKind::BulletItem { depth: 3 }, "b"),
                Block::new(BlockKind::OrderedItem { depth: 1 }, "c"),
                Block::new(BlockKind::BulletItem { depth: 0 }, "d"),
            ],
        };
        assert_eq!(
            doc.to_html(),
            "<ul><li><p>a</p><ul><li><p>b</p></li></ul><ol><li><p>c</p></li></ol></li>\
             <li><p>d</p></li></ul>"
        );
    }

    #[test]
    fn replace_text_keeps_marks_around_the_edit() {
        let mut block = RichDoc::from_html("<p>ab<strong>cd</strong>ef</p>").blocks.remove(0);
        assert!(block.replace_text("abcXdef"));
        let bold: String = block
            .spans
            .iter()
            .filter(|s| s.marks.bold)
            .map(|s| s.text.as_str())
            .collect();
        assert_eq!(bold, "cXd");
        assert!(!block.replace_text("abcXdef"));

        assert!(block.replace_text("ab"));
        assert_eq!(block.text(), "ab");
        assert!(block.spans.iter().all(|s| !s.marks.bold));
    }

    #[test]
    fn replace_text_at_start_inherits_first_marks() {
        let mut block = RichDoc::from_html("<p><em>x</em></p>").blocks.remove(0);
        assert!(block.replace_text("yx"));
        assert_eq!(block.spans.len(), 1);
        assert!(block.spans[0].marks.italic);
    }

    #[test]
    fn toggle_mark_applies_then_removes() {
        let mut block = Block::paragraph("hello world");
        assert!(block.toggle_mark(0..5, Mark::Bold));
        assert_eq!(block.spans.len(), 2);
        assert!(block.spans[0].marks.bold);
        assert_eq!(block.spans[0].text, "hello");

        assert!(block.toggle_mark(0..5, Mark::Bold));
        assert_eq!(block.spans.len(), 1);
        assert!(!block.spans[0].marks.bold);

        assert!(!block.toggle_mark(3..3, Mark::Italic));
        let mut code = Block::new(BlockKind::CodeBlock { language: None }, "x");
        assert!(!code.toggle_mark(0..1, Mark::Bold));
    }

    #[test]
    fn set_kind_strips_marks_for_code_and_text_for_rules() {
        let mut doc = RichDoc::from_html("<p><strong>x</strong>y</p><p>z</p>");
        assert!(doc.set_kind(0, BlockKind::CodeBlock { language: None }));
        assert_eq!(doc.blocks[0].spans.len(), 1);
        assert_eq!(doc.blocks[0].text(), "xy");
        assert!(doc.set_kind(1, BlockKind::Rule));
        assert!(doc.blocks[1].spans.is_empty());
        assert!(!doc.set_kind(1, BlockKind::Rule));
        assert!(!doc.set_kind(9, BlockKind::Paragraph));
    }

    #[test]
    fn insert_and_remove_blocks() {
        let mut doc = RichDoc::from_html("<ol><li>a</li></ol><p>b</p>");
        let at = doc.insert_block_after(0);
        assert_eq!(at, 1);
        assert_eq!(doc.blocks[1].kind, BlockKind::OrderedItem { depth: 0 });
        let at = doc.insert_block_after(2);
        assert_eq!(doc.blocks[at].kind, BlockKind::Paragraph);

        let mut single = RichDoc::from_html("<h1>x</h1>");
        assert!(single.remove_block(0));
        assert_eq!(single, RichDoc::default());
        assert!(!single.remove_block(4));
    }
}
