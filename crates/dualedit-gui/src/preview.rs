#![forbid(unsafe_code)]

use dualedit_core::html::{Element, Fragment, Node};
use eframe::egui;

#[derive(Clone, Debug, Default)]
pub(crate) struct PreviewDoc {
    blocks: Vec<Block>,
}

#[derive(Clone, Debug)]
enum Block {
    QuoteStart,
    QuoteEnd,
    Heading {
        level: u8,
        spans: Vec<Span>,
    },
    Paragraph {
        spans: Vec<Span>,
    },
    ListItem {
        depth: usize,
        marker: ListMarker,
        spans: Vec<Span>,
    },
    Code {
        language: Option<String>,
        code: String,
    },
    Table {
        rows: Vec<TableRow>,
    },
    Rule,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ListMarker {
    Bullet,
    Number(usize),
}

#[derive(Clone, Debug)]
struct TableRow {
    header: bool,
    cells: Vec<Vec<Span>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct SpanStyle {
    strong: bool,
    emphasis: bool,
    code: bool,
    strikethrough: bool,
    underline: bool,
    link: Option<String>,
}

#[derive(Clone, Debug)]
struct Span {
    text: String,
    style: SpanStyle,
}

/// Caches the laid-out preview for one document revision.
#[derive(Debug, Default)]
pub(crate) struct PreviewCache {
    revision: Option<u64>,
    doc: PreviewDoc,
}

impl PreviewCache {
    pub(crate) fn get(&mut self, revision: u64, fragment: &Fragment) -> &PreviewDoc {
        if self.revision != Some(revision) {
            self.doc = layout(fragment);
            self.revision = Some(revision);
        }
        &self.doc
    }
}

const SKIPPED: &[&str] = &["script", "style", "head", "title", "template", "noscript"];

#[derive(Default)]
struct Builder {
    blocks: Vec<Block>,
    spans: Vec<Span>,
    /// One entry per open list: `None` for bullets, the last number for
    /// ordered lists.
    lists: Vec<Option<usize>>,
    item: Option<(usize, ListMarker)>,
}

impl Builder {
    fn flush(&mut self) {
        let spans = std::mem::take(&mut self.spans);
        if !has_visible_text(&spans) {
            return;
        }
        let spans = trim_end(spans);
        match self.item.take() {
            Some((depth, marker)) => self.blocks.push(Block::ListItem {
                depth,
                marker,
                spans,
            }),
            None => self.blocks.push(Block::Paragraph { spans }),
        }
    }

    fn walk(&mut self, nodes: &[Node], style: &SpanStyle) {
        for node in nodes {
            match node {
                Node::Text(text) => push_collapsed(&mut self.spans, text, style),
                Node::Comment(_) => {}
                Node::Element(el) => self.element(el, style),
            }
        }
    }

    fn element(&mut self, el: &Element, style: &SpanStyle) {
        let name = el.name.as_str();
        if SKIPPED.contains(&name) {
            return;
        }

        match name {
            "br" => {
                push_span(&mut self.spans, "\n", style.clone());
            }
            "img" => {
                if let Some(alt) = el.attr("alt").filter(|alt| !alt.trim().is_empty()) {
                    let style = SpanStyle {
                        emphasis: true,
                        ..style.clone()
                    };
                    push_span(&mut self.spans, &format!("[{}]", alt.trim()), style);
                }
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                self.flush();
                self.walk(&el.children, style);
                let spans = trim_end(std::mem::take(&mut self.spans));
                self.blocks.push(Block::Heading {
                    level: name.as_bytes()[1] - b'0',
                    spans,
                });
            }
            "ul" | "ol" => {
                self.flush();
                self.lists.push((name == "ol").then_some(0));
                self.walk(&el.children, style);
                self.flush();
                self.lists.pop();
            }
            "li" => {
                self.flush();
                let depth = self.lists.len().saturating_sub(1);
                let marker = match self.lists.last_mut() {
                    Some(Some(counter)) => {
                        *counter += 1;
                        ListMarker::Number(*counter)
                    }
                    _ => ListMarker::Bullet,
                };
                self.item = Some((depth, marker));
                self.walk(&el.children, style);
                self.flush();
                self.item = None;
            }
            "blockquote" => {
                self.flush();
                self.blocks.push(Block::QuoteStart);
                self.walk(&el.children, style);
                self.flush();
                self.blocks.push(Block::QuoteEnd);
            }
            "pre" => {
                self.flush();
                self.blocks.push(code_block(el));
            }
            "hr" => {
                self.flush();
                self.blocks.push(Block::Rule);
            }
            "table" => {
                self.flush();
                let mut rows = Vec::new();
                collect_rows(&el.children, false, style, &mut rows);
                self.blocks.push(Block::Table { rows });
            }
            name if dualedit_core::html::is_block(name) => {
                self.flush();
                self.walk(&el.children, style);
                self.flush();
            }
            _ => {
                let style = inline_style(el, style);
                self.walk(&el.children, &style);
            }
        }
    }
}

fn inline_style(el: &Element, style: &SpanStyle) -> SpanStyle {
    let mut style = style.clone();
    match el.name.as_str() {
        "strong" | "b" => style.strong = true,
        "em" | "i" | "cite" => style.emphasis = true,
        "s" | "del" | "strike" => style.strikethrough = true,
        "u" | "ins" => style.underline = true,
        "code" | "kbd" | "samp" | "tt" => style.code = true,
        "a" => style.link = Some(el.attr("href").unwrap_or_default().to_owned()),
        _ => {}
    }
    style
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
        Node::Element(el) if el.name == "code" => el
            .attr("class")
            .and_then(|class| {
                class
                    .split_ascii_whitespace()
                    .find_map(|c| c.strip_prefix("language-"))
            })
            .filter(|lang| !lang.is_empty())
            .map(str::to_owned),
        _ => None,
    });

    let mut code = String::new();
    raw_text(&pre.children, &mut code);
    if code.starts_with('\n') {
        code.remove(0);
    }
    Block::Code { language, code }
}

fn collect_rows(nodes: &[Node], in_head: bool, style: &SpanStyle, rows: &mut Vec<TableRow>) {
    for node in nodes {
        let Node::Element(el) = node else {
            continue;
        };
        match el.name.as_str() {
            "thead" => collect_rows(&el.children, true, style, rows),
            "tbody" | "tfoot" => collect_rows(&el.children, in_head, style, rows),
            "tr" => {
                let mut header = in_head;
                let mut cells = Vec::new();
                for cell in &el.children {
                    let Node::Element(cell) = cell else {
                        continue;
                    };
                    if cell.name != "td" && cell.name != "th" {
                        continue;
                    }
                    header |= cell.name == "th";
                    cells.push(cell_spans(&cell.children, style));
                }
                rows.push(TableRow { header, cells });
            }
            _ => {}
        }
    }
}

fn cell_spans(nodes: &[Node], style: &SpanStyle) -> Vec<Span> {
    let mut builder = Builder::default();
    builder.walk(nodes, style);
    builder.flush();

    let mut spans = Vec::new();
    for block in builder.blocks {
        let block_spans = match block {
            Block::Heading { spans, .. }
            | Block::Paragraph { spans }
            | Block::ListItem { spans, .. } => spans,
            Block::Code { code, .. } => vec![Span {
                text: code,
                style: SpanStyle {
                    code: true,
                    ..SpanStyle::default()
                },
            }],
            _ => continue,
        };
        if !spans.is_empty() {
            push_span(&mut spans, "\n", SpanStyle::default());
        }
        for span in block_spans {
            push_span(&mut spans, &span.text, span.style);
        }
    }
    spans
}

/// Lay out a parsed fragment into preview blocks (no egui types).
pub(crate) fn layout(fragment: &Fragment) -> PreviewDoc {
    let mut builder = Builder::default();
    builder.walk(&fragment.nodes, &SpanStyle::default());
    builder.flush();
    PreviewDoc {
        blocks: builder.blocks,
    }
}

fn has_visible_text(spans: &[Span]) -> bool {
    spans.iter().any(|span| !span.text.trim().is_empty())
}

fn trim_end(mut spans: Vec<Span>) -> Vec<Span> {
    while let Some(last) = spans.last_mut() {
        let len = last.text.trim_end_matches(' ').len();
        last.text.truncate(len);
        if !last.text.is_empty() {
            break;
        }
        spans.pop();
    }
    spans
}

fn push_collapsed(spans: &mut Vec<Span>, text: &str, style: &SpanStyle) {
    let mut collapsed = String::with_capacity(text.len());
    let mut prev = spans.last().and_then(|span| span.text.chars().last());
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
    push_span(spans, &collapsed, style.clone());
}

fn push_span(spans: &mut Vec<Span>, text: &str, style: SpanStyle) {
    if text.is_empty() {
        return;
    }

    match spans.last_mut() {
        Some(last) if last.style == style => last.text.push_str(text),
        _ => spans.push(Span {
            text: text.to_owned(),
            style,
        }),
    }
}

pub(crate) fn show(ui: &mut egui::Ui, doc: &PreviewDoc) {
    let mut quote_depth: usize = 0;

    for (block_idx, block) in doc.blocks.iter().enumerate() {
        match block {
            Block::QuoteStart => {
                quote_depth = quote_depth.saturating_add(1);
            }
            Block::QuoteEnd => {
                quote_depth = quote_depth.saturating_sub(1);
            }
            _ => with_quote(ui, quote_depth, |ui| match block {
                Block::Heading { level, spans } => {
                    let font = heading_font(ui, *level);
                    ui.add(egui::Label::new(spans_layout_job(ui, spans, font)).wrap());
                    ui.add_space(4.0);
                }
                Block::Paragraph { spans } => {
                    let font = body_font(ui);
                    ui.add(egui::Label::new(spans_layout_job(ui, spans, font)).wrap());
                    ui.add_space(6.0);
                }
                Block::ListItem {
                    depth,
                    marker,
                    spans,
                } => {
                    let font = body_font(ui);
                    ui.horizontal_wrapped(|ui| {
                        ui.add_space(*depth as f32 * 12.0);
                        match marker {
                            ListMarker::Bullet => ui.label("•"),
                            ListMarker::Number(n) => ui.label(format!("{n}.")),
                        };
                        ui.add(egui::Label::new(spans_layout_job(ui, spans, font)).wrap());
                    });
                    ui.add_space(4.0);
                }
                Block::Code { language, code } => {
                    if let Some(lang) = language.as_deref() {
                        ui.label(egui::RichText::new(lang).weak());
                    }

                    let frame = egui::Frame::group(ui.style())
                        .fill(ui.visuals().faint_bg_color)
                        .inner_margin(egui::Margin::same(8));

                    frame.show(ui, |ui| {
                        ui.add(
                            egui::Label::new(egui::RichText::new(code).monospace())
                                .wrap()
                                .selectable(true),
                        );
                    });
                    ui.add_space(6.0);
                }
                Block::Table { rows } => {
                    let font = body_font(ui);
                    let cols = rows.iter().map(|r| r.cells.len()).max().unwrap_or(0);
                    let grid_id = ui.id().with(("table", block_idx));

                    egui::Grid::new(grid_id).striped(true).show(ui, |ui| {
                        for row in rows {
                            for cell in &row.cells {
                                let mut job = spans_layout_job(ui, cell, font.clone());
                                if row.header {
                                    for section in &mut job.sections {
                                        section.format.color = ui.visuals().strong_text_color();
                                    }
                                }
                                ui.add(egui::Label::new(job).wrap());
                            }
                            for _ in row.cells.len()..cols {
                                ui.label("");
                            }
                            ui.end_row();
                        }
                    });
                    ui.add_space(6.0);
                }
                Block::Rule => {
                    ui.separator();
                    ui.add_space(6.0);
                }
                Block::QuoteStart | Block::QuoteEnd => {}
            }),
        }
    }
}

fn with_quote(ui: &mut egui::Ui, depth: usize, add_contents: impl FnOnce(&mut egui::Ui)) {
    if depth == 0 {
        add_contents(ui);
        return;
    }

    ui.horizontal(|ui| {
        ui.add_space((depth - 1) as f32 * 12.0);
        ui.colored_label(ui.visuals().weak_text_color(), "|");
        ui.add_space(4.0);
        ui.vertical(add_contents);
    });
}

fn body_font(ui: &egui::Ui) -> egui::FontId {
    ui.style()
        .text_styles
        .get(&egui::TextStyle::Body)
        .cloned()
        .unwrap_or_else(|| egui::FontId::proportional(16.0))
}

fn heading_font(ui: &egui::Ui, level: u8) -> egui::FontId {
    let base = ui
        .style()
        .text_styles
        .get(&egui::TextStyle::Heading)
        .cloned()
        .unwrap_or_else(|| egui::FontId::proportional(22.0));

    let scale = match level {
        1 => 1.20,
        2 => 1.10,
        3 => 1.05,
        _ => 1.0,
    };

    egui::FontId {
        size: base.size * scale,
        family: base.family,
    }
}

fn spans_layout_job(
    ui: &egui::Ui,
    spans: &[Span],
    base_font: egui::FontId,
) -> egui::text::LayoutJob {
    let mut job = egui::text::LayoutJob::default();

    for span in spans {
        let mut format = egui::text::TextFormat {
            font_id: if span.style.code {
                egui::FontId::monospace(base_font.size)
            } else {
                base_font.clone()
            },
            color: ui.visuals().text_color(),
            ..Default::default()
        };

        if span.style.strong {
            format.color = ui.visuals().strong_text_color();
        }

        if span.style.emphasis {
            format.italics = true;
        }

        if span.style.code {
            format.background = ui.visuals().faint_bg_color;
        }

        if span.style.strikethrough {
            format.strikethrough = egui::Stroke::new(1.0, format.color);
        }

        if span.style.underline {
            format.underline = egui::Stroke::new(1.0, format.color);
        }

        if span.style.link.is_some() {
            format.underline = egui::Stroke::new(1.0, ui.visuals().hyperlink_color);
            format.color = ui.visuals().hyperlink_color;
        }

        job.append(&span.text, 0.0, format);
    }

    job
}

#[cfg(test)]
mod tests {
    use dualedit_core::html;

    use super::*;

    fn text(spans: &[Span]) -> String {
        spans.iter().map(|s| s.text.as_str()).collect()
    }

    #[test]
    fn lays_out_common_blocks() {
        let source = "<h2>Title</h2><p>Hello <em>world</em> <s>gone</s>.</p>\
            <blockquote><p>quoted</p></blockquote><ol><li>a</li><li>b<ul><li>c</li></ul></li></ol>\
            <table><thead><tr><th>h</th></tr></thead><tr><td>d</td></tr></table>\
            <pre><code class=\"language-rs\">let x = 1;</code></pre><hr>";
        let doc = layout(&html::parse(source));

        assert!(matches!(doc.blocks[0], Block::Heading { level: 2, .. }));
        let Block::Paragraph { spans } = &doc.blocks[1] else {
            panic!("expected paragraph");
        };
        assert_eq!(text(spans), "Hello world gone.");
        assert!(spans.iter().any(|s| s.style.strikethrough));
        assert!(matches!(doc.blocks[2], Block::QuoteStart));
        assert!(matches!(doc.blocks[3], Block::Paragraph { .. }));
        assert!(matches!(doc.blocks[4], Block::QuoteEnd));
        assert!(matches!(
            doc.blocks[5],
            Block::ListItem {
                depth: 0,
                marker: ListMarker::Number(1),
                ..
            }
        ));
        assert!(matches!(
            doc.blocks[6],
            Block::ListItem {
                depth: 0,
                marker: ListMarker::Number(2),
                ..
            }
        ));
        assert!(matches!(
            doc.blocks[7],
            Block::ListItem {
                depth: 1,
                marker: ListMarker::Bullet,
                ..
            }
        ));
        let Block::Table { rows } = &doc.blocks[8] else {
            panic!("expected table");
        };
        assert_eq!(rows.len(), 2);
        assert!(rows[0].header);
        assert!(!rows[1].header);
        let Block::Code { language, code } = &doc.blocks[9] else {
            panic!("expected code block");
        };
        assert_eq!(language.as_deref(), Some("rs"));
        assert_eq!(code, "let x = 1;");
        assert!(matches!(doc.blocks[10], Block::Rule));
    }

    #[test]
    fn script_and_style_content_is_not_shown() {
        let doc = layout(&html::parse(
            "<style>p { color: red }</style><p>shown</p><script>alert(1)</script>",
        ));
        assert_eq!(doc.blocks.len(), 1);
    }

    #[test]
    fn empty_fragment_has_no_blocks() {
        assert!(layout(&html::parse("")).blocks.is_empty());
        assert!(layout(&html::parse("  <p> </p>  ")).blocks.is_empty());
    }

    #[test]
    fn links_and_images_keep_their_targets() {
        let doc = layout(&html::parse(
            "<p><a href=\"https://example.com\">site</a> <img alt=\"logo\" src=\"x.png\"></p>",
        ));
        let Block::Paragraph { spans } = &doc.blocks[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(spans[0].style.link.as_deref(), Some("https://example.com"));
        assert_eq!(text(spans), "site [logo]");
    }

    #[test]
    fn cache_relayouts_only_on_new_revisions() {
        let mut cache = PreviewCache::default();
        let first = html::parse("<p>one</p>");
        let second = html::parse("<p>one</p><p>two</p>");
        assert_eq!(cache.get(1, &first).blocks.len(), 1);
        assert_eq!(cache.get(1, &second).blocks.len(), 1);
        assert_eq!(cache.get(2, &second).blocks.len(), 2);
    }
}
