#![forbid(unsafe_code)]

use std::ops::Range;

use dualedit_core::{
    rich::{Block, BlockKind, Mark, RichDoc},
    visual::VisualEditor,
};
use eframe::egui;

const MAX_LIST_DEPTH: usize = 6;
const INDENT: f32 = 18.0;

/// Per-frame UI state of the visual surface. Lives outside the editor so a
/// fresh mount never inherits focus from an earlier one.
#[derive(Debug, Default)]
pub(crate) struct RichViewState {
    focused: Option<usize>,
    /// Char range selected in the focused block.
    selection: Option<Range<usize>>,
    request_focus: Option<usize>,
}

impl RichViewState {
    fn target(&self, doc: &RichDoc) -> Option<usize> {
        self.focused.filter(|idx| *idx < doc.blocks.len())
    }
}

/// Draw the toolbar and the blocks. Returns `true` when the model changed.
pub(crate) fn show(ui: &mut egui::Ui, editor: &mut VisualEditor, state: &mut RichViewState) -> bool {
    let mut changed = toolbar(ui, editor, state);
    ui.separator();

    egui::ScrollArea::vertical()
        .id_salt("visual-scroll")
        .auto_shrink([false; 2])
        .show(ui, |ui| {
            changed |= blocks(ui, editor, state);
        });

    changed
}

fn toolbar(ui: &mut egui::Ui, editor: &mut VisualEditor, state: &mut RichViewState) -> bool {
    let mut changed = false;
    let target = state.target(editor.doc());

    ui.horizontal_wrapped(|ui| {
        if ui
            .add_enabled(editor.can_undo(), egui::Button::new("Undo"))
            .clicked()
        {
            changed |= editor.undo();
            state.selection = None;
        }
        if ui
            .add_enabled(editor.can_redo(), egui::Button::new("Redo"))
            .clicked()
        {
            changed |= editor.redo();
            state.selection = None;
        }

        ui.separator();

        let selection = state.selection.clone().filter(|range| !range.is_empty());
        let marks_target = target
            .zip(selection)
            .filter(|(idx, _)| {
                editor
                    .doc()
                    .blocks
                    .get(*idx)
                    .is_some_and(|block| block.kind.allows_marks())
            });

        for (mark, label) in [
            (Mark::Bold, egui::RichText::new("B").strong()),
            (Mark::Italic, egui::RichText::new("I").italics()),
            (Mark::Strike, egui::RichText::new("S").strikethrough()),
            (Mark::Code, egui::RichText::new("</>").monospace()),
        ] {
            let button = ui.add_enabled(marks_target.is_some(), egui::Button::new(label));
            if button.clicked()
                && let Some((idx, range)) = marks_target.clone()
            {
                changed |= editor.edit(|doc| {
                    doc.blocks
                        .get_mut(idx)
                        .is_some_and(|block| block.toggle_mark(range, mark))
                });
                state.request_focus = Some(idx);
            }
        }

        ui.separator();

        let current = target.and_then(|idx| editor.doc().blocks.get(idx).map(|b| b.kind.clone()));
        let selected_text = current.as_ref().map_or("Block", BlockKind::label);
        ui.add_enabled_ui(current.is_some(), |ui| {
            egui::ComboBox::from_id_salt("visual-block-kind")
                .selected_text(selected_text)
                .show_ui(ui, |ui| {
                    let (Some(idx), Some(current)) = (target, current.as_ref()) else {
                        return;
                    };
                    for kind in kind_choices(current) {
                        if ui
                            .selectable_label(*current == kind, kind.label())
                            .clicked()
                        {
                            changed |= editor.edit(|doc| doc.set_kind(idx, kind));
                        }
                    }
                });
        });

        let list_kind = current.as_ref().filter(|kind| kind.list_depth().is_some());
        for (label, delta) in [("Outdent", -1), ("Indent", 1)] {
            let next = list_kind.and_then(|kind| indented(kind, delta));
            if ui
                .add_enabled(next.is_some(), egui::Button::new(label))
                .clicked()
                && let (Some(idx), Some(next)) = (target, next)
            {
                changed |= editor.edit(|doc| doc.set_kind(idx, next));
            }
        }

        ui.separator();

        if ui.button("+ Block").clicked() {
            let after = target.unwrap_or_else(|| editor.doc().blocks.len().saturating_sub(1));
            let mut inserted = None;
            changed |= editor.edit(|doc| {
                inserted = Some(doc.insert_block_after(after));
                true
            });
            state.request_focus = inserted;
        }

        if ui
            .add_enabled(target.is_some(), egui::Button::new("Delete block"))
            .clicked()
            && let Some(idx) = target
        {
            changed |= editor.edit(|doc| doc.remove_block(idx));
            state.focused = None;
            state.selection = None;
        }
    });

    changed
}

fn blocks(ui: &mut egui::Ui, editor: &mut VisualEditor, state: &mut RichViewState) -> bool {
    let mut edited: Option<(usize, String)> = None;
    let doc = editor.doc();

    for (idx, block) in doc.blocks.iter().enumerate() {
        ui.horizontal_top(|ui| {
            if let Some(depth) = block.kind.list_depth() {
                ui.add_space(depth as f32 * INDENT);
                let marker = match block.kind {
                    BlockKind::OrderedItem { .. } => format!("{}.", ordinal(doc, idx)),
                    _ => "•".to_owned(),
                };
                ui.label(marker);
            }
            if block.kind == BlockKind::Quote {
                ui.colored_label(ui.visuals().weak_text_color(), "|");
            }

            if block.kind == BlockKind::Rule {
                let response = ui.selectable_label(
                    state.focused == Some(idx),
                    egui::RichText::new("--- horizontal rule ---").weak(),
                );
                if response.clicked() {
                    state.focused = Some(idx);
                    state.selection = None;
                }
                return;
            }

            if let Some(text) = block_editor(ui, block, idx, state) {
                edited = Some((idx, text));
            }
        });
        ui.add_space(4.0);
    }

    let Some((idx, text)) = edited else {
        return false;
    };
    editor.edit(|doc| {
        doc.blocks
            .get_mut(idx)
            .is_some_and(|block| block.replace_text(&text))
    })
}

/// One block's text field. Returns the new text when the user changed it.
fn block_editor(
    ui: &mut egui::Ui,
    block: &Block,
    idx: usize,
    state: &mut RichViewState,
) -> Option<String> {
    let original = block.text();
    let mut text = original.clone();
    let font = block_font(ui, &block.kind);

    let mut layouter = |ui: &egui::Ui, buf: &dyn egui::TextBuffer, wrap_width: f32| {
        // Marks only line up with the text they were taken from.
        let mut job = if buf.as_str() == original {
            block_layout_job(ui, block, &font)
        } else {
            egui::text::LayoutJob::simple(
                buf.as_str().to_owned(),
                font.clone(),
                ui.visuals().text_color(),
                wrap_width,
            )
        };
        job.wrap.max_width = wrap_width;
        ui.painter().layout_job(job)
    };

    let output = egui::TextEdit::multiline(&mut text)
        .id(egui::Id::new(("visual-block", idx)))
        .frame(false)
        .desired_rows(1)
        .desired_width(f32::INFINITY)
        .hint_text(if idx == 0 { "Type here" } else { "" })
        .layouter(&mut layouter)
        .show(ui);

    if state.request_focus == Some(idx) {
        output.response.request_focus();
        state.request_focus = None;
    }

    if output.response.has_focus() {
        state.focused = Some(idx);
        state.selection = output.state.cursor.char_range().map(|range| {
            let (a, b) = (range.primary.index, range.secondary.index);
            a.min(b)..a.max(b)
        });
    }

    output.response.changed().then_some(text)
}

fn block_font(ui: &egui::Ui, kind: &BlockKind) -> egui::FontId {
    let body = ui
        .style()
        .text_styles
        .get(&egui::TextStyle::Body)
        .cloned()
        .unwrap_or_else(|| egui::FontId::proportional(16.0));

    match kind {
        BlockKind::Heading(level) => {
            let scale = match level {
                1 => 1.8,
                2 => 1.5,
                3 => 1.25,
                _ => 1.1,
            };
            egui::FontId::proportional(body.size * scale)
        }
        BlockKind::CodeBlock { .. } => egui::FontId::monospace(body.size),
        _ => body,
    }
}

fn block_layout_job(ui: &egui::Ui, block: &Block, font: &egui::FontId) -> egui::text::LayoutJob {
    let mut job = egui::text::LayoutJob::default();
    let visuals = ui.visuals();
    let heading = matches!(block.kind, BlockKind::Heading(_));

    for span in &block.spans {
        let marks = span.marks;
        let mut format = egui::text::TextFormat {
            font_id: if marks.code {
                egui::FontId::monospace(font.size)
            } else {
                font.clone()
            },
            color: if marks.bold || heading {
                visuals.strong_text_color()
            } else {
                visuals.text_color()
            },
            italics: marks.italic || block.kind == BlockKind::Quote,
            ..Default::default()
        };
        if marks.code || matches!(block.kind, BlockKind::CodeBlock { .. }) {
            format.background = visuals.faint_bg_color;
        }
        if marks.strike {
            format.strikethrough = egui::Stroke::new(1.0, format.color);
        }
        job.append(&span.text, 0.0, format);
    }

    job
}

/// 1-based number of an ordered item within its run of siblings.
fn ordinal(doc: &RichDoc, idx: usize) -> usize {
    let Some(depth) = doc.blocks.get(idx).and_then(|b| b.kind.list_depth()) else {
        return 1;
    };

    let mut n = 1;
    for block in doc.blocks[..idx].iter().rev() {
        match block.kind {
            BlockKind::OrderedItem { depth: d } if d == depth => n += 1,
            BlockKind::BulletItem { depth: d } | BlockKind::OrderedItem { depth: d }
                if d > depth => {}
            _ => break,
        }
    }
    n
}

/// Block kinds offered for a block, keeping the list depth of list items.
fn kind_choices(current: &BlockKind) -> [BlockKind; 9] {
    let depth = current.list_depth().unwrap_or(0);
    let language = match current {
        BlockKind::CodeBlock { language } => language.clone(),
        _ => None,
    };
    [
        BlockKind::Paragraph,
        BlockKind::Heading(1),
        BlockKind::Heading(2),
        BlockKind::Heading(3),
        BlockKind::BulletItem { depth },
        BlockKind::OrderedItem { depth },
        BlockKind::Quote,
        BlockKind::CodeBlock { language },
        BlockKind::Rule,
    ]
}

fn indented(kind: &BlockKind, delta: isize) -> Option<BlockKind> {
    let depth = kind.list_depth()?.checked_add_signed(delta)?;
    if depth > MAX_LIST_DEPTH {
        return None;
    }
    match kind {
        BlockKind::BulletItem { .. } => Some(BlockKind::BulletItem { depth }),
        BlockKind::OrderedItem { .. } => Some(BlockKind::OrderedItem { depth }),
        _ => None,
    }
}
