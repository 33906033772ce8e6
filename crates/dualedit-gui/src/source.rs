#![forbid(unsafe_code)]

use dualedit_core::SourceSurface;
use eframe::egui;

use crate::{
    config::SourceOptions,
    highlight::{self, Palette},
};

const MINIMAP_WIDTH: f32 = 96.0;
const MINIMAP_FONT_SIZE: f32 = 3.0;
const MINIMAP_MAX_LINES: usize = 2_000;

/// The HTML source surface: a highlighted plain-text buffer.
///
/// Built on mount and dropped on unmount, so nothing here outlives a trip
/// through visual mode.
#[derive(Debug)]
pub(crate) struct SourceEditor {
    buffer: String,
}

impl SourceSurface for SourceEditor {
    fn mount(buffer: &str) -> Self {
        Self {
            buffer: buffer.to_owned(),
        }
    }

    fn buffer(&self) -> &str {
        &self.buffer
    }
}

impl SourceEditor {
    /// The value this widget reports to its change listener. An emptied
    /// buffer reports no content at all.
    pub(crate) fn reported_value(&self) -> Option<&str> {
        (!self.buffer.is_empty()).then_some(self.buffer.as_str())
    }

    /// Draw the editor. Returns `true` when the buffer changed this frame.
    pub(crate) fn show(&mut self, ui: &mut egui::Ui, options: &SourceOptions) -> bool {
        let palette = Palette::for_theme(options.theme);
        let mut changed = false;

        egui::Frame::new()
            .fill(palette.background)
            .inner_margin(egui::Margin::same(6))
            .show(ui, |ui| {
                ui.horizontal_top(|ui| {
                    let minimap_width = if options.minimap { MINIMAP_WIDTH } else { 0.0 };
                    let editor_width = (ui.available_width() - minimap_width).max(120.0);
                    let height = ui.available_height();

                    egui::ScrollArea::both()
                        .id_salt("source-scroll")
                        .max_width(editor_width)
                        .max_height(height)
                        .auto_shrink([false; 2])
                        .show(ui, |ui| {
                            let mut layouter =
                                |ui: &egui::Ui, buf: &dyn egui::TextBuffer, wrap_width: f32| {
                                    let mut job =
                                        highlight::html_layout_job(&palette, buf.as_str(), options);
                                    job.wrap.max_width = if options.word_wrap {
                                        wrap_width
                                    } else {
                                        f32::INFINITY
                                    };
                                    ui.painter().layout_job(job)
                                };

                            let output = egui::TextEdit::multiline(&mut self.buffer)
                                .id(egui::Id::new("source-editor"))
                                .code_editor()
                                .frame(false)
                                .desired_width(if options.word_wrap {
                                    editor_width
                                } else {
                                    f32::INFINITY
                                })
                                .desired_rows(20)
                                .text_color(palette.text)
                                .layouter(&mut layouter)
                                .show(ui);
                            changed = output.response.changed();

                            if options.scroll_beyond_last_line {
                                ui.add_space(height * 0.8);
                            }
                        });

                    if options.minimap {
                        show_minimap(ui, &self.buffer, &palette);
                    }
                });
            });

        changed
    }
}

fn show_minimap(ui: &mut egui::Ui, buffer: &str, palette: &Palette) {
    let mut overview = String::with_capacity(buffer.len().min(64 * 1024));
    for line in buffer.lines().take(MINIMAP_MAX_LINES) {
        overview.push_str(line);
        overview.push('\n');
    }

    ui.vertical(|ui| {
        ui.set_width(MINIMAP_WIDTH);
        ui.add(
            egui::Label::new(
                egui::RichText::new(overview)
                    .monospace()
                    .size(MINIMAP_FONT_SIZE)
                    .color(palette.text.gamma_multiply(0.6)),
            )
            .truncate(),
        );
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mount_copies_the_document() {
        let editor = SourceEditor::mount("<p>x</p>");
        assert_eq!(editor.buffer(), "<p>x</p>");
    }

    #[test]
    fn empty_buffer_reports_no_content() {
        let mut editor = SourceEditor::mount("<p>x</p>");
        assert_eq!(editor.reported_value(), Some("<p>x</p>"));
        editor.buffer.clear();
        assert_eq!(editor.reported_value(), None);
    }
}
