#![forbid(unsafe_code)]

use eframe::egui;

use crate::config::{SourceOptions, SourceTheme};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RunKind {
    Text,
    Punct,
    TagName,
    AttrName,
    AttrValue,
    Comment,
    Entity,
}

#[derive(Clone, Copy, Debug, Default)]
struct PendingRun {
    kind: Option<RunKind>,
    start: usize,
    end: usize,
}

/// Colors for the source editor, one set per theme.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Palette {
    pub(crate) background: egui::Color32,
    pub(crate) text: egui::Color32,
    punct: egui::Color32,
    tag: egui::Color32,
    attr_name: egui::Color32,
    attr_value: egui::Color32,
    comment: egui::Color32,
    entity: egui::Color32,
}

impl Palette {
    pub(crate) const fn for_theme(theme: SourceTheme) -> Self {
        match theme {
            SourceTheme::Light => Self {
                background: egui::Color32::from_rgb(0xFF, 0xFF, 0xFE),
                text: egui::Color32::from_rgb(0x00, 0x00, 0x00),
                punct: egui::Color32::from_rgb(0x80, 0x00, 0x00),
                tag: egui::Color32::from_rgb(0x80, 0x00, 0x00),
                attr_name: egui::Color32::from_rgb(0xE5, 0x00, 0x00),
                attr_value: egui::Color32::from_rgb(0x00, 0x00, 0xFF),
                comment: egui::Color32::from_rgb(0x00, 0x80, 0x00),
                entity: egui::Color32::from_rgb(0x6A, 0x1B, 0x9A),
            },
            SourceTheme::Dark => Self {
                background: egui::Color32::from_rgb(0x1E, 0x1E, 0x1E),
                text: egui::Color32::from_rgb(0xD4, 0xD4, 0xD4),
                punct: egui::Color32::from_rgb(0x80, 0x80, 0x80),
                tag: egui::Color32::from_rgb(0x56, 0x9C, 0xD6),
                attr_name: egui::Color32::from_rgb(0x9C, 0xDC, 0xFE),
                attr_value: egui::Color32::from_rgb(0xCE, 0x91, 0x78),
                comment: egui::Color32::from_rgb(0x6A, 0x99, 0x55),
                entity: egui::Color32::from_rgb(0xBD, 0x93, 0xF9),
            },
        }
    }

    const fn color(&self, kind: RunKind) -> egui::Color32 {
        match kind {
            RunKind::Text => self.text,
            RunKind::Punct => self.punct,
            RunKind::TagName => self.tag,
            RunKind::AttrName => self.attr_name,
            RunKind::AttrValue => self.attr_value,
            RunKind::Comment => self.comment,
            RunKind::Entity => self.entity,
        }
    }
}

struct Runs<'a> {
    job: egui::text::LayoutJob,
    source: &'a str,
    pending: PendingRun,
    palette: &'a Palette,
    font: egui::FontId,
}

impl Runs<'_> {
    fn push(&mut self, kind: RunKind, start: usize, end: usize) {
        if start >= end {
            return;
        }
        match self.pending.kind {
            Some(existing) if existing == kind && self.pending.end == start => {
                self.pending.end = end;
            }
            _ => {
                self.flush();
                self.pending = PendingRun {
                    kind: Some(kind),
                    start,
                    end,
                };
            }
        }
    }

    fn flush(&mut self) {
        let Some(kind) = self.pending.kind else {
            return;
        };
        if self.pending.start < self.pending.end && self.pending.end <= self.source.len() {
            let format = egui::TextFormat::simple(self.font.clone(), self.palette.color(kind));
            self.job.append(
                &self.source[self.pending.start..self.pending.end],
                0.0,
                format,
            );
        }
        self.pending.kind = None;
    }
}

/// Length of a character reference starting at `&`, if it looks like one.
fn entity_len(bytes: &[u8]) -> Option<usize> {
    let end = bytes.iter().take(12).position(|b| *b == b';')?;
    let body = &bytes[1..end];
    let valid = !body.is_empty()
        && body
            .iter()
            .enumerate()
            .all(|(idx, b)| b.is_ascii_alphanumeric() || (idx == 0 && *b == b'#'));
    valid.then_some(end + 1)
}

fn opens_tag(bytes: &[u8]) -> bool {
    match bytes.get(1) {
        Some(b) if b.is_ascii_alphabetic() => true,
        Some(b'/' | b'!' | b'?') => true,
        _ => false,
    }
}

#[must_use]
pub(crate) fn html_layout_job(
    palette: &Palette,
    source: &str,
    options: &SourceOptions,
) -> egui::text::LayoutJob {
    let font = egui::FontId::monospace(options.font_size);
    let mut runs = Runs {
        job: egui::text::LayoutJob {
            text: String::with_capacity(source.len()),
            ..Default::default()
        },
        source,
        pending: PendingRun::default(),
        palette,
        font,
    };

    if !options.highlights() {
        runs.push(RunKind::Text, 0, source.len());
        runs.flush();
        return runs.job;
    }

    let bytes = source.as_bytes();
    let len = bytes.len();
    let mut i = 0usize;
    while i < len {
        let rest = &bytes[i..];
        if rest.starts_with(b"<!--") {
            let end = source[i + 4..].find("-->").map_or(len, |idx| i + 4 + idx + 3);
            runs.push(RunKind::Comment, i, end);
            i = end;
            continue;
        }

        if rest[0] == b'<' && opens_tag(rest) {
            let mut j = i + 1;
            if matches!(bytes.get(j), Some(b'/' | b'!' | b'?')) {
                j += 1;
            }
            runs.push(RunKind::Punct, i, j);
            let name_start = j;
            while j < len && !bytes[j].is_ascii_whitespace() && !matches!(bytes[j], b'>' | b'/') {
                j += 1;
            }
            runs.push(RunKind::TagName, name_start, j);

            while j < len {
                match bytes[j] {
                    b'>' => {
                        runs.push(RunKind::Punct, j, j + 1);
                        j += 1;
                        break;
                    }
                    b'/' | b'=' => {
                        runs.push(RunKind::Punct, j, j + 1);
                        j += 1;
                    }
                    quote @ (b'"' | b'\'') => {
                        let end = bytes[j + 1..]
                            .iter()
                            .position(|b| *b == quote)
                            .map_or(len, |idx| j + 1 + idx + 1);
                        runs.push(RunKind::AttrValue, j, end);
                        j = end;
                    }
                    b if b.is_ascii_whitespace() => {
                        let start = j;
                        while j < len && bytes[j].is_ascii_whitespace() {
                            j += 1;
                        }
                        runs.push(RunKind::Text, start, j);
                    }
                    _ => {
                        let start = j;
                        while j < len
                            && !bytes[j].is_ascii_whitespace()
                            && !matches!(bytes[j], b'=' | b'>' | b'/' | b'"' | b'\'')
                        {
                            j += 1;
                        }
                        runs.push(RunKind::AttrName, start, j);
                    }
                }
            }
            i = j;
            continue;
        }

        if rest[0] == b'&'
            && let Some(entity) = entity_len(rest)
        {
            runs.push(RunKind::Entity, i, i + entity);
            i += entity;
            continue;
        }

        // Plain text runs up to the next byte that could start markup.
        let start = i;
        i += 1;
        while i < len && !matches!(bytes[i], b'<' | b'&') {
            i += 1;
        }
        runs.push(RunKind::Text, start, i);
    }

    runs.flush();
    runs.job
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section_for_snippet<'a>(
        job: &'a egui::text::LayoutJob,
        snippet: &str,
    ) -> &'a egui::text::LayoutSection {
        let start = job.text.find(snippet);
        assert!(
            start.is_some(),
            "Expected snippet '{snippet}' in rendered text"
        );
        let start = start.unwrap_or_else(|| unreachable!());
        let end = start + snippet.len();
        let section = job
            .sections
            .iter()
            .find(|section| section.byte_range.start <= start && section.byte_range.end >= end);
        assert!(
            section.is_some(),
            "Expected section for snippet '{snippet}'"
        );
        section.unwrap_or_else(|| unreachable!())
    }

    fn job(source: &str) -> (Palette, egui::text::LayoutJob) {
        let options = SourceOptions::default();
        let palette = Palette::for_theme(options.theme);
        let job = html_layout_job(&palette, source, &options);
        (palette, job)
    }

    #[test]
    fn html_layout_job_keeps_every_byte_of_the_source() {
        let source = "<p class=\"a\">x &amp; y</p><!-- c --> 1 < 2 <br/>é";
        let (_, job) = job(source);
        assert_eq!(job.text, source);
    }

    #[test]
    fn html_layout_job_colors_tags_attributes_and_values() {
        let (palette, job) = job("<a href=\"x.html\" target=_blank>link</a>");
        assert_eq!(section_for_snippet(&job, "a").format.color, palette.tag);
        assert_eq!(
            section_for_snippet(&job, "href").format.color,
            palette.attr_name
        );
        assert_eq!(
            section_for_snippet(&job, "\"x.html\"").format.color,
            palette.attr_value
        );
        assert_eq!(section_for_snippet(&job, "link").format.color, palette.text);
    }

    #[test]
    fn html_layout_job_marks_comments_and_entities() {
        let (palette, job) = job("a &lt; b <!-- <p>not a tag</p> -->");
        assert_eq!(
            section_for_snippet(&job, "<p>not a tag</p>").format.color,
            palette.comment
        );
        assert_eq!(section_for_snippet(&job, "&lt;").format.color, palette.entity);
    }

    #[test]
    fn html_layout_job_plain_when_language_is_not_html() {
        let options = SourceOptions {
            language: "plaintext".to_owned(),
            ..SourceOptions::default()
        };
        let palette = Palette::for_theme(options.theme);
        let job = html_layout_job(&palette, "<p>x</p>", &options);
        assert_eq!(job.sections.len(), 1);
        assert_eq!(job.sections[0].format.color, palette.text);
    }

    #[test]
    fn html_layout_job_uses_configured_font_size() {
        let options = SourceOptions {
            font_size: 20.0,
            ..SourceOptions::default()
        };
        let palette = Palette::for_theme(options.theme);
        let job = html_layout_job(&palette, "<p>x</p>", &options);
        assert!(job
            .sections
            .iter()
            .all(|s| s.format.font_id == egui::FontId::monospace(20.0)));
    }
}
