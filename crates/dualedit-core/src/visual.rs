//! The visual surface's editing model: a [`RichDoc`] plus its own
//! undo/redo history.

use crate::{rich::RichDoc, session::VisualSurface};

const HISTORY_LIMIT: usize = 200;

#[derive(Clone, Debug, Default)]
pub struct VisualEditor {
    doc: RichDoc,
    undo: Vec<RichDoc>,
    redo: Vec<RichDoc>,
}

impl VisualEditor {
    #[must_use]
    pub fn new(html: &str) -> Self {
        Self {
            doc: RichDoc::from_html(html),
            undo: Vec::new(),
            redo: Vec::new(),
        }
    }

    #[must_use]
    pub const fn doc(&self) -> &RichDoc {
        &self.doc
    }

    /// Apply an edit. A history snapshot is kept only when `edit` reports a
    /// change.
    pub fn edit(&mut self, edit: impl FnOnce(&mut RichDoc) -> bool) -> bool {
        let before = self.doc.clone();
        if !edit(&mut self.doc) {
            return false;
        }
        if self.undo.len() == HISTORY_LIMIT {
            self.undo.remove(0);
        }
        self.undo.push(before);
        self.redo.clear();
        true
    }

    pub fn undo(&mut self) -> bool {
        let Some(prev) = self.undo.pop() else {
            return false;
        };
        self.redo.push(std::mem::replace(&mut self.doc, prev));
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(next) = self.redo.pop() else {
            return false;
        };
        self.undo.push(std::mem::replace(&mut self.doc, next));
        true
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }
}

impl VisualSurface for VisualEditor {
    fn to_html(&self) -> String {
        self.doc.to_html()
    }

    fn set_content(&mut self, html: &str) {
        self.doc = RichDoc::from_html(html);
        self.undo.clear();
        self.redo.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edits_are_undoable_and_redoable() {
        let mut editor = VisualEditor::new("<p>a</p>");
        assert!(editor.edit(|doc| doc.blocks[0].replace_text("ab")));
        assert!(editor.can_undo());
        assert_eq!(editor.to_html(), "<p>ab</p>");

        assert!(editor.undo());
        assert_eq!(editor.to_html(), "<p>a</p>");
        assert!(editor.can_redo());
        assert!(editor.redo());
        assert_eq!(editor.to_html(), "<p>ab</p>");
        assert!(!editor.redo());
    }

    #[test]
    fn unchanged_edits_leave_no_history() {
        let mut editor = VisualEditor::new("<p>a</p>");
        assert!(!editor.edit(|doc| doc.blocks[0].replace_text("a")));
        assert!(!editor.can_undo());
    }

    #[test]
    fn new_edit_clears_redo() {
        let mut editor = VisualEditor::new("<p>a</p>");
        editor.edit(|doc| doc.blocks[0].replace_text("b"));
        editor.undo();
        editor.edit(|doc| doc.blocks[0].replace_text("c"));
        assert!(!editor.can_redo());
    }

    #[test]
    fn set_content_replaces_model_and_resets_history() {
        let mut editor = VisualEditor::new("<p>a</p>");
        editor.edit(|doc| doc.blocks[0].replace_text("b"));
        editor.set_content("<h1>new</h1>");
        assert_eq!(editor.to_html(), "<h1>new</h1>");
        assert!(!editor.can_undo());
        assert!(!editor.can_redo());
    }

    #[test]
    fn history_is_bounded() {
        let mut editor = VisualEditor::new("<p></p>");
        for n in 0..(HISTORY_LIMIT + 10) {
            editor.edit(|doc| doc.blocks[0].replace_text(&n.to_string()));
        }
        let mut undone = 0;
        while editor.undo() {
            undone += 1;
        }
        assert_eq!(undone, HISTORY_LIMIT);
    }
}
