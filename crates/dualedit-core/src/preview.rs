//! The preview sink. It holds the parse of the current document and nothing
//! else; drawing is the GUI's job.

use crate::html::{self, Fragment};

#[derive(Clone, Debug, Default)]
pub struct Preview {
    fragment: Fragment,
    revision: u64,
}

impl Preview {
    /// Re-render from `document`. No escaping or filtering: the document is
    /// trusted markup.
    pub fn render(&mut self, document: &str, revision: u64) {
        self.fragment = html::parse(document);
        self.revision = revision;
    }

    #[must_use]
    pub const fn fragment(&self) -> &Fragment {
        &self.fragment
    }

    /// Revision of the document this preview was rendered from.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    #[must_use]
    pub fn plain_text(&self) -> String {
        html::plain_text(&self.fragment)
    }
}
