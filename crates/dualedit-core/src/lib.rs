#![forbid(unsafe_code)]

//! Shared logic for `dualedit` (GUI + CLI).
//!
//! One HTML document, two editing surfaces and a live preview. The
//! [`session::Session`] owns the document and keeps the surfaces and the
//! preview in step; everything toolkit-specific lives in the GUI crate.

pub mod error;
pub mod html;
pub mod preview;
pub mod rich;
pub mod session;
pub mod visual;

pub use error::{Error, Result};
pub use session::{Mode, Session, SourceSurface, VisualSurface};

/// Content a new editor starts with.
pub const DEFAULT_DOCUMENT: &str = "<h2>This is a visual/HTML dual-mode editor</h2>\
<p>Type here, or switch to HTML mode to edit the source directly.</p>";

/// Hard cap on seed files we will load into memory.
pub const MAX_FILE_BYTES: u64 = 64 * 1024 * 1024;

/// Read a seed document, refusing files over [`MAX_FILE_BYTES`].
pub fn read_document(path: &std::path::Path) -> Result<String> {
    let len = std::fs::metadata(path)?.len();
    if len > MAX_FILE_BYTES {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("{} is larger than {MAX_FILE_BYTES} bytes", path.display()),
        )
        .into());
    }
    Ok(std::fs::read_to_string(path)?)
}
