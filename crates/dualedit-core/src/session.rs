//! The document of record and the synchronization between the two editing
//! surfaces and the preview.
//!
//! A [`Session`] owns the document string. Exactly one surface is mounted at
//! a time; its change listener is the only writer while it is mounted, and
//! every write re-renders the preview before any subscriber runs.

use std::{fmt, str::FromStr};

use crate::{Error, preview::Preview};

/// Which surface is mounted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Visual,
    Source,
}

impl Mode {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Visual => "Visual",
            Self::Source => "HTML",
        }
    }

    #[must_use]
    pub const fn toggle(self) -> Self {
        match self {
            Self::Visual => Self::Source,
            Self::Source => Self::Visual,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Visual => "visual",
            Self::Source => "source",
        })
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "visual" => Ok(Self::Visual),
            "source" | "html" => Ok(Self::Source),
            _ => Err(Error::UnknownMode(s.to_owned())),
        }
    }
}

/// A rich-text surface with its own document model, crossed only at the
/// HTML boundary.
pub trait VisualSurface {
    /// Serialize the current model.
    fn to_html(&self) -> String;

    /// Replace the model wholesale. Any undo history is discarded. Must not
    /// report a change back to the session.
    fn set_content(&mut self, html: &str);
}

/// A plain-text surface editing the HTML string directly.
pub trait SourceSurface {
    /// Build a freshly mounted surface showing `buffer`.
    fn mount(buffer: &str) -> Self;

    fn buffer(&self) -> &str;
}

type Observer = Box<dyn FnMut(&str)>;

pub struct Session<V, S> {
    document: String,
    mode: Mode,
    visual: Option<V>,
    source: Option<S>,
    preview: Preview,
    revision: u64,
    observers: Vec<Observer>,
}

impl<V: VisualSurface, S: SourceSurface> Session<V, S> {
    /// Start a session in `mode` with `document`. The visual surface is not
    /// present until [`Session::attach_visual`].
    pub fn new(document: impl Into<String>, mode: Mode) -> Self {
        let mut session = Self {
            document: document.into(),
            mode,
            visual: None,
            source: None,
            preview: Preview::default(),
            revision: 0,
            observers: Vec::new(),
        };
        session.preview.render(&session.document, session.revision);
        session.mount();
        session
    }

    /// Install the visual surface, initialized from the current document.
    pub fn attach_visual(&mut self, mut visual: V) {
        visual.set_content(&self.document);
        self.visual = Some(visual);
    }

    #[must_use]
    pub fn document(&self) -> &str {
        &self.document
    }

    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// Bumped on every document write.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    #[must_use]
    pub const fn preview(&self) -> &Preview {
        &self.preview
    }

    /// The visual surface, whether mounted or not.
    #[must_use]
    pub const fn visual(&self) -> Option<&V> {
        self.visual.as_ref()
    }

    /// The visual surface, only while it is mounted and present.
    pub fn visual_mut(&mut self) -> Option<&mut V> {
        match self.mode {
            Mode::Visual => self.visual.as_mut(),
            Mode::Source => None,
        }
    }

    #[must_use]
    pub const fn source(&self) -> Option<&S> {
        self.source.as_ref()
    }

    pub fn source_mut(&mut self) -> Option<&mut S> {
        self.source.as_mut()
    }

    /// Register a listener called with the new document after every write.
    pub fn subscribe(&mut self, observer: impl FnMut(&str) + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Switch the mounted surface.
    ///
    /// A switch to source mode captures the visual surface's HTML first,
    /// even when source mode is already active. Switching to the active mode
    /// re-mounts it from the document.
    pub fn switch_mode(&mut self, target: Mode) {
        if target == Mode::Source
            && let Some(html) = self.visual.as_ref().map(VisualSurface::to_html)
        {
            self.commit(html);
        }

        tracing::debug!(from = %self.mode, to = %target, "switching editor mode");
        self.mode = target;
        self.mount();
    }

    /// [`Session::switch_mode`] for a mode named at runtime. Unknown names
    /// are rejected without touching the session.
    pub fn switch_mode_named(&mut self, name: &str) -> crate::Result<()> {
        let mode = name.parse()?;
        self.switch_mode(mode);
        Ok(())
    }

    /// Change listener for the visual surface. Overwrites the document with
    /// the surface's HTML on every call.
    pub fn on_visual_change(&mut self) {
        if self.mode != Mode::Visual {
            return;
        }
        let Some(html) = self.visual.as_ref().map(VisualSurface::to_html) else {
            return;
        };
        self.commit(html);
    }

    /// Change listener for the source surface. `None` is the surface saying
    /// it has no content, and empties the document.
    ///
    /// The value is also pushed into the (unmounted) visual surface so it is
    /// current when visual mode comes back.
    pub fn on_source_change(&mut self, value: Option<&str>) {
        if self.mode != Mode::Source {
            return;
        }
        let value = value.unwrap_or_default();
        self.commit(value.to_owned());
        if let Some(visual) = self.visual.as_mut() {
            visual.set_content(value);
        }
    }

    fn mount(&mut self) {
        match self.mode {
            Mode::Visual => {
                self.source = None;
                if let Some(visual) = self.visual.as_mut() {
                    visual.set_content(&self.document);
                }
            }
            Mode::Source => self.source = Some(S::mount(&self.document)),
        }
    }

    fn commit(&mut self, document: String) {
        self.document = document;
        self.revision += 1;
        self.preview.render(&self.document, self.revision);
        tracing::trace!(
            revision = self.revision,
            len = self.document.len(),
            "document updated"
        );
        for observer in &mut self.observers {
            observer(&self.document);
        }
    }
}

impl<V, S> fmt::Debug for Session<V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("mode", &self.mode)
            .field("revision", &self.revision)
            .field("document_len", &self.document.len())
            .field("visual", &self.visual.is_some())
            .field("source", &self.source.is_some())
            .finish_non_exhaustive()
    }
}
