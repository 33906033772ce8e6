#![forbid(unsafe_code)]
#![cfg_attr(
    all(not(debug_assertions), target_os = "windows"),
    windows_subsystem = "windows"
)]

#[cfg(target_arch = "wasm32")]
compile_error!("dualedit is a native desktop app; web/wasm builds are not supported.");

use std::{borrow::Cow, ffi::OsString, path::PathBuf};

use dualedit_core::{DEFAULT_DOCUMENT, Mode, Session, visual::VisualEditor};
use eframe::egui;
use tracing_subscriber::EnvFilter;

mod config;
mod highlight;
mod preview;
mod rich_view;
mod source;

use config::{Config, ConfigError};
use preview::PreviewCache;
use rich_view::RichViewState;
use source::SourceEditor;

const ZOOM_STEP: f32 = 0.1;
const MIN_ZOOM_FACTOR: f32 = 0.5;
const MAX_ZOOM_FACTOR: f32 = 3.0;

#[derive(Clone, Debug, PartialEq, Eq)]
struct LaunchOptions {
    /// Set only when a flag asked for it; the config decides otherwise.
    mode: Option<Mode>,
    path: Option<PathBuf>,
}

fn parse_launch_options<I, S>(args: I) -> LaunchOptions
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let mut mode = None;
    let mut path = None;

    for arg in args {
        let arg = arg.into();
        if arg == "-s" || arg == "--source" {
            mode = Some(Mode::Source);
            continue;
        }
        if arg == "--visual" {
            mode = Some(Mode::Visual);
            continue;
        }

        if path.is_none() {
            path = Some(PathBuf::from(arg));
        }
    }

    LaunchOptions { mode, path }
}

fn main() -> eframe::Result {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let launch_options = parse_launch_options(std::env::args_os().skip(1));
    let app = DualEditApp::new(launch_options, config::load());

    // Viewport sizes are in points, so they scale with the OS DPI factor.
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1024.0, 768.0])
            .with_min_inner_size([480.0, 320.0]),
        ..Default::default()
    };
    eframe::run_native("dualedit", options, Box::new(move |_cc| Ok(Box::new(app))))
}

struct DualEditApp {
    session: Session<VisualEditor, SourceEditor>,
    config: Config,
    path: Option<PathBuf>,
    rich_state: RichViewState,
    preview_cache: PreviewCache,
    error: Option<String>,
}

impl eframe::App for DualEditApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let (toggle_mode, zoom_in, zoom_out) = ctx.input(|i| {
            let cmd = i.modifiers.command;
            (
                cmd && i.key_pressed(egui::Key::Enter),
                cmd && i.key_pressed(egui::Key::Equals),
                cmd && i.key_pressed(egui::Key::Minus),
            )
        });

        if toggle_mode {
            self.set_mode(self.session.mode().toggle());
        }
        if zoom_in {
            adjust_zoom(ctx, ZOOM_STEP);
        }
        if zoom_out {
            adjust_zoom(ctx, -ZOOM_STEP);
        }

        egui::TopBottomPanel::top("modes").show(ctx, |ui| {
            ui.horizontal(|ui| {
                for mode in [Mode::Visual, Mode::Source] {
                    if ui
                        .selectable_label(self.session.mode() == mode, mode.label())
                        .clicked()
                    {
                        self.set_mode(mode);
                    }
                }
            });
        });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            let mut clear_error = false;

            ui.horizontal(|ui| {
                ui.label(format!("{} mode", self.session.mode().label()));
                ui.separator();
                ui.label(self.path_label());
                ui.separator();
                ui.label(format!(
                    "{} chars",
                    self.session.document().chars().count()
                ));

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if let Some(error) = self.error.as_deref() {
                        if ui.button("x").clicked() {
                            clear_error = true;
                        }
                        ui.colored_label(ui.visuals().error_fg_color, error);
                    }
                });
            });

            if clear_error {
                self.error = None;
            }
        });

        egui::TopBottomPanel::bottom("preview")
            .resizable(true)
            .min_height(120.0)
            .default_height(260.0)
            .show(ctx, |ui| self.show_preview(ui));

        egui::CentralPanel::default().show(ctx, |ui| match self.session.mode() {
            Mode::Visual => self.show_visual(ui),
            Mode::Source => self.show_source(ui),
        });

        self.update_viewport_title(ctx);
    }
}

impl DualEditApp {
    fn new(options: LaunchOptions, config: Result<Config, ConfigError>) -> Self {
        let mut error = None;
        let config = config.unwrap_or_else(|err| {
            tracing::warn!(%err, "using default config");
            error = Some(err.to_string());
            Config::default()
        });

        let mode = options
            .mode
            .or_else(|| config.start_mode().ok().flatten())
            .unwrap_or_default();

        let document = match options.path.as_deref() {
            Some(path) => dualedit_core::read_document(path).unwrap_or_else(|err| {
                tracing::warn!(path = %path.display(), %err, "failed to read seed file");
                error = Some(format!("Open failed: {err}"));
                DEFAULT_DOCUMENT.to_owned()
            }),
            None => DEFAULT_DOCUMENT.to_owned(),
        };

        let mut session = Session::new(document, mode);
        session.attach_visual(VisualEditor::default());
        tracing::info!(%mode, "editor ready");

        Self {
            session,
            config,
            path: options.path,
            rich_state: RichViewState::default(),
            preview_cache: PreviewCache::default(),
            error,
        }
    }

    /// Picking the active mode re-mounts it, so a click on the current tab
    /// re-syncs from the document.
    fn set_mode(&mut self, mode: Mode) {
        let changed = self.session.mode() != mode;
        self.session.switch_mode(mode);
        if changed {
            self.rich_state = RichViewState::default();
        }
    }

    fn title(&self) -> Cow<'_, str> {
        self.path
            .as_ref()
            .and_then(|path| path.file_name())
            .map_or_else(|| Cow::Borrowed("Untitled"), |name| name.to_string_lossy())
    }

    fn path_label(&self) -> Cow<'_, str> {
        self.path
            .as_ref()
            .map_or_else(|| Cow::Borrowed("New document"), |path| path.to_string_lossy())
    }

    fn update_viewport_title(&self, ctx: &egui::Context) {
        ctx.send_viewport_cmd(egui::ViewportCommand::Title(format!(
            "dualedit - {} ({})",
            self.title(),
            self.session.mode().label()
        )));
    }

    fn show_visual(&mut self, ui: &mut egui::Ui) {
        let changed = self
            .session
            .visual_mut()
            .is_some_and(|editor| rich_view::show(ui, editor, &mut self.rich_state));
        if changed {
            self.session.on_visual_change();
        }
    }

    fn show_source(&mut self, ui: &mut egui::Ui) {
        let Some(source) = self.session.source_mut() else {
            return;
        };
        if !source.show(ui, &self.config.source) {
            return;
        }
        let value = source.reported_value().map(str::to_owned);
        self.session.on_source_change(value.as_deref());
    }

    fn show_preview(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.strong("Live preview");
            ui.label(egui::RichText::new(format!("rev {}", self.session.revision())).weak());
        });
        ui.separator();

        let rendered = self.session.preview();
        let doc = self
            .preview_cache
            .get(rendered.revision(), rendered.fragment());

        egui::ScrollArea::vertical()
            .id_salt("preview-scroll")
            .auto_shrink([false; 2])
            .show(ui, |ui| preview::show(ui, doc));
    }
}

fn adjust_zoom(ctx: &egui::Context, delta: f32) {
    let zoom = (ctx.zoom_factor() + delta).clamp(MIN_ZOOM_FACTOR, MAX_ZOOM_FACTOR);
    ctx.set_zoom_factor(zoom);
}

#[cfg(test)]
mod tests {
    use dualedit_core::SourceSurface;

    use super::*;

    fn parse(args: &[&str]) -> LaunchOptions {
        parse_launch_options(args.iter().copied().map(OsString::from))
    }

    #[test]
    fn parse_launch_options_parses_modes_and_paths() {
        let cases = [
            (&[][..], None, None),
            (&["-s"][..], Some(Mode::Source), None),
            (&["--source"][..], Some(Mode::Source), None),
            (&["-s", "--visual"][..], Some(Mode::Visual), None),
            (
                &["page.html", "other.html"][..],
                None,
                Some("page.html"),
            ),
            (&["-s", "page.html"][..], Some(Mode::Source), Some("page.html")),
        ];

        for (args, mode, path) in cases {
            let options = parse(args);
            assert_eq!(options.mode, mode);
            assert_eq!(options.path.as_deref(), path.map(PathBuf::from).as_deref());
        }
    }

    fn launch(args: &[&str], config: Result<Config, ConfigError>) -> DualEditApp {
        DualEditApp::new(parse(args), config)
    }

    #[test]
    fn starts_visual_with_the_default_document() {
        let app = launch(&[], Ok(Config::default()));
        assert_eq!(app.session.mode(), Mode::Visual);
        assert_eq!(app.session.document(), DEFAULT_DOCUMENT);
        assert!(app.session.visual().is_some());
        assert!(app.error.is_none());
    }

    #[test]
    fn flag_wins_over_configured_start_mode() {
        let config = Config {
            start_mode: Some("source".to_owned()),
            ..Config::default()
        };
        let app = launch(&[], Ok(config.clone()));
        assert_eq!(app.session.mode(), Mode::Source);
        let app = launch(&["--visual"], Ok(config));
        assert_eq!(app.session.mode(), Mode::Visual);
    }

    #[test]
    fn config_errors_fall_back_to_defaults_and_are_shown() {
        let err = ConfigError::Mode(dualedit_core::Error::UnknownMode("split".to_owned()));
        let app = launch(&["-s"], Err(err));
        assert_eq!(app.config, Config::default());
        assert_eq!(app.session.mode(), Mode::Source);
        assert!(app.error.as_deref().is_some_and(|e| e.contains("split")));
    }

    #[test]
    fn unreadable_seed_file_is_reported() {
        let missing = std::env::temp_dir().join("dualedit-missing-seed-file.html");
        let path = missing.to_string_lossy().into_owned();
        let app = launch(&[path.as_str()], Ok(Config::default()));
        assert_eq!(app.session.document(), DEFAULT_DOCUMENT);
        assert!(app.error.as_deref().is_some_and(|e| e.starts_with("Open failed")));
    }

    #[test]
    fn seed_file_content_reaches_source_mode_verbatim() {
        let path = std::env::temp_dir().join(format!(
            "dualedit-seed-{}.html",
            std::process::id()
        ));
        std::fs::write(&path, "<p>seed <b>text</b></p>").ok();
        let arg = path.to_string_lossy().into_owned();
        let app = launch(&["-s", arg.as_str()], Ok(Config::default()));
        assert_eq!(
            app.session.source().map(SourceSurface::buffer),
            Some("<p>seed <b>text</b></p>")
        );
        assert!(app.title().starts_with("dualedit-seed-"));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn mode_round_trip_keeps_source_edits() {
        let mut app = launch(&["-s"], Ok(Config::default()));
        app.session.on_source_change(Some("<p>edited</p>"));
        app.set_mode(Mode::Visual);
        app.set_mode(Mode::Source);
        assert_eq!(
            app.session.source().map(SourceSurface::buffer),
            Some("<p>edited</p>")
        );
        assert_eq!(app.session.preview().plain_text().trim(), "edited");
    }

    #[test]
    fn picking_the_active_source_mode_resyncs_from_the_visual_model() {
        let mut app = launch(&["-s"], Ok(Config::default()));
        app.session.on_source_change(Some("<b>raw</b>"));
        let revision = app.session.revision();
        app.set_mode(Mode::Source);
        assert_eq!(app.session.mode(), Mode::Source);
        assert_eq!(app.session.revision(), revision + 1);
        assert_eq!(
            app.session.source().map(SourceSurface::buffer),
            Some("<p><strong>raw</strong></p>")
        );
    }

    #[test]
    fn emptied_source_clears_document_and_preview() {
        let mut app = launch(&["--source"], Ok(Config::default()));
        let value = {
            let Some(source) = app.session.source_mut() else {
                panic!("source surface should be mounted");
            };
            *source = SourceEditor::mount("");
            source.reported_value().map(str::to_owned)
        };
        app.session.on_source_change(value.as_deref());
        assert_eq!(app.session.document(), "");
        assert!(app.session.preview().fragment().nodes.is_empty());
    }
}
