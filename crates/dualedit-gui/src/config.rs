#![forbid(unsafe_code)]

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use dualedit_core::Mode;
use serde::Deserialize;
use thiserror::Error;

const MIN_FONT_SIZE: f32 = 8.0;
const MAX_FONT_SIZE: f32 = 48.0;

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Mode(#[from] dualedit_core::Error),
}

/// Settings read from `config.toml`. Every field has a default, so a missing
/// file and an empty file behave the same.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub(crate) struct Config {
    /// `"visual"` or `"source"`/`"html"`.
    pub(crate) start_mode: Option<String>,
    pub(crate) source: SourceOptions,
}

impl Config {
    pub(crate) fn start_mode(&self) -> Result<Option<Mode>, ConfigError> {
        self.start_mode
            .as_deref()
            .map(str::parse::<Mode>)
            .transpose()
            .map_err(ConfigError::from)
    }
}

/// Options for the HTML source editor. None of them affect how the document
/// is synchronized.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub(crate) struct SourceOptions {
    pub(crate) language: String,
    pub(crate) theme: SourceTheme,
    pub(crate) minimap: bool,
    pub(crate) font_size: f32,
    pub(crate) word_wrap: bool,
    pub(crate) scroll_beyond_last_line: bool,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            language: "html".to_owned(),
            theme: SourceTheme::Light,
            minimap: false,
            font_size: 16.0,
            word_wrap: true,
            scroll_beyond_last_line: false,
        }
    }
}

impl SourceOptions {
    pub(crate) fn highlights(&self) -> bool {
        self.language.eq_ignore_ascii_case("html")
    }

    fn clamped(mut self) -> Self {
        if !self.font_size.is_finite() {
            self.font_size = Self::default().font_size;
        }
        self.font_size = self.font_size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
        self
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
pub(crate) enum SourceTheme {
    #[default]
    #[serde(rename = "vs-light", alias = "light")]
    Light,
    #[serde(rename = "vs-dark", alias = "dark")]
    Dark,
}

pub(crate) fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("dualedit").join("config.toml"))
}

/// Load the user config. A missing file yields the defaults.
pub(crate) fn load() -> Result<Config, ConfigError> {
    match config_path() {
        Some(path) => load_from(&path),
        None => Ok(Config::default()),
    }
}

pub(crate) fn load_from(path: &Path) -> Result<Config, ConfigError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Config::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let config = parse(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    // Surface a bad mode name now rather than at launch.
    config.start_mode()?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}

pub(crate) fn parse(text: &str) -> Result<Config, toml::de::Error> {
    let mut config: Config = toml::from_str(text)?;
    config.source = config.source.clamped();
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_temp_dir(name: &str) -> PathBuf {
        let mut dir = std::env::temp_dir();
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::SystemTime::UNIX_EPOCH)
            .map_or(0, |d| d.as_nanos());
        dir.push(format!("{name}-{nanos}-{}", std::process::id()));
        let _ = fs::create_dir_all(&dir);
        dir
    }

    #[test]
    fn empty_config_is_default() {
        let config = parse("");
        assert_eq!(config.ok(), Some(Config::default()));
    }

    #[test]
    fn parses_source_options() {
        let text = r#"
start_mode = "html"

[source]
theme = "vs-dark"
minimap = true
font_size = 14
word_wrap = false
"#;
        let Ok(config) = parse(text) else {
            panic!("config should parse");
        };
        assert_eq!(config.start_mode().ok().flatten(), Some(Mode::Source));
        assert_eq!(config.source.theme, SourceTheme::Dark);
        assert!(config.source.minimap);
        assert!((config.source.font_size - 14.0).abs() < f32::EPSILON);
        assert!(!config.source.word_wrap);
        assert!(!config.source.scroll_beyond_last_line);
        assert!(config.source.highlights());
    }

    #[test]
    fn font_size_is_clamped() {
        let Ok(config) = parse("[source]\nfont_size = 400.0\n") else {
            panic!("config should parse");
        };
        assert!((config.source.font_size - MAX_FONT_SIZE).abs() < f32::EPSILON);
    }

    #[test]
    fn unknown_theme_is_a_parse_error() {
        assert!(parse("[source]\ntheme = \"solarized\"\n").is_err());
    }

    #[test]
    fn unknown_start_mode_is_rejected() {
        let Ok(config) = parse("start_mode = \"split\"\n") else {
            panic!("config should parse");
        };
        assert!(matches!(config.start_mode(), Err(ConfigError::Mode(_))));
    }

    #[test]
    fn load_from_missing_file_is_default() {
        let dir = make_temp_dir("dualedit-config-missing");
        let result = load_from(&dir.join("config.toml"));
        assert_eq!(result.ok(), Some(Config::default()));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn load_from_reports_parse_errors_with_path() {
        let dir = make_temp_dir("dualedit-config-bad");
        let path = dir.join("config.toml");
        fs::write(&path, "[source\n").ok();
        let result = load_from(&path);
        let Err(err) = result else {
            panic!("expected parse error");
        };
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("config.toml"));
        let _ = fs::remove_dir_all(&dir);
    }
}
