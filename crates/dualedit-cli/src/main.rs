#![forbid(unsafe_code)]

use std::{
    fmt,
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::Context;
use clap::{Parser, Subcommand};
use dualedit_core::{html, rich::RichDoc};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "dualedit-cli",
    about = "Inspect HTML the way the dual-mode editor sees it",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render HTML to a plain-text preview and print to stdout.
    Preview {
        /// Path to an HTML file. Use `-` to read from stdin.
        path: PathBuf,
    },
    /// Print the HTML the visual editor would write back for this input.
    Normalize {
        /// Path to an HTML file. Use `-` to read from stdin.
        path: PathBuf,
    },
    /// Report whether a trip through the visual editor preserves the input.
    /// Exits with status 1 when content is lost.
    Check {
        /// Path to an HTML file. Use `-` to read from stdin.
        path: PathBuf,
    },
}

/// How much of a document survives a trip through the visual model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RoundTrip {
    /// Written back byte for byte.
    Stable,
    /// Markup changed but the parse is the same.
    Equivalent,
    Lossy,
}

impl fmt::Display for RoundTrip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Stable => "byte-stable",
            Self::Equivalent => "equivalent",
            Self::Lossy => "lossy",
        })
    }
}

fn round_trip(source: &str) -> (String, RoundTrip) {
    let normalized = RichDoc::from_html(source).to_html();
    let outcome = if normalized == source {
        RoundTrip::Stable
    } else if html::equivalent(source, &normalized) {
        RoundTrip::Equivalent
    } else {
        RoundTrip::Lossy
    };
    (normalized, outcome)
}

fn read_source(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        use std::io::Read as _;

        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read HTML from stdin")?;
        return Ok(buf);
    }

    dualedit_core::read_document(path)
        .with_context(|| format!("failed to read HTML from {}", path.display()))
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Preview { path } => {
            let source = read_source(&path)?;
            print!("{}", html::plain_text(&html::parse(&source)));
        }
        Command::Normalize { path } => {
            let source = read_source(&path)?;
            let (normalized, outcome) = round_trip(&source);
            tracing::debug!(%outcome, "normalized");
            println!("{normalized}");
        }
        Command::Check { path } => {
            let source = read_source(&path)?;
            let (normalized, outcome) = round_trip(&source);
            println!("{}: {outcome}", path.display());
            if outcome == RoundTrip::Lossy {
                tracing::info!(
                    before = %html::plain_text(&html::parse(&source)).trim(),
                    after = %html::plain_text(&html::parse(&normalized)).trim(),
                    "visible content changed"
                );
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_markup_is_byte_stable() {
        let source = RichDoc::from_html("<h2>T</h2><p>a <b>b</b></p>").to_html();
        assert_eq!(round_trip(&source).1, RoundTrip::Stable);
    }

    #[test]
    fn case_and_trailing_whitespace_are_equivalent() {
        let (normalized, outcome) = round_trip("<P>a</P>\n");
        assert_eq!(outcome, RoundTrip::Equivalent, "normalized to {normalized}");
    }

    #[test]
    fn dropped_markup_is_lossy() {
        let (_, outcome) =
            round_trip("<p>text</p><script>run()</script><video src=\"x\"></video>");
        assert_eq!(outcome, RoundTrip::Lossy);
    }

    #[test]
    fn read_source_reports_missing_files() {
        let path = std::env::temp_dir().join("dualedit-cli-missing.html");
        let err = read_source(&path).err().map(|e| format!("{e:#}"));
        assert!(err.is_some_and(|e| e.contains("dualedit-cli-missing.html")));
    }

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["dualedit-cli", "check", "-"]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Command::Check { path }) if path.as_os_str() == "-"
        ));
    }
}
