use std::path::PathBuf;

use clap::Parser;

use crate::error::Result;
use crate::mpkg::{FormatTag, destination_root};

#[derive(Parser, Debug)]
#[command(name = "extract")]
#[command(version)]
#[command(about = "Extract files from .mpkg package containers", long_about = None)]
#[command(after_help = "Examples:\n  \
  extract ui.mpkg                  extract into ./ui/\n  \
  extract ui.mpkg PKGM0020         accept a package with a different format tag\n  \
  extract -l ui.mpkg               list entries without extracting")]
pub struct Cli {
    /// Package file path
    #[arg(value_name = "PACKAGE")]
    pub file: String,

    /// Expected format tag (8 ASCII bytes)
    #[arg(value_name = "FORMAT_TAG")]
    pub format_tag: Option<String>,

    /// Extract into DIR instead of the package path without its extension
    #[arg(short = 'd', long = "dest", value_name = "DIR")]
    pub dest: Option<PathBuf>,

    /// List entries without extracting
    #[arg(short = 'l', long = "list")]
    pub list: bool,

    /// Number of entries to extract concurrently
    #[arg(
        short = 'j',
        long = "jobs",
        value_name = "N",
        default_value_t = 1,
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    pub jobs: u16,

    /// Show diagnostics (-vv => trace)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,
}

impl Cli {
    pub fn is_quiet(&self) -> bool {
        self.quiet > 0
    }

    pub fn is_very_quiet(&self) -> bool {
        self.quiet > 1
    }

    /// Resolve the CLI flags into extraction options.
    pub fn options(&self) -> Result<ExtractOptions> {
        let expected_tag = match &self.format_tag {
            Some(tag) => FormatTag::new(tag)?,
            None => FormatTag::default(),
        };
        let dest_root = self
            .dest
            .clone()
            .unwrap_or_else(|| destination_root(&self.file));

        Ok(ExtractOptions {
            expected_tag,
            dest_root,
            jobs: self.jobs as usize,
        })
    }

    /// Default tracing filter for the verbosity flags; `RUST_LOG` wins.
    pub fn log_filter(&self) -> &'static str {
        match (self.verbose, self.quiet) {
            (0, 0) => "warn",
            (0, _) => "error",
            (1, _) => "debug",
            _ => "trace",
        }
    }
}

/// Everything an extraction run needs besides the source itself.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub expected_tag: FormatTag,
    pub dest_root: PathBuf,
    pub jobs: usize,
}
