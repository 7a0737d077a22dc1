//! # mpkg-extract
//!
//! Extractor for `.mpkg` package containers.
//!
//! A package bundles many files behind a versioned tag and a directory of
//! `(name, offset, size)` records, followed by the raw bytes of every file.
//! This library validates the tag, parses the directory, recreates the
//! directory tree on disk and copies each entry's bytes out to its own file.
//!
//! ## Features
//!
//! - Tag validation with an overridable format version (default `PKGM0014`)
//! - Bounds-checked directory parsing that rejects truncated or crafted headers
//! - Directory creation as a separate pass ahead of extraction
//! - Optional parallel extraction with per-entry failure isolation
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use mpkg_extract::{FormatTag, PackageExtractor};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let extractor = PackageExtractor::open_local(Path::new("ui.mpkg"), FormatTag::default())?;
//!     let package = extractor.open(Path::new("ui")).await?;
//!
//!     let report = extractor.extract_all(&package, 1).await;
//!     for failure in &report.failures {
//!         println!("{}: {}", failure.name, failure.error);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod error;
pub mod io;
pub mod mpkg;

pub use cli::Cli;
pub use error::PackageError;
pub use io::{LocalFileReader, ReadAt};
pub use mpkg::{
    ExtractionReport, FormatTag, Package, PackageEntry, PackageExtractor, destination_root,
};
