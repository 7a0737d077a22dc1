//! `.mpkg` package parsing and extraction.
//!
//! ## Architecture
//!
//! - [`structures`]: format constants, entries and the parsed package
//! - [`parser`]: tag validation and directory parsing from raw bytes
//! - [`extractor`]: directory creation and payload extraction
//! - [`report`]: per-entry outcome of an extraction
//!
//! ## Package Format Overview
//!
//! All integers are little-endian `i32`:
//!
//! ```text
//! [0, 4)    reserved
//! [4, 12)   ASCII format tag, e.g. PKGM0014
//! [12, 16)  entry count N
//! N times:  name_length · name · relative_offset · payload_size
//! rest:     payloads back to back, in entry order
//! ```
//!
//! `relative_offset` is measured from the start of the payload region, which
//! is not stored and is derived from the last entry.
//!
//! ## Limitations
//!
//! - No compression or encryption
//! - Extraction only; packages cannot be written

mod extractor;
mod parser;
mod report;
mod structures;

pub use extractor::{PackageExtractor, ensure_dir};
pub use parser::{PackageParser, derive_payload_start};
pub use report::{EntryFailure, ExtractedEntry, ExtractionReport};
pub use structures::*;
