use std::path::PathBuf;

use crate::error::PackageError;

/// An entry whose payload was written in full.
#[derive(Debug, Clone)]
pub struct ExtractedEntry {
    pub name: String,
    pub path: PathBuf,
    pub bytes: u64,
}

/// An entry that could not be processed. Siblings are unaffected.
#[derive(Debug)]
pub struct EntryFailure {
    pub name: String,
    pub error: PackageError,
}

/// Outcome of extracting a package. Partial success is a normal result.
#[derive(Debug, Default)]
pub struct ExtractionReport {
    /// Extracted entries, in package order.
    pub extracted: Vec<ExtractedEntry>,
    /// Directories that could not be created ahead of extraction.
    pub directory_failures: Vec<EntryFailure>,
    /// Entries that failed to extract, in package order.
    pub failures: Vec<EntryFailure>,
}

impl ExtractionReport {
    pub fn bytes_written(&self) -> u64 {
        self.extracted.iter().map(|e| e.bytes).sum()
    }

    pub fn is_complete(&self) -> bool {
        self.directory_failures.is_empty() && self.failures.is_empty()
    }
}
