//! Format reader for `.mpkg` packages.
//!
//! This module validates the format tag and parses the entry directory,
//! reading from any source that implements the [`ReadAt`] trait.
//!
//! ## Parsing Strategy
//!
//! The package is read front to back:
//! 1. Compare the 8-byte tag at offset 4 against the expected version
//! 2. Read the entry count at offset 12
//! 3. Read each length-prefixed entry record in order
//! 4. Derive where the payload region starts from the last entry
//!
//! The format never stores the payload start. It only works out because
//! payloads are laid out in the same order as their records, so the last
//! record's payload ends exactly at the end of the file.

use byteorder::{ByteOrder, LittleEndian};
use std::path::Path;
use std::sync::Arc;

use crate::error::{PackageError, Result};
use crate::io::ReadAt;

use super::structures::*;

/// How much of the directory is fetched per read, instead of one read per field.
const DIRECTORY_CHUNK: usize = 64 * 1024;

/// Upper bound on entries reserved from the declared count alone.
const MAX_PREALLOCATED_ENTRIES: u64 = 4096;

/// Capacity to reserve for `count` declared entries before any has parsed.
fn reserved_entries(count: u64) -> usize {
    count.min(MAX_PREALLOCATED_ENTRIES) as usize
}

/// Low-level package parser.
///
/// Generic over the reader type so tests can parse in-memory packages.
/// Typically used through [`PackageExtractor`](super::PackageExtractor)
/// rather than directly.
///
/// ## Example
///
/// ```ignore
/// let parser = PackageParser::open_and_validate(reader, FormatTag::default()).await?;
/// let package = parser.parse_directory(Path::new("game")).await?;
/// for entry in &package.entries {
///     let range = package.payload_range(entry)?;
///     // Read entry bytes from range...
/// }
/// ```
pub struct PackageParser<R: ReadAt> {
    /// The underlying data source
    reader: Arc<R>,
    /// Total size of the package in bytes
    size: u64,
    expected_tag: FormatTag,
}

impl<R: ReadAt> PackageParser<R> {
    pub fn new(reader: Arc<R>, expected_tag: FormatTag) -> Self {
        let size = reader.size();
        Self {
            reader,
            size,
            expected_tag,
        }
    }

    /// Create a parser and check the package's format tag.
    ///
    /// # Errors
    ///
    /// Returns [`PackageError::InvalidFormat`] if the tag differs from
    /// `expected_tag`, reporting both values.
    pub async fn open_and_validate(reader: Arc<R>, expected_tag: FormatTag) -> Result<Self> {
        let parser = Self::new(reader, expected_tag);
        parser.validate_tag().await?;
        Ok(parser)
    }

    /// Read the tag at offset 4 and compare it byte-for-byte.
    pub async fn validate_tag(&self) -> Result<()> {
        let mut found = [0u8; TAG_SIZE];
        let n = self.reader.read_full_at(TAG_OFFSET, &mut found).await?;
        let found = &found[..n];

        if !self.expected_tag.matches(found) {
            return Err(PackageError::InvalidFormat {
                expected: self.expected_tag.to_string(),
                found: String::from_utf8_lossy(found).into_owned(),
            });
        }

        tracing::debug!("package tag {} ({} bytes)", self.expected_tag, self.size);
        Ok(())
    }

    /// Parse the entry directory and derive the payload region start.
    ///
    /// Every entry's `resolved_path` is rooted at `dest_root`.
    ///
    /// # Errors
    ///
    /// Returns [`PackageError::CorruptHeader`] if the directory is truncated,
    /// declares implausible lengths, holds no entries, or overlaps the payload
    /// region implied by its last entry.
    pub async fn parse_directory(&self, dest_root: &Path) -> Result<Package> {
        let mut window = DirectoryWindow::new(self.reader.as_ref(), self.size, ENTRY_COUNT_OFFSET);

        let count = window.read_i32("entry count").await?;
        if count < 0 {
            return Err(PackageError::header(format!("negative entry count {}", count)));
        }
        let count = count as u64;
        if count.saturating_mul(MIN_ENTRY_SIZE) > window.remaining() {
            return Err(PackageError::header(format!(
                "{} entries declared but only {} bytes follow",
                count,
                window.remaining()
            )));
        }

        // Grows past this as records actually parse
        let mut entries = Vec::with_capacity(reserved_entries(count));
        for index in 0..count {
            let entry = self.parse_entry(&mut window, index, dest_root).await?;
            tracing::debug!(
                "parsed entry {} ({} bytes @ +{})",
                entry.name,
                entry.payload_size,
                entry.relative_offset
            );
            entries.push(entry);
        }

        let directory_end = window.position();
        let payload_start = derive_payload_start(self.size, &entries, directory_end)?;
        tracing::debug!("payload region starts at byte {}", payload_start);

        Ok(Package {
            tag: self.expected_tag,
            total_length: self.size,
            destination_root: dest_root.to_path_buf(),
            entries,
            directory_end,
            payload_start,
        })
    }

    /// Parse one `name_length · name · relative_offset · payload_size` record.
    async fn parse_entry(
        &self,
        window: &mut DirectoryWindow<'_, R>,
        index: u64,
        dest_root: &Path,
    ) -> Result<PackageEntry> {
        let record_start = window.position();

        let name_length = window.read_i32("name length").await?;
        let limit = window.remaining().saturating_sub(ENTRY_TRAILER_SIZE as u64);
        if name_length <= 0 || name_length as u64 > limit {
            return Err(PackageError::header(format!(
                "entry {} at offset {} has implausible name length {} ({} bytes remain)",
                index, record_start, name_length, limit
            )));
        }

        let name_bytes = window.take(name_length as usize, "entry name").await?;
        // Lossy so that non-UTF-8 names still extract somewhere sensible
        let name = String::from_utf8_lossy(name_bytes).into_owned();

        let trailer = window.take(ENTRY_TRAILER_SIZE, "entry record").await?;
        let relative_offset = LittleEndian::read_i32(&trailer[0..4]);
        let payload_size = LittleEndian::read_i32(&trailer[4..8]);
        if payload_size < 0 {
            return Err(PackageError::header(format!(
                "entry {} ({}) has negative payload size {}",
                index, name, payload_size
            )));
        }

        Ok(PackageEntry::new(
            name,
            relative_offset,
            payload_size as u32,
            dest_root,
        ))
    }

    /// Get a reference to the underlying reader.
    pub fn reader(&self) -> &Arc<R> {
        &self.reader
    }
}

/// Derive the payload region start from the last entry.
///
/// `payload_start = total_length - (last.relative_offset + last.payload_size)`,
/// which must land between the end of the directory and the end of the file.
pub fn derive_payload_start(
    total_length: u64,
    entries: &[PackageEntry],
    directory_end: u64,
) -> Result<u64> {
    let last = entries
        .last()
        .ok_or_else(|| PackageError::header("package declares no entries"))?;

    let payload_start = total_length as i64 - last.relative_end();
    if payload_start < directory_end as i64 || payload_start > total_length as i64 {
        return Err(PackageError::header(format!(
            "derived payload start {} lies outside [{}, {}]",
            payload_start, directory_end, total_length
        )));
    }

    Ok(payload_start as u64)
}

/// Buffered forward cursor over the directory section.
struct DirectoryWindow<'a, R: ReadAt> {
    reader: &'a R,
    size: u64,
    pos: u64,
    buf: Vec<u8>,
    buf_start: u64,
}

impl<'a, R: ReadAt> DirectoryWindow<'a, R> {
    fn new(reader: &'a R, size: u64, start: u64) -> Self {
        Self {
            reader,
            size,
            pos: start,
            buf: Vec::new(),
            buf_start: start,
        }
    }

    fn position(&self) -> u64 {
        self.pos
    }

    fn remaining(&self) -> u64 {
        self.size.saturating_sub(self.pos)
    }

    /// Consume exactly `len` bytes, refilling the window when needed.
    async fn take(&mut self, len: usize, what: &str) -> Result<&[u8]> {
        if len as u64 > self.remaining() {
            return Err(self.truncated(what));
        }

        let buf_end = self.buf_start + self.buf.len() as u64;
        if self.pos < self.buf_start || self.pos + len as u64 > buf_end {
            let want = (len.max(DIRECTORY_CHUNK) as u64).min(self.remaining()) as usize;
            self.buf.resize(want, 0);
            let n = self.reader.read_full_at(self.pos, &mut self.buf).await?;
            self.buf.truncate(n);
            self.buf_start = self.pos;
            if n < len {
                return Err(self.truncated(what));
            }
        }

        let start = (self.pos - self.buf_start) as usize;
        self.pos += len as u64;
        Ok(&self.buf[start..start + len])
    }

    async fn read_i32(&mut self, what: &str) -> Result<i32> {
        let bytes = self.take(4, what).await?;
        Ok(LittleEndian::read_i32(bytes))
    }

    fn truncated(&self, what: &str) -> PackageError {
        PackageError::header(format!(
            "truncated {} at offset {} (package is {} bytes)",
            what, self.pos, self.size
        ))
    }
}
