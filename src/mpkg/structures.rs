use std::fmt;
use std::ops::Range;
use std::path::{Component, Path, PathBuf};

use crate::error::{PackageError, Result};

/// Format version tag expected when no override is given.
pub const DEFAULT_FORMAT_TAG: &str = "PKGM0014";

/// Reserved bytes before the tag.
pub const TAG_OFFSET: u64 = 4;
pub const TAG_SIZE: usize = 8;
pub const ENTRY_COUNT_OFFSET: u64 = TAG_OFFSET + TAG_SIZE as u64;

/// `relative_offset` + `payload_size`, following the name bytes.
pub const ENTRY_TRAILER_SIZE: usize = 8;
/// Smallest possible record: length field, a one-byte name, trailer.
pub const MIN_ENTRY_SIZE: u64 = 4 + 1 + ENTRY_TRAILER_SIZE as u64;

/// The 8-byte ASCII identifier at offset 4 of every package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatTag([u8; TAG_SIZE]);

impl FormatTag {
    pub fn new(tag: &str) -> Result<Self> {
        let bytes: [u8; TAG_SIZE] = tag
            .as_bytes()
            .try_into()
            .map_err(|_| PackageError::InvalidTag(tag.to_string()))?;
        if !bytes.is_ascii() {
            return Err(PackageError::InvalidTag(tag.to_string()));
        }
        Ok(Self(bytes))
    }

    /// Whether `found` is byte-for-byte this tag.
    pub fn matches(&self, found: &[u8]) -> bool {
        found == self.0.as_slice()
    }
}

impl Default for FormatTag {
    fn default() -> Self {
        let mut bytes = [0u8; TAG_SIZE];
        bytes.copy_from_slice(DEFAULT_FORMAT_TAG.as_bytes());
        Self(bytes)
    }
}

impl fmt::Display for FormatTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

/// One packed file's directory record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageEntry {
    pub name: String,
    /// Offset of the payload from the start of the payload region.
    pub relative_offset: i32,
    pub payload_size: u32,
    /// Destination root joined with `name`.
    pub resolved_path: PathBuf,
}

impl PackageEntry {
    pub fn new(name: String, relative_offset: i32, payload_size: u32, dest_root: &Path) -> Self {
        let resolved_path = dest_root.join(&name);
        Self {
            name,
            relative_offset,
            payload_size,
            resolved_path,
        }
    }

    /// End of this entry's payload, relative to the payload region.
    pub fn relative_end(&self) -> i64 {
        self.relative_offset as i64 + self.payload_size as i64
    }

    /// Names that are absolute or climb with `..` would land outside the
    /// destination root.
    pub fn has_safe_name(&self) -> bool {
        !self.name.is_empty()
            && Path::new(&self.name)
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
    }

    /// Directory that must exist before the payload can be written.
    pub fn parent_dir(&self) -> Option<&Path> {
        self.resolved_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
    }
}

/// A fully parsed package directory.
#[derive(Debug, Clone)]
pub struct Package {
    pub tag: FormatTag,
    pub total_length: u64,
    pub destination_root: PathBuf,
    /// Entries in on-disk order.
    pub entries: Vec<PackageEntry>,
    /// First byte after the last directory record.
    pub directory_end: u64,
    /// First byte of the payload region, derived from the last entry.
    pub payload_start: u64,
}

impl Package {
    /// Absolute offset of an entry's payload within the container.
    pub fn absolute_offset(&self, entry: &PackageEntry) -> i64 {
        self.payload_start as i64 + entry.relative_offset as i64
    }

    /// Byte range of an entry's payload, checked against the payload region.
    pub fn payload_range(&self, entry: &PackageEntry) -> Result<Range<u64>> {
        let start = self.absolute_offset(entry);
        let end = start + entry.payload_size as i64;
        if start < self.payload_start as i64 || end > self.total_length as i64 {
            return Err(PackageError::CorruptPayload {
                name: entry.name.clone(),
                offset: start.max(0) as u64,
                expected: entry.payload_size as u64,
                available: (self.total_length as i64 - start).clamp(0, self.total_length as i64)
                    as u64,
            });
        }
        Ok(start as u64..end as u64)
    }

    pub fn payload_len(&self) -> u64 {
        self.total_length - self.payload_start
    }
}

/// Derive the extraction root from the container's path.
///
/// The last extension of the final component is stripped (`data/game.mpkg`
/// becomes `data/game`). A name without an extension gets `.out` appended so the
/// root never collides with the container.
pub fn destination_root(container: &str) -> PathBuf {
    let path = PathBuf::from(container);

    match (path.file_stem(), path.extension()) {
        (Some(_), Some(_)) => path.with_extension(""),
        (Some(stem), None) => {
            let mut name = stem.to_os_string();
            name.push(".out");
            path.with_file_name(name)
        }
        _ => path.join("package"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_must_be_eight_ascii_bytes() {
        assert!(FormatTag::new("PKGM0014").is_ok());
        assert!(matches!(
            FormatTag::new("PKGM001"),
            Err(PackageError::InvalidTag(_))
        ));
        assert!(matches!(
            FormatTag::new("PKGM00145"),
            Err(PackageError::InvalidTag(_))
        ));
        assert!(matches!(
            FormatTag::new("PKGMé014"),
            Err(PackageError::InvalidTag(_))
        ));
        assert_eq!(FormatTag::default().to_string(), DEFAULT_FORMAT_TAG);
    }

    #[test]
    fn destination_root_strips_extension() {
        assert_eq!(destination_root("data/game.mpkg"), PathBuf::from("data/game"));
        assert_eq!(destination_root("game.v2.mpkg"), PathBuf::from("game.v2"));
        assert_eq!(destination_root("dir.d/game"), PathBuf::from("dir.d/game.out"));
    }

    #[test]
    fn entry_name_safety() {
        let root = Path::new("out");
        let ok = PackageEntry::new("sub/dir/file.bin".into(), 0, 1, root);
        assert!(ok.has_safe_name());
        assert_eq!(ok.resolved_path, PathBuf::from("out/sub/dir/file.bin"));
        assert_eq!(ok.parent_dir(), Some(Path::new("out/sub/dir")));

        assert!(!PackageEntry::new("../evil".into(), 0, 1, root).has_safe_name());
        assert!(!PackageEntry::new("a/../../evil".into(), 0, 1, root).has_safe_name());
        assert!(!PackageEntry::new("/etc/passwd".into(), 0, 1, root).has_safe_name());
    }

    #[test]
    fn payload_range_is_checked() {
        let root = Path::new("out");
        let package = Package {
            tag: FormatTag::default(),
            total_length: 100,
            destination_root: root.to_path_buf(),
            entries: Vec::new(),
            directory_end: 40,
            payload_start: 85,
        };

        let inside = PackageEntry::new("a".into(), 10, 5, root);
        assert_eq!(package.payload_range(&inside).unwrap(), 95..100);

        let past_end = PackageEntry::new("b".into(), 10, 6, root);
        assert!(matches!(
            package.payload_range(&past_end),
            Err(PackageError::CorruptPayload { available: 5, .. })
        ));

        let before_start = PackageEntry::new("c".into(), -1, 1, root);
        assert!(matches!(
            package.payload_range(&before_start),
            Err(PackageError::CorruptPayload { .. })
        ));
    }
}
