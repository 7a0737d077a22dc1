use super::ReadAt;
use crate::error::{PackageError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Local file reader with random access support
pub struct LocalFileReader {
    file: std::fs::File,
    path: PathBuf,
    size: u64,
}

impl LocalFileReader {
    /// Open `path` and record its length for later offset arithmetic.
    pub fn new(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| PackageError::io(path, e))?;
        let size = file
            .metadata()
            .map_err(|e| PackageError::io(path, e))?
            .len();
        Ok(Self {
            file,
            path: path.to_path_buf(),
            size,
        })
    }
}

#[async_trait]
impl ReadAt for LocalFileReader {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        #[cfg(unix)]
        let read = {
            use std::os::unix::fs::FileExt;
            self.file.read_at(buf, offset)
        };

        #[cfg(windows)]
        let read = {
            use std::os::windows::fs::FileExt;
            // seek_read moves the handle's cursor, but every call passes an
            // explicit offset so no caller depends on it
            self.file.seek_read(buf, offset)
        };

        #[cfg(not(any(unix, windows)))]
        let read = {
            use std::io::{Read, Seek, SeekFrom};
            // No positional reads here; only safe with a single reader task
            let mut file = &self.file;
            file.seek(SeekFrom::Start(offset))
                .and_then(|_| file.read(buf))
        };

        read.map_err(|e| PackageError::io(&self.path, e))
    }

    fn size(&self) -> u64 {
        self.size
    }
}
