mod local;

pub use local::LocalFileReader;

use async_trait::async_trait;

use crate::error::Result;

/// Trait for random access reading from a data source.
///
/// Reads are positional: implementations must not share a seek cursor between
/// calls, so concurrent extraction tasks can read different entries through the
/// same handle.
#[async_trait]
pub trait ReadAt: Send + Sync {
    /// Read data at the specified offset into the buffer.
    ///
    /// Returns the number of bytes read, which is short only at end of data.
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize>;

    /// Get the total size of the data source
    fn size(&self) -> u64;

    /// Read until `buf` is full or the source is exhausted.
    async fn read_full_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read_at(offset + filled as u64, &mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        Ok(filled)
    }
}
