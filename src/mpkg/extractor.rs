use std::collections::HashSet;
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::error::{PackageError, Result};
use crate::io::{LocalFileReader, ReadAt};

use super::parser::PackageParser;
use super::report::{EntryFailure, ExtractedEntry, ExtractionReport};
use super::structures::{FormatTag, Package, PackageEntry};

/// Payload bytes copied per read.
const COPY_CHUNK: usize = 256 * 1024;

/// Number of copy tasks allowed to read the package at once.
///
/// Without positional reads every task would share one file cursor, so
/// those targets copy one entry at a time.
fn effective_jobs(requested: usize) -> usize {
    if cfg!(any(unix, windows)) {
        requested.max(1)
    } else {
        1
    }
}

/// Create `path` and any missing ancestors. An existing directory is success.
pub async fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .await
        .map_err(|e| PackageError::io(path, e))
}

/// Package extractor
pub struct PackageExtractor<R: ReadAt> {
    parser: PackageParser<R>,
}

impl PackageExtractor<LocalFileReader> {
    /// Open a package on the local filesystem.
    pub fn open_local(path: &Path, expected_tag: FormatTag) -> Result<Self> {
        let reader = Arc::new(LocalFileReader::new(path)?);
        Ok(Self::new(reader, expected_tag))
    }
}

impl<R: ReadAt + 'static> PackageExtractor<R> {
    pub fn new(reader: Arc<R>, expected_tag: FormatTag) -> Self {
        Self {
            parser: PackageParser::new(reader, expected_tag),
        }
    }

    /// Validate the tag and parse the directory, rooting entries at `dest_root`.
    pub async fn open(&self, dest_root: &Path) -> Result<Package> {
        self.parser.validate_tag().await?;
        self.parser.parse_directory(dest_root).await
    }

    /// Create every destination directory before any payload is written.
    ///
    /// Each distinct directory is attempted once. A failure is recorded against
    /// the first entry that needed it and the pass moves on; entries below it
    /// will fail when their file is created.
    pub async fn prepare_directories(&self, package: &Package) -> Vec<EntryFailure> {
        let mut seen = HashSet::new();
        let mut failures = Vec::new();

        for entry in &package.entries {
            if !entry.has_safe_name() {
                continue;
            }
            let Some(dir) = entry.parent_dir() else {
                continue;
            };
            if !seen.insert(dir.to_path_buf()) {
                continue;
            }
            if let Err(error) = ensure_dir(dir).await {
                tracing::warn!("failed to create directory {}: {}", dir.display(), error);
                failures.push(EntryFailure {
                    name: entry.name.clone(),
                    error,
                });
            }
        }

        failures
    }

    /// Copy every entry's payload to its `resolved_path`.
    ///
    /// Up to `jobs` entries are copied at once; `jobs <= 1` copies them one by
    /// one. Failures are isolated per entry.
    pub async fn extract(&self, package: &Package, jobs: usize) -> ExtractionReport {
        let mut report = ExtractionReport::default();
        let jobs = effective_jobs(jobs);

        if jobs == 1 {
            for entry in &package.entries {
                let result = match plan_entry(package, entry) {
                    Ok(range) => copy_payload(self.parser.reader().as_ref(), entry, range).await,
                    Err(e) => Err(e),
                };
                record(&mut report, entry, result);
            }
            return report;
        }

        let semaphore = Arc::new(Semaphore::new(jobs));
        let mut pending = Vec::with_capacity(package.entries.len());

        for entry in &package.entries {
            match plan_entry(package, entry) {
                Ok(range) => {
                    let reader = self.parser.reader().clone();
                    let semaphore = semaphore.clone();
                    let owned = entry.clone();
                    let handle = tokio::spawn(async move {
                        let _permit = semaphore.acquire_owned().await.ok();
                        copy_payload(reader.as_ref(), &owned, range).await
                    });
                    pending.push((entry, Pending::Spawned(handle)));
                }
                Err(e) => pending.push((entry, Pending::Rejected(e))),
            }
        }

        // Awaiting in package order keeps the report ordered
        for (entry, task) in pending {
            let result = match task {
                Pending::Spawned(handle) => handle.await.unwrap_or_else(|e| Err(e.into())),
                Pending::Rejected(e) => Err(e),
            };
            record(&mut report, entry, result);
        }

        report
    }

    /// Run both passes: directories first, then payloads.
    pub async fn extract_all(&self, package: &Package, jobs: usize) -> ExtractionReport {
        let directory_failures = self.prepare_directories(package).await;
        let mut report = self.extract(package, jobs).await;
        report.directory_failures = directory_failures;
        report
    }
}

enum Pending {
    Spawned(JoinHandle<Result<u64>>),
    Rejected(PackageError),
}

/// Check an entry before touching the filesystem for it.
fn plan_entry(package: &Package, entry: &PackageEntry) -> Result<Range<u64>> {
    if !entry.has_safe_name() {
        return Err(PackageError::UnsafePath(entry.name.clone()));
    }
    package.payload_range(entry)
}

/// Stream `range` from the package into a freshly created file.
async fn copy_payload<R: ReadAt>(
    reader: &R,
    entry: &PackageEntry,
    range: Range<u64>,
) -> Result<u64> {
    let path = &entry.resolved_path;
    let mut file = fs::File::create(path)
        .await
        .map_err(|e| PackageError::io(path, e))?;

    let total = range.end - range.start;
    let mut buf = vec![0u8; (total as usize).min(COPY_CHUNK)];
    let mut offset = range.start;

    while offset < range.end {
        let want = ((range.end - offset) as usize).min(buf.len());
        let n = reader.read_full_at(offset, &mut buf[..want]).await?;
        if n > 0 {
            file.write_all(&buf[..n])
                .await
                .map_err(|e| PackageError::io(path, e))?;
        }
        if n < want {
            return Err(short_payload(entry, range.start, offset - range.start + n as u64));
        }
        offset += n as u64;
    }

    file.flush().await.map_err(|e| PackageError::io(path, e))?;
    Ok(total)
}

fn short_payload(entry: &PackageEntry, offset: u64, available: u64) -> PackageError {
    PackageError::CorruptPayload {
        name: entry.name.clone(),
        offset,
        expected: entry.payload_size as u64,
        available,
    }
}

fn record(report: &mut ExtractionReport, entry: &PackageEntry, result: Result<u64>) {
    match result {
        Ok(bytes) => {
            tracing::debug!("dumped {} ({} bytes)", entry.resolved_path.display(), bytes);
            report.extracted.push(ExtractedEntry {
                name: entry.name.clone(),
                path: entry.resolved_path.clone(),
                bytes,
            });
        }
        Err(error) => {
            tracing::warn!("failed to extract {}: {}", entry.name, error);
            report.failures.push(EntryFailure {
                name: entry.name.clone(),
                error,
            });
        }
    }
}
