//! Zip assembly for fetched payloads
//!
//! The builder is synchronous; async callers run it on the blocking pool.

use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;

use crate::fetch::FetchResult;
use crate::humanize::ByteSize;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("No entries to archive")]
    Empty,

    #[error("Archive I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] ZipError),

    #[error("Archive missing or empty at {0}")]
    Missing(PathBuf),
}

pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Finished archive on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub path: PathBuf,
    pub size: u64,
    pub entry_count: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct ArchiveBuilder {
    compression: CompressionMethod,
    compression_level: Option<i64>,
}

impl Default for ArchiveBuilder {
    fn default() -> Self {
        Self {
            compression: CompressionMethod::Deflated,
            compression_level: None,
        }
    }
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deflate level for every entry; `None` keeps the zip crate default
    pub fn with_compression_level(mut self, level: Option<i64>) -> Self {
        self.compression_level = level;
        self
    }

    /// Write `entries` into a new zip at `target`.
    ///
    /// Entries keep their given order. When two entries share a name the
    /// later one replaces the earlier.
    pub fn build(&self, entries: &[FetchResult], target: &Path) -> Result<ArchiveSummary> {
        let entries = dedup_by_name(entries);
        if entries.is_empty() {
            return Err(ArchiveError::Empty);
        }

        let file = File::create(target)?;
        let mut writer = ZipWriter::new(BufWriter::new(file));

        for entry in &entries {
            let options = SimpleFileOptions::default()
                .compression_method(self.compression)
                .compression_level(self.compression_level)
                .large_file(entry.size >= u64::from(u32::MAX));

            writer.start_file(entry.local_name.as_str(), options)?;
            let mut source = BufReader::new(File::open(&entry.path)?);
            io::copy(&mut source, &mut writer)?;
            debug!(name = %entry.local_name, size = %ByteSize(entry.size), "Added archive entry");
        }

        let mut out = writer.finish()?;
        io::Write::flush(&mut out)?;
        drop(out);

        let size = verify(target)?;
        info!(
            path = %target.display(),
            entries = entries.len(),
            size = %ByteSize(size),
            "Archive created"
        );

        Ok(ArchiveSummary {
            path: target.to_path_buf(),
            size,
            entry_count: entries.len(),
        })
    }
}

/// Check that an archive exists with non-zero size, returning that size
pub fn verify(path: &Path) -> Result<u64> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(meta.len()),
        _ => Err(ArchiveError::Missing(path.to_path_buf())),
    }
}

fn dedup_by_name(entries: &[FetchResult]) -> Vec<&FetchResult> {
    let mut kept: Vec<&FetchResult> = Vec::with_capacity(entries.len());
    for entry in entries {
        if let Some(pos) = kept.iter().position(|e| e.local_name == entry.local_name) {
            debug!(name = %entry.local_name, "Duplicate archive entry, keeping the later one");
            kept.remove(pos);
        }
        kept.push(entry);
    }
    kept
}
