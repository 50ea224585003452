//! ZIP archive reader.
//!
//! Wraps the `zip` crate behind the contract ingestion needs: open a
//! container from a filesystem path, list its file entries once, pull a
//! single entry's decompressed bytes on demand, and close idempotently.
//! Entry metadata is read from the central directory up front (cheap even
//! for huge archives); file content stays on disk until requested, so peak
//! memory is bounded by the largest single entry, not the archive.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use zip::ZipArchive;

#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The archive file does not exist. Distinguishable so a retry after a
    /// crashed-but-cleaned-up attempt fails fast instead of cycling.
    #[error("source archive missing: {0}")]
    SourceMissing(PathBuf),

    #[error("cannot open archive {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("not a valid ZIP archive: {0}")]
    InvalidArchive(String),

    #[error("failed to read entry #{index}: {reason}")]
    EntryRead { index: usize, reason: String },

    #[error("archive handle already closed")]
    Closed,
}

/// Metadata of one file entry. `index` addresses the entry for later
/// content retrieval via [`ZipArchiveReader::entry_bytes`].
#[derive(Debug, Clone)]
pub struct ArchiveEntryMeta {
    pub index: usize,
    pub path: String,
}

/// An open ZIP archive handle.
#[derive(Debug)]
pub struct ZipArchiveReader {
    archive: Option<ZipArchive<File>>,
    path: PathBuf,
}

impl ZipArchiveReader {
    /// Open an archive. A missing file yields [`ArchiveError::SourceMissing`];
    /// an unreadable or non-ZIP file yields the corresponding variant.
    pub fn open(path: &Path) -> Result<Self, ArchiveError> {
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ArchiveError::SourceMissing(path.to_path_buf())
            } else {
                ArchiveError::Open {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;

        let archive =
            ZipArchive::new(file).map_err(|e| ArchiveError::InvalidArchive(e.to_string()))?;

        tracing::debug!(path = %path.display(), entries = archive.len(), "Archive opened");

        Ok(Self {
            archive: Some(archive),
            path: path.to_path_buf(),
        })
    }

    /// List the archive's file entries in central-directory order.
    /// Directory entries are excluded.
    pub fn entries(&mut self) -> Result<Vec<ArchiveEntryMeta>, ArchiveError> {
        let archive = self.archive.as_mut().ok_or(ArchiveError::Closed)?;

        let mut metas = Vec::new();
        for index in 0..archive.len() {
            let entry = archive.by_index(index).map_err(|e| ArchiveError::EntryRead {
                index,
                reason: e.to_string(),
            })?;
            if entry.is_dir() {
                continue;
            }
            metas.push(ArchiveEntryMeta {
                index,
                path: entry.name().to_string(),
            });
        }
        Ok(metas)
    }

    /// Decompress and return the full content of one entry.
    pub fn entry_bytes(&mut self, index: usize) -> Result<Vec<u8>, ArchiveError> {
        let archive = self.archive.as_mut().ok_or(ArchiveError::Closed)?;

        let mut entry = archive.by_index(index).map_err(|e| ArchiveError::EntryRead {
            index,
            reason: e.to_string(),
        })?;

        let mut buffer = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut buffer)
            .map_err(|e| ArchiveError::EntryRead {
                index,
                reason: e.to_string(),
            })?;
        Ok(buffer)
    }

    /// Release the underlying file descriptor. Safe to call repeatedly and
    /// safe to call even if entry iteration never completed.
    pub fn close(&mut self) {
        if self.archive.take().is_some() {
            tracing::debug!(path = %self.path.display(), "Archive handle closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.archive.is_none()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_test_zip(dir: &Path, entries: &[(&str, &[u8])]) -> PathBuf {
        use zip::write::{FileOptions, ZipWriter};

        let path = dir.join("test.zip");
        let file = File::create(&path).unwrap();
        let mut writer = ZipWriter::new(file);
        let options = FileOptions::default();

        for (name, data) in entries {
            if name.ends_with('/') {
                writer.add_directory(name.trim_end_matches('/'), options).unwrap();
            } else {
                writer.start_file(*name, options).unwrap();
                writer.write_all(data).unwrap();
            }
        }
        writer.finish().unwrap();
        path
    }

    #[test]
    fn lists_file_entries_and_skips_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_zip(
            dir.path(),
            &[
                ("EventA/", b"" as &[u8]),
                ("EventA/Morning/Solo/Jane/p1.jpg", b"one"),
                ("EventA/Morning/Solo/Jane/p2.jpg", b"two"),
            ],
        );

        let mut reader = ZipArchiveReader::open(&path).unwrap();
        let entries = reader.entries().unwrap();

        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| !e.path.ends_with('/')));
    }

    #[test]
    fn entry_bytes_returns_decompressed_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_zip(dir.path(), &[("a/b/c/d/x.jpg", b"payload bytes")]);

        let mut reader = ZipArchiveReader::open(&path).unwrap();
        let entries = reader.entries().unwrap();
        let data = reader.entry_bytes(entries[0].index).unwrap();
        assert_eq!(data, b"payload bytes");
    }

    #[test]
    fn open_missing_file_is_source_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = ZipArchiveReader::open(&dir.path().join("nope.zip")).unwrap_err();
        assert!(matches!(err, ArchiveError::SourceMissing(_)));
    }

    #[test]
    fn open_non_zip_is_invalid_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.zip");
        std::fs::write(&path, b"not a zip at all").unwrap();

        let err = ZipArchiveReader::open(&path).unwrap_err();
        assert!(matches!(err, ArchiveError::InvalidArchive(_)));
    }

    #[test]
    fn close_is_idempotent_and_blocks_further_reads() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_zip(dir.path(), &[("a/b/c/d/x.jpg", b"x")]);

        let mut reader = ZipArchiveReader::open(&path).unwrap();
        reader.close();
        reader.close();
        assert!(reader.is_closed());
        assert!(matches!(reader.entries(), Err(ArchiveError::Closed)));
        assert!(matches!(reader.entry_bytes(0), Err(ArchiveError::Closed)));
    }
}
