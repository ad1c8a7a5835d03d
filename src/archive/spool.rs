//! Temporary on-disk copy of an archive entry.
//!
//! The entry is written to a named temporary file, which is deleted when the
//! `SpooledEntry` is dropped. Nothing unpacked from an export outlives the
//! rows parsed from it.

use std::fs::File;
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::SearchError;

pub(crate) struct SpooledEntry {
    file: NamedTempFile,
    bytes: u64,
}

impl SpooledEntry {
    /// Copies `reader` to a fresh temporary file in `dir` (or the system
    /// temp directory).
    ///
    /// # Errors
    ///
    /// Returns `SearchError::ArchiveStructure` if the entry cannot be
    /// decompressed or the temporary file cannot be written.
    pub(crate) fn spool(reader: &mut impl Read, dir: Option<&Path>) -> Result<Self, SearchError> {
        let mut file = match dir {
            Some(dir) => NamedTempFile::new_in(dir),
            None => NamedTempFile::new(),
        }
        .map_err(|e| {
            SearchError::ArchiveStructure(format!("Failed to create spool file: {}", e))
        })?;

        let bytes = {
            let mut writer = BufWriter::new(file.as_file_mut());
            let bytes = io::copy(reader, &mut writer).map_err(|e| {
                SearchError::ArchiveStructure(format!("Failed to unpack archive entry: {}", e))
            })?;
            writer.flush().map_err(|e| {
                SearchError::ArchiveStructure(format!("Failed to flush spool file: {}", e))
            })?;
            bytes
        };

        file.as_file_mut()
            .seek(SeekFrom::Start(0))
            .map_err(|e| SearchError::ArchiveStructure(format!("Failed to rewind spool file: {}", e)))?;

        Ok(Self { file, bytes })
    }

    /// Opens an independent read handle positioned at the start.
    pub(crate) fn reopen(&self) -> Result<File, SearchError> {
        self.file
            .reopen()
            .map_err(|e| SearchError::ArchiveStructure(format!("Failed to reopen spool file: {}", e)))
    }

    pub(crate) fn len(&self) -> u64 {
        self.bytes
    }

    #[cfg(test)]
    pub(crate) fn path(&self) -> &Path {
        self.file.path()
    }
}
