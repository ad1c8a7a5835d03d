//! Extraction and row parsing of export archives.
//!
//! The export is a ZIP holding the publication CSV (and, for KITopen, an
//! analysis CSV next to it). Exactly one entry is selected, spooled to a
//! temporary file and read with the `csv` crate, which handles quoted fields
//! containing delimiters and newlines.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Cursor};
use std::sync::Arc;

use csv::{Reader, ReaderBuilder, StringRecord};
use tracing::{debug, info};
use zip::ZipArchive;

use crate::archive::spool::SpooledEntry;
use crate::archive::ArchiveLayout;
use crate::error::SearchError;

/// UTF-8 byte order mark as it appears after decoding.
const BOM: char = '\u{feff}';

// ─────────────────────────────────────────────────────────────────────────────
// Row
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct Header {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

/// One data row of the tabular file, as untyped header→cell pairs.
#[derive(Debug, Clone)]
pub struct Row {
    number: u64,
    line: u64,
    header: Arc<Header>,
    values: Vec<String>,
}

impl Row {
    /// Cell value under `column`, if the file has that column.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.header
            .index
            .get(column)
            .map(|&i| self.values[i].as_str())
    }

    /// 1-based position among data rows.
    pub fn number(&self) -> u64 {
        self.number
    }

    /// 1-based line where the row starts.
    pub fn line(&self) -> u64 {
        self.line
    }

    pub fn columns(&self) -> &[String] {
        &self.header.names
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.header
            .names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(String::as_str))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn to_map(&self) -> HashMap<String, String> {
        self.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ArchiveRows
// ─────────────────────────────────────────────────────────────────────────────

/// Lazy row iterator over the single tabular entry of an archive.
///
/// Owns the spooled copy of the entry; dropping the iterator deletes it.
/// After the first error the iterator yields nothing more.
pub struct ArchiveRows {
    // Declared before `_spool` so the read handle closes before the file is removed.
    reader: Reader<BufReader<File>>,
    _spool: SpooledEntry,
    header: Arc<Header>,
    entry_name: String,
    record: StringRecord,
    rows_read: u64,
    done: bool,
}

impl ArchiveRows {
    fn open(spool: SpooledEntry, entry_name: String, delimiter: u8) -> Result<Self, SearchError> {
        let file = spool.reopen()?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(BufReader::new(file));

        let raw = reader
            .headers()
            .map_err(|e| {
                SearchError::ArchiveStructure(format!("Failed to read header of {}: {}", entry_name, e))
            })?
            .clone();
        let header = build_header(&raw, &entry_name)?;

        debug!(
            entry = %entry_name,
            columns = header.names.len(),
            bytes = spool.len(),
            "[ARCHIVE] Opened tabular entry"
        );

        Ok(Self {
            reader,
            _spool: spool,
            header: Arc::new(header),
            entry_name,
            record: StringRecord::new(),
            rows_read: 0,
            done: false,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.header.names
    }

    /// Name of the archive entry being read.
    pub fn entry_name(&self) -> &str {
        &self.entry_name
    }

    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }
}

impl Iterator for ArchiveRows {
    type Item = Result<Row, SearchError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.reader.read_record(&mut self.record) {
            Ok(true) => {
                self.rows_read += 1;
                let line = self.record.position().map(|p| p.line()).unwrap_or(0);

                if self.record.len() != self.header.names.len() {
                    self.done = true;
                    return Some(Err(SearchError::RowFormat {
                        row: self.rows_read,
                        line,
                        message: format!(
                            "expected {} columns, found {}",
                            self.header.names.len(),
                            self.record.len()
                        ),
                    }));
                }

                Some(Ok(Row {
                    number: self.rows_read,
                    line,
                    header: Arc::clone(&self.header),
                    values: self.record.iter().map(str::to_string).collect(),
                }))
            }
            Ok(false) => {
                self.done = true;
                debug!(entry = %self.entry_name, rows = self.rows_read, "[ARCHIVE] End of entry");
                None
            }
            Err(e) => {
                self.done = true;
                let line = e.position().map(|p| p.line()).unwrap_or(0);
                Some(Err(SearchError::RowFormat {
                    row: self.rows_read + 1,
                    line,
                    message: format!("unreadable row: {}", e),
                }))
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Parsing
// ─────────────────────────────────────────────────────────────────────────────

/// Opens an export archive and returns a lazy iterator over the rows of its
/// single tabular entry.
///
/// # Errors
///
/// - `SearchError::ArchiveStructure` if the bytes are not a readable ZIP, if
///   zero or several entries qualify as the data file, or if the header row is
///   missing or has duplicate column names
/// - `SearchError::Configuration` if the layout's delimiter is not ASCII
pub fn parse(bytes: &[u8], layout: &ArchiveLayout) -> Result<ArchiveRows, SearchError> {
    let delimiter = u8::try_from(layout.delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| {
            SearchError::Configuration(format!(
                "CSV delimiter {:?} is not an ASCII character",
                layout.delimiter
            ))
        })?;

    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| SearchError::ArchiveStructure(format!("Malformed archive: {}", e)))?;

    let (index, name) = select_entry(&mut archive, layout)?;

    let spool = {
        let mut entry = archive.by_index(index).map_err(|e| {
            SearchError::ArchiveStructure(format!("Failed to open entry {}: {}", name, e))
        })?;
        SpooledEntry::spool(&mut entry, layout.spool_dir.as_deref())?
    };

    info!(entry = %name, bytes = spool.len(), "[ARCHIVE] Extracted data file");

    ArchiveRows::open(spool, name, delimiter)
}

/// Finds the one entry that qualifies as the data file.
fn select_entry(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    layout: &ArchiveLayout,
) -> Result<(usize, String), SearchError> {
    let mut candidates = Vec::new();

    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i).map_err(|e| {
            SearchError::ArchiveStructure(format!("Unreadable entry #{}: {}", i, e))
        })?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        if layout.is_candidate(&name) {
            candidates.push((i, name));
        }
    }

    match candidates.len() {
        1 => Ok(candidates.remove(0)),
        0 => Err(SearchError::ArchiveStructure(match &layout.data_file {
            Some(file) => format!("Archive has no entry named {}", file),
            None => "Archive contains no CSV file".to_string(),
        })),
        n => {
            let names: Vec<_> = candidates.iter().map(|(_, name)| name.as_str()).collect();
            Err(SearchError::ArchiveStructure(format!(
                "Archive contains {} candidate data files: {}",
                n,
                names.join(", ")
            )))
        }
    }
}

fn build_header(raw: &StringRecord, entry_name: &str) -> Result<Header, SearchError> {
    let names: Vec<String> = raw
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let name = if i == 0 { name.trim_start_matches(BOM) } else { name };
            name.trim().to_string()
        })
        .collect();

    if names.iter().all(String::is_empty) {
        return Err(SearchError::ArchiveStructure(format!(
            "{} has no header row",
            entry_name
        )));
    }

    let mut index = HashMap::with_capacity(names.len());
    for (i, name) in names.iter().enumerate() {
        if index.insert(name.clone(), i).is_some() {
            return Err(SearchError::ArchiveStructure(format!(
                "{} has duplicate column '{}'",
                entry_name, name
            )));
        }
    }

    Ok(Header { names, index })
}

#[cfg(test)]
pub(crate) fn row_for_test(headers: &[&str], values: &[&str]) -> Row {
    let names: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    let index = names.iter().cloned().enumerate().map(|(i, n)| (n, i)).collect();
    Row {
        number: 1,
        line: 2,
        header: Arc::new(Header { names, index }),
        values: values.iter().map(|v| v.to_string()).collect(),
    }
}
