//! Export archive handling.
//!
//! This module provides:
//! - Signature checks for downloaded payloads
//! - Selection of the single tabular entry inside a ZIP
//! - Lazy, record-aware CSV row parsing with scoped temporary storage

mod parser;
mod spool;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use parser::{parse, ArchiveRows, Row};

/// File name of the publication table inside KITopen exports.
pub const KITOPEN_DATA_FILE: &str = "Publikationen.csv";

/// Local file header, empty-archive and spanned-archive signatures.
const ZIP_SIGNATURES: &[&[u8; 4]] = &[b"PK\x03\x04", b"PK\x05\x06", b"PK\x07\x08"];

/// Describes where the data lives inside an export archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveLayout {
    /// Base name of the data entry. `None` accepts any single `.csv` entry.
    pub data_file: Option<String>,
    /// Field delimiter of the tabular file.
    pub delimiter: char,
    /// Directory for spooled entries. Defaults to the system temp directory.
    pub spool_dir: Option<PathBuf>,
}

impl Default for ArchiveLayout {
    fn default() -> Self {
        Self {
            data_file: Some(KITOPEN_DATA_FILE.to_string()),
            delimiter: ',',
            spool_dir: None,
        }
    }
}

impl ArchiveLayout {
    /// Returns true if the archive entry `name` qualifies as the data file.
    pub(crate) fn is_candidate(&self, name: &str) -> bool {
        let base = name.rsplit('/').next().unwrap_or(name);
        match &self.data_file {
            Some(file) => base.eq_ignore_ascii_case(file),
            None => base.to_ascii_lowercase().ends_with(".csv"),
        }
    }
}

/// Returns true if `bytes` starts with a ZIP signature.
pub fn is_zip(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && ZIP_SIGNATURES.iter().any(|sig| bytes[..4] == sig[..])
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::io::{Cursor, Write};

    use zip::write::SimpleFileOptions;
    use zip::{CompressionMethod, ZipWriter};

    pub(crate) use super::parser::row_for_test as row;

    /// Builds an in-memory ZIP with the given `(name, content)` entries.
    pub(crate) fn zip_archive(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        for (name, content) in entries {
            writer.start_file(*name, options).expect("start entry");
            writer.write_all(content.as_bytes()).expect("write entry");
        }
        writer.finish().expect("finish zip").into_inner()
    }

    /// Renders a header and rows as comma-separated lines.
    pub(crate) fn csv_text(headers: &[&str], rows: &[&[&str]]) -> String {
        let mut out = headers.join(",");
        out.push('\n');
        for row in rows {
            out.push_str(&row.join(","));
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_zip_checks_signature() {
        let bytes = test_support::zip_archive(&[("a.csv", "x\n")]);
        assert!(is_zip(&bytes));
        assert!(!is_zip(b"<html><body>Fehler</body></html>"));
        assert!(!is_zip(b"PK"));
        assert!(!is_zip(b""));
    }

    #[test]
    fn candidate_matching() {
        let named = ArchiveLayout::default();
        assert!(named.is_candidate("Publikationen.csv"));
        assert!(named.is_candidate("dir/publikationen.CSV"));
        assert!(!named.is_candidate("Analyse.csv"));

        let any = ArchiveLayout {
            data_file: None,
            ..ArchiveLayout::default()
        };
        assert!(any.is_candidate("Analyse.csv"));
        assert!(any.is_candidate("x/y.CSV"));
        assert!(!any.is_candidate("notes.txt"));
    }

    #[test]
    fn layout_deserializes_with_defaults() {
        let layout: ArchiveLayout = serde_json::from_str(r#"{"delimiter": ";"}"#).unwrap();
        assert_eq!(layout.delimiter, ';');
        assert_eq!(layout.data_file.as_deref(), Some(KITOPEN_DATA_FILE));
        assert!(layout.spool_dir.is_none());
    }
}
