use serde::Serialize;
use thiserror::Error;

/// Coarse classification of a [`SearchError`], used by callers to decide
/// whether re-running a query can help.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad query, view or configuration. Local, never fixed by retrying.
    Configuration,
    /// The remote export failed or did not finish in time.
    Remote,
    /// The export arrived but did not match what was requested.
    DataIntegrity,
}

/// Crate-wide error type.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    // ── Configuration ─────────────────────────────────────────────────────────
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid view: {0}")]
    InvalidView(String),

    // ── Remote ────────────────────────────────────────────────────────────────
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        /// HTTP status, when the server answered at all.
        status: Option<u16>,
    },

    #[error("Export not ready after {waited_secs}s")]
    ExportTimeout { waited_secs: u64 },

    #[error("Export is not a valid archive: {0}")]
    ExportFormat(String),

    // ── Data integrity ────────────────────────────────────────────────────────
    #[error("Archive structure error: {0}")]
    ArchiveStructure(String),

    #[error("Row {row} (line {line}): {message}")]
    RowFormat {
        /// 1-based data row, header excluded.
        row: u64,
        /// 1-based line in the tabular file.
        line: u64,
        message: String,
    },
}

impl SearchError {
    /// Shorthand for a transport failure without an HTTP status.
    pub(crate) fn transport(message: impl Into<String>) -> Self {
        SearchError::Transport {
            message: message.into(),
            status: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SearchError::Configuration(_) | SearchError::InvalidView(_) => {
                ErrorKind::Configuration
            }
            SearchError::Transport { .. }
            | SearchError::ExportTimeout { .. }
            | SearchError::ExportFormat(_) => ErrorKind::Remote,
            SearchError::ArchiveStructure(_) | SearchError::RowFormat { .. } => {
                ErrorKind::DataIntegrity
            }
        }
    }

    /// Returns true if re-running the same query may succeed.
    ///
    /// Timeouts and network failures are retryable. HTTP client errors are not,
    /// except `408 Request Timeout` and `429 Too Many Requests`.
    pub fn is_retryable(&self) -> bool {
        match self {
            SearchError::ExportTimeout { .. } => true,
            SearchError::Transport { status, .. } => match status {
                Some(408) | Some(429) => true,
                Some(code) => !(400..500).contains(code),
                None => true,
            },
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_variants() -> Vec<SearchError> {
        vec![
            SearchError::Configuration("start after end".into()),
            SearchError::InvalidView("duplicate field doi".into()),
            SearchError::Transport { message: "reset".into(), status: None },
            SearchError::Transport { message: "bad gateway".into(), status: Some(502) },
            SearchError::ExportTimeout { waited_secs: 600 },
            SearchError::ExportFormat("html page".into()),
            SearchError::ArchiveStructure("no csv".into()),
            SearchError::RowFormat { row: 3, line: 4, message: "short row".into() },
        ]
    }

    #[test]
    fn all_variants_have_nonempty_display() {
        for variant in all_variants() {
            assert!(!variant.to_string().trim().is_empty(), "{:?}", variant);
        }
    }

    #[test]
    fn only_remote_errors_are_retryable() {
        for variant in all_variants() {
            if variant.is_retryable() {
                assert_eq!(variant.kind(), ErrorKind::Remote, "{:?}", variant);
            }
        }
    }

    #[test]
    fn client_errors_are_fatal_except_timeout_and_throttle() {
        let status = |code| SearchError::Transport {
            message: "x".into(),
            status: Some(code),
        };
        assert!(!status(400).is_retryable());
        assert!(!status(403).is_retryable());
        assert!(status(408).is_retryable());
        assert!(status(429).is_retryable());
        assert!(status(503).is_retryable());
        assert!(SearchError::transport("dns failure").is_retryable());
    }

    #[test]
    fn export_format_is_remote_but_not_retryable() {
        let err = SearchError::ExportFormat("not a zip".into());
        assert_eq!(err.kind(), ErrorKind::Remote);
        assert!(!err.is_retryable());
    }

    #[test]
    fn row_format_message_names_position() {
        let err = SearchError::RowFormat {
            row: 7,
            line: 8,
            message: "expected 3 columns, found 2".into(),
        };
        let text = err.to_string();
        assert!(text.contains("Row 7"));
        assert!(text.contains("line 8"));
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::DataIntegrity).unwrap();
        assert_eq!(json, "\"data_integrity\"");
    }
}
