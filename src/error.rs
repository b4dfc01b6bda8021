//! Errors raised at the ingestion boundary. The flow engine itself never fails.

use thiserror::Error;

/// A log line that cannot become a [`crate::records::ConnectionRecord`].
#[derive(Debug, Error)]
pub enum RecordError {
    /// Required column absent or marked unset.
    #[error("line {line}: missing required field `{field}`")]
    MissingField { line: usize, field: &'static str },

    /// Column present but not parseable as its type.
    #[error("line {line}: invalid value {value:?} for field `{field}`")]
    InvalidField {
        line: usize,
        field: &'static str,
        value: String,
    },

    /// Line bytes are not UTF-8.
    #[error("line {line}: not valid UTF-8")]
    InvalidEncoding { line: usize },

    /// Tab-separated data before any `#fields` or header line.
    #[error("line {line}: data line before any header")]
    NoHeader { line: usize },

    #[error("line {line}: invalid JSON record: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("read error: {0}")]
    Io(#[from] std::io::Error),
}
