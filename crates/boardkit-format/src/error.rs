//! Error types for the file formats.

use thiserror::Error;

/// Malformed or semantically invalid file content. Always aborts the parse
/// of the current file; there is no partial-board recovery.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{source_name}:{line}:{column}: {message}")]
pub struct ParseError {
    /// Name of the stream being parsed (usually a file path).
    pub source_name: String,
    /// 1-based line of the offending token.
    pub line: u32,
    /// 1-based column of the offending token.
    pub column: u32,
    /// Human-readable expectation message.
    pub message: String,
}

/// Any failure while reading or writing a board stream.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Stream-level failure: file missing, unreadable, or a write failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
