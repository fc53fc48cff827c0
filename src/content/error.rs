//! Structured errors for document parsing and batch rendering

use std::path::PathBuf;
use thiserror::Error;

/// Why a single document could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("document does not start with a `---` front-matter delimiter")]
    MissingFrontMatter,

    #[error("front matter opened here is never closed by `---`")]
    UnterminatedFrontMatter,

    #[error("expected `key: value` in front matter, found {0:?}")]
    MalformedLine(String),

    #[error("required front-matter key `{0}` is missing")]
    MissingKey(&'static str),

    #[error("`date` value {0:?} is not a valid timestamp")]
    InvalidDate(String),

    #[error("code fence opened here is never closed")]
    UnterminatedFence,

    #[error("title {0:?} produces an empty slug")]
    EmptySlug(String),
}

/// A parse failure, located at a 1-based line of the source document
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {kind}")]
pub struct ParseError {
    pub line: usize,
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub fn new(line: usize, kind: ParseErrorKind) -> Self {
        Self { line, kind }
    }
}

/// Why a source file could not be turned into text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    #[error("cannot read file: {0}")]
    Io(String),

    #[error("file is not valid UTF-8 (first invalid byte at offset {valid_up_to})")]
    InvalidUtf8 { valid_up_to: usize },
}

impl ReadError {
    /// Decode raw file bytes as UTF-8
    pub fn decode(bytes: Vec<u8>) -> Result<String, ReadError> {
        String::from_utf8(bytes).map_err(|e| ReadError::InvalidUtf8 {
            valid_up_to: e.utf8_error().valid_up_to(),
        })
    }
}

impl From<std::io::Error> for ReadError {
    fn from(e: std::io::Error) -> Self {
        ReadError::Io(e.to_string())
    }
}

/// Failures that concern the batch as a whole rather than one document
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("address collision on `{address}`: {}", display_sources(.sources))]
    AddressCollision {
        address: String,
        sources: Vec<PathBuf>,
    },
}

fn display_sources(sources: &[PathBuf]) -> String {
    sources
        .iter()
        .map(|s| s.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Non-fatal findings attached to a parsed document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A front-matter key the renderer does not interpret; it is passed through
    UnknownMetadataKey { key: String, line: usize },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::UnknownMetadataKey { key, line } => {
                write!(f, "line {}: unknown front-matter key `{}`", line, key)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::new(12, ParseErrorKind::UnterminatedFence);
        assert_eq!(
            err.to_string(),
            "line 12: code fence opened here is never closed"
        );
    }

    #[test]
    fn test_decode_reports_first_invalid_byte() {
        assert_eq!(ReadError::decode(b"caf\xc3\xa9".to_vec()).unwrap(), "café");
        let err = ReadError::decode(b"caf\xe9 noir".to_vec()).unwrap_err();
        assert_eq!(err, ReadError::InvalidUtf8 { valid_up_to: 3 });
        assert_eq!(
            err.to_string(),
            "file is not valid UTF-8 (first invalid byte at offset 3)"
        );
    }

    #[test]
    fn test_collision_lists_sources() {
        let err = BatchError::AddressCollision {
            address: "2021/02/20/my-post".to_string(),
            sources: vec![PathBuf::from("a.md"), PathBuf::from("b.md")],
        };
        assert_eq!(
            err.to_string(),
            "address collision on `2021/02/20/my-post`: a.md, b.md"
        );
    }
}
