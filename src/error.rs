//! All error types for the termport crate.
//!
//! These are returned from every fallible operation (decoding, encoding,
//! validation, store access). Per-record problems found while reconciling
//! an import are not errors; they are collected as
//! [`RecordIssue`](crate::types::RecordIssue)s in the import summary.

use thiserror::Error;

use crate::formats::FormatType;

#[derive(Error, Debug)]
pub enum Error {
    #[error("unknown format `{0}`")]
    UnknownFormat(String),

    #[error("{format} parse error{}: {reason}", line_suffix(.line))]
    FormatParse {
        format: FormatType,
        line: Option<usize>,
        reason: String,
    },

    #[error("locale mismatch: file declares `{declared}` but `{requested}` was requested")]
    LocaleMismatch { declared: String, requested: String },

    #[error("invalid locale `{0}`")]
    InvalidLocale(String),

    #[error("key `{key}` conflicts with `{conflicting}`")]
    KeyConflict { key: String, conflicting: String },

    #[error("malformed key `{key}`: {reason}")]
    MalformedKey { key: String, reason: String },

    #[error("value is {length} characters long, the maximum is {max}")]
    ValueTooLong { length: usize, max: usize },

    #[error("project `{0}` not found")]
    ProjectNotFound(String),

    #[error("locale `{locale}` is not part of project `{project}`")]
    LocaleNotFound { project: String, locale: String },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn line_suffix(line: &Option<usize>) -> String {
    match line {
        Some(line) => format!(" at line {line}"),
        None => String::new(),
    }
}

impl Error {
    /// Creates a parse error for `format`, optionally pinned to a 1-based line.
    pub fn parse(format: FormatType, line: Option<usize>, reason: impl Into<String>) -> Self {
        Error::FormatParse {
            format,
            line,
            reason: reason.into(),
        }
    }

    /// Creates a new validation error
    pub fn validation_error(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    /// Returns `true` for errors raised while decoding an input file.
    ///
    /// These abort an import before anything is committed.
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            Error::FormatParse { .. } | Error::LocaleMismatch { .. }
        )
    }
}

/// Returns the 1-based line number of byte `offset` within `input`.
pub(crate) fn line_at(input: &[u8], offset: usize) -> usize {
    let end = offset.min(input.len());
    input[..end].iter().filter(|&&b| b == b'\n').count() + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_unknown_format_error() {
        let error = Error::UnknownFormat("docx".to_string());
        assert_eq!(error.to_string(), "unknown format `docx`");
    }

    #[test]
    fn test_parse_error_with_line() {
        let error = Error::parse(FormatType::Po, Some(12), "unterminated string");
        assert_eq!(
            error.to_string(),
            "po parse error at line 12: unterminated string"
        );
        assert!(error.is_decode_error());
    }

    #[test]
    fn test_parse_error_without_line() {
        let error = Error::parse(FormatType::JsonFlat, None, "expected an object");
        assert_eq!(error.to_string(), "jsonflat parse error: expected an object");
    }

    #[test]
    fn test_locale_mismatch_error() {
        let error = Error::LocaleMismatch {
            declared: "fr".to_string(),
            requested: "de".to_string(),
        };
        assert!(error.to_string().contains("`fr`"));
        assert!(error.to_string().contains("`de`"));
        assert!(error.is_decode_error());
    }

    #[test]
    fn test_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let error = Error::Io(io_error);
        assert!(error.to_string().contains("I/O error"));
        assert!(!error.is_decode_error());
    }

    #[test]
    fn test_validation_error() {
        let error = Error::validation_error("Validation failed");
        assert_eq!(error.to_string(), "validation error: Validation failed");
    }

    #[test]
    fn test_line_at() {
        let input = b"a\nb\nc";
        assert_eq!(line_at(input, 0), 1);
        assert_eq!(line_at(input, 2), 2);
        assert_eq!(line_at(input, 4), 3);
        assert_eq!(line_at(input, 100), 3);
    }
}
