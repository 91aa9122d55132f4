//! Traits for format-agnostic decoding and encoding in termport.

use std::io::{BufRead, Cursor, Write};

use crate::{
    error::Error,
    formats::FormatType,
    key_path::KeyMode,
    options::ExchangeOptions,
    types::{Record, RecordIssue},
};

/// A trait for parsing and writing one localization document in memory.
///
/// Implemented by the per-format document models (`po::Format`,
/// `strings::Format`, …). The codec layer converts those models to and from
/// [`Record`]s.
///
/// # Example
///
/// ```rust
/// use termport::formats::po;
/// use termport::traits::Parser;
///
/// let doc = po::Format::from_str("msgid \"hello\"\nmsgstr \"Bonjour\"\n")?;
/// assert_eq!(doc.messages.len(), 1);
/// # Ok::<(), termport::Error>(())
/// ```
pub trait Parser {
    /// Parse from any reader.
    fn from_reader<R: BufRead>(reader: R) -> Result<Self, Error>
    where
        Self: Sized;

    /// Write to any writer (memory buffer, socket, …).
    fn to_writer<W: Write>(&self, writer: W) -> Result<(), Error>;

    /// Parse from a string.
    fn from_str(s: &str) -> Result<Self, Error>
    where
        Self: Sized,
    {
        Self::from_reader(Cursor::new(s))
    }

    /// Parse from bytes.
    fn from_bytes(bytes: &[u8]) -> Result<Self, Error>
    where
        Self: Sized,
    {
        Self::from_reader(Cursor::new(bytes))
    }

    /// Write into a fresh byte buffer.
    fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut buffer = Vec::new();
        self.to_writer(&mut buffer)?;
        Ok(buffer)
    }
}

/// Per-call inputs shared by every codec.
#[derive(Debug, Clone, Copy)]
pub struct CodecContext<'a> {
    /// Locale the caller imports into or exports from.
    pub locale: &'a str,
    pub options: &'a ExchangeOptions,
}

impl<'a> CodecContext<'a> {
    pub fn new(locale: &'a str, options: &'a ExchangeOptions) -> Self {
        Self { locale, options }
    }

    pub fn key_mode(&self, format: FormatType) -> KeyMode<'a> {
        self.options.key_mode(format.is_nested())
    }
}

/// Result of decoding one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decoded {
    /// Locale declared by the file header, if the format carries one.
    pub language: Option<String>,
    /// Records in file order.
    pub records: Vec<Record>,
}

impl Decoded {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            language: None,
            records,
        }
    }
}

/// Result of encoding a record sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Encoded {
    pub bytes: Vec<u8>,
    /// Records left out because the format could not represent their key.
    pub skipped: Vec<RecordIssue>,
}

impl Encoded {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            skipped: Vec::new(),
        }
    }
}

/// The uniform decode/encode contract implemented once per format.
///
/// `decode` fails with [`Error::FormatParse`] on malformed input and returns
/// an empty record list for empty files. `encode` is deterministic: records
/// are written in the order given.
pub trait FormatCodec: Send + Sync {
    fn format(&self) -> FormatType;

    fn decode(&self, input: &[u8], ctx: &CodecContext<'_>) -> Result<Decoded, Error>;

    fn encode(&self, records: &[Record], ctx: &CodecContext<'_>) -> Result<Encoded, Error>;
}
