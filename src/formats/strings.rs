use std::io::{BufRead, Write};

use indoc::indoc;

use crate::{
    error::Error,
    formats::{FormatType, decode_text},
    traits::{CodecContext, Decoded, Encoded, FormatCodec, Parser},
    types::Record,
};

/// A parser for the Apple's .strings format.
///
/// The .strings format is a simple key-value pair format used for
/// localization: `"key" = "value";`, with C-style comments. A comment right
/// before a pair is kept as that pair's comment. UTF-16 files are accepted
/// when they carry a byte order mark.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Format {
    /// Read from a `//: Language: xx` header line, when present.
    pub language: Option<String>,
    /// Written into the header comment.
    pub generator: Option<String>,
    pub pairs: Vec<Pair>,
}

impl Parser for Format {
    fn from_reader<R: BufRead>(mut reader: R) -> Result<Self, Error> {
        let mut text = String::new();
        reader
            .read_to_string(&mut text)
            .map_err(|e| Error::parse(FormatType::Strings, None, e.to_string()))?;
        Scanner::new(&text).parse()
    }

    fn to_writer<W: Write>(&self, mut writer: W) -> Result<(), Error> {
        let mut content = format!(
            indoc! {"
            // This file was generated by {}.
            // Changes made here are replaced on the next export.
            //: Language: {}

            "},
            self.generator.as_deref().unwrap_or("termport"),
            self.language.as_deref().unwrap_or_default(),
        );

        for pair in &self.pairs {
            content.push_str(&pair.to_string());
            content.push('\n');
        }

        writer.write_all(content.as_bytes()).map_err(Error::Io)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pair {
    pub key: String,
    pub value: String,
    /// Text of the comment preceding the pair, without comment markers.
    pub comment: Option<String>,
}

impl std::fmt::Display for Pair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(comment) = &self.comment {
            writeln!(f, "/* {} */", comment.replace("*/", "* /"))?;
        }
        write!(f, "\"{}\" = \"{}\";", escape(&self.key), escape(&self.value))
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

struct Scanner {
    chars: Vec<char>,
    pos: usize,
    line: usize,
}

impl Scanner {
    fn new(text: &str) -> Self {
        Scanner {
            chars: text.chars().collect(),
            pos: 0,
            line: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_second(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn error(&self, line: usize, reason: &str) -> Error {
        Error::parse(FormatType::Strings, Some(line), reason.to_string())
    }

    fn parse(mut self) -> Result<Format, Error> {
        let mut format = Format::default();
        let mut comment = None;

        loop {
            self.skip_trivia(&mut comment, &mut format.language)?;
            let Some(c) = self.peek() else {
                break;
            };
            let key = self.token(c)?;

            self.skip_trivia(&mut None, &mut None)?;
            match self.bump() {
                Some('=') => {}
                // `"key";` is shorthand for a value equal to the key.
                Some(';') => {
                    format.pairs.push(Pair {
                        value: key.clone(),
                        key,
                        comment: comment.take(),
                    });
                    continue;
                }
                _ => return Err(self.error(self.line, "expected `=` after key")),
            }

            self.skip_trivia(&mut None, &mut None)?;
            let Some(c) = self.peek() else {
                return Err(self.error(self.line, "expected a value after `=`"));
            };
            let value = self.token(c)?;

            self.skip_trivia(&mut None, &mut None)?;
            if self.bump() != Some(';') {
                return Err(self.error(self.line, "expected `;` after value"));
            }

            format.pairs.push(Pair {
                key,
                value,
                comment: comment.take(),
            });
        }

        Ok(format)
    }

    /// Skips whitespace and comments, remembering the last comment seen.
    ///
    /// A blank line after a comment detaches it from the next pair.
    fn skip_trivia(
        &mut self,
        comment: &mut Option<String>,
        language: &mut Option<String>,
    ) -> Result<(), Error> {
        let mut newlines = 0;
        loop {
            match (self.peek(), self.peek_second()) {
                (Some(c), _) if c.is_whitespace() => {
                    if self.bump() == Some('\n') {
                        newlines += 1;
                        if newlines > 1 {
                            *comment = None;
                        }
                    }
                }
                (Some('/'), Some('*')) => {
                    let start = self.line;
                    self.pos += 2;
                    let mut text = String::new();
                    loop {
                        match (self.peek(), self.peek_second()) {
                            (Some('*'), Some('/')) => {
                                self.pos += 2;
                                break;
                            }
                            (Some(_), _) => text.extend(self.bump()),
                            (None, _) => return Err(self.error(start, "unterminated comment")),
                        }
                    }
                    *comment = Some(text.trim().to_string());
                    newlines = 0;
                }
                (Some('/'), Some('/')) => {
                    self.pos += 2;
                    let mut text = String::new();
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        text.extend(self.bump());
                    }
                    match text.strip_prefix(':').and_then(|meta| meta.split_once(':')) {
                        Some((name, value)) if name.trim() == "Language" => {
                            let value = value.trim();
                            if !value.is_empty() {
                                *language = Some(value.to_string());
                            }
                        }
                        Some(_) => {}
                        None => {
                            *comment = Some(text.trim().to_string());
                            newlines = 0;
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn token(&mut self, first: char) -> Result<String, Error> {
        if first == '"' {
            self.bump();
            return self.quoted();
        }
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c.is_whitespace() || matches!(c, '=' | ';' | '"') {
                break;
            }
            text.extend(self.bump());
        }
        if text.is_empty() {
            return Err(self.error(self.line, &format!("unexpected character `{first}`")));
        }
        Ok(text)
    }

    fn hex_unit(&mut self, line: usize) -> Result<u32, Error> {
        let mut unit = 0;
        for _ in 0..4 {
            let digit = self
                .bump()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.error(line, "malformed \\U escape"))?;
            unit = unit * 16 + digit;
        }
        Ok(unit)
    }

    fn quoted(&mut self) -> Result<String, Error> {
        let start = self.line;
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error(start, "unterminated string")),
                Some('"') => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('u' | 'U') => {
                        let line = self.line;
                        let unit = self.hex_unit(line)?;
                        let code = if (0xD800..0xDC00).contains(&unit) {
                            let paired = matches!(
                                (self.peek(), self.peek_second()),
                                (Some('\\'), Some('u' | 'U'))
                            );
                            if !paired {
                                return Err(self.error(line, "unpaired surrogate in \\U escape"));
                            }
                            self.pos += 2;
                            let low = self.hex_unit(line)?;
                            if !(0xDC00..0xE000).contains(&low) {
                                return Err(self.error(line, "unpaired surrogate in \\U escape"));
                            }
                            0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00)
                        } else {
                            unit
                        };
                        let decoded = char::from_u32(code)
                            .ok_or_else(|| self.error(line, "invalid \\U escape"))?;
                        out.push(decoded);
                    }
                    Some(other) => out.push(other),
                    None => return Err(self.error(start, "unterminated string")),
                },
                Some(c) => out.push(c),
            }
        }
    }
}

impl From<Format> for Decoded {
    fn from(value: Format) -> Self {
        Decoded::new(
            value
                .pairs
                .into_iter()
                .map(|pair| {
                    let record = Record::new(pair.key, pair.value);
                    match pair.comment {
                        Some(comment) => record.with_comment(comment),
                        None => record,
                    }
                })
                .collect(),
        )
    }
}

/// Codec for [`FormatType::Strings`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StringsCodec;

impl FormatCodec for StringsCodec {
    fn format(&self) -> FormatType {
        FormatType::Strings
    }

    fn decode(&self, input: &[u8], _ctx: &CodecContext<'_>) -> Result<Decoded, Error> {
        let text = decode_text(input, FormatType::Strings)?;
        Ok(Scanner::new(&text).parse()?.into())
    }

    fn encode(&self, records: &[Record], ctx: &CodecContext<'_>) -> Result<Encoded, Error> {
        let format = Format {
            language: Some(ctx.locale.to_string()),
            generator: Some(ctx.options.generator.clone()),
            pairs: records
                .iter()
                .map(|record| Pair {
                    key: record.key.clone(),
                    value: record.value.clone(),
                    comment: record.meta.comment.clone(),
                })
                .collect(),
        };
        Ok(Encoded::new(format.to_bytes()?))
    }
}
