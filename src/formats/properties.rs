//! Support for Java `.properties` files.
//!
//! Handles the three separators (`=`, `:` and whitespace), `#`/`!` comment
//! lines, backslash line continuations and the usual escapes including
//! `\uXXXX` with surrogate pairs. Files that are not valid UTF-8 are read as
//! ISO-8859-1. Encoding writes pure ASCII: anything outside printable ASCII
//! becomes a `\uXXXX` escape.

use std::{
    fmt::Write as _,
    io::{BufRead, Write},
};

use crate::{
    error::Error,
    formats::{FormatType, decode_text_or_latin1},
    traits::{CodecContext, Decoded, Encoded, FormatCodec, Parser},
    types::Record,
};

const WHITESPACE: [char; 3] = [' ', '\t', '\u{c}'];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Format {
    pub properties: Vec<Property>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub key: String,
    pub value: String,
    /// Comment lines directly above the property, markers stripped.
    pub comment: Option<String>,
}

impl Parser for Format {
    fn from_reader<R: BufRead>(mut reader: R) -> Result<Self, Error> {
        let mut text = String::new();
        reader
            .read_to_string(&mut text)
            .map_err(|e| Error::parse(FormatType::Properties, None, e.to_string()))?;
        parse_properties(&text)
    }

    fn to_writer<W: Write>(&self, mut writer: W) -> Result<(), Error> {
        let mut content = String::new();
        for property in &self.properties {
            if let Some(comment) = &property.comment {
                for line in comment.lines() {
                    content.push_str("# ");
                    content.push_str(line);
                    content.push('\n');
                }
            }
            content.push_str(&escape(&property.key, true));
            content.push('=');
            content.push_str(&escape(&property.value, false));
            content.push('\n');
        }
        writer.write_all(content.as_bytes()).map_err(Error::Io)
    }
}

fn parse_properties(text: &str) -> Result<Format, Error> {
    let mut properties = Vec::new();
    let mut comment: Vec<String> = Vec::new();
    let mut lines = text.lines().enumerate();

    while let Some((index, line)) = lines.next() {
        let line_no = index + 1;
        let trimmed = line.trim_start_matches(WHITESPACE);
        if trimmed.is_empty() {
            comment.clear();
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix(['#', '!']) {
            comment.push(rest.strip_prefix(' ').unwrap_or(rest).to_string());
            continue;
        }

        let mut logical = trimmed.to_string();
        while ends_with_continuation(&logical) {
            logical.pop();
            match lines.next() {
                Some((_, next)) => logical.push_str(next.trim_start_matches(WHITESPACE)),
                None => break,
            }
        }

        let (raw_key, raw_value) = split_key_value(&logical);
        properties.push(Property {
            key: unescape(raw_key, line_no)?,
            value: unescape(raw_value, line_no)?,
            comment: (!comment.is_empty()).then(|| comment.join("\n")),
        });
        comment.clear();
    }

    Ok(Format { properties })
}

fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

/// Splits a logical line at the first unescaped separator.
fn split_key_value(line: &str) -> (&str, &str) {
    let mut escaped = false;
    let mut key_end = line.len();
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' | ' ' | '\t' | '\u{c}' => {
                key_end = i;
                break;
            }
            _ => {}
        }
    }
    let rest = line[key_end..].trim_start_matches(WHITESPACE);
    let rest = rest.strip_prefix(['=', ':']).unwrap_or(rest);
    (&line[..key_end], rest.trim_start_matches(WHITESPACE))
}

fn hex4(s: &str) -> Option<u32> {
    let digits = s.get(..4)?;
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(digits, 16).ok()
}

fn unescape(raw: &str, line: usize) -> Result<String, Error> {
    let bad_escape =
        |reason: &str| Error::parse(FormatType::Properties, Some(line), reason.to_string());

    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{c}'),
            Some('u') => {
                let rest = chars.as_str();
                let unit = hex4(rest).ok_or_else(|| bad_escape("malformed \\uXXXX escape"))?;
                let mut rest = &rest[4..];
                let code = match unit {
                    0xD800..=0xDBFF => {
                        let low = rest
                            .strip_prefix("\\u")
                            .and_then(hex4)
                            .filter(|low| (0xDC00..=0xDFFF).contains(low))
                            .ok_or_else(|| bad_escape("unpaired surrogate in \\u escape"))?;
                        rest = &rest[6..];
                        0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00)
                    }
                    0xDC00..=0xDFFF => return Err(bad_escape("unpaired surrogate in \\u escape")),
                    unit => unit,
                };
                let decoded =
                    char::from_u32(code).ok_or_else(|| bad_escape("invalid \\u escape"))?;
                out.push(decoded);
                chars = rest.chars();
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    Ok(out)
}

fn escape(text: &str, is_key: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, c) in text.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{c}' => out.push_str("\\f"),
            ' ' if is_key || i == 0 => out.push_str("\\ "),
            '=' | ':' if is_key => {
                out.push('\\');
                out.push(c);
            }
            '#' | '!' if is_key && i == 0 => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_ascii() && !c.is_ascii_control() => out.push(c),
            c => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    let _ = write!(out, "\\u{unit:04X}");
                }
            }
        }
    }
    out
}

impl From<Format> for Decoded {
    fn from(value: Format) -> Self {
        Decoded::new(
            value
                .properties
                .into_iter()
                .map(|property| {
                    let record = Record::new(property.key, property.value);
                    match property.comment {
                        Some(comment) => record.with_comment(comment),
                        None => record,
                    }
                })
                .collect(),
        )
    }
}

impl From<&[Record]> for Format {
    fn from(records: &[Record]) -> Self {
        Format {
            properties: records
                .iter()
                .map(|record| Property {
                    key: record.key.clone(),
                    value: record.value.clone(),
                    comment: record.meta.comment.clone(),
                })
                .collect(),
        }
    }
}

/// Codec for [`FormatType::Properties`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PropertiesCodec;

impl FormatCodec for PropertiesCodec {
    fn format(&self) -> FormatType {
        FormatType::Properties
    }

    fn decode(&self, input: &[u8], _ctx: &CodecContext<'_>) -> Result<Decoded, Error> {
        let text = decode_text_or_latin1(input, FormatType::Properties)?;
        Ok(parse_properties(&text)?.into())
    }

    fn encode(&self, records: &[Record], _ctx: &CodecContext<'_>) -> Result<Encoded, Error> {
        Ok(Encoded::new(Format::from(records).to_bytes()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ExchangeOptions;
    use indoc::indoc;

    fn pairs(format: &Format) -> Vec<(&str, &str)> {
        format
            .properties
            .iter()
            .map(|p| (p.key.as_str(), p.value.as_str()))
            .collect()
    }

    #[test]
    fn test_parse_separators() {
        let format = Format::from_str(indoc! {r"
            equals=one
            colon:two
            space three
              padded   =   four
            empty=
            bare
        "})
        .unwrap();
        assert_eq!(
            pairs(&format),
            vec![
                ("equals", "one"),
                ("colon", "two"),
                ("space", "three"),
                ("padded", "four"),
                ("empty", ""),
                ("bare", ""),
            ]
        );
    }

    #[test]
    fn test_parse_comments_attach_to_next_property() {
        let format = Format::from_str(indoc! {"
            # Greeting shown on start
            ! second line
            hello=Hello

            # dangling

            bye=Bye
        "})
        .unwrap();
        assert_eq!(
            format.properties[0].comment.as_deref(),
            Some("Greeting shown on start\nsecond line")
        );
        assert_eq!(format.properties[1].comment, None);
    }

    #[test]
    fn test_parse_continuations_and_escapes() {
        let format = Format::from_str(indoc! {r"
            multi=first \
                  second \
                  third
            escaped\ key\=x=tab\there\nnewline
            unicode=caf\u00e9 \uD83D\uDE00
            backslash=ends with \\
            next=value
        "})
        .unwrap();
        assert_eq!(
            pairs(&format),
            vec![
                ("multi", "first second third"),
                ("escaped key=x", "tab\there\nnewline"),
                ("unicode", "café 😀"),
                ("backslash", "ends with \\"),
                ("next", "value"),
            ]
        );
    }

    #[test]
    fn test_bad_unicode_escape_reports_line() {
        let err = Format::from_str("ok=1\nbad=\\u12G4\n").unwrap_err();
        match err {
            Error::FormatParse { format, line, .. } => {
                assert_eq!(format, FormatType::Properties);
                assert_eq!(line, Some(2));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(Format::from_str("lone=\\uD83D\n").is_err());
    }

    #[test]
    fn test_write_escapes() {
        let format = Format {
            properties: vec![Property {
                key: "a key:with=seps".to_string(),
                value: " leading space, é and\nnewline".to_string(),
                comment: Some("note".to_string()),
            }],
        };
        let text = String::from_utf8(format.to_bytes().unwrap()).unwrap();
        assert_eq!(
            text,
            "# note\na\\ key\\:with\\=seps=\\ leading space, \\u00E9 and\\nnewline\n"
        );
        assert_eq!(Format::from_str(&text).unwrap(), format);
    }

    #[test]
    fn test_codec_latin1_fallback() {
        let options = ExchangeOptions::default();
        let ctx = CodecContext::new("fr", &options);
        let decoded = PropertiesCodec.decode(b"greeting=caf\xE9\n", &ctx).unwrap();
        assert_eq!(decoded.records, vec![Record::new("greeting", "café")]);
    }

    #[test]
    fn test_codec_empty_input_and_output() {
        let options = ExchangeOptions::default();
        let ctx = CodecContext::new("en", &options);
        assert!(PropertiesCodec.decode(b"  \n\n", &ctx).unwrap().records.is_empty());
        assert!(PropertiesCodec.encode(&[], &ctx).unwrap().bytes.is_empty());
    }
}
