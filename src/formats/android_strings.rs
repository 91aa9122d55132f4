use quick_xml::{
    Reader, Writer,
    escape::partial_escape,
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};
use std::{
    io::{BufRead, Write},
    str::FromStr,
};

use crate::{
    error::{Error, line_at},
    formats::{FormatType, decode_text},
    traits::{CodecContext, Decoded, Encoded, FormatCodec, Parser},
    types::{Plural, PluralCategory, Record},
};

/// An Android `res/values/strings.xml` file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Format {
    pub entries: Vec<AndroidEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AndroidEntry {
    String(StringResource),
    Plurals(PluralsResource),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringResource {
    pub name: String,
    /// Unescaped text.
    pub value: String,
    pub translatable: Option<bool>,
    /// XML comment directly above the element.
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluralsResource {
    pub name: String,
    pub items: Vec<(PluralCategory, String)>,
    pub translatable: Option<bool>,
}

impl Parser for Format {
    /// Parse from any reader.
    fn from_reader<R: BufRead>(mut reader: R) -> Result<Self, Error> {
        let mut text = String::new();
        reader
            .read_to_string(&mut text)
            .map_err(|e| Error::parse(FormatType::AndroidXml, None, e.to_string()))?;
        parse_resources(&text)
    }

    /// Write to any writer (file, memory, etc.).
    fn to_writer<W: Write>(&self, mut writer: W) -> Result<(), Error> {
        let mut xml_writer = Writer::new_with_indent(Vec::new(), b' ', 4);

        xml_writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
            .map_err(write_error)?;

        if self.entries.is_empty() {
            xml_writer
                .write_event(Event::Empty(BytesStart::new("resources")))
                .map_err(write_error)?;
        } else {
            xml_writer
                .write_event(Event::Start(BytesStart::new("resources")))
                .map_err(write_error)?;
            for entry in &self.entries {
                match entry {
                    AndroidEntry::String(sr) => write_string(&mut xml_writer, sr)?,
                    AndroidEntry::Plurals(pr) => write_plurals(&mut xml_writer, pr)?,
                }
            }
            xml_writer
                .write_event(Event::End(BytesEnd::new("resources")))
                .map_err(write_error)?;
        }

        let mut bytes = xml_writer.into_inner();
        bytes.push(b'\n');
        writer.write_all(&bytes).map_err(Error::Io)
    }
}

fn write_error(error: impl std::fmt::Display) -> Error {
    Error::parse(FormatType::AndroidXml, None, error.to_string())
}

fn write_string(xml_writer: &mut Writer<Vec<u8>>, sr: &StringResource) -> Result<(), Error> {
    if let Some(comment) = &sr.comment {
        let comment = format!(" {} ", comment.replace("--", "- -"));
        xml_writer
            .write_event(Event::Comment(BytesText::from_escaped(comment)))
            .map_err(write_error)?;
    }
    let mut elem = BytesStart::new("string");
    elem.push_attribute(("name", sr.name.as_str()));
    if let Some(translatable) = sr.translatable {
        elem.push_attribute(("translatable", if translatable { "true" } else { "false" }));
    }
    write_text_element(xml_writer, elem, "string", &sr.value)
}

fn write_plurals(xml_writer: &mut Writer<Vec<u8>>, pr: &PluralsResource) -> Result<(), Error> {
    let mut elem = BytesStart::new("plurals");
    elem.push_attribute(("name", pr.name.as_str()));
    if let Some(translatable) = pr.translatable {
        elem.push_attribute(("translatable", if translatable { "true" } else { "false" }));
    }
    xml_writer
        .write_event(Event::Start(elem))
        .map_err(write_error)?;
    for (category, value) in &pr.items {
        let mut item = BytesStart::new("item");
        item.push_attribute(("quantity", category.as_str()));
        write_text_element(xml_writer, item, "item", value)?;
    }
    xml_writer
        .write_event(Event::End(BytesEnd::new("plurals")))
        .map_err(write_error)?;
    Ok(())
}

fn write_text_element(
    xml_writer: &mut Writer<Vec<u8>>,
    start: BytesStart<'_>,
    name: &str,
    value: &str,
) -> Result<(), Error> {
    xml_writer
        .write_event(Event::Start(start))
        .map_err(write_error)?;
    let escaped = escape_android(value);
    xml_writer
        .write_event(Event::Text(BytesText::from_escaped(partial_escape(&escaped))))
        .map_err(write_error)?;
    xml_writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(write_error)?;
    Ok(())
}

/// Escapes the characters Android's resource compiler treats specially.
fn escape_android(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for (i, c) in value.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '@' | '?' if i == 0 => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

/// Reverses [`escape_android`]. Surrounding double quotes are dropped.
fn unescape_android(raw: &str) -> String {
    let raw = match raw.strip_prefix('"').and_then(|rest| rest.strip_suffix('"')) {
        Some(inner) if raw.len() >= 2 => inner,
        _ => raw,
    };
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('u') => {
                let rest = chars.as_str();
                let decoded = rest
                    .get(..4)
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .and_then(char::from_u32);
                match decoded {
                    Some(decoded) => {
                        out.push(decoded);
                        chars = rest[4..].chars();
                    }
                    None => out.push('u'),
                }
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[derive(Debug)]
enum Open {
    String(StringResource),
    Plurals(PluralsResource),
    Item(PluralsResource, Option<PluralCategory>),
}

fn parse_resources(text: &str) -> Result<Format, Error> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(false);

    let error_at = |position: u64, reason: String| {
        let offset = usize::try_from(position).unwrap_or(usize::MAX);
        Error::parse(FormatType::AndroidXml, Some(line_at(text.as_bytes(), offset)), reason)
    };

    let mut entries = Vec::new();
    let mut comment: Option<String> = None;
    let mut open: Option<Open> = None;
    let mut buffer = String::new();

    loop {
        let position = reader.buffer_position() as u64;
        let event = reader
            .read_event()
            .map_err(|e| error_at(position, e.to_string()))?;
        match event {
            Event::Comment(e) if open.is_none() => {
                let text = e.unescape().map_err(|e| error_at(position, e.to_string()))?;
                comment = Some(text.trim().to_string());
            }
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                let mut name = None;
                let mut translatable = None;
                let mut quantity = None;
                for attr in e.attributes() {
                    let attr = attr.map_err(|e| error_at(position, e.to_string()))?;
                    let value = attr
                        .unescape_value()
                        .map_err(|e| error_at(position, e.to_string()))?
                        .into_owned();
                    match attr.key.as_ref() {
                        b"name" => name = Some(value),
                        b"translatable" => translatable = Some(value == "true"),
                        b"quantity" => quantity = PluralCategory::from_str(&value).ok(),
                        _ => {}
                    }
                }

                match (e.name().as_ref(), open.take()) {
                    (b"string", None) => {
                        let name = name.ok_or_else(|| {
                            error_at(position, "string tag missing 'name'".to_string())
                        })?;
                        let sr = StringResource {
                            name,
                            value: String::new(),
                            translatable,
                            comment: comment.take(),
                        };
                        if is_empty {
                            entries.push(AndroidEntry::String(sr));
                        } else {
                            buffer.clear();
                            open = Some(Open::String(sr));
                        }
                    }
                    (b"plurals", None) => {
                        let name = name.ok_or_else(|| {
                            error_at(position, "plurals tag missing 'name'".to_string())
                        })?;
                        comment = None;
                        let pr = PluralsResource {
                            name,
                            items: Vec::new(),
                            translatable,
                        };
                        if is_empty {
                            entries.push(AndroidEntry::Plurals(pr));
                        } else {
                            open = Some(Open::Plurals(pr));
                        }
                    }
                    (b"item", Some(Open::Plurals(mut pr))) => {
                        if is_empty {
                            if let Some(category) = quantity {
                                pr.items.push((category, String::new()));
                            }
                            open = Some(Open::Plurals(pr));
                        } else {
                            buffer.clear();
                            open = Some(Open::Item(pr, quantity));
                        }
                    }
                    // Inline markup (`<b>`, `<xliff:g>`) contributes its text only.
                    (_, current) => open = current,
                }
            }
            Event::Text(e) => {
                if matches!(open, Some(Open::String(_)) | Some(Open::Item(..))) {
                    let text = e.unescape().map_err(|e| error_at(position, e.to_string()))?;
                    buffer.push_str(&text);
                }
            }
            Event::CData(e) => {
                if matches!(open, Some(Open::String(_)) | Some(Open::Item(..))) {
                    let text =
                        std::str::from_utf8(&e).map_err(|e| error_at(position, e.to_string()))?;
                    buffer.push_str(text);
                }
            }
            Event::End(e) => match (e.name().as_ref(), open.take()) {
                (b"string", Some(Open::String(mut sr))) => {
                    sr.value = unescape_android(&buffer);
                    entries.push(AndroidEntry::String(sr));
                }
                (b"item", Some(Open::Item(mut pr, quantity))) => {
                    if let Some(category) = quantity {
                        pr.items.push((category, unescape_android(&buffer)));
                    }
                    open = Some(Open::Plurals(pr));
                }
                (b"plurals", Some(Open::Plurals(pr))) => entries.push(AndroidEntry::Plurals(pr)),
                (_, current) => open = current,
            },
            Event::Eof => break,
            _ => {}
        }
    }

    if open.is_some() {
        return Err(Error::parse(
            FormatType::AndroidXml,
            Some(line_at(text.as_bytes(), text.len())),
            "unexpected end of file inside a resource",
        ));
    }
    Ok(Format { entries })
}

impl From<Format> for Decoded {
    fn from(value: Format) -> Self {
        Decoded::new(
            value
                .entries
                .into_iter()
                .filter_map(|entry| match entry {
                    AndroidEntry::String(sr) if sr.translatable != Some(false) => {
                        let record = Record::new(sr.name, sr.value);
                        Some(match sr.comment {
                            Some(comment) => record.with_comment(comment),
                            None => record,
                        })
                    }
                    AndroidEntry::Plurals(pr) if pr.translatable != Some(false) => {
                        let plural = Plural::new(pr.items.into_iter())?;
                        Some(Record::from_plural(pr.name, plural))
                    }
                    _ => None,
                })
                .collect(),
        )
    }
}

/// Codec for [`FormatType::AndroidXml`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AndroidStringsCodec;

impl FormatCodec for AndroidStringsCodec {
    fn format(&self) -> FormatType {
        FormatType::AndroidXml
    }

    fn decode(&self, input: &[u8], _ctx: &CodecContext<'_>) -> Result<Decoded, Error> {
        let text = decode_text(input, FormatType::AndroidXml)?;
        if text.trim().is_empty() {
            return Ok(Decoded::default());
        }
        Ok(parse_resources(&text)?.into())
    }

    fn encode(&self, records: &[Record], _ctx: &CodecContext<'_>) -> Result<Encoded, Error> {
        let format = Format {
            entries: records
                .iter()
                .map(|record| {
                    AndroidEntry::String(StringResource {
                        name: record.key.clone(),
                        value: record.value.clone(),
                        translatable: None,
                        comment: record.meta.comment.clone(),
                    })
                })
                .collect(),
        };
        Ok(Encoded::new(format.to_bytes()?))
    }
}
