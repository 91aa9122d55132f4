//! Support for XLIFF 1.2 documents.
//!
//! Each `<trans-unit>` is one record: the key is its `resname` attribute,
//! falling back to `id`, and the value is its `<target>` (empty when the
//! unit is untranslated). `<note>` becomes the record comment. The
//! `target-language` of the `<file>` element is reported so imports can be
//! checked against the requested locale.
//!
//! Plural messages exported by gettext tooling arrive as
//! `<group restype="x-gettext-plurals">` with one unit per form; they
//! collapse to their `other` form.

use std::io::{BufRead, Write};

use quick_xml::{
    Reader, Writer,
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};

use crate::{
    error::{Error, line_at},
    formats::{FormatType, decode_text},
    plural_rules::category_for_index,
    traits::{CodecContext, Decoded, Encoded, FormatCodec, Parser},
    types::{Plural, Record},
};

const XLIFF_NAMESPACE: &str = "urn:oasis:names:tc:xliff:document:1.2";
const PLURAL_GROUP: &str = "x-gettext-plurals";

/// A parsed XLIFF 1.2 file. Only the first `<file>` header is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Format {
    pub source_language: Option<String>,
    pub target_language: Option<String>,
    pub original: Option<String>,
    pub units: Vec<TransUnit>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransUnit {
    pub id: String,
    pub resname: Option<String>,
    pub source: String,
    pub target: Option<String>,
    pub note: Option<String>,
    /// Key of the enclosing plural group, if any.
    pub plural_group: Option<String>,
}

impl TransUnit {
    pub fn key(&self) -> &str {
        self.resname.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Source,
    Target,
    Note,
}

impl Field {
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"source" => Some(Field::Source),
            b"target" => Some(Field::Target),
            b"note" => Some(Field::Note),
            _ => None,
        }
    }

    fn slot<'a>(&self, unit: &'a mut TransUnit) -> &'a mut String {
        match self {
            Field::Source => &mut unit.source,
            Field::Target => unit.target.get_or_insert_with(String::new),
            Field::Note => unit.note.get_or_insert_with(String::new),
        }
    }
}

impl Parser for Format {
    fn from_reader<R: BufRead>(mut reader: R) -> Result<Self, Error> {
        let mut text = String::new();
        reader
            .read_to_string(&mut text)
            .map_err(|e| Error::parse(FormatType::Xliff12, None, e.to_string()))?;
        parse_xliff(&text)
    }

    fn to_writer<W: Write>(&self, mut writer: W) -> Result<(), Error> {
        let mut xml_writer = Writer::new_with_indent(Vec::new(), b' ', 2);

        xml_writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(write_error)?;

        let mut xliff = BytesStart::new("xliff");
        xliff.push_attribute(("version", "1.2"));
        xliff.push_attribute(("xmlns", XLIFF_NAMESPACE));
        xml_writer
            .write_event(Event::Start(xliff))
            .map_err(write_error)?;

        let mut file = BytesStart::new("file");
        if let Some(source) = &self.source_language {
            file.push_attribute(("source-language", source.as_str()));
        }
        if let Some(target) = &self.target_language {
            file.push_attribute(("target-language", target.as_str()));
        }
        file.push_attribute(("datatype", "plaintext"));
        if let Some(original) = &self.original {
            file.push_attribute(("original", original.as_str()));
        }
        xml_writer
            .write_event(Event::Start(file))
            .map_err(write_error)?;
        xml_writer
            .write_event(Event::Start(BytesStart::new("body")))
            .map_err(write_error)?;

        for unit in &self.units {
            let mut start = BytesStart::new("trans-unit");
            start.push_attribute(("id", unit.id.as_str()));
            if let Some(resname) = &unit.resname {
                start.push_attribute(("resname", resname.as_str()));
            }
            xml_writer
                .write_event(Event::Start(start))
                .map_err(write_error)?;
            write_text_element(&mut xml_writer, "source", &unit.source)?;
            if let Some(target) = &unit.target {
                write_text_element(&mut xml_writer, "target", target)?;
            }
            if let Some(note) = &unit.note {
                write_text_element(&mut xml_writer, "note", note)?;
            }
            xml_writer
                .write_event(Event::End(BytesEnd::new("trans-unit")))
                .map_err(write_error)?;
        }

        for name in ["body", "file", "xliff"] {
            xml_writer
                .write_event(Event::End(BytesEnd::new(name)))
                .map_err(write_error)?;
        }

        let mut bytes = xml_writer.into_inner();
        bytes.push(b'\n');
        writer.write_all(&bytes).map_err(Error::Io)
    }
}

fn write_error(error: impl std::fmt::Display) -> Error {
    Error::parse(FormatType::Xliff12, None, error.to_string())
}

fn write_text_element(
    xml_writer: &mut Writer<Vec<u8>>,
    name: &str,
    text: &str,
) -> Result<(), Error> {
    xml_writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(write_error)?;
    xml_writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(write_error)?;
    xml_writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(write_error)?;
    Ok(())
}

fn attribute(element: &BytesStart, name: &[u8]) -> Result<Option<String>, String> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        if attr.key.local_name().as_ref() == name {
            let value = attr.unescape_value().map_err(|e| e.to_string())?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn parse_xliff(text: &str) -> Result<Format, Error> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(false);

    let error_at = |position: u64, reason: String| {
        let offset = usize::try_from(position).unwrap_or(usize::MAX);
        Error::parse(FormatType::Xliff12, Some(line_at(text.as_bytes(), offset)), reason)
    };

    let mut format = Format::default();
    let mut seen_file = false;
    let mut plural_group: Option<String> = None;
    let mut unit: Option<TransUnit> = None;
    let mut field: Option<Field> = None;
    // Elements open inside the current `<trans-unit>`.
    let mut depth = 0usize;

    loop {
        let position = reader.buffer_position() as u64;
        let event = reader
            .read_event()
            .map_err(|e| error_at(position, e.to_string()))?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                let attr = |name: &[u8]| attribute(e, name).map_err(|reason| error_at(position, reason));
                match e.local_name().as_ref() {
                    b"file" if !seen_file => {
                        seen_file = true;
                        format.source_language = attr(b"source-language")?;
                        format.target_language = attr(b"target-language")?;
                        format.original = attr(b"original")?;
                    }
                    b"group" if !is_empty => {
                        if attr(b"restype")?.as_deref() == Some(PLURAL_GROUP) {
                            let key = match attr(b"resname")? {
                                Some(resname) => Some(resname),
                                None => attr(b"id")?,
                            };
                            plural_group = Some(key.unwrap_or_default());
                        }
                    }
                    b"trans-unit" => {
                        let new_unit = TransUnit {
                            id: attr(b"id")?.unwrap_or_default(),
                            resname: attr(b"resname")?,
                            plural_group: plural_group.clone(),
                            ..TransUnit::default()
                        };
                        if is_empty {
                            format.units.push(new_unit);
                        } else {
                            unit = Some(new_unit);
                            depth = 0;
                        }
                    }
                    name => {
                        let Some(current) = unit.as_mut() else {
                            continue;
                        };
                        // Only direct children of the unit; `<alt-trans>` carries its own.
                        if depth == 0
                            && let Some(next) = Field::from_name(name)
                        {
                            // Touch the slot so `<target/>` still counts as present.
                            next.slot(current);
                            if !is_empty {
                                field = Some(next);
                            }
                        }
                        if !is_empty {
                            depth += 1;
                        }
                    }
                }
            }
            Event::Text(e) => {
                if let (Some(current), Some(field)) = (unit.as_mut(), field) {
                    let text = e.unescape().map_err(|e| error_at(position, e.to_string()))?;
                    field.slot(current).push_str(&text);
                }
            }
            Event::CData(e) => {
                if let (Some(current), Some(field)) = (unit.as_mut(), field) {
                    let text = std::str::from_utf8(&e).map_err(|e| error_at(position, e.to_string()))?;
                    field.slot(current).push_str(text);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"trans-unit" => {
                    field = None;
                    if let Some(done) = unit.take() {
                        format.units.push(done);
                    }
                }
                b"group" if unit.is_none() => plural_group = None,
                _ if unit.is_some() => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        field = None;
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    if unit.is_some() {
        return Err(Error::parse(
            FormatType::Xliff12,
            Some(line_at(text.as_bytes(), text.len())),
            "unterminated <trans-unit>",
        ));
    }
    Ok(format)
}

impl Format {
    fn into_records(self, locale: &str) -> Vec<Record> {
        let locale = self.target_language.as_deref().unwrap_or(locale).to_string();
        let mut records: Vec<Record> = Vec::new();
        let mut units = self.units.into_iter().peekable();

        while let Some(unit) = units.next() {
            let Some(group) = unit.plural_group.clone() else {
                let key = unit.key().to_string();
                let mut record = Record::new(key, unit.target.unwrap_or_default());
                record.meta.comment = unit.note;
                records.push(record);
                continue;
            };

            let mut forms = vec![unit.target.unwrap_or_default()];
            while let Some(next) = units.next_if(|next| next.plural_group.as_ref() == Some(&group)) {
                forms.push(next.target.unwrap_or_default());
            }
            let count = forms.len();
            let plural = Plural::new(forms.into_iter().enumerate().map(|(index, value)| {
                (category_for_index(&locale, index, Some(count)), value)
            }));
            if let Some(plural) = plural {
                records.push(Record::from_plural(group, plural));
            }
        }
        records
    }

    fn from_records(records: &[Record], ctx: &CodecContext<'_>) -> Self {
        Format {
            source_language: Some(
                ctx.options
                    .source_locale
                    .clone()
                    .unwrap_or_else(|| ctx.locale.to_string()),
            ),
            target_language: Some(ctx.locale.to_string()),
            original: Some(ctx.options.generator.clone()),
            units: records
                .iter()
                .map(|record| TransUnit {
                    id: record.key.clone(),
                    resname: None,
                    source: record.key.clone(),
                    target: Some(record.value.clone()),
                    note: record.meta.comment.clone(),
                    plural_group: None,
                })
                .collect(),
        }
    }
}

/// Codec for [`FormatType::Xliff12`].
#[derive(Debug, Clone, Copy, Default)]
pub struct XliffCodec;

impl FormatCodec for XliffCodec {
    fn format(&self) -> FormatType {
        FormatType::Xliff12
    }

    fn decode(&self, input: &[u8], ctx: &CodecContext<'_>) -> Result<Decoded, Error> {
        let text = decode_text(input, FormatType::Xliff12)?;
        if text.trim().is_empty() {
            return Ok(Decoded::default());
        }
        let format = parse_xliff(&text)?;
        let language = format.target_language.clone().filter(|l| !l.is_empty());
        Ok(Decoded {
            language,
            records: format.into_records(ctx.locale),
        })
    }

    fn encode(&self, records: &[Record], ctx: &CodecContext<'_>) -> Result<Encoded, Error> {
        Ok(Encoded::new(Format::from_records(records, ctx).to_bytes()?))
    }
}
