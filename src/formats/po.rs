//! Support for gettext `.po` catalogs.
//!
//! The header entry (empty `msgid`) supplies the catalog language and the
//! `Plural-Forms` count. Regular entries become one record each, keyed by
//! `msgid`; `msgctxt`, translator/extracted comments and the `fuzzy` flag
//! travel as record metadata. Plural entries (`msgstr[n]`) are mapped onto
//! CLDR categories and collapse to their `other` form. Obsolete `#~`
//! entries are ignored.

use std::{
    collections::BTreeMap,
    io::{BufRead, Write},
};

use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    error::Error,
    formats::{FormatType, decode_text},
    plural_rules::category_for_index,
    traits::{CodecContext, Decoded, Encoded, FormatCodec, Parser},
    types::{Plural, Record},
};

/// CLDR has six plural categories; no catalog needs more `msgstr[n]` forms.
const MAX_PLURAL_FORMS: usize = 6;

lazy_static! {
    static ref NPLURALS_REGEX: Regex = Regex::new(r"nplurals\s*=\s*(\d+)").unwrap();
    static ref MSGSTR_INDEX_REGEX: Regex = Regex::new(r"^msgstr\[(\d+)\]\s*(.*)$").unwrap();
}

/// A parsed `.po` catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Format {
    /// Header fields in file order (`Language`, `Content-Type`, …).
    pub header: Vec<(String, String)>,
    pub messages: Vec<Message>,
}

impl Format {
    fn header_field(&self, name: &str) -> Option<&str> {
        self.header
            .iter()
            .find(|(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// The `Language` header, if present and non-empty.
    pub fn language(&self) -> Option<&str> {
        self.header_field("Language").filter(|value| !value.is_empty())
    }

    /// `nplurals` from the `Plural-Forms` header.
    pub fn nplurals(&self) -> Option<usize> {
        let forms = self.header_field("Plural-Forms")?;
        NPLURALS_REGEX
            .captures(forms)
            .and_then(|captures| captures[1].parse().ok())
    }
}

/// One catalog entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    pub context: Option<String>,
    pub id: String,
    pub id_plural: Option<String>,
    /// `msgstr`, or `msgstr[0..n]` for plural entries.
    pub strings: Vec<String>,
    /// Translator (`# `) and extracted (`#.`) comment lines.
    pub comments: Vec<String>,
    pub fuzzy: bool,
}

impl Message {
    fn is_plural(&self) -> bool {
        self.id_plural.is_some() || self.strings.len() > 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Context,
    Id,
    IdPlural,
    Str(usize),
}

#[derive(Debug, Default)]
struct Pending {
    context: Option<String>,
    id: Option<String>,
    id_plural: Option<String>,
    strings: BTreeMap<usize, String>,
    comments: Vec<String>,
    fuzzy: bool,
    field: Option<Field>,
}

impl Pending {
    fn has_translation(&self) -> bool {
        !self.strings.is_empty()
    }

    fn append(&mut self, text: String) {
        let target = match self.field {
            Some(Field::Context) => self.context.get_or_insert_with(String::new),
            Some(Field::Id) => self.id.get_or_insert_with(String::new),
            Some(Field::IdPlural) => self.id_plural.get_or_insert_with(String::new),
            Some(Field::Str(index)) => self.strings.entry(index).or_default(),
            None => return,
        };
        target.push_str(&text);
    }

    fn finish(self) -> Option<Message> {
        let id = self.id?;
        let count = self
            .strings
            .keys()
            .next_back()
            .map_or(0, |last| last.saturating_add(1));
        let mut strings = vec![String::new(); count];
        for (index, text) in self.strings {
            strings[index] = text;
        }
        Some(Message {
            context: self.context,
            id,
            id_plural: self.id_plural,
            strings,
            comments: self.comments,
            fuzzy: self.fuzzy,
        })
    }
}

impl Parser for Format {
    fn from_reader<R: BufRead>(reader: R) -> Result<Self, Error> {
        let mut messages = Vec::new();
        let mut pending = Pending::default();

        for (index, line) in reader.lines().enumerate() {
            let line_no = index + 1;
            let line = line.map_err(|e| Error::parse(FormatType::Po, Some(line_no), e.to_string()))?;
            let line = line.trim();

            if line.is_empty() {
                messages.extend(std::mem::take(&mut pending).finish());
                continue;
            }
            if line.starts_with("#~") {
                continue;
            }
            if let Some(comment) = line.strip_prefix('#') {
                if pending.has_translation() {
                    messages.extend(std::mem::take(&mut pending).finish());
                }
                if let Some(flags) = comment.strip_prefix(',') {
                    pending.fuzzy |= flags.split(',').any(|flag| flag.trim() == "fuzzy");
                } else if let Some(extracted) = comment.strip_prefix('.') {
                    pending.comments.push(extracted.trim().to_string());
                } else if comment.is_empty() || comment.starts_with(' ') {
                    pending.comments.push(comment.trim().to_string());
                }
                continue;
            }
            if line.starts_with('"') {
                if pending.field.is_none() {
                    return Err(Error::parse(
                        FormatType::Po,
                        Some(line_no),
                        "string continuation without a keyword",
                    ));
                }
                pending.append(parse_quoted(line, line_no)?);
                continue;
            }

            let (field, rest) = if let Some(rest) = line.strip_prefix("msgctxt") {
                (Field::Context, rest)
            } else if let Some(rest) = line.strip_prefix("msgid_plural") {
                (Field::IdPlural, rest)
            } else if let Some(rest) = line.strip_prefix("msgid") {
                (Field::Id, rest)
            } else if let Some(captures) = MSGSTR_INDEX_REGEX.captures(line) {
                let index: usize = captures[1].parse().map_err(|_| {
                    Error::parse(FormatType::Po, Some(line_no), "invalid msgstr index")
                })?;
                if index >= MAX_PLURAL_FORMS {
                    return Err(Error::parse(
                        FormatType::Po,
                        Some(line_no),
                        "msgstr index out of range",
                    ));
                }
                let text = parse_quoted(captures.get(2).map_or("", |m| m.as_str()), line_no)?;
                pending.field = Some(Field::Str(index));
                pending.append(text);
                continue;
            } else if let Some(rest) = line.strip_prefix("msgstr") {
                (Field::Str(0), rest)
            } else {
                return Err(Error::parse(
                    FormatType::Po,
                    Some(line_no),
                    format!("unexpected line `{line}`"),
                ));
            };

            // A new entry may start without a separating blank line.
            if matches!(field, Field::Context | Field::Id) && pending.has_translation() {
                messages.extend(std::mem::take(&mut pending).finish());
            }
            let text = parse_quoted(rest, line_no)?;
            pending.field = Some(field);
            pending.append(text);
        }
        messages.extend(pending.finish());

        let mut header = Vec::new();
        if let Some(position) = messages
            .iter()
            .position(|m| m.id.is_empty() && m.context.is_none())
        {
            let entry = messages.remove(position);
            header = parse_header(entry.strings.first().map_or("", String::as_str));
        }

        Ok(Format { header, messages })
    }

    fn to_writer<W: Write>(&self, mut writer: W) -> Result<(), Error> {
        let mut content = String::new();

        content.push_str("msgid \"\"\nmsgstr \"\"\n");
        for (name, value) in &self.header {
            content.push_str(&quote(&format!("{name}: {value}\n")));
            content.push('\n');
        }

        for message in &self.messages {
            content.push('\n');
            for comment in &message.comments {
                for line in comment.lines() {
                    content.push_str("#. ");
                    content.push_str(line);
                    content.push('\n');
                }
            }
            if message.fuzzy {
                content.push_str("#, fuzzy\n");
            }
            if let Some(context) = &message.context {
                write_field(&mut content, "msgctxt", context);
            }
            write_field(&mut content, "msgid", &message.id);
            if let Some(id_plural) = &message.id_plural {
                write_field(&mut content, "msgid_plural", id_plural);
                for (index, text) in message.strings.iter().enumerate() {
                    write_field(&mut content, &format!("msgstr[{index}]"), text);
                }
            } else {
                let text = message.strings.first().map_or("", String::as_str);
                write_field(&mut content, "msgstr", text);
            }
        }

        writer.write_all(content.as_bytes()).map_err(Error::Io)
    }
}

fn parse_header(text: &str) -> Vec<(String, String)> {
    text.lines()
        .filter_map(|line| {
            let (name, value) = line.split_once(':')?;
            Some((name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Parses a C-style quoted string (`"..."`) and resolves its escapes.
fn parse_quoted(raw: &str, line: usize) -> Result<String, Error> {
    let raw = raw.trim();
    let inner = raw
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .filter(|_| raw.len() >= 2)
        .ok_or_else(|| Error::parse(FormatType::Po, Some(line), "expected a quoted string"))?;

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('a') => out.push('\u{7}'),
                Some('b') => out.push('\u{8}'),
                Some('f') => out.push('\u{c}'),
                Some('v') => out.push('\u{b}'),
                Some(other) => out.push(other),
                None => {
                    return Err(Error::parse(
                        FormatType::Po,
                        Some(line),
                        "unterminated escape sequence",
                    ));
                }
            },
            '"' => {
                return Err(Error::parse(
                    FormatType::Po,
                    Some(line),
                    "unescaped quote inside string",
                ));
            }
            c => out.push(c),
        }
    }
    Ok(out)
}

fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
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
    out.push('"');
    out
}

/// Writes `keyword "text"`, splitting multi-line text after each newline.
fn write_field(content: &mut String, keyword: &str, text: &str) {
    let trimmed = text.strip_suffix('\n').unwrap_or(text);
    if !trimmed.contains('\n') {
        content.push_str(&format!("{keyword} {}\n", quote(text)));
        return;
    }
    content.push_str(&format!("{keyword} \"\"\n"));
    for segment in text.split_inclusive('\n') {
        content.push_str(&quote(segment));
        content.push('\n');
    }
}

impl Format {
    /// Converts the catalog into records, resolving plural indices for `locale`.
    fn into_records(self, locale: &str) -> Vec<Record> {
        let nplurals = self.nplurals();
        let locale = self.language().unwrap_or(locale).to_string();
        self.messages
            .into_iter()
            .map(|message| {
                let plural = if message.is_plural() {
                    Plural::new(message.strings.iter().enumerate().map(|(index, text)| {
                        (category_for_index(&locale, index, nplurals), text.clone())
                    }))
                } else {
                    None
                };
                let mut record = match plural {
                    Some(plural) => Record::from_plural(message.id, plural),
                    None => Record::new(
                        message.id,
                        message.strings.into_iter().next().unwrap_or_default(),
                    ),
                };
                record.meta.context = message.context;
                record.meta.fuzzy = message.fuzzy;
                if !message.comments.is_empty() {
                    record.meta.comment = Some(message.comments.join("\n"));
                }
                record
            })
            .collect()
    }

    fn from_records(records: &[Record], ctx: &CodecContext<'_>) -> Self {
        let header = vec![
            ("Language".to_string(), ctx.locale.to_string()),
            ("MIME-Version".to_string(), "1.0".to_string()),
            (
                "Content-Type".to_string(),
                "text/plain; charset=UTF-8".to_string(),
            ),
            ("Content-Transfer-Encoding".to_string(), "8bit".to_string()),
            ("X-Generator".to_string(), ctx.options.generator.clone()),
        ];
        let messages = records
            .iter()
            .map(|record| Message {
                context: record.meta.context.clone(),
                id: record.key.clone(),
                id_plural: None,
                strings: vec![record.value.clone()],
                comments: record.meta.comment.iter().cloned().collect(),
                fuzzy: record.meta.fuzzy,
            })
            .collect();
        Format { header, messages }
    }
}

/// Codec for [`FormatType::Po`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PoCodec;

impl FormatCodec for PoCodec {
    fn format(&self) -> FormatType {
        FormatType::Po
    }

    fn decode(&self, input: &[u8], ctx: &CodecContext<'_>) -> Result<Decoded, Error> {
        let text = decode_text(input, FormatType::Po)?;
        let format = Format::from_str(&text)?;
        let language = format.language().map(str::to_string);
        Ok(Decoded {
            language,
            records: format.into_records(ctx.locale),
        })
    }

    fn encode(&self, records: &[Record], ctx: &CodecContext<'_>) -> Result<Encoded, Error> {
        Ok(Encoded::new(Format::from_records(records, ctx).to_bytes()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{options::ExchangeOptions, types::PluralCategory};
    use indoc::indoc;

    const SAMPLE: &str = indoc! {r#"
        # Translator note
        msgid ""
        msgstr ""
        "Language: fr\n"
        "Plural-Forms: nplurals=2; plural=(n > 1);\n"

        #. Shown on the start screen
        #: src/main.c:12
        msgid "hello"
        msgstr "Bonjour"

        #, fuzzy, c-format
        msgctxt "menu"
        msgid "open"
        msgstr ""
        "Ouvrir\n"
        "le fichier"

        msgid "apple"
        msgid_plural "apples"
        msgstr[0] "une pomme"
        msgstr[1] "%d pommes"

        #~ msgid "old"
        #~ msgstr "vieux"
    "#};

    #[test]
    fn test_parse_sample() {
        let format = Format::from_str(SAMPLE).unwrap();
        assert_eq!(format.language(), Some("fr"));
        assert_eq!(format.nplurals(), Some(2));
        assert_eq!(format.messages.len(), 3);

        let hello = &format.messages[0];
        assert_eq!(hello.id, "hello");
        assert_eq!(hello.strings, vec!["Bonjour".to_string()]);
        assert_eq!(hello.comments, vec!["Shown on the start screen".to_string()]);

        let open = &format.messages[1];
        assert!(open.fuzzy);
        assert_eq!(open.context.as_deref(), Some("menu"));
        assert_eq!(open.strings[0], "Ouvrir\nle fichier");

        let apple = &format.messages[2];
        assert_eq!(apple.id_plural.as_deref(), Some("apples"));
        assert_eq!(apple.strings.len(), 2);
    }

    #[test]
    fn test_decode_collapses_plurals_to_other() {
        let options = ExchangeOptions::default();
        let ctx = CodecContext::new("fr", &options);
        let decoded = PoCodec.decode(SAMPLE.as_bytes(), &ctx).unwrap();
        assert_eq!(decoded.language.as_deref(), Some("fr"));

        let apple = &decoded.records[2];
        assert_eq!(apple.key, "apple");
        assert_eq!(apple.value, "%d pommes");
        let plural = apple.meta.plural.as_ref().unwrap();
        assert_eq!(plural.dropped(), vec![PluralCategory::One]);

        let open = &decoded.records[1];
        assert_eq!(open.meta.context.as_deref(), Some("menu"));
        assert!(open.meta.fuzzy);
    }

    #[test]
    fn test_entries_without_blank_lines() {
        let format = Format::from_str(indoc! {r#"
            msgid "a"
            msgstr "A"
            msgid "b"
            msgstr "B"
        "#})
        .unwrap();
        let ids: Vec<_> = format.messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn test_escapes() {
        let format =
            Format::from_str(r#"msgid "say \"hi\"\t\\"
msgstr "dis \"salut\"""#)
                .unwrap();
        assert_eq!(format.messages[0].id, "say \"hi\"\t\\");
        assert_eq!(format.messages[0].strings[0], "dis \"salut\"");
    }

    #[test]
    fn test_malformed_reports_line() {
        let err = Format::from_str("msgid \"a\"\nmsgstr \"unterminated\n").unwrap_err();
        match err {
            Error::FormatParse { format, line, .. } => {
                assert_eq!(format, FormatType::Po);
                assert_eq!(line, Some(2));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(Format::from_str("bogus line\n").is_err());
    }

    #[test]
    fn test_plural_index_out_of_range() {
        for index in ["6", "4000000000", "18446744073709551615", "99999999999999999999999"] {
            let input = format!("msgid \"a\"\nmsgid_plural \"as\"\nmsgstr[{index}] \"x\"\n");
            match Format::from_str(&input) {
                Err(Error::FormatParse { format, line, .. }) => {
                    assert_eq!(format, FormatType::Po);
                    assert_eq!(line, Some(3), "msgstr[{index}]");
                }
                other => panic!("msgstr[{index}]: unexpected {other:?}"),
            }
        }

        let format = Format::from_str("msgid \"a\"\nmsgid_plural \"as\"\nmsgstr[5] \"x\"\n").unwrap();
        assert_eq!(format.messages[0].strings.len(), 6);
    }

    #[test]
    fn test_encode_header_and_entries() {
        let options = ExchangeOptions::default();
        let ctx = CodecContext::new("de", &options);
        let records = vec![
            Record::new("hello", "Hallo").with_comment("greeting"),
            Record::new("multi", "eins\nzwei"),
            Record::new("untranslated", ""),
        ];
        let encoded = PoCodec.encode(&records, &ctx).unwrap();
        let text = String::from_utf8(encoded.bytes).unwrap();
        assert_eq!(
            text,
            indoc! {r#"
                msgid ""
                msgstr ""
                "Language: de\n"
                "MIME-Version: 1.0\n"
                "Content-Type: text/plain; charset=UTF-8\n"
                "Content-Transfer-Encoding: 8bit\n"
                "X-Generator: termport\n"

                #. greeting
                msgid "hello"
                msgstr "Hallo"

                msgid "multi"
                msgstr ""
                "eins\n"
                "zwei"

                msgid "untranslated"
                msgstr ""
            "#}
        );

        let decoded = PoCodec.decode(text.as_bytes(), &ctx).unwrap();
        assert_eq!(decoded.language.as_deref(), Some("de"));
        assert_eq!(decoded.records, records);
    }

    #[test]
    fn test_empty_catalog() {
        let options = ExchangeOptions::default();
        let ctx = CodecContext::new("en", &options);
        let encoded = PoCodec.encode(&[], &ctx).unwrap();
        let decoded = PoCodec.decode(&encoded.bytes, &ctx).unwrap();
        assert!(decoded.records.is_empty());
        assert_eq!(decoded.language.as_deref(), Some("en"));
        assert!(PoCodec.decode(b"   \n", &ctx).unwrap().records.is_empty());
    }
}
