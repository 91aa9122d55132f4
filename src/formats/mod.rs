//! All supported localization file formats for termport.
//!
//! Each submodule holds one independent codec. [`FormatType`] is the tagged
//! variant that selects among them; nothing is shared between the grammars
//! beyond the [`FormatCodec`] contract, the key-path model and the text
//! decoding helpers below.

pub mod android_strings;
pub mod csv;
pub mod json;
pub mod po;
pub mod properties;
pub mod strings;
pub mod xliff;
pub mod yaml;

use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::{Error, error::line_at, traits::FormatCodec};

/// Represents all supported localization file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatType {
    /// Two-column `key,value` CSV.
    Csv,
    /// XLIFF 1.2 bilingual XML.
    Xliff12,
    /// A single JSON object of key → string.
    JsonFlat,
    /// Nested JSON objects, keys joined with the key separator.
    JsonNested,
    /// A single YAML mapping of key → string.
    YamlFlat,
    /// Nested YAML mappings, keys joined with the key separator.
    YamlNested,
    /// Java `.properties`.
    Properties,
    /// gettext `.po`.
    Po,
    /// Apple `.strings`.
    Strings,
    /// Android `strings.xml`.
    AndroidXml,
}

impl FormatType {
    /// Every supported format, in declaration order.
    pub const ALL: [FormatType; 10] = [
        FormatType::Csv,
        FormatType::Xliff12,
        FormatType::JsonFlat,
        FormatType::JsonNested,
        FormatType::YamlFlat,
        FormatType::YamlNested,
        FormatType::Properties,
        FormatType::Po,
        FormatType::Strings,
        FormatType::AndroidXml,
    ];

    /// The identifier used by the API (`csv`, `xliff12`, `jsonflat`, …).
    pub fn id(&self) -> &'static str {
        match self {
            FormatType::Csv => "csv",
            FormatType::Xliff12 => "xliff12",
            FormatType::JsonFlat => "jsonflat",
            FormatType::JsonNested => "jsonnested",
            FormatType::YamlFlat => "yamlflat",
            FormatType::YamlNested => "yamlnested",
            FormatType::Properties => "properties",
            FormatType::Po => "po",
            FormatType::Strings => "strings",
            FormatType::AndroidXml => "androidxml",
        }
    }

    /// Returns the typical file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            FormatType::Csv => "csv",
            FormatType::Xliff12 => "xliff",
            FormatType::JsonFlat | FormatType::JsonNested => "json",
            FormatType::YamlFlat | FormatType::YamlNested => "yaml",
            FormatType::Properties => "properties",
            FormatType::Po => "po",
            FormatType::Strings => "strings",
            FormatType::AndroidXml => "xml",
        }
    }

    /// Returns the MIME type to serve an export with.
    pub fn content_type(&self) -> &'static str {
        match self {
            FormatType::Csv => "text/csv; charset=utf-8",
            FormatType::Xliff12 => "application/x-xliff+xml; charset=utf-8",
            FormatType::JsonFlat | FormatType::JsonNested => "application/json; charset=utf-8",
            FormatType::YamlFlat | FormatType::YamlNested => "application/x-yaml; charset=utf-8",
            FormatType::Properties => "text/x-java-properties; charset=utf-8",
            FormatType::Po => "text/x-gettext-translation; charset=utf-8",
            FormatType::Strings => "text/plain; charset=utf-8",
            FormatType::AndroidXml => "application/xml; charset=utf-8",
        }
    }

    /// Whether keys are split into a hierarchy for this format.
    pub fn is_nested(&self) -> bool {
        matches!(self, FormatType::JsonNested | FormatType::YamlNested)
    }

    /// Whether the file header declares a locale that imports cross-check.
    pub fn declares_locale(&self) -> bool {
        matches!(self, FormatType::Xliff12 | FormatType::Po)
    }

    /// Returns the codec implementing this format.
    pub fn codec(&self) -> &'static dyn FormatCodec {
        match self {
            FormatType::Csv => &csv::CsvCodec,
            FormatType::Xliff12 => &xliff::XliffCodec,
            FormatType::JsonFlat => &json::JsonCodec::FLAT,
            FormatType::JsonNested => &json::JsonCodec::NESTED,
            FormatType::YamlFlat => &yaml::YamlCodec::FLAT,
            FormatType::YamlNested => &yaml::YamlCodec::NESTED,
            FormatType::Properties => &properties::PropertiesCodec,
            FormatType::Po => &po::PoCodec,
            FormatType::Strings => &strings::StringsCodec,
            FormatType::AndroidXml => &android_strings::AndroidStringsCodec,
        }
    }
}

impl Display for FormatType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Accepts the API identifiers case-insensitively, plus a few common aliases.
///
/// ```rust
/// use termport::formats::FormatType;
/// use std::str::FromStr;
/// assert_eq!(FormatType::from_str("jsonnested").unwrap(), FormatType::JsonNested);
/// assert_eq!(FormatType::from_str("XLIFF12").unwrap(), FormatType::Xliff12);
/// assert!(FormatType::from_str("docx").is_err());
/// ```
impl FromStr for FormatType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "csv" => Ok(FormatType::Csv),
            "xliff12" | "xliff" | "xlf" => Ok(FormatType::Xliff12),
            "jsonflat" => Ok(FormatType::JsonFlat),
            "jsonnested" => Ok(FormatType::JsonNested),
            "yamlflat" => Ok(FormatType::YamlFlat),
            "yamlnested" => Ok(FormatType::YamlNested),
            "properties" => Ok(FormatType::Properties),
            "po" | "gettext" => Ok(FormatType::Po),
            "strings" => Ok(FormatType::Strings),
            "androidxml" | "android" => Ok(FormatType::AndroidXml),
            other => Err(Error::UnknownFormat(other.to_string())),
        }
    }
}

/// Decodes input bytes as text, honouring a UTF-8 or UTF-16 byte order mark.
///
/// Without a BOM the input must be valid UTF-8.
pub(crate) fn decode_text(input: &[u8], format: FormatType) -> Result<String, Error> {
    if let Some((encoding, bom_len)) = encoding_rs::Encoding::for_bom(input) {
        let (text, had_errors) = encoding.decode_without_bom_handling(&input[bom_len..]);
        if had_errors {
            return Err(Error::parse(
                format,
                None,
                format!("input is not valid {}", encoding.name()),
            ));
        }
        return Ok(text.into_owned());
    }
    match std::str::from_utf8(input) {
        Ok(text) => Ok(text.to_string()),
        Err(e) => Err(Error::parse(
            format,
            Some(line_at(input, e.valid_up_to())),
            "input is not valid UTF-8",
        )),
    }
}

/// Like [`decode_text`], but falls back to ISO-8859-1 for non-UTF-8 input.
pub(crate) fn decode_text_or_latin1(input: &[u8], format: FormatType) -> Result<String, Error> {
    match decode_text(input, format) {
        Ok(text) => Ok(text),
        Err(_) if encoding_rs::Encoding::for_bom(input).is_none() => {
            let (text, _) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(input);
            Ok(text.into_owned())
        }
        Err(e) => Err(e),
    }
}
