//! Format-level entry points: decode a file, encode records, convert
//! between formats.
//!
//! These wrap the per-format [`FormatCodec`](crate::traits::FormatCodec)s
//! with the checks every caller needs, such as comparing the locale a file
//! declares with the locale it is being read as.

use crate::{
    error::Error,
    formats::FormatType,
    options::ExchangeOptions,
    traits::{CodecContext, Decoded, Encoded},
    types::{Record, same_locale},
};

/// Decodes `input` as `format` for `locale`.
///
/// Fails with [`Error::LocaleMismatch`] when the file declares a different
/// locale (XLIFF `target-language`, PO `Language`).
pub fn decode(
    input: &[u8],
    format: FormatType,
    locale: &str,
    options: &ExchangeOptions,
) -> Result<Decoded, Error> {
    let ctx = CodecContext::new(locale, options);
    let decoded = format.codec().decode(input, &ctx)?;
    if format.declares_locale()
        && let Some(declared) = &decoded.language
        && !same_locale(declared, locale)
    {
        return Err(Error::LocaleMismatch {
            declared: declared.clone(),
            requested: locale.to_string(),
        });
    }
    tracing::debug!(%format, locale, records = decoded.records.len(), "decoded file");
    Ok(decoded)
}

/// Encodes `records` as `format` for `locale`.
pub fn encode(
    records: &[Record],
    format: FormatType,
    locale: &str,
    options: &ExchangeOptions,
) -> Result<Encoded, Error> {
    let ctx = CodecContext::new(locale, options);
    format.codec().encode(records, &ctx)
}

/// Converts a file from one format to another without touching any project.
///
/// ```rust
/// use termport::{ExchangeOptions, FormatType, convert};
///
/// let csv = b"menu.open,Open\nmenu.close,Close\n";
/// let json = convert(csv, FormatType::Csv, FormatType::JsonNested, "en", &ExchangeOptions::default())?;
/// let value: serde_json::Value = serde_json::from_slice(&json.bytes).unwrap();
/// assert_eq!(value["menu"]["close"], "Close");
/// # Ok::<(), termport::Error>(())
/// ```
pub fn convert(
    input: &[u8],
    from: FormatType,
    to: FormatType,
    locale: &str,
    options: &ExchangeOptions,
) -> Result<Encoded, Error> {
    let decoded = decode(input, from, locale, options)?;
    encode(&decoded.records, to, locale, options)
}
