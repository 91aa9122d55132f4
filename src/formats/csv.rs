//! Support for two-column CSV localization files.
//!
//! Each row is `key,value` with RFC 4180 quoting; there is no header row.
//! Rows with a single column carry an empty value and extra columns are
//! ignored. Only singular values are supported, so record metadata is
//! dropped on export.
use std::io::{BufRead, Write};

use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    formats::{FormatType, decode_text},
    traits::{CodecContext, Decoded, Encoded, FormatCodec, Parser},
    types::Record,
};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct CSVRecord {
    pub key: String,
    pub value: String,
}

impl Parser for Vec<CSVRecord> {
    /// Parse from any reader.
    fn from_reader<R: BufRead>(reader: R) -> Result<Self, Error> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);
        let mut records = Vec::new();
        for result in rdr.records() {
            let row = result.map_err(csv_error)?;
            let Some(key) = row.get(0) else {
                continue;
            };
            if row.len() == 1 && key.is_empty() {
                continue;
            }
            records.push(CSVRecord {
                key: key.to_string(),
                value: row.get(1).unwrap_or_default().to_string(),
            });
        }
        Ok(records)
    }

    /// Write to any writer (memory buffer, socket, …).
    fn to_writer<W: Write>(&self, writer: W) -> Result<(), Error> {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        for record in self {
            wtr.serialize(record).map_err(csv_error)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

fn csv_error(error: csv::Error) -> Error {
    let line = error
        .position()
        .and_then(|position| usize::try_from(position.line()).ok());
    Error::parse(FormatType::Csv, line, error.to_string())
}

impl From<Vec<CSVRecord>> for Decoded {
    fn from(value: Vec<CSVRecord>) -> Self {
        Decoded::new(
            value
                .into_iter()
                .map(|record| Record::new(record.key, record.value))
                .collect(),
        )
    }
}

fn csv_records(records: &[Record]) -> Vec<CSVRecord> {
    records
        .iter()
        .map(|record| CSVRecord {
            key: record.key.clone(),
            value: record.value.clone(),
        })
        .collect()
}

/// Codec for [`FormatType::Csv`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvCodec;

impl FormatCodec for CsvCodec {
    fn format(&self) -> FormatType {
        FormatType::Csv
    }

    fn decode(&self, input: &[u8], _ctx: &CodecContext<'_>) -> Result<Decoded, Error> {
        let text = decode_text(input, FormatType::Csv)?;
        if text.trim().is_empty() {
            return Ok(Decoded::default());
        }
        Ok(Vec::<CSVRecord>::from_str(&text)?.into())
    }

    fn encode(&self, records: &[Record], _ctx: &CodecContext<'_>) -> Result<Encoded, Error> {
        Ok(Encoded::new(csv_records(records).to_bytes()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ExchangeOptions;
    use std::io::Cursor;

    #[test]
    fn test_parse_simple_csv() {
        let csv_content = "hello,Hello\nbye,Goodbye\n";
        let records = Vec::<CSVRecord>::from_reader(Cursor::new(csv_content)).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].key, "hello");
        assert_eq!(records[0].value, "Hello");
        assert_eq!(records[1].key, "bye");
        assert_eq!(records[1].value, "Goodbye");
    }

    #[test]
    fn test_quoted_fields_with_commas_quotes_and_newlines() {
        let csv_content = "greeting,\"Hello, \"\"friend\"\"\nwelcome\"\n";
        let records = Vec::<CSVRecord>::from_str(csv_content).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].value, "Hello, \"friend\"\nwelcome");
    }

    #[test]
    fn test_csv_row_with_missing_or_empty_value() {
        let csv_content = "empty,\nlonely\nhello,Hello,ignored\n";
        let records = Vec::<CSVRecord>::from_str(csv_content).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].value, "");
        assert_eq!(records[1].key, "lonely");
        assert_eq!(records[1].value, "");
        assert_eq!(records[2].value, "Hello");
    }

    #[test]
    fn test_encode_quotes_when_needed() {
        let options = ExchangeOptions::default();
        let ctx = CodecContext::new("en", &options);
        let records = vec![
            Record::new("plain", "value"),
            Record::new("a,b", "say \"hi\"\nthere"),
        ];
        let encoded = CsvCodec.encode(&records, &ctx).unwrap();
        let text = String::from_utf8(encoded.bytes).unwrap();
        assert_eq!(text, "plain,value\n\"a,b\",\"say \"\"hi\"\"\nthere\"\n");

        let decoded = CsvCodec.decode(text.as_bytes(), &ctx).unwrap();
        assert_eq!(decoded.records, records);
    }

    #[test]
    fn test_empty_input_decodes_to_nothing() {
        let options = ExchangeOptions::default();
        let ctx = CodecContext::new("en", &options);
        assert!(CsvCodec.decode(b"", &ctx).unwrap().records.is_empty());
        assert!(CsvCodec.decode(b"  \n\t\n", &ctx).unwrap().records.is_empty());
        let encoded = CsvCodec.encode(&[], &ctx).unwrap();
        assert!(encoded.bytes.is_empty());
    }

    #[test]
    fn test_invalid_utf8_is_a_parse_error() {
        let options = ExchangeOptions::default();
        let ctx = CodecContext::new("en", &options);
        let err = CsvCodec.decode(b"key,\xFF\xFE\xFD", &ctx).unwrap_err();
        assert!(matches!(err, Error::FormatParse { .. }));
    }
}
