//! Support for flat and nested JSON translation files.
//!
//! Flat files are one object of `key → string`. Nested files group keys in
//! objects (`{"menu": {"open": "Open"}}`); decoding flattens them into
//! delimiter-joined key paths and turns arrays into indexed segments
//! (`items.0`). Encoding rebuilds the object tree from key paths, in record
//! order.

use serde_json::{Map, Value};

use crate::{
    error::Error,
    formats::{FormatType, decode_text},
    key_path::{KeyMode, KeyPath, KeyTree},
    traits::{CodecContext, Decoded, Encoded, FormatCodec},
    types::{IssueKind, Record, RecordIssue},
};

/// Codec for [`FormatType::JsonFlat`] and [`FormatType::JsonNested`].
#[derive(Debug, Clone, Copy)]
pub struct JsonCodec {
    nested: bool,
}

impl JsonCodec {
    pub const FLAT: JsonCodec = JsonCodec { nested: false };
    pub const NESTED: JsonCodec = JsonCodec { nested: true };
}

impl FormatCodec for JsonCodec {
    fn format(&self) -> FormatType {
        if self.nested {
            FormatType::JsonNested
        } else {
            FormatType::JsonFlat
        }
    }

    fn decode(&self, input: &[u8], ctx: &CodecContext<'_>) -> Result<Decoded, Error> {
        let format = self.format();
        let text = decode_text(input, format)?;
        if text.trim().is_empty() {
            return Ok(Decoded::default());
        }
        let root: Value = serde_json::from_str(&text)
            .map_err(|e| Error::parse(format, Some(e.line()), e.to_string()))?;
        let Value::Object(map) = root else {
            return Err(Error::parse(
                format,
                None,
                "expected an object at the top level",
            ));
        };

        let mut records = Vec::new();
        if self.nested {
            let root = KeyPath::from_segments(Vec::<String>::new());
            flatten_object(map, &root, ctx.key_mode(format), &mut records);
        } else {
            for (key, value) in map {
                let Some(value) = scalar_to_string(&value) else {
                    return Err(Error::parse(
                        format,
                        None,
                        format!("value of `{key}` must be a string in a flat JSON file"),
                    ));
                };
                records.push(Record::new(key, value));
            }
        }
        Ok(Decoded::new(records))
    }

    fn encode(&self, records: &[Record], ctx: &CodecContext<'_>) -> Result<Encoded, Error> {
        let (root, skipped) = if self.nested {
            let (tree, skipped) = KeyTree::from_records(records, ctx.key_mode(self.format()))?;
            let root = tree.fold(&Value::String, &|children| {
                Value::Object(children.into_iter().collect())
            });
            (root, skipped)
        } else {
            let mut map = Map::new();
            let mut skipped = Vec::new();
            for record in records {
                if map.contains_key(&record.key) {
                    skipped.push(RecordIssue::new(&record.key, IssueKind::Duplicate));
                    continue;
                }
                map.insert(record.key.clone(), Value::String(record.value.clone()));
            }
            (Value::Object(map), skipped)
        };

        let mut bytes = serde_json::to_vec_pretty(&root)
            .map_err(|e| Error::parse(self.format(), None, e.to_string()))?;
        bytes.push(b'\n');
        Ok(Encoded { bytes, skipped })
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn flatten_object(map: Map<String, Value>, prefix: &KeyPath, mode: KeyMode<'_>, out: &mut Vec<Record>) {
    for (key, value) in map {
        flatten_value(value, prefix.child(key), mode, out);
    }
}

fn flatten_value(value: Value, path: KeyPath, mode: KeyMode<'_>, out: &mut Vec<Record>) {
    match value {
        Value::Object(map) => flatten_object(map, &path, mode, out),
        Value::Array(items) => {
            for (index, item) in items.into_iter().enumerate() {
                flatten_value(item, path.child(index.to_string()), mode, out);
            }
        }
        scalar => {
            let value = scalar_to_string(&scalar).unwrap_or_default();
            out.push(Record::new(path.render(mode), value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ExchangeOptions;

    fn decode(codec: JsonCodec, input: &str) -> Result<Vec<(String, String)>, Error> {
        let options = ExchangeOptions::default();
        let ctx = CodecContext::new("en", &options);
        Ok(codec
            .decode(input.as_bytes(), &ctx)?
            .records
            .into_iter()
            .map(|r| (r.key, r.value))
            .collect())
    }

    fn encode(codec: JsonCodec, records: &[Record]) -> (String, Vec<RecordIssue>) {
        let options = ExchangeOptions::default();
        let ctx = CodecContext::new("en", &options);
        let encoded = codec.encode(records, &ctx).unwrap();
        (String::from_utf8(encoded.bytes).unwrap(), encoded.skipped)
    }

    #[test]
    fn test_flat_decode_keeps_dotted_keys_and_order() {
        let records = decode(
            JsonCodec::FLAT,
            r#"{"z.last": "Z", "a": "A", "count": 3, "on": true, "none": null}"#,
        )
        .unwrap();
        assert_eq!(
            records,
            vec![
                ("z.last".to_string(), "Z".to_string()),
                ("a".to_string(), "A".to_string()),
                ("count".to_string(), "3".to_string()),
                ("on".to_string(), "true".to_string()),
                ("none".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn test_flat_decode_rejects_nested_values() {
        let err = decode(JsonCodec::FLAT, r#"{"a": {"b": "c"}}"#).unwrap_err();
        assert!(matches!(err, Error::FormatParse { .. }));
    }

    #[test]
    fn test_nested_decode_flattens_objects_and_arrays() {
        let records = decode(
            JsonCodec::NESTED,
            r#"{"menu": {"open": "Open", "items": ["First", "Second"]}, "title": "T"}"#,
        )
        .unwrap();
        let keys: Vec<_> = records.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            keys,
            ["menu.open", "menu.items.0", "menu.items.1", "title"]
        );
        assert_eq!(records[2].1, "Second");
    }

    #[test]
    fn test_malformed_json_reports_line() {
        let err = decode(JsonCodec::NESTED, "{\n  \"a\": \"b\",\n  oops\n}").unwrap_err();
        match err {
            Error::FormatParse { line, format, .. } => {
                assert_eq!(line, Some(3));
                assert_eq!(format, FormatType::JsonNested);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_non_object_root_is_rejected() {
        assert!(decode(JsonCodec::FLAT, r#"["a"]"#).is_err());
        assert!(decode(JsonCodec::NESTED, r#""text""#).is_err());
    }

    #[test]
    fn test_empty_inputs() {
        assert!(decode(JsonCodec::FLAT, "").unwrap().is_empty());
        assert!(decode(JsonCodec::NESTED, "{}").unwrap().is_empty());
        assert_eq!(encode(JsonCodec::FLAT, &[]).0, "{}\n");
        assert_eq!(encode(JsonCodec::NESTED, &[]).0, "{}\n");
    }

    #[test]
    fn test_nested_encode_builds_tree_in_order() {
        let records = vec![
            Record::new("menu.open", "Open"),
            Record::new("title", "Title"),
            Record::new("menu.close", "Close"),
        ];
        let (text, skipped) = encode(JsonCodec::NESTED, &records);
        assert!(skipped.is_empty());
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"menu": {"open": "Open", "close": "Close"}, "title": "Title"})
        );
        assert!(text.find("\"open\"").unwrap() < text.find("\"close\"").unwrap());
    }

    #[test]
    fn test_nested_encode_skips_conflicts_and_malformed_keys() {
        let records = vec![
            Record::new("a", "1"),
            Record::new("a.b", "2"),
            Record::new("x..y", "3"),
        ];
        let (text, skipped) = encode(JsonCodec::NESTED, &records);
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value, serde_json::json!({"a": "1"}));
        assert_eq!(skipped.len(), 2);
        assert_eq!(
            skipped[0].kind,
            IssueKind::KeyConflict {
                conflicting: "a".to_string()
            }
        );
        assert!(matches!(skipped[1].kind, IssueKind::MalformedKey { .. }));
    }

    #[test]
    fn test_flat_encode_reports_duplicates() {
        let records = vec![Record::new("a", "1"), Record::new("a", "2")];
        let (text, skipped) = encode(JsonCodec::FLAT, &records);
        assert_eq!(text, "{\n  \"a\": \"1\"\n}\n");
        assert_eq!(skipped, vec![RecordIssue::new("a", IssueKind::Duplicate)]);
    }
}
