//! Support for flat and nested YAML translation files.
//!
//! Mirrors the JSON codecs: a flat file is one mapping of scalar values, a
//! nested file groups keys in mappings. A document holding only comments
//! decodes to nothing. Tags (`!foo bar`) are ignored and their value used.

use serde_yaml::{Mapping, Value};

use crate::{
    error::Error,
    formats::{FormatType, decode_text},
    key_path::{KeyMode, KeyPath, KeyTree},
    traits::{CodecContext, Decoded, Encoded, FormatCodec},
    types::{IssueKind, Record, RecordIssue},
};

/// Codec for [`FormatType::YamlFlat`] and [`FormatType::YamlNested`].
#[derive(Debug, Clone, Copy)]
pub struct YamlCodec {
    nested: bool,
}

impl YamlCodec {
    pub const FLAT: YamlCodec = YamlCodec { nested: false };
    pub const NESTED: YamlCodec = YamlCodec { nested: true };
}

impl FormatCodec for YamlCodec {
    fn format(&self) -> FormatType {
        if self.nested {
            FormatType::YamlNested
        } else {
            FormatType::YamlFlat
        }
    }

    fn decode(&self, input: &[u8], ctx: &CodecContext<'_>) -> Result<Decoded, Error> {
        let format = self.format();
        let text = decode_text(input, format)?;
        if text.trim().is_empty() {
            return Ok(Decoded::default());
        }
        let root: Value = serde_yaml::from_str(&text).map_err(|e| {
            let line = e.location().map(|location| location.line());
            Error::parse(format, line, e.to_string())
        })?;
        let map = match untag(root) {
            Value::Null => return Ok(Decoded::default()),
            Value::Mapping(map) => map,
            _ => {
                return Err(Error::parse(
                    format,
                    None,
                    "expected a mapping at the top level",
                ));
            }
        };

        let mut records = Vec::new();
        if self.nested {
            let root = KeyPath::from_segments(Vec::<String>::new());
            flatten_mapping(map, &root, ctx.key_mode(format), &mut records, format)?;
        } else {
            for (key, value) in map {
                let key = key_to_string(key, format)?;
                let Some(value) = scalar_to_string(untag(value)) else {
                    return Err(Error::parse(
                        format,
                        None,
                        format!("value of `{key}` must be a scalar in a flat YAML file"),
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
                Value::Mapping(
                    children
                        .into_iter()
                        .map(|(key, value)| (Value::String(key), value))
                        .collect(),
                )
            });
            (root, skipped)
        } else {
            let mut map = Mapping::new();
            let mut skipped = Vec::new();
            for record in records {
                let key = Value::String(record.key.clone());
                if map.contains_key(&key) {
                    skipped.push(RecordIssue::new(&record.key, IssueKind::Duplicate));
                    continue;
                }
                map.insert(key, Value::String(record.value.clone()));
            }
            (Value::Mapping(map), skipped)
        };

        let text = serde_yaml::to_string(&root)
            .map_err(|e| Error::parse(self.format(), None, e.to_string()))?;
        Ok(Encoded {
            bytes: text.into_bytes(),
            skipped,
        })
    }
}

fn untag(value: Value) -> Value {
    match value {
        Value::Tagged(tagged) => untag(tagged.value),
        other => other,
    }
}

fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        Value::Sequence(_) | Value::Mapping(_) | Value::Tagged(_) => None,
    }
}

fn key_to_string(key: Value, format: FormatType) -> Result<String, Error> {
    scalar_to_string(untag(key))
        .ok_or_else(|| Error::parse(format, None, "mapping keys must be scalars"))
}

fn flatten_mapping(
    map: Mapping,
    prefix: &KeyPath,
    mode: KeyMode<'_>,
    out: &mut Vec<Record>,
    format: FormatType,
) -> Result<(), Error> {
    for (key, value) in map {
        let key = key_to_string(key, format)?;
        flatten_value(value, prefix.child(key), mode, out, format)?;
    }
    Ok(())
}

fn flatten_value(
    value: Value,
    path: KeyPath,
    mode: KeyMode<'_>,
    out: &mut Vec<Record>,
    format: FormatType,
) -> Result<(), Error> {
    match untag(value) {
        Value::Mapping(map) => flatten_mapping(map, &path, mode, out, format)?,
        Value::Sequence(items) => {
            for (index, item) in items.into_iter().enumerate() {
                flatten_value(item, path.child(index.to_string()), mode, out, format)?;
            }
        }
        scalar => {
            let value = scalar_to_string(scalar).unwrap_or_default();
            out.push(Record::new(path.render(mode), value));
        }
    }
    Ok(())
}
