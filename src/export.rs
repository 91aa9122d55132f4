//! Export assembly: turns a project's terms and one locale's translations
//! into a file in any supported format.

use std::collections::HashMap;

use crate::{
    error::Error,
    formats::FormatType,
    options::ExchangeOptions,
    traits::{CodecContext, Encoded},
    types::{Record, Term, TermId, Translation},
};

/// Builds the records of an export, one per term, in term order.
///
/// Terms without a translation in `translations` get an empty value.
pub fn export_records(terms: &[Term], translations: &[Translation]) -> Vec<Record> {
    let values: HashMap<TermId, &str> = translations
        .iter()
        .map(|translation| (translation.term_id, translation.value.as_str()))
        .collect();
    terms
        .iter()
        .map(|term| {
            let value = values.get(&term.id).copied().unwrap_or_default();
            Record::new(term.key.clone(), value)
        })
        .collect()
}

/// Encodes `terms` with their `locale` translations as `format`.
///
/// Never fails for an empty project; every format has an empty-but-valid
/// rendition. Records a nested format cannot place are listed in
/// [`Encoded::skipped`].
pub fn assemble(
    terms: &[Term],
    translations: &[Translation],
    locale: &str,
    format: FormatType,
    options: &ExchangeOptions,
) -> Result<Encoded, Error> {
    let records = export_records(terms, translations);
    let ctx = CodecContext::new(locale, options);
    let encoded = format.codec().encode(&records, &ctx)?;
    if !encoded.skipped.is_empty() {
        tracing::warn!(
            %format,
            locale,
            skipped = encoded.skipped.len(),
            "some terms could not be represented in the export"
        );
    }
    Ok(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProjectId;
    use chrono::Utc;

    fn fixture() -> (Vec<Term>, Vec<Translation>) {
        let project = ProjectId::new();
        let terms: Vec<Term> = ["menu.open", "menu.close", "title"]
            .into_iter()
            .map(|key| Term::new(project, key))
            .collect();
        let translations = vec![
            Translation {
                term_id: terms[2].id,
                locale: "fr".to_string(),
                value: "Titre".to_string(),
                created: Utc::now(),
                modified: Utc::now(),
            },
            Translation {
                term_id: terms[0].id,
                locale: "fr".to_string(),
                value: "Ouvrir".to_string(),
                created: Utc::now(),
                modified: Utc::now(),
            },
        ];
        (terms, translations)
    }

    #[test]
    fn test_export_records_follow_term_order() {
        let (terms, translations) = fixture();
        let records = export_records(&terms, &translations);
        assert_eq!(
            records,
            vec![
                Record::new("menu.open", "Ouvrir"),
                Record::new("menu.close", ""),
                Record::new("title", "Titre"),
            ]
        );
    }

    #[test]
    fn test_assemble_nested_json() {
        let (terms, translations) = fixture();
        let encoded = assemble(
            &terms,
            &translations,
            "fr",
            FormatType::JsonNested,
            &ExchangeOptions::default(),
        )
        .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&encoded.bytes).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"menu": {"open": "Ouvrir", "close": ""}, "title": "Titre"})
        );
    }

    #[test]
    fn test_assemble_is_deterministic() {
        let (terms, translations) = fixture();
        let options = ExchangeOptions::default();
        for format in FormatType::ALL {
            let first = assemble(&terms, &translations, "fr", format, &options).unwrap();
            let second = assemble(&terms, &translations, "fr", format, &options).unwrap();
            assert_eq!(first.bytes, second.bytes, "{format}");
        }
    }

    #[test]
    fn test_assemble_empty_project_for_every_format() {
        let options = ExchangeOptions::default();
        for format in FormatType::ALL {
            let encoded = assemble(&[], &[], "fr", format, &options).unwrap();
            let ctx = CodecContext::new("fr", &options);
            let decoded = format.codec().decode(&encoded.bytes, &ctx).unwrap();
            assert!(decoded.records.is_empty(), "{format}");
        }
    }
}
