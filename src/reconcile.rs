//! Import reconciliation: merges decoded records into a project's terms.
//!
//! [`reconcile`] is a pure function. It never touches the store; it returns
//! the [`ImportBatch`] to apply and the [`ImportSummary`] to report, so a
//! failed apply leaves nothing half-written.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    key_path::{KeyMode, KeyPath, KeyTree},
    options::ExchangeOptions,
    types::{
        ImportPolicy, ImportSummary, IssueKind, Record, RecordIssue, Term, TermId, Translation,
    },
    validation::{validate_term_key, validate_translation_value},
};

/// One translation to write, addressed by term key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationWrite {
    pub key: String,
    pub value: String,
}

/// Every change produced by one import, applied by the store as a unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportBatch {
    /// Keys of terms to create, in file order.
    pub new_terms: Vec<String>,
    /// Translations to insert or overwrite, in file order.
    pub translations: Vec<TranslationWrite>,
}

impl ImportBatch {
    pub fn is_empty(&self) -> bool {
        self.new_terms.is_empty() && self.translations.is_empty()
    }
}

/// Result of [`reconcile`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportPlan {
    pub batch: ImportBatch,
    pub summary: ImportSummary,
}

/// Plans the import of `records` into a project.
///
/// `existing_terms` are all terms of the project and
/// `existing_translations` the translations of the target locale. Records
/// are handled in order:
///
/// 1. invalid keys and over-long values are skipped;
/// 2. a key seen earlier in the same file is skipped as a duplicate;
/// 3. an unknown key creates a term and its translation, unless (in nested
///    mode) it overlaps an existing or accepted key at another depth;
/// 4. a known key gets its translation written, except under
///    [`ImportPolicy::CreateOnly`] when one already exists.
///
/// Plural forms lost when a record was decoded are counted in
/// `plural_forms_dropped` and reported, without skipping the record.
pub fn reconcile(
    existing_terms: &[Term],
    existing_translations: &[Translation],
    records: &[Record],
    policy: ImportPolicy,
    mode: KeyMode<'_>,
    options: &ExchangeOptions,
) -> Result<ImportPlan, Error> {
    let terms_by_key: HashMap<&str, TermId> = existing_terms
        .iter()
        .map(|term| (term.key.as_str(), term.id))
        .collect();
    let translated: HashSet<TermId> = existing_translations
        .iter()
        .map(|translation| translation.term_id)
        .collect();

    let mut hierarchy = KeyTree::new();
    if mode.is_nested() {
        for term in existing_terms {
            let placed = KeyPath::parse(&term.key, mode)
                .and_then(|path| hierarchy.insert(&path, String::new(), mode));
            if let Err(error) = placed {
                tracing::debug!(key = %term.key, %error, "existing key left out of the hierarchy check");
            }
        }
    }

    let mut plan = ImportPlan::default();
    let mut seen: HashSet<&str> = HashSet::new();

    for record in records {
        let key = record.key.as_str();

        if let Some(plural) = &record.meta.plural {
            let dropped = plural.dropped();
            if !dropped.is_empty() {
                plan.summary.plural_forms_dropped += dropped.len();
                plan.summary.issues.push(RecordIssue::new(
                    key,
                    IssueKind::PluralFormsDropped {
                        categories: dropped,
                    },
                ));
            }
        }

        let path = match validate_term_key(key, mode, options)
            .and_then(|path| validate_translation_value(&record.value, options).map(|_| path))
        {
            Ok(path) => path,
            Err(error) => {
                tracing::debug!(key, %error, "skipping invalid record");
                skip(&mut plan.summary, RecordIssue::from_record_error(key, error)?);
                continue;
            }
        };

        if !seen.insert(key) {
            skip(&mut plan.summary, RecordIssue::new(key, IssueKind::Duplicate));
            continue;
        }

        match terms_by_key.get(key) {
            None => {
                if mode.is_nested()
                    && let Err(error) = hierarchy.insert(&path, String::new(), mode)
                {
                    tracing::debug!(key, %error, "skipping key that conflicts with the hierarchy");
                    skip(&mut plan.summary, RecordIssue::from_record_error(key, error)?);
                    continue;
                }
                plan.batch.new_terms.push(key.to_string());
                plan.summary.terms_added += 1;
                write_translation(&mut plan, record);
            }
            Some(term_id) => {
                if policy == ImportPolicy::CreateOnly && translated.contains(term_id) {
                    skip(&mut plan.summary, RecordIssue::new(key, IssueKind::AlreadyTranslated));
                    continue;
                }
                write_translation(&mut plan, record);
            }
        }
    }

    Ok(plan)
}

fn skip(summary: &mut ImportSummary, issue: RecordIssue) {
    summary.terms_skipped += 1;
    summary.issues.push(issue);
}

fn write_translation(plan: &mut ImportPlan, record: &Record) {
    plan.batch.translations.push(TranslationWrite {
        key: record.key.clone(),
        value: record.value.clone(),
    });
    plan.summary.translations_upserted += 1;
}
