//! The import/export entry points used by the API layer.
//!
//! [`Exchange`] ties the codecs, the reconciliation engine and a
//! [`TermStore`] together. Access control is expected to have happened
//! before any of these methods is called.

use std::{
    collections::HashMap,
    sync::{Arc, Weak},
};

use parking_lot::Mutex;

use crate::{
    codec,
    error::Error,
    export::assemble,
    formats::FormatType,
    options::ExchangeOptions,
    reconcile::reconcile,
    store::TermStore,
    types::{ImportPolicy, ImportSummary, ProjectId, RecordIssue},
};

/// A rendered export, ready to be served as a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exported {
    pub content: Vec<u8>,
    pub content_type: &'static str,
    pub extension: &'static str,
    /// Terms left out because the format could not represent their key.
    pub skipped: Vec<RecordIssue>,
}

impl Exported {
    /// Suggested download name, e.g. `fr.json`.
    pub fn file_name(&self, stem: &str) -> String {
        format!("{stem}.{}", self.extension)
    }
}

/// Import and export over a [`TermStore`].
///
/// Imports into the same project are serialized; imports into different
/// projects and all exports run concurrently.
pub struct Exchange<S: TermStore> {
    store: S,
    options: ExchangeOptions,
    /// Held only while an import runs; entries of finished imports are pruned.
    locks: Mutex<HashMap<ProjectId, Weak<Mutex<()>>>>,
}

impl<S: TermStore> Exchange<S> {
    /// Creates a service with default options.
    pub fn new(store: S) -> Self {
        Self {
            store,
            options: ExchangeOptions::default(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a service with `options`, rejecting invalid ones.
    pub fn with_options(store: S, options: ExchangeOptions) -> Result<Self, Error> {
        if let Err(errors) = options.validate() {
            let message = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(Error::validation_error(message));
        }
        Ok(Self {
            store,
            options,
            locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn options(&self) -> &ExchangeOptions {
        &self.options
    }

    fn project_lock(&self, project: ProjectId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock();
        if let Some(lock) = locks.get(&project).and_then(Weak::upgrade) {
            return lock;
        }
        locks.retain(|_, lock| lock.strong_count() > 0);
        let lock = Arc::new(Mutex::new(()));
        locks.insert(project, Arc::downgrade(&lock));
        lock
    }

    /// Resolves `locale` to the code the project stores it under.
    fn project_locale(&self, project: ProjectId, locale: &str) -> Result<String, Error> {
        let found = self.store.project(project)?;
        found
            .find_locale(locale)
            .map(|l| l.code.clone())
            .ok_or_else(|| Error::LocaleNotFound {
                project: project.to_string(),
                locale: locale.to_string(),
            })
    }

    /// Imports a file into one locale of a project.
    ///
    /// The file is decoded completely before the store is read. A decode
    /// error therefore leaves the project untouched, and so does a failed
    /// batch: the store applies all changes of the import or none.
    pub fn import(
        &self,
        project: ProjectId,
        locale: &str,
        format: FormatType,
        bytes: &[u8],
        policy: ImportPolicy,
    ) -> Result<ImportSummary, Error> {
        let code = self.project_locale(project, locale)?;
        let decoded = codec::decode(bytes, format, locale, &self.options)?;

        let lock = self.project_lock(project);
        let _guard = lock.lock();

        let terms = self.store.terms(project)?;
        let translations = self.store.translations(project, &code)?;
        let plan = reconcile(
            &terms,
            &translations,
            &decoded.records,
            policy,
            self.options.key_mode(format.is_nested()),
            &self.options,
        )?;

        if !plan.batch.is_empty() {
            let outcome = self.store.apply_import_batch(project, &code, &plan.batch)?;
            tracing::debug!(
                %project,
                terms_created = outcome.terms_created,
                translations_written = outcome.translations_written,
                "import batch applied"
            );
        }

        let summary = plan.summary;
        tracing::info!(
            %project,
            locale = %code,
            %format,
            %policy,
            added = summary.terms_added,
            skipped = summary.terms_skipped,
            upserted = summary.translations_upserted,
            plural_forms_dropped = summary.plural_forms_dropped,
            "import finished"
        );
        Ok(summary)
    }

    /// Exports every term of a project with its `locale` translation.
    pub fn export(
        &self,
        project: ProjectId,
        locale: &str,
        format: FormatType,
    ) -> Result<Exported, Error> {
        let code = self.project_locale(project, locale)?;
        let terms = self.store.terms(project)?;
        let translations = self.store.translations(project, &code)?;
        let encoded = assemble(&terms, &translations, &code, format, &self.options)?;

        tracing::info!(
            %project,
            locale = %code,
            %format,
            terms = terms.len(),
            bytes = encoded.bytes.len(),
            "export finished"
        );
        Ok(Exported {
            content: encoded.bytes,
            content_type: format.content_type(),
            extension: format.extension(),
            skipped: encoded.skipped,
        })
    }
}
