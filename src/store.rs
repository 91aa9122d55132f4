//! Storage interface consumed by the exchange service, plus an in-memory
//! implementation.

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::RwLock;

use crate::{
    error::Error,
    reconcile::ImportBatch,
    types::{Collaborator, Locale, Project, ProjectId, ProjectRole, Term, TermId, Translation},
    validation::validate_locale_code,
};

/// What a store did when applying an [`ImportBatch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub terms_created: usize,
    pub translations_written: usize,
}

/// Persistent project data as seen by import and export.
///
/// `terms` must return terms in a stable order (creation order for the
/// in-memory store) since exports follow it. `apply_import_batch` must be
/// atomic: either every change of the batch is visible afterwards or none.
pub trait TermStore: Send + Sync {
    fn project(&self, project: ProjectId) -> Result<Project, Error>;

    fn terms(&self, project: ProjectId) -> Result<Vec<Term>, Error>;

    /// Translations of `project` in `locale`.
    fn translations(&self, project: ProjectId, locale: &str) -> Result<Vec<Translation>, Error>;

    fn apply_import_batch(
        &self,
        project: ProjectId,
        locale: &str,
        batch: &ImportBatch,
    ) -> Result<BatchOutcome, Error>;
}

#[derive(Debug)]
struct ProjectData {
    project: Project,
    terms: Vec<Term>,
    /// Keyed by term and the project's spelling of the locale code.
    translations: HashMap<(TermId, String), Translation>,
}

impl ProjectData {
    fn locale_code(&self, locale: &str) -> Result<String, Error> {
        self.project
            .find_locale(locale)
            .map(|found| found.code.clone())
            .ok_or_else(|| Error::LocaleNotFound {
                project: self.project.id.to_string(),
                locale: locale.to_string(),
            })
    }

    fn write_translation(&mut self, term_id: TermId, locale: &str, value: &str) {
        let now = Utc::now();
        self.translations
            .entry((term_id, locale.to_string()))
            .and_modify(|translation| {
                translation.value = value.to_string();
                translation.modified = now;
            })
            .or_insert_with(|| Translation {
                term_id,
                locale: locale.to_string(),
                value: value.to_string(),
                created: now,
                modified: now,
            });
    }
}

/// A thread-safe store keeping everything in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    projects: RwLock<HashMap<ProjectId, ProjectData>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn not_found(project: ProjectId) -> Error {
        Error::ProjectNotFound(project.to_string())
    }

    /// Creates an empty project and returns its id.
    pub fn create_project(&self, name: &str, description: &str) -> Result<ProjectId, Error> {
        if name.trim().is_empty() {
            return Err(Error::validation_error("project name must not be empty"));
        }
        let id = ProjectId::new();
        let project = Project {
            id,
            name: name.trim().to_string(),
            description: description.to_string(),
            locales: Vec::new(),
            collaborators: Vec::new(),
        };
        self.projects.write().insert(
            id,
            ProjectData {
                project,
                terms: Vec::new(),
                translations: HashMap::new(),
            },
        );
        Ok(id)
    }

    /// Adds a locale to a project. Codes are unique per project.
    pub fn add_locale(&self, project: ProjectId, code: &str) -> Result<Locale, Error> {
        let locale = validate_locale_code(code)?;
        let mut projects = self.projects.write();
        let data = projects
            .get_mut(&project)
            .ok_or_else(|| Self::not_found(project))?;
        if data.project.find_locale(&locale.code).is_some() {
            return Err(Error::validation_error(format!(
                "locale `{}` already exists in project",
                locale.code
            )));
        }
        data.project.locales.push(locale.clone());
        Ok(locale)
    }

    /// Grants `user_id` a role on the project, replacing any previous role.
    pub fn add_collaborator(
        &self,
        project: ProjectId,
        user_id: &str,
        role: ProjectRole,
    ) -> Result<(), Error> {
        let mut projects = self.projects.write();
        let data = projects
            .get_mut(&project)
            .ok_or_else(|| Self::not_found(project))?;
        data.project.collaborators.retain(|c| c.user_id != user_id);
        data.project.collaborators.push(Collaborator {
            user_id: user_id.to_string(),
            role,
        });
        Ok(())
    }

    /// Creates a term. Keys are unique per project.
    pub fn add_term(&self, project: ProjectId, key: &str) -> Result<TermId, Error> {
        if key.trim().is_empty() {
            return Err(Error::MalformedKey {
                key: key.to_string(),
                reason: "key is empty or whitespace only".to_string(),
            });
        }
        let mut projects = self.projects.write();
        let data = projects
            .get_mut(&project)
            .ok_or_else(|| Self::not_found(project))?;
        if data.terms.iter().any(|term| term.key == key) {
            return Err(Error::validation_error(format!(
                "term `{key}` already exists in project"
            )));
        }
        let term = Term::new(project, key);
        let id = term.id;
        data.terms.push(term);
        Ok(id)
    }

    /// Inserts or replaces the translation of `term` in `locale`.
    pub fn set_translation(
        &self,
        project: ProjectId,
        term: TermId,
        locale: &str,
        value: &str,
    ) -> Result<(), Error> {
        let mut projects = self.projects.write();
        let data = projects
            .get_mut(&project)
            .ok_or_else(|| Self::not_found(project))?;
        let code = data.locale_code(locale)?;
        if !data.terms.iter().any(|t| t.id == term) {
            return Err(Error::Store(format!("term {term} does not exist")));
        }
        data.write_translation(term, &code, value);
        Ok(())
    }
}

impl TermStore for MemoryStore {
    fn project(&self, project: ProjectId) -> Result<Project, Error> {
        self.projects
            .read()
            .get(&project)
            .map(|data| data.project.clone())
            .ok_or_else(|| Self::not_found(project))
    }

    fn terms(&self, project: ProjectId) -> Result<Vec<Term>, Error> {
        self.projects
            .read()
            .get(&project)
            .map(|data| data.terms.clone())
            .ok_or_else(|| Self::not_found(project))
    }

    fn translations(&self, project: ProjectId, locale: &str) -> Result<Vec<Translation>, Error> {
        let projects = self.projects.read();
        let data = projects
            .get(&project)
            .ok_or_else(|| Self::not_found(project))?;
        let code = data.locale_code(locale)?;
        Ok(data
            .translations
            .values()
            .filter(|translation| translation.locale == code)
            .cloned()
            .collect())
    }

    fn apply_import_batch(
        &self,
        project: ProjectId,
        locale: &str,
        batch: &ImportBatch,
    ) -> Result<BatchOutcome, Error> {
        let mut projects = self.projects.write();
        let data = projects
            .get_mut(&project)
            .ok_or_else(|| Self::not_found(project))?;
        let code = data.locale_code(locale)?;

        // Check everything before the first write so a rejected batch changes nothing.
        let mut ids: HashMap<String, TermId> = data
            .terms
            .iter()
            .map(|term| (term.key.clone(), term.id))
            .collect();
        let mut created = Vec::with_capacity(batch.new_terms.len());
        for key in &batch.new_terms {
            if ids.contains_key(key) {
                return Err(Error::Store(format!("term `{key}` already exists")));
            }
            let term = Term::new(project, key.as_str());
            ids.insert(key.clone(), term.id);
            created.push(term);
        }
        let mut writes = Vec::with_capacity(batch.translations.len());
        for write in &batch.translations {
            let term_id = ids
                .get(&write.key)
                .copied()
                .ok_or_else(|| Error::Store(format!("term `{}` does not exist", write.key)))?;
            writes.push((term_id, write.value.as_str()));
        }

        let outcome = BatchOutcome {
            terms_created: created.len(),
            translations_written: writes.len(),
        };
        data.terms.extend(created);
        for (term_id, value) in writes {
            data.write_translation(term_id, &code, value);
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::TranslationWrite;

    fn write(key: &str, value: &str) -> TranslationWrite {
        TranslationWrite {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn test_project_setup() {
        let store = MemoryStore::new();
        let project = store.create_project("Demo", "").unwrap();
        store.add_locale(project, "fr_CA").unwrap();
        assert!(store.add_locale(project, "fr-ca").is_err());
        assert!(store.add_locale(project, "?").is_err());
        store
            .add_collaborator(project, "u1", ProjectRole::Admin)
            .unwrap();

        let loaded = store.project(project).unwrap();
        assert_eq!(loaded.locales[0].region, "CA");
        assert_eq!(loaded.role_of("u1"), Some(ProjectRole::Admin));
        assert!(store.create_project("  ", "").is_err());
    }

    #[test]
    fn test_terms_keep_creation_order_and_unique_keys() {
        let store = MemoryStore::new();
        let project = store.create_project("Demo", "").unwrap();
        store.add_term(project, "b").unwrap();
        store.add_term(project, "a").unwrap();
        assert!(store.add_term(project, "a").is_err());
        assert!(store.add_term(project, " ").is_err());
        let keys: Vec<_> = store
            .terms(project)
            .unwrap()
            .into_iter()
            .map(|t| t.key)
            .collect();
        assert_eq!(keys, ["b", "a"]);
    }

    #[test]
    fn test_set_translation_requires_known_locale() {
        let store = MemoryStore::new();
        let project = store.create_project("Demo", "").unwrap();
        store.add_locale(project, "de").unwrap();
        let term = store.add_term(project, "hello").unwrap();
        store.set_translation(project, term, "DE", "Hallo").unwrap();
        store.set_translation(project, term, "de", "Servus").unwrap();
        assert!(matches!(
            store.set_translation(project, term, "fr", "Salut"),
            Err(Error::LocaleNotFound { .. })
        ));

        let translations = store.translations(project, "de").unwrap();
        assert_eq!(translations.len(), 1);
        assert_eq!(translations[0].value, "Servus");
        assert_eq!(translations[0].locale, "de");
    }

    #[test]
    fn test_apply_import_batch() {
        let store = MemoryStore::new();
        let project = store.create_project("Demo", "").unwrap();
        store.add_locale(project, "en").unwrap();
        store.add_term(project, "existing").unwrap();

        let batch = ImportBatch {
            new_terms: vec!["fresh".to_string()],
            translations: vec![write("existing", "E"), write("fresh", "F")],
        };
        let outcome = store.apply_import_batch(project, "en", &batch).unwrap();
        assert_eq!(
            outcome,
            BatchOutcome {
                terms_created: 1,
                translations_written: 2
            }
        );
        assert_eq!(store.terms(project).unwrap().len(), 2);
        assert_eq!(store.translations(project, "en").unwrap().len(), 2);
    }

    #[test]
    fn test_rejected_batch_changes_nothing() {
        let store = MemoryStore::new();
        let project = store.create_project("Demo", "").unwrap();
        store.add_locale(project, "en").unwrap();

        let batch = ImportBatch {
            new_terms: vec!["a".to_string()],
            translations: vec![write("a", "A"), write("missing", "M")],
        };
        assert!(matches!(
            store.apply_import_batch(project, "en", &batch),
            Err(Error::Store(_))
        ));
        assert!(store.terms(project).unwrap().is_empty());
        assert!(store.translations(project, "en").unwrap().is_empty());
    }

    #[test]
    fn test_unknown_project() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.terms(ProjectId::new()),
            Err(Error::ProjectNotFound(_))
        ));
    }
}
