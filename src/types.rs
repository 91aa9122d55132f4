//! Core, format-agnostic types for termport.
//!
//! Projects, terms and translations are the persistent model owned by the
//! store. [`Record`]s are the transient unit that codecs decode into and
//! encode from; they never outlive a single import or export call.

use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter},
    str::FromStr,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use unic_langid::LanguageIdentifier;
use uuid::Uuid;

use crate::error::Error;

/// Identifier of a localization project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ProjectId(pub Uuid);

impl ProjectId {
    pub fn new() -> Self {
        ProjectId(Uuid::new_v4())
    }
}

impl Default for ProjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ProjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a term within a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(transparent)]
pub struct TermId(pub Uuid);

impl TermId {
    pub fn new() -> Self {
        TermId(Uuid::new_v4())
    }
}

impl Default for TermId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for TermId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role of a collaborator within a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectRole {
    Admin,
    Editor,
    Viewer,
}

impl FromStr for ProjectRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(ProjectRole::Admin),
            "editor" => Ok(ProjectRole::Editor),
            "viewer" => Ok(ProjectRole::Viewer),
            other => Err(Error::validation_error(format!(
                "unknown project role `{other}`"
            ))),
        }
    }
}

/// A user granted access to a project.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Collaborator {
    pub user_id: String,
    pub role: ProjectRole,
}

/// A localization project: locales, collaborators and metadata.
///
/// Terms and translations are owned by the store and fetched separately.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub locales: Vec<Locale>,
    #[serde(default)]
    pub collaborators: Vec<Collaborator>,
}

impl Project {
    pub fn find_locale(&self, code: &str) -> Option<&Locale> {
        self.locales.iter().find(|locale| locale.matches(code))
    }

    pub fn role_of(&self, user_id: &str) -> Option<ProjectRole> {
        self.collaborators
            .iter()
            .find(|c| c.user_id == user_id)
            .map(|c| c.role)
    }
}

/// A locale tag such as `en`, `fr-CA` or `pt_BR`.
///
/// The original `code` is kept verbatim; `language` and `region` are derived
/// from it. Serializes as `{ "code", "language", "region" }`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Locale {
    pub code: String,
    pub language: String,
    #[serde(default)]
    pub region: String,
}

impl Locale {
    pub const MIN_CODE_LEN: usize = 2;
    pub const MAX_CODE_LEN: usize = 16;

    /// Parses a locale tag. Accepts `-` or `_` as the subtag separator.
    pub fn parse(code: &str) -> Result<Self, Error> {
        let code = code.trim();
        let len = code.chars().count();
        if !(Self::MIN_CODE_LEN..=Self::MAX_CODE_LEN).contains(&len) {
            return Err(Error::InvalidLocale(code.to_string()));
        }
        let id = parse_language_identifier(code)
            .ok_or_else(|| Error::InvalidLocale(code.to_string()))?;
        Ok(Locale {
            code: code.to_string(),
            language: id.language.as_str().to_string(),
            region: id
                .region
                .map(|region| region.as_str().to_string())
                .unwrap_or_default(),
        })
    }

    pub fn language_identifier(&self) -> Option<LanguageIdentifier> {
        parse_language_identifier(&self.code)
    }

    /// Checks whether `other` names the same locale, ignoring case and separator style.
    pub fn matches(&self, other: &str) -> bool {
        same_locale(&self.code, other)
    }
}

impl FromStr for Locale {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Locale::parse(s)
    }
}

impl Display for Locale {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code)
    }
}

pub(crate) fn parse_language_identifier(code: &str) -> Option<LanguageIdentifier> {
    code.trim().replace('_', "-").parse().ok()
}

/// Compares two locale tags as language identifiers.
///
/// Falls back to a case-insensitive comparison when either tag does not parse.
pub fn same_locale(a: &str, b: &str) -> bool {
    match (parse_language_identifier(a), parse_language_identifier(b)) {
        (Some(a), Some(b)) => a == b,
        _ => a.trim().replace('_', "-").eq_ignore_ascii_case(&b.trim().replace('_', "-")),
    }
}

/// A translation key of a project.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Term {
    pub id: TermId,
    pub project_id: ProjectId,
    /// The key path, stored in its rendered (delimiter-joined) form.
    pub key: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl Term {
    pub fn new(project_id: ProjectId, key: impl Into<String>) -> Self {
        let now = Utc::now();
        Term {
            id: TermId::new(),
            project_id,
            key: key.into(),
            created: now,
            modified: now,
        }
    }
}

/// The value of one term in one locale.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Translation {
    pub term_id: TermId,
    pub locale: String,
    pub value: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

/// Standard CLDR plural forms.
#[derive(Ord, PartialOrd, Eq, PartialEq, Debug, Clone, Copy, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PluralCategory {
    Zero,
    One,
    Two,
    Few,
    Many,
    Other,
}

impl PluralCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            PluralCategory::Zero => "zero",
            PluralCategory::One => "one",
            PluralCategory::Two => "two",
            PluralCategory::Few => "few",
            PluralCategory::Many => "many",
            PluralCategory::Other => "other",
        }
    }
}

impl FromStr for PluralCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ZERO" => Ok(PluralCategory::Zero),
            "ONE" => Ok(PluralCategory::One),
            "TWO" => Ok(PluralCategory::Two),
            "FEW" => Ok(PluralCategory::Few),
            "MANY" => Ok(PluralCategory::Many),
            "OTHER" => Ok(PluralCategory::Other),
            _ => Err(format!("Unknown plural category: {}", s)),
        }
    }
}

impl Display for PluralCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All plural forms of a decoded message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Plural {
    /// Map from category → translation.
    pub forms: BTreeMap<PluralCategory, String>,
}

impl Plural {
    pub(crate) fn new(forms: impl Iterator<Item = (PluralCategory, String)>) -> Option<Self> {
        let forms: BTreeMap<PluralCategory, String> = forms.collect();

        if forms.is_empty() {
            None
        } else {
            Some(Self { forms })
        }
    }

    /// Picks the form kept by the single-value model: `other`, else the last form.
    pub fn selected(&self) -> Option<(PluralCategory, &str)> {
        self.forms
            .get(&PluralCategory::Other)
            .map(|value| (PluralCategory::Other, value.as_str()))
            .or_else(|| {
                self.forms
                    .iter()
                    .next_back()
                    .map(|(category, value)| (*category, value.as_str()))
            })
    }

    /// Categories that do not survive the collapse to [`Plural::selected`].
    pub fn dropped(&self) -> Vec<PluralCategory> {
        let kept = self.selected().map(|(category, _)| category);
        self.forms
            .keys()
            .copied()
            .filter(|category| Some(*category) != kept)
            .collect()
    }
}

/// Format-specific extras that travel with a [`Record`].
///
/// Codecs write back what their format can represent and drop the rest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RecordMeta {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub plural: Option<Plural>,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub fuzzy: bool,
}

impl RecordMeta {
    pub fn is_empty(&self) -> bool {
        self == &RecordMeta::default()
    }
}

/// A decoded `(key, value)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Record {
    /// Rendered key path (delimiter-joined for nested formats).
    pub key: String,
    pub value: String,
    #[serde(skip_serializing_if = "RecordMeta::is_empty", default)]
    pub meta: RecordMeta,
}

impl Record {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Record {
            key: key.into(),
            value: value.into(),
            meta: RecordMeta::default(),
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.meta.comment = Some(comment.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.meta.context = Some(context.into());
        self
    }

    /// Builds a record from plural forms, keeping the selected form as the value.
    pub(crate) fn from_plural(key: impl Into<String>, plural: Plural) -> Self {
        let value = plural
            .selected()
            .map(|(_, value)| value.to_string())
            .unwrap_or_default();
        Record {
            key: key.into(),
            value,
            meta: RecordMeta {
                plural: Some(plural),
                ..RecordMeta::default()
            },
        }
    }
}

impl Display for Record {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Record {{ key: {}, value: {} }}", self.key, self.value)
    }
}

/// How an import treats terms that already carry a translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImportPolicy {
    /// Never overwrite an existing translation.
    CreateOnly,
    /// Overwrite existing translations.
    #[default]
    Upsert,
}

impl FromStr for ImportPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create-only" | "create_only" | "createonly" | "add" => Ok(ImportPolicy::CreateOnly),
            "upsert" => Ok(ImportPolicy::Upsert),
            other => Err(Error::validation_error(format!(
                "unknown import policy `{other}`"
            ))),
        }
    }
}

impl Display for ImportPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportPolicy::CreateOnly => write!(f, "create-only"),
            ImportPolicy::Upsert => write!(f, "upsert"),
        }
    }
}

/// Kind of a per-record problem found during reconciliation or encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum IssueKind {
    /// The key appeared earlier in the same file.
    Duplicate,
    /// The key collides with another key at a different depth.
    KeyConflict { conflicting: String },
    MalformedKey { reason: String },
    ValueTooLong { length: usize, max: usize },
    /// Create-only import met a term that is already translated.
    AlreadyTranslated,
    /// Plural forms other than the selected one were not imported.
    PluralFormsDropped { categories: Vec<PluralCategory> },
}

/// A problem tied to a single record. Never fatal for the call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordIssue {
    pub key: String,
    #[serde(flatten)]
    pub kind: IssueKind,
}

impl RecordIssue {
    pub fn new(key: impl Into<String>, kind: IssueKind) -> Self {
        RecordIssue {
            key: key.into(),
            kind,
        }
    }

    /// Turns a per-record key or value error into an issue. Any other error is handed back.
    pub(crate) fn from_record_error(key: &str, error: Error) -> Result<Self, Error> {
        match error {
            Error::KeyConflict { conflicting, .. } => {
                Ok(RecordIssue::new(key, IssueKind::KeyConflict { conflicting }))
            }
            Error::MalformedKey { reason, .. } => {
                Ok(RecordIssue::new(key, IssueKind::MalformedKey { reason }))
            }
            Error::ValueTooLong { length, max } => {
                Ok(RecordIssue::new(key, IssueKind::ValueTooLong { length, max }))
            }
            other => Err(other),
        }
    }
}

/// Outcome counters of an import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub terms_added: usize,
    pub terms_skipped: usize,
    pub translations_upserted: usize,
    /// Plural forms left out when a plural record collapsed to its `other`
    /// form. The record itself is still imported, so these are not part of
    /// `terms_skipped`; they are reported as skipped translations instead.
    pub plural_forms_dropped: usize,
    pub issues: Vec<RecordIssue>,
}

#[derive(Serialize)]
struct TermCountsBody {
    added: usize,
    skipped: usize,
}

#[derive(Serialize)]
struct TranslationCountsBody {
    upserted: usize,
    #[serde(skip_serializing_if = "is_zero")]
    skipped: usize,
}

#[derive(Serialize)]
struct ImportSummaryBody<'a> {
    terms: TermCountsBody,
    translations: TranslationCountsBody,
    #[serde(skip_serializing_if = "no_issues")]
    issues: &'a [RecordIssue],
}

fn no_issues(issues: &&[RecordIssue]) -> bool {
    issues.is_empty()
}

fn is_zero(count: &usize) -> bool {
    *count == 0
}

/// Serializes as `{"terms":{"added","skipped"},"translations":{"upserted"}}`
/// plus an `issues` list when any record was skipped. Dropped plural forms
/// show up as `translations.skipped`.
impl Serialize for ImportSummary {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ImportSummaryBody {
            terms: TermCountsBody {
                added: self.terms_added,
                skipped: self.terms_skipped,
            },
            translations: TranslationCountsBody {
                upserted: self.translations_upserted,
                skipped: self.plural_forms_dropped,
            },
            issues: &self.issues,
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locale_parse_language_and_region() {
        let locale = Locale::parse("en-US").unwrap();
        assert_eq!(locale.code, "en-US");
        assert_eq!(locale.language, "en");
        assert_eq!(locale.region, "US");

        let locale = Locale::parse("pt_BR").unwrap();
        assert_eq!(locale.code, "pt_BR");
        assert_eq!(locale.language, "pt");
        assert_eq!(locale.region, "BR");

        let locale = Locale::parse("fr").unwrap();
        assert_eq!(locale.region, "");
    }

    #[test]
    fn test_locale_parse_rejects_bad_codes() {
        assert!(Locale::parse("e").is_err());
        assert!(Locale::parse("this-is-way-too-long").is_err());
        assert!(Locale::parse("not a locale").is_err());
    }

    #[test]
    fn test_same_locale_ignores_case_and_separator() {
        assert!(same_locale("en_US", "en-us"));
        assert!(same_locale("FR", "fr"));
        assert!(!same_locale("fr", "de"));
        assert!(!same_locale("en", "en-GB"));
    }

    #[test]
    fn test_locale_serializes_as_dto() {
        let locale = Locale::parse("de_AT").unwrap();
        let json = serde_json::to_value(&locale).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"code": "de_AT", "language": "de", "region": "AT"})
        );
    }

    #[test]
    fn test_plural_selected_prefers_other() {
        let plural = Plural::new(
            vec![
                (PluralCategory::One, "1 apple".to_string()),
                (PluralCategory::Other, "%d apples".to_string()),
            ]
            .into_iter(),
        )
        .unwrap();
        assert_eq!(plural.selected(), Some((PluralCategory::Other, "%d apples")));
        assert_eq!(plural.dropped(), vec![PluralCategory::One]);
    }

    #[test]
    fn test_plural_selected_falls_back_to_last_form() {
        let plural = Plural::new(
            vec![
                (PluralCategory::One, "one".to_string()),
                (PluralCategory::Few, "few".to_string()),
            ]
            .into_iter(),
        )
        .unwrap();
        assert_eq!(plural.selected(), Some((PluralCategory::Few, "few")));
        assert!(Plural::new(std::iter::empty()).is_none());
    }

    #[test]
    fn test_record_from_plural_keeps_other() {
        let plural = Plural::new(
            vec![
                (PluralCategory::One, "a file".to_string()),
                (PluralCategory::Other, "files".to_string()),
            ]
            .into_iter(),
        )
        .unwrap();
        let record = Record::from_plural("files", plural);
        assert_eq!(record.value, "files");
        assert!(record.meta.plural.is_some());
    }

    #[test]
    fn test_plural_category_from_str() {
        assert_eq!(PluralCategory::from_str("zero").unwrap(), PluralCategory::Zero);
        assert_eq!(PluralCategory::from_str("OTHER").unwrap(), PluralCategory::Other);
        assert!(PluralCategory::from_str("invalid").is_err());
    }

    #[test]
    fn test_import_policy_from_str() {
        assert_eq!(
            ImportPolicy::from_str("create-only").unwrap(),
            ImportPolicy::CreateOnly
        );
        assert_eq!(ImportPolicy::from_str("UPSERT").unwrap(), ImportPolicy::Upsert);
        assert!(ImportPolicy::from_str("merge").is_err());
        assert_eq!(ImportPolicy::default(), ImportPolicy::Upsert);
    }

    #[test]
    fn test_import_summary_serializes_to_response_shape() {
        let summary = ImportSummary {
            terms_added: 2,
            terms_skipped: 1,
            translations_upserted: 3,
            plural_forms_dropped: 0,
            issues: Vec::new(),
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "terms": {"added": 2, "skipped": 1},
                "translations": {"upserted": 3}
            })
        );
    }

    #[test]
    fn test_record_issue_serializes_flat() {
        let issue = RecordIssue::new(
            "a.b",
            IssueKind::KeyConflict {
                conflicting: "a".to_string(),
            },
        );
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"key": "a.b", "kind": "key_conflict", "conflicting": "a"})
        );
    }

    #[test]
    fn test_project_role_lookup() {
        let project = Project {
            id: ProjectId::new(),
            name: "Demo".to_string(),
            description: String::new(),
            locales: vec![Locale::parse("en").unwrap()],
            collaborators: vec![Collaborator {
                user_id: "u1".to_string(),
                role: ProjectRole::Editor,
            }],
        };
        assert_eq!(project.role_of("u1"), Some(ProjectRole::Editor));
        assert_eq!(project.role_of("u2"), None);
        assert!(project.find_locale("EN").is_some());
        assert_eq!(ProjectRole::from_str("Admin").unwrap(), ProjectRole::Admin);
    }
}
