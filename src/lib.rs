#![forbid(unsafe_code)]
//! Import/export engine for localization projects.
//!
//! A project holds terms (translation keys) and, per locale, translations.
//! termport moves that data in and out of the file formats translators and
//! build tools use: CSV, XLIFF 1.2, flat and nested JSON, flat and nested
//! YAML, Java `.properties`, gettext PO, Apple `.strings` and Android
//! `strings.xml`.
//!
//! # Quick Start
//!
//! ```rust
//! use termport::{Exchange, FormatType, ImportPolicy, MemoryStore};
//!
//! let store = MemoryStore::new();
//! let project = store.create_project("Website", "")?;
//! store.add_locale(project, "fr")?;
//!
//! let exchange = Exchange::new(store);
//! let json = br#"{"menu": {"open": "Ouvrir", "close": "Fermer"}}"#;
//! let summary = exchange.import(project, "fr", FormatType::JsonNested, json, ImportPolicy::Upsert)?;
//! assert_eq!(summary.terms_added, 2);
//!
//! let po = exchange.export(project, "fr", FormatType::Po)?;
//! assert!(String::from_utf8_lossy(&po.content).contains("msgid \"menu.open\""));
//! # Ok::<(), termport::Error>(())
//! ```
//!
//! # Layout
//!
//! - [`formats`]: one codec per format behind [`FormatCodec`], selected by [`FormatType`]
//! - [`key_path`]: flat and hierarchical keys, shared by the nested formats
//! - [`reconcile`]: merges decoded records into a project's terms
//! - [`export`]: builds a file from a project's terms for one locale
//! - [`store`]: the storage contract and an in-memory implementation
//! - [`exchange`]: the import and export entry points

pub mod codec;
pub mod error;
pub mod exchange;
pub mod export;
pub mod formats;
pub mod key_path;
pub mod options;
pub mod plural_rules;
pub mod reconcile;
pub mod store;
pub mod traits;
pub mod types;
pub mod validation;

// Re-export most used types for easy consumption
pub use crate::{
    codec::{convert, decode, encode},
    error::Error,
    exchange::{Exchange, Exported},
    formats::FormatType,
    key_path::{KeyMode, KeyPath},
    options::ExchangeOptions,
    reconcile::{ImportBatch, TranslationWrite},
    store::{BatchOutcome, MemoryStore, TermStore},
    traits::{Decoded, Encoded, FormatCodec},
    types::{
        ImportPolicy, ImportSummary, IssueKind, Locale, Plural, PluralCategory, Project,
        ProjectId, Record, RecordIssue, Term, TermId, Translation,
    },
};
