//! Options controlling key handling, limits and file headers for import/export.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{key_path::KeyMode, types::Locale};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Configuration error in '{field_path}': {message}")]
pub struct ValidationError {
    pub field_path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field_path: field_path.into(),
            message: message.into(),
        }
    }
}

/// Behavior options shared by the import and export paths.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExchangeOptions {
    /// Hierarchy delimiter used by the nested formats.
    pub key_separator: String,
    /// Longest accepted term key, in characters.
    pub max_key_length: usize,
    /// Longest accepted translation value, in characters.
    pub max_value_length: usize,
    /// Written as `source-language` in XLIFF exports; defaults to the target locale.
    pub source_locale: Option<String>,
    /// Written into generated file headers (PO `X-Generator`, XLIFF `original`).
    pub generator: String,
}

impl Default for ExchangeOptions {
    fn default() -> Self {
        Self {
            key_separator: ".".to_string(),
            max_key_length: 255,
            max_value_length: 8192,
            source_locale: None,
            generator: "termport".to_string(),
        }
    }
}

impl ExchangeOptions {
    /// Creates default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the hierarchy delimiter.
    pub fn with_key_separator(mut self, separator: impl Into<String>) -> Self {
        self.key_separator = separator.into();
        self
    }

    /// Sets the source locale written into XLIFF headers.
    pub fn with_source_locale(mut self, source_locale: Option<String>) -> Self {
        self.source_locale = source_locale;
        self
    }

    /// Sets the maximum key and value lengths.
    pub fn with_limits(mut self, max_key_length: usize, max_value_length: usize) -> Self {
        self.max_key_length = max_key_length;
        self.max_value_length = max_value_length;
        self
    }

    /// Key mode for a format with the given nesting.
    pub fn key_mode(&self, nested: bool) -> KeyMode<'_> {
        if nested {
            KeyMode::nested(&self.key_separator)
        } else {
            KeyMode::Flat
        }
    }

    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.key_separator.is_empty() {
            errors.push(ValidationError::new(
                "keySeparator",
                "The separator cannot be empty. Please specify a separator, for example: \".\" (dot)",
            ));
        } else if self.key_separator.chars().any(char::is_whitespace) {
            errors.push(ValidationError::new(
                "keySeparator",
                "The separator cannot contain whitespace",
            ));
        }

        if self.max_key_length == 0 {
            errors.push(ValidationError::new(
                "maxKeyLength",
                "Must be greater than zero",
            ));
        }

        if self.max_value_length == 0 {
            errors.push(ValidationError::new(
                "maxValueLength",
                "Must be greater than zero",
            ));
        }

        if let Some(source) = &self.source_locale
            && Locale::parse(source).is_err()
        {
            errors.push(ValidationError::new(
                "sourceLocale",
                format!("'{source}' is not a valid locale code"),
            ));
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}
