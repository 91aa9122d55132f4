//! Input validation shared by the import path and API-facing callers.
//!
//! Term keys and translation values are checked per record during
//! reconciliation; the request-level checks (locale code, format id,
//! policy) run once before any file is decoded.

use std::str::FromStr;

use crate::{
    error::Error,
    formats::FormatType,
    key_path::{KeyMode, KeyPath},
    options::ExchangeOptions,
    types::{ImportPolicy, Locale},
};

/// Validation context for one import or export request.
#[derive(Debug, Clone, Default)]
pub struct ValidationContext {
    pub locale_code: Option<String>,
    pub format: Option<String>,
    pub policy: Option<String>,
}

impl ValidationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_locale_code(mut self, code: impl Into<String>) -> Self {
        self.locale_code = Some(code.into());
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_policy(mut self, policy: impl Into<String>) -> Self {
        self.policy = Some(policy.into());
        self
    }
}

/// Checks that `key` is usable as a term key.
///
/// Keys must not be empty or whitespace only and may not exceed
/// `options.max_key_length` characters. In nested mode every segment must be
/// non-empty as well.
pub fn validate_term_key(key: &str, mode: KeyMode<'_>, options: &ExchangeOptions) -> Result<KeyPath, Error> {
    let length = key.chars().count();
    if length > options.max_key_length {
        return Err(Error::MalformedKey {
            key: key.to_string(),
            reason: format!(
                "key is {length} characters long, the maximum is {}",
                options.max_key_length
            ),
        });
    }
    KeyPath::parse(key, mode)
}

/// Checks a translation value against `options.max_value_length`.
pub fn validate_translation_value(value: &str, options: &ExchangeOptions) -> Result<(), Error> {
    let length = value.chars().count();
    if length > options.max_value_length {
        return Err(Error::ValueTooLong {
            length,
            max: options.max_value_length,
        });
    }
    Ok(())
}

/// Validates a locale code and returns the parsed locale.
pub fn validate_locale_code(code: &str) -> Result<Locale, Error> {
    if code.trim().is_empty() {
        return Err(Error::InvalidLocale(code.to_string()));
    }
    Locale::parse(code)
}

/// Validates a format identifier such as `jsonnested`.
pub fn validate_format(format: &str) -> Result<FormatType, Error> {
    FormatType::from_str(format)
}

/// Validates an import policy name such as `create-only`.
pub fn validate_policy(policy: &str) -> Result<ImportPolicy, Error> {
    ImportPolicy::from_str(policy)
}

/// Validates every field present in `context`, stopping at the first failure.
pub fn validate_context(context: &ValidationContext) -> Result<(), Error> {
    if let Some(code) = &context.locale_code {
        validate_locale_code(code)?;
    }
    if let Some(format) = &context.format {
        validate_format(format)?;
    }
    if let Some(policy) = &context.policy {
        validate_policy(policy)?;
    }
    Ok(())
}
