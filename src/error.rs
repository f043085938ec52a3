//! Error types for configuration resolution and injection.

use crate::resolve::ResolutionAttempt;
use std::fmt;
use thiserror::Error;

/// The main error type for pipeconf operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    /// One or more mandatory parameters had no provider hit anywhere.
    #[error(transparent)]
    FieldsMissing(#[from] FieldsMissingError),
    /// A found raw value could not be coerced to the declared type.
    #[error("invalid value for '{argument}': expected {expected}, found {found}")]
    InvalidType {
        argument: String,
        expected: String,
        found: String,
    },
    /// A provider could not read its underlying store. Fatal for that
    /// provider for the remainder of the call; other providers keep serving.
    #[error("provider '{provider}' failed to read its store: {reason}")]
    ProviderRead { provider: String, reason: String },
    #[error("provider backend '{0}' not found")]
    ProviderNotFound(String),
    #[error("invalid provider specification '{spec}': {reason}")]
    ProviderSpec { spec: String, reason: String },
}

/// A type alias for `Result<T, ConfigError>`.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// All mandatory parameters of one call that resolution could not fill,
/// each with its complete ordered attempt trail.
///
/// The trail is the debugging surface of the whole crate: every provider
/// consulted and every exact key it was asked for, in the order it happened.
/// Rendering below is plain text; richer presentation layers can walk
/// [`FieldsMissingError::fields`] themselves.
#[derive(Debug)]
pub struct FieldsMissingError {
    /// `module.function` identity of the wrapped call.
    pub function: String,
    pub fields: Vec<MissingField>,
}

/// One unresolved mandatory field and everything that was tried for it.
#[derive(Debug)]
pub struct MissingField {
    /// Argument name; nested record fields are dotted, e.g.
    /// `credentials.password`.
    pub name: String,
    pub attempts: Vec<ResolutionAttempt>,
}

impl fmt::Display for FieldsMissingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "configuration for '{}' is missing {} field(s):",
            self.function,
            self.fields.len()
        )?;
        for field in &self.fields {
            writeln!(f, "  '{}' was not found; tried:", field.name)?;
            for attempt in &field.attempts {
                writeln!(f, "    {}", attempt)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for FieldsMissingError {}
