//! Provider backends answering hierarchical key lookups.
//!
//! A provider answers exactly one question: "is there a value at this section
//! path and key?". Everything else — candidate ordering, truncation, secret
//! isolation, error aggregation — lives in the resolver. Providers are ranked
//! by their position in a [`ProviderStack`]; secure stores sit before plain
//! ones.
//!
//! ## Available providers
//!
//! - [`EnvProvider`]: process environment, secure, read-once per lookup
//! - [`SecretsTomlProvider`]: `secrets.toml` file store, secure
//! - [`ConfigTomlProvider`]: `config.toml` file store, plain — never
//!   consulted for values marked secret
//! - [`StringTomlProvider`]: in-memory TOML document, for tests and embedding
//!
//! ## URI-based configuration
//!
//! File-backed providers can be constructed from URI specs:
//!
//! ```text
//! env://
//! secrets://.pipeconf/secrets.toml
//! config://.pipeconf/config.toml
//! ```

use crate::error::{ConfigError, Result};
use crate::section::SectionPath;
use crate::value::ConfigValue;
use std::convert::TryFrom;
use url::Url;

pub mod env;
pub mod toml;
#[macro_use]
pub mod macros;

#[cfg(test)]
pub(crate) mod tests;

pub use env::{EnvConfig, EnvProvider};
pub use macros::{PROVIDER_REGISTRY, ProviderRegistration};
pub use toml::{ConfigTomlProvider, SecretsTomlProvider, StringTomlProvider, TomlFileConfig};

/// How much trust a provider's backing store deserves.
///
/// Secure providers may hold secrets; plain providers must never serve a
/// value for an argument marked secret. The resolver enforces this as a
/// contract, not an optimization: a secret accidentally written to a plain
/// store stays invisible rather than silently leaking into use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityClass {
    Secure,
    Plain,
}

/// Metadata describing an available provider backend, so a host application
/// can enumerate what a URI spec may name without constructing anything.
#[derive(Debug, Clone)]
pub struct ProviderInfo {
    /// The canonical name of the provider (e.g. "env", "secrets").
    pub name: &'static str,
    /// Whether instances of this backend may hold secrets.
    pub security: SecurityClass,
    /// A human-readable description of what the provider does.
    pub description: &'static str,
    /// Example URIs showing how to configure this provider.
    pub examples: &'static [&'static str],
}

/// Returns metadata for every registered provider backend.
pub fn providers() -> Vec<ProviderInfo> {
    PROVIDER_REGISTRY
        .iter()
        .map(|reg| reg.info.clone())
        .collect()
}

/// Trait defining the interface for configuration value providers.
///
/// Lookups are side-effect free from the caller's perspective; providers may
/// cache underlying file or environment reads for their lifetime, and caches
/// must tolerate concurrent readers (compute-once on first access, redundant
/// recomputation harmless).
pub trait Provider: Send + Sync {
    /// Retrieves the raw value stored at `path` + `key`.
    ///
    /// - `Ok(Some(value))` if the store holds a value there
    /// - `Ok(None)` if it does not — a miss is terminal for that candidate,
    ///   never retried
    /// - `Err` if the backing store itself cannot be read
    fn lookup(&self, path: &SectionPath, key: &str) -> Result<Option<ConfigValue>>;

    /// Whether this provider's store may hold secrets.
    fn security_class(&self) -> SecurityClass;

    /// The name of this provider, used in attempt trails and errors.
    fn name(&self) -> &'static str;

    /// The exact key string this provider consults for a candidate, used
    /// verbatim in attempt trails. Dotted by default; the environment
    /// provider renders `SEGMENT1__SEGMENT2__KEY` instead.
    fn key_for(&self, path: &SectionPath, key: &str) -> String {
        if path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", path, key)
        }
    }
}

impl std::fmt::Debug for dyn Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("name", &self.name())
            .field("security", &self.security_class())
            .finish()
    }
}

impl TryFrom<String> for Box<dyn Provider> {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self> {
        Self::try_from(&s as &str)
    }
}

impl TryFrom<&str> for Box<dyn Provider> {
    type Error = ConfigError;

    /// Creates a provider instance from a URI spec.
    ///
    /// Bare provider names are accepted as shorthand for `name://`; file
    /// providers take the store path as the URI path component.
    fn try_from(s: &str) -> Result<Self> {
        let (scheme, rest) = match s.find(':') {
            Some(pos) => (&s[..pos], &s[pos + 1..]),
            // Just a provider name, no URI components
            None => (s, ""),
        };

        let is_known_scheme = PROVIDER_REGISTRY
            .iter()
            .any(|reg| reg.schemes.contains(&scheme));
        if !is_known_scheme {
            return Err(ConfigError::ProviderNotFound(scheme.to_string()));
        }

        let url_string = match rest {
            "" | ":" => format!("{}://", scheme),
            r if r.starts_with("//") => format!("{}:{}", scheme, r),
            r => format!("{}://{}", scheme, r),
        };

        let url = Url::parse(&url_string).map_err(|e| ConfigError::ProviderSpec {
            spec: s.to_string(),
            reason: e.to_string(),
        })?;

        Self::try_from(&url)
    }
}

impl TryFrom<&Url> for Box<dyn Provider> {
    type Error = ConfigError;

    fn try_from(url: &Url) -> Result<Self> {
        let scheme = url.scheme();
        let registration = PROVIDER_REGISTRY
            .iter()
            .find(|reg| reg.schemes.contains(&scheme))
            .ok_or_else(|| ConfigError::ProviderNotFound(scheme.to_string()))?;
        (registration.build)(url)
    }
}

/// A rank-ordered set of providers. Position is rank: the resolver consults
/// providers front to back and stops on the first hit.
///
/// Explicit call arguments are not a stack member; the injector special-cases
/// them before any provider is asked.
#[derive(Default)]
pub struct ProviderStack {
    providers: Vec<Box<dyn Provider>>,
}

impl ProviderStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// The suggested default order: environment (secure), secrets file
    /// (secure), config file (plain).
    pub fn standard(
        secrets_path: impl Into<std::path::PathBuf>,
        config_path: impl Into<std::path::PathBuf>,
    ) -> Self {
        Self::new()
            .with(Box::new(EnvProvider::new(EnvConfig::default())))
            .with(Box::new(SecretsTomlProvider::at(secrets_path)))
            .with(Box::new(ConfigTomlProvider::at(config_path)))
    }

    /// Builds a stack from URI specs, preserving their order as rank.
    pub fn from_specs<S: AsRef<str>>(specs: &[S]) -> Result<Self> {
        let mut stack = Self::new();
        for spec in specs {
            stack.push(Box::<dyn Provider>::try_from(spec.as_ref())?);
        }
        Ok(stack)
    }

    pub fn push(&mut self, provider: Box<dyn Provider>) {
        self.providers.push(provider);
    }

    pub fn with(mut self, provider: Box<dyn Provider>) -> Self {
        self.push(provider);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Provider> {
        self.providers.iter().map(|p| p.as_ref())
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
