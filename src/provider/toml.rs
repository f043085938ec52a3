//! TOML file stores.
//!
//! Two file-backed providers share one store implementation: the secure
//! `secrets.toml` store and the plain `config.toml` store. Section paths map
//! onto nested TOML tables; the leaf key indexes the innermost table. A
//! missing file is an empty store; a malformed file fails every lookup for
//! the rest of the call.

use super::{Provider, SecurityClass};
use crate::error::{ConfigError, Result};
use crate::section::SectionPath;
use crate::value::ConfigValue;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;
use toml::Table;
use url::Url;

/// Configuration for a TOML file provider: the path of the store document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlFileConfig {
    pub path: PathBuf,
}

impl TomlFileConfig {
    fn from_url(url: &Url, expected_scheme: &str, default_file: &str) -> Result<Self> {
        if url.scheme() != expected_scheme {
            return Err(ConfigError::ProviderSpec {
                spec: url.to_string(),
                reason: format!(
                    "invalid scheme '{}' for {} provider",
                    url.scheme(),
                    expected_scheme
                ),
            });
        }
        // `secrets://dir/file.toml` parses the first segment as host; stitch
        // host and path back together into a filesystem path.
        let mut path = String::new();
        if let Some(host) = url.host_str() {
            path.push_str(host);
        }
        path.push_str(url.path());
        let path = if path.is_empty() {
            PathBuf::from(default_file)
        } else {
            PathBuf::from(path)
        };
        Ok(Self { path })
    }
}

/// Lazily parsed TOML document shared by the file providers.
///
/// The parse happens once on first lookup and is cached for the provider's
/// lifetime; `OnceLock` keeps concurrent first reads race-free. Parse
/// failures are cached too, so one malformed store fails fast on every
/// subsequent lookup instead of re-reading the file.
struct TomlStore {
    path: PathBuf,
    document: OnceLock<std::result::Result<Table, String>>,
}

impl TomlStore {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            document: OnceLock::new(),
        }
    }

    fn document(&self, provider: &str) -> Result<&Table> {
        let parsed = self.document.get_or_init(|| {
            if !self.path.exists() {
                return Ok(Table::new());
            }
            let content = fs::read_to_string(&self.path).map_err(|e| e.to_string())?;
            content.parse::<Table>().map_err(|e| e.to_string())
        });
        match parsed {
            Ok(table) => Ok(table),
            Err(reason) => Err(ConfigError::ProviderRead {
                provider: provider.to_string(),
                reason: format!("{}: {}", self.path.display(), reason),
            }),
        }
    }

    fn find(&self, provider: &str, path: &SectionPath, key: &str) -> Result<Option<ConfigValue>> {
        Ok(find_in(self.document(provider)?, path, key))
    }
}

/// Walks nested tables along the section path, then indexes the leaf key.
/// A scalar in the middle of the path means the location does not exist,
/// not that the store is malformed.
fn find_in(root: &Table, path: &SectionPath, key: &str) -> Option<ConfigValue> {
    let mut table = root;
    for segment in path.segments() {
        match table.get(segment) {
            Some(ConfigValue::Table(inner)) => table = inner,
            Some(_) | None => return None,
        }
    }
    table.get(key).cloned()
}

/// The secure file store, by convention `secrets.toml`. Holds credentials
/// and other secret-capable values.
pub struct SecretsTomlProvider {
    store: TomlStore,
}

crate::register_provider! {
    provider: SecretsTomlProvider,
    config: TomlFileConfig,
    name: "secrets",
    security: Secure,
    description: "Secrets TOML file store (secure)",
    schemes: ["secrets"],
    examples: ["secrets://", "secrets://.pipeconf/secrets.toml"],
}

impl TryFrom<&Url> for TomlFileConfig {
    type Error = ConfigError;

    fn try_from(url: &Url) -> std::result::Result<Self, Self::Error> {
        match url.scheme() {
            "secrets" => Self::from_url(url, "secrets", "secrets.toml"),
            "config" => Self::from_url(url, "config", "config.toml"),
            other => Err(ConfigError::ProviderSpec {
                spec: url.to_string(),
                reason: format!("invalid scheme '{}' for TOML file provider", other),
            }),
        }
    }
}

impl SecretsTomlProvider {
    pub fn new(config: TomlFileConfig) -> Self {
        Self {
            store: TomlStore::new(config.path),
        }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self::new(TomlFileConfig { path: path.into() })
    }
}

impl Provider for SecretsTomlProvider {
    fn name(&self) -> &'static str {
        Self::PROVIDER_NAME
    }

    fn security_class(&self) -> SecurityClass {
        Self::PROVIDER_SECURITY
    }

    fn lookup(&self, path: &SectionPath, key: &str) -> Result<Option<ConfigValue>> {
        self.store.find(self.name(), path, key)
    }
}

/// The plain file store, by convention `config.toml`. Never consulted for
/// values marked secret; the resolver enforces that exclusion.
pub struct ConfigTomlProvider {
    store: TomlStore,
}

crate::register_provider! {
    provider: ConfigTomlProvider,
    config: TomlFileConfig,
    name: "config",
    security: Plain,
    description: "Plain-config TOML file store",
    schemes: ["config"],
    examples: ["config://", "config://.pipeconf/config.toml"],
}

impl ConfigTomlProvider {
    pub fn new(config: TomlFileConfig) -> Self {
        Self {
            store: TomlStore::new(config.path),
        }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self::new(TomlFileConfig { path: path.into() })
    }
}

impl Provider for ConfigTomlProvider {
    fn name(&self) -> &'static str {
        Self::PROVIDER_NAME
    }

    fn security_class(&self) -> SecurityClass {
        Self::PROVIDER_SECURITY
    }

    fn lookup(&self, path: &SectionPath, key: &str) -> Result<Option<ConfigValue>> {
        self.store.find(self.name(), path, key)
    }
}

/// An in-memory TOML document behind the provider interface.
///
/// Useful in tests and when a host application wants to inject a parsed
/// document programmatically. The security class is chosen at construction.
pub struct StringTomlProvider {
    document: Table,
    security: SecurityClass,
}

impl StringTomlProvider {
    pub fn new(document: &str, security: SecurityClass) -> Result<Self> {
        Ok(Self {
            document: document.parse::<Table>()?,
            security,
        })
    }

    pub fn secure(document: &str) -> Result<Self> {
        Self::new(document, SecurityClass::Secure)
    }

    pub fn plain(document: &str) -> Result<Self> {
        Self::new(document, SecurityClass::Plain)
    }
}

impl Provider for StringTomlProvider {
    fn name(&self) -> &'static str {
        "toml-string"
    }

    fn security_class(&self) -> SecurityClass {
        self.security
    }

    fn lookup(&self, path: &SectionPath, key: &str) -> Result<Option<ConfigValue>> {
        Ok(find_in(&self.document, path, key))
    }
}
