use super::{Provider, SecurityClass};
use crate::error::{ConfigError, Result};
use crate::section::SectionPath;
use crate::value::ConfigValue;
use serde::{Deserialize, Serialize};
use std::env;
use url::Url;

/// Configuration for the environment variables provider. Empty today; the
/// provider reads the process environment directly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvConfig {}

impl TryFrom<&Url> for EnvConfig {
    type Error = ConfigError;

    fn try_from(url: &Url) -> std::result::Result<Self, Self::Error> {
        if url.scheme() != "env" {
            return Err(ConfigError::ProviderSpec {
                spec: url.to_string(),
                reason: format!("invalid scheme '{}' for env provider", url.scheme()),
            });
        }
        Ok(Self::default())
    }
}

/// Reads configuration values from process environment variables.
///
/// A section path plus key maps to an uppercase, double-underscore-joined
/// variable name: `destination.postgres.credentials` + `password` becomes
/// `DESTINATION__POSTGRES__CREDENTIALS__PASSWORD`. Environment values are
/// always strings; coercion parses them into the declared kind.
///
/// Ranked as a secure store: process environments are commonly the secret
/// channel of container schedulers and CI systems.
pub struct EnvProvider {
    #[allow(dead_code)]
    config: EnvConfig,
}

crate::register_provider! {
    provider: EnvProvider,
    config: EnvConfig,
    name: "env",
    security: Secure,
    description: "Process environment variables (secure, read-only)",
    schemes: ["env"],
    examples: ["env://"],
}

impl EnvProvider {
    pub fn new(config: EnvConfig) -> Self {
        Self { config }
    }
}

impl Provider for EnvProvider {
    fn name(&self) -> &'static str {
        Self::PROVIDER_NAME
    }

    fn security_class(&self) -> SecurityClass {
        Self::PROVIDER_SECURITY
    }

    fn key_for(&self, path: &SectionPath, key: &str) -> String {
        let mut parts: Vec<&str> = path.segments().iter().map(String::as_str).collect();
        parts.push(key);
        parts.join("__").to_uppercase()
    }

    fn lookup(&self, path: &SectionPath, key: &str) -> Result<Option<ConfigValue>> {
        let variable = self.key_for(path, key);
        Ok(env::var(&variable).ok().map(ConfigValue::String))
    }
}
