//! The resolution engine.
//!
//! Given an argument spec and a lookup context, the resolver walks the
//! candidate matrix: providers in rank order on the outside, candidate paths
//! most-specific-first on the inside, returning on the first hit. Every
//! single probe is recorded as a [`ResolutionAttempt`] so a failed resolution
//! can report exactly what was tried, in order. Identical context and store
//! state always produce the identical result and the identical trail.

use crate::error::{ConfigError, MissingField, Result};
use crate::provider::{ProviderStack, SecurityClass};
use crate::section::{CandidateKey, LookupContext, SectionPath, candidates};
use crate::spec::{Alternative, ArgumentSpec, DefaultMarker, RecordShape, ValueKind};
use crate::value::{ConfigValue, coerce, value_repr};
use std::collections::HashMap;
use toml::Table;
use tracing::{debug, trace};

/// What a single provider probe produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Found,
    NotFound,
    /// The provider's store could not be read; the reason travels with the
    /// trail so a malformed file shows up in the final error.
    Error(String),
}

/// One recorded probe: which provider was asked for which exact key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionAttempt {
    /// Provider (store) name.
    pub provider: String,
    /// The exact key string the provider consulted, e.g.
    /// `DESTINATION__POSTGRES__CREDENTIALS__PASSWORD` for the environment
    /// provider or `destination.postgres.credentials.password` for a file
    /// store.
    pub key: String,
    /// The section path the key was derived from.
    pub path: SectionPath,
    pub outcome: AttemptOutcome,
}

impl std::fmt::Display for ResolutionAttempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.outcome {
            AttemptOutcome::Found => write!(f, "{}: {} -> found", self.provider, self.key),
            AttemptOutcome::NotFound => {
                write!(f, "{}: {} -> not found", self.provider, self.key)
            }
            AttemptOutcome::Error(reason) => {
                write!(f, "{}: {} -> store error: {}", self.provider, self.key, reason)
            }
        }
    }
}

/// Outcome of resolving one argument.
#[derive(Debug)]
pub enum FieldResolution {
    Resolved(ConfigValue),
    /// Nothing found; one entry per unresolved leaf field, each with its
    /// full ordered attempt trail.
    Missing(Vec<MissingField>),
}

/// Per-call resolution state.
///
/// Holds the provider stack and the set of providers whose stores failed to
/// read during this call; a failed provider stays excluded for the rest of
/// the call but never blocks the others.
pub struct Resolver<'a> {
    stack: &'a ProviderStack,
    failed: HashMap<String, String>,
}

impl<'a> Resolver<'a> {
    pub fn new(stack: &'a ProviderStack) -> Self {
        Self {
            stack,
            failed: HashMap::new(),
        }
    }

    /// Runs the truncation search for a prepared candidate list.
    ///
    /// Providers ranked secure-first are consulted in order; for a value
    /// marked secret, plain providers are excluded outright and leave no
    /// trace in the trail. Returns the first hit together with the attempts
    /// made so far, or `None` with the complete trail.
    pub fn resolve_value(
        &mut self,
        cands: &[CandidateKey],
        secret: bool,
    ) -> (Option<ConfigValue>, Vec<ResolutionAttempt>) {
        let mut attempts = Vec::new();
        for provider in self.stack.iter() {
            if secret && provider.security_class() == SecurityClass::Plain {
                trace!(provider = provider.name(), "skipping plain provider for secret value");
                continue;
            }
            if let Some(reason) = self.failed.get(provider.name()) {
                if let Some(first) = cands.first() {
                    attempts.push(ResolutionAttempt {
                        provider: provider.name().to_string(),
                        key: provider.key_for(&first.path, &first.key),
                        path: first.path.clone(),
                        outcome: AttemptOutcome::Error(reason.clone()),
                    });
                }
                continue;
            }
            for candidate in cands {
                let key = provider.key_for(&candidate.path, &candidate.key);
                match provider.lookup(&candidate.path, &candidate.key) {
                    Ok(Some(value)) => {
                        debug!(provider = provider.name(), %key, "value found");
                        attempts.push(ResolutionAttempt {
                            provider: provider.name().to_string(),
                            key,
                            path: candidate.path.clone(),
                            outcome: AttemptOutcome::Found,
                        });
                        return (Some(value), attempts);
                    }
                    Ok(None) => {
                        trace!(provider = provider.name(), %key, "not found");
                        attempts.push(ResolutionAttempt {
                            provider: provider.name().to_string(),
                            key,
                            path: candidate.path.clone(),
                            outcome: AttemptOutcome::NotFound,
                        });
                    }
                    Err(err) => {
                        let reason = err.to_string();
                        debug!(provider = provider.name(), %key, %reason, "store error");
                        attempts.push(ResolutionAttempt {
                            provider: provider.name().to_string(),
                            key,
                            path: candidate.path.clone(),
                            outcome: AttemptOutcome::Error(reason.clone()),
                        });
                        self.failed.insert(provider.name().to_string(), reason);
                        // Fatal for this provider for the rest of the call.
                        break;
                    }
                }
            }
        }
        (None, attempts)
    }

    /// Resolves one argument: candidate construction, truncation search,
    /// coercion. Record-shaped arguments go through shape resolution with
    /// nested per-field lookups.
    pub fn resolve_argument(
        &mut self,
        ctx: &LookupContext,
        arg: &ArgumentSpec,
    ) -> Result<FieldResolution> {
        match &arg.kind {
            ValueKind::Record(shape) => {
                let chain = [arg.name.clone()];
                self.resolve_record(ctx, &chain, shape, arg.is_secret(), None)
            }
            _ => {
                let secret = matches!(arg.marker, DefaultMarker::SecretRequired);
                let cands = candidates(ctx, &[], &arg.name);
                let (raw, attempts) = self.resolve_value(&cands, secret);
                match raw {
                    Some(value) => Ok(FieldResolution::Resolved(coerce(
                        value, &arg.kind, &arg.name,
                    )?)),
                    None => Ok(FieldResolution::Missing(vec![MissingField {
                        name: arg.name.clone(),
                        attempts,
                    }])),
                }
            }
        }
    }

    /// Resolves a record-shaped value.
    ///
    /// `chain` is the path of argument names from the signature root, e.g.
    /// `["credentials"]` for a top-level argument or
    /// `["credentials", "oauth"]` for a record nested inside one; nested
    /// field lookups extend the section path with exactly these segments.
    /// `seed` carries the raw value a parent mapping already held for this
    /// record; without a seed a whole-value ("native") lookup runs first, so
    /// a connection string stored under the argument's own key is picked up.
    fn resolve_record(
        &mut self,
        ctx: &LookupContext,
        chain: &[String],
        shape: &RecordShape,
        secret: bool,
        seed: Option<ConfigValue>,
    ) -> Result<FieldResolution> {
        let qualified = chain.join(".");
        let (initial, initial_attempts) = match seed {
            Some(value) => (Some(value), Vec::new()),
            None => {
                let parent = &chain[..chain.len() - 1];
                let leaf = &chain[chain.len() - 1];
                let cands = candidates(ctx, parent, leaf);
                self.resolve_value(&cands, secret)
            }
        };

        if let Some(value) = &initial {
            if !matches!(value, ConfigValue::String(_) | ConfigValue::Table(_)) {
                return Err(ConfigError::InvalidType {
                    argument: qualified,
                    expected: shape.name.clone(),
                    found: value_repr(value),
                });
            }
        }

        let mut structured_missing: Option<Vec<MissingField>> = None;
        for alternative in shape.alternatives() {
            match alternative {
                Alternative::Opaque => {
                    if let (Some(ConfigValue::String(native)), Some(field)) =
                        (&initial, &shape.opaque_field)
                    {
                        let mut table = Table::new();
                        table.insert(field.clone(), ConfigValue::String(native.clone()));
                        return Ok(FieldResolution::Resolved(ConfigValue::Table(table)));
                    }
                }
                Alternative::Structured => {
                    // Opaque strings are not enumerable; leave them to the
                    // Opaque alternative.
                    if matches!(&initial, Some(ConfigValue::String(_))) {
                        continue;
                    }
                    let seed_table = match &initial {
                        Some(ConfigValue::Table(table)) => table.clone(),
                        _ => Table::new(),
                    };
                    let (table, missing) =
                        self.resolve_fields(ctx, chain, shape, secret, seed_table)?;
                    if missing.is_empty() {
                        return Ok(FieldResolution::Resolved(ConfigValue::Table(table)));
                    }
                    structured_missing = Some(missing);
                }
                Alternative::Ambient => {
                    // Matches only the complete absence of provider values;
                    // defaults never shadow a value a store actually holds.
                    if initial.is_none() {
                        if let Some(table) = ambient_defaults(shape) {
                            debug!(argument = %qualified, "using ambient defaults");
                            return Ok(FieldResolution::Resolved(ConfigValue::Table(table)));
                        }
                    }
                }
            }
        }

        if let Some(missing) = structured_missing {
            return Ok(FieldResolution::Missing(missing));
        }
        match initial {
            // A raw value was found but no declared alternative accepts its
            // shape, e.g. a bare string for a shape without an opaque form.
            Some(value) => Err(ConfigError::InvalidType {
                argument: qualified,
                expected: shape.name.clone(),
                found: value_repr(&value),
            }),
            None => Ok(FieldResolution::Missing(vec![MissingField {
                name: qualified,
                attempts: initial_attempts,
            }])),
        }
    }

    /// Field-by-field structured construction: seed values from the mapping
    /// win, missing fields go through nested resolution (section path
    /// extended with the argument-name chain), then declared defaults.
    fn resolve_fields(
        &mut self,
        ctx: &LookupContext,
        chain: &[String],
        shape: &RecordShape,
        secret: bool,
        seed: Table,
    ) -> Result<(Table, Vec<MissingField>)> {
        let mut out = Table::new();
        let mut missing = Vec::new();
        for field in &shape.fields {
            let field_secret = secret || field.secret;
            let qualified = format!("{}.{}", chain.join("."), field.name);
            let seeded = seed.get(&field.name).cloned();
            match &field.kind {
                ValueKind::Record(inner) => {
                    let mut inner_chain = chain.to_vec();
                    inner_chain.push(field.name.clone());
                    match self.resolve_record(ctx, &inner_chain, inner, field_secret, seeded)? {
                        FieldResolution::Resolved(value) => {
                            out.insert(field.name.clone(), value);
                        }
                        FieldResolution::Missing(fields) => {
                            if let Some(default) = &field.default {
                                out.insert(field.name.clone(), default.clone());
                            } else if field.required {
                                missing.extend(fields);
                            }
                        }
                    }
                }
                _ => {
                    let resolved = match seeded {
                        Some(value) => Some(coerce(value, &field.kind, &qualified)?),
                        None => {
                            let cands = candidates(ctx, chain, &field.name);
                            let (raw, attempts) = self.resolve_value(&cands, field_secret);
                            match raw {
                                Some(value) => Some(coerce(value, &field.kind, &qualified)?),
                                None => {
                                    if field.required && field.default.is_none() {
                                        missing.push(MissingField {
                                            name: qualified,
                                            attempts,
                                        });
                                    }
                                    None
                                }
                            }
                        }
                    };
                    match resolved {
                        Some(value) => {
                            out.insert(field.name.clone(), value);
                        }
                        None => {
                            if let Some(default) = &field.default {
                                out.insert(field.name.clone(), default.clone());
                            }
                        }
                    }
                }
            }
        }
        Ok((out, missing))
    }
}

/// The ambient alternative: a record built purely from field defaults.
/// Matches only when every required field carries a default.
fn ambient_defaults(shape: &RecordShape) -> Option<Table> {
    let mut table = Table::new();
    for field in &shape.fields {
        match &field.default {
            Some(default) => {
                table.insert(field.name.clone(), default.clone());
            }
            None if field.required => return None,
            None => {}
        }
    }
    Some(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ProviderStack, StringTomlProvider};
    use crate::section::Category;
    use crate::spec::{FieldSpec, RecordShape};
    use std::sync::Arc;

    fn ctx() -> LookupContext {
        LookupContext::new(None, "zendesk", "tickets", Category::Source)
    }

    fn text_arg(name: &str, marker: DefaultMarker) -> ArgumentSpec {
        ArgumentSpec::new(name, ValueKind::Text, marker)
    }

    fn stack_with(documents: &[(&str, SecurityClass)]) -> ProviderStack {
        let mut stack = ProviderStack::new();
        for (doc, class) in documents {
            stack.push(Box::new(StringTomlProvider::new(doc, *class).unwrap()));
        }
        stack
    }

    #[test]
    fn most_specific_path_wins_within_a_provider() {
        let stack = stack_with(&[(
            r#"
            api_url = "general"

            [sources.zendesk.tickets]
            api_url = "specific"
            "#,
            SecurityClass::Secure,
        )]);
        let mut resolver = Resolver::new(&stack);
        let arg = text_arg("api_url", DefaultMarker::ConfigRequired);
        match resolver.resolve_argument(&ctx(), &arg).unwrap() {
            FieldResolution::Resolved(value) => {
                assert_eq!(value, ConfigValue::String("specific".into()))
            }
            other => panic!("expected resolution, got {:?}", other),
        }
    }

    #[test]
    fn higher_ranked_provider_wins_over_more_specific_path() {
        // Rank beats depth: the first provider only has the general key but
        // is consulted exhaustively before the second provider is asked.
        let stack = stack_with(&[
            (r#"api_url = "ranked-first""#, SecurityClass::Secure),
            (
                r#"
                [sources.zendesk.tickets]
                api_url = "deeper-but-later"
                "#,
                SecurityClass::Secure,
            ),
        ]);
        let mut resolver = Resolver::new(&stack);
        let arg = text_arg("api_url", DefaultMarker::ConfigRequired);
        match resolver.resolve_argument(&ctx(), &arg).unwrap() {
            FieldResolution::Resolved(value) => {
                assert_eq!(value, ConfigValue::String("ranked-first".into()))
            }
            other => panic!("expected resolution, got {:?}", other),
        }
    }

    #[test]
    fn attempt_trail_is_complete_and_ordered() {
        let stack = stack_with(&[(r#"unrelated = 1"#, SecurityClass::Secure)]);
        let mut resolver = Resolver::new(&stack);
        let arg = text_arg("api_url", DefaultMarker::ConfigRequired);
        let missing = match resolver.resolve_argument(&ctx(), &arg).unwrap() {
            FieldResolution::Missing(missing) => missing,
            other => panic!("expected a miss, got {:?}", other),
        };
        assert_eq!(missing.len(), 1);
        let keys: Vec<&str> = missing[0].attempts.iter().map(|a| a.key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "sources.zendesk.tickets.api_url",
                "sources.zendesk.api_url",
                "sources.api_url",
                "api_url",
            ]
        );
        assert!(
            missing[0]
                .attempts
                .iter()
                .all(|a| a.outcome == AttemptOutcome::NotFound)
        );
    }

    #[test]
    fn plain_provider_never_serves_secret_values() {
        let stack = stack_with(&[(r#"token = "leaked""#, SecurityClass::Plain)]);
        let mut resolver = Resolver::new(&stack);
        let arg = text_arg("token", DefaultMarker::SecretRequired);
        match resolver.resolve_argument(&ctx(), &arg).unwrap() {
            FieldResolution::Missing(missing) => {
                // excluded providers leave no trace either
                assert!(missing[0].attempts.is_empty());
            }
            other => panic!("secret must not resolve from a plain store, got {:?}", other),
        }
    }

    #[test]
    fn resolution_is_deterministic() {
        let doc = r#"
        [sources.zendesk]
        api_url = "value"
        "#;
        let stack = stack_with(&[(r#"other = 1"#, SecurityClass::Secure), (doc, SecurityClass::Plain)]);
        let arg = text_arg("missing_key", DefaultMarker::ConfigRequired);
        let trail = |stack: &ProviderStack| {
            let mut resolver = Resolver::new(stack);
            match resolver.resolve_argument(&ctx(), &arg).unwrap() {
                FieldResolution::Missing(mut missing) => missing.remove(0).attempts,
                other => panic!("expected a miss, got {:?}", other),
            }
        };
        assert_eq!(trail(&stack), trail(&stack));
    }

    fn credentials_shape() -> Arc<RecordShape> {
        Arc::new(RecordShape {
            name: "postgres credentials".to_string(),
            fields: vec![
                FieldSpec::new("username", ValueKind::Text),
                FieldSpec::new("password", ValueKind::Text).secret(),
                FieldSpec::new("host", ValueKind::Text)
                    .with_default(ConfigValue::String("localhost".into())),
            ],
            alternatives: vec![Alternative::Opaque, Alternative::Structured],
            opaque_field: Some("connection_string".to_string()),
            secret: true,
        })
    }

    #[test]
    fn record_fields_merge_across_providers() {
        let stack = stack_with(&[
            (
                r#"
                [sources.zendesk.credentials]
                username = "alice"
                "#,
                SecurityClass::Secure,
            ),
            (
                r#"
                [credentials]
                password = "hunter2"
                "#,
                SecurityClass::Secure,
            ),
        ]);
        let mut resolver = Resolver::new(&stack);
        let arg = ArgumentSpec::new(
            "credentials",
            ValueKind::Record(credentials_shape()),
            DefaultMarker::SecretRequired,
        );
        let value = match resolver.resolve_argument(&ctx(), &arg).unwrap() {
            FieldResolution::Resolved(value) => value,
            other => panic!("expected resolution, got {:?}", other),
        };
        let table = value.as_table().unwrap();
        assert_eq!(table["username"], ConfigValue::String("alice".into()));
        assert_eq!(table["password"], ConfigValue::String("hunter2".into()));
        assert_eq!(table["host"], ConfigValue::String("localhost".into()));
    }

    #[test]
    fn opaque_string_becomes_native_representation() {
        let stack = stack_with(&[(
            r#"
            [sources.zendesk]
            credentials = "postgres://alice:hunter2@db/prod"
            "#,
            SecurityClass::Secure,
        )]);
        let mut resolver = Resolver::new(&stack);
        let arg = ArgumentSpec::new(
            "credentials",
            ValueKind::Record(credentials_shape()),
            DefaultMarker::SecretRequired,
        );
        let value = match resolver.resolve_argument(&ctx(), &arg).unwrap() {
            FieldResolution::Resolved(value) => value,
            other => panic!("expected resolution, got {:?}", other),
        };
        let table = value.as_table().unwrap();
        assert_eq!(
            table["connection_string"],
            ConfigValue::String("postgres://alice:hunter2@db/prod".into())
        );
    }

    #[test]
    fn ambient_alternative_builds_from_declared_defaults() {
        let shape = Arc::new(RecordShape {
            name: "runtime defaults".to_string(),
            fields: vec![
                FieldSpec::new("location", ValueKind::Text)
                    .with_default(ConfigValue::String("US".into())),
                FieldSpec::new("timeout", ValueKind::Float)
                    .with_default(ConfigValue::Float(15.0)),
            ],
            alternatives: vec![Alternative::Ambient, Alternative::Structured],
            opaque_field: None,
            secret: false,
        });
        let stack = stack_with(&[(r#"unrelated = true"#, SecurityClass::Secure)]);
        let mut resolver = Resolver::new(&stack);
        let arg = ArgumentSpec::new(
            "runtime",
            ValueKind::Record(shape),
            DefaultMarker::ConfigRequired,
        );
        let value = match resolver.resolve_argument(&ctx(), &arg).unwrap() {
            FieldResolution::Resolved(value) => value,
            other => panic!("expected resolution, got {:?}", other),
        };
        let table = value.as_table().unwrap();
        assert_eq!(table["location"], ConfigValue::String("US".into()));
        assert_eq!(table["timeout"], ConfigValue::Float(15.0));
    }

    #[test]
    fn stored_mapping_beats_ambient_defaults() {
        let shape = Arc::new(RecordShape {
            name: "runtime defaults".to_string(),
            fields: vec![
                FieldSpec::new("location", ValueKind::Text)
                    .with_default(ConfigValue::String("US".into())),
            ],
            alternatives: vec![Alternative::Ambient, Alternative::Structured],
            opaque_field: None,
            secret: false,
        });
        let stack = stack_with(&[(
            r#"
            [sources.zendesk.runtime]
            location = "EU"
            "#,
            SecurityClass::Secure,
        )]);
        let mut resolver = Resolver::new(&stack);
        let arg = ArgumentSpec::new(
            "runtime",
            ValueKind::Record(shape),
            DefaultMarker::ConfigRequired,
        );
        let value = match resolver.resolve_argument(&ctx(), &arg).unwrap() {
            FieldResolution::Resolved(value) => value,
            other => panic!("expected resolution, got {:?}", other),
        };
        let table = value.as_table().unwrap();
        assert_eq!(table["location"], ConfigValue::String("EU".into()));
    }

    #[test]
    fn coercion_failure_propagates_not_retried() {
        let stack = stack_with(&[(r#"workers = "many""#, SecurityClass::Secure)]);
        let mut resolver = Resolver::new(&stack);
        let arg = ArgumentSpec::new("workers", ValueKind::Integer, DefaultMarker::ConfigRequired);
        let err = resolver.resolve_argument(&ctx(), &arg).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidType { .. }));
    }
}
