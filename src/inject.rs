//! Call-time argument binding.
//!
//! The injector sits between a caller and a wrapped function: explicit
//! arguments pass through untouched, everything else is resolved through the
//! provider stack, and the wrapped function only ever runs with a fully
//! bound mandatory argument set.

use crate::error::{FieldsMissingError, MissingField, Result};
use crate::provider::ProviderStack;
use crate::resolve::{FieldResolution, Resolver};
use crate::section::LookupContext;
use crate::spec::{DefaultMarker, FunctionSig};
use crate::value::ConfigValue;
use tracing::debug;

/// An insertion-ordered set of named argument bindings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    entries: Vec<(String, ConfigValue)>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a value, replacing any previous binding of the same name.
    pub fn bind(&mut self, name: impl Into<String>, value: ConfigValue) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: ConfigValue) -> Self {
        self.bind(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ConfigValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, ConfigValue)> for Arguments {
    fn from_iter<I: IntoIterator<Item = (String, ConfigValue)>>(iter: I) -> Self {
        let mut args = Arguments::new();
        for (name, value) in iter {
            args.bind(name, value);
        }
        args
    }
}

/// Resolves and binds arguments for wrapped functions.
///
/// Per parameter the state machine is:
///
/// - explicitly bound → kept verbatim, no provider is ever consulted;
/// - no default, no marker → skipped, left for the callee;
/// - literal default → resolve, keep the default on a miss;
/// - config-required → resolve across the full stack, collect on a miss;
/// - secret-required → resolve across secure providers only, collect on a
///   miss.
///
/// Misses of mandatory parameters are collected across the whole signature
/// and raised as one [`FieldsMissingError`]; the call never proceeds
/// partially bound.
pub struct Injector {
    stack: ProviderStack,
}

impl Injector {
    pub fn new(stack: ProviderStack) -> Self {
        Self { stack }
    }

    pub fn stack(&self) -> &ProviderStack {
        &self.stack
    }

    /// Produces the fully bound argument set for one call.
    pub fn resolve_call(
        &self,
        sig: &FunctionSig,
        pipeline_name: Option<&str>,
        explicit: Arguments,
    ) -> Result<Arguments> {
        // Fresh per call; the pipeline name travels here, never in globals.
        let ctx = LookupContext::new(
            pipeline_name.map(str::to_string),
            sig.module.clone(),
            sig.function.clone(),
            sig.category,
        );
        debug!(
            module = %sig.module,
            function = %sig.function,
            pipeline = pipeline_name.unwrap_or(""),
            "resolving call arguments"
        );

        let mut resolver = Resolver::new(&self.stack);
        let mut bound = explicit.clone();
        let mut missing: Vec<MissingField> = Vec::new();

        for arg in &sig.args {
            // Explicit arguments are permanently excluded from resolution
            // and are never coerced.
            if explicit.contains(&arg.name) {
                continue;
            }
            match &arg.marker {
                DefaultMarker::NoDefault => continue,
                DefaultMarker::Literal(default) => {
                    match resolver.resolve_argument(&ctx, arg)? {
                        FieldResolution::Resolved(value) => bound.bind(&arg.name, value),
                        FieldResolution::Missing(_) => bound.bind(&arg.name, default.clone()),
                    }
                }
                DefaultMarker::ConfigRequired | DefaultMarker::SecretRequired => {
                    match resolver.resolve_argument(&ctx, arg)? {
                        FieldResolution::Resolved(value) => bound.bind(&arg.name, value),
                        FieldResolution::Missing(fields) => missing.extend(fields),
                    }
                }
            }
        }

        if !missing.is_empty() {
            return Err(FieldsMissingError {
                function: format!("{}.{}", sig.module, sig.function),
                fields: missing,
            }
            .into());
        }
        Ok(bound)
    }

    /// Binds the arguments and calls `f` with them — the decorator-boundary
    /// analog. `f` only runs if every mandatory parameter resolved.
    pub fn invoke<R>(
        &self,
        sig: &FunctionSig,
        pipeline_name: Option<&str>,
        explicit: Arguments,
        f: impl FnOnce(&Arguments) -> R,
    ) -> Result<R> {
        let bound = self.resolve_call(sig, pipeline_name, explicit)?;
        Ok(f(&bound))
    }
}
