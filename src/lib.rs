//! pipeconf - hierarchical configuration and secrets injection for
//! pipeline-style applications.
//!
//! Given a function whose parameters represent configuration values or
//! secrets, pipeconf resolves each unbound parameter at call time by
//! consulting an ordered stack of providers (environment variables, a
//! secure secrets file, a plain config file) with a deterministic
//! hierarchical key search, coerces the raw value into the declared type,
//! and either binds it transparently or fails with an error listing every
//! provider and key that was tried.
//!
//! # Features
//!
//! - **Hierarchical lookup**: candidate paths from
//!   `pipeline.sources.module.function.key` down to the bare key, pipeline-
//!   qualified candidates first, most specific first
//! - **Ranked providers**: secure stores before plain ones; plain stores are
//!   never consulted for values marked secret
//! - **Typed coercion**: strings from the environment parse into the
//!   declared kind; structured credential shapes accept an opaque native
//!   string, a full mapping, or ambient defaults
//! - **Introspectable failures**: one aggregated error per call carrying the
//!   complete ordered attempt trail for every missing field
//!
//! # Example
//!
//! ```ignore
//! use pipeconf::{
//!     Arguments, ArgumentSpec, Category, DefaultMarker, FunctionSig,
//!     Injector, ProviderStack, ValueKind,
//! };
//!
//! let stack = ProviderStack::standard("secrets.toml", "config.toml");
//! let injector = Injector::new(stack);
//!
//! let sig = FunctionSig::new(
//!     "zendesk",
//!     "tickets",
//!     Category::Source,
//!     vec![
//!         ArgumentSpec::new("api_url", ValueKind::Text, DefaultMarker::ConfigRequired),
//!         ArgumentSpec::new("api_token", ValueKind::Text, DefaultMarker::SecretRequired),
//!     ],
//! );
//!
//! let bound = injector.resolve_call(&sig, Some("chess_games"), Arguments::new())?;
//! let api_url = bound.get("api_url").unwrap();
//! ```

mod error;
mod inject;
mod resolve;
mod section;
mod spec;
mod value;

pub mod provider;

pub use error::{ConfigError, FieldsMissingError, MissingField, Result};
pub use inject::{Arguments, Injector};
pub use resolve::{AttemptOutcome, FieldResolution, ResolutionAttempt, Resolver};
pub use section::{CandidateKey, Category, LookupContext, SectionPath, candidates};
pub use spec::{
    Alternative, ArgumentSpec, DefaultMarker, FieldSpec, FunctionSig, RecordShape, ValueKind,
};
pub use value::{ConfigValue, coerce};

pub use provider::{Provider, ProviderStack, SecurityClass};
